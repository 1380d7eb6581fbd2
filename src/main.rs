use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use helios_roster::config::{AirtableConfig, ColumnNames, LoadOptions, StudentCollision};
use helios_roster::config::{DEFAULT_STUDENT_DOMAIN, parse_delimiter};
use helios_roster::io::airtable::AirtableClient;
use helios_roster::sync::{self, SyncTarget};
use helios_roster::{Result, export, load, logging};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = logging::init(&cli.log_level) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(cli) {
        error!(%error, "failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Load(args) => execute_load(args),
        Command::Sync(args) => execute_sync(args),
    }
}

fn execute_load(args: LoadArgs) -> Result<()> {
    let options = args.directory.load_options()?;
    let directory = load::load_directory(&args.directory.directory, &options)?;
    info!("loaded directory\n{directory}");

    if let Some(output) = &args.output {
        export::write_directory(output, &directory)?;
    }
    Ok(())
}

fn execute_sync(args: SyncArgs) -> Result<()> {
    // Credentials are checked before touching the input.
    let config = AirtableConfig::from_env()?;
    let options = args.directory.load_options()?;
    let directory = load::load_directory(&args.directory.directory, &options)?;

    let mut client = AirtableClient::new(&config)?;
    let report = sync::reconcile(&directory, &mut client, &SyncTarget::from(&config), args.push)?;

    if !args.push {
        for email in &report.missing_parents {
            info!(%email, "parent missing remotely");
        }
        for email in &report.missing_students {
            info!(%email, "student missing remotely");
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Load a school directory export and reconcile it with the roster store."
)]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the directory and log it.
    Load(LoadArgs),
    /// Load the directory and compare it with the remote tables.
    Sync(SyncArgs),
}

#[derive(clap::Args)]
struct DirectoryArgs {
    /// Path to the directory export (CSV or XLSX).
    #[arg(long)]
    directory: PathBuf,

    /// JSON file overriding header names.
    #[arg(long)]
    columns: Option<PathBuf>,

    /// Field delimiter of delimited exports.
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Domain of synthetic student emails.
    #[arg(long, default_value = DEFAULT_STUDENT_DOMAIN)]
    domain: String,

    /// What to do when two rows produce the same student email.
    #[arg(long, value_enum, default_value_t = CollisionPolicy::Replace)]
    on_duplicate_student: CollisionPolicy,
}

#[derive(clap::Args)]
struct LoadArgs {
    #[command(flatten)]
    directory: DirectoryArgs,

    /// Export the loaded directory (.json or .xlsx).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct SyncArgs {
    #[command(flatten)]
    directory: DirectoryArgs,

    /// Add missing records instead of only reporting them.
    #[arg(long)]
    push: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CollisionPolicy {
    Replace,
    Reject,
}

impl From<CollisionPolicy> for StudentCollision {
    fn from(policy: CollisionPolicy) -> Self {
        match policy {
            CollisionPolicy::Replace => StudentCollision::Replace,
            CollisionPolicy::Reject => StudentCollision::Reject,
        }
    }
}

impl DirectoryArgs {
    fn load_options(&self) -> Result<LoadOptions> {
        let columns = match &self.columns {
            Some(path) => ColumnNames::from_json_file(path)?,
            None => ColumnNames::default(),
        };

        Ok(LoadOptions {
            columns,
            delimiter: parse_delimiter(&self.delimiter)?,
            student_domain: self.domain.clone(),
            on_duplicate_student: self.on_duplicate_student.into(),
        })
    }
}
