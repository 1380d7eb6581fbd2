use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::helios::roster::error::{Result, RosterError};

/// Domain appended to synthetic student emails.
pub const DEFAULT_STUDENT_DOMAIN: &str = "heliosschool.org";
/// Default endpoint of the Airtable REST API.
pub const DEFAULT_AIRTABLE_API: &str = "https://api.airtable.com";

/// Header names of every column the loader reads.
///
/// The defaults follow the school export verbatim, including the line
/// breaks embedded in most parent headers. Any subset can be overridden from
/// a JSON object with the same field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub grade: String,
    pub parent1_first: String,
    pub parent1_last: String,
    pub parent1_email: String,
    pub parent2_first: String,
    pub parent2_last: String,
    pub parent2_email: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            first_name: "First Name".into(),
            last_name: "Last Name".into(),
            class: "Class".into(),
            grade: "Grade".into(),
            parent1_first: "Parent 1\nFirst".into(),
            parent1_last: "Parent 1\nLast".into(),
            parent1_email: "Parent 1\nEmail".into(),
            parent2_first: "Parent 2\nFirst".into(),
            parent2_last: "Parent 2\nLast".into(),
            parent2_email: "Parent 2 Email".into(),
        }
    }
}

impl ColumnNames {
    /// Reads column overrides from a JSON file. Fields left out keep their
    /// default header.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RosterError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// What to do when two rows derive the same synthetic student email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentCollision {
    /// The later row silently replaces the earlier student.
    #[default]
    Replace,
    /// The load fails with [`RosterError::DuplicateStudent`].
    Reject,
}

/// Everything the loader needs to know, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub columns: ColumnNames,
    pub delimiter: u8,
    pub student_domain: String,
    pub on_duplicate_student: StudentCollision,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            delimiter: b',',
            student_domain: DEFAULT_STUDENT_DOMAIN.into(),
            on_duplicate_student: StudentCollision::default(),
        }
    }
}

/// Converts a user supplied delimiter into the single byte the CSV reader
/// expects. `\t` and `tab` both select a tab.
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        _ => {
            let mut bytes = raw.bytes();
            match (bytes.next(), bytes.next()) {
                (Some(byte), None) if byte.is_ascii() => Ok(byte),
                _ => Err(RosterError::Configuration(format!(
                    "delimiter must be a single ASCII character, got '{raw}'"
                ))),
            }
        }
    }
}

/// Connection settings for the remote roster store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableConfig {
    pub token: String,
    pub api_base: String,
    pub base_name: String,
    pub parents_table: String,
    pub students_table: String,
}

impl AirtableConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    /// `AIRTABLE_TOKEN` is required; every other setting has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let token = read("AIRTABLE_TOKEN").ok_or_else(|| {
            RosterError::Configuration("please set $AIRTABLE_TOKEN".into())
        })?;

        Ok(Self {
            token,
            api_base: read("AIRTABLE_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_AIRTABLE_API.into()),
            base_name: read("AIRTABLE_BASE").unwrap_or_else(|| "Directory".into()),
            parents_table: read("AIRTABLE_PARENTS_TABLE").unwrap_or_else(|| "Parents".into()),
            students_table: read("AIRTABLE_STUDENTS_TABLE").unwrap_or_else(|| "Students".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_columns_keep_embedded_line_breaks() {
        let columns = ColumnNames::default();
        assert_eq!(columns.parent1_email, "Parent 1\nEmail");
        assert_eq!(columns.parent2_email, "Parent 2 Email");
    }

    #[test]
    fn partial_column_overrides_keep_defaults() {
        let columns: ColumnNames =
            serde_json::from_str(r#"{"grade": "Year", "parent2_email": "Parent 2\nEmail"}"#)
                .expect("columns parsed");
        assert_eq!(columns.grade, "Year");
        assert_eq!(columns.parent2_email, "Parent 2\nEmail");
        assert_eq!(columns.first_name, "First Name");
    }

    #[test]
    fn delimiter_accepts_single_ascii_and_tab() {
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(matches!(
            parse_delimiter(",,"),
            Err(RosterError::Configuration(_))
        ));
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn airtable_token_is_required() {
        let error = AirtableConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(error, RosterError::Configuration(_)));

        let empty = AirtableConfig::from_lookup(|key| {
            (key == "AIRTABLE_TOKEN").then(String::new)
        });
        assert!(empty.is_err());
    }

    #[test]
    fn airtable_settings_fall_back_to_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AIRTABLE_TOKEN", "pat123"),
            ("AIRTABLE_API_URL", "http://localhost:9000/"),
        ]);
        let config = AirtableConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("config built");

        assert_eq!(config.token, "pat123");
        assert_eq!(config.api_base, "http://localhost:9000");
        assert_eq!(config.base_name, "Directory");
        assert_eq!(config.parents_table, "Parents");
        assert_eq!(config.students_table, "Students");
    }
}
