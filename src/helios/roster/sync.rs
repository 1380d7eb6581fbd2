use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::helios::roster::config::AirtableConfig;
use crate::helios::roster::error::Result;
use crate::helios::roster::io::airtable::{Fields, Record, RosterStore, Table};
use crate::helios::roster::model::{Directory, Parent, Student};

/// Field holding the key of a remote record.
pub const EMAIL_FIELD: &str = "Email";

/// Remote tables the directory is reconciled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub base_name: String,
    pub parents_table: String,
    pub students_table: String,
}

impl From<&AirtableConfig> for SyncTarget {
    fn from(config: &AirtableConfig) -> Self {
        Self {
            base_name: config.base_name.clone(),
            parents_table: config.parents_table.clone(),
            students_table: config.students_table.clone(),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub remote_parents: usize,
    pub remote_students: usize,
    /// Local parents with no remote record, by email.
    pub missing_parents: Vec<String>,
    /// Local students with no remote record, by email.
    pub missing_students: Vec<String>,
    pub added_parents: usize,
    pub added_students: usize,
}

/// Compares the directory with the remote tables and, when `push` is set,
/// adds every missing parent and then every missing student.
///
/// Remote records are only ever added; existing ones are left untouched even
/// when their fields disagree with the directory. Students link to their
/// parents through the parents' record ids, so parents are written first.
#[instrument(level = "info", skip(directory, store))]
pub fn reconcile<S: RosterStore>(
    directory: &Directory,
    store: &mut S,
    target: &SyncTarget,
    push: bool,
) -> Result<SyncReport> {
    let parents_table = store.find_table(&target.base_name, &target.parents_table)?;
    let students_table = store.find_table(&target.base_name, &target.students_table)?;

    let remote_parents = store.list_records(&parents_table)?;
    let remote_students = store.list_records(&students_table)?;
    info!(
        parents = remote_parents.len(),
        students = remote_students.len(),
        "fetched remote records"
    );

    let mut parent_ids = record_ids_by_email(&remote_parents);
    let known_students: BTreeSet<String> = record_ids_by_email(&remote_students)
        .into_keys()
        .collect();

    // Parents without an email have no remote key and are never written.
    let missing_parents: Vec<&Parent> = directory
        .parents()
        .filter(|parent| !parent.person.email.is_empty())
        .filter(|parent| !parent_ids.contains_key(&parent.person.email))
        .map(|parent| &**parent)
        .collect();
    let missing_students: Vec<&Student> = directory
        .students()
        .filter(|student| !known_students.contains(&student.person.email.to_lowercase()))
        .collect();

    let mut report = SyncReport {
        remote_parents: remote_parents.len(),
        remote_students: remote_students.len(),
        missing_parents: missing_parents
            .iter()
            .map(|parent| parent.person.email.clone())
            .collect(),
        missing_students: missing_students
            .iter()
            .map(|student| student.person.email.clone())
            .collect(),
        ..SyncReport::default()
    };

    if push {
        for parent in &missing_parents {
            let added = add_one(store, &parents_table, parent_fields(parent))?;
            report.added_parents += added.len();
            parent_ids.extend(record_ids_by_email(&added));
        }
        for student in &missing_students {
            let added = add_one(store, &students_table, student_fields(student, &parent_ids))?;
            report.added_students += added.len();
        }
    }

    info!(
        missing_parents = report.missing_parents.len(),
        missing_students = report.missing_students.len(),
        added_parents = report.added_parents,
        added_students = report.added_students,
        push,
        "reconciled directory"
    );
    Ok(report)
}

fn add_one<S: RosterStore>(store: &mut S, table: &Table, fields: Fields) -> Result<Vec<Record>> {
    debug!(table = %table.name, email = ?fields.get(EMAIL_FIELD), "adding record");
    store.add_records(table, vec![fields])
}

/// Maps lowercased `Email` values to record ids. Records without an email
/// are ignored; the first record wins when several share one.
fn record_ids_by_email(records: &[Record]) -> BTreeMap<String, String> {
    let mut ids = BTreeMap::new();
    for record in records {
        if let Some(email) = record.text(EMAIL_FIELD).filter(|email| !email.is_empty()) {
            ids.entry(email.to_lowercase())
                .or_insert_with(|| record.id.clone());
        }
    }
    ids
}

pub fn parent_fields(parent: &Parent) -> Fields {
    let mut fields = Fields::new();
    fields.insert(EMAIL_FIELD.into(), Value::String(parent.person.email.clone()));
    fields.insert("Name".into(), Value::String(parent.person.name.clone()));
    fields
}

/// Student payload; `Parents` lists the record ids of the parents already
/// known remotely. Parents without an email are left unlinked.
pub fn student_fields(student: &Student, parent_ids: &BTreeMap<String, String>) -> Fields {
    let linked: Vec<Value> = student
        .parents
        .iter()
        .filter_map(|parent| parent_ids.get(&parent.person.email))
        .map(|id| Value::String(id.clone()))
        .collect();

    let mut fields = Fields::new();
    fields.insert(EMAIL_FIELD.into(), Value::String(student.person.email.clone()));
    fields.insert("Name".into(), Value::String(student.person.name.clone()));
    fields.insert("Class".into(), Value::String(student.class.clone()));
    fields.insert("Grade".into(), Value::String(student.grade.clone()));
    fields.insert("Parents".into(), Value::Array(linked));
    fields
}
