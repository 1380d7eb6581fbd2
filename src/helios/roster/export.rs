use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use tracing::{info, instrument};

use crate::helios::roster::error::{Result, RosterError};
use crate::helios::roster::model::{Directory, Student};

/// Separator between parent emails in the students sheet.
pub const PARENT_SEPARATOR: &str = "; ";

pub const STUDENTS_SHEET: &str = "Students";
pub const PARENTS_SHEET: &str = "Parents";

const STUDENT_COLUMNS: [&str; 5] = ["Email", "Name", "Class", "Grade", "Parents"];
const PARENT_COLUMNS: [&str; 2] = ["Email", "Name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Excel,
}

/// Infers the export format from a file extension.
pub fn detect_format(path: &Path) -> Option<ExportFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "json" => Some(ExportFormat::Json),
        "xlsx" => Some(ExportFormat::Excel),
        _ => None,
    }
}

#[derive(Serialize)]
struct StudentView<'a> {
    email: &'a str,
    name: &'a str,
    class: &'a str,
    grade: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Serialize)]
struct ParentView<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct DirectoryView<'a> {
    students: Vec<StudentView<'a>>,
    parents: Vec<ParentView<'a>>,
}

impl<'a> DirectoryView<'a> {
    fn new(directory: &'a Directory) -> Self {
        Self {
            students: directory
                .students()
                .map(|student| StudentView {
                    email: &student.person.email,
                    name: &student.person.name,
                    class: &student.class,
                    grade: &student.grade,
                    parents: parent_emails(student),
                })
                .collect(),
            parents: directory
                .parents()
                .map(|parent| ParentView {
                    email: &parent.person.email,
                    name: &parent.person.name,
                })
                .collect(),
        }
    }
}

fn parent_emails(student: &Student) -> Vec<&str> {
    student
        .parents
        .iter()
        .map(|parent| parent.person.email.as_str())
        .collect()
}

/// Renders the directory as pretty JSON; parents of a student are listed by
/// email.
pub fn to_json(directory: &Directory) -> Result<String> {
    Ok(serde_json::to_string_pretty(&DirectoryView::new(directory))?)
}

/// One row per student: email, name, class, grade, parent emails.
pub fn student_rows(directory: &Directory) -> Vec<[String; 5]> {
    directory
        .students()
        .map(|student| {
            [
                student.person.email.clone(),
                student.person.name.clone(),
                student.class.clone(),
                student.grade.clone(),
                parent_emails(student).join(PARENT_SEPARATOR),
            ]
        })
        .collect()
}

/// One row per parent: email, name.
pub fn parent_rows(directory: &Directory) -> Vec<[String; 2]> {
    directory
        .parents()
        .map(|parent| [parent.person.email.clone(), parent.person.name.clone()])
        .collect()
}

/// Writes a `Students` and a `Parents` sheet, each with a bold frozen
/// header row and an autofilter.
pub fn write_workbook(path: &Path, directory: &Directory) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let students = workbook.add_worksheet();
    students.set_name(STUDENTS_SHEET)?;
    fill_sheet(students, &header, &STUDENT_COLUMNS, &student_rows(directory))?;

    let parents = workbook.add_worksheet();
    parents.set_name(PARENTS_SHEET)?;
    fill_sheet(parents, &header, &PARENT_COLUMNS, &parent_rows(directory))?;

    workbook.save(path)?;
    Ok(())
}

fn fill_sheet<const N: usize>(
    sheet: &mut Worksheet,
    header: &Format,
    columns: &[&str; N],
    rows: &[[String; N]],
) -> Result<()> {
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, header)?;
    }
    for (row, cells) in rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, cell)?;
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofilter(0, 0, rows.len() as u32, N as u16 - 1)?;
    sheet.autofit();
    Ok(())
}

/// Writes the directory to `path` in the format its extension names.
#[instrument(level = "info", skip_all, fields(output = %path.display()))]
pub fn write_directory(path: &Path, directory: &Directory) -> Result<()> {
    match detect_format(path) {
        Some(ExportFormat::Json) => fs::write(path, to_json(directory)?)?,
        Some(ExportFormat::Excel) => write_workbook(path, directory)?,
        None => return Err(RosterError::UnsupportedFormat(path.display().to_string())),
    }
    info!(
        students = directory.student_count(),
        parents = directory.parent_count(),
        "directory exported"
    );
    Ok(())
}
