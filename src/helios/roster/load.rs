//! Turns directory rows into a [`Directory`].
//!
//! Each row yields one student and one or two parents. Parents are keyed by
//! their lowercased email so siblings share a single [`Parent`] instance;
//! students are keyed by `first.last@<domain>`.

use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, instrument, warn};

use crate::helios::roster::config::{LoadOptions, StudentCollision};
use crate::helios::roster::error::{Result, RosterError};
use crate::helios::roster::io::open_rows;
use crate::helios::roster::io::rows::{ColumnIndex, RowSource, field};
use crate::helios::roster::model::{Directory, Parent, Person, Student};

/// Marks a student split across two classes.
pub const SPLIT_CLASS_SEPARATOR: char = '/';

/// Loads the export at `path`. Nothing is returned unless every row loads.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_directory(path: &Path, options: &LoadOptions) -> Result<Directory> {
    let mut rows = open_rows(path, options.delimiter)?;
    let directory = load_rows(rows.as_mut(), options)?;
    info!(
        students = directory.student_count(),
        parents = directory.parent_count(),
        "loaded directory"
    );
    Ok(directory)
}

/// Builds a directory from an already opened row source. Every required
/// column is resolved before the first row is read.
pub fn load_rows(rows: &mut dyn RowSource, options: &LoadOptions) -> Result<Directory> {
    let columns = ColumnIndex::resolve(rows.headers(), &options.columns)?;
    info!(headers = ?rows.headers(), "resolved header row");

    let mut directory = Directory::new();
    while let Some(row) = rows.next_row()? {
        add_row(&mut directory, &columns, &row, options)?;
    }
    Ok(directory)
}

fn add_row(
    directory: &mut Directory,
    columns: &ColumnIndex,
    row: &[String],
    options: &LoadOptions,
) -> Result<()> {
    let first_name = field(row, columns.first_name);
    let last_name = field(row, columns.last_name);

    let mut parents: Vec<Rc<Parent>> = Vec::with_capacity(2);
    parents.push(directory.add_parent(
        field(row, columns.parent1_email),
        display_name(
            field(row, columns.parent1_first),
            field(row, columns.parent1_last),
        ),
    ));

    let parent2_email = field(row, columns.parent2_email);
    if !parent2_email.is_empty() {
        parents.push(directory.add_parent(
            parent2_email,
            display_name(
                field(row, columns.parent2_first),
                field(row, columns.parent2_last),
            ),
        ));
    }

    let email = student_email(first_name, last_name, &options.student_domain);
    if directory.contains_student(&email) {
        match options.on_duplicate_student {
            StudentCollision::Reject => return Err(RosterError::DuplicateStudent(email)),
            StudentCollision::Replace => warn!(%email, "replacing student from an earlier row"),
        }
    }

    let student = Student {
        person: Person::new(display_name(first_name, last_name), email),
        class: class_of(field(row, columns.class)),
        grade: field(row, columns.grade).to_string(),
        parents,
    };
    debug!(%student, parents = student.parents.len(), "row");
    directory.insert_student(student)?;
    Ok(())
}

/// Derives the synthetic email that keys a student.
pub fn student_email(first_name: &str, last_name: &str, domain: &str) -> String {
    format!(
        "{}.{}@{domain}",
        first_name.to_lowercase(),
        last_name.to_lowercase()
    )
}

/// Returns the class to record for a raw class field; split classes are
/// recorded as no class.
pub fn class_of(raw: &str) -> String {
    if raw.contains(SPLIT_CLASS_SEPARATOR) {
        String::new()
    } else {
        raw.to_string()
    }
}

fn display_name(first: &str, last: &str) -> String {
    format!("{first} {last}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helios::roster::io::csv_read::CsvRows;

    const HEADER: &str = "First Name,Last Name,Class,Grade,\"Parent 1\nFirst\",\"Parent 1\nLast\",\
\"Parent 1\nEmail\",\"Parent 2\nFirst\",\"Parent 2\nLast\",Parent 2 Email\n";

    fn load(body: &str, options: &LoadOptions) -> Result<Directory> {
        let data = format!("{HEADER}{body}");
        let mut rows = CsvRows::new(data.as_bytes(), b',')?;
        load_rows(&mut rows, options)
    }

    #[test]
    fn single_parent_row() {
        let directory = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,,,\n",
            &LoadOptions::default(),
        )
        .expect("directory loaded");

        let student = directory
            .student("ana.lopez@heliosschool.org")
            .expect("student present");
        assert_eq!(student.person.name, "Ana Lopez");
        assert_eq!(student.class, "3A");
        assert_eq!(student.grade, "2");
        assert_eq!(student.parents.len(), 1);
        assert_eq!(student.parents[0].person.email, "maria.l@x.com");
        assert_eq!(student.parents[0].person.name, "Maria Lopez");
        assert_eq!(directory.parent_count(), 1);
    }

    #[test]
    fn siblings_share_one_parent_instance() {
        let directory = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,,,\n\
             Luis,Lopez,5B,4,Maria,Lopez,Maria.L@X.com,Jorge,Lopez,jorge@x.com\n",
            &LoadOptions::default(),
        )
        .expect("directory loaded");

        let ana = directory.student("ana.lopez@heliosschool.org").unwrap();
        let luis = directory.student("luis.lopez@heliosschool.org").unwrap();
        assert_eq!(directory.parent_count(), 2);
        assert!(Rc::ptr_eq(&ana.parents[0], &luis.parents[0]));
        assert!(Rc::ptr_eq(
            &luis.parents[0],
            directory.parent("maria.l@x.com").unwrap()
        ));
        assert_eq!(luis.parents[1].person.name, "Jorge Lopez");
    }

    #[test]
    fn second_parent_column_deduplicates_across_rows() {
        let directory = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,Jorge,Lopez,jorge@x.com\n\
             Luis,Lopez,5B,4,Rosa,Ruiz,rosa@x.com,Jorge,Lopez,JORGE@X.com\n\
             Eva,Ruiz,1C,1,Jorge,Lopez,Jorge@x.com,Rosa,Ruiz,ROSA@x.com\n",
            &LoadOptions::default(),
        )
        .expect("directory loaded");

        let ana = directory.student("ana.lopez@heliosschool.org").unwrap();
        let luis = directory.student("luis.lopez@heliosschool.org").unwrap();
        let eva = directory.student("eva.ruiz@heliosschool.org").unwrap();
        assert_eq!(directory.parent_count(), 3);

        // Same email in the Parent 2 column of two rows, differing in case.
        assert!(Rc::ptr_eq(&ana.parents[1], &luis.parents[1]));
        assert_eq!(luis.parents[1].person.email, "jorge@x.com");

        // Parent 2 of one row is Parent 1 of another.
        assert!(Rc::ptr_eq(&ana.parents[1], &eva.parents[0]));
        assert!(Rc::ptr_eq(&luis.parents[0], &eva.parents[1]));
        assert!(Rc::ptr_eq(
            &eva.parents[1],
            directory.parent("rosa@x.com").unwrap()
        ));
    }

    #[test]
    fn every_student_parent_belongs_to_directory() {
        let directory = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,Jorge,Lopez,JORGE@x.com\n\
             Eva,Ruiz,1C,1,Rosa,Ruiz,rosa@x.com,,,\n",
            &LoadOptions::default(),
        )
        .unwrap();

        for student in directory.students() {
            for parent in &student.parents {
                let owned = directory.parent(&parent.person.email).expect("parent owned");
                assert!(Rc::ptr_eq(parent, owned));
            }
        }
    }

    #[test]
    fn split_class_is_dropped() {
        let directory = load(
            "Ana,Lopez,3A/3B,2,Maria,Lopez,maria.l@x.com,,,\n",
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(
            directory.student("ana.lopez@heliosschool.org").unwrap().class,
            ""
        );
    }

    #[test]
    fn student_email_lowercases_names() {
        assert_eq!(
            student_email("Ana", "De La Cruz", "heliosschool.org"),
            "ana.de la cruz@heliosschool.org"
        );
    }

    #[test]
    fn custom_domain_is_used() {
        let options = LoadOptions {
            student_domain: "example.edu".into(),
            ..LoadOptions::default()
        };
        let directory = load("Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,,,\n", &options).unwrap();
        assert!(directory.student("ana.lopez@example.edu").is_some());
    }

    #[test]
    fn colliding_student_replaces_by_default() {
        let directory = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,,,\n\
             ANA,LOPEZ,4C,3,Rosa,Ruiz,rosa@x.com,,,\n",
            &LoadOptions::default(),
        )
        .unwrap();

        assert_eq!(directory.student_count(), 1);
        let student = directory.student("ana.lopez@heliosschool.org").unwrap();
        assert_eq!(student.class, "4C");
        assert_eq!(student.person.name, "ANA LOPEZ");
        // Parents of the replaced row stay registered.
        assert_eq!(directory.parent_count(), 2);
    }

    #[test]
    fn colliding_student_rejected_when_requested() {
        let options = LoadOptions {
            on_duplicate_student: StudentCollision::Reject,
            ..LoadOptions::default()
        };
        let error = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,,,\n\
             Ana,Lopez,4C,3,Rosa,Ruiz,rosa@x.com,,,\n",
            &options,
        )
        .unwrap_err();

        match error {
            RosterError::DuplicateStudent(email) => {
                assert_eq!(email, "ana.lopez@heliosschool.org")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_grade_column_fails_before_rows() {
        let data = "First Name,Last Name,Class,\"Parent 1\nFirst\",\"Parent 1\nLast\",\
\"Parent 1\nEmail\",\"Parent 2\nFirst\",\"Parent 2\nLast\",Parent 2 Email\n\
Ana,Lopez,3A\n";
        let mut rows = CsvRows::new(data.as_bytes(), b',').unwrap();

        match load_rows(&mut rows, &LoadOptions::default()) {
            Err(RosterError::MissingColumn(name)) => assert_eq!(name, "Grade"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn short_row_fails_whole_load() {
        let error = load(
            "Ana,Lopez,3A,2,Maria,Lopez,maria.l@x.com,,,\nLuis,Lopez\n",
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(error, RosterError::MalformedInput(_)));
    }
}
