use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::rc::Rc;

use crate::helios::roster::error::{Result, RosterError};

/// Key of a student or parent. Parent keys are lowercased source emails,
/// student keys are synthetic emails derived from the name fields.
pub type Email = String;

/// Shape shared by students and parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Display name, "First Last".
    pub name: String,
    pub email: Email,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<Email>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A parent or guardian. One instance is shared by every student that lists
/// the same email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub person: Person,
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.person.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub person: Person,
    /// Empty when the export lists a split class.
    pub class: String,
    pub grade: String,
    /// One or two entries, each owned by the [`Directory`] parent map.
    pub parents: Vec<Rc<Parent>>,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.person.fmt(f)
    }
}

/// Aggregate of every student and parent produced by one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    students: BTreeMap<Email, Student>,
    parents: BTreeMap<Email, Rc<Parent>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parent registered under `email`, registering a new one
    /// when none exists yet. The email is lowercased before lookup; the name
    /// of the first registration is kept.
    pub fn add_parent(&mut self, email: &str, name: impl Into<String>) -> Rc<Parent> {
        let key = email.to_lowercase();
        match self.parents.entry(key) {
            Entry::Occupied(entry) => Rc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let parent = Rc::new(Parent {
                    person: Person::new(name, entry.key().clone()),
                });
                Rc::clone(entry.insert(parent))
            }
        }
    }

    /// Inserts `student` under its email, handing back the student it
    /// replaced, if any. Every parent of `student` must be an instance
    /// returned by [`Directory::add_parent`] on this directory.
    pub fn insert_student(&mut self, student: Student) -> Result<Option<Student>> {
        if let Some(foreign) = student.parents.iter().find(|parent| !self.owns(parent)) {
            return Err(RosterError::ForeignParent(foreign.person.email.clone()));
        }
        Ok(self.students.insert(student.person.email.clone(), student))
    }

    fn owns(&self, parent: &Rc<Parent>) -> bool {
        self.parents
            .get(&parent.person.email)
            .is_some_and(|owned| Rc::ptr_eq(owned, parent))
    }

    pub fn contains_student(&self, email: &str) -> bool {
        self.students.contains_key(email)
    }

    pub fn student(&self, email: &str) -> Option<&Student> {
        self.students.get(email)
    }

    /// Looks up a parent, ignoring case.
    pub fn parent(&self, email: &str) -> Option<&Rc<Parent>> {
        self.parents.get(&email.to_lowercase())
    }

    /// Students in key order.
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    /// Parents in key order.
    pub fn parents(&self) -> impl Iterator<Item = &Rc<Parent>> {
        self.parents.values()
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty() && self.parents.is_empty()
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} students, {} parents",
            self.students.len(),
            self.parents.len()
        )?;
        for student in self.students.values() {
            write!(f, "{student}")?;
            if !student.class.is_empty() {
                write!(f, " class {}", student.class)?;
            }
            writeln!(f, " grade {}", student.grade)?;
            for parent in &student.parents {
                writeln!(f, "  {parent}")?;
            }
        }
        Ok(())
    }
}
