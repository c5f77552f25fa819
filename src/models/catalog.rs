// src/models/catalog.rs

//! Department, course and section records produced by a crawl.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Course-number prefix of a department.
///
/// Published artifacts carry the sentinel strings, so the enum converts
/// to and from them losslessly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Prefix {
    /// Nothing known yet (`""`)
    #[default]
    Missing,
    /// The department lists no course this semester (`"-no course-"`)
    NoCourse,
    /// A probe was attempted and found nothing (`"-"`)
    Unresolved,
    /// A usable prefix such as `CENG`
    Resolved(String),
}

impl Prefix {
    pub const NO_COURSE: &'static str = "-no course-";
    pub const UNRESOLVED: &'static str = "-";

    /// Only resolved prefixes may be shown in course names or used as keys.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Missing => "",
            Self::NoCourse => Self::NO_COURSE,
            Self::Unresolved => Self::UNRESOLVED,
            Self::Resolved(value) => value,
        }
    }
}

impl From<String> for Prefix {
    fn from(value: String) -> Self {
        match value.trim() {
            "" => Self::Missing,
            Self::NO_COURSE => Self::NoCourse,
            Self::UNRESOLVED => Self::Unresolved,
            other => Self::Resolved(other.to_string()),
        }
    }
}

impl From<&str> for Prefix {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Prefix> for String {
    fn from(prefix: Prefix) -> Self {
        prefix.as_str().to_string()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A department as listed on the catalog landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub code: String,
    pub name: String,
    pub prefix: Prefix,
}

/// Registry entry for one department (`departments.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "p", default)]
    pub prefix: Prefix,
}

impl From<&Department> for DepartmentRecord {
    fn from(dept: &Department) -> Self {
        Self {
            name: dept.name.clone(),
            prefix: dept.prefix.clone(),
        }
    }
}

/// Department registry keyed by department code.
pub type DepartmentRegistry = BTreeMap<String, DepartmentRecord>;

/// The semester currently selected on the landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSemester {
    /// Form value used in department queries (e.g. `20241`)
    pub term: String,
    /// Human-readable label (e.g. `2024-2025 Fall`)
    pub label: String,
}

/// A course row from a department listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseListing {
    pub code: String,
    pub name: String,
}

/// One meeting slot of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTime {
    #[serde(rename = "d")]
    pub day: String,
    #[serde(rename = "s")]
    pub start: String,
    #[serde(rename = "e")]
    pub end: String,
    #[serde(rename = "p")]
    pub place: String,
}

/// A section (offering instance) of a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "i")]
    pub instructors: Vec<String>,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none", default)]
    pub capacity: Option<u32>,
    #[serde(rename = "t")]
    pub times: Vec<MeetingTime>,
}

/// Sections of a course keyed by section identifier.
pub type Sections = BTreeMap<String, Section>;

/// A fully crawled course (`data.json` entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "Course Code")]
    pub code: String,
    #[serde(rename = "Course Name")]
    pub name: String,
    #[serde(rename = "Sections")]
    pub sections: Sections,
}

impl Course {
    /// Display name, e.g. `CENG 111 - Intro` or `5710111 - Intro`.
    pub fn display_name(prefix: &Prefix, code: &str, name: &str) -> String {
        match prefix {
            Prefix::Resolved(p) => format!("{p} {code} - {name}"),
            _ => format!("{code} - {name}"),
        }
    }
}

/// Course dataset keyed by numeric course code.
pub type CourseData = BTreeMap<u64, Course>;

/// Must courses of one department: semester number to course codes.
pub type MustNode = BTreeMap<u32, Vec<String>>;

/// Must-course dataset keyed by department prefix.
pub type MustData = BTreeMap<String, MustNode>;

/// Last-updated marker (`lastUpdated.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUpdated {
    /// `<term>:<label>`
    #[serde(rename = "t")]
    pub term: String,
    /// `DD.MM.YYYY, HH.MM` in catalog local time
    #[serde(rename = "u")]
    pub updated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_sentinels_round_trip() {
        for raw in ["", "-no course-", "-", "CENG"] {
            let prefix = Prefix::from(raw);
            assert_eq!(String::from(prefix), raw);
        }
        assert_eq!(Prefix::from("-"), Prefix::Unresolved);
        assert!(Prefix::from("CENG").is_usable());
        assert!(!Prefix::from("-no course-").is_usable());
    }

    #[test]
    fn test_display_name() {
        let cs = Prefix::Resolved("CS".to_string());
        assert_eq!(Course::display_name(&cs, "101", "Intro"), "CS 101 - Intro");
        assert_eq!(Course::display_name(&Prefix::Missing, "101", "Intro"), "101 - Intro");
        assert_eq!(Course::display_name(&Prefix::Unresolved, "101", "Intro"), "101 - Intro");
    }

    #[test]
    fn test_department_record_short_keys() {
        let json = r#"{"n":"Computer Engineering","p":"-no course-"}"#;
        let record: DepartmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.prefix, Prefix::NoCourse);
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }

    #[test]
    fn test_must_node_keys_are_ordered_numerically() {
        let mut node = MustNode::new();
        node.insert(10, vec!["5710491".to_string()]);
        node.insert(2, vec!["5710140".to_string()]);
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"2":["5710140"],"10":["5710491"]}"#);
    }
}
