//! Course offerings index: code → title, terms offered, tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use coursepath_shared::CourseCode;

use crate::schema::Eligibility;

/// One course entry as it appears in an index file.
///
/// Codes are kept as strings so a single malformed row does not reject the
/// whole index; unusable rows are skipped when the index is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexEntry {
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub offered: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// On-disk layout of an index file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub courses: Vec<IndexEntry>,
}

/// A course known to the offerings index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedCourse {
    pub code: CourseCode,
    pub title: String,
    /// Term labels in source order, e.g. `Winter 2026`. May be empty.
    pub offered: Vec<String>,
    pub tags: Vec<String>,
}

/// Offerings keyed by normalized course code.
#[derive(Debug, Clone, Default)]
pub struct CourseIndex {
    courses: BTreeMap<CourseCode, IndexedCourse>,
}

impl CourseIndex {
    /// Build the index, merging duplicate codes.
    ///
    /// Duplicates union their offerings and tags in first-seen order and keep
    /// the first non-empty title.
    pub fn from_entries(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut courses: BTreeMap<CourseCode, IndexedCourse> = BTreeMap::new();
        let mut skipped = 0usize;

        for entry in entries {
            let Some(code) = CourseCode::parse(&entry.code) else {
                skipped += 1;
                continue;
            };
            let course = courses.entry(code.clone()).or_insert_with(|| IndexedCourse {
                code,
                title: String::new(),
                offered: Vec::new(),
                tags: Vec::new(),
            });
            if course.title.is_empty() {
                course.title = entry.title.trim().to_string();
            }
            union_into(&mut course.offered, entry.offered);
            union_into(&mut course.tags, entry.tags);
        }

        if skipped > 0 {
            warn!(skipped, "Skipped index entries with unrecognized course codes");
        }
        Self { courses }
    }

    pub fn get(&self, code: &CourseCode) -> Option<&IndexedCourse> {
        self.courses.get(code)
    }

    /// Courses satisfying a slot predicate, in code order.
    pub fn matching<'a>(
        &'a self,
        eligible: &'a Eligibility,
    ) -> impl Iterator<Item = &'a IndexedCourse> + 'a {
        self.courses.values().filter(move |course| {
            let tags: Vec<&str> = course.tags.iter().map(String::as_str).collect();
            eligible.matches(&course.code, &tags)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedCourse> {
        self.courses.values()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

impl From<IndexDocument> for CourseIndex {
    fn from(doc: IndexDocument) -> Self {
        Self::from_entries(doc.courses)
    }
}

fn union_into(target: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !target.iter().any(|v| v == value) {
            target.push(value.to_string());
        }
    }
}
