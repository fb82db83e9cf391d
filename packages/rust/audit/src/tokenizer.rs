//! Section splitter for raw audit text.
//!
//! Each non-blank line is classified, first match wins:
//! 1. metadata `Key: value` (student, id, date, degree, major, subplan)
//! 2. summary `Key: value` (unit totals, GPA)
//! 3. section heading (`## Name`, `== Name ==`, `Requirement: Name`, `Name:`, ALL CAPS)
//! 4. course line (mentions a course-code-shaped token)
//! 5. note, kept verbatim under the current section
//!
//! A note line in Title Case directly above a course line is promoted to a heading.
//!
//! Boundaries come only from these structural markers, never from line positions.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use coursepath_shared::CourseCode;

use crate::course_line;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata fields recognized in `Key: value` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    StudentName,
    StudentId,
    AuditDate,
    Degree,
    Major,
    Subplan,
}

/// Summary fields recognized in `Key: value` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryField {
    UnitsRequired,
    UnitsCompleted,
    UnitsInProgress,
    UnitsNeeded,
    CumulativeGpa,
}

/// A line of source text with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub line_number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataLine {
    pub field: MetadataField,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub field: SummaryField,
    pub value: String,
}

/// A section as split from the source, before its course lines are parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSection {
    /// `None` for the implicit section opened by course lines before any heading.
    pub name: Option<String>,
    pub course_lines: Vec<SourceLine>,
    pub notes: Vec<String>,
}

/// Tokenizer output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedAudit {
    pub metadata_lines: Vec<MetadataLine>,
    pub summary_lines: Vec<SummaryLine>,
    /// Notes found before the first section.
    pub preamble: Vec<String>,
    pub sections: Vec<RawSection>,
}

impl TokenizedAudit {
    /// Whether any explicit section heading was found.
    pub fn has_section_markers(&self) -> bool {
        self.sections.iter().any(|s| s.name.is_some())
    }

    pub fn course_line_count(&self) -> usize {
        self.sections.iter().map(|s| s.course_lines.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

static METADATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(student\s+name|student\s+id|audit\s+date|run\s+date|sub-?plan|name|student|id|date|degree|program|major|plan|concentration|track)\s*[:\-]\s*(.+)$",
    )
    .expect("metadata regex")
});

static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(total\s+units\s+required|units\s+required|units\s+completed|units\s+earned|units\s+in\s+progress|units\s+needed|units\s+remaining|cumulative\s+gpa|gpa)\s*[:\-]?\s*(.*\d.*)$",
    )
    .expect("summary regex")
});

/// `# Name`, `## Name ##`.
static MD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#{1,6}\s+(.+?)\s*#*$").expect("markdown heading regex")
});

/// `== Name ==`, `--- Name ---`, `** Name **`.
static RULED_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:={2,}|-{2,}|\*{2,})\s*(.+?)\s*(?:={2,}|-{2,}|\*{2,})$")
        .expect("ruled heading regex")
});

/// `Requirement: Name`, `Section - Name`, `Category: Name`.
static LABELED_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:requirement|section|category)\s*[:\-]\s*(.+)$")
        .expect("labeled heading regex")
});

/// `Name:` with nothing after the colon.
static COLON_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9&/,'() \-]{0,80}?)\s*:$").expect("colon heading regex")
});

/// ALL CAPS line without digits.
static CAPS_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z&/,'() \-]{2,80}$").expect("caps heading regex")
});

/// Title Case words (minor words allowed in lowercase), no digits.
static TITLE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Z][A-Za-z&/,'()\-]*(?:\s+(?:[A-Z][A-Za-z&/,'()\-]*|of|and|in|the|for|to|or|&)){0,7}$",
    )
    .expect("title line regex")
});

/// Status words that audits print on their own line; never headings.
const STATUS_WORDS: &[&str] = &[
    "SATISFIED",
    "NOT SATISFIED",
    "COMPLETE",
    "COMPLETED",
    "INCOMPLETE",
    "IN PROGRESS",
    "NEEDS",
    "NEEDED",
    "OK",
    "NO",
    "YES",
    "DONE",
];

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

enum LineKind {
    Metadata(MetadataLine),
    Summary(SummaryLine),
    Heading(String),
    Course,
    Note,
}

/// Split raw audit text into metadata, summary, and sections.
///
/// Never fails: text with no section markers becomes one unnamed section, and
/// text with no course lines yields no sections at all (the assembler decides
/// whether that is an error).
#[instrument(skip_all, fields(bytes = text.len()))]
pub fn tokenize(text: &str) -> TokenizedAudit {
    let mut out = TokenizedAudit::default();
    let mut seen_metadata: HashSet<MetadataField> = HashSet::new();
    let mut seen_summary: HashSet<SummaryField> = HashSet::new();

    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();
    let mut kinds: Vec<LineKind> = lines.iter().map(|(_, line)| classify(line)).collect();

    // A plain title-case line directly above a course line is a heading.
    for i in 0..kinds.len() {
        let above_course = matches!(kinds.get(i + 1), Some(LineKind::Course));
        if above_course && matches!(kinds[i], LineKind::Note) && is_title_line(lines[i].1) {
            kinds[i] = LineKind::Heading(lines[i].1.to_string());
        }
    }

    for ((line_number, line), kind) in lines.into_iter().zip(kinds) {
        match kind {
            // First occurrence of a key wins; repeats (per-section subtotals)
            // stay with the section as notes.
            LineKind::Metadata(meta) if seen_metadata.insert(meta.field) => {
                out.metadata_lines.push(meta);
            }
            LineKind::Summary(summary) if seen_summary.insert(summary.field) => {
                out.summary_lines.push(summary);
            }
            LineKind::Heading(name) => {
                out.sections.push(RawSection {
                    name: Some(name),
                    ..Default::default()
                });
            }
            LineKind::Course => {
                if out.sections.is_empty() {
                    out.sections.push(RawSection::default());
                }
                if let Some(section) = out.sections.last_mut() {
                    section.course_lines.push(SourceLine {
                        line_number,
                        text: line.to_string(),
                    });
                }
            }
            LineKind::Metadata(_) | LineKind::Summary(_) | LineKind::Note => {
                match out.sections.last_mut() {
                    Some(section) => section.notes.push(line.to_string()),
                    None => out.preamble.push(line.to_string()),
                }
            }
        }
    }

    // Without any markers the whole document is one unnamed section.
    if !out.has_section_markers() {
        if let Some(section) = out.sections.first_mut() {
            let mut notes = std::mem::take(&mut out.preamble);
            notes.append(&mut section.notes);
            section.notes = notes;
        }
    }

    debug!(
        sections = out.sections.len(),
        course_lines = out.course_line_count(),
        metadata = out.metadata_lines.len(),
        summary = out.summary_lines.len(),
        "tokenized audit"
    );

    out
}

fn classify(line: &str) -> LineKind {
    if let Some(meta) = metadata_line(line) {
        return LineKind::Metadata(meta);
    }
    if let Some(summary) = summary_line(line) {
        return LineKind::Summary(summary);
    }
    if let Some(name) = heading_name(line) {
        return LineKind::Heading(name);
    }
    if course_line::looks_like_course(line) {
        return LineKind::Course;
    }
    LineKind::Note
}

/// Whether a line reads as a metadata or summary `Key: value` line.
pub(crate) fn is_key_line(line: &str) -> bool {
    matches!(classify(line.trim()), LineKind::Metadata(_) | LineKind::Summary(_))
}

fn metadata_line(line: &str) -> Option<MetadataLine> {
    let caps = METADATA_RE.captures(line)?;
    let key = caps[1].split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let field = match key.as_str() {
        "student name" | "name" | "student" => MetadataField::StudentName,
        "student id" | "id" => MetadataField::StudentId,
        "audit date" | "run date" | "date" => MetadataField::AuditDate,
        "degree" | "program" => MetadataField::Degree,
        "major" | "plan" => MetadataField::Major,
        "subplan" | "sub-plan" | "concentration" | "track" => MetadataField::Subplan,
        _ => return None,
    };
    Some(MetadataLine {
        field,
        value: caps[2].trim().to_string(),
    })
}

fn summary_line(line: &str) -> Option<SummaryLine> {
    let caps = SUMMARY_RE.captures(line)?;
    let key = caps[1].split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let field = match key.as_str() {
        "total units required" | "units required" => SummaryField::UnitsRequired,
        "units completed" | "units earned" => SummaryField::UnitsCompleted,
        "units in progress" => SummaryField::UnitsInProgress,
        "units needed" | "units remaining" => SummaryField::UnitsNeeded,
        "cumulative gpa" | "gpa" => SummaryField::CumulativeGpa,
        _ => return None,
    };
    Some(SummaryLine {
        field,
        value: caps[2].trim().to_string(),
    })
}

fn heading_name(line: &str) -> Option<String> {
    let name = if let Some(caps) = MD_HEADING_RE.captures(line) {
        caps[1].to_string()
    } else if let Some(caps) = RULED_HEADING_RE.captures(line) {
        caps[1].to_string()
    } else if let Some(caps) = LABELED_HEADING_RE.captures(line) {
        caps[1].to_string()
    } else if let Some(caps) = COLON_HEADING_RE.captures(line) {
        let name = caps[1].trim();
        if CourseCode::parse(name).is_some() {
            return None;
        }
        name.to_string()
    } else if CAPS_HEADING_RE.is_match(line) && !is_status_word(line) {
        line.to_string()
    } else {
        return None;
    };

    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

fn is_title_line(line: &str) -> bool {
    TITLE_LINE_RE.is_match(line) && !is_status_word(&line.to_ascii_uppercase())
}

fn is_status_word(line: &str) -> bool {
    let norm = line.split_whitespace().collect::<Vec<_>>().join(" ");
    STATUS_WORDS.contains(&norm.as_str())
}
