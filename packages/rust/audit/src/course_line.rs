//! Course-line parser.
//!
//! A course line is tried against an ordered list of shapes, most informative
//! first, falling back progressively down to code-only:
//! - `CODE title TERM UNITS GRADE` (full)
//! - `CODE title TERM UNITS`
//! - `CODE title TERM GRADE`
//! - `CODE title UNITS GRADE`
//! - `CODE title TERM`
//! - `CODE title UNITS`
//! - `CODE [title]`

use std::sync::LazyLock;

use regex::{Captures, Regex};

use coursepath_shared::{CourseCode, Grade, ParsedCourse};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of parsing one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineParse {
    /// Every field (code, title, term, units, grade) was present.
    Full(ParsedCourse),
    /// A code was found; some trailing fields are absent.
    Partial(ParsedCourse),
    /// No leading course code.
    Unrecognized,
}

impl LineParse {
    pub fn into_course(self) -> Option<ParsedCourse> {
        match self {
            Self::Full(course) | Self::Partial(course) => Some(course),
            Self::Unrecognized => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

const CODE: &str = r"(?P<dept>[A-Z][A-Z&]{1,7})[ \t]?-?[ \t]?(?P<num>\d{1,4}[A-Z]{0,3})";
const TITLE: &str = r"(?:\s+(?P<title>.+?))?";
const TERM: &str = r"(?P<term>(?:AUT|AU|FA|WIN|WI|SPR|SP|SUM|SU)(?:\s?/\s?\d{2}(?:\d{2})?|\s\d{4})|(?:Autumn|Fall|Winter|Spring|Summer)\s+\d{4}|\d{4}-\d{2,4}\s+(?:Autumn|Fall|Winter|Spring|Summer))";
const UNITS: &str = r"(?P<units>\d+(?:\.\d+)?)";
const GRADE: &str = r"(?P<grade>(?i:in\s+progress)|[A-Z]{1,3}[+\-]?\*?)";

/// Tokens that look like department codes but label totals.
const NON_DEPARTMENTS: &[&str] = &["GPA", "UNIT", "UNITS", "TOTAL", "TERM", "YEAR"];

/// A shape attempt: its regex and whether a match means every field was present.
struct Shape {
    re: Regex,
    full: bool,
}

static SHAPES: LazyLock<Vec<Shape>> = LazyLock::new(|| {
    let shapes = [
        (format!(r"^{CODE}{TITLE}\s+{TERM}\s+{UNITS}\s+{GRADE}$"), true),
        (format!(r"^{CODE}{TITLE}\s+{TERM}\s+{UNITS}$"), false),
        (format!(r"^{CODE}{TITLE}\s+{TERM}\s+{GRADE}$"), false),
        (format!(r"^{CODE}{TITLE}\s+{UNITS}\s+{GRADE}$"), false),
        (format!(r"^{CODE}{TITLE}\s+{TERM}$"), false),
        (format!(r"^{CODE}{TITLE}\s+{UNITS}$"), false),
        (format!(r"^{CODE}{TITLE}$"), false),
    ];
    shapes
        .into_iter()
        .map(|(pattern, full)| Shape {
            re: Regex::new(&pattern).expect("course line regex"),
            full,
        })
        .collect()
});

/// A course-code-shaped token anywhere in a line.
static CODE_ANYWHERE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Z&]{1,7}[ \t]?-?[ \t]?\d{1,4}[A-Z]{0,3}\b").expect("code token regex")
});

/// Leading list markers: `-`, `*`, `•`, `+`, `1.`, `2)`.
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•+]|\d{1,2}[.)])\s+").expect("bullet regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Whether a line mentions something shaped like a course code.
///
/// The tokenizer routes such lines here; the ones that fail to parse become
/// unparsed-line diagnostics rather than notes.
pub fn looks_like_course(line: &str) -> bool {
    CODE_ANYWHERE_RE
        .find_iter(line)
        .any(|m| !is_non_department(m.as_str()))
}

/// Parse a single course line.
pub fn parse_course_line(line: &str) -> LineParse {
    let line = BULLET_RE.replace(line.trim(), "");
    let line = line.trim();

    for shape in SHAPES.iter() {
        let Some(caps) = shape.re.captures(line) else {
            continue;
        };
        let Some(course) = course_from_captures(&caps) else {
            return LineParse::Unrecognized;
        };
        return if shape.full {
            LineParse::Full(course)
        } else {
            LineParse::Partial(course)
        };
    }

    LineParse::Unrecognized
}

fn course_from_captures(caps: &Captures<'_>) -> Option<ParsedCourse> {
    let dept = caps.name("dept")?.as_str();
    if NON_DEPARTMENTS.contains(&dept) {
        return None;
    }
    let code = CourseCode::from_parts(dept, caps.name("num")?.as_str())?;

    let mut course = ParsedCourse::new(code);
    if let Some(title) = caps.name("title") {
        course.title = clean_title(title.as_str());
    }
    course.term = caps
        .name("term")
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "));
    course.units = caps.name("units").and_then(|m| parse_units(m.as_str()));
    course.grade = caps.name("grade").map(|m| Grade::new(m.as_str()));

    Some(course)
}

/// Units are a non-negative finite number, or absent. Never defaulted to zero.
fn parse_units(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|units| units.is_finite() && *units >= 0.0)
}

/// Collapse whitespace and trim separator punctuation left between code and title.
fn clean_title(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c == ':' || c == '|' || c.is_whitespace())
        .to_string()
}

fn is_non_department(token: &str) -> bool {
    let dept: String = token.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    NON_DEPARTMENTS.contains(&dept.as_str())
}
