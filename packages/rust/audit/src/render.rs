//! Re-serialize a parsed audit back to audit text.
//!
//! The output uses the grammar the tokenizer reads (`Key: value` lines,
//! `== Name ==` headings, `CODE title term units grade` course lines), so
//! parsing it again yields the same courses, section order, and summary.

use coursepath_shared::{ParsedAudit, ParsedCourse};

use crate::tokenizer;

/// Render an audit as plain text.
pub fn render_audit(audit: &ParsedAudit) -> String {
    let mut lines: Vec<String> = Vec::new();

    // Free-text preamble goes above the key lines so it never sits directly
    // over a leading course line, where a title-like note reads as a heading.
    // Repeated keys go below so they stay repeats.
    let (keyed, free): (Vec<&String>, Vec<&String>) = audit
        .diagnostics
        .preamble
        .iter()
        .partition(|note| tokenizer::is_key_line(note));
    lines.extend(free.into_iter().cloned());

    let meta = &audit.metadata;
    let metadata = [
        ("Student Name", &meta.student_name),
        ("Student ID", &meta.student_id),
        ("Audit Date", &meta.audit_date),
        ("Degree", &meta.degree),
        ("Major", &meta.major),
        ("Subplan", &meta.subplan),
    ];
    for (label, value) in metadata {
        if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
        }
    }

    let summary = &audit.summary;
    let totals = [
        ("Units Required", summary.units_required),
        ("Units Completed", summary.units_completed),
        ("Units In Progress", summary.units_in_progress),
        ("Units Needed", summary.units_needed),
        ("Cumulative GPA", summary.cumulative_gpa),
    ];
    for (label, value) in totals {
        if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
        }
    }

    lines.extend(keyed.into_iter().cloned());

    for section in &audit.sections {
        lines.push(String::new());
        if let Some(name) = &section.name {
            lines.push(format!("== {name} =="));
        }
        lines.extend(section.courses.iter().map(render_course));
        // Entries folded into an earlier section are listed here again so the
        // section association survives a re-parse.
        if let Some(name) = &section.name {
            lines.extend(
                audit
                    .courses()
                    .filter(|c| c.also_listed_under.iter().any(|n| n == name))
                    .map(render_course),
            );
        }
        lines.extend(section.notes.iter().cloned());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render one course line with only the fields that are present.
pub fn render_course(course: &ParsedCourse) -> String {
    let mut parts: Vec<String> = vec![course.code.to_string()];
    if !course.title.is_empty() {
        parts.push(course.title.clone());
    }
    if let Some(term) = &course.term {
        parts.push(term.clone());
    }
    if let Some(units) = course.units {
        parts.push(units.to_string());
    }
    if let Some(grade) = &course.grade {
        parts.push(grade.to_string());
    }
    parts.join(" ")
}
