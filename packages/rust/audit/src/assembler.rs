//! Audit assembler.
//!
//! Turns tokenizer output into a [`ParsedAudit`]: parses course lines, folds
//! exact repeats listed under several sections into one entry, applies the
//! retake policy, and fills in derived summary fields.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use coursepath_shared::{
    AuditDiagnostics, AuditMetadata, AuditSection, AuditSummary, CourseCode, CoursePathError,
    ParsedAudit, ParsedCourse, Result, RetakePolicy, UnparsedLine,
};

use crate::course_line::{self, LineParse};
use crate::tokenizer::{MetadataField, MetadataLine, SummaryField, SummaryLine, TokenizedAudit};

/// Tolerance for comparing unit totals read from text.
const UNIT_EPSILON: f64 = 1e-6;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number regex"));

/// Assembly options.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    pub retake_policy: RetakePolicy,
}

/// Build the full audit document from tokenized text.
///
/// Fails only with [`CoursePathError::UnrecognizedDocumentFormat`], when there is
/// no named section and no parsable course line.
#[instrument(skip_all, fields(sections = tokens.sections.len()))]
pub fn assemble(tokens: TokenizedAudit, options: &AssembleOptions) -> Result<ParsedAudit> {
    let mut diagnostics = AuditDiagnostics {
        preamble: tokens.preamble,
        ..Default::default()
    };

    let metadata = build_metadata(&tokens.metadata_lines);
    let mut summary = build_summary(&tokens.summary_lines, &mut diagnostics);

    let mut sections = build_sections(tokens.sections, &mut diagnostics);

    if options.retake_policy == RetakePolicy::KeepBest {
        diagnostics.superseded = drop_superseded_retakes(&mut sections);
    }

    // A leading unnamed section that produced no courses is only noise.
    if sections
        .first()
        .is_some_and(|s| s.name.is_none() && s.courses.is_empty())
        && sections.iter().any(|s| s.name.is_some())
    {
        let leading = sections.remove(0);
        diagnostics.preamble.extend(leading.notes);
    }

    let course_count: usize = sections.iter().map(|s| s.courses.len()).sum();
    let has_named = sections.iter().any(|s| s.name.is_some());
    if !has_named && course_count == 0 {
        return Err(CoursePathError::UnrecognizedDocumentFormat);
    }

    check_unit_totals(&mut summary, &mut diagnostics);

    for warning in &diagnostics.warnings {
        warn!(%warning, "audit consistency");
    }
    debug!(
        sections = sections.len(),
        courses = course_count,
        unparsed = diagnostics.unparsed_lines.len(),
        "audit assembled"
    );

    Ok(ParsedAudit {
        metadata,
        summary,
        sections,
        diagnostics,
    })
}

// ---------------------------------------------------------------------------
// Metadata and summary
// ---------------------------------------------------------------------------

fn build_metadata(lines: &[MetadataLine]) -> AuditMetadata {
    let mut meta = AuditMetadata::default();
    for line in lines {
        let slot = match line.field {
            MetadataField::StudentName => &mut meta.student_name,
            MetadataField::StudentId => &mut meta.student_id,
            MetadataField::AuditDate => &mut meta.audit_date,
            MetadataField::Degree => &mut meta.degree,
            MetadataField::Major => &mut meta.major,
            MetadataField::Subplan => &mut meta.subplan,
        };
        *slot = Some(line.value.clone());
    }
    meta
}

fn build_summary(lines: &[SummaryLine], diagnostics: &mut AuditDiagnostics) -> AuditSummary {
    let mut summary = AuditSummary::default();
    for line in lines {
        let Some(value) = first_number(&line.value) else {
            diagnostics
                .warnings
                .push(format!("could not read a number from summary value '{}'", line.value));
            continue;
        };
        let slot = match line.field {
            SummaryField::UnitsRequired => &mut summary.units_required,
            SummaryField::UnitsCompleted => &mut summary.units_completed,
            SummaryField::UnitsInProgress => &mut summary.units_in_progress,
            SummaryField::UnitsNeeded => &mut summary.units_needed,
            SummaryField::CumulativeGpa => &mut summary.cumulative_gpa,
        };
        *slot = Some(value);
    }
    summary
}

fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Derive `units_needed` when absent and flag totals that do not add up.
fn check_unit_totals(summary: &mut AuditSummary, diagnostics: &mut AuditDiagnostics) {
    let (Some(required), Some(completed), Some(in_progress)) = (
        summary.units_required,
        summary.units_completed,
        summary.units_in_progress,
    ) else {
        return;
    };

    let derived = required - completed - in_progress;
    if derived < -UNIT_EPSILON {
        diagnostics.warnings.push(format!(
            "units completed ({completed}) plus in progress ({in_progress}) exceed units required ({required})"
        ));
    }

    match summary.units_needed {
        None => summary.units_needed = Some(derived.max(0.0)),
        Some(stated) if (stated - derived.max(0.0)).abs() > UNIT_EPSILON => {
            diagnostics.warnings.push(format!(
                "stated units needed ({stated}) differs from required minus completed minus in progress ({})",
                derived.max(0.0)
            ));
        }
        Some(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Sections and courses
// ---------------------------------------------------------------------------

fn build_sections(
    raw_sections: Vec<crate::tokenizer::RawSection>,
    diagnostics: &mut AuditDiagnostics,
) -> Vec<AuditSection> {
    let mut sections: Vec<AuditSection> = Vec::with_capacity(raw_sections.len());
    // code -> (section index, course index) of every kept entry
    let mut kept: HashMap<CourseCode, Vec<(usize, usize)>> = HashMap::new();

    for raw in raw_sections {
        let section_idx = sections.len();
        let mut section = AuditSection {
            name: raw.name,
            courses: Vec::new(),
            notes: raw.notes,
        };

        for line in raw.course_lines {
            let Some(mut course) = course_line::parse_course_line(&line.text).into_course() else {
                diagnostics.unparsed_lines.push(UnparsedLine {
                    line_number: line.line_number,
                    section: section.name.clone(),
                    text: line.text,
                });
                continue;
            };
            course.requirement_category = section.name.clone();

            let earlier = kept.get(&course.code).and_then(|positions| {
                positions.iter().copied().find(|&(s, c)| {
                    let other = if s == section_idx {
                        &section.courses[c]
                    } else {
                        &sections[s].courses[c]
                    };
                    other.is_exact_repeat_of(&course)
                })
            });

            match earlier {
                Some((s, c)) => {
                    if s != section_idx {
                        record_also_listed(&mut sections[s].courses[c], section.name.as_deref());
                    }
                    debug!(code = %course.code, "folded exact repeat");
                }
                None => {
                    kept.entry(course.code.clone())
                        .or_default()
                        .push((section_idx, section.courses.len()));
                    section.courses.push(course);
                }
            }
        }

        sections.push(section);
    }

    sections
}

fn record_also_listed(course: &mut ParsedCourse, section: Option<&str>) {
    let Some(name) = section else {
        return;
    };
    let already = course.categories().any(|c| c == name);
    if !already {
        course.also_listed_under.push(name.to_string());
    }
}

/// Keep one listing per course code; return the dropped ones.
///
/// The kept listing is the first one that earns credit, preferring the latest
/// recognizable term, then document order.
fn drop_superseded_retakes(sections: &mut [AuditSection]) -> Vec<ParsedCourse> {
    let mut by_code: HashMap<CourseCode, Vec<(usize, usize)>> = HashMap::new();
    for (s, section) in sections.iter().enumerate() {
        for (c, course) in section.courses.iter().enumerate() {
            by_code.entry(course.code.clone()).or_default().push((s, c));
        }
    }

    let mut drop: Vec<(usize, usize)> = Vec::new();
    for positions in by_code.values().filter(|p| p.len() > 1) {
        let best = positions
            .iter()
            .copied()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| {
                let ca = &sections[a.0].courses[a.1];
                let cb = &sections[b.0].courses[b.1];
                earns_credit(ca)
                    .cmp(&earns_credit(cb))
                    .then(ca.parsed_term().cmp(&cb.parsed_term()))
                    // earlier in the document wins ties
                    .then(ib.cmp(ia))
            })
            .map(|(_, pos)| pos);
        drop.extend(positions.iter().copied().filter(|p| Some(*p) != best));
    }

    // Remove from the back so earlier indices stay valid.
    drop.sort_unstable_by(|a, b| b.cmp(a));
    let mut superseded: Vec<ParsedCourse> = drop
        .into_iter()
        .map(|(s, c)| sections[s].courses.remove(c))
        .collect();
    superseded.reverse();
    superseded
}

fn earns_credit(course: &ParsedCourse) -> bool {
    course
        .grade
        .as_ref()
        .is_none_or(|g| !g.kind().is_unsuccessful())
}
