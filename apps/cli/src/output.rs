//! Plain-text report for `coursepath check`.

use coursepath_catalog::Threshold;
use coursepath_core::{PipelineOutput, SlotResult, SlotStatus};

/// Render a pipeline result as a human-readable report.
pub(crate) fn render_check(output: &PipelineOutput) -> String {
    let mut lines: Vec<String> = vec![format!("Program: {}", output.matches.program)];
    if let Some(name) = &output.audit.metadata.student_name {
        lines.push(format!("Student: {name}"));
    }

    lines.push(String::new());
    lines.push("Requirements".into());
    let width = output
        .matches
        .slots
        .iter()
        .map(|s| s.category.len())
        .max()
        .unwrap_or(0);
    for slot in &output.matches.slots {
        lines.push(format!(
            "  [{}] {:<width$}  {}",
            status_mark(slot.status),
            slot.category,
            progress(slot)
        ));
    }

    if !output.plan.slots.is_empty() {
        lines.push(String::new());
        lines.push("Remaining courses".into());
        for slot in &output.plan.slots {
            lines.push(format!("  {} ({} remaining)", slot.category, slot.remaining));
            if slot.candidates.is_empty() {
                lines.push("    no candidates found".into());
            }
            for course in &slot.candidates {
                let offered = if course.quarters_offered.is_empty() {
                    "offering unknown".to_string()
                } else {
                    course.quarters_offered.join(", ")
                };
                let mut line = format!("    {}", course.code);
                if !course.title.is_empty() {
                    line.push_str("  ");
                    line.push_str(&course.title);
                }
                line.push_str(&format!("  [{offered}]"));
                lines.push(line);
            }
            if slot.omitted > 0 {
                lines.push(format!("    (+{} more)", slot.omitted));
            }
        }
    }

    let diagnostics = &output.diagnostics;
    let mut notes: Vec<String> = Vec::new();
    if diagnostics.index_unavailable {
        notes.push("course index unavailable; offerings not shown".into());
    }
    if let Some(term) = diagnostics.planning_from {
        notes.push(format!("offerings from {term} onward"));
    }
    for line in &diagnostics.unparsed_lines {
        let section = line.section.as_deref().unwrap_or("-");
        notes.push(format!("unparsed line {} ({section}): {}", line.line_number, line.text));
    }
    notes.extend(diagnostics.warnings.iter().cloned());
    if !diagnostics.excluded_courses.is_empty() {
        notes.push(format!("not counted: {}", join_codes(&diagnostics.excluded_courses)));
    }
    if !diagnostics.unapplied_electives.is_empty() {
        notes.push(format!(
            "unapplied: {}",
            join_codes(&diagnostics.unapplied_electives)
        ));
    }
    if !notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes".into());
        lines.extend(notes.into_iter().map(|note| format!("  {note}")));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn status_mark(status: SlotStatus) -> char {
    match status {
        SlotStatus::Satisfied => 'x',
        SlotStatus::PartiallySatisfied => '~',
        SlotStatus::Outstanding => ' ',
    }
}

fn progress(slot: &SlotResult) -> String {
    match slot.threshold {
        Threshold::Courses(n) => format!("{}/{n} courses", slot.credited_count),
        Threshold::Units(u) => format!("{}/{u} units", slot.credited_units),
    }
}

fn join_codes<T: std::fmt::Display>(codes: &[T]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursepath_catalog::load_schema;
    use coursepath_core::{PipelineOptions, run};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn fixture_output() -> PipelineOutput {
        let text = std::fs::read_to_string("../../fixtures/audits/cs-ai-track.txt")
            .expect("read audit fixture");
        let schema =
            load_schema(Path::new("../../fixtures/catalog/requirements.json")).expect("schema");
        run(&text, &schema, None, &PipelineOptions::default()).expect("run")
    }

    #[test]
    fn report_lists_slots_and_remaining_courses() {
        let report = render_check(&fixture_output());
        assert!(report.starts_with("Program: Computer Science / Artificial Intelligence\n"));
        assert!(report.contains("[x] Core"));
        assert!(report.contains("[~] Mathematics"));
        assert!(report.contains("10/15 units"));
        assert!(report.contains("  Theory (1 course remaining)\n    CS 161  [offering unknown]"));
        assert!(report.contains("course index unavailable"));
        assert!(report.contains("not counted: CS 229"));
        assert!(report.ends_with('\n') && !report.ends_with("\n\n"));
    }

    #[test]
    fn requirement_rows_align_on_the_longest_category() {
        let report = render_check(&fixture_output());
        let rows: Vec<&str> = report
            .lines()
            .skip_while(|l| *l != "Requirements")
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "  [x] Core                  4/4 courses");
    }
}
