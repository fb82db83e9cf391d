//! Requirement matcher.
//!
//! Credits audit courses to the requirement slots of a program.
//!
//! Assignment is single-claim: slots are processed in schema order, each slot
//! walks the still-unclaimed listings in document order and claims eligible ones
//! until its threshold is met, and a claimed listing is never credited to
//! another slot. Separate passing listings of one code (a repeatable course)
//! are claimed independently. Real audit systems sometimes allow a course to
//! double-count (e.g. a writing course also counting toward a depth area); that
//! is not modelled here. Slot order in the schema decides ties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use coursepath_catalog::{ProgramRequirements, RequirementSchema, Threshold};
use coursepath_shared::{
    AuditMetadata, CourseCode, CoursePathError, Grade, GradeKind, MatchingConfig, ParsedAudit,
    ParsedCourse, Result,
};

/// Which grades count toward requirements.
///
/// Failing and withdrawn grades never count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPolicy {
    pub count_in_progress: bool,
    pub count_incomplete: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            count_in_progress: true,
            count_incomplete: false,
        }
    }
}

impl From<&MatchingConfig> for MatchPolicy {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            count_in_progress: config.count_in_progress,
            count_incomplete: config.count_incomplete,
        }
    }
}

impl MatchPolicy {
    /// Whether a course with this grade may be credited. Ungraded listings count.
    pub fn counts(&self, grade: Option<&Grade>) -> bool {
        let Some(grade) = grade else {
            return true;
        };
        match grade.kind() {
            GradeKind::Fail | GradeKind::Withdrawn => false,
            GradeKind::InProgress => self.count_in_progress,
            GradeKind::Incomplete => self.count_incomplete,
            GradeKind::Letter | GradeKind::Pass | GradeKind::Transfer | GradeKind::Other => true,
        }
    }
}

/// Major/subplan overrides. Unset fields fall back to the audit metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramSelection {
    pub major: Option<String>,
    pub subplan: Option<String>,
}

impl ProgramSelection {
    /// Resolve the major and subplan to look up.
    pub fn resolve(&self, metadata: &AuditMetadata) -> Result<(String, Option<String>)> {
        let major = self
            .major
            .clone()
            .or_else(|| metadata.major.clone())
            .ok_or_else(|| {
                CoursePathError::schema("audit names no major and none was selected")
            })?;
        let subplan = self.subplan.clone().or_else(|| metadata.subplan.clone());
        Ok((major, subplan))
    }
}

/// Progress state of one requirement slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Satisfied,
    PartiallySatisfied,
    Outstanding,
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfied => write!(f, "satisfied"),
            Self::PartiallySatisfied => write!(f, "partially satisfied"),
            Self::Outstanding => write!(f, "outstanding"),
        }
    }
}

/// Outcome for one slot, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotResult {
    pub category: String,
    pub threshold: Threshold,
    pub status: SlotStatus,
    pub credited: Vec<ParsedCourse>,
    pub credited_count: usize,
    /// Sum of known units; courses with unknown units add zero.
    pub credited_units: f64,
    pub remaining: Threshold,
}

impl SlotResult {
    pub fn is_satisfied(&self) -> bool {
        self.status == SlotStatus::Satisfied
    }
}

/// Result of matching an audit against one program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    /// Program label, e.g. `Computer Science / Artificial Intelligence`.
    pub program: String,
    pub slots: Vec<SlotResult>,
    /// Course → category of the first slot that credited a listing of it.
    pub assignments: BTreeMap<CourseCode, String>,
    /// Counting courses that no slot claimed.
    pub unapplied_electives: Vec<ParsedCourse>,
    /// Courses whose grade does not count under the policy.
    pub excluded: Vec<ParsedCourse>,
}

impl MatchReport {
    /// Slots that still need work, in schema order.
    pub fn unmet(&self) -> impl Iterator<Item = &SlotResult> {
        self.slots.iter().filter(|s| !s.is_satisfied())
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(SlotResult::is_satisfied)
    }

    /// The slot a course was credited to, if any.
    pub fn slot_for(&self, code: &CourseCode) -> Option<&str> {
        self.assignments.get(code).map(String::as_str)
    }
}

/// Resolve the program for an audit and match it.
#[instrument(skip_all)]
pub fn match_audit(
    audit: &ParsedAudit,
    schema: &RequirementSchema,
    selection: &ProgramSelection,
    policy: &MatchPolicy,
) -> Result<MatchReport> {
    let (major, subplan) = selection.resolve(&audit.metadata)?;
    let program = schema.program(&major, subplan.as_deref())?;
    Ok(match_program(audit, program, policy))
}

/// Credit audit courses to a program's slots.
#[instrument(skip_all, fields(program = %program.label(), slots = program.slots.len()))]
pub fn match_program(
    audit: &ParsedAudit,
    program: &ProgramRequirements,
    policy: &MatchPolicy,
) -> MatchReport {
    let (counting, excluded): (Vec<&ParsedCourse>, Vec<&ParsedCourse>) = audit
        .courses()
        .partition(|c| policy.counts(c.grade.as_ref()));

    // Claims are per listing, indexed like `counting`.
    let mut claimed = vec![false; counting.len()];
    let mut assignments: BTreeMap<CourseCode, String> = BTreeMap::new();
    let mut slots = Vec::with_capacity(program.slots.len());

    for slot in &program.slots {
        let mut credited: Vec<ParsedCourse> = Vec::new();
        let mut units = 0.0;

        for (idx, course) in counting.iter().enumerate() {
            if slot.threshold.is_met(credited.len(), units) {
                break;
            }
            if claimed[idx] || !slot.eligible.matches_course(course) {
                continue;
            }
            claimed[idx] = true;
            assignments
                .entry(course.code.clone())
                .or_insert_with(|| slot.category.clone());
            units += course.units.unwrap_or(0.0);
            credited.push((*course).clone());
        }

        let status = if slot.threshold.is_met(credited.len(), units) {
            SlotStatus::Satisfied
        } else if credited.is_empty() {
            SlotStatus::Outstanding
        } else {
            SlotStatus::PartiallySatisfied
        };
        debug!(slot = %slot.category, %status, credited = credited.len(), "Matched slot");

        slots.push(SlotResult {
            category: slot.category.clone(),
            threshold: slot.threshold,
            status,
            credited_count: credited.len(),
            credited_units: units,
            remaining: slot.threshold.remaining(credited.len(), units),
            credited,
        });
    }

    let unapplied_electives: Vec<ParsedCourse> = counting
        .into_iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(course, _)| course.clone())
        .collect();

    MatchReport {
        program: program.label(),
        slots,
        assignments,
        unapplied_electives,
        excluded: excluded.into_iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursepath_audit::{AssembleOptions, parse_audit};
    use coursepath_catalog::{Eligibility, RequirementSlot};
    use coursepath_shared::AuditSection;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn code(s: &str) -> CourseCode {
        s.parse().expect("course code")
    }

    fn slot(category: &str, threshold: Threshold, eligible: Eligibility) -> RequirementSlot {
        RequirementSlot {
            category: category.into(),
            threshold,
            eligible,
        }
    }

    fn program(slots: Vec<RequirementSlot>) -> ProgramRequirements {
        ProgramRequirements {
            major: "Computer Science".into(),
            subplan: None,
            slots,
        }
    }

    fn audit(text: &str) -> ParsedAudit {
        parse_audit(text, &AssembleOptions::default()).expect("parse audit")
    }

    #[test]
    fn core_course_satisfies_one_course_slot() {
        let audit = audit("Core\nCS 106B Programming Abstractions AU/23 5 A\n");
        let program = program(vec![slot(
            "Core",
            Threshold::Courses(1),
            Eligibility::Codes(vec![code("CS 106B")]),
        )]);
        let report = match_program(&audit, &program, &MatchPolicy::default());
        assert_eq!(report.slots[0].status, SlotStatus::Satisfied);
        assert_eq!(report.slot_for(&code("CS 106B")), Some("Core"));
        assert!(report.is_complete());
    }

    #[test]
    fn earlier_slot_claims_overlapping_course() {
        let audit = audit("## Courses\nCS 161 Algorithms AU/24 5 A\n");
        let program = program(vec![
            slot("Core", Threshold::Courses(1), Eligibility::Prefix("CS".into())),
            slot("Theory", Threshold::Courses(1), Eligibility::Codes(vec![code("CS 161")])),
        ]);
        let report = match_program(&audit, &program, &MatchPolicy::default());
        assert_eq!(report.slots[0].status, SlotStatus::Satisfied);
        assert_eq!(report.slots[1].status, SlotStatus::Outstanding);
        assert!(report.slots[1].credited.is_empty());
    }

    #[test]
    fn slot_stops_claiming_at_threshold() {
        let audit = audit("## Math\nMATH 51 Linear Algebra AU/23 5 A\nMATH 52 Integrals WI/24 5 B\n");
        let program = program(vec![
            slot("Math", Threshold::Courses(1), Eligibility::Prefix("MATH".into())),
            slot("Elective", Threshold::Courses(1), Eligibility::Prefix("MATH".into())),
        ]);
        let report = match_program(&audit, &program, &MatchPolicy::default());
        assert_eq!(report.slots[0].credited[0].code, code("MATH 51"));
        assert_eq!(report.slots[1].credited[0].code, code("MATH 52"));
    }

    #[test]
    fn unit_thresholds_track_partial_progress() {
        let audit = audit("## Math\nMATH 51 Linear Algebra AU/23 5 A\nMATH 20 Calculus\n");
        let program = program(vec![slot("Math", Threshold::Units(15.0), Eligibility::Prefix("MATH".into()))]);
        let report = match_program(&audit, &program, &MatchPolicy::default());
        let result = &report.slots[0];
        assert_eq!(result.status, SlotStatus::PartiallySatisfied);
        assert_eq!(result.credited_count, 2);
        assert_eq!(result.credited_units, 5.0);
        assert_eq!(result.remaining, Threshold::Units(10.0));
    }

    #[test]
    fn repeated_listings_of_one_code_each_count() {
        let audit = audit(
            "## Research\nCS 199 Independent Study AU/23 3 A\nCS 199 Independent Study WI/24 3 A\n",
        );
        let program = program(vec![slot("Research", Threshold::Units(6.0), Eligibility::Prefix("CS".into()))]);
        let report = match_program(&audit, &program, &MatchPolicy::default());

        let result = &report.slots[0];
        assert_eq!(result.status, SlotStatus::Satisfied);
        assert_eq!(result.credited_count, 2);
        assert_eq!(result.credited_units, 6.0);
        assert!(report.unapplied_electives.is_empty());
        assert_eq!(report.slot_for(&code("CS 199")), Some("Research"));
    }

    #[test]
    fn failing_and_withdrawn_grades_are_excluded() {
        let audit = audit("## AI\nCS 229 Machine Learning WI/25 4 W\nCS 221 AI AU/24 4 F\nCS 224N NLP WI/25 4 IP\n");
        let program = program(vec![slot("AI", Threshold::Courses(2), Eligibility::Prefix("CS".into()))]);

        let report = match_program(&audit, &program, &MatchPolicy::default());
        assert_eq!(report.excluded.len(), 2);
        assert_eq!(report.slots[0].credited_count, 1);

        let strict = MatchPolicy {
            count_in_progress: false,
            ..MatchPolicy::default()
        };
        let report = match_program(&audit, &program, &strict);
        assert_eq!(report.excluded.len(), 3);
        assert_eq!(report.slots[0].status, SlotStatus::Outstanding);
    }

    #[test]
    fn category_slot_uses_section_labels() {
        let audit = audit("## Writing in the Major\nCS 194W Software Project SP/25 4 A\n## Other\nART 101 Drawing\n");
        let program = program(vec![slot(
            "WIM",
            Threshold::Courses(1),
            Eligibility::Category("writing in the major".into()),
        )]);
        let report = match_program(&audit, &program, &MatchPolicy::default());
        assert!(report.is_complete());
        let electives: Vec<String> = report.unapplied_electives.iter().map(|c| c.code.to_string()).collect();
        assert_eq!(electives, ["ART 101"]);
    }

    #[test]
    fn selection_overrides_metadata() {
        let mut metadata = AuditMetadata::default();
        assert!(ProgramSelection::default().resolve(&metadata).is_err());

        metadata.major = Some("Computer Science".into());
        metadata.subplan = Some("Systems".into());
        let selection = ProgramSelection {
            major: None,
            subplan: Some("Theory".into()),
        };
        let (major, subplan) = selection.resolve(&metadata).expect("resolve");
        assert_eq!(major, "Computer Science");
        assert_eq!(subplan.as_deref(), Some("Theory"));
    }

    #[test]
    fn fixture_audit_matches_fixture_schema() {
        let text = std::fs::read_to_string("../../../fixtures/audits/cs-ai-track.txt").expect("read audit");
        let schema = coursepath_catalog::load_schema(std::path::Path::new(
            "../../../fixtures/catalog/requirements.json",
        ))
        .expect("load schema");
        let audit = audit(&text);
        let report =
            match_audit(&audit, &schema, &ProgramSelection::default(), &MatchPolicy::default()).expect("match");

        assert_eq!(report.program, "Computer Science / Artificial Intelligence");
        let statuses: Vec<(&str, SlotStatus)> =
            report.slots.iter().map(|s| (s.category.as_str(), s.status)).collect();
        assert_eq!(
            statuses,
            [
                ("Core", SlotStatus::Satisfied),
                ("Mathematics", SlotStatus::PartiallySatisfied),
                ("Writing in the Major", SlotStatus::Outstanding),
                ("AI Depth", SlotStatus::PartiallySatisfied),
                ("Theory", SlotStatus::Outstanding),
            ]
        );
        assert!(report.excluded.iter().any(|c| c.code == code("CS 229")));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_course() -> impl Strategy<Value = ParsedCourse> {
        (
            prop_oneof![Just("CS"), Just("MATH")],
            100u16..112,
            prop::option::of(1u8..6),
            prop::option::of(prop_oneof![Just("A"), Just("B+"), Just("IP"), Just("F"), Just("W"), Just("I")]),
            prop_oneof![Just("Core"), Just("Depth")],
        )
            .prop_map(|(dept, number, units, grade, section)| {
                let mut course = ParsedCourse::new(
                    CourseCode::from_parts(dept, &number.to_string()).expect("generated code"),
                );
                course.units = units.map(f64::from);
                course.grade = grade.map(Grade::new);
                course.requirement_category = Some(section.to_string());
                course
            })
    }

    fn arb_threshold() -> impl Strategy<Value = Threshold> {
        prop_oneof![
            (1u32..4).prop_map(Threshold::Courses),
            (1u8..12).prop_map(|u| Threshold::Units(f64::from(u))),
        ]
    }

    fn arb_eligibility() -> impl Strategy<Value = Eligibility> {
        prop_oneof![
            Just(Eligibility::Prefix("CS".into())),
            Just(Eligibility::Prefix("CS 10".into())),
            Just(Eligibility::Prefix("MATH".into())),
            Just(Eligibility::Category("Depth".into())),
            Just(Eligibility::Codes(vec![
                CourseCode::from_parts("CS", "101").expect("code"),
                CourseCode::from_parts("MATH", "105").expect("code"),
            ])),
        ]
    }

    proptest! {
        #[test]
        fn every_counting_listing_lands_exactly_once(
            courses in prop::collection::vec(arb_course(), 0..20),
            slot_specs in prop::collection::vec((arb_threshold(), arb_eligibility()), 1..6),
        ) {
            let audit = ParsedAudit {
                sections: vec![AuditSection { name: Some("All".into()), courses, notes: vec![] }],
                ..Default::default()
            };
            let slots = slot_specs
                .into_iter()
                .enumerate()
                .map(|(i, (threshold, eligible))| slot(&format!("Slot {i}"), threshold, eligible))
                .collect();
            let policy = MatchPolicy::default();
            let report = match_program(&audit, &program(slots), &policy);

            let mut listed: BTreeMap<CourseCode, usize> = BTreeMap::new();
            for course in audit.courses().filter(|c| policy.counts(c.grade.as_ref())) {
                *listed.entry(course.code.clone()).or_default() += 1;
            }
            let mut landed: BTreeMap<CourseCode, usize> = BTreeMap::new();
            let mut credited_codes = std::collections::BTreeSet::new();
            for result in &report.slots {
                for course in &result.credited {
                    *landed.entry(course.code.clone()).or_default() += 1;
                    credited_codes.insert(course.code.clone());
                }
                match result.status {
                    SlotStatus::Satisfied => {
                        prop_assert!(result.threshold.is_met(result.credited_count, result.credited_units));
                    }
                    SlotStatus::Outstanding => prop_assert!(result.credited.is_empty()),
                    SlotStatus::PartiallySatisfied => prop_assert!(!result.credited.is_empty()),
                }
            }
            for course in &report.unapplied_electives {
                *landed.entry(course.code.clone()).or_default() += 1;
            }
            prop_assert_eq!(listed, landed);
            let credited_total: usize = report.slots.iter().map(|s| s.credited_count).sum();
            prop_assert_eq!(
                report.excluded.len() + report.unapplied_electives.len() + credited_total,
                audit.course_count()
            );
            let assigned: std::collections::BTreeSet<CourseCode> =
                report.assignments.keys().cloned().collect();
            prop_assert_eq!(credited_codes, assigned);
        }
    }
}
