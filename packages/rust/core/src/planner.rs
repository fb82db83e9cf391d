//! Remaining-course planner.
//!
//! For every slot the matcher left unmet, lists courses that could fill it and
//! when they are next offered.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, instrument};

use coursepath_catalog::{CourseIndex, ProgramRequirements, RequirementSlot, Threshold};
use coursepath_shared::{CourseCode, ParsedAudit, PlanningConfig, Term};

use crate::matcher::{MatchReport, SlotResult, SlotStatus};

/// Planning knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Offerings before this term are dropped.
    pub not_before: Option<Term>,
    pub max_candidates_per_slot: Option<usize>,
}

impl PlanOptions {
    /// Build options from config. An unparseable term label is treated as unset;
    /// `load_config_from` rejects those up front.
    pub fn from_config(config: &PlanningConfig) -> Self {
        Self {
            not_before: config.not_before().ok().flatten(),
            max_candidates_per_slot: config.max_candidates_per_slot,
        }
    }
}

/// A course that would count toward an unmet slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemainingCourse {
    pub code: CourseCode,
    /// Empty when the course is not in the index.
    pub title: String,
    /// The slot this course would satisfy.
    pub requirement_category: String,
    /// Term labels as listed in the index, in index order. May be empty.
    pub quarters_offered: Vec<String>,
}

/// Candidates for one unmet slot, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotPlan {
    pub category: String,
    pub status: SlotStatus,
    pub remaining: Threshold,
    pub candidates: Vec<RemainingCourse>,
    /// Candidates cut by `max_candidates_per_slot`.
    pub omitted: usize,
}

/// Plan for every unmet slot, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub slots: Vec<SlotPlan>,
    pub index_available: bool,
}

impl Plan {
    /// All candidates, slot by slot.
    pub fn remaining_courses(&self) -> Vec<RemainingCourse> {
        self.slots
            .iter()
            .flat_map(|s| s.candidates.iter().cloned())
            .collect()
    }
}

/// Codes the student need not take again: every listing except failed or
/// withdrawn ones.
pub fn taken_codes(audit: &ParsedAudit) -> BTreeSet<CourseCode> {
    audit
        .courses()
        .filter(|c| !c.grade.as_ref().is_some_and(|g| g.kind().is_unsuccessful()))
        .map(|c| c.code.clone())
        .collect()
}

/// Build a plan for the unmet slots of `report`.
///
/// `report.slots` must be the result of matching `program`, so both are in the
/// same order.
#[instrument(skip_all, fields(program = %report.program, index = index.is_some()))]
pub fn plan_remaining(
    report: &MatchReport,
    program: &ProgramRequirements,
    taken: &BTreeSet<CourseCode>,
    index: Option<&CourseIndex>,
    options: &PlanOptions,
) -> Plan {
    let slots: Vec<SlotPlan> = report
        .slots
        .iter()
        .zip(&program.slots)
        .filter(|(result, _)| !result.is_satisfied())
        .map(|(result, slot)| plan_slot(result, slot, taken, index, options))
        .collect();

    debug!(
        unmet_slots = slots.len(),
        candidates = slots.iter().map(|s| s.candidates.len()).sum::<usize>(),
        "Planned remaining courses"
    );

    Plan {
        slots,
        index_available: index.is_some(),
    }
}

fn plan_slot(
    result: &SlotResult,
    slot: &RequirementSlot,
    taken: &BTreeSet<CourseCode>,
    index: Option<&CourseIndex>,
    options: &PlanOptions,
) -> SlotPlan {
    let mut seen: BTreeSet<&CourseCode> = BTreeSet::new();
    let mut candidates: Vec<(Option<Term>, RemainingCourse)> = Vec::new();

    if let Some(index) = index {
        for course in index.matching(&slot.eligible) {
            if taken.contains(&course.code) || !seen.insert(&course.code) {
                continue;
            }
            let offered = offerings_from(&course.offered, options.not_before);
            candidates.push((
                next_offering(&offered),
                RemainingCourse {
                    code: course.code.clone(),
                    title: course.title.clone(),
                    requirement_category: slot.category.clone(),
                    quarters_offered: offered,
                },
            ));
        }
    }

    // Listed codes the index does not know about are still worth surfacing.
    for code in slot.eligible.explicit_codes() {
        if taken.contains(code) || !seen.insert(code) {
            continue;
        }
        candidates.push((
            None,
            RemainingCourse {
                code: code.clone(),
                title: String::new(),
                requirement_category: slot.category.clone(),
                quarters_offered: Vec::new(),
            },
        ));
    }

    // Soonest offering first; unknown offerings last; code breaks ties.
    candidates.sort_by(|(a_term, a), (b_term, b)| {
        (a_term.is_none(), a_term, &a.code).cmp(&(b_term.is_none(), b_term, &b.code))
    });

    let mut candidates: Vec<RemainingCourse> = candidates.into_iter().map(|(_, c)| c).collect();
    let mut omitted = 0;
    if let Some(max) = options.max_candidates_per_slot {
        omitted = candidates.len().saturating_sub(max);
        candidates.truncate(max);
    }

    SlotPlan {
        category: slot.category.clone(),
        status: result.status,
        remaining: result.remaining,
        candidates,
        omitted,
    }
}

/// Drop offerings before `not_before`. Labels that are not terms (`TBA`) are kept.
fn offerings_from(offered: &[String], not_before: Option<Term>) -> Vec<String> {
    offered
        .iter()
        .filter(|label| match (Term::parse(label), not_before) {
            (Some(term), Some(floor)) => term >= floor,
            _ => true,
        })
        .cloned()
        .collect()
}

fn next_offering(offered: &[String]) -> Option<Term> {
    offered.iter().filter_map(|label| Term::parse(label)).min()
}
