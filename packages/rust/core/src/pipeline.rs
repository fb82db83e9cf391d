//! End-to-end pipeline: audit text → parse → match → plan.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use coursepath_audit::{AssembleOptions, parse_audit};
use coursepath_catalog::{CourseIndex, RequirementSchema};
use coursepath_shared::{AppConfig, CourseCode, ParsedAudit, Result, Term, UnparsedLine};

use crate::matcher::{MatchPolicy, MatchReport, ProgramSelection, match_program};
use crate::planner::{Plan, PlanOptions, plan_remaining, taken_codes};

/// Runtime options for [`run`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub assemble: AssembleOptions,
    pub matching: MatchPolicy,
    pub planning: PlanOptions,
    pub selection: ProgramSelection,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            assemble: AssembleOptions {
                retake_policy: config.matching.retake_policy,
            },
            matching: MatchPolicy::from(&config.matching),
            planning: PlanOptions::from_config(&config.planning),
            selection: ProgramSelection::default(),
        }
    }
}

/// Everything worth reporting that did not stop the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineDiagnostics {
    pub unparsed_lines: Vec<UnparsedLine>,
    pub warnings: Vec<String>,
    pub unapplied_electives: Vec<CourseCode>,
    pub excluded_courses: Vec<CourseCode>,
    pub index_unavailable: bool,
    /// Term offerings were filtered from, when one applied.
    pub planning_from: Option<Term>,
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub audit: ParsedAudit,
    pub matches: MatchReport,
    pub plan: Plan,
    pub diagnostics: PipelineDiagnostics,
}

/// Parse an audit, match it against its program, and plan the remainder.
///
/// Passing `None` for `index` degrades planning to the schema's explicit codes.
/// When no `not_before` term is configured, the term containing the audit date
/// is used.
#[instrument(skip_all, fields(bytes = text.len(), index = index.is_some()))]
pub fn run(
    text: &str,
    schema: &RequirementSchema,
    index: Option<&CourseIndex>,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    let audit = parse_audit(text, &options.assemble)?;
    debug!(
        sections = audit.sections.len(),
        courses = audit.course_count(),
        "Parsed audit"
    );

    let (major, subplan) = options.selection.resolve(&audit.metadata)?;
    let program = schema.program(&major, subplan.as_deref())?;
    let matches = match_program(&audit, program, &options.matching);

    if index.is_none() {
        warn!("Course index unavailable; planning from explicit requirement codes only");
    }

    let mut planning = options.planning;
    if planning.not_before.is_none() {
        planning.not_before = audit.metadata.audit_date_parsed().map(Term::containing);
    }
    let plan = plan_remaining(&matches, program, &taken_codes(&audit), index, &planning);

    let unmet = matches.unmet().count();
    info!(
        program = %matches.program,
        satisfied = matches.slots.len() - unmet,
        unmet,
        "Audit checked"
    );

    let diagnostics = PipelineDiagnostics {
        unparsed_lines: audit.diagnostics.unparsed_lines.clone(),
        warnings: audit.diagnostics.warnings.clone(),
        unapplied_electives: matches.unapplied_electives.iter().map(|c| c.code.clone()).collect(),
        excluded_courses: matches.excluded.iter().map(|c| c.code.clone()).collect(),
        index_unavailable: index.is_none(),
        planning_from: planning.not_before,
    };

    Ok(PipelineOutput {
        audit,
        matches,
        plan,
        diagnostics,
    })
}
