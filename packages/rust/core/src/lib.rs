//! Requirement matching and remaining-course planning for CoursePath.
//!
//! This crate ties the audit parser and the catalog datasets together into the
//! end-to-end `check` workflow ([`pipeline::run`]).

pub mod matcher;
pub mod pipeline;
pub mod planner;

pub use matcher::{
    MatchPolicy, MatchReport, ProgramSelection, SlotResult, SlotStatus, match_audit, match_program,
};
pub use pipeline::{PipelineDiagnostics, PipelineOptions, PipelineOutput, run};
pub use planner::{Plan, PlanOptions, RemainingCourse, SlotPlan, plan_remaining, taken_codes};
