//! Shared types, error model, and configuration for coursepath.
//!
//! This crate is the foundation depended on by all other coursepath crates.
//! It provides:
//! - [`CoursePathError`]: the unified error type
//! - Domain types ([`CourseCode`], [`Term`], [`Grade`], [`ParsedCourse`], [`ParsedAudit`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, MatchingConfig, PlanningConfig, RetakePolicy, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CoursePathError, Result};
pub use types::{
    AuditDiagnostics, AuditMetadata, AuditSection, AuditSummary, CourseCode, Grade, GradeKind,
    ParsedAudit, ParsedCourse, Season, Term, UnparsedLine,
};
