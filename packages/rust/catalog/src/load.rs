//! Load requirement schemas and course indexes from JSON or TOML files.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use coursepath_shared::{CoursePathError, Result};

use crate::index::{CourseIndex, IndexDocument};
use crate::schema::RequirementSchema;

/// Load a requirement schema. Read and decode failures are fatal.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_schema(path: &Path) -> Result<RequirementSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| CoursePathError::io(path, e))?;
    let schema: RequirementSchema = decode(path, &content).map_err(|e| {
        CoursePathError::schema(format!("failed to parse {}: {e}", path.display()))
    })?;
    debug!(programs = schema.programs.len(), "Loaded requirement schema");
    Ok(schema)
}

/// Load a course index. Every failure maps to `CourseIndexUnavailable`, which
/// callers treat as recoverable.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_course_index(path: &Path) -> Result<CourseIndex> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoursePathError::index_unavailable(format!("cannot read {}: {e}", path.display()))
    })?;
    let doc: IndexDocument = decode(path, &content).map_err(|e| {
        CoursePathError::index_unavailable(format!("failed to parse {}: {e}", path.display()))
    })?;
    let index = CourseIndex::from(doc);
    debug!(courses = index.len(), "Loaded course index");
    Ok(index)
}

/// Decode by file extension: `.toml` as TOML, anything else as JSON.
fn decode<T: DeserializeOwned>(path: &Path, content: &str) -> std::result::Result<T, String> {
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Threshold;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = "../../../fixtures/catalog/requirements.json";
    const INDEX: &str = "../../../fixtures/catalog/offerings.json";

    #[test]
    fn fixture_schema_loads_and_validates() {
        let schema = load_schema(Path::new(SCHEMA)).expect("load schema");
        let program = schema
            .program("Computer Science", Some("Artificial Intelligence"))
            .expect("program");
        let categories: Vec<&str> = program.slots.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(
            categories,
            ["Core", "Mathematics", "Writing in the Major", "AI Depth", "Theory"]
        );
        assert_eq!(program.slots[1].threshold, Threshold::Units(15.0));
    }

    #[test]
    fn fixture_index_merges_duplicate_rows() {
        let index = load_course_index(Path::new(INDEX)).expect("load index");
        let math53 = index.get(&"MATH 53".parse().expect("code")).expect("MATH 53");
        let unique: std::collections::HashSet<&String> = math53.offered.iter().collect();
        assert_eq!(unique.len(), math53.offered.len());
    }

    #[test]
    fn missing_index_is_recoverable() {
        let err = load_course_index(Path::new("/nonexistent/offerings.json")).unwrap_err();
        assert!(matches!(err, CoursePathError::CourseIndexUnavailable { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_schema_is_fatal() {
        let err = load_schema(Path::new("/nonexistent/requirements.json")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn toml_schema_decodes_by_extension() {
        let toml = r#"
[[programs]]
major = "Physics"

[[programs.slots]]
category = "Mechanics"
threshold = { courses = 2 }
eligible = { prefix = "PHYS 4" }
"#;
        let schema: RequirementSchema =
            decode(Path::new("requirements.toml"), toml).expect("decode toml");
        let program = schema.program("Physics", None).expect("program");
        assert_eq!(program.slots[0].threshold, Threshold::Courses(2));
    }
}
