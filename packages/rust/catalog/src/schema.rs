//! Requirement schema: major/subplan → ordered requirement slots.

use serde::{Deserialize, Serialize};

use coursepath_shared::{CourseCode, CoursePathError, ParsedCourse, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Root of the requirement dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementSchema {
    #[serde(default)]
    pub programs: Vec<ProgramRequirements>,
}

/// Requirements for one major, optionally narrowed to a subplan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRequirements {
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subplan: Option<String>,
    /// Slots in declared order. Earlier slots claim ambiguous courses first.
    pub slots: Vec<RequirementSlot>,
}

/// One named obligation within a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementSlot {
    pub category: String,
    pub threshold: Threshold,
    pub eligible: Eligibility,
}

/// How much credited work satisfies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Courses(u32),
    Units(f64),
}

/// Which courses may be credited to a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// Explicit list of course codes.
    Codes(Vec<CourseCode>),
    /// Department (`MATH`) or department plus number prefix (`CS 1`).
    Prefix(String),
    /// Audit section name, or course index tag.
    Category(String),
    /// Any of the nested predicates.
    AnyOf(Vec<Eligibility>),
}

// ---------------------------------------------------------------------------
// Lookup and validation
// ---------------------------------------------------------------------------

impl RequirementSchema {
    /// Select the program for a major/subplan, then validate it.
    ///
    /// An exact major+subplan entry wins; otherwise the major's entry without a
    /// subplan is used. Names compare case-insensitively.
    pub fn program(&self, major: &str, subplan: Option<&str>) -> Result<&ProgramRequirements> {
        let exact = subplan.and_then(|sub| {
            self.programs.iter().find(|p| {
                same_name(&p.major, major) && p.subplan.as_deref().is_some_and(|s| same_name(s, sub))
            })
        });
        let program = exact
            .or_else(|| {
                self.programs
                    .iter()
                    .find(|p| same_name(&p.major, major) && p.subplan.is_none())
            })
            .ok_or_else(|| {
                let wanted = match subplan {
                    Some(sub) => format!("{major} / {sub}"),
                    None => major.to_string(),
                };
                CoursePathError::schema(format!("no requirements defined for '{wanted}'"))
            })?;

        program.validate()?;
        Ok(program)
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl ProgramRequirements {
    /// Human-readable program label, e.g. `Computer Science / Artificial Intelligence`.
    pub fn label(&self) -> String {
        match &self.subplan {
            Some(sub) => format!("{} / {sub}", self.major),
            None => self.major.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(CoursePathError::schema(format!(
                "program '{}' has no requirement slots",
                self.label()
            )));
        }
        for (idx, slot) in self.slots.iter().enumerate() {
            slot.validate().map_err(|reason| {
                CoursePathError::schema(format!(
                    "program '{}', slot {} ('{}'): {reason}",
                    self.label(),
                    idx + 1,
                    slot.category
                ))
            })?;
        }
        Ok(())
    }
}

impl RequirementSlot {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("empty category label".into());
        }
        match self.threshold {
            Threshold::Courses(0) => return Err("course threshold must be at least 1".into()),
            Threshold::Units(units) if !(units.is_finite() && units > 0.0) => {
                return Err(format!("unit threshold must be positive, got {units}"));
            }
            _ => {}
        }
        self.eligible.validate()
    }
}

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

impl Threshold {
    /// Whether `courses` credited courses totalling `units` meet the threshold.
    pub fn is_met(&self, courses: usize, units: f64) -> bool {
        match *self {
            Self::Courses(n) => courses >= n as usize,
            Self::Units(needed) => units >= needed,
        }
    }

    /// What is still missing after crediting `courses` / `units`.
    pub fn remaining(&self, courses: usize, units: f64) -> Threshold {
        match *self {
            Self::Courses(n) => Self::Courses(n.saturating_sub(courses as u32)),
            Self::Units(needed) => Self::Units((needed - units).max(0.0)),
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Courses(1) => write!(f, "1 course"),
            Self::Courses(n) => write!(f, "{n} courses"),
            Self::Units(u) => write!(f, "{u} units"),
        }
    }
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

impl Eligibility {
    /// Whether a course with this code and these category labels/tags is eligible.
    pub fn matches(&self, code: &CourseCode, tags: &[&str]) -> bool {
        match self {
            Self::Codes(codes) => codes.contains(code),
            Self::Prefix(prefix) => prefix_matches(prefix, code),
            Self::Category(category) => tags.iter().any(|t| same_name(t, category)),
            Self::AnyOf(options) => options.iter().any(|e| e.matches(code, tags)),
        }
    }

    /// Eligibility of a course from an audit: by code, or by the sections it was listed under.
    pub fn matches_course(&self, course: &ParsedCourse) -> bool {
        let categories: Vec<&str> = course.categories().collect();
        self.matches(&course.code, &categories)
    }

    /// Every explicitly listed code, in declaration order.
    pub fn explicit_codes(&self) -> Vec<&CourseCode> {
        match self {
            Self::Codes(codes) => codes.iter().collect(),
            Self::AnyOf(options) => options.iter().flat_map(Eligibility::explicit_codes).collect(),
            Self::Prefix(_) | Self::Category(_) => Vec::new(),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Codes(codes) if codes.is_empty() => Err("empty code list".into()),
            Self::Prefix(prefix) if split_prefix(prefix).is_none() => {
                Err(format!("invalid prefix '{prefix}'"))
            }
            Self::Category(category) if category.trim().is_empty() => {
                Err("empty category tag".into())
            }
            Self::AnyOf(options) if options.is_empty() => Err("empty any_of list".into()),
            Self::AnyOf(options) => options.iter().try_for_each(Eligibility::validate),
            _ => Ok(()),
        }
    }
}

/// Split a prefix into an uppercase department and an optional number prefix.
fn split_prefix(prefix: &str) -> Option<(String, String)> {
    let prefix = prefix.trim();
    let dept_len = prefix
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '&'))
        .unwrap_or(prefix.len());
    let dept = prefix[..dept_len].to_ascii_uppercase();
    let number = prefix[dept_len..]
        .trim_start_matches(|c: char| c.is_whitespace() || c == '-')
        .to_ascii_uppercase();

    let valid_dept = dept.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid_number = number.chars().all(|c| c.is_ascii_alphanumeric());
    (valid_dept && valid_number).then_some((dept, number))
}

/// `MATH` matches department `MATH` only; `CS 1` matches `CS 1xx`.
fn prefix_matches(prefix: &str, code: &CourseCode) -> bool {
    split_prefix(prefix).is_some_and(|(dept, number)| {
        code.dept() == dept && code.number().starts_with(number.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn schema() -> RequirementSchema {
        RequirementSchema {
            programs: vec![
                ProgramRequirements {
                    major: "Computer Science".into(),
                    subplan: None,
                    slots: vec![slot("Core", Threshold::Courses(1), Eligibility::Codes(vec![code("CS 106B")]))],
                },
                ProgramRequirements {
                    major: "Computer Science".into(),
                    subplan: Some("Systems".into()),
                    slots: vec![slot("Systems", Threshold::Courses(1), Eligibility::Prefix("CS 14".into()))],
                },
            ],
        }
    }

    #[test]
    fn deserializes_thresholds_and_predicates() {
        let json = r#"{
            "programs": [{
                "major": "Mathematics",
                "slots": [
                    { "category": "Analysis", "threshold": { "units": 10 }, "eligible": { "prefix": "MATH 1" } },
                    { "category": "Writing", "threshold": { "courses": 1 },
                      "eligible": { "any_of": [ { "codes": ["MATH 110"] }, { "category": "WIM" } ] } }
                ]
            }]
        }"#;
        let schema: RequirementSchema = serde_json::from_str(json).expect("deserialize");
        let program = &schema.programs[0];
        assert_eq!(program.slots[0].threshold, Threshold::Units(10.0));
        assert_eq!(program.slots[0].eligible, Eligibility::Prefix("MATH 1".into()));
        assert!(matches!(program.slots[1].eligible, Eligibility::AnyOf(ref opts) if opts.len() == 2));
    }

    #[test]
    fn program_lookup_prefers_subplan_then_falls_back() {
        let schema = schema();
        let systems = schema.program("computer science", Some("systems")).expect("subplan");
        assert_eq!(systems.slots[0].category, "Systems");

        let fallback = schema.program("Computer Science", Some("Theory")).expect("fallback");
        assert_eq!(fallback.slots[0].category, "Core");

        let err = schema.program("History", None).unwrap_err();
        assert!(matches!(err, CoursePathError::InvalidRequirementSchema { .. }));
    }

    #[test]
    fn invalid_slots_are_rejected() {
        let program = ProgramRequirements {
            major: "Physics".into(),
            subplan: None,
            slots: vec![slot("Labs", Threshold::Courses(0), Eligibility::Prefix("PHYS".into()))],
        };
        assert!(program.validate().unwrap_err().to_string().contains("at least 1"));

        let program = ProgramRequirements {
            major: "Physics".into(),
            subplan: None,
            slots: vec![slot("Labs", Threshold::Units(3.0), Eligibility::Codes(vec![]))],
        };
        assert!(program.validate().unwrap_err().to_string().contains("empty code list"));

        let program = ProgramRequirements {
            major: "Physics".into(),
            subplan: None,
            slots: vec![],
        };
        assert!(program.validate().is_err());
    }

    #[test]
    fn prefix_matches_department_exactly() {
        let math = Eligibility::Prefix("MATH".into());
        assert!(math.matches(&code("MATH 51"), &[]));
        assert!(!math.matches(&code("MATHS 1"), &[]));

        let cs1 = Eligibility::Prefix("cs 1".into());
        assert!(cs1.matches(&code("CS 106B"), &[]));
        assert!(!cs1.matches(&code("CS 221"), &[]));
        assert!(!cs1.matches(&code("CSE 100"), &[]));
    }

    #[test]
    fn category_matches_any_listed_section() {
        let wim = Eligibility::Category("Writing in the Major".into());
        let mut course = ParsedCourse::new(code("CS 103"));
        course.requirement_category = Some("Core".into());
        assert!(!wim.matches_course(&course));
        course.also_listed_under.push("writing in the major".into());
        assert!(wim.matches_course(&course));
    }

    #[test]
    fn explicit_codes_flatten_nested_predicates() {
        let eligible = Eligibility::AnyOf(vec![
            Eligibility::Codes(vec![code("CS 221")]),
            Eligibility::Prefix("MATH".into()),
            Eligibility::Codes(vec![code("CS 229")]),
        ]);
        let codes: Vec<String> = eligible.explicit_codes().iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, ["CS 221", "CS 229"]);
    }

    #[test]
    fn threshold_progress() {
        let courses = Threshold::Courses(3);
        assert!(!courses.is_met(2, 10.0));
        assert_eq!(courses.remaining(2, 10.0), Threshold::Courses(1));
        let units = Threshold::Units(15.0);
        assert!(units.is_met(3, 15.0));
        assert_eq!(units.remaining(1, 5.0), Threshold::Units(10.0));
        assert_eq!(Threshold::Courses(1).to_string(), "1 course");
        assert_eq!(Threshold::Units(10.0).to_string(), "10 units");
    }
}
