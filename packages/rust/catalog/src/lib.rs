//! Requirement schemas and course offering indexes.

pub mod index;
pub mod load;
pub mod schema;

pub use index::{CourseIndex, IndexDocument, IndexEntry, IndexedCourse};
pub use load::{load_course_index, load_schema};
pub use schema::{Eligibility, ProgramRequirements, RequirementSchema, RequirementSlot, Threshold};
