//! Shared error types for the services crate.

use courseware_core::model::SectionId;
use thiserror::Error;

/// Errors emitted by outline operations of `CoursewareSession`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutlineError {
    #[error("course structure is not loaded")]
    NotLoaded,
    #[error("section {0} is not part of the course")]
    UnknownSection(SectionId),
}
