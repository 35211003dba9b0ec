mod builder;
mod course;
mod ids;
mod position;
mod tree;

pub use builder::{CourseTreeBuilder, SectionBuilder, SequenceBuilder};
pub use course::{Course, EntranceExam, GatedContent, ResumeCourse, Section, Sequence, Unit};
pub use ids::{CourseId, SectionId, SequenceId, UnitId};
pub use position::Position;
pub use tree::{CompletionMismatch, CourseTree, TreeError};
