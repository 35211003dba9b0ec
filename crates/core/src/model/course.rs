use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, SectionId, SequenceId, UnitId};

/// Course-level metadata and the ordered list of its sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub section_ids: Vec<SectionId>,
    pub is_self_paced: bool,
    pub is_staff: bool,
    pub entrance_exam: Option<EntranceExam>,
    pub resume_course: Option<ResumeCourse>,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            section_ids: Vec::new(),
            is_self_paced: false,
            is_staff: false,
            entrance_exam: None,
            resume_course: None,
        }
    }

    /// True when an entrance exam exists and has not been passed yet.
    #[must_use]
    pub fn entrance_exam_pending(&self) -> bool {
        self.entrance_exam.as_ref().is_some_and(|exam| !exam.passed)
    }
}

/// Entrance exam configured for the course.
///
/// Until it is passed, only sequences inside `section_id` are reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntranceExam {
    pub section_id: SectionId,
    pub passed: bool,
}

/// Where the "start / resume course" action points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCourse {
    pub has_visited_course: bool,
    pub unit_id: Option<UnitId>,
}

/// Top-level grouping of sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub sequence_ids: Vec<SequenceId>,
    /// Supplied by the progress service; never recomputed here.
    pub complete: bool,
    /// True for the section holding the learner's most recent position.
    pub resume_block: bool,
}

impl Section {
    #[must_use]
    pub fn new(id: SectionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            sequence_ids: Vec::new(),
            complete: false,
            resume_block: false,
        }
    }

    #[must_use]
    pub fn contains(&self, sequence_id: &SequenceId) -> bool {
        self.sequence_ids.contains(sequence_id)
    }
}

/// Prerequisite lock on a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatedContent {
    pub gated: bool,
    pub prereq_id: Option<SequenceId>,
    pub prereq_section_name: Option<String>,
}

/// A navigable unit-of-study holding an ordered list of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Sequence {
    pub id: SequenceId,
    pub title: String,
    pub unit_ids: Vec<UnitId>,
    pub complete: bool,
    pub is_time_limited: bool,
    pub is_proctored: bool,
    pub is_hidden_after_due: bool,
    pub gated_content: Option<GatedContent>,
    /// False for display-only entries such as exam shells.
    pub show_link: bool,
    /// Unit the learner last viewed inside this sequence.
    pub active_unit_index: Option<usize>,
}

impl Sequence {
    #[must_use]
    pub fn new(id: SequenceId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            unit_ids: Vec::new(),
            complete: false,
            is_time_limited: false,
            is_proctored: false,
            is_hidden_after_due: false,
            gated_content: None,
            show_link: true,
            active_unit_index: None,
        }
    }

    #[must_use]
    pub fn is_gated(&self) -> bool {
        self.gated_content.as_ref().is_some_and(|gate| gate.gated)
    }

    /// Content is shown only when the sequence is neither gated nor hidden after its due date.
    #[must_use]
    pub fn displays_content(&self) -> bool {
        !self.is_gated() && !self.is_hidden_after_due
    }
}

/// Leaf content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub sequence_id: SequenceId,
    pub title: String,
    pub complete: bool,
    /// Opaque content descriptor (`vertical`, `problem`, ...).
    pub content_type: String,
}

impl Unit {
    #[must_use]
    pub fn new(id: UnitId, sequence_id: SequenceId) -> Self {
        let title = id.to_string();
        Self {
            id,
            sequence_id,
            title,
            complete: false,
            content_type: "vertical".to_owned(),
        }
    }
}
