use serde::{Deserialize, Serialize};

use crate::model::{CourseTree, SequenceId};

/// Lifecycle of the learner's timed or proctored exam attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamStatus {
    #[default]
    Inactive,
    Active,
    Completed,
}

/// Snapshot pushed in by the exam-session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSession {
    pub status: ExamStatus,
    pub can_access_proctored_exams: bool,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self {
            status: ExamStatus::Inactive,
            can_access_proctored_exams: true,
        }
    }
}

impl ExamSession {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ExamStatus::Active
    }
}

/// Why navigation into (or out of) a sequence was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockReason {
    Gated,
    HiddenAfterDue,
    EntranceExamRequired,
    ProctoredExamsUnavailable,
    ExamInProgress,
}

impl BlockReason {
    /// Stable code for hosts rendering the substitute notice.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            BlockReason::Gated => "GATED",
            BlockReason::HiddenAfterDue => "HIDDEN_AFTER_DUE",
            BlockReason::EntranceExamRequired => "ENTRANCE_EXAM_REQUIRED",
            BlockReason::ProctoredExamsUnavailable => "PROCTORED_EXAMS_UNAVAILABLE",
            BlockReason::ExamInProgress => "EXAM_IN_PROGRESS",
        }
    }
}

/// Can the learner enter `sequence_id`?
///
/// Unknown sequences are not blocked here; callers resolve them first.
///
/// # Errors
///
/// Returns the first matching `BlockReason`, checked in the order gated,
/// hidden after due, entrance exam, proctoring access.
pub fn check_entry(
    tree: &CourseTree,
    sequence_id: &SequenceId,
    exam: &ExamSession,
) -> Result<(), BlockReason> {
    let Some(sequence) = tree.sequence(sequence_id) else {
        return Ok(());
    };
    if sequence.is_gated() {
        return Err(BlockReason::Gated);
    }
    if sequence.is_hidden_after_due {
        return Err(BlockReason::HiddenAfterDue);
    }
    if let Some(entrance) = &tree.course().entrance_exam {
        let in_exam_section = tree.section_of(sequence_id) == Some(&entrance.section_id);
        if !entrance.passed && !in_exam_section {
            return Err(BlockReason::EntranceExamRequired);
        }
    }
    if sequence.is_proctored && !exam.can_access_proctored_exams {
        return Err(BlockReason::ProctoredExamsUnavailable);
    }
    Ok(())
}

/// Can the learner leave `sequence_id`?
///
/// # Errors
///
/// Returns `BlockReason::ExamInProgress` while an exam attempt is active in a
/// time-limited sequence.
pub fn check_exit(
    tree: &CourseTree,
    sequence_id: &SequenceId,
    exam: &ExamSession,
) -> Result<(), BlockReason> {
    let time_limited = tree
        .sequence(sequence_id)
        .is_some_and(|sequence| sequence.is_time_limited);
    if time_limited && exam.is_active() {
        return Err(BlockReason::ExamInProgress);
    }
    Ok(())
}
