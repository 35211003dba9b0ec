use serde::{Deserialize, Serialize};

use crate::model::ids::{SequenceId, UnitId};

/// The (sequence, unit) pair currently active.
///
/// Either half may be missing while a course is loading or when a deep link
/// names only a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub sequence_id: Option<SequenceId>,
    pub unit_id: Option<UnitId>,
}

impl Position {
    #[must_use]
    pub fn new(sequence_id: impl Into<SequenceId>, unit_id: impl Into<UnitId>) -> Self {
        Self {
            sequence_id: Some(sequence_id.into()),
            unit_id: Some(unit_id.into()),
        }
    }

    #[must_use]
    pub fn in_sequence(sequence_id: impl Into<SequenceId>) -> Self {
        Self {
            sequence_id: Some(sequence_id.into()),
            unit_id: None,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence_id.is_none() && self.unit_id.is_none()
    }
}
