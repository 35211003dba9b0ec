use serde::{Deserialize, Serialize};

use crate::model::{CourseId, Position, SequenceId, UnitId};
use crate::navigation::event::NavigationEvent;
use crate::navigation::gating::BlockReason;

/// A movement the learner asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavRequest {
    Next,
    Previous,
    Jump(SequenceId),
    SelectUnit(UnitId),
}

/// Where the host should route after a successful request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Courseware {
        sequence_id: SequenceId,
        unit_id: Option<UnitId>,
    },
    /// Past the last unit of the course.
    CourseExit,
}

impl Destination {
    /// Position the host will report back once the route is committed.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Destination::Courseware {
                sequence_id,
                unit_id,
            } => Some(Position {
                sequence_id: Some(sequence_id.clone()),
                unit_id: unit_id.clone(),
            }),
            Destination::CourseExit => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    LoadFailed,
    NotFound,
}

impl FailureReason {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            FailureReason::LoadFailed => "LOAD_FAILED",
            FailureReason::NotFound => "NOT_FOUND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    NotLoaded,
    NoPosition,
    AtCourseStart,
    UnknownTarget,
}

/// Controller state as seen by the hosting view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NavState {
    #[default]
    Idle,
    /// A course structure fetch is in flight.
    Resolving,
    Blocked {
        sequence_id: SequenceId,
        reason: BlockReason,
    },
    /// A destination was chosen and awaits the route commit.
    Navigated(Destination),
    Failed(FailureReason),
}

/// Result of a single navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Navigated {
        destination: Destination,
        event: NavigationEvent,
    },
    Blocked {
        sequence_id: SequenceId,
        reason: BlockReason,
    },
    /// Parked until the in-flight load completes.
    Deferred,
    NoOp(NoOpReason),
}

/// How an entry position had to be repaired against the loaded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    /// The sequence slot held a unit id.
    SequenceWasUnit { unit_id: UnitId },
    /// The sequence does not exist; fell back to the unit's parent or the
    /// first sequence of the course.
    UnknownSequence { requested: SequenceId },
    /// The unit does not belong to the sequence; fell back to the sequence.
    UnknownUnit { requested: UnitId },
}

/// Identifies one course structure fetch.
///
/// Only the most recently issued ticket is accepted by
/// [`NavigationController::complete_load`](crate::navigation::NavigationController::complete_load).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    serial: u64,
    course_id: CourseId,
}

impl LoadTicket {
    pub(crate) fn new(serial: u64, course_id: CourseId) -> Self {
        Self { serial, course_id }
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// Result of handing a fetch result to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Superseded by a newer load; nothing changed.
    Stale,
    Failed(FailureReason),
    Ready {
        position: Position,
        correction: Option<Correction>,
        /// The request parked while loading, replayed against the new tree.
        replay: Option<Outcome>,
    },
}
