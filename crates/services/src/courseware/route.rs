use std::fmt;
use std::sync::{Arc, Mutex};

use courseware_core::model::{CourseId, Position, SequenceId, UnitId};
use courseware_core::navigation::Destination;
use serde::Serialize;

/// A location the host can route to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Route {
    Courseware {
        course_id: CourseId,
        sequence_id: Option<SequenceId>,
        unit_id: Option<UnitId>,
    },
    CourseExit {
        course_id: CourseId,
    },
}

impl Route {
    #[must_use]
    pub fn courseware(course_id: CourseId, position: &Position) -> Self {
        Route::Courseware {
            course_id,
            sequence_id: position.sequence_id.clone(),
            unit_id: position.unit_id.clone(),
        }
    }

    #[must_use]
    pub fn from_destination(course_id: CourseId, destination: &Destination) -> Self {
        match destination {
            Destination::Courseware {
                sequence_id,
                unit_id,
            } => Route::Courseware {
                course_id,
                sequence_id: Some(sequence_id.clone()),
                unit_id: unit_id.clone(),
            },
            Destination::CourseExit => Route::CourseExit { course_id },
        }
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        match self {
            Route::Courseware { course_id, .. } | Route::CourseExit { course_id } => course_id,
        }
    }

    /// Position a courseware route points at; `None` for the exit page.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Route::Courseware {
                sequence_id,
                unit_id,
                ..
            } => Some(Position {
                sequence_id: sequence_id.clone(),
                unit_id: unit_id.clone(),
            }),
            Route::CourseExit { .. } => None,
        }
    }

    /// `/course/{course}[/{sequence}[/{unit}]]` or `/course/{course}/course-end`.
    #[must_use]
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Courseware {
                course_id,
                sequence_id,
                unit_id,
            } => {
                write!(f, "/course/{course_id}")?;
                if let Some(sequence_id) = sequence_id {
                    write!(f, "/{sequence_id}")?;
                    if let Some(unit_id) = unit_id {
                        write!(f, "/{unit_id}")?;
                    }
                }
                Ok(())
            }
            Route::CourseExit { course_id } => write!(f, "/course/{course_id}/course-end"),
        }
    }
}

/// History entry handling for a route change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteMode {
    Push,
    /// Used for corrections so the bad url does not stay in history.
    Replace,
}

/// Host-side routing. The session never waits for the route to commit; the
/// host reports it back through `CoursewareSession::route_changed`.
pub trait Router: Send + Sync {
    fn navigate(&self, route: &Route, mode: RouteMode);
}

/// Router that remembers every call, for tests and dry runs.
#[derive(Clone, Default)]
pub struct RecordingRouter {
    calls: Arc<Mutex<Vec<(Route, RouteMode)>>>,
}

impl RecordingRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<(Route, RouteMode)> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last(&self) -> Option<(Route, RouteMode)> {
        self.calls
            .lock()
            .ok()
            .and_then(|guard| guard.last().cloned())
    }
}

impl Router for RecordingRouter {
    fn navigate(&self, route: &Route, mode: RouteMode) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((route.clone(), mode));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_shorten_when_ids_are_missing() {
        let course = CourseId::new("course-v1:edX+Demo+2024");
        assert_eq!(
            Route::courseware(course.clone(), &Position::new("seq", "unit")).path(),
            "/course/course-v1:edX+Demo+2024/seq/unit"
        );
        assert_eq!(
            Route::courseware(course.clone(), &Position::in_sequence("seq")).path(),
            "/course/course-v1:edX+Demo+2024/seq"
        );
        assert_eq!(
            Route::courseware(course.clone(), &Position::empty()).path(),
            "/course/course-v1:edX+Demo+2024"
        );
        assert_eq!(
            Route::from_destination(course, &Destination::CourseExit).path(),
            "/course/course-v1:edX+Demo+2024/course-end"
        );
    }

    #[test]
    fn recording_router_keeps_order() {
        let router = RecordingRouter::new();
        let first = Route::CourseExit {
            course_id: CourseId::new("a"),
        };
        let second = Route::courseware(CourseId::new("a"), &Position::in_sequence("q"));
        router.navigate(&first, RouteMode::Push);
        router.navigate(&second, RouteMode::Replace);

        assert_eq!(router.calls().len(), 2);
        assert_eq!(router.last(), Some((second, RouteMode::Replace)));
    }
}
