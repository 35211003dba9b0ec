use std::sync::Arc;

use crate::model::{CourseId, CourseTree, Position, SequenceId, UnitId};
use crate::navigation::event::{NavigationEvent, NavigationEventName};
use crate::navigation::gating::{self, ExamSession};
use crate::navigation::state::{
    Correction, Destination, FailureReason, LoadOutcome, LoadTicket, NavRequest, NavState,
    NoOpReason, Outcome,
};
use crate::resolver::{NextSequence, NextUnit, PositionResolver, PreviousSequence, PreviousUnit};

/// Decides where next/previous/jump requests lead.
///
/// The controller never moves its own position in response to a request: it
/// reports a [`Destination`] and waits for the host to commit the route via
/// [`NavigationController::sync_route`]. Repeating a request before that
/// commit therefore yields the same destination.
#[derive(Debug, Clone, Default)]
pub struct NavigationController {
    state: NavState,
    course_id: Option<CourseId>,
    tree: Option<Arc<CourseTree>>,
    position: Position,
    exam: ExamSession,
    in_flight: Option<LoadTicket>,
    issued: u64,
    pending: Option<NavRequest>,
}

/// An entry position checked against a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub position: Position,
    pub correction: Option<Correction>,
}

impl Resolution {
    fn exact(position: Position) -> Self {
        Self {
            position,
            correction: None,
        }
    }

    fn corrected(position: Position, correction: Correction) -> Self {
        Self {
            position,
            correction: Some(correction),
        }
    }
}

impl NavigationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &NavState {
        &self.state
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[must_use]
    pub fn course_id(&self) -> Option<&CourseId> {
        self.course_id.as_ref()
    }

    #[must_use]
    pub fn tree(&self) -> Option<&Arc<CourseTree>> {
        self.tree.as_ref()
    }

    #[must_use]
    pub fn exam_session(&self) -> ExamSession {
        self.exam
    }

    /// Request parked while a load is in flight.
    #[must_use]
    pub fn pending_request(&self) -> Option<&NavRequest> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.in_flight.as_ref() == Some(ticket)
    }

    /// Start loading `course_id`, entering at `entry`.
    ///
    /// Supersedes any load already in flight and drops any parked request.
    pub fn begin_load(&mut self, course_id: CourseId, entry: Position) -> LoadTicket {
        self.issued += 1;
        let ticket = LoadTicket::new(self.issued, course_id.clone());
        if self.course_id.as_ref() != Some(&course_id) {
            self.tree = None;
        }
        self.course_id = Some(course_id);
        self.position = entry;
        self.pending = None;
        self.in_flight = Some(ticket.clone());
        self.state = NavState::Resolving;
        ticket
    }

    /// Apply the result of the fetch identified by `ticket`.
    ///
    /// Results for any ticket other than the latest are discarded untouched.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<CourseTree, FailureReason>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            return LoadOutcome::Stale;
        }
        self.in_flight = None;

        let tree = match result {
            Ok(tree) if tree.course().id == *ticket.course_id() => Arc::new(tree),
            Ok(_) => return self.fail(FailureReason::LoadFailed),
            Err(reason) => return self.fail(reason),
        };

        let entry = std::mem::take(&mut self.position);
        let Resolution {
            position,
            correction,
        } = resolve_entry(&tree, &entry);
        self.tree = Some(tree);
        self.position = position.clone();
        self.state = self.settled_state();

        let replay = self.pending.take().map(|request| self.request(request));
        LoadOutcome::Ready {
            position,
            correction,
            replay,
        }
    }

    /// Record the route the host actually committed (navigation, deep link,
    /// browser history).
    ///
    /// Returns the repair applied when the route names ids that are not in
    /// the tree; the host should replace the URL accordingly.
    pub fn sync_route(&mut self, route: Position) -> Option<Correction> {
        if matches!(self.state, NavState::Resolving) {
            self.position = route;
            return None;
        }
        let Some(tree) = self.tree.clone() else {
            self.position = route;
            return None;
        };

        let Resolution {
            position,
            correction,
        } = resolve_entry(&tree, &route);
        self.position = position;
        self.state = self.settled_state();
        correction
    }

    /// Replace the exam snapshot and re-check the committed position.
    ///
    /// An uncommitted destination is dropped from the state; it was computed
    /// under the previous snapshot.
    pub fn set_exam_session(&mut self, exam: ExamSession) {
        self.exam = exam;
        if !matches!(self.state, NavState::Resolving | NavState::Failed(_)) {
            self.state = self.settled_state();
        }
    }

    pub fn request_next(&mut self) -> Outcome {
        self.request(NavRequest::Next)
    }

    pub fn request_previous(&mut self) -> Outcome {
        self.request(NavRequest::Previous)
    }

    pub fn request_jump(&mut self, sequence_id: SequenceId) -> Outcome {
        self.request(NavRequest::Jump(sequence_id))
    }

    pub fn request_unit(&mut self, unit_id: UnitId) -> Outcome {
        self.request(NavRequest::SelectUnit(unit_id))
    }

    pub fn request(&mut self, request: NavRequest) -> Outcome {
        match self.state {
            NavState::Resolving => {
                self.pending = Some(request);
                return Outcome::Deferred;
            }
            NavState::Failed(_) => return Outcome::NoOp(NoOpReason::NotLoaded),
            _ => {}
        }
        let Some(tree) = self.tree.clone() else {
            return Outcome::NoOp(NoOpReason::NotLoaded);
        };

        let outcome = match request {
            NavRequest::Next => self.resolve_next(&tree),
            NavRequest::Previous => self.resolve_previous(&tree),
            NavRequest::Jump(sequence_id) => self.resolve_jump(&tree, sequence_id),
            NavRequest::SelectUnit(unit_id) => self.resolve_unit(&tree, unit_id),
        };

        match &outcome {
            Outcome::Navigated { destination, .. } => {
                self.state = NavState::Navigated(destination.clone());
            }
            Outcome::Blocked {
                sequence_id,
                reason,
            } => {
                self.state = NavState::Blocked {
                    sequence_id: sequence_id.clone(),
                    reason: *reason,
                };
            }
            Outcome::Deferred | Outcome::NoOp(_) => {}
        }
        outcome
    }

    fn fail(&mut self, reason: FailureReason) -> LoadOutcome {
        self.tree = None;
        self.pending = None;
        self.state = NavState::Failed(reason);
        LoadOutcome::Failed(reason)
    }

    fn settled_state(&self) -> NavState {
        let (Some(tree), Some(sequence_id)) =
            (self.tree.as_deref(), self.position.sequence_id.as_ref())
        else {
            return NavState::Idle;
        };
        match gating::check_entry(tree, sequence_id, &self.exam) {
            Ok(()) => NavState::Idle,
            Err(reason) => NavState::Blocked {
                sequence_id: sequence_id.clone(),
                reason,
            },
        }
    }

    fn resolve_next(&self, tree: &CourseTree) -> Outcome {
        let resolver = PositionResolver::new(tree);
        let Some(sequence_id) = self.position.sequence_id.as_ref() else {
            return Outcome::NoOp(NoOpReason::NoPosition);
        };
        if let Err(reason) = gating::check_exit(tree, sequence_id, &self.exam) {
            return Outcome::Blocked {
                sequence_id: sequence_id.clone(),
                reason,
            };
        }

        let event = self.sequence_event(tree, NavigationEventName::NextSelected, None);
        let step = match &self.position.unit_id {
            Some(unit_id) => match resolver.next_unit(sequence_id, unit_id) {
                Ok(step) => step,
                Err(_) => return Outcome::NoOp(NoOpReason::UnknownTarget),
            },
            None => NextUnit::SequenceBoundary,
        };

        match step {
            NextUnit::Unit(unit_id) => self.enter(tree, sequence_id.clone(), Some(unit_id), event),
            NextUnit::SequenceBoundary => match resolver.next_sequence(sequence_id) {
                Ok(NextSequence::Sequence(next)) => {
                    let unit_id = resolver.first_unit(&next);
                    self.enter(tree, next, unit_id, event)
                }
                Ok(NextSequence::CourseEnd) => Outcome::Navigated {
                    destination: Destination::CourseExit,
                    event,
                },
                Err(_) => Outcome::NoOp(NoOpReason::UnknownTarget),
            },
        }
    }

    fn resolve_previous(&self, tree: &CourseTree) -> Outcome {
        let resolver = PositionResolver::new(tree);
        let Some(sequence_id) = self.position.sequence_id.as_ref() else {
            return Outcome::NoOp(NoOpReason::NoPosition);
        };
        if let Err(reason) = gating::check_exit(tree, sequence_id, &self.exam) {
            return Outcome::Blocked {
                sequence_id: sequence_id.clone(),
                reason,
            };
        }

        let event = self.sequence_event(tree, NavigationEventName::PreviousSelected, None);
        let step = match &self.position.unit_id {
            Some(unit_id) => match resolver.previous_unit(sequence_id, unit_id) {
                Ok(step) => step,
                Err(_) => return Outcome::NoOp(NoOpReason::UnknownTarget),
            },
            None => PreviousUnit::SequenceStartBoundary,
        };

        match step {
            PreviousUnit::Unit(unit_id) => {
                self.enter(tree, sequence_id.clone(), Some(unit_id), event)
            }
            PreviousUnit::SequenceStartBoundary => match resolver.previous_sequence(sequence_id) {
                // Crossing backwards lands on the end of the earlier sequence.
                Ok(PreviousSequence::Sequence(previous)) => {
                    let unit_id = resolver.last_unit(&previous);
                    self.enter(tree, previous, unit_id, event)
                }
                Ok(PreviousSequence::CourseStart) => Outcome::NoOp(NoOpReason::AtCourseStart),
                Err(_) => Outcome::NoOp(NoOpReason::UnknownTarget),
            },
        }
    }

    fn resolve_jump(&self, tree: &CourseTree, target: SequenceId) -> Outcome {
        let resolver = PositionResolver::new(tree);
        let (sequence_id, unit_id) = if tree.sequence(&target).is_some() {
            let unit_id = resolver.default_unit(&target);
            (target, unit_id)
        } else {
            let as_unit = target.as_unit();
            match tree.sequence_of(&as_unit) {
                Some(parent) => (parent.clone(), Some(as_unit)),
                None => return Outcome::NoOp(NoOpReason::UnknownTarget),
            }
        };

        if let Some(blocked) = self.leave(tree, &sequence_id) {
            return blocked;
        }
        let event = self.outline_event(tree, &sequence_id);
        self.enter(tree, sequence_id, unit_id, event)
    }

    fn resolve_unit(&self, tree: &CourseTree, unit_id: UnitId) -> Outcome {
        let Some(sequence_id) = tree.sequence_of(&unit_id).cloned() else {
            return Outcome::NoOp(NoOpReason::UnknownTarget);
        };

        let event = if self.position.sequence_id.as_ref() == Some(&sequence_id) {
            self.sequence_event(tree, NavigationEventName::TabSelected, Some(&unit_id))
        } else {
            if let Some(blocked) = self.leave(tree, &sequence_id) {
                return blocked;
            }
            self.outline_event(tree, &sequence_id)
        };
        self.enter(tree, sequence_id, Some(unit_id), event)
    }

    /// Gate checks for a request that may move to another sequence.
    ///
    /// The target's entry gates are reported before the exit hold on the
    /// current sequence.
    fn leave(&self, tree: &CourseTree, target: &SequenceId) -> Option<Outcome> {
        if let Err(reason) = gating::check_entry(tree, target, &self.exam) {
            return Some(Outcome::Blocked {
                sequence_id: target.clone(),
                reason,
            });
        }
        let current = self.position.sequence_id.as_ref()?;
        if current == target {
            return None;
        }
        gating::check_exit(tree, current, &self.exam)
            .err()
            .map(|reason| Outcome::Blocked {
                sequence_id: current.clone(),
                reason,
            })
    }

    fn enter(
        &self,
        tree: &CourseTree,
        sequence_id: SequenceId,
        unit_id: Option<UnitId>,
        event: NavigationEvent,
    ) -> Outcome {
        match gating::check_entry(tree, &sequence_id, &self.exam) {
            Ok(()) => Outcome::Navigated {
                destination: Destination::Courseware {
                    sequence_id,
                    unit_id,
                },
                event,
            },
            Err(reason) => Outcome::Blocked {
                sequence_id,
                reason,
            },
        }
    }

    fn sequence_event(
        &self,
        tree: &CourseTree,
        name: NavigationEventName,
        target: Option<&UnitId>,
    ) -> NavigationEvent {
        let units = self
            .position
            .sequence_id
            .as_ref()
            .and_then(|sequence_id| tree.sibling_units(sequence_id))
            .unwrap_or(&[]);
        let index_of = |unit_id: &UnitId| units.iter().position(|id| id == unit_id);
        let current = self.position.unit_id.as_ref().and_then(index_of).unwrap_or(0);

        NavigationEvent {
            name,
            unit_id: self.position.unit_id.clone(),
            current_index: current + 1,
            total_count: units.len(),
            target_index: target.and_then(index_of).map(|index| index + 1),
        }
    }

    fn outline_event(&self, tree: &CourseTree, target: &SequenceId) -> NavigationEvent {
        let current = self
            .position
            .sequence_id
            .as_ref()
            .and_then(|sequence_id| tree.sequence_index(sequence_id));

        NavigationEvent {
            name: NavigationEventName::OutlineSelected,
            unit_id: self.position.unit_id.clone(),
            current_index: current.map_or(0, |index| index + 1),
            total_count: tree.sequence_order().len(),
            target_index: tree.sequence_index(target).map(|index| index + 1),
        }
    }
}

/// Repair an entry position against `tree`.
///
/// A unit id in the sequence slot is re-read as a unit; ids that are not in
/// the tree fall back to their nearest valid ancestor, or to the first
/// sequence of the course. An empty entry starts at the resume unit when the
/// course has one.
#[must_use]
pub fn resolve_entry(tree: &CourseTree, entry: &Position) -> Resolution {
    let resolver = PositionResolver::new(tree);

    if let Some(sequence_id) = &entry.sequence_id {
        if tree.sequence(sequence_id).is_some() {
            return match &entry.unit_id {
                Some(unit_id) if tree.sequence_of(unit_id) == Some(sequence_id) => {
                    Resolution::exact(entry.clone())
                }
                Some(unit_id) => Resolution::corrected(
                    sequence_start(&resolver, sequence_id),
                    Correction::UnknownUnit {
                        requested: unit_id.clone(),
                    },
                ),
                None => Resolution::exact(sequence_start(&resolver, sequence_id)),
            };
        }

        let as_unit = sequence_id.as_unit();
        if let Some(parent) = tree.sequence_of(&as_unit) {
            return Resolution::corrected(
                Position::new(parent.clone(), as_unit.clone()),
                Correction::SequenceWasUnit { unit_id: as_unit },
            );
        }

        let position = entry
            .unit_id
            .as_ref()
            .and_then(|unit_id| unit_position(tree, unit_id))
            .unwrap_or_else(|| course_start(&resolver));
        return Resolution::corrected(
            position,
            Correction::UnknownSequence {
                requested: sequence_id.clone(),
            },
        );
    }

    if let Some(unit_id) = &entry.unit_id {
        return match unit_position(tree, unit_id) {
            Some(position) => Resolution::exact(position),
            None => Resolution::corrected(
                course_start(&resolver),
                Correction::UnknownUnit {
                    requested: unit_id.clone(),
                },
            ),
        };
    }

    let resume = tree
        .course()
        .resume_course
        .as_ref()
        .and_then(|resume| resume.unit_id.as_ref())
        .and_then(|unit_id| unit_position(tree, unit_id));
    Resolution::exact(resume.unwrap_or_else(|| course_start(&resolver)))
}

fn unit_position(tree: &CourseTree, unit_id: &UnitId) -> Option<Position> {
    tree.sequence_of(unit_id)
        .map(|parent| Position::new(parent.clone(), unit_id.clone()))
}

fn sequence_start(resolver: &PositionResolver<'_>, sequence_id: &SequenceId) -> Position {
    Position {
        sequence_id: Some(sequence_id.clone()),
        unit_id: resolver.default_unit(sequence_id),
    }
}

fn course_start(resolver: &PositionResolver<'_>) -> Position {
    resolver
        .tree()
        .first_sequence()
        .map_or_else(Position::empty, |first| sequence_start(resolver, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::gating::{BlockReason, ExamStatus};

    fn two_sections() -> CourseTree {
        CourseTree::builder("course")
            .section("S1", "One", |s| s.sequence("Q1", "First", |q| q.unit("U1").unit("U2")))
            .section("S2", "Two", |s| s.sequence("Q2", "Second", |q| q.unit("U3")))
            .build()
            .unwrap()
    }

    fn loaded(tree: CourseTree, entry: Position) -> NavigationController {
        let mut controller = NavigationController::new();
        let ticket = controller.begin_load(tree.course().id.clone(), entry);
        let outcome = controller.complete_load(&ticket, Ok(tree));
        assert!(matches!(outcome, LoadOutcome::Ready { .. }));
        controller
    }

    fn commit(controller: &mut NavigationController, outcome: &Outcome) {
        let Outcome::Navigated { destination, .. } = outcome else {
            panic!("expected navigation, got {outcome:?}");
        };
        let position = destination.position().expect("courseware destination");
        assert_eq!(controller.sync_route(position), None);
    }

    fn courseware(sequence: &str, unit: &str) -> Destination {
        Destination::Courseware {
            sequence_id: SequenceId::new(sequence),
            unit_id: Some(UnitId::new(unit)),
        }
    }

    #[test]
    fn next_crosses_into_the_following_section() {
        let mut controller = loaded(two_sections(), Position::new("Q1", "U2"));

        let outcome = controller.request_next();
        let Outcome::Navigated { destination, event } = &outcome else {
            panic!("unexpected {outcome:?}");
        };
        assert_eq!(destination, &courseware("Q2", "U3"));
        assert_eq!(event.name, NavigationEventName::NextSelected);
        assert_eq!((event.current_index, event.total_count), (2, 2));
    }

    #[test]
    fn next_from_last_unit_exits_the_course() {
        let mut controller = loaded(two_sections(), Position::new("Q2", "U3"));
        let outcome = controller.request_next();
        assert!(matches!(
            outcome,
            Outcome::Navigated {
                destination: Destination::CourseExit,
                ..
            }
        ));
        assert_eq!(
            controller.state(),
            &NavState::Navigated(Destination::CourseExit)
        );
    }

    #[test]
    fn previous_lands_on_last_unit_of_prior_sequence() {
        let mut controller = loaded(two_sections(), Position::new("Q2", "U3"));
        let outcome = controller.request_previous();
        assert!(matches!(
            outcome,
            Outcome::Navigated { ref destination, .. } if *destination == courseware("Q1", "U2")
        ));
    }

    #[test]
    fn previous_at_course_start_is_a_no_op() {
        let mut controller = loaded(two_sections(), Position::new("Q1", "U1"));
        assert_eq!(
            controller.request_previous(),
            Outcome::NoOp(NoOpReason::AtCourseStart)
        );
    }

    #[test]
    fn n_minus_one_nexts_reach_last_unit_then_cross() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| {
                s.sequence("Q1", "Long", |q| q.unit("a").unit("b").unit("c").unit("d"))
                    .sequence("Q2", "After", |q| q.unit("e"))
            })
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("Q1", "a"));

        for _ in 0..3 {
            let outcome = controller.request_next();
            commit(&mut controller, &outcome);
        }
        assert_eq!(controller.position(), &Position::new("Q1", "d"));

        let outcome = controller.request_next();
        assert!(matches!(
            outcome,
            Outcome::Navigated { ref destination, .. } if *destination == courseware("Q2", "e")
        ));
    }

    #[test]
    fn duplicate_next_before_commit_does_not_double_advance() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| s.sequence("Q1", "A", |q| q.unit("a").unit("b").unit("c")))
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("Q1", "a"));

        let first = controller.request_next();
        let second = controller.request_next();
        assert_eq!(first, second);
        commit(&mut controller, &second);
        assert_eq!(controller.position(), &Position::new("Q1", "b"));
    }

    #[test]
    fn jump_into_gated_sequence_is_blocked() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| s.sequence("Q1", "A", |q| q.unit("U1").unit("U2")))
            .section("S2", "Two", |s| s.sequence("Q2", "B", |q| q.gated(Some("Q1")).unit("U3")))
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("Q1", "U1"));

        let outcome = controller.request_jump(SequenceId::new("Q2"));
        assert_eq!(
            outcome,
            Outcome::Blocked {
                sequence_id: SequenceId::new("Q2"),
                reason: BlockReason::Gated,
            }
        );
        let tree = controller.tree().unwrap();
        assert_eq!(
            tree.section_of(&SequenceId::new("Q2")),
            Some(&crate::model::SectionId::new("S2"))
        );
    }

    #[test]
    fn next_into_gated_sequence_is_blocked() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| {
                s.sequence("Q1", "A", |q| q.unit("U1"))
                    .sequence("Q2", "B", |q| q.hidden_after_due().unit("U2"))
            })
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("Q1", "U1"));
        assert_eq!(
            controller.request_next(),
            Outcome::Blocked {
                sequence_id: SequenceId::new("Q2"),
                reason: BlockReason::HiddenAfterDue,
            }
        );
    }

    #[test]
    fn unit_selection_reports_target_tab() {
        let mut controller = loaded(two_sections(), Position::new("Q1", "U1"));
        let outcome = controller.request_unit(UnitId::new("U2"));
        let Outcome::Navigated { event, .. } = outcome else {
            panic!("expected navigation");
        };
        assert_eq!(event.name, NavigationEventName::TabSelected);
        assert_eq!(event.target_index, Some(2));
    }

    #[test]
    fn active_exam_suppresses_next_and_previous() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| {
                s.sequence("Q1", "A", |q| q.unit("U1"))
                    .sequence("EX", "Exam", |q| q.time_limited().unit("E1").unit("E2"))
                    .sequence("Q2", "B", |q| q.unit("U2"))
            })
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("EX", "E1"));
        controller.set_exam_session(ExamSession {
            status: ExamStatus::Active,
            can_access_proctored_exams: true,
        });

        let blocked = Outcome::Blocked {
            sequence_id: SequenceId::new("EX"),
            reason: BlockReason::ExamInProgress,
        };
        assert_eq!(controller.request_next(), blocked);
        assert_eq!(controller.request_previous(), blocked);
        assert_eq!(controller.request_jump(SequenceId::new("Q2")), blocked);
        assert!(matches!(
            controller.request_unit(UnitId::new("E2")),
            Outcome::Navigated { .. }
        ));

        controller.set_exam_session(ExamSession {
            status: ExamStatus::Completed,
            can_access_proctored_exams: true,
        });
        assert!(matches!(
            controller.request_next(),
            Outcome::Navigated { .. }
        ));
    }

    #[test]
    fn jump_reports_target_gate_before_exam_hold() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| {
                s.sequence("EX", "Exam", |q| q.time_limited().unit("E1"))
                    .sequence("Q2", "Locked", |q| q.gated(Some("EX")).unit("U2"))
                    .sequence("Q3", "Late", |q| q.hidden_after_due().unit("U3"))
            })
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("EX", "E1"));
        controller.set_exam_session(ExamSession {
            status: ExamStatus::Active,
            can_access_proctored_exams: true,
        });

        assert_eq!(
            controller.request_jump(SequenceId::new("Q2")),
            Outcome::Blocked {
                sequence_id: SequenceId::new("Q2"),
                reason: BlockReason::Gated,
            }
        );
        assert_eq!(
            controller.request_unit(UnitId::new("U3")),
            Outcome::Blocked {
                sequence_id: SequenceId::new("Q3"),
                reason: BlockReason::HiddenAfterDue,
            }
        );
    }

    #[test]
    fn exam_change_before_commit_resettles_state() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| {
                s.sequence("FX", "Final", |q| q.proctored().unit("F1").unit("F2"))
            })
            .build()
            .unwrap();
        let mut controller = loaded(tree, Position::new("FX", "F1"));
        let outcome = controller.request_next();
        assert_eq!(
            controller.state(),
            &NavState::Navigated(courseware("FX", "F2"))
        );
        assert!(matches!(outcome, Outcome::Navigated { .. }));

        controller.set_exam_session(ExamSession {
            status: ExamStatus::Inactive,
            can_access_proctored_exams: false,
        });
        assert_eq!(
            controller.state(),
            &NavState::Blocked {
                sequence_id: SequenceId::new("FX"),
                reason: BlockReason::ProctoredExamsUnavailable,
            }
        );
    }

    #[test]
    fn requests_during_load_are_deferred_and_latest_wins() {
        let mut controller = NavigationController::new();
        let ticket = controller.begin_load(CourseId::new("course"), Position::new("Q1", "U1"));

        assert_eq!(controller.request_next(), Outcome::Deferred);
        assert_eq!(
            controller.request_jump(SequenceId::new("Q2")),
            Outcome::Deferred
        );
        assert_eq!(
            controller.pending_request(),
            Some(&NavRequest::Jump(SequenceId::new("Q2")))
        );

        let LoadOutcome::Ready { replay, .. } = controller.complete_load(&ticket, Ok(two_sections()))
        else {
            panic!("load should apply");
        };
        assert!(matches!(
            replay,
            Some(Outcome::Navigated { ref destination, .. }) if *destination == courseware("Q2", "U3")
        ));
        assert_eq!(controller.pending_request(), None);
    }

    #[test]
    fn superseded_load_result_is_discarded() {
        let other = CourseTree::builder("other")
            .section("X1", "X", |s| s.sequence("XQ", "X", |q| q.unit("XU")))
            .build()
            .unwrap();

        let mut controller = NavigationController::new();
        let stale = controller.begin_load(CourseId::new("other"), Position::empty());
        let fresh = controller.begin_load(CourseId::new("course"), Position::empty());

        assert_eq!(controller.complete_load(&stale, Ok(other.clone())), LoadOutcome::Stale);
        assert_eq!(controller.state(), &NavState::Resolving);

        assert!(matches!(
            controller.complete_load(&fresh, Ok(two_sections())),
            LoadOutcome::Ready { .. }
        ));
        assert_eq!(controller.complete_load(&stale, Ok(other)), LoadOutcome::Stale);
        assert_eq!(controller.course_id(), Some(&CourseId::new("course")));
        assert_eq!(controller.position(), &Position::new("Q1", "U1"));
    }

    #[test]
    fn failed_load_surfaces_reason() {
        let mut controller = NavigationController::new();
        let ticket = controller.begin_load(CourseId::new("course"), Position::empty());
        assert_eq!(
            controller.complete_load(&ticket, Err(FailureReason::NotFound)),
            LoadOutcome::Failed(FailureReason::NotFound)
        );
        assert_eq!(controller.state(), &NavState::Failed(FailureReason::NotFound));
        assert_eq!(
            controller.request_next(),
            Outcome::NoOp(NoOpReason::NotLoaded)
        );
    }

    #[test]
    fn unit_id_in_sequence_slot_is_corrected() {
        let mut controller = NavigationController::new();
        let ticket = controller.begin_load(CourseId::new("course"), Position::in_sequence("U2"));
        let outcome = controller.complete_load(&ticket, Ok(two_sections()));
        assert_eq!(
            outcome,
            LoadOutcome::Ready {
                position: Position::new("Q1", "U2"),
                correction: Some(Correction::SequenceWasUnit {
                    unit_id: UnitId::new("U2"),
                }),
                replay: None,
            }
        );
        assert_eq!(controller.state(), &NavState::Idle);
    }

    #[test]
    fn stale_deep_links_fall_back_to_ancestors() {
        let tree = two_sections();

        let unknown_unit = resolve_entry(&tree, &Position::new("Q2", "gone"));
        assert_eq!(unknown_unit.position, Position::new("Q2", "U3"));

        let unknown_sequence = resolve_entry(&tree, &Position::in_sequence("gone"));
        assert_eq!(unknown_sequence.position, Position::new("Q1", "U1"));
        assert_eq!(
            unknown_sequence.correction,
            Some(Correction::UnknownSequence {
                requested: SequenceId::new("gone"),
            })
        );

        let known_unit = resolve_entry(&tree, &Position::new("gone", "U3"));
        assert_eq!(known_unit.position, Position::new("Q2", "U3"));
    }

    #[test]
    fn empty_entry_starts_at_resume_unit() {
        let tree = CourseTree::builder("course")
            .resume(true, Some("U3"))
            .section("S1", "One", |s| s.sequence("Q1", "A", |q| q.unit("U1")))
            .section("S2", "Two", |s| s.resume_block().sequence("Q2", "B", |q| q.unit("U3")))
            .build()
            .unwrap();
        let resolution = resolve_entry(&tree, &Position::empty());
        assert_eq!(resolution, Resolution::exact(Position::new("Q2", "U3")));
    }

    #[test]
    fn landing_on_gated_sequence_settles_blocked() {
        let tree = CourseTree::builder("course")
            .section("S1", "One", |s| s.sequence("Q1", "A", |q| q.gated(None).unit("U1")))
            .build()
            .unwrap();
        let controller = loaded(tree, Position::in_sequence("Q1"));
        assert_eq!(
            controller.state(),
            &NavState::Blocked {
                sequence_id: SequenceId::new("Q1"),
                reason: BlockReason::Gated,
            }
        );
    }
}
