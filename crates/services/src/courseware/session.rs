use std::sync::Arc;

use courseware_core::model::{CourseId, CourseTree, Position, SectionId, SequenceId, UnitId};
use courseware_core::navigation::{
    Correction, Destination, ExamSession, LoadOutcome, LoadTicket, NavRequest, NavState, Outcome,
};
use courseware_core::{NavigationController, OutlineExpansionState};
use provider::{CourseStructureProvider, FetchError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::analytics::AnalyticsSink;
use super::outline::{OutlineView, build_outline};
use super::route::{Route, RouteMode, Router};
use super::viewer::{ViewerState, viewer_state};
use crate::error::OutlineError;

//
// ─── LOAD DELIVERY ─────────────────────────────────────────────────────────────
//

/// A finished fetch, delivered back to the session that started it.
struct LoadMessage {
    ticket: LoadTicket,
    requested: Position,
    result: Result<CourseTree, FetchError>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's courseware page: loads course structure, answers navigation
/// requests and projects the outline and viewer state.
///
/// Fetches run on spawned tasks and report back over a channel; only the
/// result of the most recent load is applied.
pub struct CoursewareSession {
    provider: Arc<dyn CourseStructureProvider>,
    router: Arc<dyn Router>,
    analytics: Arc<dyn AnalyticsSink>,
    controller: NavigationController,
    expansion: Option<OutlineExpansionState>,
    /// Destination already pushed and not yet committed by the host.
    dispatched: Option<Destination>,
    loads_tx: mpsc::UnboundedSender<LoadMessage>,
    loads_rx: mpsc::UnboundedReceiver<LoadMessage>,
}

impl CoursewareSession {
    #[must_use]
    pub fn new(
        provider: Arc<dyn CourseStructureProvider>,
        router: Arc<dyn Router>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            router,
            analytics,
            controller: NavigationController::new(),
            expansion: None,
            dispatched: None,
            loads_tx,
            loads_rx,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        self.controller.position()
    }

    #[must_use]
    pub fn state(&self) -> &NavState {
        self.controller.state()
    }

    #[must_use]
    pub fn course_id(&self) -> Option<&CourseId> {
        self.controller.course_id()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.controller.state(), NavState::Resolving)
    }

    /// Start loading `course_id`, entering at `entry`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self, course_id: CourseId, entry: Position) -> LoadTicket {
        if self.controller.course_id() != Some(&course_id) {
            self.expansion = None;
        }
        info!(%course_id, ?entry, "loading course structure");
        self.dispatched = None;
        let ticket = self.controller.begin_load(course_id, entry.clone());
        self.spawn_fetch(ticket.clone(), entry);
        ticket
    }

    /// Re-fetch the current course, keeping position and outline state.
    pub fn refresh(&mut self) -> Option<LoadTicket> {
        let course_id = self.controller.course_id()?.clone();
        let entry = self.controller.position().clone();
        debug!(%course_id, "refreshing course structure");
        self.dispatched = None;
        let ticket = self.controller.begin_load(course_id, entry.clone());
        self.spawn_fetch(ticket.clone(), entry);
        Some(ticket)
    }

    /// The learner passed the entrance exam; gating must be re-read.
    pub fn entrance_exam_passed(&mut self) -> Option<LoadTicket> {
        info!(course_id = ?self.controller.course_id(), "entrance exam passed");
        self.refresh()
    }

    fn spawn_fetch(&self, ticket: LoadTicket, requested: Position) {
        let provider = Arc::clone(&self.provider);
        let tx = self.loads_tx.clone();
        tokio::spawn(async move {
            let result = provider.fetch_course_structure(ticket.course_id()).await;
            let message = LoadMessage {
                ticket,
                requested,
                result,
            };
            if tx.send(message).is_err() {
                debug!("session closed before course structure arrived");
            }
        });
    }

    /// Wait for the in-flight load and apply it.
    ///
    /// Stale results that arrive first are discarded. Returns `None` when no
    /// load is in flight.
    pub async fn settle(&mut self) -> Option<LoadOutcome> {
        while self.is_loading() {
            let message = self.loads_rx.recv().await?;
            let outcome = self.apply(message);
            if outcome != LoadOutcome::Stale {
                return Some(outcome);
            }
        }
        None
    }

    /// Apply every load result that has already arrived, without waiting.
    pub fn drain_loads(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(message) = self.loads_rx.try_recv() {
            outcomes.push(self.apply(message));
        }
        outcomes
    }

    fn apply(&mut self, message: LoadMessage) -> LoadOutcome {
        let LoadMessage {
            ticket,
            requested,
            result,
        } = message;
        let course_id = ticket.course_id().clone();

        let result = result.map_err(|err| {
            if self.controller.is_current(&ticket) {
                error!(%course_id, error = %err, "failed to load course structure");
            }
            err.failure_reason()
        });
        let outcome = self.controller.complete_load(&ticket, result);

        match &outcome {
            LoadOutcome::Stale => {
                debug!(%course_id, serial = ticket.serial(), "discarding stale course structure");
            }
            LoadOutcome::Failed(reason) => {
                self.expansion = None;
                warn!(%course_id, reason = reason.code(), "course unavailable");
            }
            LoadOutcome::Ready {
                position,
                correction,
                replay,
            } => {
                self.adopt_tree();
                if let Some(correction) = correction {
                    info!(%course_id, ?correction, ?position, "entry position corrected");
                }
                if *position != requested {
                    self.router
                        .navigate(&Route::courseware(course_id, position), RouteMode::Replace);
                }
                if let Some(replay) = replay {
                    self.dispatch(replay);
                }
            }
        }
        outcome
    }

    fn adopt_tree(&mut self) {
        let Some(tree) = self.controller.tree() else {
            return;
        };
        for mismatch in tree.completion_mismatches() {
            warn!(course_id = %tree.course().id, ?mismatch, "completion flag disagrees with children");
        }
        self.expansion
            .get_or_insert_with(OutlineExpansionState::default)
            .reconcile(tree);
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    pub fn next(&mut self) -> Outcome {
        self.navigate(NavRequest::Next)
    }

    pub fn previous(&mut self) -> Outcome {
        self.navigate(NavRequest::Previous)
    }

    pub fn jump(&mut self, sequence_id: SequenceId) -> Outcome {
        self.navigate(NavRequest::Jump(sequence_id))
    }

    pub fn select_unit(&mut self, unit_id: UnitId) -> Outcome {
        self.navigate(NavRequest::SelectUnit(unit_id))
    }

    pub fn navigate(&mut self, request: NavRequest) -> Outcome {
        let outcome = self.controller.request(request);
        self.dispatch(&outcome);
        outcome
    }

    fn dispatch(&mut self, outcome: &Outcome) {
        let Some(course_id) = self.controller.course_id().cloned() else {
            return;
        };
        match outcome {
            Outcome::Navigated { destination, event } => {
                if self.dispatched.as_ref() == Some(destination) {
                    debug!(?destination, "destination already dispatched");
                    return;
                }
                self.dispatched = Some(destination.clone());
                self.analytics.track(&course_id, event);
                let route = Route::from_destination(course_id, destination);
                debug!(route = %route, "navigating");
                self.router.navigate(&route, RouteMode::Push);
            }
            Outcome::Blocked {
                sequence_id,
                reason,
            } => {
                info!(%course_id, %sequence_id, reason = reason.code(), "navigation blocked");
            }
            Outcome::Deferred => debug!(%course_id, "navigation deferred until load completes"),
            Outcome::NoOp(reason) => debug!(%course_id, ?reason, "navigation ignored"),
        }
    }

    /// The host committed a route (navigation, deep link or history).
    pub fn route_changed(&mut self, position: Position) -> Option<Correction> {
        self.dispatched = None;
        let correction = self.controller.sync_route(position)?;
        if let Some(course_id) = self.controller.course_id() {
            let route = Route::courseware(course_id.clone(), self.controller.position());
            info!(?correction, route = %route, "route corrected");
            self.router.navigate(&route, RouteMode::Replace);
        }
        Some(correction)
    }

    pub fn set_exam_session(&mut self, exam: ExamSession) {
        debug!(?exam, "exam session updated");
        self.dispatched = None;
        self.controller.set_exam_session(exam);
    }

    //
    // ─── OUTLINE & VIEWER ──────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `OutlineError::NotLoaded` before the first tree arrives, or
    /// `OutlineError::UnknownSection` for ids outside the course.
    pub fn toggle_section(&mut self, section_id: &SectionId) -> Result<bool, OutlineError> {
        let (Some(tree), Some(expansion)) = (self.controller.tree(), self.expansion.as_mut()) else {
            return Err(OutlineError::NotLoaded);
        };
        let current = self.controller.position().sequence_id.as_ref();
        expansion
            .toggle_section(tree, section_id, current)
            .ok_or_else(|| OutlineError::UnknownSection(section_id.clone()))
    }

    /// # Errors
    ///
    /// Returns `OutlineError::NotLoaded` before the first tree arrives.
    pub fn toggle_expand_all(&mut self) -> Result<bool, OutlineError> {
        self.expansion
            .as_mut()
            .map(OutlineExpansionState::toggle_expand_all)
            .ok_or(OutlineError::NotLoaded)
    }

    /// # Errors
    ///
    /// Returns `OutlineError::NotLoaded` before the first tree arrives.
    pub fn outline(&self) -> Result<OutlineView, OutlineError> {
        let (Some(tree), Some(expansion)) = (self.controller.tree(), self.expansion.as_ref()) else {
            return Err(OutlineError::NotLoaded);
        };
        Ok(build_outline(
            tree,
            expansion,
            self.controller.position(),
            &self.controller.exam_session(),
        ))
    }

    #[must_use]
    pub fn viewer(&self) -> ViewerState {
        viewer_state(&self.controller)
    }
}
