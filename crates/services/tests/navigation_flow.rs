use std::sync::Arc;
use std::time::Duration;

use courseware_core::model::{CourseId, CourseTree, Position, SectionId, SequenceId, UnitId};
use courseware_core::navigation::{
    BlockReason, Correction, Destination, ExamSession, ExamStatus, FailureReason, LoadOutcome,
    NavState, NavigationEventName, NoOpReason, Outcome,
};
use provider::{InMemoryProvider, JsonFileProvider};
use services::courseware::ResumeAction;
use services::{
    CoursewareSession, OutlineError, RecordingAnalytics, RecordingRouter, Route, RouteMode,
    ViewerState,
};

fn two_sections(course_id: &str) -> CourseTree {
    CourseTree::builder(course_id)
        .section("S1", "One", |s| s.sequence("Q1", "First", |q| q.unit("U1").unit("U2")))
        .section("S2", "Two", |s| s.sequence("Q2", "Second", |q| q.unit("U3")))
        .build()
        .unwrap()
}

struct Harness {
    session: CoursewareSession,
    provider: InMemoryProvider,
    router: RecordingRouter,
    analytics: RecordingAnalytics,
}

fn harness(provider: InMemoryProvider) -> Harness {
    let router = RecordingRouter::new();
    let analytics = RecordingAnalytics::new();
    let session = CoursewareSession::new(
        Arc::new(provider.clone()),
        Arc::new(router.clone()),
        Arc::new(analytics.clone()),
    );
    Harness {
        session,
        provider,
        router,
        analytics,
    }
}

/// Report the last pushed route back as committed.
fn commit(h: &mut Harness) {
    let (route, _) = h.router.last().expect("a route was pushed");
    let position = route.position().expect("courseware route");
    assert_eq!(h.session.route_changed(position), None);
}

#[tokio::test]
async fn next_and_previous_cross_sections_and_exit() {
    let mut h = harness(InMemoryProvider::new().with_course(two_sections("demo")));
    h.session.open(CourseId::new("demo"), Position::new("Q1", "U2"));
    assert!(matches!(
        h.session.settle().await,
        Some(LoadOutcome::Ready {
            correction: None,
            ..
        })
    ));

    let outcome = h.session.next();
    assert!(matches!(outcome, Outcome::Navigated { .. }));
    assert_eq!(
        h.router.last(),
        Some((
            Route::courseware(CourseId::new("demo"), &Position::new("Q2", "U3")),
            RouteMode::Push
        ))
    );
    commit(&mut h);

    let outcome = h.session.next();
    assert!(matches!(
        outcome,
        Outcome::Navigated {
            destination: Destination::CourseExit,
            ..
        }
    ));
    assert_eq!(
        h.router.last().map(|(route, _)| route.path()),
        Some("/course/demo/course-end".to_owned())
    );

    let outcome = h.session.previous();
    assert!(matches!(
        outcome,
        Outcome::Navigated { ref destination, .. }
            if destination.position() == Some(Position::new("Q1", "U2"))
    ));

    let names: Vec<_> = h.analytics.events().iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        vec![
            NavigationEventName::NextSelected,
            NavigationEventName::NextSelected,
            NavigationEventName::PreviousSelected,
        ]
    );
}

#[tokio::test]
async fn repeated_next_before_commit_targets_the_same_unit() {
    let mut h = harness(InMemoryProvider::new().with_course(two_sections("demo")));
    h.session.open(CourseId::new("demo"), Position::new("Q1", "U1"));
    h.session.settle().await;
    let pushes = h.router.calls().len();
    let events = h.analytics.events().len();

    let first = h.session.next();
    let second = h.session.next();
    assert_eq!(first, second);
    assert_eq!(h.router.calls().len(), pushes + 1);
    assert_eq!(h.analytics.events().len(), events + 1);

    commit(&mut h);
    assert_eq!(h.session.position(), &Position::new("Q1", "U2"));

    // Once committed, the next move is dispatched again.
    h.session.next();
    assert_eq!(h.router.calls().len(), pushes + 2);
    assert_eq!(h.analytics.events().len(), events + 2);
}

#[tokio::test(start_paused = true)]
async fn slow_stale_load_does_not_overwrite_newer_course() {
    let provider = InMemoryProvider::new()
        .with_course(two_sections("X"))
        .with_course(two_sections("Y"));
    provider.set_delay(CourseId::new("X"), Duration::from_secs(5));
    provider.set_delay(CourseId::new("Y"), Duration::from_secs(1));
    let mut h = harness(provider);

    h.session.open(CourseId::new("X"), Position::empty());
    h.session.open(CourseId::new("Y"), Position::empty());
    assert!(matches!(
        h.session.settle().await,
        Some(LoadOutcome::Ready { .. })
    ));
    assert_eq!(h.session.course_id(), Some(&CourseId::new("Y")));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.session.drain_loads(), vec![LoadOutcome::Stale]);
    assert_eq!(h.session.course_id(), Some(&CourseId::new("Y")));
    assert_eq!(h.session.state(), &NavState::Idle);
    assert_eq!(h.provider.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn fast_stale_load_is_skipped_while_waiting_for_newer_course() {
    let provider = InMemoryProvider::new()
        .with_course(two_sections("X"))
        .with_course(two_sections("Y"));
    provider.set_delay(CourseId::new("X"), Duration::from_secs(1));
    provider.set_delay(CourseId::new("Y"), Duration::from_secs(5));
    let mut h = harness(provider);

    h.session.open(CourseId::new("X"), Position::empty());
    h.session.open(CourseId::new("Y"), Position::empty());
    h.session.settle().await;

    assert_eq!(h.session.course_id(), Some(&CourseId::new("Y")));
    assert_eq!(
        h.session.controller().tree().map(|t| t.course().id.clone()),
        Some(CourseId::new("Y"))
    );
}

#[tokio::test]
async fn jump_into_gated_sequence_is_blocked_but_listed() {
    let tree = CourseTree::builder("demo")
        .section("S1", "One", |s| s.sequence("Q1", "First", |q| q.unit("U1").unit("U2")))
        .section("S2", "Two", |s| {
            s.sequence("Q2", "Second", |q| q.gated(Some("Q1")).unit("U3"))
        })
        .build()
        .unwrap();
    let mut h = harness(InMemoryProvider::new().with_course(tree));
    h.session.open(CourseId::new("demo"), Position::new("Q1", "U1"));
    h.session.settle().await;
    let routes_before = h.router.calls().len();

    assert_eq!(
        h.session.jump(SequenceId::new("Q2")),
        Outcome::Blocked {
            sequence_id: SequenceId::new("Q2"),
            reason: BlockReason::Gated,
        }
    );
    assert_eq!(h.router.calls().len(), routes_before);
    assert!(h.analytics.events().is_empty());

    let outline = h.session.outline().unwrap();
    let row = &outline.sections[1].sequences[0];
    assert_eq!(row.id, SequenceId::new("Q2"));
    assert_eq!(row.blocked, Some(BlockReason::Gated));
}

#[tokio::test]
async fn request_during_load_is_replayed_once_structure_arrives() {
    let mut h = harness(InMemoryProvider::new().with_course(two_sections("demo")));
    h.session.open(CourseId::new("demo"), Position::new("Q1", "U1"));

    assert_eq!(h.session.next(), Outcome::Deferred);
    assert_eq!(h.session.viewer(), ViewerState::Loading {
        sequence_id: SequenceId::new("Q1"),
    });

    let Some(LoadOutcome::Ready {
        replay: Some(replay),
        ..
    }) = h.session.settle().await
    else {
        panic!("expected replayed request");
    };
    assert!(matches!(replay, Outcome::Navigated { .. }));
    assert_eq!(
        h.router.last().map(|(route, mode)| (route.path(), mode)),
        Some(("/course/demo/Q1/U2".to_owned(), RouteMode::Push))
    );
}

#[tokio::test]
async fn unit_id_in_sequence_slot_is_replaced_in_history() {
    let mut h = harness(InMemoryProvider::new().with_course(two_sections("demo")));
    h.session.open(CourseId::new("demo"), Position::in_sequence("U3"));

    let Some(LoadOutcome::Ready { correction, .. }) = h.session.settle().await else {
        panic!("load should succeed");
    };
    assert_eq!(
        correction,
        Some(Correction::SequenceWasUnit {
            unit_id: UnitId::new("U3"),
        })
    );
    assert_eq!(
        h.router.last().map(|(route, mode)| (route.path(), mode)),
        Some(("/course/demo/Q2/U3".to_owned(), RouteMode::Replace))
    );
}

#[tokio::test]
async fn stale_deep_link_is_corrected_on_route_change() {
    let mut h = harness(InMemoryProvider::new().with_course(two_sections("demo")));
    h.session.open(CourseId::new("demo"), Position::new("Q1", "U1"));
    h.session.settle().await;

    let correction = h.session.route_changed(Position::new("Q9", "U9"));
    assert_eq!(
        correction,
        Some(Correction::UnknownSequence {
            requested: SequenceId::new("Q9"),
        })
    );
    assert_eq!(h.session.position(), &Position::new("Q1", "U1"));
    assert_eq!(h.router.last().map(|(_, mode)| mode), Some(RouteMode::Replace));
}

#[tokio::test]
async fn active_exam_holds_learner_in_timed_sequence() {
    let tree = CourseTree::builder("demo")
        .section("S1", "One", |s| {
            s.sequence("Q1", "Before", |q| q.unit("U1"))
                .sequence("EX", "Timed exam", |q| q.time_limited().unit("E1").unit("E2"))
        })
        .build()
        .unwrap();
    let mut h = harness(InMemoryProvider::new().with_course(tree));
    h.session.open(CourseId::new("demo"), Position::new("EX", "E1"));
    h.session.settle().await;
    h.session.set_exam_session(ExamSession {
        status: ExamStatus::Active,
        can_access_proctored_exams: true,
    });

    assert!(matches!(
        h.session.previous(),
        Outcome::Blocked {
            reason: BlockReason::ExamInProgress,
            ..
        }
    ));
    assert!(matches!(
        h.session.viewer(),
        ViewerState::Content {
            exam_active: true,
            ..
        }
    ));

    let outcome = h.session.select_unit(UnitId::new("E2"));
    let Outcome::Navigated { event, .. } = outcome else {
        panic!("tab selection inside the exam is allowed");
    };
    assert_eq!(event.name, NavigationEventName::TabSelected);
    assert_eq!((event.current_index, event.target_index), (1, Some(2)));
}

#[tokio::test]
async fn passing_entrance_exam_refetches_and_keeps_outline_state() {
    let gated = |passed: bool| {
        CourseTree::builder("demo")
            .entrance_exam("entrance", passed)
            .section("entrance", "Entrance", |s| s.sequence("EXAM", "Exam", |q| q.unit("X1")))
            .section("S1", "One", |s| s.sequence("Q1", "First", |q| q.unit("U1")))
            .build()
            .unwrap()
    };
    let mut h = harness(InMemoryProvider::new().with_course(gated(false)));
    h.session.open(CourseId::new("demo"), Position::new("EXAM", "X1"));
    h.session.settle().await;

    assert!(matches!(
        h.session.jump(SequenceId::new("Q1")),
        Outcome::Blocked {
            reason: BlockReason::EntranceExamRequired,
            ..
        }
    ));
    assert_eq!(h.session.toggle_section(&SectionId::new("S1")), Ok(true));

    h.provider.insert(gated(true));
    assert!(h.session.entrance_exam_passed().is_some());
    h.session.settle().await;

    assert_eq!(h.provider.fetch_count(), 2);
    assert_eq!(h.session.position(), &Position::new("EXAM", "X1"));
    let outline = h.session.outline().unwrap();
    assert!(outline.sections[1].open);
    assert!(outline.sections[1].sequences[0].blocked.is_none());
    assert!(matches!(
        h.session.jump(SequenceId::new("Q1")),
        Outcome::Navigated { .. }
    ));
}

#[tokio::test]
async fn unknown_course_fails_and_outline_is_unavailable() {
    let mut h = harness(InMemoryProvider::new());
    h.session.open(CourseId::new("ghost"), Position::empty());

    assert_eq!(
        h.session.settle().await,
        Some(LoadOutcome::Failed(FailureReason::NotFound))
    );
    assert_eq!(h.session.viewer(), ViewerState::Failed(FailureReason::NotFound));
    assert_eq!(h.session.outline().unwrap_err(), OutlineError::NotLoaded);
    assert_eq!(h.session.next(), Outcome::NoOp(NoOpReason::NotLoaded));
    assert_eq!(h.session.settle().await, None);
}

#[tokio::test]
async fn fixture_course_outline_and_expansion() {
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../provider/tests/fixtures/course.json"
    );
    let router = RecordingRouter::new();
    let mut session = CoursewareSession::new(
        Arc::new(JsonFileProvider::file(path)),
        Arc::new(router.clone()),
        Arc::new(RecordingAnalytics::new()),
    );
    session.open(CourseId::new("course-v1:edX+Demo+2024"), Position::empty());
    session.settle().await;

    assert_eq!(session.position(), &Position::new("basics", "basics-2"));
    assert_eq!(
        router.last().map(|(route, _)| route.path()),
        Some("/course/course-v1:edX+Demo+2024/basics/basics-2".to_owned())
    );

    let outline = session.outline().unwrap();
    let resume = outline.resume.as_ref().unwrap();
    assert_eq!(resume.action, ResumeAction::Resume);
    let open: Vec<_> = outline.sections.iter().map(|s| s.open).collect();
    assert_eq!(open, vec![false, true, false, false]);

    assert!(session.toggle_expand_all().unwrap());
    let outline = session.outline().unwrap();
    assert!(outline.expand_all_active);
    assert!(outline.sections.iter().all(|s| s.open));

    assert_eq!(
        session.toggle_section(&SectionId::new("nowhere")),
        Err(OutlineError::UnknownSection(SectionId::new("nowhere")))
    );
}
