use courseware_core::NavigationController;
use courseware_core::PositionResolver;
use courseware_core::model::{SequenceId, UnitId};
use courseware_core::navigation::gating::{self, BlockReason};
use courseware_core::navigation::{FailureReason, NavState};
use serde::Serialize;

/// What the sequence viewer should render for the current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ViewerState {
    /// Structure still loading for a known sequence.
    Loading { sequence_id: SequenceId },
    NoContent,
    Failed(FailureReason),
    /// Substitute notice in place of the sequence content.
    Notice {
        sequence_id: SequenceId,
        reason: BlockReason,
        prereq_id: Option<SequenceId>,
        prereq_section_name: Option<String>,
    },
    Content {
        sequence_id: SequenceId,
        unit_id: Option<UnitId>,
        unit_index: Option<usize>,
        unit_count: usize,
        is_time_limited: bool,
        exam_active: bool,
    },
}

#[must_use]
pub fn viewer_state(controller: &NavigationController) -> ViewerState {
    let position = controller.position();
    match controller.state() {
        NavState::Resolving => {
            return position
                .sequence_id
                .clone()
                .map_or(ViewerState::NoContent, |sequence_id| ViewerState::Loading {
                    sequence_id,
                });
        }
        NavState::Failed(reason) => return ViewerState::Failed(*reason),
        _ => {}
    }

    let (Some(tree), Some(sequence_id)) = (controller.tree(), position.sequence_id.as_ref()) else {
        return ViewerState::NoContent;
    };
    let Some(sequence) = tree.sequence(sequence_id) else {
        return ViewerState::NoContent;
    };

    let exam = controller.exam_session();
    if let Err(reason) = gating::check_entry(tree, sequence_id, &exam) {
        let gate = sequence.gated_content.as_ref();
        return ViewerState::Notice {
            sequence_id: sequence_id.clone(),
            reason,
            prereq_id: gate.and_then(|gate| gate.prereq_id.clone()),
            prereq_section_name: gate.and_then(|gate| gate.prereq_section_name.clone()),
        };
    }

    ViewerState::Content {
        sequence_id: sequence_id.clone(),
        unit_id: position.unit_id.clone(),
        unit_index: position
            .unit_id
            .as_ref()
            .and_then(|unit_id| PositionResolver::new(tree).index_in_sequence(unit_id)),
        unit_count: sequence.unit_ids.len(),
        is_time_limited: sequence.is_time_limited,
        exam_active: sequence.is_time_limited && exam.is_active(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_core::model::{CourseId, CourseTree, Position};

    fn tree() -> CourseTree {
        CourseTree::builder("c")
            .section("s", "S", |s| {
                s.sequence("q1", "A", |q| q.unit("u1").unit("u2"))
                    .sequence("q2", "B", |q| q.gated(Some("q1")).unit("u3"))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn loading_then_content() {
        let mut controller = NavigationController::new();
        let ticket = controller.begin_load(CourseId::new("c"), Position::new("q1", "u2"));
        assert_eq!(
            viewer_state(&controller),
            ViewerState::Loading {
                sequence_id: SequenceId::new("q1"),
            }
        );

        controller.complete_load(&ticket, Ok(tree()));
        assert_eq!(
            viewer_state(&controller),
            ViewerState::Content {
                sequence_id: SequenceId::new("q1"),
                unit_id: Some(UnitId::new("u2")),
                unit_index: Some(1),
                unit_count: 2,
                is_time_limited: false,
                exam_active: false,
            }
        );
    }

    #[test]
    fn gated_sequence_renders_notice_with_prerequisite() {
        let mut controller = NavigationController::new();
        let ticket = controller.begin_load(CourseId::new("c"), Position::in_sequence("q2"));
        controller.complete_load(&ticket, Ok(tree()));

        let ViewerState::Notice {
            reason, prereq_id, ..
        } = viewer_state(&controller)
        else {
            panic!("expected notice");
        };
        assert_eq!(reason, BlockReason::Gated);
        assert_eq!(prereq_id, Some(SequenceId::new("q1")));
    }

    #[test]
    fn loading_without_sequence_has_no_content() {
        let mut controller = NavigationController::new();
        controller.begin_load(CourseId::new("c"), Position::empty());
        assert_eq!(viewer_state(&controller), ViewerState::NoContent);
    }
}
