use courseware_core::OutlineExpansionState;
use courseware_core::PositionResolver;
use courseware_core::model::{CourseTree, Position, SectionId, SequenceId};
use courseware_core::navigation::gating::{self, BlockReason, ExamSession};
use serde::Serialize;

use super::route::Route;

/// Presentation-agnostic snapshot of the course outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineView {
    pub course_title: String,
    /// True when the toggle reads "collapse all".
    pub expand_all_active: bool,
    pub resume: Option<ResumeCard>,
    pub sections: Vec<SectionRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResumeAction {
    Start,
    Resume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeCard {
    pub action: ResumeAction,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRow {
    pub id: SectionId,
    pub title: String,
    pub complete: bool,
    pub open: bool,
    pub resume_block: bool,
    pub sequences: Vec<SequenceRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceRow {
    pub id: SequenceId,
    pub title: String,
    pub complete: bool,
    pub is_current: bool,
    /// Absent for display-only sequences.
    pub link: Option<Route>,
    /// Locked sequences are still listed so learners can see what is ahead.
    pub blocked: Option<BlockReason>,
}

#[must_use]
pub fn build_outline(
    tree: &CourseTree,
    expansion: &OutlineExpansionState,
    position: &Position,
    exam: &ExamSession,
) -> OutlineView {
    let course = tree.course();
    let current = position.sequence_id.as_ref();

    let sections = tree
        .sections()
        .map(|section| SectionRow {
            id: section.id.clone(),
            title: section.title.clone(),
            complete: section.complete,
            open: expansion
                .is_open(tree, &section.id, current)
                .unwrap_or(section.resume_block),
            resume_block: section.resume_block,
            sequences: section
                .sequence_ids
                .iter()
                .filter_map(|id| tree.sequence(id))
                .map(|sequence| SequenceRow {
                    id: sequence.id.clone(),
                    title: sequence.title.clone(),
                    complete: sequence.complete,
                    is_current: current == Some(&sequence.id),
                    link: sequence.show_link.then(|| {
                        Route::courseware(course.id.clone(), &Position::in_sequence(sequence.id.clone()))
                    }),
                    blocked: gating::check_entry(tree, &sequence.id, exam).err(),
                })
                .collect(),
        })
        .collect();

    OutlineView {
        course_title: course.title.clone(),
        expand_all_active: expansion.expand_all_active(),
        resume: resume_card(tree),
        sections,
    }
}

/// The start/resume card; hidden when the course has nothing to point at.
fn resume_card(tree: &CourseTree) -> Option<ResumeCard> {
    let course = tree.course();
    let resume = course.resume_course.as_ref();
    let visited = resume.is_some_and(|resume| resume.has_visited_course);

    let target = resume
        .and_then(|resume| resume.unit_id.as_ref())
        .and_then(|unit_id| {
            tree.sequence_of(unit_id)
                .map(|sequence_id| Position::new(sequence_id.clone(), unit_id.clone()))
        })
        .or_else(|| {
            let first = tree.first_sequence()?;
            Some(Position {
                sequence_id: Some(first.clone()),
                unit_id: PositionResolver::new(tree).default_unit(first),
            })
        })?;

    Some(ResumeCard {
        action: if visited {
            ResumeAction::Resume
        } else {
            ResumeAction::Start
        },
        route: Route::courseware(course.id.clone(), &target),
    })
}
