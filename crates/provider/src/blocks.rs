//! The course-blocks JSON payload served by the course structure endpoint.
//!
//! Blocks arrive as id-keyed maps; ordering comes from the parents' child id
//! lists. Unit blocks are optional: units listed by a sequence but absent
//! from `units` are synthesized with default metadata.

use std::collections::HashMap;

use courseware_core::model::{
    Course, CourseId, CourseTree, EntranceExam, GatedContent, ResumeCourse, Section, SectionId,
    Sequence, SequenceId, TreeError, Unit, UnitId,
};
use serde::Deserialize;

use crate::repository::FetchError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBlocksPayload {
    pub course_id: CourseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_self_paced: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub entrance_exam: Option<EntranceExamBlock>,
    #[serde(default)]
    pub resume_course: Option<ResumeCourseBlock>,
    pub course_blocks: CourseBlocks,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntranceExamBlock {
    pub section_id: SectionId,
    #[serde(default)]
    pub passed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCourseBlock {
    #[serde(default)]
    pub has_visited_course: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseBlocks {
    #[serde(default)]
    pub courses: HashMap<CourseId, CourseBlock>,
    #[serde(default)]
    pub sections: HashMap<SectionId, SectionBlock>,
    #[serde(default)]
    pub sequences: HashMap<SequenceId, SequenceBlock>,
    #[serde(default)]
    pub units: HashMap<UnitId, UnitBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBlock {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub section_ids: Vec<SectionId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBlock {
    pub title: String,
    #[serde(default)]
    pub sequence_ids: Vec<SequenceId>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub resume_block: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceBlock {
    pub title: String,
    #[serde(default)]
    pub unit_ids: Vec<UnitId>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub is_time_limited: bool,
    #[serde(default)]
    pub is_proctored: bool,
    #[serde(default)]
    pub is_hidden_after_due: bool,
    #[serde(default)]
    pub gated_content: Option<GatedContentBlock>,
    #[serde(default = "default_show_link")]
    pub show_link: bool,
    #[serde(default)]
    pub active_unit_index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedContentBlock {
    #[serde(default)]
    pub gated: bool,
    #[serde(default)]
    pub prereq_id: Option<SequenceId>,
    #[serde(default)]
    pub gated_section_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBlock {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub content_type: Option<String>,
}

fn default_show_link() -> bool {
    true
}

/// Decode and validate a course-blocks payload.
///
/// # Errors
///
/// Returns `FetchError::Decode` for invalid JSON, `FetchError::Malformed`
/// when the course block is missing, or `FetchError::Tree` when the
/// hierarchy is inconsistent.
pub fn parse_course_blocks(bytes: &[u8]) -> Result<CourseTree, FetchError> {
    let payload: CourseBlocksPayload = serde_json::from_slice(bytes)?;
    payload.into_tree()
}

impl CourseBlocksPayload {
    /// # Errors
    ///
    /// See [`parse_course_blocks`].
    pub fn into_tree(self) -> Result<CourseTree, FetchError> {
        let CourseBlocks {
            mut courses,
            sections,
            sequences,
            units,
        } = self.course_blocks;

        let course_block = courses.remove(&self.course_id).ok_or_else(|| {
            FetchError::Malformed(format!("no course block for {}", self.course_id))
        })?;

        let title = if self.title.is_empty() {
            course_block.title.unwrap_or_default()
        } else {
            self.title
        };
        let mut course = Course::new(self.course_id, title);
        course.section_ids = course_block.section_ids;
        course.is_self_paced = self.is_self_paced;
        course.is_staff = self.is_staff;
        course.entrance_exam = self.entrance_exam.map(|exam| EntranceExam {
            section_id: exam.section_id,
            passed: exam.passed,
        });
        course.resume_course = self.resume_course.map(|resume| ResumeCourse {
            has_visited_course: resume.has_visited_course,
            unit_id: resume.unit_id,
        });

        let sections = sections
            .into_iter()
            .map(|(id, block)| {
                let mut section = Section::new(id, block.title);
                section.sequence_ids = block.sequence_ids;
                section.complete = block.complete;
                section.resume_block = block.resume_block;
                section
            })
            .collect();

        let mut unit_blocks = units;
        let mut unit_nodes = Vec::with_capacity(unit_blocks.len());
        let mut sequence_nodes = Vec::with_capacity(sequences.len());
        for (id, block) in sequences {
            for unit_id in &block.unit_ids {
                if let Some(unit_block) = unit_blocks.remove(unit_id) {
                    unit_nodes.push(unit_from_block(unit_id.clone(), id.clone(), unit_block));
                } else if !unit_nodes.iter().any(|unit: &Unit| unit.id == *unit_id) {
                    unit_nodes.push(Unit::new(unit_id.clone(), id.clone()));
                }
            }
            sequence_nodes.push(sequence_from_block(id, block));
        }
        // Unit blocks no sequence lists.
        if let Some(unit_id) = unit_blocks.into_keys().next() {
            return Err(TreeError::OrphanUnit(unit_id).into());
        }

        Ok(CourseTree::new(course, sections, sequence_nodes, unit_nodes)?)
    }
}

fn sequence_from_block(id: SequenceId, block: SequenceBlock) -> Sequence {
    let mut sequence = Sequence::new(id, block.title);
    sequence.unit_ids = block.unit_ids;
    sequence.complete = block.complete;
    sequence.is_time_limited = block.is_time_limited;
    sequence.is_proctored = block.is_proctored;
    sequence.is_hidden_after_due = block.is_hidden_after_due;
    sequence.gated_content = block.gated_content.map(|gate| GatedContent {
        gated: gate.gated,
        prereq_id: gate.prereq_id,
        prereq_section_name: gate.gated_section_name,
    });
    sequence.show_link = block.show_link;
    sequence.active_unit_index = block.active_unit_index;
    sequence
}

fn unit_from_block(id: UnitId, sequence_id: SequenceId, block: UnitBlock) -> Unit {
    let mut unit = Unit::new(id, sequence_id);
    if let Some(title) = block.title {
        unit.title = title;
    }
    if let Some(content_type) = block.content_type {
        unit.content_type = content_type;
    }
    unit.complete = block.complete;
    unit
}
