use crate::model::course::{Course, EntranceExam, GatedContent, ResumeCourse, Section, Sequence, Unit};
use crate::model::ids::{CourseId, SectionId, SequenceId, UnitId};
use crate::model::tree::{CourseTree, TreeError};

/// Fluent construction of a [`CourseTree`] for fixtures and demos.
///
/// ```
/// use courseware_core::model::CourseTree;
///
/// let tree = CourseTree::builder("course-v1:demo")
///     .section("s1", "Week 1", |s| s.sequence("q1", "Intro", |q| q.unit("u1").unit("u2")))
///     .build()
///     .unwrap();
/// assert_eq!(tree.sequence_order().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CourseTreeBuilder {
    course: Course,
    sections: Vec<Section>,
    sequences: Vec<Sequence>,
    units: Vec<Unit>,
}

impl CourseTree {
    #[must_use]
    pub fn builder(course_id: impl Into<CourseId>) -> CourseTreeBuilder {
        CourseTreeBuilder::new(course_id)
    }
}

impl CourseTreeBuilder {
    #[must_use]
    pub fn new(course_id: impl Into<CourseId>) -> Self {
        let course_id = course_id.into();
        let title = course_id.to_string();
        Self {
            course: Course::new(course_id, title),
            sections: Vec::new(),
            sequences: Vec::new(),
            units: Vec::new(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.course.title = title.into();
        self
    }

    #[must_use]
    pub fn self_paced(mut self, is_self_paced: bool) -> Self {
        self.course.is_self_paced = is_self_paced;
        self
    }

    #[must_use]
    pub fn entrance_exam(mut self, section_id: impl Into<SectionId>, passed: bool) -> Self {
        self.course.entrance_exam = Some(EntranceExam {
            section_id: section_id.into(),
            passed,
        });
        self
    }

    #[must_use]
    pub fn resume(mut self, has_visited_course: bool, unit_id: Option<&str>) -> Self {
        self.course.resume_course = Some(ResumeCourse {
            has_visited_course,
            unit_id: unit_id.map(UnitId::new),
        });
        self
    }

    #[must_use]
    pub fn section(
        mut self,
        id: impl Into<SectionId>,
        title: impl Into<String>,
        build: impl FnOnce(SectionBuilder) -> SectionBuilder,
    ) -> Self {
        let built = build(SectionBuilder::new(Section::new(id.into(), title)));
        self.course.section_ids.push(built.section.id.clone());
        self.sections.push(built.section);
        self.sequences.extend(built.sequences);
        self.units.extend(built.units);
        self
    }

    /// # Errors
    ///
    /// Returns `TreeError` if the assembled hierarchy is inconsistent.
    pub fn build(self) -> Result<CourseTree, TreeError> {
        CourseTree::new(self.course, self.sections, self.sequences, self.units)
    }
}

#[derive(Debug, Clone)]
pub struct SectionBuilder {
    section: Section,
    sequences: Vec<Sequence>,
    units: Vec<Unit>,
}

impl SectionBuilder {
    fn new(section: Section) -> Self {
        Self {
            section,
            sequences: Vec::new(),
            units: Vec::new(),
        }
    }

    #[must_use]
    pub fn complete(mut self) -> Self {
        self.section.complete = true;
        self
    }

    #[must_use]
    pub fn resume_block(mut self) -> Self {
        self.section.resume_block = true;
        self
    }

    #[must_use]
    pub fn sequence(
        mut self,
        id: impl Into<SequenceId>,
        title: impl Into<String>,
        build: impl FnOnce(SequenceBuilder) -> SequenceBuilder,
    ) -> Self {
        let built = build(SequenceBuilder::new(Sequence::new(id.into(), title)));
        self.section.sequence_ids.push(built.sequence.id.clone());
        self.sequences.push(built.sequence);
        self.units.extend(built.units);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    sequence: Sequence,
    units: Vec<Unit>,
}

impl SequenceBuilder {
    fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            units: Vec::new(),
        }
    }

    #[must_use]
    pub fn unit(self, id: impl Into<UnitId>) -> Self {
        self.push_unit(id.into(), false)
    }

    #[must_use]
    pub fn completed_unit(self, id: impl Into<UnitId>) -> Self {
        self.push_unit(id.into(), true)
    }

    fn push_unit(mut self, id: UnitId, complete: bool) -> Self {
        let mut unit = Unit::new(id, self.sequence.id.clone());
        unit.complete = complete;
        self.sequence.unit_ids.push(unit.id.clone());
        self.units.push(unit);
        self
    }

    #[must_use]
    pub fn complete(mut self) -> Self {
        self.sequence.complete = true;
        self
    }

    #[must_use]
    pub fn gated(mut self, prereq_id: Option<&str>) -> Self {
        self.sequence.gated_content = Some(GatedContent {
            gated: true,
            prereq_id: prereq_id.map(SequenceId::new),
            prereq_section_name: None,
        });
        self
    }

    #[must_use]
    pub fn hidden_after_due(mut self) -> Self {
        self.sequence.is_hidden_after_due = true;
        self
    }

    #[must_use]
    pub fn time_limited(mut self) -> Self {
        self.sequence.is_time_limited = true;
        self
    }

    #[must_use]
    pub fn proctored(mut self) -> Self {
        self.sequence.is_time_limited = true;
        self.sequence.is_proctored = true;
        self
    }

    #[must_use]
    pub fn display_only(mut self) -> Self {
        self.sequence.show_link = false;
        self
    }

    #[must_use]
    pub fn active_unit_index(mut self, index: usize) -> Self {
        self.sequence.active_unit_index = Some(index);
        self
    }
}
