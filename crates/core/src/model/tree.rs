use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::course::{Course, Section, Sequence, Unit};
use crate::model::ids::{SectionId, SequenceId, UnitId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problems found while assembling a `CourseTree`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    #[error("course lists section {0} but it was not supplied")]
    MissingSection(SectionId),

    #[error("section {section} lists sequence {sequence} but it was not supplied")]
    MissingSequence {
        section: SectionId,
        sequence: SequenceId,
    },

    #[error("sequence {sequence} lists unit {unit} but it was not supplied")]
    MissingUnit { sequence: SequenceId, unit: UnitId },

    #[error("section {0} appears more than once")]
    DuplicateSection(SectionId),

    #[error("sequence {0} appears more than once")]
    DuplicateSequence(SequenceId),

    #[error("unit {0} appears more than once")]
    DuplicateUnit(UnitId),

    #[error("sequence {sequence} is listed by both {first} and {second}")]
    SequenceReparented {
        sequence: SequenceId,
        first: SectionId,
        second: SectionId,
    },

    #[error("unit {unit} is listed by both {first} and {second}")]
    UnitReparented {
        unit: UnitId,
        first: SequenceId,
        second: SequenceId,
    },

    #[error("unit {unit} declares parent {declared} but is listed by {listed_in}")]
    UnitParentMismatch {
        unit: UnitId,
        declared: SequenceId,
        listed_in: SequenceId,
    },

    #[error("section {0} is not reachable from the course")]
    OrphanSection(SectionId),

    #[error("sequence {0} does not belong to any section")]
    OrphanSequence(SequenceId),

    #[error("unit {0} does not belong to any sequence")]
    OrphanUnit(UnitId),

    #[error("both {first} and {second} are flagged as the resume section")]
    MultipleResumeSections { first: SectionId, second: SectionId },

    #[error("entrance exam section {0} is not part of the course")]
    UnknownEntranceExamSection(SectionId),
}

/// A `complete` flag that disagrees with the node's descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionMismatch {
    Section { id: SectionId, flagged: bool },
    Sequence { id: SequenceId, flagged: bool },
}

//
// ─── TREE ──────────────────────────────────────────────────────────────────────
//

/// Immutable course hierarchy for one page view.
///
/// Nodes live in flat maps keyed by id; children are ordered id lists and the
/// parent links are reverse maps built once in [`CourseTree::new`].
#[derive(Debug, Clone)]
pub struct CourseTree {
    course: Course,
    sections: HashMap<SectionId, Section>,
    sequences: HashMap<SequenceId, Sequence>,
    units: HashMap<UnitId, Unit>,
    section_of: HashMap<SequenceId, SectionId>,
    sequence_of: HashMap<UnitId, SequenceId>,
    unit_index: HashMap<UnitId, usize>,
    sequence_order: Vec<SequenceId>,
    sequence_index: HashMap<SequenceId, usize>,
    resume_section: Option<SectionId>,
}

impl CourseTree {
    /// Assemble and validate a tree.
    ///
    /// # Errors
    ///
    /// Returns `TreeError` when ids are missing, duplicated, orphaned, or
    /// attached to more than one parent, or when more than one section is
    /// flagged as the resume section.
    pub fn new(
        course: Course,
        sections: Vec<Section>,
        sequences: Vec<Sequence>,
        units: Vec<Unit>,
    ) -> Result<Self, TreeError> {
        let mut section_map = HashMap::with_capacity(sections.len());
        for section in sections {
            if section_map.contains_key(&section.id) {
                return Err(TreeError::DuplicateSection(section.id));
            }
            section_map.insert(section.id.clone(), section);
        }

        let mut sequence_map = HashMap::with_capacity(sequences.len());
        for sequence in sequences {
            if sequence_map.contains_key(&sequence.id) {
                return Err(TreeError::DuplicateSequence(sequence.id));
            }
            sequence_map.insert(sequence.id.clone(), sequence);
        }

        let mut unit_map = HashMap::with_capacity(units.len());
        for unit in units {
            if unit_map.contains_key(&unit.id) {
                return Err(TreeError::DuplicateUnit(unit.id));
            }
            unit_map.insert(unit.id.clone(), unit);
        }

        let mut listed_sections = HashSet::with_capacity(course.section_ids.len());
        let mut section_of = HashMap::with_capacity(sequence_map.len());
        let mut sequence_of = HashMap::with_capacity(unit_map.len());
        let mut unit_index = HashMap::with_capacity(unit_map.len());
        let mut sequence_order = Vec::with_capacity(sequence_map.len());
        let mut resume_section: Option<SectionId> = None;

        for section_id in &course.section_ids {
            let section = section_map
                .get(section_id)
                .ok_or_else(|| TreeError::MissingSection(section_id.clone()))?;
            if !listed_sections.insert(section_id.clone()) {
                return Err(TreeError::DuplicateSection(section_id.clone()));
            }
            if section.resume_block {
                if let Some(first) = &resume_section {
                    return Err(TreeError::MultipleResumeSections {
                        first: first.clone(),
                        second: section_id.clone(),
                    });
                }
                resume_section = Some(section_id.clone());
            }

            for sequence_id in &section.sequence_ids {
                let sequence =
                    sequence_map
                        .get(sequence_id)
                        .ok_or_else(|| TreeError::MissingSequence {
                            section: section_id.clone(),
                            sequence: sequence_id.clone(),
                        })?;
                if let Some(first) = section_of.insert(sequence_id.clone(), section_id.clone()) {
                    return Err(TreeError::SequenceReparented {
                        sequence: sequence_id.clone(),
                        first,
                        second: section_id.clone(),
                    });
                }
                sequence_order.push(sequence_id.clone());

                for (index, unit_id) in sequence.unit_ids.iter().enumerate() {
                    let unit = unit_map.get(unit_id).ok_or_else(|| TreeError::MissingUnit {
                        sequence: sequence_id.clone(),
                        unit: unit_id.clone(),
                    })?;
                    if unit.sequence_id != *sequence_id {
                        return Err(TreeError::UnitParentMismatch {
                            unit: unit_id.clone(),
                            declared: unit.sequence_id.clone(),
                            listed_in: sequence_id.clone(),
                        });
                    }
                    if let Some(first) = sequence_of.insert(unit_id.clone(), sequence_id.clone()) {
                        return Err(TreeError::UnitReparented {
                            unit: unit_id.clone(),
                            first,
                            second: sequence_id.clone(),
                        });
                    }
                    unit_index.insert(unit_id.clone(), index);
                }
            }
        }

        if let Some(orphan) = section_map
            .keys()
            .filter(|id| !listed_sections.contains(*id))
            .min()
        {
            return Err(TreeError::OrphanSection(orphan.clone()));
        }
        if let Some(orphan) = sequence_map
            .keys()
            .filter(|id| !section_of.contains_key(*id))
            .min()
        {
            return Err(TreeError::OrphanSequence(orphan.clone()));
        }
        if let Some(orphan) = unit_map
            .keys()
            .filter(|id| !sequence_of.contains_key(*id))
            .min()
        {
            return Err(TreeError::OrphanUnit(orphan.clone()));
        }

        if let Some(exam) = &course.entrance_exam {
            if !listed_sections.contains(&exam.section_id) {
                return Err(TreeError::UnknownEntranceExamSection(
                    exam.section_id.clone(),
                ));
            }
        }

        let sequence_index = sequence_order
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();

        Ok(Self {
            course,
            sections: section_map,
            sequences: sequence_map,
            units: unit_map,
            section_of,
            sequence_of,
            unit_index,
            sequence_order,
            sequence_index,
            resume_section,
        })
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.get(id)
    }

    #[must_use]
    pub fn sequence(&self, id: &SequenceId) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Sections in course order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> + '_ {
        self.course
            .section_ids
            .iter()
            .filter_map(|id| self.sections.get(id))
    }

    /// Section containing the given sequence.
    #[must_use]
    pub fn section_of(&self, sequence_id: &SequenceId) -> Option<&SectionId> {
        self.section_of.get(sequence_id)
    }

    /// Sequence containing the given unit.
    #[must_use]
    pub fn sequence_of(&self, unit_id: &UnitId) -> Option<&SequenceId> {
        self.sequence_of.get(unit_id)
    }

    #[must_use]
    pub fn sibling_units(&self, sequence_id: &SequenceId) -> Option<&[UnitId]> {
        self.sequences
            .get(sequence_id)
            .map(|sequence| sequence.unit_ids.as_slice())
    }

    #[must_use]
    pub fn sibling_sequences(&self, section_id: &SectionId) -> Option<&[SequenceId]> {
        self.sections
            .get(section_id)
            .map(|section| section.sequence_ids.as_slice())
    }

    /// Zero-based index of a unit inside its own sequence.
    #[must_use]
    pub fn unit_index(&self, unit_id: &UnitId) -> Option<usize> {
        self.unit_index.get(unit_id).copied()
    }

    /// Every sequence of the course, flattened across sections.
    #[must_use]
    pub fn sequence_order(&self) -> &[SequenceId] {
        &self.sequence_order
    }

    /// Zero-based index of a sequence in [`CourseTree::sequence_order`].
    #[must_use]
    pub fn sequence_index(&self, sequence_id: &SequenceId) -> Option<usize> {
        self.sequence_index.get(sequence_id).copied()
    }

    #[must_use]
    pub fn first_sequence(&self) -> Option<&SequenceId> {
        self.sequence_order.first()
    }

    #[must_use]
    pub fn resume_section(&self) -> Option<&Section> {
        self.resume_section
            .as_ref()
            .and_then(|id| self.sections.get(id))
    }

    /// Nodes whose `complete` flag disagrees with their children.
    ///
    /// The flags remain authoritative; this is for diagnostics only.
    #[must_use]
    pub fn completion_mismatches(&self) -> Vec<CompletionMismatch> {
        let mut mismatches = Vec::new();
        for section in self.sections() {
            for sequence_id in &section.sequence_ids {
                let Some(sequence) = self.sequences.get(sequence_id) else {
                    continue;
                };
                if sequence.unit_ids.is_empty() {
                    continue;
                }
                let derived = sequence
                    .unit_ids
                    .iter()
                    .filter_map(|id| self.units.get(id))
                    .all(|unit| unit.complete);
                if derived != sequence.complete {
                    mismatches.push(CompletionMismatch::Sequence {
                        id: sequence.id.clone(),
                        flagged: sequence.complete,
                    });
                }
            }

            if section.sequence_ids.is_empty() {
                continue;
            }
            let derived = section
                .sequence_ids
                .iter()
                .filter_map(|id| self.sequences.get(id))
                .all(|sequence| sequence.complete);
            if derived != section.complete {
                mismatches.push(CompletionMismatch::Section {
                    id: section.id.clone(),
                    flagged: section.complete,
                });
            }
        }
        mismatches
    }
}
