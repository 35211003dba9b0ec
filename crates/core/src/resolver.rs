//! Read-only position arithmetic over a [`CourseTree`].

use thiserror::Error;

use crate::model::{CourseTree, SectionId, SequenceId, UnitId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("sequence {0} is not part of the course")]
    UnknownSequence(SequenceId),

    #[error("unit {unit} is not part of sequence {sequence}")]
    UnitNotInSequence { unit: UnitId, sequence: SequenceId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextUnit {
    Unit(UnitId),
    /// The unit is last in its sequence; a cross-sequence move is needed.
    SequenceBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousUnit {
    Unit(UnitId),
    /// The unit is first in its sequence.
    SequenceStartBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextSequence {
    Sequence(SequenceId),
    /// Past the last sequence of the course.
    CourseEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousSequence {
    Sequence(SequenceId),
    /// Before the first sequence of the course.
    CourseStart,
}

/// Pure lookups answering "where am I" and "where is next/previous".
#[derive(Debug, Clone, Copy)]
pub struct PositionResolver<'a> {
    tree: &'a CourseTree,
}

impl<'a> PositionResolver<'a> {
    #[must_use]
    pub fn new(tree: &'a CourseTree) -> Self {
        Self { tree }
    }

    #[must_use]
    pub fn tree(&self) -> &'a CourseTree {
        self.tree
    }

    /// Zero-based index of the unit within its sequence, `None` if unknown.
    #[must_use]
    pub fn index_in_sequence(&self, unit_id: &UnitId) -> Option<usize> {
        self.tree.unit_index(unit_id)
    }

    /// Containing section and sequence of a unit.
    #[must_use]
    pub fn containing(&self, unit_id: &UnitId) -> Option<(&'a SectionId, &'a SequenceId)> {
        let sequence_id = self.tree.sequence_of(unit_id)?;
        let section_id = self.tree.section_of(sequence_id)?;
        Some((section_id, sequence_id))
    }

    /// # Errors
    ///
    /// Returns `ResolveError` if the sequence is unknown or does not list the unit.
    pub fn next_unit(
        &self,
        sequence_id: &SequenceId,
        unit_id: &UnitId,
    ) -> Result<NextUnit, ResolveError> {
        let (units, index) = self.locate(sequence_id, unit_id)?;
        Ok(units
            .get(index + 1)
            .map_or(NextUnit::SequenceBoundary, |next| NextUnit::Unit(next.clone())))
    }

    /// # Errors
    ///
    /// Returns `ResolveError` if the sequence is unknown or does not list the unit.
    pub fn previous_unit(
        &self,
        sequence_id: &SequenceId,
        unit_id: &UnitId,
    ) -> Result<PreviousUnit, ResolveError> {
        let (units, index) = self.locate(sequence_id, unit_id)?;
        Ok(index
            .checked_sub(1)
            .and_then(|previous| units.get(previous))
            .map_or(PreviousUnit::SequenceStartBoundary, |previous| {
                PreviousUnit::Unit(previous.clone())
            }))
    }

    /// Next sequence in course order, crossing section boundaries.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnknownSequence` if the sequence is not in the tree.
    pub fn next_sequence(&self, sequence_id: &SequenceId) -> Result<NextSequence, ResolveError> {
        let index = self.sequence_index(sequence_id)?;
        Ok(self
            .tree
            .sequence_order()
            .get(index + 1)
            .map_or(NextSequence::CourseEnd, |next| NextSequence::Sequence(next.clone())))
    }

    /// Previous sequence in course order, crossing section boundaries.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnknownSequence` if the sequence is not in the tree.
    pub fn previous_sequence(
        &self,
        sequence_id: &SequenceId,
    ) -> Result<PreviousSequence, ResolveError> {
        let index = self.sequence_index(sequence_id)?;
        Ok(index
            .checked_sub(1)
            .and_then(|previous| self.tree.sequence_order().get(previous))
            .map_or(PreviousSequence::CourseStart, |previous| {
                PreviousSequence::Sequence(previous.clone())
            }))
    }

    #[must_use]
    pub fn first_unit(&self, sequence_id: &SequenceId) -> Option<UnitId> {
        self.tree
            .sibling_units(sequence_id)
            .and_then(<[UnitId]>::first)
            .cloned()
    }

    #[must_use]
    pub fn last_unit(&self, sequence_id: &SequenceId) -> Option<UnitId> {
        self.tree
            .sibling_units(sequence_id)
            .and_then(<[UnitId]>::last)
            .cloned()
    }

    /// Unit to show when a sequence is entered without an explicit unit.
    ///
    /// Prefers the learner's last viewed unit inside the sequence.
    #[must_use]
    pub fn default_unit(&self, sequence_id: &SequenceId) -> Option<UnitId> {
        let sequence = self.tree.sequence(sequence_id)?;
        sequence
            .active_unit_index
            .and_then(|index| sequence.unit_ids.get(index))
            .or_else(|| sequence.unit_ids.first())
            .cloned()
    }

    fn sequence_index(&self, sequence_id: &SequenceId) -> Result<usize, ResolveError> {
        self.tree
            .sequence_index(sequence_id)
            .ok_or_else(|| ResolveError::UnknownSequence(sequence_id.clone()))
    }

    fn locate(
        &self,
        sequence_id: &SequenceId,
        unit_id: &UnitId,
    ) -> Result<(&'a [UnitId], usize), ResolveError> {
        let units = self
            .tree
            .sibling_units(sequence_id)
            .ok_or_else(|| ResolveError::UnknownSequence(sequence_id.clone()))?;
        if self.tree.sequence_of(unit_id) != Some(sequence_id) {
            return Err(ResolveError::UnitNotInSequence {
                unit: unit_id.clone(),
                sequence: sequence_id.clone(),
            });
        }
        let index = self
            .tree
            .unit_index(unit_id)
            .ok_or_else(|| ResolveError::UnitNotInSequence {
                unit: unit_id.clone(),
                sequence: sequence_id.clone(),
            })?;
        Ok((units, index))
    }
}
