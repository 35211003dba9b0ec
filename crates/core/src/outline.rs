//! Open/closed state of the outline's section accordions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{CourseTree, Section, SectionId, SequenceId};

/// The global "expand all / collapse all" toggle.
///
/// `generation` counts toggle transitions; zero means it was never used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandAll {
    pub value: bool,
    pub generation: u64,
}

/// A section's own open flag, stamped with the expand-all generation that
/// was current when it was last set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualState {
    pub open: bool,
    pub generation: u64,
}

/// Decide whether `section` renders open.
///
/// A section holding the current sequence is always open. Otherwise the most
/// recent of the expand-all transition and the manual toggle wins.
#[must_use]
pub fn derive_open(
    section: &Section,
    current: Option<&SequenceId>,
    expand_all: ExpandAll,
    manual: ManualState,
) -> bool {
    if current.is_some_and(|sequence_id| section.contains(sequence_id)) {
        return true;
    }
    if expand_all.generation > manual.generation {
        return expand_all.value;
    }
    manual.open
}

/// Per-section expansion for one outline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineExpansionState {
    expand_all: ExpandAll,
    manual: HashMap<SectionId, ManualState>,
}

impl OutlineExpansionState {
    /// Seed every section from its `resume_block` flag.
    #[must_use]
    pub fn new(tree: &CourseTree) -> Self {
        let mut state = Self::default();
        state.reconcile(tree);
        state
    }

    /// Adopt a re-fetched tree.
    ///
    /// Sections seen before keep their manual state; only new sections are
    /// seeded, and sections that disappeared are dropped.
    pub fn reconcile(&mut self, tree: &CourseTree) {
        self.manual
            .retain(|section_id, _| tree.section(section_id).is_some());
        for section in tree.sections() {
            self.manual
                .entry(section.id.clone())
                .or_insert(ManualState {
                    open: section.resume_block,
                    generation: 0,
                });
        }
    }

    #[must_use]
    pub fn expand_all(&self) -> ExpandAll {
        self.expand_all
    }

    /// True when the toggle currently reads "collapse all".
    #[must_use]
    pub fn expand_all_active(&self) -> bool {
        self.expand_all.value
    }

    #[must_use]
    pub fn manual_state(&self, section_id: &SectionId) -> Option<ManualState> {
        self.manual.get(section_id).copied()
    }

    /// `None` when the section is not part of `tree`.
    #[must_use]
    pub fn is_open(
        &self,
        tree: &CourseTree,
        section_id: &SectionId,
        current: Option<&SequenceId>,
    ) -> Option<bool> {
        let section = tree.section(section_id)?;
        let manual = self.manual.get(section_id).copied().unwrap_or_default();
        Some(derive_open(section, current, self.expand_all, manual))
    }

    /// Flip one section and return its new effective state, or `None` for a
    /// section that is not part of `tree`.
    ///
    /// The section holding the current sequence stays open, but its manual
    /// flag still flips and applies once the learner moves elsewhere.
    pub fn toggle_section(
        &mut self,
        tree: &CourseTree,
        section_id: &SectionId,
        current: Option<&SequenceId>,
    ) -> Option<bool> {
        let section = tree.section(section_id)?;
        let manual = self.manual.get(section_id).copied().unwrap_or_default();
        let unforced = derive_open(section, None, self.expand_all, manual);
        let toggled = ManualState {
            open: !unforced,
            generation: self.expand_all.generation,
        };
        self.manual.insert(section_id.clone(), toggled);
        Some(derive_open(section, current, self.expand_all, toggled))
    }

    /// Flip the global toggle and return its new value.
    pub fn toggle_expand_all(&mut self) -> bool {
        self.expand_all = ExpandAll {
            value: !self.expand_all.value,
            generation: self.expand_all.generation + 1,
        };
        self.expand_all.value
    }
}
