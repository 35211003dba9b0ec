use serde::Serialize;

use crate::model::UnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NavigationEventName {
    NextSelected,
    PreviousSelected,
    TabSelected,
    OutlineSelected,
}

impl NavigationEventName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NavigationEventName::NextSelected => "edx.ui.lms.sequence.next_selected",
            NavigationEventName::PreviousSelected => "edx.ui.lms.sequence.previous_selected",
            NavigationEventName::TabSelected => "edx.ui.lms.sequence.tab_selected",
            NavigationEventName::OutlineSelected => "edx.ui.lms.outline.selected",
        }
    }
}

/// Structured record of a successful move.
///
/// Indices are 1-based to match the tab numbering learners see. For outline
/// selections they count sequences across the whole course instead of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationEvent {
    pub name: NavigationEventName,
    pub unit_id: Option<UnitId>,
    pub current_index: usize,
    pub total_count: usize,
    pub target_index: Option<usize>,
}
