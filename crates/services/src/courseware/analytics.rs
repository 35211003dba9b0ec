use std::sync::{Arc, Mutex};

use courseware_core::model::CourseId;
use courseware_core::navigation::NavigationEvent;
use tracing::info;

/// Receives a record of every successful navigation.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, course_id: &CourseId, event: &NavigationEvent);
}

/// Emits events as structured `tracing` records under the `analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn track(&self, course_id: &CourseId, event: &NavigationEvent) {
        info!(
            target: "analytics",
            event = event.name.as_str(),
            %course_id,
            unit_id = event.unit_id.as_ref().map(|id| id.as_str()),
            current_tab = event.current_index,
            tab_count = event.total_count,
            target_tab = event.target_index,
            "navigation"
        );
    }
}

#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<NavigationEvent>>>,
}

impl RecordingAnalytics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, _course_id: &CourseId, event: &NavigationEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
