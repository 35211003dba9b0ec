mod analytics;
mod outline;
mod route;
mod session;
mod viewer;

// Public API of the courseware subsystem.
pub use analytics::{AnalyticsSink, RecordingAnalytics, TracingAnalytics};
pub use outline::{OutlineView, ResumeAction, ResumeCard, SectionRow, SequenceRow, build_outline};
pub use route::{RecordingRouter, Route, RouteMode, Router};
pub use session::CoursewareSession;
pub use viewer::{ViewerState, viewer_state};
