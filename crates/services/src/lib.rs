#![forbid(unsafe_code)]

pub mod courseware;
pub mod error;

pub use error::OutlineError;

pub use courseware::{
    AnalyticsSink, CoursewareSession, OutlineView, RecordingAnalytics, RecordingRouter, Route,
    RouteMode, Router, TracingAnalytics, ViewerState,
};
