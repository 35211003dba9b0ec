mod controller;
mod event;
pub mod gating;
mod state;

pub use controller::{NavigationController, Resolution, resolve_entry};
pub use event::{NavigationEvent, NavigationEventName};
pub use gating::{BlockReason, ExamSession, ExamStatus};
pub use state::{
    Correction, Destination, FailureReason, LoadOutcome, LoadTicket, NavRequest, NavState,
    NoOpReason, Outcome,
};
