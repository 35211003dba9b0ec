#![forbid(unsafe_code)]

pub mod model;
pub mod navigation;
pub mod outline;
pub mod resolver;

pub use navigation::NavigationController;
pub use outline::OutlineExpansionState;
pub use resolver::PositionResolver;
