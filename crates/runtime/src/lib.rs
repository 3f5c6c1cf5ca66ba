pub mod event_bus;
pub mod frame;
pub mod lifecycle;

pub use event_bus::*;
pub use frame::*;
pub use lifecycle::*;
