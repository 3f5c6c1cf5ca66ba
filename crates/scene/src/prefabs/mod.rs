pub mod globe;
pub mod starfield;

pub use globe::*;
pub use starfield::*;
