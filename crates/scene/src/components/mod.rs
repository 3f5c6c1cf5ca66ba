pub mod drawable3d;
pub mod light;
pub mod material;
pub mod transform;

pub use drawable3d::*;
pub use light::*;
pub use material::*;
pub use transform::*;
