pub mod camera;
pub mod components;
pub mod node;
pub mod picking;
pub mod prefabs;
pub mod selection;
pub mod world;

pub use node::*;
pub use world::*;
