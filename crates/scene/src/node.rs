use crate::components::{Drawable3D, Transform};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// A scene graph node. `P` is the typed payload interactable nodes carry.
#[derive(Debug, Clone)]
pub struct Node<P> {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub drawable: Option<Drawable3D>,
    pub payload: Option<P>,
}

impl<P> Node<P> {
    pub fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            transform: Transform::identity(),
            drawable: None,
            payload: None,
        }
    }
}
