use foundation::arena::Arena;
use foundation::math::{Mat4, Vec3};

use crate::components::{Drawable3D, Lighting, PointCloudId, Transform};
use crate::node::{Node, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    UnknownNode(NodeId),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::UnknownNode(id) => write!(f, "unknown scene node {}", id.index()),
        }
    }
}

impl std::error::Error for SceneError {}

/// Scene graph: an arena of nodes forming a forest.
///
/// World matrices are not cached; they are composed parent-first on demand,
/// so a change to any ancestor's transform is visible immediately.
#[derive(Debug, Clone)]
pub struct World<P> {
    nodes: Arena<Node<P>>,
    point_clouds: Vec<Vec<Vec3>>,
    pub lighting: Lighting,
}

impl<P> Default for World<P> {
    fn default() -> Self {
        Self {
            nodes: Arena::new(),
            point_clouds: Vec::new(),
            lighting: Lighting::default(),
        }
    }
}

impl<P> World<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Spawns a root node.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        NodeId(self.nodes.alloc(Node::new(name, None)) as u32)
    }

    /// Spawns a node as the last child of `parent`.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
    ) -> Result<NodeId, SceneError> {
        if self.node(parent).is_none() {
            return Err(SceneError::UnknownNode(parent));
        }
        let id = NodeId(self.nodes.alloc(Node::new(name, Some(parent))) as u32);
        if let Some(p) = self.nodes.get_mut(parent.index() as usize) {
            p.children.push(id);
        }
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id.index() as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<P>, SceneError> {
        self.nodes
            .get_mut(id.index() as usize)
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<P>)> + '_ {
        self.nodes.iter().map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(id)?.transform = transform;
        Ok(())
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes
            .get_mut(id.index() as usize)
            .map(|n| &mut n.transform)
    }

    pub fn set_drawable(&mut self, id: NodeId, drawable: Drawable3D) -> Result<(), SceneError> {
        self.node_mut(id)?.drawable = Some(drawable);
        Ok(())
    }

    pub fn set_payload(&mut self, id: NodeId, payload: P) -> Result<(), SceneError> {
        self.node_mut(id)?.payload = Some(payload);
        Ok(())
    }

    pub fn payload(&self, id: NodeId) -> Option<&P> {
        self.node(id).and_then(|n| n.payload.as_ref())
    }

    pub fn add_point_cloud(&mut self, points: Vec<Vec3>) -> PointCloudId {
        let id = PointCloudId(self.point_clouds.len() as u32);
        self.point_clouds.push(points);
        id
    }

    pub fn point_cloud(&self, id: PointCloudId) -> Option<&[Vec3]> {
        self.point_clouds.get(id.0 as usize).map(Vec::as_slice)
    }

    /// Composes local transforms from the root down to `id`.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.node(id)?;
        let mut m = node.transform.local_matrix();
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            m = node.transform.local_matrix() * m;
        }
        Some(m)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.translation())
    }

    /// Finds the node carrying a payload for a hit on `id`, looking no
    /// more than `max_depth` levels up.
    ///
    /// Among `id` and its ancestors within range, the outermost one
    /// carrying a payload wins: interactable groups wrap their visual
    /// meshes, and a payload on the wrapper takes precedence.
    pub fn payload_owner(&self, id: NodeId, max_depth: usize) -> Option<(NodeId, &P)> {
        let mut chain = Vec::with_capacity(max_depth + 1);
        let mut current = Some(id);
        while let Some(node_id) = current {
            if chain.len() > max_depth {
                break;
            }
            chain.push(node_id);
            current = self.parent(node_id);
        }

        chain
            .into_iter()
            .rev()
            .find_map(|node_id| self.payload(node_id).map(|p| (node_id, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::{SceneError, World};
    use pretty_assertions::assert_eq;
    use crate::components::Transform;
    use crate::node::NodeId;
    use foundation::math::Vec3;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        let d = (a - b).length();
        assert!(d < 1e-9, "expected {a:?} ~= {b:?} (diff {d})");
    }

    #[test]
    fn children_follow_parent_rotation() {
        let mut world: World<()> = World::new();
        let globe = world.spawn("globe");
        let child = world.spawn_child(globe, "marker").expect("child");
        world
            .set_transform(child, Transform::translate(Vec3::new(1.0, 0.0, 0.0)))
            .expect("set");

        assert_vec_close(world.world_position(child).expect("pos"), Vec3::new(1.0, 0.0, 0.0));

        world.transform_mut(globe).expect("globe").rotation.y = FRAC_PI_2;
        assert_vec_close(world.world_position(child).expect("pos"), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn spawn_child_rejects_unknown_parent() {
        let mut world: World<()> = World::new();
        assert_eq!(
            world.spawn_child(NodeId(3), "orphan"),
            Err(SceneError::UnknownNode(NodeId(3)))
        );
        assert!(world.is_empty());
    }

    #[test]
    fn payload_owner_prefers_the_wrapper() {
        let mut world: World<&'static str> = World::new();
        let group = world.spawn("group");
        let mesh = world.spawn_child(group, "mesh").expect("mesh");
        world.set_payload(group, "group").expect("payload");

        assert_eq!(world.payload_owner(mesh, 1), Some((group, &"group")));

        world.set_payload(mesh, "mesh").expect("payload");
        assert_eq!(world.payload_owner(mesh, 1), Some((group, &"group")));
        assert_eq!(world.payload_owner(mesh, 0), Some((mesh, &"mesh")));
    }

    #[test]
    fn payload_owner_is_depth_bounded() {
        let mut world: World<u8> = World::new();
        let outer = world.spawn("outer");
        let middle = world.spawn_child(outer, "middle").expect("middle");
        let leaf = world.spawn_child(middle, "leaf").expect("leaf");
        world.set_payload(outer, 1).expect("payload");

        assert_eq!(world.payload_owner(leaf, 1), None);
        assert_eq!(world.payload_owner(leaf, 2), Some((outer, &1)));
    }
}
