use crate::node::NodeId;

/// Single-target selection.
///
/// Selecting a node replaces the previous target; there is never more than
/// one.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    target: Option<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous target, if it differs from `node`.
    pub fn select(&mut self, node: NodeId) -> Option<NodeId> {
        self.target.replace(node).filter(|prev| *prev != node)
    }

    pub fn clear(&mut self) -> Option<NodeId> {
        self.target.take()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Selection;
    use pretty_assertions::assert_eq;
    use crate::node::NodeId;

    #[test]
    fn select_replaces_previous_target() {
        let mut s = Selection::new();
        assert!(!s.is_active());
        assert_eq!(s.select(NodeId(1)), None);
        assert_eq!(s.select(NodeId(1)), None);
        assert_eq!(s.select(NodeId(4)), Some(NodeId(1)));
        assert_eq!(s.target(), Some(NodeId(4)));
    }

    #[test]
    fn clear_is_idempotent() {
        let mut s = Selection::new();
        s.select(NodeId(2));
        assert_eq!(s.clear(), Some(NodeId(2)));
        assert_eq!(s.clear(), None);
        assert!(!s.is_active());
    }
}
