use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Represents a node somewhere in a tree.
    pub struct NodeId;
}

/// Arena holding the structure of a binary tree.
///
/// A node has either no children (a leaf) or exactly two. The parent link is a
/// back-reference only; nodes are freed through their parent, never through
/// it.
#[derive(Default, Clone, Debug)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

#[derive(Default, Clone, Debug, PartialEq)]
struct Node {
    parent: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
}

impl NodeMap {
    pub fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }

    /// Creates a detached leaf.
    pub fn mk_node(&mut self) -> NodeId { self.map.insert(Node::default()) }

    /// Turns the leaf `parent` into an internal node owning `first` and `second`.
    #[track_caller]
    pub fn attach_children(&mut self, parent: NodeId, first: NodeId, second: NodeId) {
        assert!(
            self.map[parent].children.is_none(),
            "attach_children: {parent:?} is not a leaf"
        );
        for child in [first, second] {
            assert!(
                child != parent && self.map[child].parent.is_none(),
                "attach_children: {child:?} is already attached"
            );
            self.map[child].parent = Some(parent);
        }
        self.map[parent].children = Some((first, second));
    }

    /// Removes `leaf` and moves its sibling's children into their common
    /// parent, which takes the sibling's position in the tree.
    ///
    /// Returns `(parent, sibling)`. The sibling id is dead afterwards; callers
    /// that keep per-node data must move it off the sibling first.
    #[track_caller]
    pub fn promote_sibling(&mut self, leaf: NodeId) -> (NodeId, NodeId) {
        assert!(leaf.is_leaf(self), "promote_sibling: {leaf:?} is not a leaf");
        let parent = leaf.parent(self).unwrap_or_else(|| {
            panic!("promote_sibling: {leaf:?} has no sibling (it is a root)")
        });
        let sibling = leaf.sibling(self).expect("internal node with a single child");

        let grandchildren = self.map[sibling].children.take();
        if let Some((first, second)) = grandchildren {
            self.map[first].parent = Some(parent);
            self.map[second].parent = Some(parent);
        }
        self.map[parent].children = grandchildren;

        self.map.remove(leaf);
        self.map.remove(sibling);
        (parent, sibling)
    }
}

impl NodeId {
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    pub fn children(self, map: &NodeMap) -> Option<(NodeId, NodeId)> {
        map.map.get(self).and_then(|n| n.children)
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        self.children(map).map(|(first, _)| first)
    }

    pub fn is_leaf(self, map: &NodeMap) -> bool { self.children(map).is_none() }

    /// Whether this node is its parent's first (left/upper) child.
    pub fn is_first_child(self, map: &NodeMap) -> bool {
        self.parent(map).and_then(|p| p.first_child(map)) == Some(self)
    }

    pub fn sibling(self, map: &NodeMap) -> Option<NodeId> {
        let (first, second) = self.parent(map)?.children(map)?;
        if first == self { Some(second) } else { Some(first) }
    }

    /// Parents are yielded before their children, first child before second.
    ///
    /// Uses an explicit stack so deep trees do not exhaust the call stack.
    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal { map, stack: vec![self] }
    }

    pub fn leaves(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        self.traverse_preorder(map).filter(move |n| n.is_leaf(map))
    }
}

struct PreorderTraversal<'a> {
    map: &'a NodeMap,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some((first, second)) = node.children(self.map) {
            self.stack.push(second);
            self.stack.push(first);
        }
        Some(node)
    }
}
