//! The binary space partitioning tree of one space.
//!
//! Internal nodes split their container along an axis; leaves hold the
//! windows shown in their container. Containers are cached per node and kept
//! in sync with every structural change.

use slotmap::SecondaryMap;
use tracing::{debug, trace};

use super::LayoutError;
use super::container::{
    Container, TilingParams, child_container, compute_child_containers, normalize_ratio,
    root_container, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO,
};
use super::graph::{Child, ContainerSide, SplitAxis, SplitMode};
use super::serialized::SerializedNode;
use crate::common::collections::{HashMap, HashSet};
use crate::model::WindowId;
use crate::model::tree::{NodeId, NodeMap};
use crate::sys::geometry::Rect;

/// A window and the container it was last assigned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowEntry {
    pub window: WindowId,
    pub container: Container,
}

#[derive(Clone, Debug, PartialEq)]
enum NodeKind {
    Split {
        axis: SplitAxis,
        ratio: f64,
    },
    Leaf {
        windows: Vec<WindowEntry>,
        /// Axis used the next time this leaf splits with `SplitMode::Optimal`.
        preselect: Option<SplitAxis>,
    },
}

pub struct BspTree {
    map: NodeMap,
    root: NodeId,
    kind: SecondaryMap<NodeId, NodeKind>,
    containers: SecondaryMap<NodeId, Container>,
    window_to_node: HashMap<WindowId, NodeId>,
    params: TilingParams,
    frame: Rect,
}

static_assertions::assert_impl_all!(BspTree: Send);

impl BspTree {
    /// Creates a tree consisting of one empty root leaf covering `frame`.
    pub fn new(params: TilingParams, frame: Rect) -> BspTree {
        let mut map = NodeMap::new();
        let root = map.mk_node();
        let mut kind = SecondaryMap::new();
        kind.insert(root, NodeKind::Leaf { windows: Vec::new(), preselect: None });
        let mut tree = BspTree {
            map,
            root,
            kind,
            containers: SecondaryMap::new(),
            window_to_node: HashMap::default(),
            params,
            frame,
        };
        tree.assign_root(false);
        tree
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn params(&self) -> &TilingParams { &self.params }

    /// The usable screen rectangle the root container is derived from.
    pub fn frame(&self) -> Rect { self.frame }

    /// Number of windows in the tree.
    pub fn len(&self) -> usize { self.window_to_node.len() }

    pub fn is_empty(&self) -> bool { self.window_to_node.is_empty() }

    pub fn node_count(&self) -> usize { self.map.len() }

    pub fn contains_window(&self, window: WindowId) -> bool {
        self.window_to_node.contains_key(&window)
    }

    pub fn leaf_of(&self, window: WindowId) -> Option<NodeId> {
        self.window_to_node.get(&window).copied()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { node.parent(&self.map) }

    pub fn children(&self, node: NodeId) -> Option<(NodeId, NodeId)> { node.children(&self.map) }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        matches!(self.kind.get(node), Some(NodeKind::Leaf { .. }))
    }

    pub fn container(&self, node: NodeId) -> Option<Container> { self.containers.get(node).copied() }

    /// The container last assigned to `window`.
    pub fn container_of(&self, window: WindowId) -> Option<Container> {
        let leaf = self.leaf_of(window)?;
        self.windows_in(leaf).iter().find(|e| e.window == window).map(|e| e.container)
    }

    /// The split axis of an internal node, or the preselected axis of a leaf.
    pub fn split_axis(&self, node: NodeId) -> Option<SplitAxis> {
        match self.kind.get(node)? {
            NodeKind::Split { axis, .. } => Some(*axis),
            NodeKind::Leaf { preselect, .. } => *preselect,
        }
    }

    pub fn split_ratio(&self, node: NodeId) -> Option<f64> {
        match self.kind.get(node)? {
            NodeKind::Split { ratio, .. } => Some(*ratio),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn windows_in(&self, node: NodeId) -> &[WindowEntry] {
        match self.kind.get(node) {
            Some(NodeKind::Leaf { windows, .. }) => windows,
            _ => &[],
        }
    }

    pub fn leaves(&self) -> Vec<NodeId> { self.root.leaves(&self.map).collect() }

    /// All windows, leaf by leaf in preorder.
    pub fn windows(&self) -> Vec<WindowId> {
        self.leaves()
            .into_iter()
            .flat_map(|leaf| self.windows_in(leaf).iter().map(|e| e.window))
            .collect()
    }

    /// The frame each window should be moved to.
    pub fn frames(&self) -> Vec<(WindowId, Rect)> {
        self.leaves()
            .into_iter()
            .flat_map(|leaf| self.windows_in(leaf).iter().map(|e| (e.window, e.container.rect)))
            .collect()
    }

    /// Which side of its parent `node` sits on, from the parent's axis and
    /// the node's position. The root has no side.
    pub fn infer_side(&self, node: NodeId) -> ContainerSide {
        let Some(parent) = node.parent(&self.map) else {
            return ContainerSide::None;
        };
        let child = if node.is_first_child(&self.map) { Child::First } else { Child::Second };
        match self.kind.get(parent) {
            Some(NodeKind::Split { axis, .. }) => ContainerSide::of_child(*axis, child),
            _ => ContainerSide::None,
        }
    }

    fn descend_to_leaf(&self, mut node: NodeId) -> NodeId {
        while let Some(first) = node.first_child(&self.map) {
            node = first;
        }
        node
    }

    fn first_empty_leaf(&self) -> Option<NodeId> {
        self.root.leaves(&self.map).find(|&leaf| self.windows_in(leaf).is_empty())
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
        self.recompute();
    }

    pub fn set_params(&mut self, params: TilingParams) {
        self.params = params;
        self.recompute();
    }

    /// Recomputes every container from the root down.
    pub fn recompute(&mut self) {
        self.assign_root(false);
        self.recompute_below(self.root, false);
    }

    /// Re-picks every split axis from the shape of its container, top down.
    pub fn reevaluate_splits(&mut self) {
        self.assign_root(true);
        self.recompute_below(self.root, true);
    }

    fn assign_root(&mut self, reevaluate: bool) {
        let container = root_container(self.frame, &self.params.padding);
        self.containers.insert(self.root, container);
        if let Some(NodeKind::Leaf { preselect, .. }) = self.kind.get_mut(self.root)
            && (preselect.is_none() || reevaluate)
        {
            *preselect = Some(SplitAxis::optimal_for(container.rect, self.params.optimal_ratio));
        }
    }

    /// Recomputes the containers strictly below `top` from its current
    /// container and mirrors them into the window entries.
    fn recompute_below(&mut self, top: NodeId, reevaluate: bool) {
        let order: Vec<NodeId> = top.traverse_preorder(&self.map).collect();
        for node in order {
            let container = self.containers[node];
            match &mut self.kind[node] {
                NodeKind::Split { axis, ratio } => {
                    if reevaluate {
                        *axis = SplitAxis::optimal_for(container.rect, self.params.optimal_ratio);
                    }
                    let (first, second) = node
                        .children(&self.map)
                        .unwrap_or_else(|| panic!("split node {node:?} has no children"));
                    let (a, b) =
                        compute_child_containers(container.rect, *ratio, *axis, &self.params.gaps);
                    self.containers.insert(first, a);
                    self.containers.insert(second, b);
                }
                NodeKind::Leaf { windows, .. } => {
                    for entry in windows {
                        entry.container = container;
                    }
                }
            }
        }
    }

    fn make_leaf(&mut self, windows: Vec<WindowEntry>) -> NodeId {
        let node = self.map.mk_node();
        for entry in &windows {
            self.window_to_node.insert(entry.window, node);
        }
        self.kind.insert(node, NodeKind::Leaf { windows, preselect: None });
        node
    }

    /// Turns `leaf` into a split node with two leaf children.
    ///
    /// The leaf's windows move into the child selected by `inherit`; the other
    /// child starts empty. A `ratio` of `0.0` uses the configured default.
    /// Returns `(inherited, fresh)`.
    ///
    /// Panics if `leaf` is not a leaf of this tree.
    pub fn split_leaf(
        &mut self,
        leaf: NodeId,
        mode: SplitMode,
        ratio: f64,
        inherit: Child,
    ) -> (NodeId, NodeId) {
        let Some(NodeKind::Leaf { windows, preselect }) = self.kind.get_mut(leaf) else {
            panic!("split_leaf: {leaf:?} is not a leaf");
        };
        let windows = std::mem::take(windows);
        let preselect = *preselect;
        let rect = self.containers[leaf].rect;
        let axis = mode.resolve(preselect, rect, self.params.optimal_ratio);
        let ratio = normalize_ratio(ratio, self.params.split_ratio);

        let inherited = self.make_leaf(windows);
        let fresh = self.make_leaf(Vec::new());
        let (first, second) = match inherit {
            Child::First => (inherited, fresh),
            Child::Second => (fresh, inherited),
        };
        self.map.attach_children(leaf, first, second);
        self.kind.insert(leaf, NodeKind::Split { axis, ratio });
        trace!(?leaf, ?axis, ratio, "split leaf");
        self.recompute_below(leaf, false);
        (inherited, fresh)
    }

    /// Removes a non-root leaf, promoting its sibling into the parent's
    /// position. Returns the node that now holds the sibling's content.
    ///
    /// Panics if `leaf` is not a leaf or is the root.
    pub fn remove_leaf(&mut self, leaf: NodeId) -> NodeId {
        assert!(self.is_leaf(leaf), "remove_leaf: {leaf:?} is not a leaf");
        let sibling = leaf
            .sibling(&self.map)
            .unwrap_or_else(|| panic!("remove_leaf: {leaf:?} has no sibling"));

        if let Some(NodeKind::Leaf { windows, .. }) = self.kind.remove(leaf) {
            for entry in windows {
                self.window_to_node.remove(&entry.window);
            }
        }
        let mut promoted = self.kind.remove(sibling).expect("sibling has a kind");
        let (parent, _) = self.map.promote_sibling(leaf);
        // A leaf promoted into the root remembers the root's axis.
        if parent == self.root
            && let NodeKind::Leaf { preselect, .. } = &mut promoted
            && preselect.is_none()
        {
            *preselect = self.split_axis(parent);
        }
        self.containers.remove(leaf);
        self.containers.remove(sibling);

        if let NodeKind::Leaf { windows, .. } = &promoted {
            for entry in windows {
                self.window_to_node.insert(entry.window, parent);
            }
        }
        self.kind.insert(parent, promoted);
        if parent == self.root {
            self.assign_root(false);
        }
        self.recompute_below(parent, false);
        parent
    }

    fn push_window(&mut self, leaf: NodeId, window: WindowId) {
        let container = self.containers[leaf];
        let Some(NodeKind::Leaf { windows, .. }) = self.kind.get_mut(leaf) else {
            panic!("push_window: {leaf:?} is not a leaf");
        };
        windows.push(WindowEntry { window, container });
        self.window_to_node.insert(window, leaf);
    }

    /// Tiles `window` next to `target`.
    ///
    /// With no target the first empty leaf is filled, or else the leaf reached
    /// by following first children from the root is split. An empty target
    /// leaf is filled without splitting. `side` selects the child the new
    /// window lands in. Returns the leaf now holding `window`.
    pub fn insert_window(
        &mut self,
        window: WindowId,
        target: Option<NodeId>,
        mode: SplitMode,
        side: Child,
    ) -> Result<NodeId, LayoutError> {
        if self.contains_window(window) {
            return Err(LayoutError::WindowAlreadyTiled(window));
        }
        let leaf = match target {
            Some(node) => self.descend_to_leaf(node),
            None => self
                .first_empty_leaf()
                .unwrap_or_else(|| self.descend_to_leaf(self.root)),
        };
        let dest = if self.windows_in(leaf).is_empty() {
            leaf
        } else {
            self.split_leaf(leaf, mode, 0.0, side.other()).1
        };
        self.push_window(dest, window);
        debug!(%window, ?dest, "inserted window");
        Ok(dest)
    }

    /// Adds `window` to the leaf containing `target` without splitting, so it
    /// shares that container. Used by monocle spaces.
    pub fn stack_window(
        &mut self,
        window: WindowId,
        target: Option<NodeId>,
    ) -> Result<NodeId, LayoutError> {
        if self.contains_window(window) {
            return Err(LayoutError::WindowAlreadyTiled(window));
        }
        let leaf = self.descend_to_leaf(target.unwrap_or(self.root));
        self.push_window(leaf, window);
        debug!(%window, ?leaf, "stacked window");
        Ok(leaf)
    }

    /// Removes `window`; a non-root leaf left empty is removed as well.
    pub fn remove_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        let leaf = self
            .window_to_node
            .remove(&window)
            .ok_or(LayoutError::WindowNotFound(window))?;
        let Some(NodeKind::Leaf { windows, .. }) = self.kind.get_mut(leaf) else {
            panic!("window {window} maps to non-leaf {leaf:?}");
        };
        windows.retain(|e| e.window != window);
        if windows.is_empty() && leaf != self.root {
            self.remove_leaf(leaf);
        }
        debug!(%window, "removed window");
        Ok(())
    }

    /// Sets the ratio of a split node and recomputes its subtree. Returns
    /// false if `node` is not a split.
    pub fn set_ratio(&mut self, node: NodeId, ratio: f64) -> bool {
        let default = self.params.split_ratio;
        let Some(NodeKind::Split { ratio: current, .. }) = self.kind.get_mut(node) else {
            return false;
        };
        *current = normalize_ratio(ratio, default);
        self.recompute_below(node, false);
        true
    }

    /// Grows the container of `window` by `amount` of its parent split.
    /// Returns false when the window fills the whole tree.
    pub fn resize_window_by(&mut self, window: WindowId, amount: f64) -> Result<bool, LayoutError> {
        let leaf = self.leaf_of(window).ok_or(LayoutError::WindowNotFound(window))?;
        let Some(parent) = leaf.parent(&self.map) else {
            return Ok(false);
        };
        let is_first = leaf.is_first_child(&self.map);
        let Some(NodeKind::Split { ratio, .. }) = self.kind.get_mut(parent) else {
            return Ok(false);
        };
        let new_ratio = if is_first { *ratio + amount } else { *ratio - amount };
        *ratio = new_ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO);
        self.recompute_below(parent, false);
        Ok(true)
    }

    /// Flips the axis of the split containing `window`. For a window in the
    /// root leaf, flips the axis its next split will use.
    pub fn toggle_split(&mut self, window: WindowId) -> Result<(), LayoutError> {
        let leaf = self.leaf_of(window).ok_or(LayoutError::WindowNotFound(window))?;
        let node = leaf.parent(&self.map).unwrap_or(leaf);
        match &mut self.kind[node] {
            NodeKind::Split { axis, .. } => *axis = axis.flip(),
            NodeKind::Leaf { preselect, .. } => {
                *preselect = Some(preselect.unwrap_or(SplitAxis::Vertical).flip())
            }
        }
        self.recompute_below(node, false);
        Ok(())
    }

    /// Position of `focused` in its leaf as `[index/total]`, or `[total]` when
    /// nothing in the tree is focused.
    pub fn monocle_tag(&self, focused: Option<WindowId>) -> String {
        let leaf = focused
            .and_then(|w| self.leaf_of(w))
            .unwrap_or_else(|| self.descend_to_leaf(self.root));
        let windows = self.windows_in(leaf);
        let total = windows.len();
        match focused.and_then(|w| windows.iter().position(|e| e.window == w)) {
            Some(index) => format!("[{}/{}]", index + 1, total),
            None => format!("[{total}]"),
        }
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.ascii_tree(self.root);
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let container = self.containers.get(node).copied().unwrap_or_default();
        match &self.kind[node] {
            NodeKind::Split { axis, ratio } => {
                let desc = format!("{axis:?} {ratio:.2} {:?} {}", container.side, container.rect);
                let children = node
                    .children(&self.map)
                    .map(|(first, second)| vec![self.ascii_tree(first), self.ascii_tree(second)])
                    .unwrap_or_default();
                ascii_tree::Tree::Node(desc, children)
            }
            NodeKind::Leaf { windows, .. } => {
                let ids: Vec<String> = windows.iter().map(|e| e.window.to_string()).collect();
                ascii_tree::Tree::Leaf(vec![format!(
                    "{:?} {} [{}]",
                    container.side,
                    container.rect,
                    ids.join(", ")
                )])
            }
        }
    }

    pub fn to_shape(&self) -> SerializedNode { self.shape_below(self.root) }

    fn shape_below(&self, node: NodeId) -> SerializedNode {
        match &self.kind[node] {
            NodeKind::Split { axis, ratio } => {
                let (first, second) = node
                    .children(&self.map)
                    .unwrap_or_else(|| panic!("split node {node:?} has no children"));
                SerializedNode::split(
                    *axis,
                    *ratio,
                    self.shape_below(first),
                    self.shape_below(second),
                )
            }
            NodeKind::Leaf { windows, .. } => SerializedNode::Leaf {
                windows: windows.iter().map(|e| e.window).collect(),
            },
        }
    }

    /// Builds a tree from a persisted shape.
    ///
    /// Containers are rebuilt top down from `frame`, the side of each node
    /// inferred from its parent's axis. Splits without an axis get the optimal
    /// axis of their container. A window listed twice is an error.
    pub fn from_shape(
        shape: &SerializedNode,
        params: TilingParams,
        frame: Rect,
    ) -> Result<BspTree, LayoutError> {
        let mut tree = BspTree::new(params, frame);
        let mut unresolved = HashSet::default();
        let mut pending = vec![(tree.root, shape)];
        while let Some((node, shape)) = pending.pop() {
            match shape {
                SerializedNode::Leaf { windows } => {
                    let mut entries = Vec::with_capacity(windows.len());
                    for &window in windows {
                        if tree.window_to_node.insert(window, node).is_some() {
                            return Err(LayoutError::InvalidLayout(format!(
                                "window {window} appears more than once"
                            )));
                        }
                        entries.push(WindowEntry { window, container: Container::default() });
                    }
                    tree.kind.insert(node, NodeKind::Leaf { windows: entries, preselect: None });
                }
                SerializedNode::Split { axis, ratio, first, second } => {
                    if axis.is_none() {
                        unresolved.insert(node);
                    }
                    let a = tree.map.mk_node();
                    let b = tree.map.mk_node();
                    tree.map.attach_children(node, a, b);
                    tree.kind.insert(node, NodeKind::Split {
                        axis: axis.unwrap_or(SplitAxis::Vertical),
                        ratio: normalize_ratio(*ratio, params.split_ratio),
                    });
                    pending.push((b, second));
                    pending.push((a, first));
                }
            }
        }
        tree.rebuild_containers(&unresolved);
        Ok(tree)
    }

    fn rebuild_containers(&mut self, unresolved: &HashSet<NodeId>) {
        self.assign_root(false);
        let order: Vec<NodeId> = self.root.traverse_preorder(&self.map).collect();
        for node in order {
            if let Some(parent) = node.parent(&self.map) {
                let side = self.infer_side(node);
                let child = if side.is_first() { Child::First } else { Child::Second };
                let (axis, ratio) = match &self.kind[parent] {
                    NodeKind::Split { axis, ratio } => (*axis, *ratio),
                    NodeKind::Leaf { .. } => panic!("parent {parent:?} is a leaf"),
                };
                let container =
                    child_container(self.containers[parent].rect, ratio, axis, &self.params.gaps, child);
                self.containers.insert(node, container);
            }
            let container = self.containers[node];
            match &mut self.kind[node] {
                NodeKind::Split { axis, .. } => {
                    if unresolved.contains(&node) {
                        *axis = SplitAxis::optimal_for(container.rect, self.params.optimal_ratio);
                    }
                }
                NodeKind::Leaf { windows, .. } => {
                    for entry in windows {
                        entry.container = container;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
impl BspTree {
    #[track_caller]
    pub(crate) fn verify_invariants(&self) {
        assert!(self.root.parent(&self.map).is_none(), "root has a parent");
        assert_eq!(self.containers[self.root], root_container(self.frame, &self.params.padding));

        let nodes: Vec<NodeId> = self.root.traverse_preorder(&self.map).collect();
        assert_eq!(nodes.len(), self.map.len(), "unreachable nodes in map");

        let mut seen = HashSet::default();
        for &node in &nodes {
            let container = self.containers[node];
            assert_eq!(container.side, self.infer_side(node));
            match &self.kind[node] {
                NodeKind::Split { axis, ratio } => {
                    assert!((MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(ratio));
                    let (first, second) = node.children(&self.map).expect("split without children");
                    let (a, b) =
                        compute_child_containers(container.rect, *ratio, *axis, &self.params.gaps);
                    assert_eq!(self.containers[first], a);
                    assert_eq!(self.containers[second], b);
                }
                NodeKind::Leaf { windows, .. } => {
                    assert!(node.is_leaf(&self.map));
                    for entry in windows {
                        assert!(seen.insert(entry.window), "{} tiled twice", entry.window);
                        assert_eq!(self.window_to_node.get(&entry.window), Some(&node));
                        assert_eq!(entry.container, container);
                    }
                }
            }
        }
        assert_eq!(seen.len(), self.window_to_node.len());
    }
}
