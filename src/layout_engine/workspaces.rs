use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::bsp::BspTree;
use super::container::TilingParams;
use super::graph::Child;
use crate::common::collections::{BTreeSet, HashMap, hash_map};
use crate::common::config::{SpaceMode, SpaceSettings};
use crate::model::WindowId;
use crate::sys::geometry::Rect;

/// A desktop on a screen. Each space owns at most one tiling tree.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct SpaceId {
    pub screen: u32,
    pub desktop: u32,
}

impl SpaceId {
    pub const fn new(screen: u32, desktop: u32) -> SpaceId { SpaceId { screen, desktop } }
}

pub(crate) struct SpaceLayout {
    pub(crate) settings: SpaceSettings,
    frame: Rect,
    /// `None` for floating spaces.
    tree: Option<BspTree>,
}

impl SpaceLayout {
    fn new(settings: SpaceSettings, frame: Rect) -> SpaceLayout {
        let tree = match settings.mode {
            SpaceMode::Float => None,
            SpaceMode::Bsp | SpaceMode::Monocle => {
                Some(BspTree::new(TilingParams::from(&settings), frame))
            }
        };
        SpaceLayout { settings, frame, tree }
    }

    pub(crate) fn mode(&self) -> SpaceMode { self.settings.mode }

    pub(crate) fn frame(&self) -> Rect { self.frame }

    pub(crate) fn tree(&self) -> Option<&BspTree> { self.tree.as_ref() }

    pub(crate) fn tree_mut(&mut self) -> Option<&mut BspTree> { self.tree.as_mut() }

    pub(crate) fn replace_tree(&mut self, tree: BspTree) { self.tree = Some(tree) }

    pub(crate) fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
        if let Some(tree) = &mut self.tree {
            tree.set_frame(frame);
        }
    }

    /// Applies new settings. A mode change rebuilds the tree from the
    /// current windows in order; otherwise only containers are recomputed.
    pub(crate) fn apply_settings(&mut self, settings: SpaceSettings) {
        let params = TilingParams::from(&settings);
        if settings.mode == self.settings.mode {
            if let Some(tree) = &mut self.tree {
                tree.set_params(params);
            }
            self.settings = settings;
            return;
        }

        let windows = self.tree.as_ref().map(BspTree::windows).unwrap_or_default();
        debug!(from = %self.settings.mode, to = %settings.mode, count = windows.len(), "switching space mode");
        self.tree = match settings.mode {
            SpaceMode::Float => None,
            SpaceMode::Monocle => {
                let mut tree = BspTree::new(params, self.frame);
                for window in windows {
                    if let Err(e) = tree.stack_window(window, None) {
                        warn!(%window, "dropped window while switching to monocle: {e}");
                    }
                }
                Some(tree)
            }
            SpaceMode::Bsp => {
                let mut tree = BspTree::new(params, self.frame);
                let side = if settings.spawn_as_left_child { Child::First } else { Child::Second };
                for window in windows {
                    if let Err(e) = tree.insert_window(window, None, settings.split_mode, side) {
                        warn!(%window, "dropped window while switching to bsp: {e}");
                    }
                }
                Some(tree)
            }
        };
        self.settings = settings;
    }
}

#[derive(Default)]
pub(crate) struct SpaceRegistry {
    map: HashMap<SpaceId, SpaceLayout>,
}

impl SpaceRegistry {
    /// Returns the layout of `space`, creating it if it did not exist. The
    /// flag is true when the layout was created by this call.
    pub(crate) fn ensure(
        &mut self,
        space: SpaceId,
        settings: impl FnOnce() -> SpaceSettings,
        frame: Rect,
    ) -> (&mut SpaceLayout, bool) {
        match self.map.entry(space) {
            hash_map::Entry::Vacant(entry) => {
                (entry.insert(SpaceLayout::new(settings(), frame)), true)
            }
            hash_map::Entry::Occupied(entry) => (entry.into_mut(), false),
        }
    }

    pub(crate) fn remove(&mut self, space: SpaceId) -> Option<SpaceLayout> {
        self.map.remove(&space)
    }

    pub(crate) fn get(&self, space: SpaceId) -> Option<&SpaceLayout> { self.map.get(&space) }

    pub(crate) fn get_mut(&mut self, space: SpaceId) -> Option<&mut SpaceLayout> {
        self.map.get_mut(&space)
    }

    pub(crate) fn contains(&self, space: SpaceId) -> bool { self.map.contains_key(&space) }

    /// Active spaces in a stable order.
    pub(crate) fn spaces(&self) -> BTreeSet<SpaceId> { self.map.keys().copied().collect() }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (SpaceId, &mut SpaceLayout)> {
        self.map.iter_mut().map(|(space, layout)| (*space, layout))
    }

    pub(crate) fn space_of(&self, window: WindowId) -> Option<SpaceId> {
        self.map
            .iter()
            .find(|(_, layout)| layout.tree().is_some_and(|t| t.contains_window(window)))
            .map(|(space, _)| *space)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::SplitMode;

    fn screen() -> Rect { Rect::new(0.0, 0.0, 1200.0, 800.0) }

    fn settings(mode: SpaceMode) -> SpaceSettings { SpaceSettings { mode, ..Default::default() } }

    fn layout_with(mode: SpaceMode, windows: &[u32]) -> SpaceLayout {
        let mut registry = SpaceRegistry::default();
        let (layout, created) = registry.ensure(SpaceId::new(1, 1), || settings(mode), screen());
        assert!(created);
        let tree = layout.tree_mut().unwrap();
        for &id in windows {
            match mode {
                SpaceMode::Monocle => tree.stack_window(WindowId(id), None).unwrap(),
                _ => tree
                    .insert_window(WindowId(id), None, SplitMode::Optimal, Child::Second)
                    .unwrap(),
            };
        }
        registry.remove(SpaceId::new(1, 1)).unwrap()
    }

    #[test]
    fn float_space_has_no_tree() {
        let layout = SpaceLayout::new(settings(SpaceMode::Float), screen());
        assert!(layout.tree().is_none());
    }

    #[test]
    fn ensure_reuses_existing_layout() {
        let mut registry = SpaceRegistry::default();
        let space = SpaceId::new(2, 3);
        registry.ensure(space, || settings(SpaceMode::Bsp), screen());
        let (layout, created) = registry.ensure(
            space,
            || panic!("settings must not be resolved twice"),
            screen(),
        );
        assert!(!created);
        assert_eq!(layout.mode(), SpaceMode::Bsp);
        assert_eq!(registry.spaces().into_iter().collect::<Vec<_>>(), [space]);
    }

    #[test]
    fn space_of_finds_window() {
        let mut registry = SpaceRegistry::default();
        let (layout, _) = registry.ensure(SpaceId::new(1, 2), || settings(SpaceMode::Bsp), screen());
        layout
            .tree_mut()
            .unwrap()
            .insert_window(WindowId(5), None, SplitMode::Optimal, Child::Second)
            .unwrap();
        registry.ensure(SpaceId::new(1, 1), || settings(SpaceMode::Bsp), screen());
        assert_eq!(registry.space_of(WindowId(5)), Some(SpaceId::new(1, 2)));
        assert_eq!(registry.space_of(WindowId(6)), None);
    }

    #[test]
    fn bsp_to_monocle_keeps_window_order() {
        let mut layout = layout_with(SpaceMode::Bsp, &[1, 2, 3]);
        let before = layout.tree().unwrap().windows();
        layout.apply_settings(settings(SpaceMode::Monocle));
        let tree = layout.tree().unwrap();
        assert_eq!(tree.windows(), before);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.container_of(WindowId(2)).unwrap().rect, screen());
    }

    #[test]
    fn monocle_to_bsp_tiles_windows() {
        let mut layout = layout_with(SpaceMode::Monocle, &[1, 2]);
        layout.apply_settings(settings(SpaceMode::Bsp));
        let tree = layout.tree().unwrap();
        assert_eq!(tree.windows(), [WindowId(1), WindowId(2)]);
        assert_eq!(tree.container_of(WindowId(1)).unwrap().rect, Rect::new(0.0, 0.0, 600.0, 800.0));
    }

    #[test]
    fn switching_back_and_forth_keeps_every_window() {
        let mut layout = layout_with(SpaceMode::Bsp, &[1, 2, 3, 4, 5]);
        let before = layout.tree().unwrap().windows();
        layout.apply_settings(settings(SpaceMode::Monocle));
        assert_eq!(layout.tree().unwrap().len(), 5);
        layout.apply_settings(settings(SpaceMode::Bsp));
        let tree = layout.tree().unwrap();
        assert_eq!(tree.len(), 5);
        let mut after = tree.windows();
        after.sort();
        let mut expected = before;
        expected.sort();
        assert_eq!(after, expected);
    }

    #[test]
    fn float_drops_tree() {
        let mut layout = layout_with(SpaceMode::Bsp, &[1]);
        layout.apply_settings(settings(SpaceMode::Float));
        assert!(layout.tree().is_none());
    }

    #[test]
    fn same_mode_only_recomputes() {
        let mut layout = layout_with(SpaceMode::Bsp, &[1, 2]);
        let root = layout.tree().unwrap().root();
        layout.tree_mut().unwrap().set_ratio(root, 0.3);
        let mut new = settings(SpaceMode::Bsp);
        new.outer.left = 100.0;
        layout.apply_settings(new);
        let tree = layout.tree().unwrap();
        assert_eq!(tree.split_ratio(root), Some(0.3));
        assert_eq!(tree.container(root).unwrap().rect, Rect::new(100.0, 0.0, 1100.0, 800.0));
    }

    #[test]
    fn set_frame_updates_tree() {
        let mut layout = layout_with(SpaceMode::Bsp, &[1]);
        let frame = Rect::new(0.0, 25.0, 800.0, 575.0);
        layout.set_frame(frame);
        assert_eq!(layout.frame(), frame);
        assert_eq!(layout.tree().unwrap().container_of(WindowId(1)).unwrap().rect, frame);
    }
}
