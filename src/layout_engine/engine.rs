use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::bsp::BspTree;
use super::container::{Container, TilingParams};
use super::graph::{Child, SplitMode};
use super::serialized::{EngineSnapshot, SerializedNode};
use super::workspaces::{SpaceId, SpaceLayout, SpaceRegistry};
use super::LayoutError;
use crate::common::collections::BTreeMap;
use crate::common::config::{self, LayoutSettings, SpaceMode};
use crate::model::WindowId;
use crate::sys::geometry::Rect;

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    /// Tiles `window` next to `target`, or in the default position.
    InsertWindow {
        window: WindowId,
        #[serde(default)]
        target: Option<WindowId>,
        #[serde(default)]
        split: Option<SplitMode>,
        #[serde(default)]
        side: Option<Child>,
    },
    /// Adds `window` to the container of `target` without splitting.
    StackWindow {
        window: WindowId,
        #[serde(default)]
        target: Option<WindowId>,
    },
    RemoveWindow(WindowId),
    /// Sets the ratio of the split directly containing `window`.
    SetSplitRatio { window: WindowId, ratio: f64 },
    ResizeWindowBy { window: WindowId, amount: f64 },
    ToggleSplit(WindowId),
    ReevaluateSplits,
    SetMode(SpaceMode),
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum LayoutEvent {
    SpaceActivated { space: SpaceId, frame: Rect },
    SpaceDeactivated(SpaceId),
    /// The usable area of a space changed, e.g. the dock was resized.
    FrameChanged { space: SpaceId, frame: Rect },
    SettingsReloaded(LayoutSettings),
    WindowAdded { space: SpaceId, window: WindowId },
    WindowRemoved(WindowId),
}

/// Window frames the caller should apply.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub frames: Vec<(WindowId, Rect)>,
}

impl EventResponse {
    fn from_layout(layout: &SpaceLayout) -> EventResponse {
        EventResponse {
            frames: layout.tree().map(BspTree::frames).unwrap_or_default(),
        }
    }
}

/// Owns the tiling state of every active space.
#[derive(Default)]
pub struct LayoutEngine {
    spaces: SpaceRegistry,
    settings: LayoutSettings,
    /// Shapes restored from disk for spaces that have not been activated yet.
    pending: BTreeMap<SpaceId, SerializedNode>,
    layouts_dir: Option<std::path::PathBuf>,
}

static_assertions::assert_impl_all!(LayoutEngine: Send);

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> LayoutEngine {
        LayoutEngine { settings, ..Default::default() }
    }

    /// Overrides the directory named layouts are read from.
    pub fn with_layouts_dir(mut self, dir: impl Into<std::path::PathBuf>) -> LayoutEngine {
        self.layouts_dir = Some(dir.into());
        self
    }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    pub fn is_active(&self, space: SpaceId) -> bool { self.spaces.contains(space) }

    pub fn active_spaces(&self) -> Vec<SpaceId> { self.spaces.spaces().into_iter().collect() }

    fn layout(&self, space: SpaceId) -> Result<&SpaceLayout, LayoutError> {
        self.spaces.get(space).ok_or(LayoutError::SpaceNotFound(space))
    }

    fn layout_mut(&mut self, space: SpaceId) -> Result<&mut SpaceLayout, LayoutError> {
        self.spaces.get_mut(space).ok_or(LayoutError::SpaceNotFound(space))
    }

    fn tree(&self, space: SpaceId) -> Result<&BspTree, LayoutError> {
        self.layout(space)?.tree().ok_or(LayoutError::NotTiled(space))
    }

    fn tree_mut(&mut self, space: SpaceId) -> Result<&mut BspTree, LayoutError> {
        self.layout_mut(space)?.tree_mut().ok_or(LayoutError::NotTiled(space))
    }

    fn named_layout_path(&self, name: &str) -> std::path::PathBuf {
        match &self.layouts_dir {
            Some(dir) => dir.join(format!("{name}.ron")),
            None => config::layout_file(name),
        }
    }

    #[instrument(skip(self))]
    pub fn handle_event(&mut self, event: LayoutEvent) -> Result<EventResponse, LayoutError> {
        debug!(?event);
        match event {
            LayoutEvent::SpaceActivated { space, frame } => Ok(self.activate_space(space, frame)),
            LayoutEvent::SpaceDeactivated(space) => {
                self.deactivate_space(space)?;
                Ok(EventResponse::default())
            }
            LayoutEvent::FrameChanged { space, frame } => self.set_frame(space, frame),
            LayoutEvent::SettingsReloaded(settings) => Ok(self.reload_settings(settings)),
            LayoutEvent::WindowAdded { space, window } => self.add_window(space, window),
            LayoutEvent::WindowRemoved(window) => {
                let space = self.space_of(window).ok_or(LayoutError::WindowNotFound(window))?;
                self.handle_command(space, LayoutCommand::RemoveWindow(window))
            }
        }
    }

    /// Creates the tree of `space` on first activation; later activations
    /// only update the frame.
    ///
    /// A new space takes a restored shape if one is pending, otherwise its
    /// configured named layout. Failing to load either is logged and the
    /// space starts empty.
    pub fn activate_space(&mut self, space: SpaceId, frame: Rect) -> EventResponse {
        let settings = &self.settings;
        let (layout, created) =
            self.spaces.ensure(space, || settings.effective_for_space(space), frame);
        if !created {
            layout.set_frame(frame);
            return EventResponse::from_layout(layout);
        }
        info!(?space, mode = %layout.mode(), "activated space");
        let named = layout.settings.layout.clone();

        if let Some(shape) = self.pending.remove(&space) {
            if let Err(e) = self.apply_shape(space, &shape) {
                warn!(?space, "could not restore layout: {e}");
            }
        } else if let Some(name) = named
            && let Err(e) = self.load_named_layout(space, &name)
        {
            warn!(?space, %name, "could not load layout: {e}");
        }
        self.spaces.get(space).map(EventResponse::from_layout).unwrap_or_default()
    }

    /// Drops the tree of `space`; its windows are forgotten.
    pub fn deactivate_space(&mut self, space: SpaceId) -> Result<(), LayoutError> {
        self.spaces.remove(space).ok_or(LayoutError::SpaceNotFound(space))?;
        info!(?space, "deactivated space");
        Ok(())
    }

    pub fn set_frame(&mut self, space: SpaceId, frame: Rect) -> Result<EventResponse, LayoutError> {
        let layout = self.layout_mut(space)?;
        layout.set_frame(frame);
        Ok(EventResponse::from_layout(layout))
    }

    /// Replaces the settings and re-applies them to every active space.
    pub fn reload_settings(&mut self, settings: LayoutSettings) -> EventResponse {
        for issue in settings.validate() {
            warn!("config: {issue}");
        }
        let mut response = EventResponse::default();
        for (space, layout) in self.spaces.iter_mut() {
            layout.apply_settings(settings.effective_for_space(space));
            response.frames.extend(EventResponse::from_layout(layout).frames);
        }
        self.settings = settings;
        response
    }

    fn add_window(&mut self, space: SpaceId, window: WindowId) -> Result<EventResponse, LayoutError> {
        if self.layout(space)?.mode() == SpaceMode::Float {
            debug!(%window, "space is floating, window left untiled");
            return Ok(EventResponse::default());
        }
        self.handle_command(space, LayoutCommand::InsertWindow {
            window,
            target: None,
            split: None,
            side: None,
        })
    }

    #[instrument(skip(self))]
    pub fn handle_command(
        &mut self,
        space: SpaceId,
        command: LayoutCommand,
    ) -> Result<EventResponse, LayoutError> {
        if let LayoutCommand::InsertWindow { window, .. } | LayoutCommand::StackWindow { window, .. } =
            command
            && let Some(other) = self.space_of(window)
            && other != space
        {
            debug!(%window, ?other, "window is already tiled in another space");
            return Err(LayoutError::WindowAlreadyTiled(window));
        }
        let layout = self.layout_mut(space)?;
        let settings = layout.settings.clone();
        match command {
            LayoutCommand::SetMode(mode) => {
                layout.apply_settings(config::SpaceSettings { mode, ..settings });
                return Ok(EventResponse::from_layout(layout));
            }
            LayoutCommand::InsertWindow { window, target, split, side }
                if settings.mode == SpaceMode::Bsp =>
            {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                let target = target
                    .map(|t| tree.leaf_of(t).ok_or(LayoutError::WindowNotFound(t)))
                    .transpose()?;
                let side = side.unwrap_or(if settings.spawn_as_left_child {
                    Child::First
                } else {
                    Child::Second
                });
                tree.insert_window(window, target, split.unwrap_or(settings.split_mode), side)?;
            }
            LayoutCommand::InsertWindow { window, target, .. }
            | LayoutCommand::StackWindow { window, target } => {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                let target = target
                    .map(|t| tree.leaf_of(t).ok_or(LayoutError::WindowNotFound(t)))
                    .transpose()?;
                tree.stack_window(window, target)?;
            }
            LayoutCommand::RemoveWindow(window) => {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                tree.remove_window(window)?;
            }
            LayoutCommand::SetSplitRatio { window, ratio } => {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                let leaf = tree.leaf_of(window).ok_or(LayoutError::WindowNotFound(window))?;
                if let Some(parent) = tree.parent(leaf) {
                    tree.set_ratio(parent, ratio);
                }
            }
            LayoutCommand::ResizeWindowBy { window, amount } => {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                tree.resize_window_by(window, amount)?;
            }
            LayoutCommand::ToggleSplit(window) => {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                tree.toggle_split(window)?;
            }
            LayoutCommand::ReevaluateSplits => {
                let tree = layout.tree_mut().ok_or(LayoutError::NotTiled(space))?;
                tree.reevaluate_splits();
            }
        }
        if let Some(tree) = layout.tree() {
            debug!("Tree:\n{}", tree.draw_tree().trim());
        }
        Ok(EventResponse::from_layout(layout))
    }

    pub fn space_of(&self, window: WindowId) -> Option<SpaceId> { self.spaces.space_of(window) }

    pub fn container_of(&self, window: WindowId) -> Option<Container> {
        let space = self.space_of(window)?;
        self.tree(space).ok()?.container_of(window)
    }

    pub fn frames(&self, space: SpaceId) -> Result<Vec<(WindowId, Rect)>, LayoutError> {
        Ok(self.tree(space)?.frames())
    }

    pub fn draw_tree(&self, space: SpaceId) -> Result<String, LayoutError> {
        Ok(self.tree(space)?.draw_tree())
    }

    pub fn shape_of(&self, space: SpaceId) -> Result<SerializedNode, LayoutError> {
        Ok(self.tree(space)?.to_shape())
    }

    /// The display name of `space`, or `[no tag]` if none is configured.
    pub fn space_name(&self, space: SpaceId) -> String {
        let name = match self.spaces.get(space) {
            Some(layout) => layout.settings.name.clone(),
            None => self.settings.effective_for_space(space).name,
        };
        name.unwrap_or_else(|| "[no tag]".to_string())
    }

    /// A short status tag: `[bsp]`, `[float]`, or the monocle position of
    /// `focused`. Inactive spaces report their configured mode.
    pub fn space_tag(&self, space: SpaceId, focused: Option<WindowId>) -> String {
        let Some(layout) = self.spaces.get(space) else {
            return format!("[{}]", self.settings.effective_for_space(space).mode);
        };
        match (layout.mode(), layout.tree()) {
            (SpaceMode::Monocle, Some(tree)) => tree.monocle_tag(focused),
            (mode, _) => format!("[{mode}]"),
        }
    }

    /// Replaces the tree of `space` with one built from `shape`.
    ///
    /// Windows tiled in another space are rejected. On error the space is
    /// left unchanged.
    pub fn apply_shape(
        &mut self,
        space: SpaceId,
        shape: &SerializedNode,
    ) -> Result<EventResponse, LayoutError> {
        for window in shape.windows() {
            if let Some(other) = self.space_of(window)
                && other != space
            {
                return Err(LayoutError::WindowAlreadyTiled(window));
            }
        }
        let layout = self.layout_mut(space)?;
        if layout.tree().is_none() {
            return Err(LayoutError::NotTiled(space));
        }
        let tree = BspTree::from_shape(shape, TilingParams::from(&layout.settings), layout.frame())?;
        layout.replace_tree(tree);
        Ok(EventResponse::from_layout(layout))
    }

    pub fn save_layout(&self, space: SpaceId, path: &Path) -> Result<(), LayoutError> {
        self.shape_of(space)?.save(path)
    }

    pub fn load_layout(&mut self, space: SpaceId, path: &Path) -> Result<EventResponse, LayoutError> {
        let shape = SerializedNode::load(path)?;
        self.apply_shape(space, &shape)
    }

    /// Loads `name` from the layouts directory.
    pub fn load_named_layout(
        &mut self,
        space: SpaceId,
        name: &str,
    ) -> Result<EventResponse, LayoutError> {
        let path = self.named_layout_path(name);
        debug!(?space, path = %path.display(), "loading named layout");
        self.load_layout(space, &path)
    }

    /// Shapes of every active tiled space.
    pub fn snapshot(&self) -> EngineSnapshot {
        let spaces = self
            .active_spaces()
            .into_iter()
            .filter_map(|space| Some((space, self.tree(space).ok()?.to_shape())))
            .collect();
        EngineSnapshot { spaces }
    }

    pub fn save(&self, path: &Path) -> Result<(), LayoutError> { self.snapshot().save(path) }

    /// Restores shapes saved by [`LayoutEngine::save`]. Active spaces are
    /// rebuilt immediately; the rest are applied when they activate.
    pub fn restore(&mut self, path: &Path) -> Result<EventResponse, LayoutError> {
        let snapshot = EngineSnapshot::load(path)?;
        let mut response = EventResponse::default();
        for (space, shape) in snapshot.spaces {
            if !self.is_active(space) {
                self.pending.insert(space, shape);
                continue;
            }
            match self.apply_shape(space, &shape) {
                Ok(r) => response.frames.extend(r.frames),
                Err(e) => warn!(?space, "could not restore layout: {e}"),
            }
        }
        Ok(response)
    }
}
