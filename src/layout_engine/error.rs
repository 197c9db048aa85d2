use thiserror::Error;

use super::workspaces::SpaceId;
use crate::model::WindowId;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Space not found: {0:?}")]
    SpaceNotFound(SpaceId),
    #[error("Window not found: {0}")]
    WindowNotFound(WindowId),
    #[error("Window is already tiled: {0}")]
    WindowAlreadyTiled(WindowId),
    #[error("Space {0:?} is not tiled")]
    NotTiled(SpaceId),
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
    #[error("Layout file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse layout: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Could not write layout: {0}")]
    Serialize(#[from] ron::Error),
}
