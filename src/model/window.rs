use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a window, owned by the window-lifecycle collaborator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl WindowId {
    pub fn new(id: u32) -> Self { WindowId(id) }

    pub fn get(self) -> u32 { self.0 }
}

impl From<u32> for WindowId {
    fn from(id: u32) -> Self { WindowId(id) }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
