pub mod bsp;
pub mod container;
pub mod engine;
mod error;
pub mod graph;
pub mod serialized;
pub mod workspaces;

pub use bsp::{BspTree, WindowEntry};
pub use container::{Container, TilingParams};
pub use engine::{EventResponse, LayoutCommand, LayoutEngine, LayoutEvent};
pub use error::LayoutError;
pub use graph::{Child, ContainerSide, SplitAxis, SplitMode};
pub use serialized::{EngineSnapshot, SerializedNode};
pub use workspaces::SpaceId;
