pub mod tree;
pub mod window;

pub use window::WindowId;
