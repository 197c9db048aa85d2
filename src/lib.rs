//! Binary space-partition tiling engine.
//!
//! The engine owns one tree per virtual desktop. It receives a usable screen
//! rectangle and per-desktop settings and produces one container rectangle
//! per window. It does not talk to the window server.

pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sys;
