//! Configuration module for markview
//!
//! Holds the layout configuration read by the renderer and its JSON
//! persistence in the platform configuration directory.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
