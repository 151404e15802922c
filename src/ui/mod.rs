//! Terminal UI module.
//!
//! Provides the ratatui-based user interface.

pub mod about;
pub mod dashboard;
pub mod settings;

pub use about::*;
pub use dashboard::*;
pub use settings::*;
