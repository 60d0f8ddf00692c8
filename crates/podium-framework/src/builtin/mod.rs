//! Plugins shipped with the framework.

mod jukebox;

pub use jukebox::{JukeboxPlugin, advance as advance_jukebox};
