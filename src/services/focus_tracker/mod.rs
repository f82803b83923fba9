//! FocusTracker service: responsibility and boundaries
//!
//! This module is responsible ONLY for reacting to active-window changes and
//! moving the XKB group between windows (save for the outgoing window, restore
//! for the incoming one). Where the group is persisted is PropertyStore's
//! business; how the windowing system is reached is WindowSession's.

mod focus_tracker;
mod r#trait;

pub use self::r#trait::create_focus_tracker;
