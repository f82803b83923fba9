//! Window session: the collaborator interface of the focus tracker.
//!
//! This module is responsible ONLY for talking to the windowing system
//! (connection, atoms, notifications, XKB group, window properties).
//! It MUST NOT decide which group belongs to which window; that is the
//! job of FocusTracker and PropertyStore.

mod memory;
mod r#trait;
mod x11;

#[allow(unused_imports)]
pub use self::memory::{MemorySession, SessionCall};
pub use self::r#trait::{create_session, WindowSession};
