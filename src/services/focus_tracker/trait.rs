use crate::config::Config;
use crate::error::Result;
use crate::services::session::{create_session, WindowSession};
use std::sync::Arc;

/// Trait for focus trackers that can run against different sessions
pub trait FocusTrackerTrait {
    /// Run the tracker until a shutdown is requested or the notification stream fails
    fn run(self: Box<Self>) -> Result<()>;

    /// Handle for stopping `run` from another thread
    fn shutdown_handle(&self) -> ShutdownHandle;
}

/// Stops a running tracker so that it returns and releases its session
#[derive(Clone)]
pub struct ShutdownHandle {
    session: Arc<dyn WindowSession>,
}

impl ShutdownHandle {
    pub fn new(session: Arc<dyn WindowSession>) -> Self {
        Self { session }
    }

    pub fn request(&self) -> Result<()> {
        self.session.interrupt()
    }
}

/// Factory function to create a focus tracker over the real X11 session or the dry-run emulation
pub fn create_focus_tracker(config: &Config, dry_run: bool) -> Result<Box<dyn FocusTrackerTrait + Send>> {
    let session = create_session(config, dry_run)?;
    Ok(Box::new(super::focus_tracker::FocusTracker::new(session, &config.session)?))
}
