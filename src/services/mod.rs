pub mod focus_tracker;
pub mod property_store;
pub mod session;

pub use focus_tracker::create_focus_tracker;
pub use property_store::PropertyStore;
