pub mod keyboard;
pub mod window;

pub use keyboard::LayoutGroup;
pub use window::{Atom, Notification, Transition, WindowId};
