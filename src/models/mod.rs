pub mod session_message;

pub use session_message::{SessionEvent, SessionMessage};
