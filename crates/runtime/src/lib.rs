pub mod config;
pub mod detector;
pub mod event_bus;
pub mod session;
pub mod status;

pub use config::*;
pub use detector::*;
pub use event_bus::*;
pub use session::*;
pub use status::*;
