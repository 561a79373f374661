pub mod bounds;
pub mod latlng;
pub mod math;
pub mod viewport;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use latlng::*;
pub use viewport::*;
