pub mod backend;
pub mod headless;
pub mod renderer;

pub use backend::*;
pub use headless::*;
pub use renderer::*;
