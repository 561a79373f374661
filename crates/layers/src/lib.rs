pub mod fields;
pub mod markers;
pub mod points;
pub mod raster;

pub use fields::*;
pub use markers::*;
pub use points::*;
pub use raster::*;
