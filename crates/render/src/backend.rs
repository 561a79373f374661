use foundation::{GeoBounds, Viewport};
use layers::{Marker, TileLayerSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The DOM container to mount into does not exist or is already taken.
    Container(String),
    /// The mapping library rejected a call.
    Backend(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Container(msg) => write!(f, "map container error: {msg}"),
            RenderError::Backend(msg) => write!(f, "map backend error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Primitives a slippy-map library has to offer.
///
/// `Map` and `Markers` are opaque handles owned by the caller; a map
/// handed to [`MapBackend::remove_map`] is gone for good.
pub trait MapBackend {
    type Map;
    type Markers;

    fn create_map(&mut self, container_id: &str, view: Viewport) -> Result<Self::Map, RenderError>;

    fn add_tile_layer(&mut self, map: &Self::Map, tiles: &TileLayerSpec) -> Result<(), RenderError>;

    fn create_marker_group(&mut self, map: &Self::Map) -> Result<Self::Markers, RenderError>;

    fn clear_markers(&mut self, group: &Self::Markers);

    fn add_marker(&mut self, group: &Self::Markers, marker: &Marker) -> Result<(), RenderError>;

    fn set_view(&mut self, map: &Self::Map, view: Viewport);

    fn fit_bounds(&mut self, map: &Self::Map, bounds: GeoBounds, padding_px: f64);

    fn view(&self, map: &Self::Map) -> Viewport;

    fn remove_map(&mut self, map: Self::Map);
}
