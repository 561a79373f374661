use std::collections::{BTreeMap, BTreeSet};

use foundation::math::fit_bounds;
use foundation::{GeoBounds, Viewport};
use layers::{Marker, TileLayerSpec};

use crate::backend::{MapBackend, RenderError};

/// Zoom ceiling when no tile layer says otherwise.
const DEFAULT_MAX_ZOOM: f64 = 18.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadlessMapId(u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HeadlessGroupId {
    map: u64,
    group: u64,
}

/// In-memory state of one map.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    pub container_id: String,
    pub initial_view: Viewport,
    pub view: Viewport,
    pub tile_layers: Vec<TileLayerSpec>,
    pub groups: BTreeMap<u64, Vec<Marker>>,
    /// Every `fit_bounds` call, in order.
    pub fits: Vec<(GeoBounds, f64)>,
}

impl HeadlessSurface {
    pub fn marker_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.groups.values().flatten()
    }

    fn max_zoom(&self) -> f64 {
        self.tile_layers
            .iter()
            .map(|t| t.max_zoom)
            .fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |a| a.max(z))))
            .unwrap_or(DEFAULT_MAX_ZOOM)
    }
}

/// [`MapBackend`] without a display.
///
/// Keeps maps in memory, refuses to mount twice into the same container
/// (as Leaflet does), and emulates `fitBounds` on a fixed-size viewport.
#[derive(Debug)]
pub struct HeadlessMap {
    size_px: [f64; 2],
    maps: BTreeMap<u64, HeadlessSurface>,
    missing_containers: BTreeSet<String>,
    next_id: u64,
    removed: usize,
}

impl HeadlessMap {
    pub fn new(size_px: [f64; 2]) -> Self {
        Self {
            size_px,
            maps: BTreeMap::new(),
            missing_containers: BTreeSet::new(),
            next_id: 0,
            removed: 0,
        }
    }

    /// Makes `create_map` fail for `container_id`.
    pub fn with_missing_container(mut self, container_id: impl Into<String>) -> Self {
        self.missing_containers.insert(container_id.into());
        self
    }

    pub fn size_px(&self) -> [f64; 2] {
        self.size_px
    }

    pub fn live_maps(&self) -> usize {
        self.maps.len()
    }

    pub fn removed_maps(&self) -> usize {
        self.removed
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &HeadlessSurface> {
        self.maps.values()
    }

    pub fn surface(&self, id: HeadlessMapId) -> Option<&HeadlessSurface> {
        self.maps.get(&id.0)
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn surface_mut(&mut self, id: u64) -> Option<&mut HeadlessSurface> {
        let found = self.maps.get_mut(&id);
        if found.is_none() {
            tracing::warn!(map = id, "call on a removed headless map ignored");
        }
        found
    }
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::new([1280.0, 720.0])
    }
}

impl MapBackend for HeadlessMap {
    type Map = HeadlessMapId;
    type Markers = HeadlessGroupId;

    fn create_map(&mut self, container_id: &str, view: Viewport) -> Result<Self::Map, RenderError> {
        if self.missing_containers.contains(container_id) {
            return Err(RenderError::Container(format!(
                "no element with id `{container_id}`"
            )));
        }
        if self.maps.values().any(|m| m.container_id == container_id) {
            return Err(RenderError::Container(
                "map container is already initialized".to_string(),
            ));
        }
        let id = self.alloc_id();
        self.maps.insert(
            id,
            HeadlessSurface {
                container_id: container_id.to_string(),
                initial_view: view,
                view,
                tile_layers: Vec::new(),
                groups: BTreeMap::new(),
                fits: Vec::new(),
            },
        );
        Ok(HeadlessMapId(id))
    }

    fn add_tile_layer(&mut self, map: &Self::Map, tiles: &TileLayerSpec) -> Result<(), RenderError> {
        let surface = self
            .surface_mut(map.0)
            .ok_or_else(|| RenderError::Backend("map was removed".to_string()))?;
        surface.tile_layers.push(tiles.clone());
        Ok(())
    }

    fn create_marker_group(&mut self, map: &Self::Map) -> Result<Self::Markers, RenderError> {
        let group = self.alloc_id();
        let surface = self
            .surface_mut(map.0)
            .ok_or_else(|| RenderError::Backend("map was removed".to_string()))?;
        surface.groups.insert(group, Vec::new());
        Ok(HeadlessGroupId { map: map.0, group })
    }

    fn clear_markers(&mut self, group: &Self::Markers) {
        if let Some(markers) = self
            .surface_mut(group.map)
            .and_then(|s| s.groups.get_mut(&group.group))
        {
            markers.clear();
        }
    }

    fn add_marker(&mut self, group: &Self::Markers, marker: &Marker) -> Result<(), RenderError> {
        let markers = self
            .surface_mut(group.map)
            .and_then(|s| s.groups.get_mut(&group.group))
            .ok_or_else(|| RenderError::Backend("marker group was removed".to_string()))?;
        markers.push(marker.clone());
        Ok(())
    }

    fn set_view(&mut self, map: &Self::Map, view: Viewport) {
        if let Some(surface) = self.surface_mut(map.0) {
            surface.view = view;
        }
    }

    fn fit_bounds(&mut self, map: &Self::Map, bounds: GeoBounds, padding_px: f64) {
        let size_px = self.size_px;
        if let Some(surface) = self.surface_mut(map.0) {
            surface.view = fit_bounds(bounds, size_px, padding_px, surface.max_zoom());
            surface.fits.push((bounds, padding_px));
        }
    }

    fn view(&self, map: &Self::Map) -> Viewport {
        self.maps
            .get(&map.0)
            .map(|s| s.view)
            .unwrap_or_else(|| Viewport::new(Default::default(), 0.0))
    }

    fn remove_map(&mut self, map: Self::Map) {
        if self.maps.remove(&map.0).is_some() {
            self.removed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::LatLng;

    #[test]
    fn container_cannot_host_two_maps() {
        let mut backend = HeadlessMap::default();
        let view = Viewport::new(LatLng::new(0.0, 0.0), 3.0);
        let first = backend.create_map("map", view).unwrap();
        assert!(matches!(
            backend.create_map("map", view),
            Err(RenderError::Container(_))
        ));
        backend.remove_map(first);
        assert!(backend.create_map("map", view).is_ok());
        assert_eq!(backend.removed_maps(), 1);
    }

    #[test]
    fn fit_respects_tile_max_zoom() {
        let mut backend = HeadlessMap::new([800.0, 600.0]);
        let map = backend
            .create_map("map", Viewport::new(LatLng::new(0.0, 0.0), 6.0))
            .unwrap();
        backend
            .add_tile_layer(&map, &TileLayerSpec::openstreetmap())
            .unwrap();
        let tight = GeoBounds::new([45.0, 9.0], [45.000001, 9.000001]);
        backend.fit_bounds(&map, tight, 20.0);
        assert_eq!(backend.view(&map).zoom, 19.0);

        let wide = GeoBounds::new([41.9, 9.0], [45.0, 12.5]);
        backend.fit_bounds(&map, wide, 20.0);
        let v = backend.view(&map);
        assert!(v.zoom >= 5.0 && v.zoom <= 8.0, "zoom {}", v.zoom);
        assert!(wide.contains(v.center));
        assert_eq!(backend.surface(map).unwrap().fits.len(), 2);
    }

    #[test]
    fn groups_are_cleared_in_place() {
        let mut backend = HeadlessMap::default();
        let map = backend
            .create_map("map", Viewport::new(LatLng::new(0.0, 0.0), 6.0))
            .unwrap();
        let group = backend.create_marker_group(&map).unwrap();
        backend
            .add_marker(&group, &Marker::opened(LatLng::new(1.0, 1.0), "x"))
            .unwrap();
        assert_eq!(backend.surface(map).unwrap().marker_count(), 1);
        backend.clear_markers(&group);
        assert_eq!(backend.surface(map).unwrap().marker_count(), 0);
    }
}
