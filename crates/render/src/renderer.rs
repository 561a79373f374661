use foundation::{GeoBounds, LatLng, Viewport};
use layers::{Marker, MarkerLayer, Point, TileLayerSpec};

use crate::backend::{MapBackend, RenderError};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub container_id: String,
    /// Used when there is nothing better to center on.
    pub default_view: Viewport,
    /// Zoom used when exactly one point is shown.
    pub point_zoom: f64,
    pub fit_padding_px: f64,
    pub tiles: TileLayerSpec,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            container_id: "map".to_string(),
            default_view: Viewport::new(LatLng::new(41.9, 12.5), 6.0),
            point_zoom: 10.0,
            fit_padding_px: 20.0,
            tiles: TileLayerSpec::openstreetmap(),
        }
    }
}

/// What `render_points` did to the viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange {
    Unchanged,
    Centered(Viewport),
    Fitted { bounds: GeoBounds, padding_px: f64 },
}

struct Surface<B: MapBackend> {
    map: B::Map,
    group: B::Markers,
    layer: MarkerLayer,
}

/// Owns the one live map surface and its marker layer.
///
/// Two states: no surface (uninitialized) or one surface (active). Any
/// re-initialization removes the previous surface first; re-renders clear
/// the marker layer before repopulating it.
pub struct MapRenderer<B: MapBackend> {
    backend: B,
    settings: RenderSettings,
    surface: Option<Surface<B>>,
}

impl<B: MapBackend> MapRenderer<B> {
    pub fn new(backend: B, settings: RenderSettings) -> Self {
        Self {
            backend,
            settings,
            surface: None,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_active(&self) -> bool {
        self.surface.is_some()
    }

    pub fn markers(&self) -> Option<&MarkerLayer> {
        self.surface.as_ref().map(|s| &s.layer)
    }

    pub fn view(&self) -> Option<Viewport> {
        self.surface.as_ref().map(|s| self.backend.view(&s.map))
    }

    /// Removes the live surface, if any.
    pub fn dispose(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.backend.clear_markers(&surface.group);
            self.backend.remove_map(surface.map);
            tracing::debug!("map surface disposed");
        }
    }

    /// Replaces any live surface with a fresh one holding an empty marker
    /// layer, centered on `center` or the default center.
    pub fn init_map(&mut self, center: Option<LatLng>) -> Result<(), RenderError> {
        self.dispose();

        let view = Viewport::new(
            center.unwrap_or(self.settings.default_view.center),
            self.settings.default_view.zoom,
        );
        let map = self
            .backend
            .create_map(&self.settings.container_id, view)?;
        let group = match self
            .backend
            .add_tile_layer(&map, &self.settings.tiles)
            .and_then(|_| self.backend.create_marker_group(&map))
        {
            Ok(group) => group,
            Err(err) => {
                self.backend.remove_map(map);
                return Err(err);
            }
        };

        self.surface = Some(Surface {
            map,
            group,
            layer: MarkerLayer::default(),
        });
        tracing::debug!(
            lat = view.center.lat,
            lng = view.center.lng,
            zoom = view.zoom,
            "map surface created"
        );
        Ok(())
    }

    /// Fresh surface at the default center with one labeled marker whose
    /// popup is already open.
    pub fn init_standalone(&mut self, label: &str) -> Result<(), RenderError> {
        self.init_map(None)?;
        let marker = Marker::opened(self.settings.default_view.center, label);
        if let Some(surface) = self.surface.as_mut() {
            self.backend.add_marker(&surface.group, &marker)?;
            surface.layer.push(marker);
        }
        tracing::info!(label, "standalone map initialized");
        Ok(())
    }

    /// Shows exactly `points`, replacing whatever markers were there.
    ///
    /// Viewport: zero points leave it alone, one point centers on it at
    /// `point_zoom`, more points fit their bounding box with padding.
    pub fn render_points(&mut self, points: &[Point]) -> Result<ViewChange, RenderError> {
        if self.surface.is_none() {
            self.init_map(points.first().map(Point::position))?;
        }
        let Some(surface) = self.surface.as_mut() else {
            return Err(RenderError::Backend("no map surface".to_string()));
        };

        self.backend.clear_markers(&surface.group);
        surface.layer.clear();
        for p in points {
            let marker = Marker::for_point(p);
            self.backend.add_marker(&surface.group, &marker)?;
            surface.layer.push(marker);
        }

        let change = match points {
            [] => ViewChange::Unchanged,
            [only] => {
                let view = Viewport::new(only.position(), self.settings.point_zoom);
                self.backend.set_view(&surface.map, view);
                ViewChange::Centered(view)
            }
            _ => match surface.layer.bounds() {
                Some(bounds) => {
                    let padding_px = self.settings.fit_padding_px;
                    self.backend.fit_bounds(&surface.map, bounds, padding_px);
                    ViewChange::Fitted { bounds, padding_px }
                }
                None => ViewChange::Unchanged,
            },
        };
        tracing::info!(points = points.len(), "points rendered");
        Ok(change)
    }
}

impl<B: MapBackend> Drop for MapRenderer<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
