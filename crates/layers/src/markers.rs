use foundation::{GeoBounds, LatLng};

use crate::points::Point;

/// A pin with a popup.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: LatLng,
    pub popup: String,
    /// Open the popup as soon as the marker is added.
    pub open_popup: bool,
}

impl Marker {
    pub fn for_point(p: &Point) -> Self {
        Self {
            position: p.position(),
            popup: p.name.clone(),
            open_popup: false,
        }
    }

    pub fn opened(position: LatLng, popup: impl Into<String>) -> Self {
        Self {
            position,
            popup: popup.into(),
            open_popup: true,
        }
    }
}

/// The set of pins currently shown on a map. Cleared and repopulated on
/// every render, never appended to across renders.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
}

impl MarkerLayer {
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn push(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.markers.iter().map(|m| m.position))
    }
}

#[cfg(test)]
mod tests {
    use super::{Marker, MarkerLayer};
    use crate::points::Point;

    #[test]
    fn point_marker_uses_name_as_popup() {
        let m = Marker::for_point(&Point::new("Store A", 45.0, 9.0));
        assert_eq!(m.popup, "Store A");
        assert_eq!(m.position.to_array(), [45.0, 9.0]);
        assert!(!m.open_popup);
    }

    #[test]
    fn clear_empties_layer() {
        let mut layer = MarkerLayer::default();
        layer.push(Marker::for_point(&Point::new("a", 1.0, 2.0)));
        layer.push(Marker::for_point(&Point::new("b", -1.0, 4.0)));
        assert_eq!(layer.len(), 2);
        let b = layer.bounds().unwrap();
        assert_eq!(b.min, [-1.0, 2.0]);
        assert_eq!(b.max, [1.0, 4.0]);

        layer.clear();
        assert!(layer.is_empty());
        assert!(layer.bounds().is_none());
    }
}
