use crate::LatLng;

/// Axis-aligned geographic bounding box, `[lat, lng]` corners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl GeoBounds {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        GeoBounds { min, max }
    }

    pub fn from_point(p: LatLng) -> Self {
        GeoBounds {
            min: p.to_array(),
            max: p.to_array(),
        }
    }

    /// Smallest box covering every point, `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(first);
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.min[0] = self.min[0].min(p.lat);
        self.min[1] = self.min[1].min(p.lng);
        self.max[0] = self.max[0].max(p.lat);
        self.max[1] = self.max[1].max(p.lng);
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::from(self.min)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::from(self.max)
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.min[0] && p.lat <= self.max[0] && p.lng >= self.min[1] && p.lng <= self.max[1]
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::LatLng;

    #[test]
    fn empty_iterator_has_no_bounds() {
        assert!(GeoBounds::from_points(Vec::<LatLng>::new()).is_none());
    }

    #[test]
    fn covers_all_points() {
        let pts = [
            LatLng::new(45.0, 9.0),
            LatLng::new(41.9, 12.5),
            LatLng::new(43.7, 7.2),
        ];
        let b = GeoBounds::from_points(pts).unwrap();
        assert_eq!(b.min, [41.9, 7.2]);
        assert_eq!(b.max, [45.0, 12.5]);
        assert!(pts.iter().all(|p| b.contains(*p)));
    }

    #[test]
    fn single_point_is_degenerate() {
        let b = GeoBounds::from_point(LatLng::new(1.0, 2.0));
        assert_eq!(b.south_west(), b.north_east());
        assert!(b.contains(LatLng::new(1.0, 2.0)));
    }
}
