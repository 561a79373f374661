//! Spherical Web-Mercator helpers (EPSG:3857), as used by slippy-map tile
//! renderers.

use crate::{GeoBounds, LatLng, Viewport};

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

/// Edge length of one map tile in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

pub fn world_width_m() -> f64 {
    2.0 * std::f64::consts::PI * WGS84_A
}

pub fn mercator_x_m(lng_deg: f64) -> f64 {
    WGS84_A * lng_deg.to_radians()
}

pub fn mercator_y_m(lat_deg: f64) -> f64 {
    let lat = lat_deg
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    WGS84_A * (0.5 * (std::f64::consts::FRAC_PI_2 + lat)).tan().ln()
}

pub fn inverse_mercator_lng_deg(x_m: f64) -> f64 {
    (x_m / WGS84_A).to_degrees()
}

pub fn inverse_mercator_lat_deg(y_m: f64) -> f64 {
    (2.0 * (y_m / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees()
}

/// View that shows `bounds` inside a `size_px` viewport, keeping
/// `padding_px` free on every side.
///
/// Zoom is snapped down to an integer and clamped to `0..=max_zoom`; a
/// degenerate box (all points equal) lands on `max_zoom`. The center is
/// the midpoint in projected space, not in degrees.
pub fn fit_bounds(bounds: GeoBounds, size_px: [f64; 2], padding_px: f64, max_zoom: f64) -> Viewport {
    let sw = bounds.south_west();
    let ne = bounds.north_east();

    let x0 = mercator_x_m(sw.lng);
    let x1 = mercator_x_m(ne.lng);
    let y0 = mercator_y_m(sw.lat);
    let y1 = mercator_y_m(ne.lat);

    let avail_w = (size_px[0] - 2.0 * padding_px).max(1.0);
    let avail_h = (size_px[1] - 2.0 * padding_px).max(1.0);

    // Required zoom per axis; an empty extent imposes no limit.
    let zoom_for = |avail_px: f64, extent_m: f64| -> f64 {
        if extent_m <= 0.0 {
            f64::INFINITY
        } else {
            (avail_px * world_width_m() / (TILE_SIZE_PX * extent_m)).log2()
        }
    };
    let zoom = zoom_for(avail_w, x1 - x0).min(zoom_for(avail_h, y1 - y0));
    let zoom = if zoom.is_finite() { zoom.floor() } else { max_zoom };
    let zoom = zoom.clamp(0.0, max_zoom);

    let center = LatLng::new(
        inverse_mercator_lat_deg(0.5 * (y0 + y1)),
        inverse_mercator_lng_deg(0.5 * (x0 + x1)),
    );
    Viewport::new(center, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn projection_round_trip() {
        let lat = 45.0;
        let lng = 9.0;
        assert_close(inverse_mercator_lat_deg(mercator_y_m(lat)), lat, 1e-9);
        assert_close(inverse_mercator_lng_deg(mercator_x_m(lng)), lng, 1e-9);
    }

    #[test]
    fn latitude_is_clamped_to_mercator_range() {
        assert_close(mercator_y_m(90.0), mercator_y_m(MERCATOR_MAX_LAT_DEG), 1e-6);
    }

    #[test]
    fn fit_whole_world_is_zoom_zero() {
        let b = GeoBounds::new([-80.0, -180.0], [80.0, 180.0]);
        let v = fit_bounds(b, [256.0, 256.0], 0.0, 19.0);
        assert_eq!(v.zoom, 0.0);
        assert_close(v.center.lng, 0.0, 1e-9);
        assert_close(v.center.lat, 0.0, 1e-9);
    }

    #[test]
    fn fit_degenerate_bounds_uses_max_zoom() {
        let b = GeoBounds::from_point(LatLng::new(45.0, 9.0));
        let v = fit_bounds(b, [800.0, 600.0], 20.0, 19.0);
        assert_eq!(v.zoom, 19.0);
        assert_close(v.center.lat, 45.0, 1e-9);
        assert_close(v.center.lng, 9.0, 1e-9);
    }

    #[test]
    fn padding_never_zooms_in() {
        let b = GeoBounds::new([41.9, 9.0], [45.0, 12.5]);
        let tight = fit_bounds(b, [800.0, 600.0], 0.0, 19.0);
        let padded = fit_bounds(b, [800.0, 600.0], 20.0, 19.0);
        assert!(padded.zoom <= tight.zoom);
        assert!(padded.zoom >= 0.0);
    }
}
