use serde::{Deserialize, Serialize};

pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

/// Slippy-map base layer: a templated tile URL plus display options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerSpec {
    /// `{s}`, `{z}`, `{x}`, `{y}` placeholders, Leaflet style.
    pub url_template: String,
    pub max_zoom: f64,
    pub attribution: String,
    pub subdomains: Vec<String>,
}

impl TileLayerSpec {
    pub fn openstreetmap() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            max_zoom: 19.0,
            attribution: OSM_ATTRIBUTION.to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }
}

impl Default for TileLayerSpec {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

#[cfg(test)]
mod tests {
    use super::TileLayerSpec;

    #[test]
    fn partial_override_keeps_osm_defaults() {
        let t: TileLayerSpec =
            serde_json::from_str(r#"{ "url_template": "https://tiles.example/{z}/{x}/{y}.png" }"#)
                .unwrap();
        assert_eq!(t.url_template, "https://tiles.example/{z}/{x}/{y}.png");
        assert_eq!(t.max_zoom, 19.0);
        assert_eq!(t.subdomains, TileLayerSpec::openstreetmap().subdomains);
    }
}
