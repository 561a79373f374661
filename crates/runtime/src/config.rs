use foundation::{LatLng, Viewport};
use layers::{TileLayerSpec, UNNAMED_LABEL};
use render::RenderSettings;
use serde::{Deserialize, Serialize};

/// How the name and location columns are found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Columns named exactly `name_field` / `location_field` in the active
    /// table and view.
    #[default]
    Fixed,
    /// User picks table, view and both columns.
    Picker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub mode: ResolveMode,
    pub container_id: String,
    pub name_field: String,
    pub location_field: String,
    /// Substrings that mark a field as the likely location column.
    pub location_hints: Vec<String>,
    pub unnamed_label: String,
    pub read_page_size: usize,
    pub picker_page_size: usize,
    /// `[lat, lng]`
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    pub point_zoom: f64,
    pub fit_padding_px: f64,
    pub tiles: TileLayerSpec,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Fixed,
            container_id: "map".to_string(),
            name_field: "门店名称".to_string(),
            location_field: "位置".to_string(),
            location_hints: vec!["位置".to_string(), "location".to_string()],
            unnamed_label: UNNAMED_LABEL.to_string(),
            read_page_size: 500,
            picker_page_size: 2000,
            default_center: [41.9, 12.5],
            default_zoom: 6.0,
            point_zoom: 10.0,
            fit_padding_px: 20.0,
            tiles: TileLayerSpec::openstreetmap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ViewerConfig {
    /// Parses and validates; missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg = serde_json::from_str::<ViewerConfig>(raw)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_page_size == 0 || self.picker_page_size == 0 {
            return Err(ConfigError::Invalid("page sizes must be positive".into()));
        }
        if !self.default_center().is_finite() {
            return Err(ConfigError::Invalid("default_center must be finite".into()));
        }
        let max = self.tiles.max_zoom;
        for (name, z) in [
            ("default_zoom", self.default_zoom),
            ("point_zoom", self.point_zoom),
        ] {
            if !(0.0..=max).contains(&z) {
                return Err(ConfigError::Invalid(format!(
                    "{name} {z} outside 0..={max}"
                )));
            }
        }
        if self.fit_padding_px.is_nan() || self.fit_padding_px < 0.0 {
            return Err(ConfigError::Invalid("fit_padding_px must be >= 0".into()));
        }
        if self.container_id.is_empty() {
            return Err(ConfigError::Invalid("container_id is empty".into()));
        }
        Ok(())
    }

    pub fn default_center(&self) -> LatLng {
        LatLng::from(self.default_center)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            container_id: self.container_id.clone(),
            default_view: Viewport::new(self.default_center(), self.default_zoom),
            point_zoom: self.point_zoom,
            fit_padding_px: self.fit_padding_px,
            tiles: self.tiles.clone(),
        }
    }
}
