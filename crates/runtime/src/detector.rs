//! Environment detection and the fixed-name bound flow.
//!
//! The host connector is injected by the caller (`None` when the SDK is
//! not present). Everything that can go wrong while setting up bound mode
//! funnels into one [`Fallback`] value; [`start`] turns that into a
//! standalone map.

use catalog::{CatalogError, HostBase};
use layers::{MissingFields, Point, RecordProjector, ResolvedFields, resolve_by_name};
use render::{MapBackend, MapRenderer, RenderError, ViewChange};

use crate::config::ViewerConfig;
use crate::event_bus::StatusBus;
use crate::session::PickerSession;
use crate::status::Status;

pub const NO_ENVIRONMENT_LABEL: &str = "no environment, standalone mode";
pub const INIT_FAILED_LABEL: &str = "initialization failed, standalone mode";
pub const FIELDS_MISSING_LABEL: &str = "required fields missing, standalone mode";

/// Why bound mode could not be entered.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    NoEnvironment,
    HandshakeFailed(CatalogError),
    FieldsMissing(MissingFields),
    SetupFailed(CatalogError),
    Render(RenderError),
}

impl Fallback {
    /// Popup text of the standalone marker.
    pub fn label(&self) -> &'static str {
        match self {
            Fallback::NoEnvironment => NO_ENVIRONMENT_LABEL,
            Fallback::FieldsMissing(_) => FIELDS_MISSING_LABEL,
            Fallback::HandshakeFailed(_) | Fallback::SetupFailed(_) | Fallback::Render(_) => {
                INIT_FAILED_LABEL
            }
        }
    }

    /// Message that warrants interrupting the user, if any.
    pub fn alert(&self) -> Option<String> {
        match self {
            Fallback::FieldsMissing(missing) => Some(missing.to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::NoEnvironment => write!(f, "no data-source host in this environment"),
            Fallback::HandshakeFailed(err) => write!(f, "{err}"),
            Fallback::FieldsMissing(missing) => write!(f, "{missing}"),
            Fallback::SetupFailed(err) => write!(f, "bound-mode setup failed: {err}"),
            Fallback::Render(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Fallback {}

impl From<CatalogError> for Fallback {
    fn from(err: CatalogError) -> Self {
        Fallback::SetupFailed(err)
    }
}

impl From<RenderError> for Fallback {
    fn from(err: RenderError) -> Self {
        Fallback::Render(err)
    }
}

/// Outcome of a successful bound-mode start.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundReport {
    pub table_id: String,
    pub view_id: String,
    pub fields: ResolvedFields,
    pub records_read: usize,
    pub points: Vec<Point>,
    pub view_change: ViewChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Bound(BoundReport),
    Standalone(Fallback),
}

/// Bound-mode setup against the active table and view: handshake, resolve
/// columns by name, read one capped page, render.
pub async fn initialize<H, B>(
    host: Option<&H>,
    config: &ViewerConfig,
    renderer: &mut MapRenderer<B>,
    status: &mut StatusBus,
) -> Result<BoundReport, Fallback>
where
    H: HostBase + ?Sized,
    B: MapBackend,
{
    let Some(host) = host else {
        return Err(Fallback::NoEnvironment);
    };

    status.emit(Status::WaitingForHost);
    host.ready().await.map_err(Fallback::HandshakeFailed)?;

    let table_id = host.active_table_id().await?;
    let view_id = host.active_view_id(&table_id).await?;
    let fields = host.field_list(&table_id).await?;
    let resolved = resolve_by_name(&fields, &config.name_field, &config.location_field)
        .map_err(|missing| {
            tracing::error!(
                searched_name = %missing.name_label,
                searched_location = %missing.location_label,
                fields = ?missing.available_names(),
                "required fields not found"
            );
            Fallback::FieldsMissing(missing)
        })?;

    status.emit(Status::ReadingRecords);
    let page = host
        .records(&table_id, &view_id, config.read_page_size)
        .await?;
    let projection = RecordProjector::new(&resolved, &config.unnamed_label).project(&page.records);

    renderer.init_map(projection.points.first().map(Point::position))?;
    let view_change = renderer.render_points(&projection.points)?;

    status.emit(Status::Loaded {
        points: projection.points.len(),
        records: page.records.len(),
    });
    Ok(BoundReport {
        table_id,
        view_id,
        fields: resolved,
        records_read: page.records.len(),
        points: projection.points,
        view_change,
    })
}

/// Runs [`initialize`] and degrades to a standalone map on any failure.
///
/// Only a failure to draw the standalone map itself is returned as an
/// error.
pub async fn start<H, B>(
    host: Option<&H>,
    config: &ViewerConfig,
    renderer: &mut MapRenderer<B>,
    status: &mut StatusBus,
) -> Result<Mode, RenderError>
where
    H: HostBase + ?Sized,
    B: MapBackend,
{
    match initialize(host, config, renderer, status).await {
        Ok(report) => Ok(Mode::Bound(report)),
        Err(fallback) => {
            fall_back(&fallback, renderer, status)?;
            Ok(Mode::Standalone(fallback))
        }
    }
}

/// Interactive start: either a ready picker session or a standalone map.
pub enum PickerStart {
    Ready(PickerSession),
    Standalone(Fallback),
}

pub async fn start_picker<H, B>(
    host: Option<&H>,
    config: &ViewerConfig,
    renderer: &mut MapRenderer<B>,
    status: &mut StatusBus,
) -> Result<PickerStart, RenderError>
where
    H: HostBase + ?Sized,
    B: MapBackend,
{
    let opened = match host {
        None => Err(Fallback::NoEnvironment),
        Some(host) => PickerSession::open(host, config, status).await,
    };
    match opened {
        Ok(session) => {
            renderer.init_map(None)?;
            Ok(PickerStart::Ready(session))
        }
        Err(fallback) => {
            fall_back(&fallback, renderer, status)?;
            Ok(PickerStart::Standalone(fallback))
        }
    }
}

fn fall_back<B: MapBackend>(
    fallback: &Fallback,
    renderer: &mut MapRenderer<B>,
    status: &mut StatusBus,
) -> Result<(), RenderError> {
    match fallback {
        Fallback::NoEnvironment => tracing::info!("no host connector found, running standalone"),
        Fallback::FieldsMissing(_) => tracing::warn!(reason = %fallback, "falling back to standalone"),
        _ => tracing::error!(reason = %fallback, "bound-mode initialization failed"),
    }
    renderer.init_standalone(fallback.label())?;
    status.emit(Status::Standalone(fallback.label().to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{FieldRef, InMemoryBase};
    use foundation::{GeoBounds, LatLng, Viewport};
    use pollster::block_on;
    use pretty_assertions::assert_eq;
    use render::HeadlessMap;

    fn base(records: &str) -> InMemoryBase {
        InMemoryBase::from_json(&format!(
            r#"{{
                "tables": {{
                    "tbl": {{
                        "name": "Stores",
                        "fields": [{{ "id": "f1", "name": "门店名称" }}, {{ "id": "f2", "name": "位置" }}],
                        "views": [{{ "id": "v1", "name": "Grid" }}],
                        "records": {records}
                    }}
                }}
            }}"#
        ))
        .unwrap()
    }

    fn renderer() -> MapRenderer<HeadlessMap> {
        MapRenderer::new(
            HeadlessMap::new([800.0, 600.0]),
            ViewerConfig::default().render_settings(),
        )
    }

    fn run(host: Option<&InMemoryBase>) -> (Mode, MapRenderer<HeadlessMap>, StatusBus) {
        let mut r = renderer();
        let mut bus = StatusBus::new();
        let mode = block_on(start(host, &ViewerConfig::default(), &mut r, &mut bus)).unwrap();
        (mode, r, bus)
    }

    #[test]
    fn single_store_is_centered_at_zoom_ten() {
        let host = base(
            r#"[{ "fields": { "f1": "Store A", "f2": { "latitude": 45.0, "longitude": 9.0 } } }]"#,
        );
        let (mode, r, bus) = run(Some(&host));
        let Mode::Bound(report) = mode else {
            panic!("expected bound mode");
        };
        assert_eq!(report.points, vec![Point::new("Store A", 45.0, 9.0)]);
        assert_eq!(report.fields.location, FieldRef::new("f2", "位置"));
        assert_eq!(r.view(), Some(Viewport::new(LatLng::new(45.0, 9.0), 10.0)));
        let markers = r.markers().unwrap().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].popup, "Store A");
        assert_eq!(
            bus.latest(),
            Some(&Status::Loaded {
                points: 1,
                records: 1
            })
        );
    }

    #[test]
    fn null_location_renders_nothing_and_keeps_view() {
        let host = base(r#"[{ "fields": { "f1": "Store A", "f2": null } }]"#);
        let (mode, r, bus) = run(Some(&host));
        let Mode::Bound(report) = mode else {
            panic!("expected bound mode");
        };
        assert!(report.points.is_empty());
        assert_eq!(report.view_change, ViewChange::Unchanged);
        assert_eq!(r.view(), Some(Viewport::new(LatLng::new(41.9, 12.5), 6.0)));
        assert!(r.markers().unwrap().is_empty());
        assert_eq!(
            bus.latest(),
            Some(&Status::Loaded {
                points: 0,
                records: 1
            })
        );
    }

    #[test]
    fn two_stores_fit_bounds_with_padding() {
        let host = base(
            r#"[
                { "fields": { "f1": "A", "f2": { "latitude": 45.0, "longitude": 9.0 } } },
                { "fields": { "f1": "B", "f2": { "latitude": 41.9, "longitude": 12.5 } } }
            ]"#,
        );
        let (mode, r, _) = run(Some(&host));
        let Mode::Bound(report) = mode else {
            panic!("expected bound mode");
        };
        let bounds = GeoBounds::new([41.9, 9.0], [45.0, 12.5]);
        assert_eq!(
            report.view_change,
            ViewChange::Fitted {
                bounds,
                padding_px: 20.0
            }
        );
        let surface = r.backend().surfaces().next().unwrap();
        assert_eq!(surface.fits, vec![(bounds, 20.0)]);
        assert_eq!(surface.initial_view.center, LatLng::new(45.0, 9.0));
    }

    #[test]
    fn absent_host_runs_standalone() {
        let (mode, r, bus) = run(None);
        assert_eq!(mode, Mode::Standalone(Fallback::NoEnvironment));
        let markers = r.markers().unwrap().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].popup, "no environment, standalone mode");
        assert!(markers[0].open_popup);
        assert_eq!(markers[0].position, LatLng::new(41.9, 12.5));
        assert_eq!(
            bus.latest(),
            Some(&Status::Standalone(NO_ENVIRONMENT_LABEL.to_string()))
        );
    }

    #[test]
    fn rejected_handshake_uses_distinct_label() {
        let host = base("[]").with_handshake_error("bridge timeout");
        let (mode, r, _) = run(Some(&host));
        let Mode::Standalone(fallback) = mode else {
            panic!("expected standalone mode");
        };
        assert!(matches!(fallback, Fallback::HandshakeFailed(_)));
        let label = &r.markers().unwrap().markers()[0].popup;
        assert_eq!(label, INIT_FAILED_LABEL);
        assert_ne!(label, NO_ENVIRONMENT_LABEL);
        assert!(fallback.alert().is_none());
    }

    #[test]
    fn missing_fields_alert_and_fall_back() {
        let host = InMemoryBase::from_json(
            r#"{ "tables": { "t": {
                "fields": [{ "id": "a", "name": "Name" }],
                "views": [{ "id": "v", "name": "Grid" }]
            } } }"#,
        )
        .unwrap();
        let (mode, r, _) = run(Some(&host));
        let Mode::Standalone(fallback) = mode else {
            panic!("expected standalone mode");
        };
        let alert = fallback.alert().unwrap();
        assert!(alert.contains("门店名称"));
        assert!(alert.contains("位置"));
        assert_eq!(r.markers().unwrap().markers()[0].popup, FIELDS_MISSING_LABEL);
    }

    #[test]
    fn record_failure_during_setup_falls_back() {
        let host = base("[]").with_records_error("throttled");
        let (mode, _, _) = run(Some(&host));
        assert_eq!(
            mode,
            Mode::Standalone(Fallback::SetupFailed(CatalogError::Host(
                "throttled".to_string()
            )))
        );
    }

    #[test]
    fn picker_start_without_host_is_standalone() {
        let mut r = renderer();
        let mut bus = StatusBus::new();
        let started = block_on(start_picker::<InMemoryBase, _>(
            None,
            &ViewerConfig::default(),
            &mut r,
            &mut bus,
        ))
        .unwrap();
        assert!(matches!(
            started,
            PickerStart::Standalone(Fallback::NoEnvironment)
        ));
        assert_eq!(r.backend().live_maps(), 1);
    }

    #[test]
    fn fixed_flow_reads_at_most_one_page() {
        use catalog::{BaseSnapshot, RawRecord, TableSnapshot, ViewMeta};
        use serde_json::json;

        let records = (0..600)
            .map(|i| {
                RawRecord::from_fields([
                    ("f1", json!(format!("Store {i}"))),
                    ("f2", json!({ "latitude": 45.0, "longitude": 9.0 })),
                ])
            })
            .collect();
        let table = TableSnapshot {
            name: "Stores".to_string(),
            fields: vec![FieldRef::new("f1", "门店名称"), FieldRef::new("f2", "位置")],
            views: vec![ViewMeta {
                id: "v1".to_string(),
                name: "Grid".to_string(),
            }],
            records,
            ..TableSnapshot::default()
        };
        let host = InMemoryBase::new(BaseSnapshot {
            active_table: None,
            tables: [("tbl".to_string(), table)].into_iter().collect(),
        });

        let (mode, r, _bus) = run(Some(&host));
        let Mode::Bound(report) = mode else {
            panic!("expected bound mode");
        };
        assert_eq!(report.records_read, 500);
        assert_eq!(report.points.len(), 500);
        assert_eq!(r.markers().unwrap().len(), 500);
    }
}
