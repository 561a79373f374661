use std::fs;
use std::path::{Path, PathBuf};

use catalog::InMemoryBase;
use clap::{Args, Parser, Subcommand};
use layers::{FieldRole, Point};
use render::{HeadlessMap, MapRenderer};
use runtime::{
    Fallback, LoadSummary, Mode, PickerSession, PickerStart, ResolveMode, SessionError, StatusBus,
    ViewerConfig,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pinmap", about = "Plot base records as map pins without a browser")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the viewer against a snapshot and print what the map shows.
    Render(RunArgs),
    /// Print the plotted points as a GeoJSON FeatureCollection.
    Geojson(RunArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Base snapshot (JSON).
    snapshot: PathBuf,
    /// Viewer configuration (JSON); defaults apply to missing keys.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    table: Option<String>,
    #[arg(long)]
    view: Option<String>,
    /// Field id for pin labels.
    #[arg(long)]
    name_field: Option<String>,
    /// Field id holding the location.
    #[arg(long)]
    location_field: Option<String>,
    #[arg(long, default_value_t = 1280.0)]
    width: f64,
    #[arg(long, default_value_t = 720.0)]
    height: f64,
}

impl RunArgs {
    /// Any explicit selection switches to the picker flow.
    fn picks(&self) -> bool {
        self.table.is_some()
            || self.view.is_some()
            || self.name_field.is_some()
            || self.location_field.is_some()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let cli = Cli::parse();
    let payload = match &cli.command {
        Command::Render(args) => {
            let outcome = run(args)?;
            serde_json::to_value(RenderReport::from(&outcome)).map_err(|e| format!("json: {e}"))?
        }
        Command::Geojson(args) => feature_collection(&run(args)?)?,
    };
    let text = serde_json::to_string_pretty(&payload).map_err(|e| format!("json: {e}"))?;
    println!("{text}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig, String> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    ViewerConfig::from_json(&raw).map_err(|e| format!("{path:?}: {e}"))
}

struct Outcome {
    renderer: MapRenderer<HeadlessMap>,
    status: StatusBus,
    /// Data points on the map; empty when standalone.
    points: Vec<Point>,
    fallback: Option<Fallback>,
}

fn run(args: &RunArgs) -> Result<Outcome, String> {
    let config = load_config(args.config.as_deref())?;
    let raw = fs::read_to_string(&args.snapshot)
        .map_err(|e| format!("read {:?}: {e}", args.snapshot))?;
    let host = InMemoryBase::from_json(&raw).map_err(|e| format!("{:?}: {e}", args.snapshot))?;
    run_with(&host, config, args)
}

fn run_with(host: &InMemoryBase, mut config: ViewerConfig, args: &RunArgs) -> Result<Outcome, String> {
    if args.picks() {
        config.mode = ResolveMode::Picker;
    }
    let mut renderer = MapRenderer::new(
        HeadlessMap::new([args.width, args.height]),
        config.render_settings(),
    );
    let mut status = StatusBus::new();

    let (points, fallback) = match config.mode {
        ResolveMode::Fixed => {
            let mode = pollster::block_on(runtime::start(
                Some(host),
                &config,
                &mut renderer,
                &mut status,
            ))
            .map_err(|e| e.to_string())?;
            match mode {
                Mode::Bound(report) => {
                    tracing::info!(
                        table_id = %report.table_id,
                        points = report.points.len(),
                        "bound"
                    );
                    (report.points, None)
                }
                Mode::Standalone(fallback) => (Vec::new(), Some(fallback)),
            }
        }
        ResolveMode::Picker => {
            let started = pollster::block_on(runtime::start_picker(
                Some(host),
                &config,
                &mut renderer,
                &mut status,
            ))
            .map_err(|e| e.to_string())?;
            match started {
                PickerStart::Ready(mut session) => {
                    let summary = pollster::block_on(pick_and_load(
                        &mut session,
                        host,
                        args,
                        &mut renderer,
                        &mut status,
                    ))
                    .map_err(|e| e.to_string())?;
                    (summary.points, None)
                }
                PickerStart::Standalone(fallback) => (Vec::new(), Some(fallback)),
            }
        }
    };

    if let Some(message) = fallback.as_ref().and_then(Fallback::alert) {
        eprintln!("{message}");
    }
    Ok(Outcome {
        renderer,
        status,
        points,
        fallback,
    })
}

async fn pick_and_load(
    session: &mut PickerSession,
    host: &InMemoryBase,
    args: &RunArgs,
    renderer: &mut MapRenderer<HeadlessMap>,
    status: &mut StatusBus,
) -> Result<LoadSummary, SessionError> {
    if let Some(table_id) = &args.table {
        session.select_table(host, table_id, status).await?;
    }
    if let Some(view_id) = &args.view {
        session.select_view(view_id)?;
    }
    if let Some(field_id) = &args.name_field {
        session.select_field(FieldRole::Name, field_id)?;
    }
    if let Some(field_id) = &args.location_field {
        session.select_field(FieldRole::Location, field_id)?;
    }
    session.load(host, renderer, status).await
}

#[derive(Debug, Serialize)]
struct MarkerReport {
    name: String,
    lat: f64,
    lng: f64,
    popup_open: bool,
}

#[derive(Debug, Serialize)]
struct RenderReport {
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    center: Option<[f64; 2]>,
    zoom: Option<f64>,
    markers: Vec<MarkerReport>,
    status: Vec<String>,
}

impl From<&Outcome> for RenderReport {
    fn from(outcome: &Outcome) -> Self {
        let view = outcome.renderer.view();
        let markers = outcome
            .renderer
            .markers()
            .map(|layer| {
                layer
                    .markers()
                    .iter()
                    .map(|m| MarkerReport {
                        name: m.popup.clone(),
                        lat: m.position.lat,
                        lng: m.position.lng,
                        popup_open: m.open_popup,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            mode: if outcome.fallback.is_some() {
                "standalone"
            } else {
                "bound"
            },
            label: outcome.fallback.as_ref().map(Fallback::label),
            reason: outcome.fallback.as_ref().map(|f| f.to_string()),
            center: view.map(|v| v.center.to_array()),
            zoom: view.map(|v| v.zoom),
            markers,
            status: outcome
                .status
                .events()
                .iter()
                .map(|e| e.status.to_string())
                .collect(),
        }
    }
}

/// Plotted points as GeoJSON (`[lng, lat]` order). A standalone map has
/// no data points and is reported as an error.
fn feature_collection(outcome: &Outcome) -> Result<Value, String> {
    if let Some(fallback) = &outcome.fallback {
        return Err(format!("{}: {fallback}", fallback.label()));
    }
    let features: Vec<Value> = outcome
        .points
        .iter()
        .map(|p| {
            let mut properties = json!({ "name": p.name });
            if let Some(address) = &p.address {
                properties["address"] = json!(address);
            }
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [p.lng, p.lat] },
                "properties": properties,
            })
        })
        .collect();
    Ok(json!({ "type": "FeatureCollection", "features": features }))
}
