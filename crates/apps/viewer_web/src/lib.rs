use console_error_panic_hook::set_once;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use catalog::{BitableHost, detect_host};
use layers::FieldRole;
use render::MapRenderer;
use runtime::{Mode, PickerSession, PickerStart, ResolveMode, Status, StatusBus, ViewerConfig};

mod dom;
mod leaflet;
mod logging;
mod slot;

use leaflet::{LeafletBackend, js_message};
use slot::BusySlot;

/// Global the page may set before the module loads.
const CONFIG_GLOBAL: &str = "PINMAP_CONFIG";

struct App {
    host: Option<BitableHost>,
    renderer: MapRenderer<LeafletBackend>,
    status: StatusBus,
    /// Present only in picker mode once the host answered.
    session: Option<PickerSession>,
}

thread_local! {
    // Empty while booting and while an awaited operation holds the app.
    static APP: RefCell<BusySlot<App>> = const { RefCell::new(BusySlot::new()) };
}

fn take_app() -> Option<App> {
    let app = APP.with(|slot| slot.borrow_mut().take());
    if app.is_none() {
        tracing::warn!("ignoring request, previous one still running");
        dom::show_status(&Status::Busy);
    }
    app
}

/// Returns the app to the slot. Selects changed while it was away are
/// redrawn from the session, which never saw those changes.
fn put_app(mut app: App) {
    // Only the sink is read on the page.
    app.status.drain();
    let dropped = APP.with(|slot| slot.borrow().dropped());
    if dropped > 0 {
        tracing::debug!(dropped, "redrawing pickers after busy window");
        if let Some(session) = &app.session {
            if let Err(err) = dom::fill_session(session) {
                tracing::error!(error = %js_message(&err), "could not refresh pickers");
            }
        }
    }
    APP.with(|slot| slot.borrow_mut().put(app));
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    logging::init();
    spawn_local(boot());
    Ok(())
}

fn read_config() -> ViewerConfig {
    let Some(window) = web_sys::window() else {
        return ViewerConfig::default();
    };
    let raw = match js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL)) {
        Ok(v) if !v.is_undefined() && !v.is_null() => v,
        _ => return ViewerConfig::default(),
    };
    let text = match js_sys::JSON::stringify(&raw) {
        Ok(text) => String::from(text),
        Err(err) => {
            tracing::warn!(error = %js_message(&err), "unreadable {CONFIG_GLOBAL}, using defaults");
            return ViewerConfig::default();
        }
    };
    ViewerConfig::from_json(&text).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "invalid {CONFIG_GLOBAL}, using defaults");
        ViewerConfig::default()
    })
}

async fn boot() {
    let config = read_config();
    let host = detect_host();
    let mut renderer = MapRenderer::new(LeafletBackend, config.render_settings());
    let mut status = StatusBus::with_sink(dom::show_status);

    let session = match config.mode {
        ResolveMode::Fixed => {
            let mode = runtime::start(host.as_ref(), &config, &mut renderer, &mut status).await;
            match mode {
                Ok(Mode::Bound(report)) => {
                    tracing::info!(
                        table_id = %report.table_id,
                        view_id = %report.view_id,
                        points = report.points.len(),
                        "bound mode ready"
                    );
                }
                Ok(Mode::Standalone(fallback)) => {
                    if let Some(message) = fallback.alert() {
                        dom::alert(&message);
                    }
                }
                Err(err) => status.emit(Status::Failed(err.to_string())),
            }
            None
        }
        ResolveMode::Picker => {
            match runtime::start_picker(host.as_ref(), &config, &mut renderer, &mut status).await {
                Ok(PickerStart::Ready(session)) => {
                    if let Err(err) = dom::fill_session(&session).and_then(|_| bind_controls()) {
                        tracing::error!(error = %js_message(&err), "picker controls unavailable");
                    }
                    Some(session)
                }
                Ok(PickerStart::Standalone(_)) => None,
                Err(err) => {
                    status.emit(Status::Failed(err.to_string()));
                    None
                }
            }
        }
    };

    put_app(App {
        host,
        renderer,
        status,
        session,
    });
}

fn bind_controls() -> Result<(), JsValue> {
    dom::on_change(dom::TABLE_SELECT_ID, |table_id| spawn_local(change_table(table_id)))?;
    dom::on_change(dom::VIEW_SELECT_ID, |view_id| {
        with_session(|session| session.select_view(&view_id))
    })?;
    dom::on_change(dom::NAME_FIELD_SELECT_ID, |field_id| {
        with_session(|session| session.select_field(FieldRole::Name, &field_id))
    })?;
    dom::on_change(dom::LOCATION_FIELD_SELECT_ID, |field_id| {
        with_session(|session| session.select_field(FieldRole::Location, &field_id))
    })?;
    dom::on_click(dom::LOAD_BUTTON_ID, || spawn_local(load()))?;
    Ok(())
}

fn with_session<F>(f: F)
where
    F: FnOnce(&mut PickerSession) -> Result<(), runtime::SessionError>,
{
    let Some(mut app) = take_app() else { return };
    if let Some(session) = app.session.as_mut() {
        if let Err(err) = f(session) {
            app.status.emit(Status::Failed(err.to_string()));
        }
    }
    put_app(app);
}

async fn change_table(table_id: String) {
    let Some(mut app) = take_app() else { return };
    if let (Some(session), Some(host)) = (app.session.as_mut(), app.host.as_ref()) {
        // Errors are already on the status bus; the lists show what survived.
        match session.select_table(host, &table_id, &mut app.status).await {
            Ok(()) => tracing::debug!(table_id = %table_id, "table switched"),
            Err(err) => tracing::debug!(error = %err, "table switch rejected"),
        }
        if let Err(err) = dom::fill_session(session) {
            tracing::error!(error = %js_message(&err), "could not refresh pickers");
        }
    }
    put_app(app);
}

/// Reads the selected view and renders its points. Also bound to the load
/// button.
#[wasm_bindgen]
pub async fn load() {
    let Some(mut app) = take_app() else { return };
    if let (Some(session), Some(host)) = (app.session.as_ref(), app.host.as_ref()) {
        match session.load(host, &mut app.renderer, &mut app.status).await {
            Ok(summary) => tracing::debug!(
                records = summary.records_read,
                points = summary.points.len(),
                "load finished"
            ),
            Err(err) => tracing::debug!(error = %err, "load rejected"),
        }
    } else {
        tracing::warn!("load ignored, no picker session");
    }
    put_app(app);
}
