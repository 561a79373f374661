use layers::SelectOption;
use runtime::{PickerSession, Status};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, HtmlOptionElement, HtmlSelectElement};

pub const TABLE_SELECT_ID: &str = "table-select";
pub const VIEW_SELECT_ID: &str = "view-select";
pub const NAME_FIELD_SELECT_ID: &str = "name-field-select";
pub const LOCATION_FIELD_SELECT_ID: &str = "location-field-select";
pub const LOAD_BUTTON_ID: &str = "load-button";
pub const STATUS_ID: &str = "status";

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn select(id: &str) -> Result<HtmlSelectElement, JsValue> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id `{id}`")))?
        .dyn_into::<HtmlSelectElement>()
        .map_err(|_| JsValue::from_str(&format!("`{id}` is not a <select>")))
}

/// Replaces the options of `<select id>` and selects `selected`.
pub fn fill_select(id: &str, options: &[SelectOption], selected: Option<&str>) -> Result<(), JsValue> {
    let el = select(id)?;
    el.set_inner_html("");
    for opt in options {
        let node = HtmlOptionElement::new_with_text_and_value(&opt.label, &opt.value)?;
        el.append_child(&node)?;
    }
    el.set_value(selected.unwrap_or(""));
    Ok(())
}

pub fn fill_session(session: &PickerSession) -> Result<(), JsValue> {
    fill_select(TABLE_SELECT_ID, &session.table_options(), session.table_id())?;
    fill_select(VIEW_SELECT_ID, &session.view_options(), session.view_id())?;
    let fields = session.field_options();
    fill_select(NAME_FIELD_SELECT_ID, &fields, session.name_field_id())?;
    fill_select(LOCATION_FIELD_SELECT_ID, &fields, session.location_field_id())?;
    Ok(())
}

/// Writes `status` into the status element; pages without one are fine.
pub fn show_status(status: &Status) {
    let Ok(doc) = document() else { return };
    if let Some(el) = doc.get_element_by_id(STATUS_ID) {
        el.set_text_content(Some(&status.to_string()));
    }
}

pub fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(err) = window.alert_with_message(message) {
            tracing::warn!(error = ?err, "alert failed");
        }
    }
}

/// Calls `handler` with the new value whenever `<select id>` changes.
pub fn on_change(id: &str, mut handler: impl FnMut(String) + 'static) -> Result<(), JsValue> {
    let el = select(id)?;
    let target = el.clone();
    let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| handler(target.value()));
    el.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())?;
    // Listeners live as long as the page.
    closure.forget();
    Ok(())
}

pub fn on_click(id: &str, mut handler: impl FnMut() + 'static) -> Result<(), JsValue> {
    let el = document()?
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id `{id}`")))?;
    let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| handler());
    el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}
