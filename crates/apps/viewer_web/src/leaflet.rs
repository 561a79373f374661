use foundation::{GeoBounds, LatLng, Viewport};
use js_sys::{Array, Object, Reflect};
use layers::{Marker, TileLayerSpec};
use render::{MapBackend, RenderError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    pub type LeafletMap;
    pub type TileLayer;
    pub type LayerGroup;
    pub type LeafletMarker;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    fn l_map(container_id: &str) -> Result<LeafletMap, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &LeafletMap, center: &JsValue, zoom: f64) -> LeafletMap;

    #[wasm_bindgen(method, js_name = fitBounds)]
    fn fit_bounds(this: &LeafletMap, bounds: &JsValue, options: &JsValue) -> LeafletMap;

    #[wasm_bindgen(method, js_name = getCenter)]
    fn get_center(this: &LeafletMap) -> JsValue;

    #[wasm_bindgen(method, js_name = getZoom)]
    fn get_zoom(this: &LeafletMap) -> f64;

    #[wasm_bindgen(method)]
    fn remove(this: &LeafletMap);

    #[wasm_bindgen(catch, js_namespace = L, js_name = tileLayer)]
    fn l_tile_layer(url_template: &str, options: &JsValue) -> Result<TileLayer, JsValue>;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_tiles_to(this: &TileLayer, map: &LeafletMap) -> TileLayer;

    #[wasm_bindgen(js_namespace = L, js_name = layerGroup)]
    fn l_layer_group() -> LayerGroup;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_group_to(this: &LayerGroup, map: &LeafletMap) -> LayerGroup;

    #[wasm_bindgen(method, js_name = clearLayers)]
    fn clear_layers(this: &LayerGroup) -> LayerGroup;

    #[wasm_bindgen(catch, js_namespace = L, js_name = marker)]
    fn l_marker(at: &JsValue) -> Result<LeafletMarker, JsValue>;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_marker_to(this: &LeafletMarker, group: &LayerGroup) -> LeafletMarker;

    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &LeafletMarker, content: &str) -> LeafletMarker;

    #[wasm_bindgen(method, js_name = openPopup)]
    fn open_popup(this: &LeafletMarker) -> LeafletMarker;
}

/// [`MapBackend`] over the page's global Leaflet (`L`).
#[derive(Debug, Default)]
pub struct LeafletBackend;

impl MapBackend for LeafletBackend {
    type Map = LeafletMap;
    type Markers = LayerGroup;

    fn create_map(&mut self, container_id: &str, view: Viewport) -> Result<LeafletMap, RenderError> {
        let map = l_map(container_id).map_err(|e| RenderError::Container(js_message(&e)))?;
        map.set_view(&lat_lng(view.center), view.zoom);
        Ok(map)
    }

    fn add_tile_layer(&mut self, map: &LeafletMap, tiles: &TileLayerSpec) -> Result<(), RenderError> {
        let options = tile_options(tiles).map_err(|e| RenderError::Backend(js_message(&e)))?;
        let layer = l_tile_layer(&tiles.url_template, &options)
            .map_err(|e| RenderError::Backend(js_message(&e)))?;
        layer.add_tiles_to(map);
        Ok(())
    }

    fn create_marker_group(&mut self, map: &LeafletMap) -> Result<LayerGroup, RenderError> {
        let group = l_layer_group();
        group.add_group_to(map);
        Ok(group)
    }

    fn clear_markers(&mut self, group: &LayerGroup) {
        group.clear_layers();
    }

    fn add_marker(&mut self, group: &LayerGroup, marker: &Marker) -> Result<(), RenderError> {
        let m = l_marker(&lat_lng(marker.position))
            .map_err(|e| RenderError::Backend(js_message(&e)))?;
        m.add_marker_to(group);
        m.bind_popup(&escape_html(&marker.popup));
        if marker.open_popup {
            m.open_popup();
        }
        Ok(())
    }

    fn set_view(&mut self, map: &LeafletMap, view: Viewport) {
        map.set_view(&lat_lng(view.center), view.zoom);
    }

    fn fit_bounds(&mut self, map: &LeafletMap, bounds: GeoBounds, padding_px: f64) {
        let corners = Array::of2(&lat_lng(bounds.south_west()), &lat_lng(bounds.north_east()));
        let options = Object::new();
        let padding = Array::of2(&padding_px.into(), &padding_px.into());
        if Reflect::set(&options, &"padding".into(), &padding).is_err() {
            tracing::warn!("could not set fitBounds padding");
        }
        map.fit_bounds(&corners, &options);
    }

    fn view(&self, map: &LeafletMap) -> Viewport {
        let center = map.get_center();
        let coord = |key: &str| {
            Reflect::get(&center, &JsValue::from_str(key))
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0)
        };
        Viewport::new(LatLng::new(coord("lat"), coord("lng")), map.get_zoom())
    }

    fn remove_map(&mut self, map: LeafletMap) {
        map.remove();
    }
}

fn lat_lng(p: LatLng) -> JsValue {
    Array::of2(&p.lat.into(), &p.lng.into()).into()
}

fn tile_options(tiles: &TileLayerSpec) -> Result<JsValue, JsValue> {
    let options = Object::new();
    Reflect::set(&options, &"maxZoom".into(), &tiles.max_zoom.into())?;
    Reflect::set(&options, &"attribution".into(), &tiles.attribution.as_str().into())?;
    if !tiles.subdomains.is_empty() {
        let subdomains: Array = tiles
            .subdomains
            .iter()
            .map(|s| JsValue::from_str(s))
            .collect();
        Reflect::set(&options, &"subdomains".into(), &subdomains)?;
    }
    Ok(options.into())
}

/// Popups take HTML; record text is shown verbatim.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn popup_text_is_escaped() {
        assert_eq!(escape_html("A & B <b>"), "A &amp; B &lt;b&gt;");
        assert_eq!(escape_html("门店"), "门店");
    }
}
