use js_sys::{Array, Function, JSON, Object, Promise, Reflect};
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::{CatalogError, FieldRef, HostBase, LocalBoxFuture, RecordPage, TableMeta, ViewMeta};

/// Global the Lark Base SDK registers itself under.
const SDK_GLOBAL: &str = "@lark-base-open/js-sdk";

/// [`HostBase`] backed by `window['@lark-base-open/js-sdk'].bitable.base`.
#[derive(Debug, Clone)]
pub struct BitableHost {
    base: JsValue,
}

/// Probes the global scope for the Lark Base SDK.
pub fn detect_host() -> Option<BitableHost> {
    let window = web_sys::window()?;
    let sdk = property(window.as_ref(), SDK_GLOBAL)?;
    let bitable = property(&sdk, "bitable")?;
    let base = property(&bitable, "base")?;
    Some(BitableHost { base })
}

impl BitableHost {
    async fn table(&self, table_id: &str) -> Result<JsValue, CatalogError> {
        let table = call(&self.base, "getTableById", &[JsValue::from_str(table_id)]).await?;
        if table.is_null() || table.is_undefined() {
            return Err(CatalogError::NotFound(format!("table {table_id}")));
        }
        Ok(table)
    }

    async fn view(&self, table_id: &str, view_id: &str) -> Result<JsValue, CatalogError> {
        let table = self.table(table_id).await?;
        let view = call(&table, "getViewById", &[JsValue::from_str(view_id)]).await?;
        if view.is_null() || view.is_undefined() {
            return Err(CatalogError::NotFound(format!("view {view_id}")));
        }
        Ok(view)
    }
}

impl HostBase for BitableHost {
    fn ready(&self) -> LocalBoxFuture<'_, Result<(), CatalogError>> {
        Box::pin(async move {
            call(&self.base, "ready", &[])
                .await
                .map(|_| ())
                .map_err(|e| CatalogError::Handshake(e.to_string()))
        })
    }

    fn active_table_id(&self) -> LocalBoxFuture<'_, Result<String, CatalogError>> {
        Box::pin(async move {
            let table = call(&self.base, "getActiveTable", &[]).await?;
            string_property(&table, "id")
        })
    }

    fn table_meta_list(&self) -> LocalBoxFuture<'_, Result<Vec<TableMeta>, CatalogError>> {
        Box::pin(async move { decode(&call(&self.base, "getTableMetaList", &[]).await?) })
    }

    fn field_list<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<FieldRef>, CatalogError>> {
        Box::pin(async move {
            let table = self.table(table_id).await?;
            let method = first_method(&table, &["getFieldMetaList", "getFieldList"])?;
            decode(&call(&table, method, &[]).await?)
        })
    }

    fn view_list<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<ViewMeta>, CatalogError>> {
        Box::pin(async move {
            let table = self.table(table_id).await?;
            let method = first_method(&table, &["getViewMetaList", "getViewList"])?;
            decode(&call(&table, method, &[]).await?)
        })
    }

    fn active_view_id<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, CatalogError>> {
        Box::pin(async move {
            let table = self.table(table_id).await?;
            let view = call(&table, "getActiveView", &[]).await?;
            string_property(&view, "id")
        })
    }

    fn records<'a>(
        &'a self,
        table_id: &'a str,
        view_id: &'a str,
        page_size: usize,
    ) -> LocalBoxFuture<'a, Result<RecordPage, CatalogError>> {
        Box::pin(async move {
            let view = self.view(table_id, view_id).await?;
            let options = Object::new();
            Reflect::set(
                &options,
                &JsValue::from_str("pageSize"),
                &JsValue::from_f64(page_size as f64),
            )
            .map_err(|e| CatalogError::Host(js_message(&e)))?;
            let page = call(&view, "getRecords", &[options.into()]).await?;
            decode(&page)
        })
    }
}

fn property(obj: &JsValue, key: &str) -> Option<JsValue> {
    if obj.is_null() || obj.is_undefined() {
        return None;
    }
    let v = Reflect::get(obj, &JsValue::from_str(key)).ok()?;
    if v.is_null() || v.is_undefined() {
        None
    } else {
        Some(v)
    }
}

fn string_property(obj: &JsValue, key: &str) -> Result<String, CatalogError> {
    property(obj, key)
        .and_then(|v| v.as_string())
        .ok_or_else(|| CatalogError::Corrupt(format!("missing string property `{key}`")))
}

fn first_method<'m>(obj: &JsValue, names: &[&'m str]) -> Result<&'m str, CatalogError> {
    names
        .iter()
        .copied()
        .find(|name| property(obj, name).is_some_and(|v| v.is_function()))
        .ok_or_else(|| CatalogError::Host(format!("none of {names:?} is available")))
}

/// Calls `obj[method](...args)`, awaiting the result when it is a promise.
async fn call(obj: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, CatalogError> {
    let func = property(obj, method)
        .and_then(|v| v.dyn_into::<Function>().ok())
        .ok_or_else(|| CatalogError::Host(format!("`{method}` is not a function")))?;
    let args: Array = args.iter().collect();
    let out = func
        .apply(obj, &args)
        .map_err(|e| CatalogError::Host(format!("{method}: {}", js_message(&e))))?;
    match out.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise)
            .await
            .map_err(|e| CatalogError::Host(format!("{method}: {}", js_message(&e)))),
        Err(value) => Ok(value),
    }
}

/// Host objects cross into Rust as JSON text.
fn decode<T: DeserializeOwned>(value: &JsValue) -> Result<T, CatalogError> {
    let text = JSON::stringify(value).map_err(|e| CatalogError::Corrupt(js_message(&e)))?;
    let text = String::from(text);
    serde_json::from_str(&text).map_err(|e| CatalogError::Corrupt(e.to_string()))
}

fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}
