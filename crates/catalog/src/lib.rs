//! Host data-source model.
//!
//! A "base" is a set of tables; each table has fields, views and records.
//! [`HostBase`] is the read-only surface the map viewer needs from a host,
//! [`InMemoryBase`] serves it from a JSON snapshot and, on wasm32,
//! [`BitableHost`] forwards it to the Lark Base JS SDK.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl FieldRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeta {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Opaque record: cell values keyed by field id.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl RawRecord {
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            record_id: None,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.fields.get(field_id)
    }
}

/// One page of records. There is no continuation: callers never ask for
/// a second page.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No host connector is reachable from this environment.
    HostUnavailable,
    /// The host's `ready()` handshake failed.
    Handshake(String),
    NotFound(String),
    /// A host call threw or rejected.
    Host(String),
    Corrupt(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::HostUnavailable => write!(f, "data-source host unavailable"),
            CatalogError::Handshake(msg) => write!(f, "host handshake failed: {msg}"),
            CatalogError::NotFound(what) => write!(f, "{what} not found"),
            CatalogError::Host(msg) => write!(f, "host call failed: {msg}"),
            CatalogError::Corrupt(msg) => write!(f, "unexpected host data: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Boxed future without a `Send` bound; host calls run on the single UI
/// thread.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Read-only access to a host base.
///
/// Every call is a single awaited round trip; nothing is cached or retried.
pub trait HostBase {
    /// Handshake; must succeed before any other call.
    fn ready(&self) -> LocalBoxFuture<'_, Result<(), CatalogError>>;

    fn active_table_id(&self) -> LocalBoxFuture<'_, Result<String, CatalogError>>;

    fn table_meta_list(&self) -> LocalBoxFuture<'_, Result<Vec<TableMeta>, CatalogError>>;

    fn field_list<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<FieldRef>, CatalogError>>;

    fn view_list<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<ViewMeta>, CatalogError>>;

    fn active_view_id<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, CatalogError>>;

    /// First `page_size` records of a view.
    fn records<'a>(
        &'a self,
        table_id: &'a str,
        view_id: &'a str,
        page_size: usize,
    ) -> LocalBoxFuture<'a, Result<RecordPage, CatalogError>>;
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldRef>,
    #[serde(default)]
    pub views: Vec<ViewMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_view: Option<String>,
    /// Shared by every view of the table.
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_table: Option<String>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableSnapshot>,
}

/// Host served from memory, used by tests and the command-line tools.
#[derive(Debug, Default)]
pub struct InMemoryBase {
    snapshot: BaseSnapshot,
    handshake_error: Option<String>,
    records_error: Option<String>,
}

impl InMemoryBase {
    pub fn new(snapshot: BaseSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let snapshot = serde_json::from_str::<BaseSnapshot>(raw)
            .map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    /// Makes `ready()` reject with `msg`.
    pub fn with_handshake_error(mut self, msg: impl Into<String>) -> Self {
        self.handshake_error = Some(msg.into());
        self
    }

    /// Makes `records()` reject with `msg`.
    pub fn with_records_error(mut self, msg: impl Into<String>) -> Self {
        self.records_error = Some(msg.into());
        self
    }

    fn table(&self, table_id: &str) -> Result<&TableSnapshot, CatalogError> {
        self.snapshot
            .tables
            .get(table_id)
            .ok_or_else(|| CatalogError::NotFound(format!("table {table_id}")))
    }
}

impl HostBase for InMemoryBase {
    fn ready(&self) -> LocalBoxFuture<'_, Result<(), CatalogError>> {
        Box::pin(async move {
            match &self.handshake_error {
                Some(msg) => Err(CatalogError::Handshake(msg.clone())),
                None => Ok(()),
            }
        })
    }

    fn active_table_id(&self) -> LocalBoxFuture<'_, Result<String, CatalogError>> {
        Box::pin(async move {
            if let Some(id) = &self.snapshot.active_table {
                return self.table(id).map(|_| id.clone());
            }
            self.snapshot
                .tables
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| CatalogError::NotFound("active table".to_string()))
        })
    }

    fn table_meta_list(&self) -> LocalBoxFuture<'_, Result<Vec<TableMeta>, CatalogError>> {
        Box::pin(async move {
            Ok(self
                .snapshot
                .tables
                .iter()
                .map(|(id, t)| TableMeta {
                    id: id.clone(),
                    name: t.name.clone(),
                })
                .collect())
        })
    }

    fn field_list<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<FieldRef>, CatalogError>> {
        Box::pin(async move { Ok(self.table(table_id)?.fields.clone()) })
    }

    fn view_list<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<ViewMeta>, CatalogError>> {
        Box::pin(async move { Ok(self.table(table_id)?.views.clone()) })
    }

    fn active_view_id<'a>(
        &'a self,
        table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, CatalogError>> {
        Box::pin(async move {
            let table = self.table(table_id)?;
            if let Some(id) = &table.active_view {
                return Ok(id.clone());
            }
            table
                .views
                .first()
                .map(|v| v.id.clone())
                .ok_or_else(|| CatalogError::NotFound(format!("active view of table {table_id}")))
        })
    }

    fn records<'a>(
        &'a self,
        table_id: &'a str,
        view_id: &'a str,
        page_size: usize,
    ) -> LocalBoxFuture<'a, Result<RecordPage, CatalogError>> {
        Box::pin(async move {
            if let Some(msg) = &self.records_error {
                return Err(CatalogError::Host(msg.clone()));
            }
            let table = self.table(table_id)?;
            if !table.views.iter().any(|v| v.id == view_id) {
                return Err(CatalogError::NotFound(format!("view {view_id}")));
            }
            let records: Vec<RawRecord> = table.records.iter().take(page_size).cloned().collect();
            tracing::debug!(
                table_id,
                view_id,
                page_size,
                returned = records.len(),
                "in-memory records page"
            );
            Ok(RecordPage {
                has_more: table.records.len() > records.len(),
                records,
            })
        })
    }
}

#[cfg(target_arch = "wasm32")]
mod bitable;

#[cfg(target_arch = "wasm32")]
pub use bitable::{BitableHost, detect_host};

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct BitableHost;

/// Probes the global scope for the Lark Base SDK. Never finds one outside
/// a browser.
#[cfg(not(target_arch = "wasm32"))]
pub fn detect_host() -> Option<BitableHost> {
    None
}

#[cfg(not(target_arch = "wasm32"))]
impl HostBase for BitableHost {
    fn ready(&self) -> LocalBoxFuture<'_, Result<(), CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }

    fn active_table_id(&self) -> LocalBoxFuture<'_, Result<String, CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }

    fn table_meta_list(&self) -> LocalBoxFuture<'_, Result<Vec<TableMeta>, CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }

    fn field_list<'a>(
        &'a self,
        _table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<FieldRef>, CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }

    fn view_list<'a>(
        &'a self,
        _table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<ViewMeta>, CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }

    fn active_view_id<'a>(
        &'a self,
        _table_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }

    fn records<'a>(
        &'a self,
        _table_id: &'a str,
        _view_id: &'a str,
        _page_size: usize,
    ) -> LocalBoxFuture<'a, Result<RecordPage, CatalogError>> {
        Box::pin(async { Err(CatalogError::HostUnavailable) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SNAPSHOT: &str = r#"{
        "active_table": "t2",
        "tables": {
            "t1": { "name": "Warehouses", "views": [{ "id": "v1", "name": "Grid" }] },
            "t2": {
                "name": "Stores",
                "fields": [{ "id": "f1", "name": "门店名称" }, { "id": "f2", "name": "位置" }],
                "views": [{ "id": "va", "name": "All" }, { "id": "vb", "name": "Open" }],
                "records": [
                    { "recordId": "r1", "fields": { "f1": "Store A", "f2": { "latitude": 45.0, "longitude": 9.0 } } },
                    { "recordId": "r2", "fields": { "f1": "Store B" } },
                    { "recordId": "r3", "fields": { "f2": null } }
                ]
            }
        }
    }"#;

    #[test]
    fn snapshot_parses_and_lists_tables_in_id_order() {
        let base = InMemoryBase::from_json(SNAPSHOT).unwrap();
        let tables = block_on(base.table_meta_list()).unwrap();
        let ids: Vec<&str> = tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(block_on(base.active_table_id()).unwrap(), "t2");
    }

    #[test]
    fn active_view_defaults_to_first_view() {
        let base = InMemoryBase::from_json(SNAPSHOT).unwrap();
        assert_eq!(block_on(base.active_view_id("t2")).unwrap(), "va");
    }

    #[test]
    fn records_are_capped_at_page_size() {
        let base = InMemoryBase::from_json(SNAPSHOT).unwrap();
        let page = block_on(base.records("t2", "vb", 2)).unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.records[0].record_id.as_deref(), Some("r1"));
        assert_eq!(
            page.records[0].get("f2"),
            Some(&json!({ "latitude": 45.0, "longitude": 9.0 }))
        );
    }

    #[test]
    fn unknown_view_is_not_found() {
        let base = InMemoryBase::from_json(SNAPSHOT).unwrap();
        let err = block_on(base.records("t2", "nope", 10)).unwrap_err();
        assert_eq!(err, CatalogError::NotFound("view nope".to_string()));
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let base = InMemoryBase::from_json(SNAPSHOT)
            .unwrap()
            .with_handshake_error("sdk not ready")
            .with_records_error("quota");
        assert_eq!(
            block_on(base.ready()).unwrap_err(),
            CatalogError::Handshake("sdk not ready".to_string())
        );
        assert_eq!(
            block_on(base.records("t2", "va", 10)).unwrap_err(),
            CatalogError::Host("quota".to_string())
        );
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let err = InMemoryBase::from_json("{\"tables\": 3}").unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt(_)));
    }

    #[test]
    fn no_host_outside_the_browser() {
        assert!(detect_host().is_none());
        assert_eq!(
            block_on(BitableHost.ready()).unwrap_err(),
            CatalogError::HostUnavailable
        );
    }
}
