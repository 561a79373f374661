use catalog::{CatalogError, HostBase, TableMeta, ViewMeta};
use layers::{FieldPicker, FieldRole, Point, RecordProjector, ResolveError, SelectOption};
use render::{MapBackend, MapRenderer, RenderError, ViewChange};

use crate::config::ViewerConfig;
use crate::detector::Fallback;
use crate::event_bus::StatusBus;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Catalog(CatalogError),
    Resolve(ResolveError),
    Render(RenderError),
    UnknownOption { kind: &'static str, id: String },
    NoSelection(&'static str),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Catalog(err) => write!(f, "{err}"),
            SessionError::Resolve(err) => write!(f, "{err}"),
            SessionError::Render(err) => write!(f, "{err}"),
            SessionError::UnknownOption { kind, id } => write!(f, "unknown {kind} {id}"),
            SessionError::NoSelection(kind) => write!(f, "no {kind} selected"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<CatalogError> for SessionError {
    fn from(err: CatalogError) -> Self {
        SessionError::Catalog(err)
    }
}

impl From<ResolveError> for SessionError {
    fn from(err: ResolveError) -> Self {
        SessionError::Resolve(err)
    }
}

impl From<RenderError> for SessionError {
    fn from(err: RenderError) -> Self {
        SessionError::Render(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub records_read: usize,
    pub points: Vec<Point>,
    pub view_change: ViewChange,
}

/// Interactive table / view / field selection.
///
/// Changing the table drops every dependent selection before the new
/// table's views and fields are fetched. A failed load leaves the map as it
/// was.
#[derive(Debug, Clone)]
pub struct PickerSession {
    tables: Vec<TableMeta>,
    views: Vec<ViewMeta>,
    picker: FieldPicker,
    table_id: Option<String>,
    view_id: Option<String>,
    name_label: String,
    location_hints: Vec<String>,
    unnamed_label: String,
    page_size: usize,
}

impl PickerSession {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            tables: Vec::new(),
            views: Vec::new(),
            picker: FieldPicker::default(),
            table_id: None,
            view_id: None,
            name_label: config.name_field.clone(),
            location_hints: config.location_hints.clone(),
            unnamed_label: config.unnamed_label.clone(),
            page_size: config.picker_page_size,
        }
    }

    /// Handshake, list tables, and select the host's active table.
    pub async fn open<H>(
        host: &H,
        config: &ViewerConfig,
        status: &mut StatusBus,
    ) -> Result<Self, Fallback>
    where
        H: HostBase + ?Sized,
    {
        status.emit(Status::WaitingForHost);
        host.ready().await.map_err(Fallback::HandshakeFailed)?;

        status.emit(Status::LoadingTables);
        let mut session = Self::new(config);
        session.tables = host.table_meta_list().await?;

        let active = match host.active_table_id().await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "no active table, using the first one");
                session.tables.first().map(|t| t.id.clone())
            }
        };
        if let Some(table_id) = active {
            session
                .select_table(host, &table_id, status)
                .await
                .map_err(|err| match err {
                    SessionError::Catalog(err) => Fallback::SetupFailed(err),
                    _ => Fallback::SetupFailed(CatalogError::NotFound(format!("table {table_id}"))),
                })?;
        }
        Ok(session)
    }

    pub fn table_options(&self) -> Vec<SelectOption> {
        self.tables.iter().map(SelectOption::from).collect()
    }

    pub fn view_options(&self) -> Vec<SelectOption> {
        self.views.iter().map(SelectOption::from).collect()
    }

    /// Same list backs both the name and the location dropdown.
    pub fn field_options(&self) -> Vec<SelectOption> {
        self.picker.options()
    }

    pub fn table_id(&self) -> Option<&str> {
        self.table_id.as_deref()
    }

    pub fn view_id(&self) -> Option<&str> {
        self.view_id.as_deref()
    }

    pub fn name_field_id(&self) -> Option<&str> {
        self.picker.name().map(|f| f.id.as_str())
    }

    pub fn location_field_id(&self) -> Option<&str> {
        self.picker.location().map(|f| f.id.as_str())
    }

    /// Switches table: clears view and field selections, then fetches the
    /// table's views and fields.
    pub async fn select_table<H>(
        &mut self,
        host: &H,
        table_id: &str,
        status: &mut StatusBus,
    ) -> Result<(), SessionError>
    where
        H: HostBase + ?Sized,
    {
        self.table_id = None;
        self.view_id = None;
        self.views.clear();
        self.picker = FieldPicker::default();

        let result = self.load_table(host, table_id, status).await;
        if let Err(err) = &result {
            tracing::error!(table_id, error = %err, "table selection failed");
            status.emit(Status::Failed(err.to_string()));
        }
        result
    }

    async fn load_table<H>(
        &mut self,
        host: &H,
        table_id: &str,
        status: &mut StatusBus,
    ) -> Result<(), SessionError>
    where
        H: HostBase + ?Sized,
    {
        let table = self
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .ok_or_else(|| SessionError::UnknownOption {
                kind: "table",
                id: table_id.to_string(),
            })?;
        status.emit(Status::LoadingTable {
            table: table.name.clone(),
        });

        let views = host.view_list(table_id).await?;
        let fields = host.field_list(table_id).await?;
        let active_view = host.active_view_id(table_id).await.ok();

        self.view_id = active_view
            .filter(|id| views.iter().any(|v| &v.id == id))
            .or_else(|| views.first().map(|v| v.id.clone()));
        self.views = views;
        self.picker = FieldPicker::new(fields, &self.name_label, &self.location_hints);
        self.table_id = Some(table_id.to_string());

        status.emit(Status::Ready);
        Ok(())
    }

    pub fn select_view(&mut self, view_id: &str) -> Result<(), SessionError> {
        if !self.views.iter().any(|v| v.id == view_id) {
            return Err(SessionError::UnknownOption {
                kind: "view",
                id: view_id.to_string(),
            });
        }
        self.view_id = Some(view_id.to_string());
        Ok(())
    }

    pub fn select_field(&mut self, role: FieldRole, field_id: &str) -> Result<(), SessionError> {
        self.picker.select(role, field_id)?;
        Ok(())
    }

    /// Reads one capped page from the selected view and renders its points.
    pub async fn load<H, B>(
        &self,
        host: &H,
        renderer: &mut MapRenderer<B>,
        status: &mut StatusBus,
    ) -> Result<LoadSummary, SessionError>
    where
        H: HostBase + ?Sized,
        B: MapBackend,
    {
        let result = self.load_inner(host, renderer, status).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "load failed");
            status.emit(Status::Failed(err.to_string()));
        }
        result
    }

    async fn load_inner<H, B>(
        &self,
        host: &H,
        renderer: &mut MapRenderer<B>,
        status: &mut StatusBus,
    ) -> Result<LoadSummary, SessionError>
    where
        H: HostBase + ?Sized,
        B: MapBackend,
    {
        let table_id = self.table_id.as_deref().ok_or(SessionError::NoSelection("table"))?;
        let view_id = self.view_id.as_deref().ok_or(SessionError::NoSelection("view"))?;
        let fields = self.picker.resolve()?;

        status.emit(Status::ReadingRecords);
        let page = host.records(table_id, view_id, self.page_size).await?;
        let projection = RecordProjector::new(&fields, &self.unnamed_label).project(&page.records);
        let view_change = renderer.render_points(&projection.points)?;

        status.emit(Status::Loaded {
            points: projection.points.len(),
            records: page.records.len(),
        });
        Ok(LoadSummary {
            records_read: page.records.len(),
            points: projection.points,
            view_change,
        })
    }
}
