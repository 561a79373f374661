use catalog::{FieldRef, TableMeta, ViewMeta};
use serde::Serialize;

/// `{value, label}` pair for a picker dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl From<&FieldRef> for SelectOption {
    fn from(f: &FieldRef) -> Self {
        Self {
            value: f.id.clone(),
            label: f.name.clone(),
        }
    }
}

impl From<&TableMeta> for SelectOption {
    fn from(t: &TableMeta) -> Self {
        Self {
            value: t.id.clone(),
            label: t.name.clone(),
        }
    }
}

impl From<&ViewMeta> for SelectOption {
    fn from(v: &ViewMeta) -> Self {
        Self {
            value: v.id.clone(),
            label: v.name.clone(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldRole {
    Name,
    Location,
}

impl std::fmt::Display for FieldRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRole::Name => write!(f, "name"),
            FieldRole::Location => write!(f, "location"),
        }
    }
}

/// The two columns a render needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub name: FieldRef,
    pub location: FieldRef,
}

/// Fixed-name lookup failed. Carries what was searched for and what the
/// table actually has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFields {
    pub name_label: String,
    pub location_label: String,
    pub name_found: bool,
    pub location_found: bool,
    pub available: Vec<FieldRef>,
}

impl MissingFields {
    pub fn available_names(&self) -> Vec<&str> {
        self.available.iter().map(|f| f.name.as_str()).collect()
    }
}

impl std::fmt::Display for MissingFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "the table needs a \"{}\" field and a \"{}\" location field",
            self.name_label, self.location_label
        )?;
        let mut missing = Vec::new();
        if !self.name_found {
            missing.push(self.name_label.as_str());
        }
        if !self.location_found {
            missing.push(self.location_label.as_str());
        }
        write!(f, " (missing: {})", missing.join(", "))
    }
}

impl std::error::Error for MissingFields {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnknownField(String),
    NoSelection(FieldRole),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::UnknownField(id) => write!(f, "unknown field id {id}"),
            ResolveError::NoSelection(role) => write!(f, "no {role} field selected"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Fixed-name variant: first field named exactly `name_label` and first
/// field named exactly `location_label`.
pub fn resolve_by_name(
    fields: &[FieldRef],
    name_label: &str,
    location_label: &str,
) -> Result<ResolvedFields, MissingFields> {
    let name = fields.iter().find(|f| f.name == name_label);
    let location = fields.iter().find(|f| f.name == location_label);
    match (name, location) {
        (Some(name), Some(location)) => Ok(ResolvedFields {
            name: name.clone(),
            location: location.clone(),
        }),
        (name, location) => Err(MissingFields {
            name_label: name_label.to_string(),
            location_label: location_label.to_string(),
            name_found: name.is_some(),
            location_found: location.is_some(),
            available: fields.to_vec(),
        }),
    }
}

/// ASCII hints match case-insensitively, others by plain substring.
pub fn matches_hint(field_name: &str, hint: &str) -> bool {
    if hint.is_empty() {
        return false;
    }
    if hint.is_ascii() {
        field_name
            .to_ascii_lowercase()
            .contains(&hint.to_ascii_lowercase())
    } else {
        field_name.contains(hint)
    }
}

/// First field matching any hint, else the first field.
pub fn default_location_field<'f, S: AsRef<str>>(
    fields: &'f [FieldRef],
    hints: &[S],
) -> Option<&'f FieldRef> {
    fields
        .iter()
        .find(|f| hints.iter().any(|h| matches_hint(&f.name, h.as_ref())))
        .or_else(|| fields.first())
}

/// Interactive variant: user-driven name/location selection over one
/// table's field list.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldPicker {
    fields: Vec<FieldRef>,
    name: Option<usize>,
    location: Option<usize>,
}

impl FieldPicker {
    /// Name defaults to the field called `name_label` (else the first
    /// field), location to the first hinted field (else the first field).
    pub fn new<S: AsRef<str>>(fields: Vec<FieldRef>, name_label: &str, hints: &[S]) -> Self {
        let name = fields
            .iter()
            .position(|f| f.name == name_label)
            .or(if fields.is_empty() { None } else { Some(0) });
        let location = default_location_field(&fields, hints)
            .and_then(|d| fields.iter().position(|f| f.id == d.id));
        Self {
            fields,
            name,
            location,
        }
    }

    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    pub fn options(&self) -> Vec<SelectOption> {
        self.fields.iter().map(SelectOption::from).collect()
    }

    pub fn name(&self) -> Option<&FieldRef> {
        self.name.map(|i| &self.fields[i])
    }

    pub fn location(&self) -> Option<&FieldRef> {
        self.location.map(|i| &self.fields[i])
    }

    pub fn select(&mut self, role: FieldRole, field_id: &str) -> Result<(), ResolveError> {
        let idx = self
            .fields
            .iter()
            .position(|f| f.id == field_id)
            .ok_or_else(|| ResolveError::UnknownField(field_id.to_string()))?;
        match role {
            FieldRole::Name => self.name = Some(idx),
            FieldRole::Location => self.location = Some(idx),
        }
        Ok(())
    }

    pub fn resolve(&self) -> Result<ResolvedFields, ResolveError> {
        let name = self.name().ok_or(ResolveError::NoSelection(FieldRole::Name))?;
        let location = self
            .location()
            .ok_or(ResolveError::NoSelection(FieldRole::Location))?;
        Ok(ResolvedFields {
            name: name.clone(),
            location: location.clone(),
        })
    }
}
