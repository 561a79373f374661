use catalog::RawRecord;
use foundation::LatLng;
use serde::Serialize;
use serde_json::Value;

use crate::fields::ResolvedFields;

/// Popup text for records whose name cell is absent or empty.
pub const UNNAMED_LABEL: &str = "未命名";

/// A record that made it onto the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Point {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
            address: None,
        }
    }

    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Location cell with numeric coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationValue {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

impl LocationValue {
    /// Accepts only an object whose `latitude` and `longitude` are both JSON
    /// numbers. Strings, nulls and partial objects are treated as absent.
    /// Coordinates are not range checked.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let latitude = obj.get("latitude").and_then(number)?;
        let longitude = obj.get("longitude").and_then(number)?;
        let address = ["full_address", "fullAddress", "address"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(Self {
            latitude,
            longitude,
            address,
        })
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Display text of a cell.
///
/// Plain strings and non-zero numbers are used as-is; rich-text segment
/// arrays (`[{"type": "text", "text": "..."}]`) are concatenated. Anything
/// else, including empty text and `0`, yields `None`.
pub fn cell_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.as_f64() == Some(0.0) => return None,
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().filter_map(segment_text).collect(),
        obj @ Value::Object(_) => segment_text(obj)?.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

fn segment_text(v: &Value) -> Option<&str> {
    match v {
        Value::String(s) => Some(s),
        Value::Object(obj) => obj.get("text").and_then(Value::as_str),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Projection {
    pub points: Vec<Point>,
    /// Records dropped for lacking a usable location.
    pub skipped: usize,
}

/// Turns raw records into map points using the resolved name and location
/// fields.
#[derive(Debug, Clone)]
pub struct RecordProjector<'a> {
    name_field: &'a str,
    location_field: &'a str,
    unnamed_label: &'a str,
}

impl<'a> RecordProjector<'a> {
    pub fn new(fields: &'a ResolvedFields, unnamed_label: &'a str) -> Self {
        Self {
            name_field: &fields.name.id,
            location_field: &fields.location.id,
            unnamed_label,
        }
    }

    pub fn point(&self, record: &RawRecord) -> Option<Point> {
        let loc = LocationValue::from_value(record.get(self.location_field)?)?;
        let name = cell_text(record.get(self.name_field))
            .unwrap_or_else(|| self.unnamed_label.to_string());
        Some(Point::new(name, loc.latitude, loc.longitude).with_address(loc.address))
    }

    /// Output keeps input order.
    pub fn project(&self, records: &[RawRecord]) -> Projection {
        let points: Vec<Point> = records.iter().filter_map(|r| self.point(r)).collect();
        let skipped = records.len() - points.len();
        if skipped > 0 {
            tracing::debug!(
                skipped,
                kept = points.len(),
                "records without numeric coordinates dropped"
            );
        }
        Projection { points, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::FieldRef;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields() -> ResolvedFields {
        ResolvedFields {
            name: FieldRef::new("f1", "门店名称"),
            location: FieldRef::new("f2", "位置"),
        }
    }

    fn record(name: Value, loc: Value) -> RawRecord {
        RawRecord::from_fields([("f1", name), ("f2", loc)])
    }

    #[test]
    fn projects_single_store() {
        let f = fields();
        let projector = RecordProjector::new(&f, UNNAMED_LABEL);
        let out = projector.project(&[record(
            json!("Store A"),
            json!({ "latitude": 45.0, "longitude": 9.0 }),
        )]);
        assert_eq!(out.points, vec![Point::new("Store A", 45.0, 9.0)]);
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn null_location_yields_nothing() {
        let f = fields();
        let projector = RecordProjector::new(&f, UNNAMED_LABEL);
        let out = projector.project(&[record(json!("Store A"), Value::Null)]);
        assert!(out.points.is_empty());
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn only_numeric_coordinates_survive_in_input_order() {
        let f = fields();
        let projector = RecordProjector::new(&f, UNNAMED_LABEL);
        let records = vec![
            record(json!("a"), json!({ "latitude": 1.0, "longitude": 2.0 })),
            record(json!("b"), json!({ "latitude": "1.0", "longitude": 2.0 })),
            record(json!("c"), json!({ "latitude": 3.0 })),
            RawRecord::from_fields([("f1", json!("d"))]),
            record(json!("e"), json!([1.0, 2.0])),
            record(json!("f"), json!({ "latitude": 5, "longitude": -7 })),
        ];
        let out = projector.project(&records);
        let names: Vec<&str> = out.points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "f"]);
        assert_eq!(out.points[1].lat, 5.0);
        assert_eq!(out.points[1].lng, -7.0);
        assert_eq!(out.skipped, 4);
        assert!(out.points.len() <= records.len());
    }

    #[test]
    fn out_of_range_coordinates_pass_through() {
        let f = fields();
        let projector = RecordProjector::new(&f, UNNAMED_LABEL);
        let out = projector.project(&[record(
            json!("far"),
            json!({ "latitude": 123.0, "longitude": 500.0 }),
        )]);
        assert_eq!(out.points, vec![Point::new("far", 123.0, 500.0)]);
    }

    #[test]
    fn missing_or_empty_name_uses_placeholder() {
        let f = fields();
        let projector = RecordProjector::new(&f, "unnamed");
        let loc = json!({ "latitude": 1.0, "longitude": 1.0 });
        let out = projector.project(&[
            record(json!(""), loc.clone()),
            record(Value::Null, loc.clone()),
            RawRecord::from_fields([("f2", loc.clone())]),
            record(json!(true), loc.clone()),
            record(json!(0), loc.clone()),
            record(json!(0.0), loc),
        ]);
        assert!(out.points.iter().all(|p| p.name == "unnamed"));
        assert_eq!(out.points.len(), 6);
    }

    #[test]
    fn rich_text_segments_are_joined() {
        let v = json!([
            { "type": "text", "text": "Store " },
            { "type": "text", "text": "B" }
        ]);
        assert_eq!(cell_text(Some(&v)).as_deref(), Some("Store B"));
        assert_eq!(cell_text(Some(&json!(42))).as_deref(), Some("42"));
        assert_eq!(cell_text(Some(&json!(-1.5))).as_deref(), Some("-1.5"));
        assert_eq!(cell_text(Some(&json!(0))), None);
        assert_eq!(cell_text(Some(&json!([]))), None);
        assert_eq!(cell_text(None), None);
    }

    #[test]
    fn location_keeps_address_when_present() {
        let v = json!({
            "latitude": 45.46,
            "longitude": 9.19,
            "full_address": "Piazza del Duomo, Milano"
        });
        let loc = LocationValue::from_value(&v).unwrap();
        assert_eq!(loc.address.as_deref(), Some("Piazza del Duomo, Milano"));
        assert_eq!(loc.latitude, 45.46);
    }

    #[test]
    fn address_travels_with_the_point() {
        let f = fields();
        let projector = RecordProjector::new(&f, UNNAMED_LABEL);
        let out = projector.project(&[
            record(
                json!("Duomo"),
                json!({ "latitude": 45.46, "longitude": 9.19, "address": "Piazza del Duomo" }),
            ),
            record(json!("Bare"), json!({ "latitude": 1.0, "longitude": 2.0 })),
        ]);
        assert_eq!(out.points[0].address.as_deref(), Some("Piazza del Duomo"));
        assert_eq!(
            serde_json::to_value(&out.points[1]).unwrap(),
            json!({ "name": "Bare", "lat": 1.0, "lng": 2.0 })
        );
    }
}
