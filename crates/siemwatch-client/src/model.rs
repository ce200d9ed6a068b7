//! Backend response shapes.
//!
//! Events are decoded leniently: the backend forwards whatever the collecting
//! agents produced, so unknown fields are kept and odd field types degrade to
//! their display defaults instead of failing the whole page.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const UNKNOWN: &str = "unknown";
pub const NOT_AVAILABLE: &str = "N/A";

/// Event severity as reported by the agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    /// Any value outside the known levels, kept verbatim.
    Other(String),
}

impl Severity {
    pub fn parse(value: &str) -> Self {
        match value {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Other(s) => s,
        }
    }

    /// Display color: high red, medium amber, low green, anything else gray.
    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "#dc3545",
            Self::Medium => "#ffc107",
            Self::Low => "#28a745",
            Self::Other(_) => "#6c757d",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(text(&value).map_or_else(|| Severity::Other(UNKNOWN.to_string()), |s| Severity::parse(&s)))
    }
}

/// A single security event.
///
/// The raw JSON object is kept alongside the extracted fields so the detail
/// view can show everything the agent sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub timestamp: Value,
    pub event_type: Option<String>,
    pub severity: Option<Severity>,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub process: Option<String>,
    raw: Value,
}

impl Event {
    pub fn from_value(raw: Value) -> Self {
        let field = |name: &str| raw.get(name).and_then(text);
        Self {
            id: field("_id").unwrap_or_default(),
            timestamp: raw.get("timestamp").cloned().unwrap_or(Value::Null),
            event_type: field("event_type"),
            severity: field("severity").map(|s| Severity::parse(&s)),
            hostname: field("hostname"),
            user: field("user"),
            process: field("process"),
            raw,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Severity used for display; events without one count as low.
    pub fn display_severity(&self) -> Severity {
        self.severity.clone().unwrap_or_default()
    }

    pub fn display_type(&self) -> &str {
        self.event_type.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn display_hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn display_user(&self) -> &str {
        self.user.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn display_process(&self) -> &str {
        self.process.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Pretty-printed raw event for the detail row.
    pub fn details(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

/// Non-empty string or number rendered as text; everything else is absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Aggregate row label. Agents may report a field as null, which the backend
/// groups under its own bucket; such rows are shown as `unknown`.
fn label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text(&value).unwrap_or_else(unknown))
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Event::from_value)
    }
}

/// One page of `/api/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub per_page: u32,
}

fn first_page() -> u32 {
    1
}

impl EventPage {
    /// Page count with the backend's zero (no results) treated as one page.
    pub fn total_pages(&self) -> u32 {
        self.pages.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAgent {
    #[serde(default = "unknown", deserialize_with = "label")]
    pub hostname: String,
    #[serde(default)]
    pub last_activity: Value,
    #[serde(default)]
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentLogin {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "unknown", deserialize_with = "label")]
    pub hostname: String,
    #[serde(default)]
    pub status: String,
    #[serde(default = "unknown", deserialize_with = "label")]
    pub event_type: String,
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl RecentLogin {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    #[serde(default = "unknown", deserialize_with = "label")]
    pub hostname: String,
    #[serde(default)]
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type", default = "unknown", deserialize_with = "label")]
    pub event_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCount {
    #[serde(default = "unknown", deserialize_with = "label")]
    pub user: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCount {
    #[serde(default = "unknown", deserialize_with = "label")]
    pub process: String,
    pub count: u64,
}

/// Event count for one hour, keyed `YYYY-MM-DD HH:00`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineBucket {
    pub hour: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_keeps_unknown_fields_for_details() {
        let event: Event = serde_json::from_value(json!({
            "_id": "e1",
            "timestamp": "2024-03-01T10:00:00Z",
            "event_type": "user_login",
            "severity": "high",
            "hostname": "web01",
            "pid": 4242
        }))
        .unwrap();

        assert_eq!(event.id, "e1");
        assert_eq!(event.severity, Some(Severity::High));
        assert_eq!(event.raw()["pid"], json!(4242));
        assert!(event.details().contains("\"pid\": 4242"));
    }

    #[test]
    fn missing_fields_use_display_defaults() {
        let event = Event::from_value(json!({ "_id": "e2", "user": "" }));
        assert_eq!(event.display_type(), "unknown");
        assert_eq!(event.display_hostname(), "unknown");
        assert_eq!(event.display_user(), "N/A");
        assert_eq!(event.display_process(), "N/A");
        assert_eq!(event.display_severity(), Severity::Low);
        assert!(event.timestamp.is_null());
    }

    #[test]
    fn unknown_severity_is_kept_and_gray() {
        let severity = Severity::parse("critical");
        assert_eq!(severity.as_str(), "critical");
        assert_eq!(severity.color(), "#6c757d");
        assert_eq!(Severity::High.color(), "#dc3545");
        assert_eq!(Severity::Medium.color(), "#ffc107");
        assert_eq!(Severity::Low.color(), "#28a745");
    }

    #[test]
    fn event_page_defaults() {
        let page: EventPage =
            serde_json::from_value(json!({ "events": [], "total": 0, "pages": 0 })).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages(), 1);
    }

    #[test]
    fn type_count_reads_type_key() {
        let row: TypeCount = serde_json::from_value(json!({ "type": "file_access", "count": 3 })).unwrap();
        assert_eq!(row.event_type, "file_access");
        assert_eq!(row.count, 3);
    }

    #[test]
    fn null_labels_in_aggregate_rows_decode_as_unknown() {
        let types: Vec<TypeCount> =
            serde_json::from_value(json!([{ "type": null, "count": 2 }, { "count": 1 }])).unwrap();
        assert_eq!(types[0].event_type, "unknown");
        assert_eq!(types[1].event_type, "unknown");

        let severities: Vec<SeverityCount> = serde_json::from_value(json!([
            { "severity": "high", "count": 4 },
            { "severity": null, "count": 2 }
        ]))
        .unwrap();
        assert_eq!(severities[0].severity, Severity::High);
        assert_eq!(severities[1].severity, Severity::Other("unknown".to_string()));

        let agent: ActiveAgent =
            serde_json::from_value(json!({ "hostname": null, "event_count": 3 })).unwrap();
        assert_eq!(agent.hostname, "unknown");

        let login: RecentLogin = serde_json::from_value(json!({
            "hostname": 7, "event_type": null, "status": "success", "severity": null
        }))
        .unwrap();
        assert_eq!(login.hostname, "7");
        assert_eq!(login.event_type, "unknown");
        assert_eq!(login.severity, None);
    }
}
