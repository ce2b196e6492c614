use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Timestamp layout used for every record the dashboard creates itself.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Event,
    SensorError,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
    Unknown,
}

impl ProblemKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "event" => ProblemKind::Event,
            "sensor_error" => ProblemKind::SensorError,
            _ => ProblemKind::Unknown,
        }
    }
}

impl Priority {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    Pending,
    Processing,
    Resolved,
    Unknown,
}

impl ProblemStatus {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "pending" => ProblemStatus::Pending,
            "processing" => ProblemStatus::Processing,
            "resolved" => ProblemStatus::Resolved,
            _ => ProblemStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemReport {
    pub id: String,
    pub area: Option<String>,
    pub area_code: Option<String>,
    #[serde(rename = "lng")]
    pub longitude: Option<f64>,
    #[serde(rename = "lat")]
    pub latitude: Option<f64>,
    #[serde(rename = "type")]
    pub kind: ProblemKind,
    pub sub_type: Option<String>,
    pub priority: Priority,
    pub status: ProblemStatus,
    #[serde(rename = "createTime")]
    pub created_at: Option<String>,
    #[serde(rename = "responseTime")]
    pub response_minutes: Option<u32>,
    pub device_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub reporter_type: Option<String>,
}

impl ProblemReport {
    pub fn area_label(&self) -> &str {
        self.area.as_deref().unwrap_or("未知区域")
    }

    pub fn sub_type_label(&self) -> &str {
        self.sub_type.as_deref().unwrap_or("未知")
    }

    /// Parsed creation time, or `None` when the record carries no usable timestamp.
    pub fn created_time(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn created_date(&self) -> Option<NaiveDate> {
        self.created_time().map(|time| time.date())
    }

    pub fn is_pending_high_priority(&self) -> bool {
        self.priority == Priority::High && self.status == ProblemStatus::Pending
    }
}

/// Accepts the formats seen in imported feeds: `YYYY-MM-DD HH:MM:SS`,
/// RFC 3339, `YYYY-MM-DDTHH:MM:SS` and a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(time) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(time);
    }
    if let Ok(time) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&chrono::Local).naive_local());
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(time);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    #[serde(rename = "size")]
    pub page_size: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStatus {
    Pending,
    Processed,
    FollowUp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub id: String,
    pub problem_id: String,
    pub area: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Priority,
    pub message: String,
    pub status: WarningStatus,
    #[serde(rename = "createTime")]
    pub created_at: String,
    pub ai_suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_problems: usize,
    pub today_problems: usize,
    pub error_devices: usize,
    pub high_priority: usize,
    pub avg_response_time: u32,
    pub event_count: usize,
    pub sensor_error_count: usize,
    /// Oldest day first.
    pub weekly_trend: Vec<DailyCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lng: f64,
    pub lat: f64,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
}

/// One-shot alert handed to the notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
    pub closable: bool,
}
