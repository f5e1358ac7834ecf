use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Present,
    Absent,
    NotHeld,
}

impl Status {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim() {
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            "not_held" => Ok(Status::NotHeld),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
            Status::NotHeld => "not_held",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub status: Status,
    #[serde(default)]
    pub remark: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub entries: BTreeMap<String, AttendanceEntry>,
}

impl DailyRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            entries: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSummary {
    #[serde(default)]
    pub tracked_total: u64,
    #[serde(default)]
    pub tracked_present: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default)]
    pub past_total_classes: u64,
    #[serde(default)]
    pub past_attended_classes: u64,
    #[serde(default)]
    pub tracked_total: u64,
    #[serde(default)]
    pub tracked_present: u64,
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastAttendance {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub attended: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSubject {
    pub name: String,
    #[serde(default)]
    pub past_attendance: PastAttendance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DailyRecord>,
    #[serde(default)]
    pub summary: Option<UserSummary>,
    #[serde(default)]
    pub subjects: Vec<CatalogSubject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub users: BTreeMap<String, UserData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub subject_name: String,
    pub start_time: String,
    pub room: String,
    pub faculty: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub date: Option<String>,
    pub subject: String,
    pub status: String,
    pub remark: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkResponse {
    pub record: DailyRecord,
    pub summary: UserSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPeriodStats {
    pub total: u64,
    pub attended: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodStats {
    pub overall_total: u64,
    pub overall_present: u64,
    pub per_subject: BTreeMap<String, SubjectPeriodStats>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectPeriodOverview {
    pub total: u64,
    pub attended: u64,
    pub percentage: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodStatsResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub overall_total: u64,
    pub overall_present: u64,
    pub overall_percentage: u32,
    pub per_subject: BTreeMap<String, SubjectPeriodOverview>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectOverview {
    pub name: String,
    pub total: u64,
    pub attended: u64,
    pub percentage: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub past_total_classes: u64,
    pub past_attended_classes: u64,
    pub tracked_total: u64,
    pub tracked_present: u64,
    pub overall_total: u64,
    pub overall_present: u64,
    pub overall_percentage: u32,
    pub subjects: Vec<SubjectOverview>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub college: Option<String>,
    pub class: Option<String>,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(value.to_string()))
}
