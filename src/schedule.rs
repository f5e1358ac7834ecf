use crate::errors::AppError;
use crate::models::{CatalogSubject, ScheduleRow};
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PLACEHOLDER: &str = "—";

// Routine sheet columns: college | class | day | start_time | subject | faculty | room
#[derive(Debug, Clone, PartialEq, Eq)]
struct RoutineRow {
    college: String,
    class: String,
    day: String,
    start_time: String,
    subject: String,
    faculty: String,
    room: String,
}

#[derive(Debug, Clone)]
struct MasterRow {
    class_id: String,
    routine_sheet_id: String,
    version: u64,
}

struct CachedRoutine {
    version: u64,
    rows: Vec<RoutineRow>,
}

pub struct ScheduleService {
    client: reqwest::Client,
    master_url: Option<String>,
    cache: Mutex<HashMap<String, CachedRoutine>>,
}

impl ScheduleService {
    pub fn new(master_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            master_url,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn rows_for(
        &self,
        college: &str,
        class_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleRow>, AppError> {
        let Some(master_url) = &self.master_url else {
            return Err(AppError::ProviderUnavailable(
                "no master sheet configured".to_string(),
            ));
        };

        let master = self.fetch_csv(master_url).await?;
        let class_row = parse_master_csv(&master)
            .into_iter()
            .find(|r| r.class_id.eq_ignore_ascii_case(class_id))
            .ok_or_else(|| {
                AppError::ProviderUnavailable(format!("class '{class_id}' not in master sheet"))
            })?;
        let cache_key = class_row.class_id.to_lowercase();

        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(&cache_key) {
                if cached.version == class_row.version && cached.version > 0 {
                    debug!(
                        "routine cache hit for {} (v{})",
                        class_row.class_id, cached.version
                    );
                    return Ok(rows_for_day(&cached.rows, college, class_id, date));
                }
            }
        }

        let routine_url = routine_sheet_url(&class_row.routine_sheet_id);
        match self.fetch_csv(&routine_url).await {
            Ok(text) => {
                let routine = parse_routine_csv(&text);
                let result = rows_for_day(&routine, college, class_id, date);
                let mut cache = self.cache.lock().await;
                cache.insert(
                    cache_key,
                    CachedRoutine {
                        version: class_row.version,
                        rows: routine,
                    },
                );
                Ok(result)
            }
            Err(err) => {
                // Stale rows beat no rows.
                let cache = self.cache.lock().await;
                if let Some(cached) = cache.get(&cache_key) {
                    warn!("routine fetch failed, serving cached rows: {err}");
                    return Ok(rows_for_day(&cached.rows, college, class_id, date));
                }
                Err(err)
            }
        }
    }

    async fn fetch_csv(&self, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::ProviderUnavailable(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

pub fn fallback_rows(subjects: &[CatalogSubject]) -> Vec<ScheduleRow> {
    subjects
        .iter()
        .map(|s| ScheduleRow {
            subject_name: s.name.clone(),
            start_time: "Daily".to_string(),
            room: PLACEHOLDER.to_string(),
            faculty: PLACEHOLDER.to_string(),
        })
        .collect()
}

fn routine_sheet_url(sheet_id: &str) -> String {
    if sheet_id.starts_with("http://") || sheet_id.starts_with("https://") {
        sheet_id.to_string()
    } else {
        format!("https://docs.google.com/spreadsheets/d/e/{sheet_id}/pub?gid=0&single=true&output=csv")
    }
}

// Master sheet columns are matched by header name, not position.
fn parse_master_csv(text: &str) -> Vec<MasterRow> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<&str> = header.split(',').map(str::trim).collect();
    let index_of = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (Some(class_id), Some(sheet_id), Some(version)) = (
        index_of("class_id"),
        index_of("routine_sheet_id"),
        index_of("version"),
    ) else {
        return Vec::new();
    };

    lines
        .map(|line| {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            MasterRow {
                class_id: cols.get(class_id).copied().unwrap_or("").to_string(),
                routine_sheet_id: cols.get(sheet_id).copied().unwrap_or("").to_string(),
                version: cols
                    .get(version)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            }
        })
        .collect()
}

fn parse_routine_csv(text: &str) -> Vec<RoutineRow> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() < 5 {
                return None;
            }
            Some(RoutineRow {
                college: cols[0].to_string(),
                class: cols[1].to_string(),
                day: cols[2].to_string(),
                start_time: cols[3].to_string(),
                subject: cols[4].to_string(),
                faculty: cols.get(5).copied().unwrap_or("").to_string(),
                room: cols.get(6).copied().unwrap_or("").to_string(),
            })
        })
        .collect()
}

fn rows_for_day(
    rows: &[RoutineRow],
    college: &str,
    class: &str,
    date: NaiveDate,
) -> Vec<ScheduleRow> {
    let day_name = date.format("%A").to_string();
    let college = college.to_lowercase();
    rows.iter()
        .filter(|r| {
            r.college.to_lowercase().contains(&college)
                && r.class.eq_ignore_ascii_case(class)
                && r.day.eq_ignore_ascii_case(&day_name)
        })
        .map(|r| ScheduleRow {
            subject_name: r.subject.clone(),
            start_time: r.start_time.clone(),
            faculty: if r.faculty.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                r.faculty.clone()
            },
            room: if r.room.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                r.room.clone()
            },
        })
        .collect()
}
