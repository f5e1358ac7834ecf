use crate::errors::AppError;
use crate::models::{AppData, CatalogSubject, DailyRecord, UserSummary};
use crate::storage::persist_data;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotToken {
    day: u64,
    summary: u64,
}

#[derive(Debug, Clone)]
pub struct DaySnapshot {
    pub record: Option<DailyRecord>,
    pub summary: Option<UserSummary>,
    pub token: SnapshotToken,
}

struct StoreInner {
    data: AppData,
    day_versions: HashMap<(String, NaiveDate), u64>,
    summary_versions: HashMap<String, u64>,
    watchers: HashMap<(String, NaiveDate), watch::Sender<DailyRecord>>,
}

impl StoreInner {
    fn day_version(&self, user_id: &str, date: NaiveDate) -> u64 {
        self.day_versions
            .get(&(user_id.to_string(), date))
            .copied()
            .unwrap_or(0)
    }

    fn summary_version(&self, user_id: &str) -> u64 {
        self.summary_versions.get(user_id).copied().unwrap_or(0)
    }
}

#[derive(Clone)]
pub struct Store {
    data_path: PathBuf,
    inner: Arc<Mutex<StoreInner>>,
}

impl Store {
    pub fn new(data_path: PathBuf, data: AppData) -> Self {
        Self {
            data_path,
            inner: Arc::new(Mutex::new(StoreInner {
                data,
                day_versions: HashMap::new(),
                summary_versions: HashMap::new(),
                watchers: HashMap::new(),
            })),
        }
    }

    pub async fn snapshot_day(&self, user_id: &str, date: NaiveDate) -> DaySnapshot {
        let inner = self.inner.lock().await;
        let user = inner.data.users.get(user_id);
        DaySnapshot {
            record: user.and_then(|u| u.days.get(&date).cloned()),
            summary: user.and_then(|u| u.summary.clone()),
            token: SnapshotToken {
                day: inner.day_version(user_id, date),
                summary: inner.summary_version(user_id),
            },
        }
    }

    // Both documents commit together or not at all; a token minted by
    // snapshot_day is invalidated by any commit touching either document.
    pub async fn commit_day(
        &self,
        user_id: &str,
        date: NaiveDate,
        record: DailyRecord,
        summary: UserSummary,
        token: SnapshotToken,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner.day_version(user_id, date) != token.day
            || inner.summary_version(user_id) != token.summary
        {
            return Err(AppError::Conflict);
        }

        let user = inner.data.users.entry(user_id.to_string()).or_default();
        let prev_record = user.days.insert(date, record.clone());
        let prev_summary = user.summary.replace(summary);

        if let Err(err) = persist_data(&self.data_path, &inner.data).await {
            let user = inner.data.users.entry(user_id.to_string()).or_default();
            match prev_record {
                Some(prev) => {
                    user.days.insert(date, prev);
                }
                None => {
                    user.days.remove(&date);
                }
            }
            user.summary = prev_summary;
            return Err(err);
        }

        *inner
            .day_versions
            .entry((user_id.to_string(), date))
            .or_insert(0) += 1;
        *inner
            .summary_versions
            .entry(user_id.to_string())
            .or_insert(0) += 1;

        if let Some(tx) = inner.watchers.get(&(user_id.to_string(), date)) {
            let _ = tx.send(record);
        }
        Ok(())
    }

    pub async fn day_record(&self, user_id: &str, date: NaiveDate) -> Option<DailyRecord> {
        let inner = self.inner.lock().await;
        inner
            .data
            .users
            .get(user_id)
            .and_then(|u| u.days.get(&date).cloned())
    }

    pub async fn days_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyRecord> {
        let inner = self.inner.lock().await;
        match inner.data.users.get(user_id) {
            Some(user) => user.days.range(start..=end).map(|(_, r)| r.clone()).collect(),
            None => Vec::new(),
        }
    }

    pub async fn summary(&self, user_id: &str) -> Option<UserSummary> {
        let inner = self.inner.lock().await;
        inner.data.users.get(user_id).and_then(|u| u.summary.clone())
    }

    pub async fn subjects(&self, user_id: &str) -> Vec<CatalogSubject> {
        let inner = self.inner.lock().await;
        inner
            .data
            .users
            .get(user_id)
            .map(|u| u.subjects.clone())
            .unwrap_or_default()
    }

    // Baseline import: replaces the catalog and rewrites the summary's past_*
    // fields from it. Tracked counters are never touched here.
    pub async fn replace_subjects(
        &self,
        user_id: &str,
        subjects: Vec<CatalogSubject>,
    ) -> Result<UserSummary, AppError> {
        let mut inner = self.inner.lock().await;
        let user = inner.data.users.entry(user_id.to_string()).or_default();
        let prev_subjects = std::mem::replace(&mut user.subjects, subjects);

        let mut summary = user.summary.clone().unwrap_or_default();
        summary.past_total_classes = user.subjects.iter().map(|s| s.past_attendance.total).sum();
        summary.past_attended_classes = user
            .subjects
            .iter()
            .map(|s| s.past_attendance.attended)
            .sum();
        let prev_summary = user.summary.replace(summary.clone());

        if let Err(err) = persist_data(&self.data_path, &inner.data).await {
            let user = inner.data.users.entry(user_id.to_string()).or_default();
            user.subjects = prev_subjects;
            user.summary = prev_summary;
            return Err(err);
        }

        *inner
            .summary_versions
            .entry(user_id.to_string())
            .or_insert(0) += 1;
        Ok(summary)
    }

    // Every committed change to the day is delivered as a full snapshot; the
    // receiver starts out holding the current state.
    pub async fn subscribe_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> watch::Receiver<DailyRecord> {
        let mut inner = self.inner.lock().await;
        let current = inner
            .data
            .users
            .get(user_id)
            .and_then(|u| u.days.get(&date).cloned())
            .unwrap_or_else(|| DailyRecord::empty(date));
        inner
            .watchers
            .entry((user_id.to_string(), date))
            .or_insert_with(|| watch::channel(current).0)
            .subscribe()
    }
}
