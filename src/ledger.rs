use crate::errors::AppError;
use crate::models::{AttendanceEntry, DailyRecord, Status, UserSummary};
use crate::store::Store;
use chrono::{NaiveDate, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

const MAX_COMMIT_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct MarkOutcome {
    pub record: DailyRecord,
    pub summary: UserSummary,
    pub changed: bool,
}

// Counter adjustment for one entry moving from `old` to `new`. Present counts
// toward total and present, absent toward total only, not_held toward neither.
// Reverting uses saturating decrements so a corrupted summary can never push a
// counter below zero.
pub fn apply_status_change(
    summary: &mut UserSummary,
    subject: &str,
    old: Option<Status>,
    new: Status,
) {
    match old {
        Some(Status::Present) => {
            summary.tracked_total = summary.tracked_total.saturating_sub(1);
            summary.tracked_present = summary.tracked_present.saturating_sub(1);
            if let Some(subj) = summary.subjects.get_mut(subject) {
                subj.tracked_total = subj.tracked_total.saturating_sub(1);
                subj.tracked_present = subj.tracked_present.saturating_sub(1);
            }
        }
        Some(Status::Absent) => {
            summary.tracked_total = summary.tracked_total.saturating_sub(1);
            if let Some(subj) = summary.subjects.get_mut(subject) {
                subj.tracked_total = subj.tracked_total.saturating_sub(1);
            }
        }
        Some(Status::NotHeld) | None => {}
    }

    match new {
        Status::Present => {
            summary.tracked_total += 1;
            summary.tracked_present += 1;
            let subj = summary.subjects.entry(subject.to_string()).or_default();
            subj.tracked_total += 1;
            subj.tracked_present += 1;
        }
        Status::Absent => {
            summary.tracked_total += 1;
            let subj = summary.subjects.entry(subject.to_string()).or_default();
            subj.tracked_total += 1;
        }
        Status::NotHeld => {}
    }
}

// Re-runs `op` on commit conflicts, with fresh reads each attempt. Any other
// error (and the final conflict) is returned as-is.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match op().await {
            Err(AppError::Conflict) if attempt < max_attempts => {
                warn!("commit conflict, retrying (attempt {attempt} of {max_attempts})");
                sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

pub async fn mark_attendance(
    store: &Store,
    user_id: &str,
    date: NaiveDate,
    subject: &str,
    status: Status,
    remark: Option<&str>,
) -> Result<MarkOutcome, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::NotAuthenticated);
    }
    if subject.trim().is_empty() {
        return Err(AppError::InvalidSubject);
    }

    with_retry(MAX_COMMIT_ATTEMPTS, || async move {
        let snap = store.snapshot_day(user_id, date).await;
        let mut record = snap.record.unwrap_or_else(|| DailyRecord::empty(date));
        let mut summary = snap.summary.unwrap_or_default();

        let (old_status, old_remark) = match record.entries.get(subject) {
            Some(entry) => (Some(entry.status), entry.remark.clone()),
            None => (None, String::new()),
        };

        // An omitted remark keeps whatever is stored; an explicit one wins,
        // empty included.
        let remark = match remark {
            Some(value) => value.to_string(),
            None => old_remark.clone(),
        };

        if old_status == Some(status) && remark == old_remark {
            return Ok(MarkOutcome {
                record,
                summary,
                changed: false,
            });
        }

        apply_status_change(&mut summary, subject, old_status, status);
        record.entries.insert(
            subject.to_string(),
            AttendanceEntry {
                status,
                remark,
                recorded_at: Utc::now(),
            },
        );

        store
            .commit_day(user_id, date, record.clone(), summary.clone(), snap.token)
            .await?;
        Ok(MarkOutcome {
            record,
            summary,
            changed: true,
        })
    })
    .await
}
