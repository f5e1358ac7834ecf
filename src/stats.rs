use crate::models::{
    CatalogSubject, DailyRecord, PeriodStats, PeriodStatsResponse, Status, SubjectOverview,
    SubjectPeriodOverview, SummaryResponse, UserSummary,
};
use chrono::NaiveDate;

pub fn percentage(total: u64, present: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((present as f64 / total as f64) * 100.0).round() as u32
}

// Pure recomputation over raw daily records; never consults the running
// summary. A subject enters per_subject as soon as it has any entry in range,
// even if every entry is not_held.
pub fn compute_period_stats(
    records: &[DailyRecord],
    known_subjects: Option<&[String]>,
) -> PeriodStats {
    let mut stats = PeriodStats::default();

    if let Some(names) = known_subjects {
        for name in names {
            stats.per_subject.entry(name.clone()).or_default();
        }
    }

    for record in records {
        for (subject, entry) in &record.entries {
            let slot = stats.per_subject.entry(subject.clone()).or_default();
            match entry.status {
                Status::Present => {
                    stats.overall_total += 1;
                    stats.overall_present += 1;
                    slot.total += 1;
                    slot.attended += 1;
                }
                Status::Absent => {
                    stats.overall_total += 1;
                    slot.total += 1;
                }
                Status::NotHeld => {}
            }
        }
    }

    stats
}

pub fn build_period_response(
    start: NaiveDate,
    end: NaiveDate,
    stats: PeriodStats,
) -> PeriodStatsResponse {
    let per_subject = stats
        .per_subject
        .into_iter()
        .map(|(name, counts)| {
            (
                name,
                SubjectPeriodOverview {
                    total: counts.total,
                    attended: counts.attended,
                    percentage: percentage(counts.total, counts.attended),
                },
            )
        })
        .collect();

    PeriodStatsResponse {
        start,
        end,
        overall_total: stats.overall_total,
        overall_present: stats.overall_present,
        overall_percentage: percentage(stats.overall_total, stats.overall_present),
        per_subject,
    }
}

// The overall view: baseline totals imported once plus everything tracked
// since. Catalog order is kept; subjects tracked but missing from the catalog
// are appended.
pub fn build_summary_overview(summary: &UserSummary, catalog: &[CatalogSubject]) -> SummaryResponse {
    let overall_total = summary.past_total_classes + summary.tracked_total;
    let overall_present = summary.past_attended_classes + summary.tracked_present;

    let mut subjects = Vec::with_capacity(catalog.len());
    for subject in catalog {
        let tracked = summary
            .subjects
            .get(&subject.name)
            .copied()
            .unwrap_or_default();
        let total = subject.past_attendance.total + tracked.tracked_total;
        let attended = subject.past_attendance.attended + tracked.tracked_present;
        subjects.push(SubjectOverview {
            name: subject.name.clone(),
            total,
            attended,
            percentage: percentage(total, attended),
        });
    }

    for (name, tracked) in &summary.subjects {
        if catalog.iter().any(|s| &s.name == name) {
            continue;
        }
        subjects.push(SubjectOverview {
            name: name.clone(),
            total: tracked.tracked_total,
            attended: tracked.tracked_present,
            percentage: percentage(tracked.tracked_total, tracked.tracked_present),
        });
    }

    SummaryResponse {
        past_total_classes: summary.past_total_classes,
        past_attended_classes: summary.past_attended_classes,
        tracked_total: summary.tracked_total,
        tracked_present: summary.tracked_present,
        overall_total,
        overall_present,
        overall_percentage: percentage(overall_total, overall_present),
        subjects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceEntry, PastAttendance, SubjectSummary};
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(day: &str, entries: &[(&str, Status)]) -> DailyRecord {
        let mut record = DailyRecord::empty(date(day));
        for (subject, status) in entries {
            record.entries.insert(
                subject.to_string(),
                AttendanceEntry {
                    status: *status,
                    remark: String::new(),
                    recorded_at: Utc::now(),
                },
            );
        }
        record
    }

    #[test]
    fn percentage_rounds_half_away_from_zero_and_handles_zero_total() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(2, 1), 50);
        assert_eq!(percentage(3, 1), 33);
        assert_eq!(percentage(3, 2), 67);
        assert_eq!(percentage(8, 1), 13);
        assert_eq!(percentage(200, 1), 1);
    }

    #[test]
    fn period_stats_count_present_and_absent_only() {
        let records = [
            record("2026-01-02", &[("Physics", Status::Present)]),
            record(
                "2026-01-03",
                &[("Physics", Status::Absent), ("Math", Status::Present)],
            ),
            record("2026-01-04", &[("Math", Status::NotHeld)]),
        ];

        let stats = compute_period_stats(&records, None);
        assert_eq!(stats.overall_total, 3);
        assert_eq!(stats.overall_present, 2);
        assert_eq!(stats.per_subject["Physics"].total, 2);
        assert_eq!(stats.per_subject["Physics"].attended, 1);
        assert_eq!(stats.per_subject["Math"].total, 1);
        assert_eq!(stats.per_subject["Math"].attended, 1);
    }

    #[test]
    fn not_held_only_subject_shows_up_zeroed() {
        let records = [record("2026-01-02", &[("Physics", Status::NotHeld)])];
        let stats = compute_period_stats(&records, None);

        assert_eq!(stats.overall_total, 0);
        assert_eq!(stats.overall_present, 0);
        assert_eq!(stats.per_subject["Physics"].total, 0);
        assert_eq!(stats.per_subject["Physics"].attended, 0);
    }

    #[test]
    fn known_subjects_are_zero_filled() {
        let known = vec!["Physics".to_string(), "Math".to_string()];
        let records = [record("2026-01-02", &[("Physics", Status::Present)])];

        let stats = compute_period_stats(&records, Some(&known));
        assert_eq!(stats.per_subject.len(), 2);
        assert_eq!(stats.per_subject["Math"].total, 0);
        assert_eq!(stats.per_subject["Physics"].total, 1);
    }

    #[test]
    fn summary_overview_merges_baseline_and_tracked() {
        let mut summary = UserSummary {
            past_total_classes: 50,
            past_attended_classes: 39,
            tracked_total: 3,
            tracked_present: 2,
            ..UserSummary::default()
        };
        summary.subjects.insert(
            "Physics".to_string(),
            SubjectSummary {
                tracked_total: 2,
                tracked_present: 1,
            },
        );
        summary.subjects.insert(
            "Biology".to_string(),
            SubjectSummary {
                tracked_total: 1,
                tracked_present: 1,
            },
        );

        let catalog = vec![
            CatalogSubject {
                name: "Physics".to_string(),
                past_attendance: PastAttendance {
                    total: 40,
                    attended: 30,
                },
            },
            CatalogSubject {
                name: "Math".to_string(),
                past_attendance: PastAttendance {
                    total: 10,
                    attended: 9,
                },
            },
        ];

        let view = build_summary_overview(&summary, &catalog);
        assert_eq!(view.overall_total, 53);
        assert_eq!(view.overall_present, 41);
        assert_eq!(view.overall_percentage, 77);

        assert_eq!(view.subjects.len(), 3);
        assert_eq!(view.subjects[0].name, "Physics");
        assert_eq!(view.subjects[0].total, 42);
        assert_eq!(view.subjects[0].attended, 31);
        assert_eq!(view.subjects[1].name, "Math");
        assert_eq!(view.subjects[1].total, 10);
        assert_eq!(view.subjects[1].attended, 9);
        // Tracked but never imported.
        assert_eq!(view.subjects[2].name, "Biology");
        assert_eq!(view.subjects[2].total, 1);
        assert_eq!(view.subjects[2].attended, 1);
    }

    #[test]
    fn period_response_carries_percentages() {
        let records = [record(
            "2026-01-02",
            &[("Math", Status::Present), ("Physics", Status::Absent)],
        )];
        let stats = compute_period_stats(&records, None);
        let response = build_period_response(date("2026-01-01"), date("2026-01-31"), stats);

        assert_eq!(response.overall_total, 2);
        assert_eq!(response.overall_present, 1);
        assert_eq!(response.overall_percentage, 50);
        assert_eq!(response.per_subject["Math"].percentage, 100);
        assert_eq!(response.per_subject["Physics"].percentage, 0);
    }
}
