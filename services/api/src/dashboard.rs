//! Dashboard aggregation over the applications in a caller's scope

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{ApplicationFacts, ApplicationStatus, DashboardStats, Kpis, TimelinePoint};

const WEEK_DAYS: i64 = 7;
const TIMELINE_DAYS: i64 = 30;

/// Compute the dashboard at instant `now`
///
/// KPIs and the status breakdown ignore archived applications. The timeline
/// counts every application created in the last thirty days, per UTC day,
/// listing only days with at least one creation.
pub fn compute_stats(facts: &[ApplicationFacts], now: DateTime<Utc>) -> DashboardStats {
    let week_ago = now - Duration::days(WEEK_DAYS);
    let timeline_start = now - Duration::days(TIMELINE_DAYS);

    let mut kpis = Kpis::default();
    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for fact in facts {
        if fact.created_at >= timeline_start {
            *per_day.entry(fact.created_at.date_naive()).or_default() += 1;
        }

        if fact.archived {
            continue;
        }

        kpis.total += 1;
        *by_status.entry(fact.status.to_string()).or_default() += 1;

        match fact.status {
            ApplicationStatus::Applied
                if fact.applied_date.is_some_and(|applied| applied >= week_ago) =>
            {
                kpis.applied_this_week += 1
            }
            ApplicationStatus::Interview => kpis.interviews += 1,
            ApplicationStatus::Offer => kpis.offers += 1,
            _ => {}
        }
    }

    DashboardStats {
        kpis,
        by_status,
        timeline: per_day
            .into_iter()
            .map(|(date, count)| TimelinePoint { date, count })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(status: ApplicationStatus, archived: bool, days_ago: i64, now: DateTime<Utc>) -> ApplicationFacts {
        let at = now - Duration::days(days_ago);
        ApplicationFacts {
            status,
            archived,
            applied_date: Some(at),
            created_at: at,
        }
    }

    #[test]
    fn kpis_skip_archived_rows() {
        let now = Utc::now();
        let facts = vec![
            fact(ApplicationStatus::Applied, false, 1, now),
            fact(ApplicationStatus::Applied, false, 10, now),
            fact(ApplicationStatus::Interview, false, 2, now),
            fact(ApplicationStatus::Offer, true, 2, now),
            fact(ApplicationStatus::Wishlist, false, 40, now),
        ];

        let stats = compute_stats(&facts, now);
        assert_eq!(
            stats.kpis,
            Kpis {
                total: 4,
                applied_this_week: 1,
                interviews: 1,
                offers: 0,
            }
        );
        assert_eq!(stats.by_status.get("applied"), Some(&2));
        assert_eq!(stats.by_status.get("offer"), None);
    }

    #[test]
    fn timeline_groups_by_day_and_keeps_archived_creations() {
        let now = Utc::now();
        let facts = vec![
            fact(ApplicationStatus::Applied, false, 3, now),
            fact(ApplicationStatus::Rejected, true, 3, now),
            fact(ApplicationStatus::Applied, false, 1, now),
            fact(ApplicationStatus::Applied, false, 31, now),
        ];

        let stats = compute_stats(&facts, now);
        assert_eq!(stats.timeline.len(), 2);
        assert_eq!(stats.timeline[0].count, 2);
        assert!(stats.timeline[0].date < stats.timeline[1].date);
    }

    #[test]
    fn serializes_in_camel_case() {
        let json = serde_json::to_value(compute_stats(&[], Utc::now())).unwrap();
        assert_eq!(json["kpis"]["appliedThisWeek"], 0);
        assert!(json["byStatus"].as_object().unwrap().is_empty());
        assert!(json["timeline"].as_array().unwrap().is_empty());
    }
}
