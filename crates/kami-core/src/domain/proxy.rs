//! Proxy resellers: card bindings and revenue reporting types.

use chrono::{DateTime, Utc};
use kami_shared::constants::REPORT_DATETIME_FORMAT;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Card;

/// Grants a proxy the right to resell one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyCardAssociation {
    pub id: Uuid,
    pub proxy_user_id: Uuid,
    pub card_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ProxyCardAssociation {
    pub fn new(proxy_user_id: Uuid, card_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            proxy_user_id,
            card_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProxyCards {
    pub proxy_user_id: Uuid,
    pub cards: Vec<Card>,
    pub total_count: usize,
}

/// Inclusive time window over `used_at`. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RevenueWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }

    pub fn describe(&self) -> String {
        let fmt = |t: DateTime<Utc>| t.format(REPORT_DATETIME_FORMAT).to_string();
        match (self.start, self.end) {
            (None, None) => "all time".to_string(),
            (Some(s), None) => format!("from {}", fmt(s)),
            (None, Some(e)) => format!("until {}", fmt(e)),
            (Some(s), Some(e)) => format!("{} to {}", fmt(s), fmt(e)),
        }
    }
}

/// Per-card count of consumed codes credited to one proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardConsumption {
    pub card_id: Uuid,
    pub consumed: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub proxy_id: Option<Uuid>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub proxy_user_id: Uuid,
    pub proxy_username: String,
    pub proxy_name: Option<String>,
    pub total_revenue: f64,
    pub consumed_count: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub query_time_range: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueSummary {
    pub revenues: Vec<RevenueReport>,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_descriptions() {
        let s = at(2024, 1, 1);
        let e = at(2024, 2, 1);
        assert_eq!(RevenueWindow::default().describe(), "all time");
        assert_eq!(RevenueWindow::new(Some(s), None).describe(), "from 2024-01-01 00:00:00");
        assert_eq!(RevenueWindow::new(None, Some(e)).describe(), "until 2024-02-01 00:00:00");
        assert_eq!(
            RevenueWindow::new(Some(s), Some(e)).describe(),
            "2024-01-01 00:00:00 to 2024-02-01 00:00:00"
        );
    }

    #[test]
    fn test_window_is_inclusive() {
        let s = at(2024, 1, 1);
        let e = at(2024, 2, 1);
        let w = RevenueWindow::new(Some(s), Some(e));
        assert!(w.contains(s));
        assert!(w.contains(e));
        assert!(!w.contains(at(2023, 12, 31)));
        assert!(!w.contains(at(2024, 2, 2)));
        assert!(RevenueWindow::default().contains(at(1999, 1, 1)));
    }
}
