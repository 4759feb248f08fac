//! Blocked-attempt audit log
//!
//! Append-only record of every block decision made for an inbound IP,
//! served newest-first with simple pagination.

use parking_lot::RwLock;

use crate::models::BlockAttempt;

/// In-memory attempt log
#[derive(Default)]
pub struct AttemptLog {
    entries: RwLock<Vec<BlockAttempt>>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, attempt: BlockAttempt) {
        self.entries.write().push(attempt);
    }

    /// Page of attempts ordered by timestamp descending, plus the total count
    ///
    /// `page` is 1-based; a page past the end is empty, not an error.
    pub fn page(&self, page: usize, page_size: usize) -> (Vec<BlockAttempt>, usize) {
        let mut ordered = self.entries.read().clone();
        ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = ordered.len();
        let page = page.max(1);
        let items = ordered
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        (items, total)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn attempt(ip: &str, minutes_ago: i64, blocked: bool) -> BlockAttempt {
        BlockAttempt {
            ip: ip.to_string(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            country_code: "US".to_string(),
            blocked,
            user_agent: "test-agent".to_string(),
        }
    }

    #[test]
    fn test_page_orders_newest_first() {
        let log = AttemptLog::new();
        log.append(attempt("1.1.1.1", 30, false));
        log.append(attempt("2.2.2.2", 10, true));
        log.append(attempt("3.3.3.3", 20, false));

        let (items, total) = log.page(1, 10);
        assert_eq!(total, 3);
        assert_eq!(items[0].ip, "2.2.2.2");
        assert_eq!(items[1].ip, "3.3.3.3");
        assert_eq!(items[2].ip, "1.1.1.1");
    }

    #[test]
    fn test_pagination_boundaries() {
        let log = AttemptLog::new();
        for i in 0..25 {
            log.append(attempt(&format!("10.0.0.{}", i), i, false));
        }

        let (first, total) = log.page(1, 10);
        assert_eq!(total, 25);
        assert_eq!(first.len(), 10);

        let (last, _) = log.page(3, 10);
        assert_eq!(last.len(), 5);

        let (past_end, _) = log.page(4, 10);
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_page_zero_is_treated_as_first() {
        let log = AttemptLog::new();
        log.append(attempt("1.1.1.1", 0, true));

        let (items, _) = log.page(0, 10);
        assert_eq!(items.len(), 1);
    }
}
