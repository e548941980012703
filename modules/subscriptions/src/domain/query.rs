//! Query predicates: which subscriptions a filter selects and which are
//! active in a cost window. Storage translates these into SQL conditions.

use crate::contract::model::{Subscription, SubscriptionFilter};
use crate::domain::error::DomainError;
use crate::domain::period::Period;

/// Escape character used in LIKE patterns built by [`SubscriptionFilter::like_pattern`].
pub const LIKE_ESCAPE: char = '\\';

impl SubscriptionFilter {
    /// Lower-cased service name needle; an empty needle filters nothing.
    pub fn needle(&self) -> Option<String> {
        self.service_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// `%needle%` with LIKE wildcards escaped, for matching against `lower(service_name)`.
    pub fn like_pattern(&self) -> Option<String> {
        self.needle().map(|needle| {
            let mut pattern = String::with_capacity(needle.len() + 2);
            pattern.push('%');
            for c in needle.chars() {
                if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
                    pattern.push(LIKE_ESCAPE);
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }

    /// In-memory form of the list condition; the SQL adapter must select the same rows.
    pub fn matches(&self, sub: &Subscription) -> bool {
        if self.user_id.is_some_and(|uid| uid != sub.user_id) {
            return false;
        }
        match self.needle() {
            Some(needle) => sub.service_name.to_lowercase().contains(&needle),
            None => true,
        }
    }
}

/// Inclusive reporting window for total-cost queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWindow {
    pub from: Period,
    pub to: Period,
}

impl CostWindow {
    pub fn new(from: Period, to: Period) -> Result<Self, DomainError> {
        if to < from {
            return Err(DomainError::validation(
                "period_to",
                "period_to must not be before period_from",
            ));
        }
        Ok(Self { from, to })
    }

    pub fn parse(period_from: &str, period_to: &str) -> Result<Self, DomainError> {
        let from = Period::parse_field("period_from", period_from)?;
        let to = Period::parse_field("period_to", period_to)?;
        Self::new(from, to)
    }

    /// Started on or before the window end and not ended before the window start.
    pub fn is_active(&self, start: Period, end: Option<Period>) -> bool {
        start <= self.to && end.map_or(true, |end| end >= self.from)
    }

    /// Sum of prices of the subscriptions active in this window. Reference for
    /// `sum_price_where_active`.
    pub fn total<'a>(&self, subs: impl IntoIterator<Item = &'a Subscription>) -> i64 {
        subs.into_iter()
            .filter(|s| self.is_active(s.start_date, s.end_date))
            .map(|s| i64::from(s.price))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn p(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn sub(name: &str, price: i32, start: &str, end: Option<&str>) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            service_name: name.into(),
            price,
            user_id: Uuid::new_v4(),
            start_date: p(start),
            end_date: end.map(p),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overlap_windows() {
        let a = sub("A", 100, "01-2025", Some("06-2025"));
        let b = sub("B", 50, "05-2025", None);
        let all = [a, b];

        let total = |from: &str, to: &str| CostWindow::parse(from, to).unwrap().total(&all);
        assert_eq!(total("03-2025", "04-2025"), 100);
        assert_eq!(total("06-2025", "06-2025"), 150);
        assert_eq!(total("01-2024", "12-2024"), 0);
        assert_eq!(total("07-2025", "12-2030"), 50);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = CostWindow::parse("06-2025", "06-2025").unwrap();
        assert!(w.is_active(p("06-2025"), Some(p("07-2025"))));
        assert!(w.is_active(p("01-2025"), Some(p("06-2025"))));
        assert!(!w.is_active(p("07-2025"), None));
        assert!(!w.is_active(p("01-2025"), Some(p("05-2025"))));
    }

    #[test]
    fn reversed_window_is_rejected() {
        let err = CostWindow::parse("08-2025", "07-2025").unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = CostWindow::parse("2025-08", "07-2025").unwrap_err();
        assert_eq!(err, DomainError::invalid_period("period_from", "2025-08"));
    }

    #[test]
    fn filter_matches_case_insensitive_substring() {
        let f = SubscriptionFilter {
            user_id: None,
            service_name: Some("plus".into()),
        };
        assert!(f.matches(&sub("Yandex Plus", 1, "01-2025", None)));
        assert!(!f.matches(&sub("Netflix", 1, "01-2025", None)));
    }

    #[test]
    fn filter_matches_user_exactly() {
        let s = sub("Netflix", 1, "01-2025", None);
        let same = SubscriptionFilter {
            user_id: Some(s.user_id),
            service_name: None,
        };
        let other = SubscriptionFilter {
            user_id: Some(Uuid::new_v4()),
            service_name: None,
        };
        assert!(same.matches(&s));
        assert!(!other.matches(&s));
        assert!(SubscriptionFilter::default().matches(&s));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let f = SubscriptionFilter {
            user_id: None,
            service_name: Some("100%_Fun\\".into()),
        };
        assert_eq!(f.like_pattern().as_deref(), Some("%100\\%\\_fun\\\\%"));

        let empty = SubscriptionFilter {
            user_id: None,
            service_name: Some(String::new()),
        };
        assert!(empty.like_pattern().is_none());
    }
}
