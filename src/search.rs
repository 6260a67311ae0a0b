//! Record filtering.
//!
//! A [`RecordFilter`] carries up to three constraints: an exact apartment,
//! an exact description (period label) and a free-text substring. The exact
//! parts are answered by the store; the free text is matched here over the
//! fetched set.

use crate::database::db::store::{ExpenseQuery, PaymentQuery};
use crate::database::models::{Expense, Payment};

/// Records that can be matched by the free-text box.
pub trait Searchable {
    /// `needle` is already lowercased.
    fn matches_text(&self, needle: &str) -> bool;
}

impl Searchable for Payment {
    fn matches_text(&self, needle: &str) -> bool {
        self.apartment.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

impl Searchable for Expense {
    fn matches_text(&self, needle: &str) -> bool {
        self.description.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
    }
}

/// Substring filter over an already fetched set. An empty query keeps
/// everything, in their existing order. Whitespace in the query is part of
/// the needle, so `" 10"` only matches labels with a space before `10`.
pub fn filter_records<T: Searchable + Clone>(records: &[T], query: &str) -> Vec<T> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| r.matches_text(&needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub apartment: Option<String>,
    pub description: Option<String>,
    pub text: Option<String>,
}

impl RecordFilter {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            text: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn exact(apartment: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            apartment: Some(apartment.into()),
            description: Some(description.into()),
            text: None,
        }
    }

    /// Store-side part for payments. `None` when there is nothing to ask
    /// the store for, in which case the cached set must stay as it is.
    pub fn payment_query(&self) -> Option<PaymentQuery> {
        let query = PaymentQuery {
            apartment: self.apartment.clone(),
            description: self.description.clone(),
        };
        (!query.is_empty()).then_some(query)
    }

    /// Store-side part for expenses; the apartment constraint has no
    /// counterpart there and is ignored.
    pub fn expense_query(&self) -> Option<ExpenseQuery> {
        let query = ExpenseQuery {
            category: None,
            description: self.description.clone(),
        };
        (!query.is_empty()).then_some(query)
    }

    pub fn text_query(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.payment_query().is_none() && self.text_query().is_empty()
    }

    /// Client-side part.
    pub fn apply<T: Searchable + Clone>(&self, records: &[T]) -> Vec<T> {
        filter_records(records, self.text_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::RecordStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn payment(id: i64, apartment: &str, description: &str) -> Payment {
        Payment {
            id,
            apartment: apartment.into(),
            amount: Decimal::from(100),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: description.into(),
            status: RecordStatus::Unpaid,
        }
    }

    fn expense(id: i64, description: &str, category: &str) -> Expense {
        Expense {
            id,
            amount: Decimal::from(20),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: description.into(),
            category: category.into(),
            status: RecordStatus::Paid,
        }
    }

    #[test]
    fn apartment_prefix_selects_matching_units() {
        let set = vec![
            payment(1, "101", "January-2024"),
            payment(2, "102", "January-2024"),
            payment(3, "201", "January-2024"),
        ];
        let hits: Vec<String> = filter_records(&set, "10").into_iter().map(|p| p.apartment).collect();
        assert_eq!(hits, vec!["101", "102"]);
    }

    #[test]
    fn empty_query_returns_everything() {
        let set = vec![payment(1, "101", "January-2024"), payment(2, "305", "March-2024")];
        assert_eq!(filter_records(&set, ""), set);
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_needle() {
        let set = vec![
            payment(1, "101", "January-2024"),
            payment(2, "B 10", "January-2024"),
        ];
        let hits: Vec<i64> = filter_records(&set, " 10").iter().map(|p| p.id).collect();
        assert_eq!(hits, vec![2]);
        assert!(filter_records(&set, "   ").is_empty());
        assert_eq!(RecordFilter::text(" 10").apply(&set).len(), 1);
    }

    #[test]
    fn description_match_ignores_case() {
        let set = vec![payment(1, "101", "January-2024"), payment(2, "102", "March-2024")];
        let hits = filter_records(&set, "JANUARY");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn expenses_match_on_description_or_category() {
        let set = vec![
            expense(1, "Roof repair", "Maintenance"),
            expense(2, "Monthly bill", "Electricity"),
            expense(3, "Garden", "Cleaning"),
        ];
        let by_category: Vec<i64> = filter_records(&set, "electric").iter().map(|e| e.id).collect();
        assert_eq!(by_category, vec![2]);
        let by_description: Vec<i64> = filter_records(&set, "ROOF").iter().map(|e| e.id).collect();
        assert_eq!(by_description, vec![1]);
    }

    #[test]
    fn filter_result_is_exactly_the_matching_subset() {
        let set = vec![
            payment(1, "101", "January-2024"),
            payment(2, "210", "February-2024"),
            payment(3, "305", "January-2025"),
            payment(4, "999", "Other"),
        ];
        for query in ["1", "jan", "2024", "x", "10"] {
            let hits = filter_records(&set, query);
            let needle = query.to_lowercase();
            for p in &set {
                let expected = p.apartment.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle);
                assert_eq!(hits.contains(p), expected, "query {query:?} record {}", p.id);
            }
        }
    }

    #[test]
    fn blank_equalities_issue_no_store_query() {
        let filter = RecordFilter {
            apartment: Some(" ".into()),
            description: None,
            text: Some("jan".into()),
        };
        assert!(filter.payment_query().is_none());
        assert!(!filter.is_empty());

        let exact = RecordFilter::exact("101", "January-2024");
        let query = exact.payment_query().unwrap();
        assert_eq!(query.apartment.as_deref(), Some("101"));
        assert_eq!(query.description.as_deref(), Some("January-2024"));
    }
}
