//! Bill records produced by the receipt and chat ingestion paths

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Category assigned when no mapping exists for a description
pub const UNKNOWN_CATEGORY: &str = "-";

/// One purchase event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    /// Total in minor units (para, cents)
    pub total_amount: i64,
    /// Local wall-clock time of the purchase
    pub bought_at: NaiveDateTime,
    pub description: String,
    pub category: String,
    /// Receipt lines; empty for chat bills
    pub items: Vec<Item>,
}

/// One receipt line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub name: String,
    /// Unit price in minor units
    pub price: i64,
    /// Quantity; fractional for weighed goods
    pub count: f64,
    /// Line total in minor units, as printed on the receipt
    pub sum: i64,
}

impl Bill {
    /// Create a bill without items
    pub fn new(
        total_amount: i64,
        bought_at: NaiveDateTime,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            total_amount,
            bought_at,
            description: description.into(),
            category: category.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    /// Calendar day the bill's exchange rates are taken for
    pub fn rate_date(&self) -> NaiveDate {
        self.bought_at.date()
    }

    /// Sum of the printed line totals; `None` if it does not fit in i64
    pub fn items_total(&self) -> Option<i64> {
        self.items
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(item.sum))
    }

    /// True when the total agrees with the line items (or there are none)
    pub fn is_consistent(&self) -> bool {
        self.items.is_empty() || self.items_total() == Some(self.total_amount)
    }
}
