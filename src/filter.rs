use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::cleaner::Dataset;
use crate::error::{Result, SalesError};
use crate::models::SaleRecord;

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SalesError::InvalidFilter(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    /// `None` keeps every category.
    pub categories: Option<BTreeSet<String>>,
    /// What an empty (but present) category selection means: every
    /// category when true, no rows when false.
    pub empty_selection_means_all: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            date_range: None,
            categories: None,
            empty_selection_means_all: true,
        }
    }
}

impl FilterSpec {
    fn category_allowed(&self, category: &str) -> bool {
        match &self.categories {
            None => true,
            Some(set) if set.is_empty() => self.empty_selection_means_all,
            Some(set) => set.contains(category),
        }
    }

    fn date_allowed(&self, date: Option<NaiveDate>) -> bool {
        match (self.date_range, date) {
            (Some(range), Some(d)) => range.contains(d),
            // Without a date column there is nothing to restrict on.
            _ => true,
        }
    }

    pub fn matches(&self, record: &SaleRecord) -> bool {
        self.date_allowed(record.date) && self.category_allowed(&record.category)
    }
}

/// Rows of a dataset that pass a filter. Borrows the dataset; nothing is
/// copied or modified.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    rows: Vec<&'a SaleRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn rows(&self) -> &[&'a SaleRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn apply<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> FilteredView<'a> {
    FilteredView {
        rows: dataset.records.iter().filter(|r| spec.matches(r)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(date: (i32, u32, u32), category: &str) -> SaleRecord {
        SaleRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            hour: None,
            product: "P".into(),
            quantity: 1.0,
            gross_amount: 10.0,
            category: category.into(),
            cost: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            records: vec![
                sale((2024, 1, 1), "X"),
                sale((2024, 1, 15), "Y"),
                sale((2024, 1, 31), "X"),
                sale((2024, 2, 1), "Z"),
            ],
            has_cost_data: false,
            has_date: true,
            rows_read: 4,
            rows_dropped: 0,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let ds = dataset();
        let spec = FilterSpec {
            date_range: Some(DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 31)).unwrap()),
            ..FilterSpec::default()
        };
        assert_eq!(apply(&ds, &spec).len(), 3);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = DateRange::new(ymd(2024, 2, 1), ymd(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, SalesError::InvalidFilter(_)));
    }

    #[test]
    fn test_category_and_date_combine() {
        let ds = dataset();
        let spec = FilterSpec {
            date_range: Some(DateRange::new(ymd(2024, 1, 10), ymd(2024, 2, 28)).unwrap()),
            categories: Some(["X".to_string(), "Z".to_string()].into_iter().collect()),
            ..FilterSpec::default()
        };
        let view = apply(&ds, &spec);
        let cats: Vec<_> = view.rows().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(cats, vec!["X", "Z"]);
    }

    #[test]
    fn test_empty_selection_policy() {
        let ds = dataset();
        let mut spec = FilterSpec {
            categories: Some(BTreeSet::new()),
            ..FilterSpec::default()
        };
        assert_eq!(apply(&ds, &spec).len(), 4);
        spec.empty_selection_means_all = false;
        assert!(apply(&ds, &spec).is_empty());
    }

    #[test]
    fn test_category_match_is_exact() {
        let ds = dataset();
        let spec = FilterSpec {
            categories: Some(["x".to_string()].into_iter().collect()),
            ..FilterSpec::default()
        };
        assert!(apply(&ds, &spec).is_empty());
    }
}
