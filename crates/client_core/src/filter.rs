//! Conjunctive filter terms built from the screen's search and filter inputs.

use std::ops::Bound;

use chrono::NaiveDate;

use crate::record::Record;

/// Inclusive date window over one date field; a missing bound is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub field: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(field: impl Into<String>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            field: field.into(),
            from,
            to,
        }
    }

    fn contains(&self, value: NaiveDate) -> bool {
        self.from.map_or(true, |from| value >= from) && self.to.map_or(true, |to| value <= to)
    }
}

/// Numeric window over one field. Inclusive by default, but bucket filters
/// such as "price under 50" need exclusive edges.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberRange {
    pub field: String,
    pub lower: Bound<f64>,
    pub upper: Bound<f64>,
}

impl NumberRange {
    pub fn inclusive(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            field: field.into(),
            lower: min.map_or(Bound::Unbounded, Bound::Included),
            upper: max.map_or(Bound::Unbounded, Bound::Included),
        }
    }

    pub fn bounded(field: impl Into<String>, lower: Bound<f64>, upper: Bound<f64>) -> Self {
        Self {
            field: field.into(),
            lower,
            upper,
        }
    }

    fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Bound::Included(min) => value >= min,
            Bound::Excluded(min) => value > min,
            Bound::Unbounded => true,
        };
        let below = match self.upper {
            Bound::Included(max) => value <= max,
            Bound::Excluded(max) => value < max,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// Search text plus categorical, date and numeric terms, all ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    search: String,
    categories: Vec<(String, String)>,
    dates: Vec<DateRange>,
    numbers: Vec<NumberRange>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into().trim().to_lowercase();
        self
    }

    /// Equality on a categorical field. Empty values are kept but never filter.
    pub fn category(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.categories.push((key.into(), value.into()));
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.dates.push(range);
        self
    }

    pub fn number_range(mut self, range: NumberRange) -> Self {
        self.numbers.push(range);
        self
    }

    /// True when no term can reject a record.
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.categories.iter().all(|(_, value)| value.trim().is_empty())
            && self
                .dates
                .iter()
                .all(|range| range.from.is_none() && range.to.is_none())
            && self.numbers.iter().all(|range| {
                matches!(range.lower, Bound::Unbounded) && matches!(range.upper, Bound::Unbounded)
            })
    }

    pub fn matches<T: Record>(&self, item: &T) -> bool {
        self.matches_search(item)
            && self.matches_categories(item)
            && self.matches_dates(item)
            && self.matches_numbers(item)
    }

    pub fn into_predicate<T: Record>(self) -> impl Fn(&T) -> bool + Send + Sync + 'static {
        move |item: &T| self.matches(item)
    }

    fn matches_search<T: Record>(&self, item: &T) -> bool {
        if self.search.is_empty() {
            return true;
        }
        item.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&self.search))
    }

    fn matches_categories<T: Record>(&self, item: &T) -> bool {
        self.categories.iter().all(|(key, expected)| {
            let expected = expected.trim();
            if expected.is_empty() {
                return true;
            }
            item.category(key)
                .map_or(false, |actual| actual.as_ref() == expected)
        })
    }

    fn matches_dates<T: Record>(&self, item: &T) -> bool {
        self.dates.iter().all(|range| {
            if range.from.is_none() && range.to.is_none() {
                return true;
            }
            item.date(&range.field)
                .map_or(false, |value| range.contains(value))
        })
    }

    fn matches_numbers<T: Record>(&self, item: &T) -> bool {
        self.numbers.iter().all(|range| {
            if matches!(range.lower, Bound::Unbounded) && matches!(range.upper, Bound::Unbounded) {
                return true;
            }
            item.number(&range.field)
                .map_or(false, |value| range.contains(value))
        })
    }
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
