//! Year-indexed time series shared by every simulation component.
//!
//! A [`YearlySeries`] stores one record per calendar year over a contiguous
//! range. The year key is implicit (`start_year + index`), so gaps and
//! duplicates are unrepresentable once a series exists.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar year key.
pub type Year = i32;

/// Errors raised when assembling a series from explicit `(year, record)` pairs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Duplicate year {0} in series")]
    DuplicateYear(Year),
    #[error("Gap in series: expected year {expected}, found {found}")]
    Gap { expected: Year, found: Year },
}

/// An ordered, gap-free sequence of yearly records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySeries<R> {
    start_year: Year,
    rows: Vec<R>,
}

impl<R> YearlySeries<R> {
    /// Creates a series whose first record belongs to `start_year`.
    pub fn new(start_year: Year, rows: Vec<R>) -> Self {
        Self { start_year, rows }
    }

    /// Creates an empty series anchored at `start_year`.
    pub fn empty(start_year: Year) -> Self {
        Self::new(start_year, Vec::new())
    }

    /// Builds a series by evaluating `f` for every year in `first..=last`.
    pub fn from_fn<F>(first: Year, last: Year, mut f: F) -> Self
    where
        F: FnMut(Year) -> R,
    {
        let rows = if last < first {
            Vec::new()
        } else {
            (first..=last).map(&mut f).collect()
        };
        Self::new(first, rows)
    }

    /// Builds a series from explicit pairs, rejecting gaps and duplicates.
    ///
    /// Pairs must already be in ascending year order.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (Year, R)>,
    {
        let mut iter = pairs.into_iter();
        let Some((start_year, first)) = iter.next() else {
            return Ok(Self::empty(0));
        };

        let mut rows = vec![first];
        let mut expected = start_year + 1;
        for (year, row) in iter {
            if year < expected {
                return Err(SeriesError::DuplicateYear(year));
            }
            if year > expected {
                return Err(SeriesError::Gap { expected, found: year });
            }
            rows.push(row);
            expected += 1;
        }

        Ok(Self { start_year, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First year covered, or `None` for an empty series.
    pub fn first_year(&self) -> Option<Year> {
        (!self.rows.is_empty()).then_some(self.start_year)
    }

    /// Last year covered, or `None` for an empty series.
    pub fn last_year(&self) -> Option<Year> {
        (!self.rows.is_empty()).then(|| self.start_year + self.rows.len() as Year - 1)
    }

    /// Returns the record for `year`, if covered.
    pub fn get(&self, year: Year) -> Option<&R> {
        if year < self.start_year {
            return None;
        }
        self.rows.get((year - self.start_year) as usize)
    }

    /// Iterates over `(year, record)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Year, &R)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(move |(i, row)| (self.start_year + i as Year, row))
    }

    /// Iterates over the covered years.
    pub fn years(&self) -> impl Iterator<Item = Year> + '_ {
        (0..self.rows.len()).map(move |i| self.start_year + i as Year)
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Maps each record to a new one, keeping the year key unchanged.
    pub fn map<T, F>(&self, mut f: F) -> YearlySeries<T>
    where
        F: FnMut(Year, &R) -> T,
    {
        YearlySeries {
            start_year: self.start_year,
            rows: self.iter().map(|(year, row)| f(year, row)).collect(),
        }
    }
}

/// A record that carries a mass flow (tonnes) on to the next component.
pub trait MassFlow {
    /// Mass leaving this component in the record's year (t).
    fn output_t(&self) -> f64;
}

impl MassFlow for f64 {
    fn output_t(&self) -> f64 {
        *self
    }
}

/// A record that can be flattened into named numeric columns for export.
pub trait TabularRecord: Default {
    /// Column names, in the same order as [`TabularRecord::values`].
    const COLUMNS: &'static [&'static str];

    /// Column values for this record.
    fn values(&self) -> Vec<f64>;
}
