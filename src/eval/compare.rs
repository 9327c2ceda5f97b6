//! Result-set comparison.
//!
//! Two result sets are equivalent when they hold the same rows with the same
//! multiplicities, regardless of order. Three strategies are tried in a fixed
//! order, each only when the data supports it:
//!
//! 1. `HashMultiset`: every value has a hash key; rows are counted and the
//!    counts compared. This is the intended semantics.
//! 2. `SortedByRepr`: some value is composite (an array) and cannot be hashed;
//!    both sides are sorted by their textual representation and compared
//!    pairwise.
//! 3. `Positional`: some value also lacks a textual representation; rows are
//!    compared in the order the database returned them.
//!
//! The last two are approximations kept for data that defeats hashing or
//! sorting. Do not reorder them.

use crate::db::{Row, Value, ValueKey};
use std::collections::HashMap;
use tracing::debug;

/// Strategy used to decide a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareStrategy {
    HashMultiset,
    SortedByRepr,
    Positional,
}

/// Result of comparing two result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    /// Strategy that produced the verdict; `None` when a precondition failed.
    pub strategy: Option<CompareStrategy>,
    pub equal: bool,
}

impl Comparison {
    fn rejected() -> Self {
        Self {
            strategy: None,
            equal: false,
        }
    }
}

/// Returns true if both result sets are present and equivalent.
pub fn compare(expected: Option<&[Row]>, actual: Option<&[Row]>) -> bool {
    compare_detailed(expected, actual).equal
}

/// Compares two result sets, reporting which strategy decided.
pub fn compare_detailed(expected: Option<&[Row]>, actual: Option<&[Row]>) -> Comparison {
    let (Some(expected), Some(actual)) = (expected, actual) else {
        return Comparison::rejected();
    };

    if expected.len() != actual.len() {
        return Comparison::rejected();
    }

    let comparison = if let Some(equal) = hash_multiset_eq(expected, actual) {
        Comparison {
            strategy: Some(CompareStrategy::HashMultiset),
            equal,
        }
    } else if let Some(equal) = sorted_repr_eq(expected, actual) {
        Comparison {
            strategy: Some(CompareStrategy::SortedByRepr),
            equal,
        }
    } else {
        Comparison {
            strategy: Some(CompareStrategy::Positional),
            equal: positional_eq(expected, actual),
        }
    };

    debug!(
        strategy = ?comparison.strategy,
        equal = comparison.equal,
        rows = expected.len(),
        "Compared result sets"
    );
    comparison
}

fn row_key(row: &Row) -> Option<Vec<ValueKey>> {
    row.iter().map(Value::hash_key).collect()
}

fn row_counts(rows: &[Row]) -> Option<HashMap<Vec<ValueKey>, usize>> {
    let mut counts = HashMap::with_capacity(rows.len());
    for row in rows {
        *counts.entry(row_key(row)?).or_insert(0) += 1;
    }
    Some(counts)
}

/// Multiset equality over hash keys; `None` if any value is unhashable.
fn hash_multiset_eq(expected: &[Row], actual: &[Row]) -> Option<bool> {
    let expected = row_counts(expected)?;
    let actual = row_counts(actual)?;
    Some(expected == actual)
}

fn row_repr(row: &Row) -> Option<String> {
    let parts = row
        .iter()
        .map(Value::sort_repr)
        .collect::<Option<Vec<_>>>()?;
    Some(format!("({})", parts.join(", ")))
}

fn sorted_by_repr(rows: &[Row]) -> Option<Vec<&Row>> {
    let mut keyed = rows
        .iter()
        .map(|row| row_repr(row).map(|repr| (repr, row)))
        .collect::<Option<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Some(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Pairwise equality after sorting by representation; `None` if any value
/// has no textual form.
fn sorted_repr_eq(expected: &[Row], actual: &[Row]) -> Option<bool> {
    let expected = sorted_by_repr(expected)?;
    let actual = sorted_by_repr(actual)?;
    Some(
        expected
            .iter()
            .zip(&actual)
            .all(|(a, b)| rows_match(a, b)),
    )
}

fn positional_eq(expected: &[Row], actual: &[Row]) -> bool {
    expected.iter().zip(actual).all(|(a, b)| rows_match(a, b))
}

fn rows_match(a: &Row, b: &Row) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}
