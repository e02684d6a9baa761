//! Orderings used when emitting records.
//!
//! All comparators are total: missing values have a fixed place instead of
//! comparing equal to everything.

use crate::response::{GeneSymbol, Significance};
use std::cmp::Ordering;
use togovar_query::Vocabulary;

/// Placeholder MedGen concepts ("not provided", "not specified"), listed in
/// the order they are emitted after all real conditions.
pub const MEDGEN_IGNORE: [&str; 2] = ["C3661900", "CN169374"];

fn ignore_rank(medgen: Option<&str>) -> Option<usize> {
    let medgen = medgen?;
    MEDGEN_IGNORE.iter().position(|m| *m == medgen)
}

/// Real concepts keep their relative order; placeholders go last.
pub fn medgen(a: &str, b: &str) -> Ordering {
    compare_ignore_rank(ignore_rank(Some(a)), ignore_rank(Some(b)))
}

fn compare_ignore_rank(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// `None` after every `Some`.
fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Larger counts first; a missing count after every present one.
fn count_descending(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Significance entries: rank of the first interpretation, then submission
/// count descending, then placeholder conditions last, then number of
/// MedGen concepts descending.
pub fn significance(significances: &Vocabulary, a: &Significance, b: &Significance) -> Ordering {
    let rank = |s: &Significance| {
        s.interpretations
            .first()
            .and_then(|key| significances.rank_of_key(key))
    };
    fn first_medgen(s: &Significance) -> Option<&str> {
        s.conditions.first().and_then(|c| c.medgen.as_deref())
    }
    let medgen_count = |s: &Significance| s.conditions.iter().filter(|c| c.medgen.is_some()).count();

    none_last(rank(a), rank(b))
        .then_with(|| count_descending(a.submission_count, b.submission_count))
        .then_with(|| {
            compare_ignore_rank(ignore_rank(first_medgen(a)), ignore_rank(first_medgen(b)))
        })
        .then_with(|| medgen_count(b).cmp(&medgen_count(a)))
}

/// Genes named in `order` first, in that order; the rest by symbol.
pub fn gene(order: &[u64], a: &GeneSymbol, b: &GeneSymbol) -> Ordering {
    let position = |g: &GeneSymbol| order.iter().position(|id| *id == g.id);
    match (position(a), position(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}
