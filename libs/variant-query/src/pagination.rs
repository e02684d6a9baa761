//! `limit`/`offset` validation.
//!
//! Two pagination mechanisms exist: a numeric `offset` (position in the
//! sorted result list, bounded by [`MAX_ROWS`]) and a keyset cursor
//! `[chromosome, position, reference?, alternate?]` resuming after the last
//! variant of the previous page.

use crate::error::{ValidationErrors, BASE_FIELD};
use serde_json::{json, Value as JsonValue};

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1_000;
/// Deepest row reachable with a numeric offset.
pub const MAX_ROWS: u64 = 10_000;

/// Chromosome index used by the sort key for the non-numeric chromosomes.
pub fn canonicalize_chromosome(symbol: &str) -> Option<i64> {
    match symbol {
        "X" | "chrX" => Some(23),
        "Y" | "chrY" => Some(24),
        "MT" | "chrMT" => Some(25),
        _ => None,
    }
}

/// Sort key of the last variant seen; the next page starts after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorKey {
    pub chromosome_index: i64,
    pub position: i64,
    pub reference: String,
    pub alternate: String,
}

impl CursorKey {
    /// `[chromosome_index, position, reference, alternate]`.
    pub fn to_json(&self) -> JsonValue {
        json!([
            self.chromosome_index,
            self.position,
            self.reference,
            self.alternate
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offset {
    Position(u64),
    Cursor(CursorKey),
}

impl Offset {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Position(n) => json!(n),
            Self::Cursor(key) => key.to_json(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSpec {
    pub limit: u64,
    pub offset: Option<Offset>,
}

impl Default for PaginationSpec {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: None,
        }
    }
}

impl PaginationSpec {
    pub fn validate(
        limit: Option<&JsonValue>,
        offset: Option<&JsonValue>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let spec = Self::validate_into(limit, offset, &mut errors);
        match spec {
            Some(spec) if errors.is_empty() => Ok(spec),
            _ => Err(errors),
        }
    }

    /// Validate into a shared error sink so callers can report pagination
    /// and expression errors together.
    pub(crate) fn validate_into(
        limit: Option<&JsonValue>,
        offset: Option<&JsonValue>,
        errors: &mut ValidationErrors,
    ) -> Option<Self> {
        let limit = validate_limit(limit, errors);
        let offset = match offset {
            None | Some(JsonValue::Null) => Some(None),
            Some(JsonValue::Array(items)) => validate_cursor(items, errors).map(Some),
            Some(other) => validate_position(other, limit, errors).map(Some),
        };
        Some(Self {
            limit: limit?,
            offset: offset?,
        })
    }

    pub fn offset_position(&self) -> Option<u64> {
        match self.offset {
            Some(Offset::Position(n)) => Some(n),
            _ => None,
        }
    }

    pub fn cursor(&self) -> Option<&CursorKey> {
        match &self.offset {
            Some(Offset::Cursor(key)) => Some(key),
            _ => None,
        }
    }
}

/// Integer value of a JSON number or numeric string. Fractions truncate.
fn integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lenient integer coercion: leading digits of a string, `0` otherwise.
fn leading_integer(value: &JsonValue) -> i64 {
    if let Some(n) = integer(value) {
        return n;
    }
    let Some(s) = value.as_str() else {
        return 0;
    };
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

fn text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn validate_limit(limit: Option<&JsonValue>, errors: &mut ValidationErrors) -> Option<u64> {
    let Some(raw) = limit.filter(|v| !v.is_null()) else {
        return Some(DEFAULT_LIMIT);
    };
    let Some(n) = integer(raw) else {
        errors.add("limit", "is not a number");
        return None;
    };
    if n < 0 {
        errors.add("limit", "must be greater than or equal to 0");
        return None;
    }
    if n as u64 > MAX_LIMIT {
        errors.add("limit", format!("must be less than or equal to {MAX_LIMIT}"));
        return None;
    }
    Some(n as u64)
}

fn validate_position(
    raw: &JsonValue,
    limit: Option<u64>,
    errors: &mut ValidationErrors,
) -> Option<Offset> {
    let Some(n) = integer(raw) else {
        errors.add("offset", "must be a numeric or an array");
        return None;
    };
    if n < 0 {
        errors.add("offset", "must be greater than or equal to 0");
        return None;
    }
    let n = n as u64;
    // The upper bound depends on the limit; without a valid one only the
    // limit error is reported.
    let limit = limit?;
    let max = MAX_ROWS - limit;
    if n > max {
        errors.add(
            "offset",
            format!("must be less than or equal to {max}(= 10,000 - {limit})"),
        );
        return None;
    }
    Some(Offset::Position(n))
}

fn validate_cursor(items: &[JsonValue], errors: &mut ValidationErrors) -> Option<Offset> {
    let before = errors.len();
    if items.len() < 2 {
        errors.add(
            "offset",
            "must consist of at least 2 elements [chrom(index), pos]",
        );
    }
    if items.len() > 4 {
        errors.add(
            "offset",
            "must consist of at most 4 elements [chrom(index), pos, ref, alt]",
        );
    }

    let chromosome = match items.first() {
        Some(JsonValue::String(s)) => canonicalize_chromosome(s)
            .map(|index| json!(index))
            .unwrap_or_else(|| json!(s)),
        Some(other) => other.clone(),
        None => JsonValue::Null,
    };
    let position = items.get(1).cloned().unwrap_or(JsonValue::Null);

    let (chromosome_index, position) = match (integer(&chromosome), integer(&position)) {
        (Some(c), Some(p)) => (c, p),
        _ => {
            if items.len() > 4 {
                errors.add(BASE_FIELD, "First two elements of offset must be numeric");
            } else if items.len() >= 2 {
                // Short cursors that fail coercion are let through with the
                // same lenient coercion applied when the key is emitted.
                tracing::warn!(
                    offset = %JsonValue::Array(items.to_vec()),
                    "accepting offset cursor with non-numeric chromosome or position"
                );
            }
            (leading_integer(&chromosome), leading_integer(&position))
        }
    };

    if errors.len() > before {
        return None;
    }
    Some(Offset::Cursor(CursorKey {
        chromosome_index,
        position,
        reference: text(items.get(2)),
        alternate: text(items.get(3)),
    }))
}
