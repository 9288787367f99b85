// Ordering policy for every sorted search.
//
// The value expression is evaluated once per card in a sub-select as `srt`, then
// ordered by: blank (NULL or '') last, the comparison key, card id. Descending
// order is applied afterwards by reversing the non-blank prefix, so blanks stay
// last in both directions.

use crate::registry::Collation;

/// Join used by every card search; sort expressions may reference `c` and `n`.
pub const CARD_SOURCE: &str = "cards c JOIN notes n ON n.id = c.nid";

fn collate(collation: Collation) -> &'static str {
    match collation {
        Collation::NoCase => " COLLATE NOCASE",
        Collation::Binary => "",
    }
}

/// Comparison key over `srt`. Numeric-aware keys cast text that is one whole
/// number (`is_bare_number`) to REAL so "9" < "10"; dates, phone numbers and
/// everything else keep comparing as text, after all numbers.
pub fn comparison_key(collation: Collation, numeric_aware: bool) -> String {
    if numeric_aware {
        format!(
            "CASE WHEN typeof(srt) IN ('integer', 'real') THEN srt \
             WHEN is_bare_number(srt) THEN CAST(srt AS REAL) \
             ELSE srt END{}",
            collate(collation)
        )
    } else {
        format!("srt{}", collate(collation))
    }
}

/// Full ORDER BY list for the ascending query.
pub fn order_terms(collation: Collation, numeric_aware: bool) -> String {
    format!("srt IS NULL, srt = '', {}, id", comparison_key(collation, numeric_aware))
}

/// `SELECT id, srt ... ORDER BY ...` for `value_expr` restricted to `predicate`.
pub fn ordered_query(value_expr: &str, predicate: &str, collation: Collation, numeric_aware: bool) -> String {
    format!(
        "SELECT id, srt FROM (SELECT c.id AS id, ({}) AS srt FROM {} WHERE {}) ORDER BY {}",
        value_expr,
        CARD_SOURCE,
        predicate,
        order_terms(collation, numeric_aware)
    )
}

/// Query used when there is nothing to sort by.
pub fn default_query(predicate: &str) -> String {
    format!("SELECT c.id FROM {} WHERE {} ORDER BY c.id", CARD_SOURCE, predicate)
}
