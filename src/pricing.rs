//! Trade-in price estimation.
//!
//! Quotes come from a static per-model base value multiplied by a
//! condition factor. The quote is only a starting point; the final offer
//! is set by a human evaluation after pickup.

/// Base trade-in values by model keyword, checked in order. Longer, more
/// specific keywords come first so "iphone 15" does not match "iphone".
const BASE_VALUES: &[(&str, f64)] = &[
    ("iphone 15", 620.0),
    ("iphone 14", 480.0),
    ("iphone 13", 360.0),
    ("iphone", 220.0),
    ("galaxy s23", 420.0),
    ("galaxy s22", 300.0),
    ("galaxy tab", 260.0),
    ("galaxy", 180.0),
    ("pixel 8", 340.0),
    ("pixel", 160.0),
    ("macbook pro", 900.0),
    ("macbook air", 650.0),
    ("macbook", 500.0),
    ("ipad pro", 520.0),
    ("ipad", 280.0),
    ("surface", 380.0),
];

/// Multiplier applied to the base value per cosmetic/functional grade.
fn condition_factor(condition: &str) -> f64 {
    match condition.trim().to_ascii_uppercase().as_str() {
        "A" => 0.85,
        "B" => 0.70,
        "C" => 0.50,
        _ => 0.50,
    }
}

/// Estimate a trade-in price for a model description and condition grade.
/// Returns `None` when the model matches nothing in the table.
pub fn estimate_price(model_text: &str, condition: &str) -> Option<f64> {
    let normalized = model_text.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }

    let base = BASE_VALUES
        .iter()
        .find(|(keyword, _)| normalized.contains(keyword))
        .map(|(_, value)| *value)?;

    let quote = base * condition_factor(condition);
    // Round to whole dollars; quotes are indicative, not invoices.
    Some(quote.round())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_models_win_over_generic() {
        // "iPhone 15 Pro Max" must hit the iphone 15 row, not plain iphone
        assert_eq!(estimate_price("iPhone 15 Pro Max", "A"), Some(527.0));
        assert_eq!(estimate_price("iPhone SE", "A"), Some(187.0));
    }

    #[test]
    fn condition_scales_the_quote() {
        let a = estimate_price("MacBook Air M2", "A").unwrap();
        let b = estimate_price("MacBook Air M2", "B").unwrap();
        let c = estimate_price("MacBook Air M2", "C").unwrap();
        assert!(a > b && b > c);
        assert_eq!(a, (650.0_f64 * 0.85).round());
    }

    #[test]
    fn unknown_condition_uses_lowest_factor() {
        assert_eq!(
            estimate_price("iPad Pro", "mint?!"),
            estimate_price("iPad Pro", "C")
        );
    }

    #[test]
    fn unknown_model_has_no_quote() {
        assert_eq!(estimate_price("Nokia 3310", "A"), None);
        assert_eq!(estimate_price("", "A"), None);
        assert_eq!(estimate_price("   ", "A"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            estimate_price("GALAXY S23 Ultra", "B"),
            Some((420.0_f64 * 0.70).round())
        );
    }
}
