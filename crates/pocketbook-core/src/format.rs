//! Rupee formatting with Indian digit grouping

/// Format an amount as rupees: `₹1,00,000`, `₹1,234.5`
///
/// Keeps at most `max_fraction_digits` decimals and trims trailing zeros.
/// Non-finite input renders as `₹0`.
pub fn format_inr(amount: f64, max_fraction_digits: usize) -> String {
    format!("₹{}", group_indian(amount, max_fraction_digits))
}

/// Whole-rupee shorthand used by most chat messages
pub fn format_inr_whole(amount: f64) -> String {
    format_inr(amount, 0)
}

/// Indian grouping without the currency sign
pub fn group_indian(amount: f64, max_fraction_digits: usize) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let rendered = format!("{:.*}", max_fraction_digits, amount.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i.to_string(), f.trim_end_matches('0').to_string()),
        None => (rendered.clone(), String::new()),
    };

    let grouped = group_digits(&int_part);
    let negative = amount < 0.0 && (int_part != "0" || !frac_part.is_empty());

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(&frac_part);
    }
    out
}

/// Last three digits, then groups of two: 12345678 -> 1,23,45,678
fn group_digits(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_amounts() {
        assert_eq!(format_inr_whole(0.0), "₹0");
        assert_eq!(format_inr_whole(1.0), "₹1");
        assert_eq!(format_inr_whole(999.0), "₹999");
    }

    #[test]
    fn test_indian_grouping() {
        assert_eq!(format_inr_whole(1100.0), "₹1,100");
        assert_eq!(format_inr_whole(100000.0), "₹1,00,000");
        assert_eq!(format_inr_whole(12345678.0), "₹1,23,45,678");
    }

    #[test]
    fn test_fraction_trimming() {
        assert_eq!(format_inr(1234.50, 2), "₹1,234.5");
        assert_eq!(format_inr(1234.00, 2), "₹1,234");
        assert_eq!(format_inr(0.456, 2), "₹0.46");
    }

    #[test]
    fn test_negative_and_non_finite() {
        assert_eq!(format_inr_whole(-2500.0), "₹-2,500");
        assert_eq!(format_inr_whole(f64::NAN), "₹0");
        assert_eq!(format_inr_whole(-0.2), "₹0");
    }
}
