//! Proposal pricing in integer minor currency units (cents). No floating point is used
//! anywhere on this path.

use serde::{Deserialize, Serialize};

use crate::domain::proposal::{LineItem, PackageId, Proposal, ProposalPackage};
use crate::errors::PricingError;

pub fn line_total(quantity: i64, unit_cents: i64) -> Result<i64, PricingError> {
    if quantity < 1 {
        return Err(PricingError::InvalidQuantity(quantity));
    }
    if unit_cents < 0 {
        return Err(PricingError::NegativeUnitPrice(unit_cents));
    }
    quantity.checked_mul(unit_cents).ok_or(PricingError::Overflow)
}

/// Sum of item totals. Callers enforce that a package has at least one item.
pub fn package_subtotal(items: &[LineItem]) -> Result<i64, PricingError> {
    items.iter().try_fold(0_i64, |sum, item| {
        sum.checked_add(item.total_cents).ok_or(PricingError::Overflow)
    })
}

/// Sum of package subtotals. Only meaningful for billing when the packages are not
/// alternatives of each other; see [`Proposal::amount_due`].
pub fn proposal_grand_total(packages: &[ProposalPackage]) -> Result<i64, PricingError> {
    packages
        .iter()
        .try_fold(0_i64, |sum, package| {
            sum.checked_add(package.subtotal_cents).ok_or(PricingError::Overflow)
        })
}

/// Half of the total, rounded up so the deposit never under-covers half.
pub fn deposit_amount(total_cents: i64) -> i64 {
    total_cents.div_euclid(2) + total_cents.rem_euclid(2)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageQuote {
    pub package_id: PackageId,
    pub name: String,
    pub currency: String,
    pub subtotal_cents: i64,
    pub deposit_cents: i64,
}

/// Each package priced on its own, in presentation order.
pub fn package_quotes(proposal: &Proposal) -> Vec<PackageQuote> {
    proposal
        .packages
        .iter()
        .map(|package| PackageQuote {
            package_id: package.id.clone(),
            name: package.name.clone(),
            currency: package.currency.clone(),
            subtotal_cents: package.subtotal_cents,
            deposit_cents: deposit_amount(package.subtotal_cents),
        })
        .collect()
}

/// Parses a loosely typed dollar amount ("$1,250.5") into cents. Characters other than digits
/// and `.` are ignored, parsing stops at a second `.`, and the third decimal rounds half up.
/// Input without any digits yields zero.
pub fn parse_dollars(input: &str) -> i64 {
    let cleaned: String = input.chars().filter(|ch| ch.is_ascii_digit() || *ch == '.').collect();
    let mut parts = cleaned.split('.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();

    if whole.is_empty() && fraction.is_empty() {
        return 0;
    }

    let mut cents: i64 = 0;
    for digit in whole.bytes().chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(2)) {
        let next =
            cents.checked_mul(10).and_then(|value| value.checked_add(i64::from(digit - b'0')));
        cents = match next {
            Some(value) => value,
            None => return i64::MAX,
        };
    }

    let round_up = fraction.as_bytes().get(2).is_some_and(|digit| *digit >= b'5');
    if round_up {
        cents = cents.saturating_add(1);
    }
    cents
}

/// Renders cents for display, e.g. `format_cents(123450, "USD") == "$1,234.50"`.
pub fn format_cents(cents: i64, currency: &str) -> String {
    let symbol = match currency {
        "USD" => "$".to_owned(),
        "EUR" => "€".to_owned(),
        "GBP" => "£".to_owned(),
        other => format!("{other} "),
    };
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    let whole = (magnitude / 100).to_string();
    let fraction = magnitude % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{symbol}{grouped}.{fraction:02}")
}

#[cfg(test)]
mod tests {
    use super::{
        deposit_amount, format_cents, line_total, package_subtotal, parse_dollars,
        proposal_grand_total,
    };
    use crate::domain::proposal::{LineItem, LineItemId, PackageId, ProposalPackage};
    use crate::errors::PricingError;

    fn item(quantity: i64, unit_cents: i64) -> LineItem {
        LineItem {
            id: LineItemId::generate(),
            title: "Linen".to_owned(),
            description: None,
            quantity,
            unit_cents,
            total_cents: line_total(quantity, unit_cents).expect("valid line"),
            sort_order: 0,
        }
    }

    #[test]
    fn line_total_is_exact_integer_product() {
        assert_eq!(line_total(2, 5_000), Ok(10_000));
        assert_eq!(line_total(1, 0), Ok(0));
        assert_eq!(line_total(3, 333), Ok(999));
        for quantity in 1..=25_i64 {
            for unit_cents in [0_i64, 1, 99, 4_999, 1_000_001] {
                assert_eq!(line_total(quantity, unit_cents), Ok(quantity * unit_cents));
            }
        }
    }

    #[test]
    fn line_total_rejects_out_of_range_inputs() {
        assert_eq!(line_total(0, 100), Err(PricingError::InvalidQuantity(0)));
        assert_eq!(line_total(2, -1), Err(PricingError::NegativeUnitPrice(-1)));
        assert_eq!(line_total(i64::MAX, 2), Err(PricingError::Overflow));
    }

    #[test]
    fn subtotal_sums_item_totals() {
        let items = vec![item(2, 5_000), item(1, 10_000)];
        assert_eq!(package_subtotal(&items), Ok(20_000));
        assert_eq!(package_subtotal(&[]), Ok(0));
    }

    #[test]
    fn grand_total_sums_package_subtotals() {
        let package = |subtotal_cents| ProposalPackage {
            id: PackageId::generate(),
            name: "Option".to_owned(),
            description: None,
            currency: "USD".to_owned(),
            subtotal_cents,
            items: Vec::new(),
        };
        assert_eq!(proposal_grand_total(&[package(20_000), package(5)]), Ok(20_005));
        assert_eq!(
            proposal_grand_total(&[package(i64::MAX), package(1)]),
            Err(PricingError::Overflow)
        );
    }

    #[test]
    fn deposit_rounds_up() {
        assert_eq!(deposit_amount(101), 51);
        assert_eq!(deposit_amount(100), 50);
        assert_eq!(deposit_amount(1), 1);
        assert_eq!(deposit_amount(0), 0);
        assert_eq!(deposit_amount(i64::MAX), i64::MAX / 2 + 1);
    }

    #[test]
    fn parse_dollars_handles_form_input() {
        assert_eq!(parse_dollars("1250"), 125_000);
        assert_eq!(parse_dollars("$1,250.5"), 125_050);
        assert_eq!(parse_dollars("19.99"), 1_999);
        assert_eq!(parse_dollars("0.005"), 1);
        assert_eq!(parse_dollars("0.004"), 0);
        assert_eq!(parse_dollars(".75"), 75);
        assert_eq!(parse_dollars("1.2.3"), 120);
        assert_eq!(parse_dollars("abc"), 0);
        assert_eq!(parse_dollars(""), 0);
    }

    #[test]
    fn format_cents_groups_thousands() {
        assert_eq!(format_cents(123_450, "USD"), "$1,234.50");
        assert_eq!(format_cents(5, "USD"), "$0.05");
        assert_eq!(format_cents(100_000_000, "EUR"), "€1,000,000.00");
        assert_eq!(format_cents(-2_500, "USD"), "-$25.00");
        assert_eq!(format_cents(999, "CAD"), "CAD 9.99");
    }
}
