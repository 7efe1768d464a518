use ledgerline_core::{LineItem, format_amount, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Totals as the two-decimal strings that get submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedTotals {
    pub subtotal: String,
    pub tax_amount: String,
    pub total_amount: String,
}

pub fn line_totals(item: &LineItem) -> LineTotals {
    let subtotal = item.quantity * item.unit_price;
    let tax = subtotal * item.tax_rate.unwrap_or(Decimal::ZERO) / HUNDRED;

    LineTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// `total = subtotal - discount + tax`. The discount is not clamped, so a
/// discount larger than subtotal plus tax yields a negative total.
pub fn compute_totals(items: &[LineItem], discount: Decimal) -> DocumentTotals {
    let (subtotal, tax_amount) = items
        .iter()
        .map(line_totals)
        .fold((Decimal::ZERO, Decimal::ZERO), |(subtotal, tax), line| {
            (subtotal + line.subtotal, tax + line.tax)
        });

    DocumentTotals {
        subtotal,
        tax_amount,
        total_amount: subtotal - discount + tax_amount,
    }
}

impl DocumentTotals {
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_money(self.subtotal),
            tax_amount: round_money(self.tax_amount),
            total_amount: round_money(self.total_amount),
        }
    }

    pub fn formatted(&self) -> FormattedTotals {
        FormattedTotals {
            subtotal: format_amount(self.subtotal),
            tax_amount: format_amount(self.tax_amount),
            total_amount: format_amount(self.total_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    #[test]
    fn widget_with_discount() {
        let items = vec![LineItem::new("Widget", dec(2, 0), dec(50, 0)).with_tax_rate(dec(10, 0))];
        let totals = compute_totals(&items, dec(5, 0));

        assert_eq!(totals.subtotal, dec(100, 0));
        assert_eq!(totals.tax_amount, dec(10, 0));
        assert_eq!(totals.total_amount, dec(105, 0));
        assert_eq!(totals.formatted().total_amount, "105.00");
    }

    #[test]
    fn line_total_includes_tax() {
        let item = LineItem::new("Consulting", dec(3, 0), dec(1999, 2)).with_tax_rate(dec(75, 1));
        let line = line_totals(&item);

        assert_eq!(line.subtotal, dec(5997, 2));
        assert_eq!(line.total, item.quantity * item.unit_price * (Decimal::ONE + dec(75, 3)));
    }

    #[test]
    fn aggregates_across_items() {
        let items = vec![
            LineItem::new("A", dec(1, 0), dec(10, 0)).with_tax_rate(dec(20, 0)),
            LineItem::new("B", dec(4, 0), dec(25, 1)),
            LineItem::new("C", dec(2, 0), dec(100, 0)).with_tax_rate(dec(5, 0)),
        ];
        let totals = compute_totals(&items, Decimal::ZERO);
        let lines: Vec<LineTotals> = items.iter().map(line_totals).collect();

        assert_eq!(totals.subtotal, lines.iter().map(|l| l.subtotal).sum::<Decimal>());
        assert_eq!(totals.tax_amount, lines.iter().map(|l| l.tax).sum::<Decimal>());
        assert_eq!(totals.subtotal, dec(220, 0));
        assert_eq!(totals.tax_amount, dec(12, 0));
        assert_eq!(totals.total_amount, dec(232, 0));
    }

    #[test]
    fn discount_beyond_subtotal_goes_negative() {
        let items = vec![LineItem::new("Refund", dec(1, 0), dec(20, 0))];
        let totals = compute_totals(&items, dec(50, 0));

        assert_eq!(totals.total_amount, dec(-30, 0));
        assert_eq!(totals.formatted().total_amount, "-30.00");
    }

    #[test]
    fn empty_document_is_minus_discount() {
        let totals = compute_totals(&[], dec(3, 0));
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total_amount, dec(-3, 0));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let items = vec![LineItem::new("Fraction", dec(1, 0), dec(1, 0)).with_tax_rate(dec(5, 1))];
        let totals = compute_totals(&items, Decimal::ZERO).rounded();
        assert_eq!(totals.tax_amount, dec(1, 2));
        assert_eq!(totals.formatted().tax_amount, "0.01");
    }
}
