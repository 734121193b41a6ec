//! # Cart Summary
//!
//! Pure pricing over a cart's item list. Nothing here is cached: callers
//! recompute the summary on every read so quantity edits and removals can
//! never leave a stale total behind.
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! tax      = subtotal × 16%
//! shipping = 0 if subtotal is 0 or ≥ 1000, else 150
//! discount = 0
//! total    = subtotal + tax + shipping - discount
//! ```

use crate::cart::CartItem;
use crate::product::{Currency, Price};
use serde::{Deserialize, Serialize};

/// Flat tax rate (16% IVA), in percent
pub const TAX_RATE_PERCENT: i64 = 16;

/// Subtotal at or above which shipping is waived, in currency units
pub const FREE_SHIPPING_THRESHOLD: f64 = 1000.0;

/// Flat shipping fee below the threshold, in currency units
pub const FLAT_SHIPPING: f64 = 150.0;

/// Derived monetary breakdown of a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    /// Always zero until coupons exist
    pub discount: Price,
    pub total: Price,
    /// Sum of all item quantities
    pub item_count: u32,
}

impl CartSummary {
    /// All-zero summary
    pub fn empty(currency: Currency) -> Self {
        let zero = Price::zero(currency);
        Self {
            subtotal: zero,
            tax: zero,
            shipping: zero,
            discount: zero,
            total: zero,
            item_count: 0,
        }
    }

    /// Compute the summary for `items`.
    ///
    /// Amounts are summed in minor units, so each field is rounded to the
    /// currency's precision on its own. The cart is assumed to be priced in a
    /// single currency, taken from the first item.
    pub fn calculate(items: &[CartItem]) -> Self {
        let currency = items
            .first()
            .map(|item| item.product.currency())
            .unwrap_or_default();

        let subtotal = Price::from_cents(
            items
                .iter()
                .map(|item| item.line_total().amount)
                .fold(0i64, i64::saturating_add),
            currency,
        );
        let tax = calculate_tax(subtotal);
        let shipping = calculate_shipping(subtotal);
        let discount = Price::zero(currency);
        let total = Price::from_cents(
            subtotal
                .amount
                .saturating_add(tax.amount)
                .saturating_add(shipping.amount)
                .saturating_sub(discount.amount),
            currency,
        );

        Self {
            subtotal,
            tax,
            shipping,
            discount,
            total,
            item_count: item_count(items),
        }
    }

    pub fn is_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}

/// Sum of quantities
pub fn item_count(items: &[CartItem]) -> u32 {
    items
        .iter()
        .map(|item| item.quantity)
        .fold(0u32, u32::saturating_add)
}

/// Tax on a subtotal, rounded half-up to the minor unit
pub fn calculate_tax(subtotal: Price) -> Price {
    let scaled = subtotal.amount.saturating_mul(TAX_RATE_PERCENT);
    Price::from_cents(scaled.saturating_add(50).div_euclid(100), subtotal.currency)
}

/// Shipping for a subtotal
pub fn calculate_shipping(subtotal: Price) -> Price {
    let currency = subtotal.currency;
    if subtotal.amount == 0 {
        return Price::zero(currency);
    }
    if subtotal.amount >= currency.to_smallest_unit(FREE_SHIPPING_THRESHOLD) {
        return Price::zero(currency);
    }
    Price::new(FLAT_SHIPPING, currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::product::Product;

    fn item(id: &str, price: f64, quantity: u32) -> CartItem {
        CartItem::new(Product::simple(id, id, price, Currency::MXN), quantity)
    }

    #[test]
    fn test_summary_additivity() {
        let items = vec![item("a", 100.0, 2), item("b", 50.0, 1)];
        let summary = CartSummary::calculate(&items);

        assert_eq!(summary.subtotal, Price::new(250.0, Currency::MXN));
        assert_eq!(summary.tax, Price::new(40.0, Currency::MXN));
        assert_eq!(summary.shipping, Price::new(150.0, Currency::MXN));
        assert!(summary.discount.is_zero());
        assert_eq!(summary.total, Price::new(440.0, Currency::MXN));
        assert_eq!(summary.item_count, 3);
    }

    #[test]
    fn test_free_shipping_threshold() {
        let at_threshold = CartSummary::calculate(&[item("a", 1000.0, 1)]);
        assert!(at_threshold.shipping.is_zero());
        assert!(at_threshold.is_free_shipping());
        assert_eq!(at_threshold.total, Price::new(1160.0, Currency::MXN));

        let just_below = CartSummary::calculate(&[item("a", 999.99, 1)]);
        assert_eq!(just_below.shipping, Price::new(150.0, Currency::MXN));
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::calculate(&[]);
        assert_eq!(summary, CartSummary::empty(Currency::MXN));
        assert!(summary.total.is_zero());
        assert_eq!(summary.item_count, 0);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 0.16 × 3.13 = 0.5008
        assert_eq!(calculate_tax(Price::new(3.13, Currency::MXN)).amount, 50);
        // 0.16 × 0.5 = 0.08
        assert_eq!(calculate_tax(Price::new(0.5, Currency::MXN)).amount, 8);
        // 0.16 × 99.99 = 15.9984
        assert_eq!(calculate_tax(Price::new(99.99, Currency::MXN)).amount, 1600);
    }

    #[test]
    fn test_total_matches_components() {
        let items = vec![item("a", 333.33, 3), item("b", 12.5, 7)];
        let s = CartSummary::calculate(&items);
        assert_eq!(
            s.total.amount,
            s.subtotal.amount + s.tax.amount + s.shipping.amount - s.discount.amount
        );
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let items = vec![
            item("a", 100_000_000.0, u32::MAX),
            item("b", 1.0, u32::MAX),
        ];
        let s = CartSummary::calculate(&items);

        assert_eq!(s.subtotal.amount, i64::MAX);
        assert_eq!(s.tax.amount, i64::MAX / 100);
        assert!(s.shipping.is_zero());
        assert_eq!(s.total.amount, i64::MAX);
        assert_eq!(s.item_count, u32::MAX);
    }
}
