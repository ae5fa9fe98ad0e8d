//! Cart Aggregate

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::Money;

/// A priced cart assembled at quote/checkout time from catalog rows.
#[derive(Clone, Debug)]
pub struct Cart {
    items: Vec<CartItem>,
    currency: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// Store-wide pricing knobs, read from the `settings` table.
#[derive(Clone, Debug, PartialEq)]
pub struct PricingRules {
    pub tax_rate: Decimal,
    pub flat_shipping: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self { tax_rate: Decimal::ZERO, flat_shipping: Decimal::ZERO, free_shipping_threshold: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self { items: vec![], currency: currency.to_uppercase() }
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if item.unit_price.currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    pub fn totals(&self, rules: &PricingRules) -> Totals {
        let subtotal = self.subtotal();
        let free = rules.free_shipping_threshold.map_or(false, |t| subtotal.amount() >= t);
        let shipping = if self.is_empty() || free { Decimal::ZERO } else { rules.flat_shipping };
        let tax = subtotal.percent_of(rules.tax_rate).amount();
        Totals {
            subtotal: subtotal.amount(),
            shipping,
            tax,
            total: subtotal.amount() + shipping + tax,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { InvalidQuantity, CurrencyMismatch }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Uuid, qty: u32, cents: i64) -> CartItem {
        CartItem { product_id: id, name: "Widget".into(), quantity: qty, unit_price: Money::new(Decimal::new(cents, 2), "USD") }
    }

    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new("USD");
        cart.add_item(item(p1, 2, 1000)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        cart.add_item(item(p1, 1, 1000)).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert_eq!(cart.add_item(item(p1, 0, 1000)), Err(CartError::InvalidQuantity));
        let chf = CartItem { unit_price: Money::new(Decimal::ONE, "CHF"), ..item(Uuid::new_v4(), 1, 100) };
        assert_eq!(cart.add_item(chf), Err(CartError::CurrencyMismatch));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_totals_with_tax_and_shipping() {
        let mut cart = Cart::new("USD");
        cart.add_item(item(Uuid::new_v4(), 3, 1999)).unwrap();
        let rules = PricingRules { tax_rate: Decimal::new(8, 2), flat_shipping: Decimal::new(499, 2), free_shipping_threshold: Some(Decimal::new(100, 0)) };
        let totals = cart.totals(&rules);
        assert_eq!(totals.subtotal, Decimal::new(5997, 2));
        assert_eq!(totals.shipping, Decimal::new(499, 2));
        assert_eq!(totals.tax, Decimal::new(480, 2));
        assert_eq!(totals.total, Decimal::new(6976, 2));
    }

    #[test]
    fn test_free_shipping_threshold_is_inclusive() {
        let mut cart = Cart::new("USD");
        cart.add_item(item(Uuid::new_v4(), 1, 5000)).unwrap();
        let rules = PricingRules { flat_shipping: Decimal::new(5, 0), free_shipping_threshold: Some(Decimal::new(50, 0)), ..Default::default() };
        assert_eq!(cart.totals(&rules).shipping, Decimal::ZERO);
        assert_eq!(Cart::new("USD").totals(&rules).total, Decimal::ZERO);
    }
}
