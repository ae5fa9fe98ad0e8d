//! Product stock rules

use uuid::Uuid;
use crate::domain::value_objects::Quantity;

/// The slice of a product row that decides whether it can be sold.
#[derive(Clone, Debug)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub name: String,
    pub active: bool,
    pub stock: Quantity,
}

impl StockLevel {
    pub fn new(product_id: Uuid, name: impl Into<String>, active: bool, stock: i32) -> Self {
        Self { product_id, name: name.into(), active, stock: Quantity::new(stock.max(0) as u32) }
    }

    /// Returns the stock left after taking `requested` units.
    pub fn reserve(&self, requested: u32) -> Result<Quantity, ProductError> {
        if !self.active { return Err(ProductError::Unavailable { name: self.name.clone() }); }
        self.stock.subtract(requested).ok_or_else(|| ProductError::InsufficientInventory {
            name: self.name.clone(),
            available: self.stock.value(),
            requested,
        })
    }
}

/// Applies `adjust` to `current`, clamping at zero.
pub fn adjusted_stock(current: i32, adjust: i32) -> i32 { current.saturating_add(adjust).max(0) }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    Unavailable { name: String },
    InsufficientInventory { name: String, available: u32, requested: u32 },
}
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { name } => write!(f, "{} is no longer available", name),
            Self::InsufficientInventory { name, available, requested } => write!(f, "Insufficient stock for {}: {} requested, {} available", name, requested, available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_reserve() {
        let p = StockLevel::new(Uuid::new_v4(), "Mug", true, 5);
        assert_eq!(p.reserve(5).unwrap().value(), 0);
        assert_eq!(p.reserve(6), Err(ProductError::InsufficientInventory { name: "Mug".into(), available: 5, requested: 6 }));
    }
    #[test]
    fn test_inactive_is_unavailable() {
        let p = StockLevel::new(Uuid::new_v4(), "Mug", false, 5);
        assert!(matches!(p.reserve(1), Err(ProductError::Unavailable { .. })));
    }
    #[test]
    fn test_negative_stock_reads_as_zero() {
        let empty = StockLevel::new(Uuid::new_v4(), "Mug", true, -2);
        assert_eq!(empty.stock.value(), 0);
        assert!(matches!(empty.reserve(1), Err(ProductError::InsufficientInventory { available: 0, .. })));
        assert_eq!(adjusted_stock(3, -10), 0);
        assert_eq!(adjusted_stock(3, 4), 7);
    }
}
