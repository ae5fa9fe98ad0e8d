//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{adjusted_stock, ProductError, StockLevel};
pub use order::{generate_order_number, OrderStatus, PaymentMethod, PaymentStatus};
pub use cart::{Cart, CartError, CartItem, PricingRules, Totals};
