//! Storefront domain: pricing, stock and order vocabulary, free of I/O.
pub mod aggregates;
pub mod events;
pub mod value_objects;
