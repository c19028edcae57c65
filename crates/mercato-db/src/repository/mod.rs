//! # Repositories
//!
//! One repository per aggregate. Each repository owns a clone of the pool
//! for standalone reads, and additionally exposes module-level functions
//! taking `&mut SqliteConnection` for the operations that must share a
//! transaction with business checks (rule overlap validation, cart merges).

pub mod cart;
pub mod product;
pub mod rule;
