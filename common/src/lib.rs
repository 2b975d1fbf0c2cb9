//! Cambio Common Types
//!
//! This crate contains shared types used across the Cambio exchange core,
//! including currency codes and metadata, exchange rate records, order
//! identifiers and the error taxonomy.

pub mod currency;
pub mod error;
pub mod identifiers;

pub use currency::*;
pub use error::*;
pub use identifiers::*;
