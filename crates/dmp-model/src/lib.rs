//! DMP Model - data product records and identifiers
//!
//! Pure types shared by the catalog store and the HTTP surface:
//! - [`Product`] / [`ProductInput`]: stored and inbound record shapes
//! - [`IdAllocator`]: sequential `DP<NNNN>` id generation
//! - [`ValidationError`]: inbound payload rejection
//!
//! # Example
//!
//! ```rust
//! use dmp_model::{IdAllocator, ProductInput};
//!
//! let input = ProductInput::named("Sales Analytics").with_tags([" sales ", ""]);
//! let mut ids = IdAllocator::seeded(["DP0004"], 0);
//! let product = input.into_product(ids.next_id());
//!
//! assert_eq!(product.id, "DP0005");
//! assert_eq!(product.tags, vec!["sales".to_string()]);
//! ```

#![allow(missing_docs)]

pub mod error;
pub mod id;
pub mod product;

pub use error::ValidationError;
pub use id::{format_id, max_sequence, sequence_of, IdAllocator, ID_PREFIX};
pub use product::{
    normalize_tags, validate_batch, Product, ProductAttributes, ProductInput, ATTRIBUTE_COLUMNS,
    ATTRIBUTE_COUNT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
