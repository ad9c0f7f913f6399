//! Budget dimension resolution.
//!
//! The budget key is the tuple (company, fiscal year, cost center, account)
//! plus project or branch when the dimension mode enables them.

pub mod error;
pub mod resolver;
pub mod types;

pub use error::DimensionError;
pub use resolver::{DimensionLookup, DimensionResolver, StaticDimensionLookup};
pub use types::{DimensionInput, Dimensions, ResolvedDimensions};
