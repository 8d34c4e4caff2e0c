//! HorizontalPodAutoscaler normalization
//!
//! Converts `autoscaling/v1` and `autoscaling/v2` objects into a common
//! [`AutoscalerSnapshot`] so that the rest of the exporter never sees the
//! API version skew.

mod quantity;
mod types;
pub mod v1;
pub mod v2;

#[cfg(test)]
mod tests;

pub use quantity::{parse_quantity, quantity_value};
pub use types::*;
