//! Reckon Core - Fundamental numeric type
//!
//! This crate provides the numeric value consumed by the expression engine:
//! - `Real`: arbitrary precision reals with an exactness classification
//! - `RealError`: arithmetic failures (division by zero, domain errors)

mod real;

pub use real::{Real, RealError, DEFAULT_PRECISION, ELLIPSIS};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Real, RealError};
}
