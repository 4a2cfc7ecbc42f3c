//! ss-core: shared foundation for steady-state computation.
//!
//! Contains:
//! - numeric (Real + finiteness checks)
//! - model (symbols, calibration, and the `Model` contract)
//! - error (shared error types)

pub mod error;
pub mod model;
pub mod numeric;

pub use error::{SsError, SsResult};
pub use model::*;
pub use numeric::*;
