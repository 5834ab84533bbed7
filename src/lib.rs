//! Daily code churn of a git history.
//!
//! Commits flow through [`churn::ChurnAnalysis`]: every tree change is classified into a
//! line delta ([`classify`]), recorded per day and optionally per author, and finally
//! aggregated into day-sorted [`model::Series`] that [`serialize`] renders as text,
//! protobuf or JSON. The [`git`] module drives the analysis over a real repository.

pub mod churn;
pub mod classify;
pub mod cli;
pub mod diff;
pub mod error;
pub mod git;
pub mod model;
pub mod pipeline;
pub mod serialize;

pub use churn::{aggregate, ChurnAnalysis};
pub use error::{ChurnError, Result};
pub use model::{ChurnResult, RawDelta, Series};
