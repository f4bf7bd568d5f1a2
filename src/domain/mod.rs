//! Domain types for Ensemble Shield.
//!
//! This module contains the request, signal, decision and audit value objects.

mod audit;
mod decision;
mod output;
mod request;
mod signals;

pub use audit::*;
pub use decision::*;
pub use output::*;
pub use request::*;
pub use signals::*;
