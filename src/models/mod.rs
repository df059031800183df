//! Core data models for the SDK.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Concrete types with compile-time guarantees (Payload, Domain)
//! - B_i (Beliefs): Server replies wrapped in Result/Option
//! - I^R (Resolvable): Config parameters
//! - I^B (Bounded): Error variants for network and polling limits

mod config;
mod dict_word;
mod envelope;
mod error;
mod status;

pub use config::*;
pub use dict_word::*;
pub use envelope::*;
pub use error::*;
pub use status::*;
