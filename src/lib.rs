//! chatopera-sdk - Signed REST client for the Chatopera chatbot platform.
//!
//! ## Architecture
//!
//! Four components with explicit seams between them:
//! - **CredentialSigner**: client id + secret → per-request authorization token
//! - **CommandDispatcher**: method + path + payload → normalized `ResponseEnvelope`
//! - **ResponseEnvelope**: `rc` plus a `Payload` that is an object, an array, or nothing
//! - **TrainingOrchestrator**: per-domain training submission and convergence polling
//!
//! `Chatbot` and `Chatopera` are thin facades composing them for callers.
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (Payload shape, Domain)
//! - B_i (Beliefs): Server replies and status snapshots (Result, Option)
//! - I^R (Resolvable): Credentials, base URL and polling policy from config
//! - I^B (Bounded): Convergence waits bounded by deadline and cancellation

pub mod client;
pub mod dicts;
pub mod models;
pub mod training;

// Re-exports for convenience
pub use client::{Chatbot, Chatopera, CommandDispatcher, CredentialSigner};
pub use dicts::DictManager;
pub use models::{ChatbotError, Config, DictWord, Domain, Payload, ResponseEnvelope, Result, Status};
pub use training::{PollPolicy, SubmitOutcome, TrainReport, TrainingOrchestrator};
pub use tokio_util::sync::CancellationToken;
