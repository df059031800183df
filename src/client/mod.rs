//! Platform client module.

pub mod asr;
mod chatbot;
mod dispatcher;
mod signer;
pub(crate) mod transport;

pub use chatbot::*;
pub use dispatcher::*;
pub use signer::*;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, RequestBody};
