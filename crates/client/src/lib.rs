//! Session and data-synchronization layer for the ML Studio client.
//!
//! Every request goes through the [`RequestGateway`]; reads are cached and
//! de-duplicated by the [`QueryCache`]; writes go through the
//! [`MutationPipeline`], which invalidates what they touch. [`Workbench`]
//! wires it all together for front ends.

pub mod cache;
pub mod gateway;
pub mod http;
pub mod mutation;
pub mod session;
pub mod upload;
pub mod workbench;

#[cfg(test)]
mod test_support;

pub use cache::{CacheSnapshot, FetchStatus, QueryCache};
pub use gateway::{ApiResponse, RequestGateway, classify_failure};
pub use http::ReqwestTransport;
pub use mutation::{MutationPipeline, PendingMutation};
pub use session::{LoginOutcome, SessionHandle, SessionManager};
pub use upload::{UploadCandidate, UploadValidator, ValidatedUpload};
pub use workbench::Workbench;
