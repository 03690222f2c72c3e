//! # ML Studio Core
//!
//! Domain types, traits, and error definitions for the ML Studio client.
//! This crate performs **no I/O** — it defines the model that the store,
//! client, and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! The two places where the client touches the outside world are defined
//! as traits here:
//! - [`Transport`] — how an HTTP request leaves the process
//! - [`TokenStore`] — where the session token survives restarts
//!
//! Production implementations live in `mlstudio-client` and `mlstudio-store`;
//! tests swap in scripted stand-ins.

pub mod error;
pub mod resource;
pub mod session;
pub mod token;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use error::{ClientError, Result, StoreError, ValidationError, ValidationReason};
pub use resource::{
    ChatReply, ChatRequest, Dataset, Model, NewModel, NewProject, NewUser, Project, ResourceKey,
    TokenResponse, TrainingAccepted, TrainingRequest,
};
pub use session::{Session, SessionStatus, User};
pub use token::TokenStore;
pub use transport::{
    HttpRequest, HttpResponse, Method, MultipartField, RequestBody, Transport, TransportError,
};
