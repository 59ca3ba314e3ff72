//! Authenticated client for the finance REST service.
//!
//! The [`Client`] is generic over the [`Transport`] that moves bytes and the
//! [`CredentialStore`] that holds the session token, so tests and embedders
//! can swap either one.

mod client;
mod credential;
mod error;
mod transport;

pub use api_types;

pub use client::Client;
pub use credential::{
    Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, StorageError,
    TOKEN_KEY,
};
pub use error::{ClientError, SessionError};
pub use transport::{
    OutboundRequest, RawResponse, ReqwestTransport, RequestDescriptor, Transport, TransportError,
};
