//! # REST Protocol Implementation
//!
//! Low-level client side of the REST/JSON Cypher API.
//!
//! ## Overview
//!
//! - **Transport** - pluggable HTTP transport ([`HttpTransport`])
//! - **Client** - default headers, deadlines, cancellation, status mapping
//! - **Messages** - discovery documents and statement envelopes
//! - **Discovery** - two-step endpoint resolution with a pluggable cache
//! - **Endpoint** - credential and scheme inheritance for discovered URLs
//!
//! ## Note
//!
//! Most users should use the high-level [`crate::driver`] module instead of
//! interacting with the protocol directly.

pub mod client;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod transport;

pub use client::RestClient;
pub use discovery::{DiscoveryCache, EndpointResolver, Endpoints, MemoryDiscoveryCache};
pub use endpoint::EndpointUrl;
pub use error::{RestError, RestResult};
pub use message::{
    CypherRequest, CypherResponse, DataEndpoint, QueryStats, ServiceRoot, TransactionRequest,
    TransactionResponse,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
