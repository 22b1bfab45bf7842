//! cvxball core - Arrow-based transport for named n-dimensional arrays.
//!
//! This crate moves named `f64` arrays between a client and a server as a
//! one-row Arrow record, keeps uploaded records in a command-keyed store, and
//! dispatches them to a single pluggable compute capability.
//!
//! # Example
//!
//! ```rust,ignore
//! use cvxball_core::{compute, NamedArray, Payload, ServerConfig, TransportClient, TransportServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cvxball_core::Result<()> {
//!     let server = Arc::new(TransportServer::new(compute::identity));
//!     let handle = server.serve(&ServerConfig::new("127.0.0.1", 0)).await?;
//!
//!     let client = TransportClient::connect(&handle.base_url()).await?;
//!     let input = Payload::new().with(NamedArray::vector("x", vec![1.0, 2.0]));
//!     let output = client.compute("echo", &input).await?;
//!     assert_eq!(output, input);
//!
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod compute;
pub mod config;
pub mod error;
pub mod payload;
pub mod protocol;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use client::{unique_token, TransportClient};
pub use codec::{ArrayCodec, WireRecord};
pub use compute::Compute;
pub use config::{ServerConfig, TransportConfig};
pub use error::{Result, TransportError};
pub use payload::{NamedArray, Payload};
pub use server::{ServerHandle, TransportServer};
pub use store::CommandStore;
