//! The single computational hook a transport server dispatches to.
//!
//! A deployment supplies one function from a decoded [`Payload`] to a result
//! [`Payload`]. The server is generic over it, so swapping the computation
//! never touches the transport code.

use crate::payload::Payload;
use crate::Result;

/// A compute capability: any thread-safe `Fn(&Payload) -> Result<Payload>`.
///
/// Implementations report unusable input with
/// [`TransportError::InvalidInput`](crate::TransportError::InvalidInput)
/// and numerical breakdown with
/// [`TransportError::ComputeFailed`](crate::TransportError::ComputeFailed).
pub trait Compute: Fn(&Payload) -> Result<Payload> + Send + Sync + 'static {}

impl<F> Compute for F where F: Fn(&Payload) -> Result<Payload> + Send + Sync + 'static {}

/// Echo the input back unchanged.
pub fn identity(payload: &Payload) -> Result<Payload> {
    Ok(payload.clone())
}
