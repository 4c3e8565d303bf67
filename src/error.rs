//! Construction-time errors.
//!
//! This is the only error type that ever crosses the dispatcher boundary
//! (see the propagation policy in the crate-level docs): every runtime
//! failure is instead delivered to the caller's callback as [`crate::Reply::Nil`].

/// Fatal configuration problems detected while building a [`crate::FederatedClient`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `ClientConfig::nodes` was empty, including the case where a
    /// `ClientBuilder` was never given any `node(...)` calls at all.
    #[error("client configuration does not declare any nodes")]
    NoNodes,
    /// A node's address did not parse as `host:port`.
    #[error("invalid backend address `{0}`: expected host:port")]
    InvalidAddress(String),
}
