//! Collaborator traits for the consultation engine.
//!
//! - `upstream`: the guarded call to the model provider (UpstreamClient)
//! - `breaker`: circuit breaker observation (BreakerListener)

pub mod breaker;
pub mod upstream;

pub use breaker::*;
pub use upstream::*;
