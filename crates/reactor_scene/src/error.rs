//! Scene-layer error types.

/// Errors raised while configuring a tick loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    /// The tick rate must be finite and strictly positive.
    #[error("invalid tick rate: {0} (expected a finite rate above zero)")]
    InvalidTickRate(f64),
}
