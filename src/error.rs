//! Error taxonomy for the packet buffer.

/// Status returned by a fallible buffer or packet operation.
///
/// Mirrors the error bands of the design: contract violations
/// ([`PsError::Invalid`], [`PsError::NoBufs`]), non-blocking probe failures
/// ([`PsError::Busy`], [`PsError::Again`]), and lifecycle/resource errors
/// ([`PsError::Interrupted`], [`PsError::NoMem`], [`PsError::NotSup`]).
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum PsError {
    /// Bad argument or operation invalid in the handle's current state.
    #[error("invalid argument or state")]
    Invalid,
    /// A `TRY` operation would have blocked.
    #[error("operation would block")]
    Busy,
    /// The request exceeds the arena's capacity.
    #[error("request exceeds buffer capacity")]
    NoBufs,
    /// A DMA request would cross the arena wrap without `ACCEPT_FAKE_DMA`.
    #[error("dma span crosses the arena wrap")]
    Again,
    /// The buffer has been cancelled; the caller must abandon it.
    #[error("buffer has been cancelled")]
    Interrupted,
    /// Allocation failed (e.g. fake-DMA staging buffer, or arena mapping).
    #[error("allocation failed")]
    NoMem,
    /// The requested feature is not supported by this build.
    #[error("feature not supported")]
    NotSup,
}

/// Convenience alias for results returned by this crate.
pub type PsResult<T> = Result<T, PsError>;
