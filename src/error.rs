//! Error types shared by the accumulator, registry and snapshot layers.
//!
//! Nothing here crosses the C boundary: the exported functions in `lib.rs`
//! translate these into NaN / `false` / null / error payloads.

use crate::registry::Handle;

#[derive(Debug, Clone, PartialEq)]
pub enum EwmaError {
    /// Smoothing coefficient outside [0, 1] (or NaN)
    InvalidAlpha(f64),
    /// No live accumulator behind this handle
    HandleNotFound(Handle),
    /// Every representable handle has been issued
    HandleSpaceExhausted,
    SnapshotEncode(String),
    SnapshotDecode(String),
}

impl std::fmt::Display for EwmaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAlpha(alpha) => {
                write!(f, "Invalid alpha {} (must be in [0,1])", alpha)
            }
            Self::HandleNotFound(h) => write!(f, "Instance not found: {}", h),
            Self::HandleSpaceExhausted => write!(f, "No handles left to issue"),
            Self::SnapshotEncode(e) => write!(f, "Snapshot encoding failed: {}", e),
            Self::SnapshotDecode(e) => write!(f, "Snapshot decoding failed: {}", e),
        }
    }
}

impl std::error::Error for EwmaError {}
