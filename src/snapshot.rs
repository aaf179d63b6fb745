//! JSON snapshots of accumulator state.
//!
//! The wire shape is `{"alpha":<number>,"value":<number>,"is_init":<bool>}`.
//! Host code stores the text wherever it likes and hands it back later to
//! restore an accumulator.

use crate::algo::Ewma;
use crate::error::EwmaError;

/// Returned by the boundary when the handle does not exist
pub const INSTANCE_NOT_FOUND_PAYLOAD: &str = "{\"error\":\"instance not found\"}";

/// Returned by the boundary when the state cannot be written as JSON
pub const SERIALIZATION_FAILED_PAYLOAD: &str = "{\"error\":\"serialization failed\"}";

impl Ewma {
    /// Encode `alpha`, `value` and the init flag.
    ///
    /// JSON has no spelling for NaN or infinity, so a non-finite field is an
    /// error rather than a silently lossy `null`.
    ///
    /// Whole numbers keep a fractional part (`10.0`, not `10`); compare
    /// snapshots as JSON values, not byte for byte.
    pub fn to_json(&self) -> Result<String, EwmaError> {
        if !self.alpha().is_finite() || !self.value().is_finite() {
            return Err(EwmaError::SnapshotEncode(format!(
                "non-finite state (alpha={}, value={})",
                self.alpha(),
                self.value()
            )));
        }
        serde_json::to_string(self).map_err(|e| EwmaError::SnapshotEncode(e.to_string()))
    }

    /// Parse a full snapshot without touching any live accumulator.
    pub fn from_json(json: &str) -> Result<Self, EwmaError> {
        serde_json::from_str(json).map_err(|e| EwmaError::SnapshotDecode(e.to_string()))
    }

    /// Overwrite all three fields from `json`; on error `self` is unchanged.
    pub fn restore_json(&mut self, json: &str) -> Result<(), EwmaError> {
        *self = Self::from_json(json)?;
        Ok(())
    }
}
