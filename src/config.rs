//! Defaults and tunables for accumulators and the handle registry.

/// Alpha substituted when an accumulator is constructed with an out-of-range value
pub const DEFAULT_ALPHA: f64 = 0.1;

/// Configuration for the handle registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Slots reserved up front in the handle map
    pub initial_capacity: usize,
    /// First handle issued; handle 0 is reserved for "no instance"
    pub first_handle: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            first_handle: 1,
        }
    }
}

impl RegistryConfig {
    /// Start handle, raised to 1 if configured as 0
    pub fn effective_first_handle(&self) -> u64 {
        self.first_handle.max(1)
    }
}
