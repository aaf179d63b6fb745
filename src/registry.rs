//! Handle Registry for Boundary-Owned Accumulators
//!
//! Foreign callers cannot hold Rust references, so every accumulator lives
//! in a registry and is addressed by an integer handle. Handles start at 1,
//! only ever increase, and are never reissued after `destroy`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::algo::Ewma;
use crate::config::RegistryConfig;
use crate::error::EwmaError;

/// Opaque instance identifier; 0 means "no instance"
pub type Handle = u64;

pub struct EwmaRegistry {
    entries: HashMap<Handle, Ewma>,
    next_handle: Handle,
}

impl EwmaRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: HashMap::with_capacity(config.initial_capacity),
            next_handle: config.effective_first_handle(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Allocate an accumulator and return its fresh handle.
    ///
    /// Handles are capped at `i64::MAX` so they survive the signed boundary type.
    pub fn create(&mut self, alpha: f64) -> Result<Handle, EwmaError> {
        let handle = self.next_handle;
        if handle > i64::MAX as u64 {
            warn!("handle space exhausted");
            return Err(EwmaError::HandleSpaceExhausted);
        }
        self.next_handle += 1;

        let ewma = Ewma::new(alpha);
        if ewma.alpha() != alpha {
            debug!(
                handle,
                requested = alpha,
                alpha = ewma.alpha(),
                "alpha out of range, using default"
            );
        }
        self.entries.insert(handle, ewma);
        debug!(handle, "accumulator created");
        Ok(handle)
    }

    /// Remove the entry entirely; the handle stays retired.
    pub fn destroy(&mut self, handle: Handle) -> Result<(), EwmaError> {
        match self.entries.remove(&handle) {
            Some(_) => {
                debug!(handle, "accumulator destroyed");
                Ok(())
            }
            None => {
                debug!(handle, "unknown handle");
                Err(EwmaError::HandleNotFound(handle))
            }
        }
    }

    fn ewma_mut(&mut self, handle: Handle) -> Result<&mut Ewma, EwmaError> {
        self.entries.get_mut(&handle).ok_or_else(|| {
            debug!(handle, "unknown handle");
            EwmaError::HandleNotFound(handle)
        })
    }

    pub fn get(&self, handle: Handle) -> Option<&Ewma> {
        self.entries.get(&handle)
    }

    pub fn update(&mut self, handle: Handle, sample: f64) -> Result<f64, EwmaError> {
        Ok(self.ewma_mut(handle)?.update(sample))
    }

    pub fn value(&mut self, handle: Handle) -> Result<f64, EwmaError> {
        Ok(self.ewma_mut(handle)?.value())
    }

    pub fn reset(&mut self, handle: Handle) -> Result<(), EwmaError> {
        self.ewma_mut(handle)?.reset();
        Ok(())
    }

    pub fn set_alpha(&mut self, handle: Handle, alpha: f64) -> Result<(), EwmaError> {
        let result = self.ewma_mut(handle)?.set_alpha(alpha);
        if result.is_err() {
            debug!(handle, alpha, "set_alpha rejected");
        }
        result
    }

    pub fn calculate_batch(
        &mut self,
        handle: Handle,
        samples: &[f64],
    ) -> Result<Vec<f64>, EwmaError> {
        Ok(self.ewma_mut(handle)?.calculate_batch(samples))
    }

    pub fn state_json(&mut self, handle: Handle) -> Result<String, EwmaError> {
        let result = self.ewma_mut(handle)?.to_json();
        if let Err(e) = &result {
            warn!(handle, error = %e, "snapshot encode failed");
        }
        result
    }

    pub fn restore_json(&mut self, handle: Handle, json: &str) -> Result<(), EwmaError> {
        let result = self.ewma_mut(handle)?.restore_json(json);
        if let Err(e) = &result {
            warn!(handle, error = %e, "snapshot rejected");
        }
        result
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.entries.keys().copied().collect()
    }
}

impl Default for EwmaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-guarded registry shared by every exported function.
///
/// All registry access, including the per-accumulator recurrence, runs under
/// the one mutex. A poisoned lock is taken over as-is: the registry holds no
/// invariant that a panicking caller could have left half-written.
pub struct BridgeContext {
    registry: Mutex<EwmaRegistry>,
}

impl BridgeContext {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            registry: Mutex::new(EwmaRegistry::with_config(config)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, EwmaRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut EwmaRegistry) -> R) -> R {
        f(&mut self.lock())
    }
}

impl Default for BridgeContext {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Process-wide context behind the C function table
pub static GLOBAL_BRIDGE: Lazy<BridgeContext> = Lazy::new(BridgeContext::default);
