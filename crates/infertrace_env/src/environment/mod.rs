//! Process environment abstractions shared across infertrace components.

pub mod guard;
pub mod trace;
pub mod value;

use std::sync::{Mutex, MutexGuard, OnceLock};

use trace::TraceEnvVar;

/// Namespaced environment variable identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// Variables read by the trace collectors.
    Trace(TraceEnvVar),
}

impl From<TraceEnvVar> for EnvVar {
    fn from(value: TraceEnvVar) -> Self {
        Self::Trace(value)
    }
}

impl EnvVar {
    /// Canonical key for the identifier.
    pub const fn key(self) -> &'static str {
        match self {
            EnvVar::Trace(inner) => inner.key(),
        }
    }
}

/// Process environment facade that serialises every mutation behind one mutex.
pub struct Environment;

impl Environment {
    /// Acquire the global environment mutex.
    ///
    /// A poisoned mutex is recovered rather than propagated; the guarded value is `()`
    /// so there is no state that could have been left inconsistent.
    pub fn lock() -> MutexGuard<'static, ()> {
        static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the variable as UTF-8, `None` when unset or not valid unicode.
    pub fn get(var: impl Into<EnvVar>) -> Option<String> {
        std::env::var(var.into().key()).ok()
    }

    /// Set the variable, taking the environment lock for the duration of the write.
    pub fn set(var: impl Into<EnvVar>, value: &str) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::set_locked(var, value, &mut guard);
    }

    /// Remove the variable, taking the environment lock for the duration of the write.
    pub fn remove(var: impl Into<EnvVar>) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::remove_locked(var, &mut guard);
    }

    pub(crate) fn set_locked(var: EnvVar, value: &str, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: the guard proves the caller holds ENV_MUTEX, so no other mutation runs concurrently.
        unsafe { std::env::set_var(var.key(), value) };
    }

    pub(crate) fn remove_locked(var: EnvVar, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: same serialisation argument as `set_locked`.
        unsafe { std::env::remove_var(var.key()) };
    }
}
