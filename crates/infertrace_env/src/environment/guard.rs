//! Scoped guards that restore environment variables when dropped.

use super::{EnvVar, Environment};

/// Remembers the prior state of one or more variables and puts it back on drop,
/// most recent change first.
pub struct EnvVarGuard {
    saved: Vec<(EnvVar, Option<String>)>,
}

impl EnvVarGuard {
    /// Set `var` to the raw string `value` until the guard is dropped.
    pub fn set(var: impl Into<EnvVar>, value: &str) -> Self {
        Self { saved: Vec::with_capacity(1) }.and_set(var, value)
    }

    /// Remove `var` until the guard is dropped.
    pub fn unset(var: impl Into<EnvVar>) -> Self {
        Self { saved: Vec::with_capacity(1) }.and_unset(var)
    }

    /// Remove every variable in `vars` under a single guard.
    pub fn unset_all<V: Into<EnvVar>>(vars: impl IntoIterator<Item = V>) -> Self {
        vars.into_iter()
            .fold(Self { saved: Vec::new() }, |guard, var| guard.and_unset(var))
    }

    /// Also set `var`, restoring it together with the rest of this guard.
    #[must_use]
    pub fn and_set(mut self, var: impl Into<EnvVar>, value: &str) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        self.saved.push((var, Environment::get(var)));
        Environment::set_locked(var, value, &mut lock);
        self
    }

    /// Also remove `var`, restoring it together with the rest of this guard.
    #[must_use]
    pub fn and_unset(mut self, var: impl Into<EnvVar>) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        self.saved.push((var, Environment::get(var)));
        Environment::remove_locked(var, &mut lock);
        self
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let mut lock = Environment::lock();
        for (var, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(previous) => Environment::set_locked(var, &previous, &mut lock),
                None => Environment::remove_locked(var, &mut lock),
            }
        }
    }
}
