//! Authorization scoping for store calls.
//!
//! Every per-record store call carries an [`Access`]. Normal access is checked
//! against the record's `$permissions`. Maintenance code that must bypass
//! those checks opens an elevated window with [`AccessGate::elevate`]; the
//! returned [`Elevated`] guard is the only way to build
//! [`Access::Elevated`], and dropping it closes the window. A gate allows one
//! open window at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::error::{StoreError, StoreResult};
use crate::models::Permissions;

/// Issues elevated-access windows, one at a time.
#[derive(Debug, Default)]
pub struct AccessGate {
    open: AtomicBool,
    opened: AtomicU64,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an elevated window. Fails if one is already open on this gate.
    pub fn elevate(&self) -> StoreResult<Elevated<'_>> {
        if self.open.swap(true, Ordering::AcqRel) {
            return Err(StoreError::AlreadyElevated);
        }
        self.opened.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Elevated access opened");
        Ok(Elevated { gate: self })
    }

    /// Whether a window is currently open.
    pub fn is_elevated(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of windows opened over the gate's lifetime.
    pub fn windows_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}

/// Proof of an open elevated window. Closes it on drop.
#[derive(Debug)]
pub struct Elevated<'g> {
    gate: &'g AccessGate,
}

impl Elevated<'_> {
    pub fn access(&self) -> Access<'_> {
        Access::Elevated(self)
    }
}

impl Drop for Elevated<'_> {
    fn drop(&mut self) {
        self.gate.open.store(false, Ordering::Release);
        tracing::trace!("Elevated access released");
    }
}

/// The authority a store call runs under.
#[derive(Debug, Clone, Copy)]
pub enum Access<'a> {
    /// Ordinary caller holding these roles.
    Roles(&'a [String]),
    /// Maintenance caller inside an elevated window.
    Elevated(&'a Elevated<'a>),
}

impl Access<'_> {
    pub fn is_elevated(&self) -> bool {
        matches!(self, Access::Elevated(_))
    }

    pub fn can_read(&self, permissions: &Permissions) -> bool {
        match self {
            Access::Elevated(_) => true,
            Access::Roles(roles) => permissions.allows_read(roles),
        }
    }

    pub fn can_write(&self, permissions: &Permissions) -> bool {
        match self {
            Access::Elevated(_) => true,
            Access::Roles(roles) => permissions.allows_write(roles),
        }
    }
}
