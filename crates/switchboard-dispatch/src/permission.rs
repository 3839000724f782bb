//! Capability requirements carried on descriptors.
//!
//! The router does not decide authorization. Every descriptor carries an
//! opaque [`Permission`]; the surrounding dispatcher consults a
//! [`PermissionGate`] (its authorization backend) with the caller and the
//! requirement before invoking anything.

use crate::handler::Caller;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque capability requirement, resolved by the host's authorizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Creates a permission from its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The permission identifier.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authorization backend consulted before invocation.
pub trait PermissionGate: Send + Sync {
    /// Returns whether the caller holds the given permission.
    fn check(&self, caller: &dyn Caller, permission: &Permission) -> bool;
}

/// A gate that grants everything. Useful for tests and hosts without an
/// authorization backend.
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn check(&self, _caller: &dyn Caller, _permission: &Permission) -> bool {
        true
    }
}
