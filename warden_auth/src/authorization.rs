//! Authorizations derived from token claims
//!
//! A [`JwtAuthorization`] reads a string-array claim (by default
//! `permissions`) and caches the result on the [`Principal`]. A claim key
//! containing `/` navigates nested objects, so `realm_access/roles` reads
//! the `roles` array inside the `realm_access` claim.

use aliri_braid::braid;
use serde_json::Value;
use thiserror::Error;
use warden::jwt::Claims;

use crate::{Policy, Principal};

/// A permission or role granted to a principal
#[braid(serde, ref_doc = "A borrowed reference to a [`Permission`]")]
pub struct Permission;

/// An ordered set of permissions
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Authorizations(Vec<Permission>);

impl Authorizations {
    /// Whether the set contains `permission`
    #[must_use]
    pub fn contains(&self, permission: &PermissionRef) -> bool {
        self.0.iter().any(|p| p.as_str() == permission.as_str())
    }

    /// Iterates over the permissions in claim order
    pub fn iter(&self) -> impl Iterator<Item = &PermissionRef> {
        self.0.iter().map(|p| &**p)
    }

    /// The number of permissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for Authorizations {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = Vec::new();
        for p in iter {
            if !set.contains(&p) {
                set.push(p);
            }
        }
        Self(set)
    }
}

/// Reads authorizations from a claim of the principal's token
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct JwtAuthorization {
    claim_key: String,
}

impl Default for JwtAuthorization {
    fn default() -> Self {
        Self::permissions()
    }
}

impl JwtAuthorization {
    /// Reads authorizations from `claim_key`
    pub fn new(claim_key: impl Into<String>) -> Self {
        Self {
            claim_key: claim_key.into(),
        }
    }

    /// Reads the `permissions` claim
    pub fn permissions() -> Self {
        Self::new("permissions")
    }

    /// Reads the `roles` claim
    pub fn roles() -> Self {
        Self::new("roles")
    }

    /// The claim key read by this source
    #[must_use]
    pub fn claim_key(&self) -> &str {
        &self.claim_key
    }

    /// Gets the principal's authorizations from this claim
    ///
    /// The first call computes them from the claims and caches them on the
    /// principal. Later calls return the cached set until
    /// [`Principal::clear_cache()`] is called.
    pub fn get_authorizations<'p>(&self, principal: &'p mut Principal) -> &'p Authorizations {
        principal.authorizations_or_insert_with(&self.claim_key, |claims| self.read(claims))
    }

    /// Computes the authorizations held in `claims`, without caching
    ///
    /// Entries that are not strings are ignored. A missing claim, or one
    /// that is not an array, grants nothing.
    pub fn read(&self, claims: &Claims) -> Authorizations {
        let value = match claims.get(&self.claim_key) {
            Some(v) => Some(v),
            None => {
                let mut path = self.claim_key.split('/');
                path.next()
                    .and_then(|head| claims.get(head))
                    .and_then(|v| path.try_fold(v, |v, seg| v.get(seg)))
            }
        };

        value
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(Permission::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The principal lacks a required permission
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("permission '{permission}' not granted")]
pub struct PermissionDenied {
    permission: Permission,
}

impl PermissionDenied {
    /// The permission that was required
    #[must_use]
    pub fn permission(&self) -> &PermissionRef {
        &self.permission
    }
}

/// Grants access to principals holding a permission
///
/// Only authorizations already cached on the principal are consulted, so
/// load them with [`JwtAuthorization::get_authorizations()`] first. A
/// principal from [`JwtAuth::authenticate()`][crate::JwtAuth::authenticate]
/// arrives with the provider's permissions claim already cached.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct PermissionBasedAuthorization {
    permission: Permission,
}

impl PermissionBasedAuthorization {
    /// Requires `permission`
    pub fn new(permission: impl Into<Permission>) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

impl Policy for PermissionBasedAuthorization {
    type Request = Principal;
    type Denial = PermissionDenied;

    fn evaluate(&self, principal: &Principal) -> Result<(), PermissionDenied> {
        if principal
            .authorizations()
            .any(|(_, set)| set.contains(&self.permission))
        {
            Ok(())
        } else {
            Err(PermissionDenied {
                permission: self.permission.clone(),
            })
        }
    }
}
