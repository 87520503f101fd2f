//! Caller identity and permission checks.
//!
//! The chat adapter resolves who is calling and what role they hold before
//! invoking any operation; the service only compares roles.

use crate::model::PlayerProfile;
use crate::Error;

/// Permission tiers, lowest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Member,
    Manager,
    Admin,
}

/// The resolved caller of an operation.
#[derive(Clone, Debug)]
pub struct Actor {
    pub profile: PlayerProfile,
    pub role: Role,
}

impl Actor {
    pub fn new(profile: PlayerProfile, role: Role) -> Self {
        Self { profile, role }
    }

    /// Returns an error unless the actor holds `role` or a higher one.
    pub fn require(&self, role: Role) -> Result<(), Error> {
        if self.role >= role {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }
}
