use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix prepended to an account's role label to form its authority.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Stored one-way hash of an account secret.
///
/// The `Debug` impl never prints the hash, so a principal or record can be
/// logged with `?` without leaking it. Read the raw value with [`SecretHash::expose`]
/// only at the point of verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHash(String);

impl SecretHash {
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the raw PHC/bcrypt string.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash([redacted])")
    }
}

/// Account row as owned by the persistence collaborator.
///
/// Read-only from the authentication pipeline's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Opaque account identifier (e.g. `P-42`).
    pub id: String,
    /// Unique login identifier.
    pub login: String,
    /// One-way hash of the account secret.
    pub secret_hash: SecretHash,
    /// Role label, used verbatim to derive the account's authority.
    pub role: String,
}

/// Role-derived permission tag attached to a principal (e.g. `ROLE_ADMIN`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    /// Derives the authority for a role label: `"ROLE_" + role`.
    ///
    /// The label is taken exactly as stored. No case folding, pluralization
    /// or hierarchy expansion is applied.
    #[must_use]
    pub fn from_role(role: &str) -> Self {
        Self(format!("{ROLE_PREFIX}{role}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated identity attached to a single request.
///
/// Can only be built from an existing [`AccountRecord`], so its authority
/// set is never empty. The stored secret hash is carried until verification
/// and should then be dropped with [`AuthenticatedPrincipal::erase_secret`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    id: String,
    login: String,
    secret_hash: Option<SecretHash>,
    authorities: BTreeSet<Authority>,
}

impl AuthenticatedPrincipal {
    /// Builds a principal with exactly one authority derived from the record's role.
    #[must_use]
    pub fn from_record(record: AccountRecord) -> Self {
        let mut authorities = BTreeSet::new();
        authorities.insert(Authority::from_role(&record.role));
        Self {
            id: record.id,
            login: record.login,
            secret_hash: Some(record.secret_hash),
            authorities,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    #[must_use]
    pub fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }

    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a.as_str() == authority)
    }

    /// The stored hash, or `None` once it has been erased.
    #[must_use]
    pub fn secret_hash(&self) -> Option<&SecretHash> {
        self.secret_hash.as_ref()
    }

    /// Drops the stored hash. Called once verification has succeeded.
    pub fn erase_secret(&mut self) {
        self.secret_hash = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: &str) -> AccountRecord {
        AccountRecord {
            id: "P-42".to_string(),
            login: "alice".to_string(),
            secret_hash: SecretHash::new("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA"),
            role: role.to_string(),
        }
    }

    #[test]
    fn authority_prefixes_role_verbatim() {
        assert_eq!(Authority::from_role("ADMIN").as_str(), "ROLE_ADMIN");
        assert_eq!(Authority::from_role("Enseignant").as_str(), "ROLE_Enseignant");
    }

    #[test]
    fn principal_has_single_authority_from_role() {
        let principal = AuthenticatedPrincipal::from_record(record("ADMIN"));
        assert_eq!(principal.id(), "P-42");
        assert_eq!(principal.login(), "alice");
        assert_eq!(principal.authorities().len(), 1);
        assert!(principal.has_authority("ROLE_ADMIN"));
        assert!(!principal.has_authority("ROLE_USER"));
    }

    #[test]
    fn erase_secret_drops_hash() {
        let mut principal = AuthenticatedPrincipal::from_record(record("USER"));
        assert!(principal.secret_hash().is_some());
        principal.erase_secret();
        assert!(principal.secret_hash().is_none());
    }

    #[test]
    fn debug_output_never_contains_hash() {
        let principal = AuthenticatedPrincipal::from_record(record("USER"));
        let rendered = format!("{principal:?} {:?}", record("USER"));
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn account_record_deserializes_from_json() {
        let json = r#"{"id":"P-7","login":"bob","secret_hash":"$2b$04$abc","role":"USER"}"#;
        let record: AccountRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "P-7");
        assert_eq!(record.secret_hash.expose(), "$2b$04$abc");
    }
}
