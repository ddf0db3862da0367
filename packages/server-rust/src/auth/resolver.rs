//! Login identifier to [`AuthenticatedPrincipal`] resolution.

use std::sync::Arc;

use suivi_core::{AccountLookup, AuthenticatedPrincipal};

use super::error::AuthError;

/// Loads an account by login and turns it into a principal.
///
/// Stateless apart from the shared lookup handle; cloning is cheap and
/// concurrent calls for the same login are independent.
#[derive(Clone)]
pub struct PrincipalResolver {
    lookup: Arc<dyn AccountLookup>,
}

impl PrincipalResolver {
    #[must_use]
    pub fn new(lookup: Arc<dyn AccountLookup>) -> Self {
        Self { lookup }
    }

    /// Resolves `login` (exact, case-sensitive) into a principal carrying a
    /// single `ROLE_<role>` authority and the stored secret hash.
    ///
    /// # Errors
    ///
    /// - `PrincipalNotFound` if no account has this login.
    /// - `Lookup` if the account store itself fails.
    pub async fn resolve(&self, login: &str) -> Result<AuthenticatedPrincipal, AuthError> {
        let record = self
            .lookup
            .find_by_login(login)
            .await
            .map_err(AuthError::Lookup)?
            .ok_or_else(|| AuthError::PrincipalNotFound {
                login: login.to_string(),
            })?;

        Ok(AuthenticatedPrincipal::from_record(record))
    }
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver").finish_non_exhaustive()
    }
}
