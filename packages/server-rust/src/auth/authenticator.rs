//! Login + secret authentication, composed from the resolver and verifier.

use std::sync::Arc;

use suivi_core::AuthenticatedPrincipal;
use tracing::debug;

use super::error::AuthError;
use super::resolver::PrincipalResolver;
use super::verifier::CredentialVerifier;

/// Secret hashed at construction and checked whenever the login is unknown,
/// so an unknown login costs one full hash comparison like a wrong secret.
const TIMING_DUMMY_SECRET: &str = "suivi-timing-equalizer";

/// Authenticates a login/secret pair once per request.
///
/// The hash comparison runs on tokio's blocking pool. On success the stored
/// hash is erased from the returned principal.
#[derive(Debug, Clone)]
pub struct Authenticator {
    resolver: PrincipalResolver,
    verifier: Arc<CredentialVerifier>,
    dummy_hash: Arc<str>,
}

impl Authenticator {
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if the timing dummy hash cannot be produced.
    pub fn new(resolver: PrincipalResolver, verifier: CredentialVerifier) -> Result<Self, AuthError> {
        let dummy_hash = verifier.hash(TIMING_DUMMY_SECRET)?;
        Ok(Self {
            resolver,
            verifier: Arc::new(verifier),
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Resolves `login` and verifies `secret` against its stored hash.
    ///
    /// # Errors
    ///
    /// - `PrincipalNotFound` for an unknown login.
    /// - `CredentialMismatch` or `MalformedStoredHash` when verification fails.
    /// - `Lookup` when the account store fails.
    ///
    /// Callers must not expose which of the first two happened; the
    /// `IntoResponse` impl of [`AuthError`] already collapses them.
    pub async fn authenticate(
        &self,
        login: &str,
        secret: &str,
    ) -> Result<AuthenticatedPrincipal, AuthError> {
        match self.resolver.resolve(login).await {
            Ok(mut principal) => {
                let stored = principal
                    .secret_hash()
                    .map(|h| h.expose().to_string())
                    .unwrap_or_default();
                let outcome = self.check_blocking(secret, stored).await;
                principal.erase_secret();
                debug!(authenticated = outcome.is_ok(), "credential check complete");
                outcome.map(|()| principal)
            }
            Err(err @ AuthError::PrincipalNotFound { .. }) => {
                let _ = self
                    .check_blocking(secret, self.dummy_hash.to_string())
                    .await;
                debug!(authenticated = false, "credential check complete");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Access to the verifier, e.g. for hashing new secrets.
    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    async fn check_blocking(&self, secret: &str, stored: String) -> Result<(), AuthError> {
        let verifier = Arc::clone(&self.verifier);
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || verifier.check(&secret, &stored))
            .await
            .unwrap_or(Err(AuthError::CredentialMismatch))
    }
}
