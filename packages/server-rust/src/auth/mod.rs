//! Principal resolution and credential verification.
//!
//! - [`resolver`]: login → [`suivi_core::AuthenticatedPrincipal`]
//! - [`verifier`]: one-way hash comparison (Argon2id, legacy bcrypt)
//! - [`authenticator`]: resolver + verifier, once per request
//! - [`extract`]: request-scoped [`SecurityContext`] and extractors
//! - [`layer`]: Tower middleware attaching the security context
//! - [`error`]: error taxonomy and its uniform `401` mapping

pub mod authenticator;
pub mod error;
pub mod extract;
pub mod layer;
pub mod resolver;
pub mod verifier;

pub use authenticator::Authenticator;
pub use error::AuthError;
pub use extract::{basic_credentials, BasicCredentials, CurrentPrincipal, SecurityContext};
pub use layer::{AuthenticationLayer, AuthenticationService};
pub use resolver::PrincipalResolver;
pub use verifier::CredentialVerifier;
