/// User id published for requests without an authenticated principal.
pub const ANONYMOUS_USER_ID: &str = "ANONYMOUS";

/// Number of hex characters in a generated request id.
pub const REQUEST_ID_LEN: usize = 8;

/// Per-request correlation metadata attached to every log line.
///
/// Lives only between correlation-filter entry and exit. The server crate
/// scopes it to the request's task and span so that it is never observable
/// from any other request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCorrelationContext {
    /// Fresh 8-character lowercase hex id, not derived from any input.
    pub request_id: String,
    /// Best-effort originating client address. Empty when unknown.
    pub client_ip: String,
    /// Account id of the authenticated principal, or [`ANONYMOUS_USER_ID`].
    pub user_id: String,
}

impl RequestCorrelationContext {
    /// Creates a context with a freshly generated request id.
    ///
    /// `user_id` of `None` publishes the anonymous sentinel.
    #[must_use]
    pub fn new(client_ip: impl Into<String>, user_id: Option<&str>) -> Self {
        Self {
            request_id: generate_request_id(),
            client_ip: client_ip.into(),
            user_id: user_id.unwrap_or(ANONYMOUS_USER_ID).to_string(),
        }
    }

    /// Whether the request was made without an authenticated principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }
}

/// Generates a request id from 32 bits of the thread-local CSPRNG.
#[must_use]
pub fn generate_request_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}
