use async_trait::async_trait;

use crate::auth::UserProfile;
use crate::error::Result;

/// A session as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSession {
    pub access_token: String,
    pub profile: Option<UserProfile>,
}

/// Session-change notification from the identity provider.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    SignedIn(BridgeSession),
    SignedOut,
}

/// Connection to the external identity provider. The provider's own
/// protocol stays behind this trait; the crate only reacts to it.
#[async_trait]
pub trait IdentityBridge: Send + Sync {
    /// Query the provider for an existing session.
    async fn current_session(&self) -> Result<Option<BridgeSession>>;

    /// Terminate the remote session.
    async fn sign_out(&self) -> Result<()>;

    /// Stream of session-change notifications.
    fn events(&self) -> async_channel::Receiver<BridgeEvent>;
}
