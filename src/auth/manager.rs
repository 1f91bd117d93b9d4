use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::{BridgeEvent, BridgeSession, CredentialStore, IdentityBridge, Session};
use crate::task::TaskGuard;

/// Single source of truth for "is there a usable session token right now".
///
/// Construction restores the persisted token for instant availability, then
/// a listener task reconciles against the identity provider: it subscribes
/// to the change stream first, runs the initial-session query, and applies
/// events for as long as the manager lives. Both paths apply the same
/// idempotent projection, so whichever answers last wins safely.
///
/// Must be created inside a tokio runtime. Shared as `Arc<AuthManager>`;
/// dropping the last handle tears the listener down.
pub struct AuthManager {
    state: watch::Sender<Session>,
    bridge: Arc<dyn IdentityBridge>,
    store: Arc<dyn CredentialStore>,
    _listener: TaskGuard,
}

impl AuthManager {
    pub fn new(bridge: Arc<dyn IdentityBridge>, store: Arc<dyn CredentialStore>) -> Self {
        let token = match store.load_token() {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Could not read persisted session token: {e}");
                None
            }
        };
        let (state, _) = watch::channel(Session {
            token,
            profile: None,
        });

        let listener = tokio::spawn(listen(bridge.clone(), store.clone(), state.clone()));

        Self {
            state,
            bridge,
            store,
            _listener: TaskGuard::new(listener),
        }
    }

    /// Watch the session value. The receiver always observes the current
    /// session plus every later transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// The token gated calls should present, if the session is usable.
    pub fn token(&self) -> Option<String> {
        self.state
            .borrow()
            .token
            .clone()
            .filter(|t| !t.is_empty())
    }

    /// Adopt a token obtained through the direct credential exchange.
    /// Does not populate the profile; that stays with the bridge.
    pub fn login(&self, token: &str) {
        if let Err(e) = self.store.store_token(token) {
            log::warn!("Could not persist session token: {e}");
        }
        self.state.send_modify(|s| s.token = Some(token.to_string()));
        log::info!("Session established via direct login");
    }

    /// End the session. Local token, profile, and persisted copy are
    /// cleared unconditionally, even when the remote sign-out fails.
    pub async fn logout(&self) {
        if let Err(e) = self.bridge.sign_out().await {
            log::warn!("Remote sign-out failed, clearing local session anyway: {e}");
        }
        apply_session(&self.state, self.store.as_ref(), None);
    }
}

async fn listen(
    bridge: Arc<dyn IdentityBridge>,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
) {
    // Subscribe before querying so no change slips between the two.
    let events = bridge.events();

    match bridge.current_session().await {
        Ok(session) => apply_session(&state, store.as_ref(), session),
        // Keep the restored token; the provider may answer later via events.
        Err(e) => log::warn!("Initial session query failed: {e}"),
    }

    while let Ok(event) = events.recv().await {
        match event {
            BridgeEvent::SignedIn(session) => {
                apply_session(&state, store.as_ref(), Some(session));
            }
            BridgeEvent::SignedOut => apply_session(&state, store.as_ref(), None),
        }
    }
}

fn apply_session(
    state: &watch::Sender<Session>,
    store: &dyn CredentialStore,
    session: Option<BridgeSession>,
) {
    match session {
        Some(s) => {
            if let Err(e) = store.store_token(&s.access_token) {
                log::warn!("Could not persist session token: {e}");
            }
            state.send_replace(Session {
                token: Some(s.access_token),
                profile: s.profile,
            });
            log::info!("Session adopted from identity bridge");
        }
        None => {
            if let Err(e) = store.clear_token() {
                log::warn!("Could not clear persisted session token: {e}");
            }
            state.send_replace(Session::default());
            log::info!("Session cleared");
        }
    }
}
