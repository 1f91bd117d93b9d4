mod bridge;
mod manager;
mod session;
mod store;

pub use bridge::{BridgeEvent, BridgeSession, IdentityBridge};
pub use manager::AuthManager;
pub use session::{Session, UserProfile};
pub use store::{CredentialStore, FileCredentialStore};
