/// Profile details supplied by the identity provider. Informational only:
/// nothing may derive the authentication state from profile presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub display_name: Option<String>,
}

/// The current session as seen by every component. Owned and mutated only
/// by [`AuthManager`](super::AuthManager); everyone else reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub profile: Option<UserProfile>,
}

impl Session {
    /// True iff a non-empty token is present.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_iff_token_is_nonempty() {
        assert!(!Session::default().is_authenticated());
        assert!(!Session {
            token: Some(String::new()),
            profile: None,
        }
        .is_authenticated());
        assert!(Session {
            token: Some("abc".into()),
            profile: None,
        }
        .is_authenticated());
    }

    #[test]
    fn profile_presence_does_not_authenticate() {
        let session = Session {
            token: None,
            profile: Some(UserProfile {
                email: "a@b.c".into(),
                display_name: None,
            }),
        };
        assert!(!session.is_authenticated());
    }
}
