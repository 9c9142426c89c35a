//! Process-wide auth session: one current snapshot plus a change stream.
//! The session is initialized once at startup by constructing the client;
//! dropping it tears the stream down and subscribers observe closure.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use plaza_types::models::AuthUser;

#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SigningIn,
    SignedIn(AuthUser),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication rejected: {0}")]
    Rejected(String),
}

/// Where identities come from. Mock this in tests; wire a real provider in
/// an application shell.
pub trait IdentityProvider: Send + Sync + 'static {
    fn authenticate(&self) -> impl Future<Output = Result<AuthUser, AuthError>> + Send;
}

/// Provider that always signs in the same identity. Enough for local
/// development and tests.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: AuthUser,
}

impl StaticIdentity {
    pub fn new(user: AuthUser) -> Self {
        Self { user }
    }
}

impl IdentityProvider for StaticIdentity {
    async fn authenticate(&self) -> Result<AuthUser, AuthError> {
        Ok(self.user.clone())
    }
}

/// The auth session client. `login`/`logout` are fire-and-forget triggers;
/// observers read [`AuthClient::state`] or follow [`AuthClient::subscribe`].
pub struct AuthClient<P: IdentityProvider> {
    provider: Arc<P>,
    state: watch::Sender<AuthState>,
}

impl<P: IdentityProvider> AuthClient<P> {
    pub fn new(provider: P) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self {
            provider: Arc::new(provider),
            state,
        }
    }

    /// Kick off a sign-in. Ignored unless the session is currently signed
    /// out; a failed authentication logs and returns to `SignedOut`.
    pub fn login(&self) {
        {
            let current = self.state.borrow();
            if !matches!(*current, AuthState::SignedOut) {
                return;
            }
        }
        self.state.send_replace(AuthState::SigningIn);

        let provider = Arc::clone(&self.provider);
        let state = self.state.clone();
        tokio::spawn(async move {
            match provider.authenticate().await {
                Ok(user) => {
                    info!(user = %user.id, "signed in");
                    state.send_replace(AuthState::SignedIn(user));
                }
                Err(err) => {
                    warn!(error = %err, "sign-in failed");
                    state.send_replace(AuthState::SignedOut);
                }
            }
        });
    }

    pub fn logout(&self) {
        info!("signed out");
        self.state.send_replace(AuthState::SignedOut);
    }

    /// Current snapshot of the session state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        match &*self.state.borrow() {
            AuthState::SignedIn(user) => Some(user.clone()),
            _ => None,
        }
    }

    /// Change-notification stream. The receiver yields whenever the state
    /// moves and errors once the client is dropped.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    struct RejectingProvider;

    impl IdentityProvider for RejectingProvider {
        async fn authenticate(&self) -> Result<AuthUser, AuthError> {
            Err(AuthError::Rejected("nope".into()))
        }
    }

    fn test_user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            display_name: Some("Alice".into()),
        }
    }

    async fn wait_until<P: IdentityProvider>(
        client: &AuthClient<P>,
        matcher: impl Fn(&AuthState) -> bool,
    ) {
        let mut rx = client.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if matcher(&rx.borrow_and_update()) {
                    return;
                }
                rx.changed().await.expect("auth state stream closed");
            }
        })
        .await
        .expect("auth state never matched");
    }

    #[tokio::test]
    async fn login_moves_through_signing_in_to_signed_in() {
        let user = test_user();
        let client = AuthClient::new(StaticIdentity::new(user.clone()));

        assert!(matches!(client.state(), AuthState::SignedOut));
        client.login();
        // The transition to SigningIn is synchronous with the trigger.
        assert!(matches!(
            client.state(),
            AuthState::SigningIn | AuthState::SignedIn(_)
        ));

        wait_until(&client, |state| matches!(state, AuthState::SignedIn(_))).await;
        assert_eq!(client.current_user().unwrap().id, user.id);
    }

    #[tokio::test]
    async fn rejected_login_returns_to_signed_out() {
        let client = AuthClient::new(RejectingProvider);
        client.login();
        assert!(matches!(client.state(), AuthState::SigningIn));

        wait_until(&client, |state| matches!(state, AuthState::SignedOut)).await;
        assert!(client.current_user().is_none());
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let client = AuthClient::new(StaticIdentity::new(test_user()));
        client.login();
        wait_until(&client, |state| matches!(state, AuthState::SignedIn(_))).await;

        client.logout();
        assert!(client.current_user().is_none());
    }

    #[tokio::test]
    async fn login_is_ignored_while_signed_in() {
        let client = AuthClient::new(StaticIdentity::new(test_user()));
        client.login();
        wait_until(&client, |state| matches!(state, AuthState::SignedIn(_))).await;

        client.login();
        assert!(matches!(client.state(), AuthState::SignedIn(_)));
    }
}
