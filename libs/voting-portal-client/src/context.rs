use crate::result::Result;
use crate::session::{Role, Session, ADMIN_TOKEN_KEY, TOKEN_KEY, VOTER_TOKEN_KEY};
use crate::store::{DynTokenStore, TokenStore};

/// Application-wide session state: where tokens are persisted, and the
/// session they currently describe.
#[derive(Clone)]
pub struct SessionContext {
    store: DynTokenStore,
    session: Option<Session>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session", &self.session)
            .finish()
    }
}

impl SessionContext {
    /// A context with no session, backed by `store`.
    #[must_use]
    pub fn new(store: DynTokenStore) -> Self {
        Self {
            store,
            session: None,
        }
    }

    /// A context whose session is rebuilt from whatever `store` holds. The
    /// role is admin only if the admin key holds the current token.
    pub fn restore(store: DynTokenStore) -> Result<Self> {
        let session = match store.get(TOKEN_KEY)? {
            Some(token) => {
                let role = if store.get(ADMIN_TOKEN_KEY)?.as_deref() == Some(token.as_str()) {
                    Role::Admin
                } else {
                    Role::Voter
                };
                Some(Session::new(token, role))
            }
            None => None,
        };

        Ok(Self { store, session })
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn store(&self) -> &DynTokenStore {
        &self.store
    }

    /// Persist a freshly issued session and make it current. The token is
    /// written under the generic key and under the key for its role; a
    /// stale token under the other role's key is dropped.
    pub fn begin(&mut self, session: Session) -> Result<()> {
        let role = session.role();
        let stale_key = match role {
            Role::Admin => VOTER_TOKEN_KEY,
            Role::Voter => ADMIN_TOKEN_KEY,
        };

        self.store.apply(&[
            (TOKEN_KEY, Some(session.token())),
            (role.storage_key(), Some(session.token())),
            (stale_key, None),
        ])?;

        tracing::debug!("session started for role {role}");
        self.session = Some(session);
        Ok(())
    }

    /// Forget the current session and every stored token.
    pub fn logout(&mut self) -> Result<()> {
        self.store
            .apply(&[(TOKEN_KEY, None), (ADMIN_TOKEN_KEY, None), (VOTER_TOKEN_KEY, None)])?;
        if self.session.take().is_some() {
            tracing::info!("logged out");
        }
        Ok(())
    }
}
