use crate::db::UserStorage;
use crate::error::ShortenerError;
use crate::service::codegen;
use crate::service::sealer::IdentitySealer;
use std::sync::Arc;
use tracing::{debug, info};

/// Caller identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    /// Set when a new identity was minted and the token must reach the client.
    pub issued_token: Option<String>,
}

/// Login-free identity: a sealed user id held by the client.
#[derive(Clone)]
pub struct IdentityService {
    sealer: Arc<dyn IdentitySealer>,
    users: UserStorage,
}

impl IdentityService {
    pub fn new(sealer: Arc<dyn IdentitySealer>, users: UserStorage) -> Self {
        Self { sealer, users }
    }

    /// Mint and persist a new user id, returning `(token, id)`.
    pub async fn issue_identity(&self) -> Result<(String, String), ShortenerError> {
        let id = codegen::user_id();
        self.users.insert(&id).await?;
        let token = self.sealer.seal(&id)?;
        info!(user_id = %id, "issued new identity");
        Ok((token, id))
    }

    /// Recover the user id behind `token`.
    ///
    /// Unknown ids are `InvalidToken`; note the existence check has inserted them by now.
    pub async fn resolve_identity(&self, token: &str) -> Result<String, ShortenerError> {
        let id = self.sealer.open(token)?;
        if self.check_exists(&id).await? {
            Ok(id)
        } else {
            debug!("token decrypted to an id that was never issued");
            Err(ShortenerError::InvalidToken)
        }
    }

    pub async fn check_exists(&self, id: &str) -> Result<bool, ShortenerError> {
        self.users.check_exists(id).await
    }

    /// Resolve a presented token, falling back to a fresh identity when the
    /// token is absent or invalid. Storage failures are not swallowed.
    pub async fn establish(&self, token: Option<&str>) -> Result<Identity, ShortenerError> {
        if let Some(token) = token {
            match self.resolve_identity(token).await {
                Ok(id) => {
                    return Ok(Identity {
                        id,
                        issued_token: None,
                    });
                }
                Err(ShortenerError::InvalidToken) => {}
                Err(e) => return Err(e),
            }
        }
        let (token, id) = self.issue_identity().await?;
        Ok(Identity {
            id,
            issued_token: Some(token),
        })
    }
}
