use crate::registry::UserRegistry;
use crate::tokens::TokenService;
use hana_models::{HanaError, LoginForm, Role, TokenResponse, User};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Password login and bearer-token checks on top of the user registry.
#[derive(Clone)]
pub struct Authenticator {
    registry: Arc<UserRegistry>,
    tokens: Arc<TokenService>,
}

impl Authenticator {
    pub fn new(registry: Arc<UserRegistry>, tokens: Arc<TokenService>) -> Self {
        Self { registry, tokens }
    }

    pub fn registry(&self) -> Arc<UserRegistry> {
        self.registry.clone()
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        self.tokens.clone()
    }

    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn login(&self, form: &LoginForm) -> Result<TokenResponse, HanaError> {
        if !self
            .registry
            .verify_credentials(&form.username, &form.password)
            .await?
        {
            return Err(HanaError::InvalidCredentials);
        }

        let token = self.tokens.issue(&form.username)?;
        info!("Issued token for user: {}", form.username);
        Ok(TokenResponse::bearer(token))
    }

    /// Valid signature and expiry are not enough: the subject must still exist.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<User, HanaError> {
        let claims = self.tokens.verify(token)?;
        match self.registry.find_user(&claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                warn!("Token presented for deleted user: {}", claims.sub);
                Err(HanaError::UserGone)
            }
        }
    }

    /// Reads the role fresh from storage so a demotion takes effect before the token expires.
    #[instrument(skip(self, user), fields(user = %user.name))]
    pub async fn require_admin(&self, user: &User) -> Result<(), HanaError> {
        match self.registry.role_of(&user.name).await? {
            Some(Role::Admin) => Ok(()),
            Some(Role::User) => Err(HanaError::AdminOnly),
            None => Err(HanaError::UserGone),
        }
    }
}
