use std::sync::Arc;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::db::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    #[serde(rename = "use")]
    pub token_use: TokenUse,
    /// Unique per token so two pairs minted in the same second still differ.
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl Keys {
    fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }
}

/// Signs and verifies access and refresh JWTs. Each kind has its own secret
/// and lifetime; access tokens are checked without touching the database.
#[derive(Clone)]
pub struct TokenIssuer {
    access: Arc<Keys>,
    refresh: Arc<Keys>,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 5;
        Self {
            access: Arc::new(Keys::new(
                &config.access_token_secret,
                config.access_token_expiry_secs,
            )),
            refresh: Arc::new(Keys::new(
                &config.refresh_token_secret,
                config.refresh_token_expiry_secs,
            )),
            validation,
        }
    }

    fn keys(&self, token_use: TokenUse) -> &Keys {
        match token_use {
            TokenUse::Access => &self.access,
            TokenUse::Refresh => &self.refresh,
        }
    }

    fn issue(
        &self,
        user: &User,
        token_use: TokenUse,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let keys = self.keys(token_use);
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            token_use,
            jti: uuid::Uuid::now_v7().to_string(),
            iat: now,
            exp: now + keys.ttl_secs,
        };
        encode(&Header::default(), &claims, &keys.encoding)
    }

    pub fn issue_access(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user, TokenUse::Access)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user, TokenUse::Refresh)
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: self.issue_refresh(user)?,
        })
    }

    fn verify(
        &self,
        token: &str,
        token_use: TokenUse,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.keys(token_use).decoding, &self.validation)?;
        if data.claims.token_use != token_use {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.verify(token, TokenUse::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.verify(token, TokenUse::Refresh)
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access.ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh.ttl_secs
    }
}
