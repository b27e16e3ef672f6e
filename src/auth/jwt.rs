//! JWT codec for access and refresh tokens.
//!
//! Access and refresh tokens are signed with two different HS256 secrets so
//! that a leaked access-signing key cannot mint long-lived refresh tokens
//! (and the reverse). Lifetimes are fixed: 15 minutes for access tokens,
//! 7 days for refresh tokens.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::user::{Role, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};

/// Access token lifetime in seconds (15 minutes)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime in seconds (7 days)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Claims embedded in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Claims embedded in a refresh token.
///
/// `jti` keeps two tokens minted for the same user in the same second
/// distinct, since the session table stores token values under a UNIQUE key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: UserId,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token verification failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

impl From<TokenError> for Error {
    fn from(_: TokenError) -> Self {
        Error::InvalidOrExpiredToken
    }
}

/// Signing secrets, injected at construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .finish()
    }
}

/// A freshly signed token together with the instants embedded in it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct JwtCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec").finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Build a codec from the two signing secrets.
    ///
    /// Fails if either secret is empty or both are the same value.
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(Error::config("JWT signing secrets must not be empty"));
        }
        if config.access_secret == config.refresh_secret {
            return Err(Error::config("access and refresh token secrets must differ"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            access: SigningKeys::from_secret(config.access_secret.as_bytes()),
            refresh: SigningKeys::from_secret(config.refresh_secret.as_bytes()),
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign<C: Serialize>(&self, claims: &C, kind: TokenKind) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding)
            .map_err(|err| Error::internal(format!("Failed to sign token: {}", err)))
    }

    pub fn issue_access_token(&self, user: &User) -> Result<IssuedToken> {
        let issued_at = now_seconds();
        let claims = AccessClaims {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: issued_at + ACCESS_TOKEN_TTL_SECS,
            iat: issued_at,
        };

        let token = self.sign(&claims, TokenKind::Access)?;
        IssuedToken::new(token, claims.iat, claims.exp)
    }

    pub fn issue_refresh_token(&self, user_id: &UserId) -> Result<IssuedToken> {
        let issued_at = now_seconds();
        let claims = RefreshClaims {
            sub: user_id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            exp: issued_at + REFRESH_TOKEN_TTL_SECS,
            iat: issued_at,
        };

        let token = self.sign(&claims, TokenKind::Refresh)?;
        IssuedToken::new(token, claims.iat, claims.exp)
    }

    /// Verify signature and expiry using the secret selected by `kind`.
    pub fn verify<C: DeserializeOwned>(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> std::result::Result<C, TokenError> {
        decode::<C>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| classify(err.kind()))
    }

    pub fn verify_access(&self, token: &str) -> std::result::Result<AccessClaims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> std::result::Result<RefreshClaims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }
}

impl IssuedToken {
    fn new(token: String, iat: i64, exp: i64) -> Result<Self> {
        let instant = |secs: i64| {
            Utc.timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| Error::internal(format!("timestamp out of range: {}", secs)))
        };
        Ok(Self { token, issued_at: instant(iat)?, expires_at: instant(exp)? })
    }
}

fn now_seconds() -> i64 {
    Utc::now().timestamp()
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
        _ => TokenError::Invalid,
    }
}
