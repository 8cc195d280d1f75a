//! Caller identity and JWT authentication.
//!
//! The broker never authenticates anyone itself: it reads a [`Principal`]
//! from the request extensions. The standalone server produces that
//! principal from a Bearer JWT with [`authenticate`]; embedders can insert
//! their own.

use hyper::http::HeaderMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::{Auth as AuthConfig, MIN_SECRET_LENGTH};
use crate::error::{Error, Result};

/// The identity a request was made under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Principal {
    /// No credentials, or credentials that failed verification.
    #[default]
    Anonymous,
    /// A verified identity. `name` may still be absent when the credential
    /// carries no name claim.
    Authenticated {
        name: Option<String>,
        claims: Vec<(String, Option<String>)>,
    },
}

impl Principal {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::Authenticated { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Principal::Authenticated { name, .. } => name.as_deref(),
            Principal::Anonymous => None,
        }
    }

    pub fn claims(&self) -> &[(String, Option<String>)] {
        match self {
            Principal::Authenticated { claims, .. } => claims,
            Principal::Anonymous => &[],
        }
    }
}

fn validate_secret(config: &AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_SECRET_LENGTH {
        return Err(Error::Config(format!(
            "JWT secret must be at least {MIN_SECRET_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// JWT claims structure. Claims beyond the registered ones are kept in
/// token order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (typically user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Convert into a principal. The name comes from the `name` claim,
    /// falling back to `sub`.
    pub fn into_principal(self) -> Principal {
        let name = match self.extra.get("name") {
            Some(serde_json::Value::String(name)) => name.clone(),
            _ => self.sub.clone(),
        };

        let mut claims = vec![
            ("sub".to_string(), Some(self.sub)),
            ("exp".to_string(), Some(self.exp.to_string())),
            ("iat".to_string(), Some(self.iat.to_string())),
        ];
        claims.extend(self.extra.into_iter().map(|(key, value)| {
            let value = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
            (key, value)
        }));

        Principal::Authenticated {
            name: Some(name),
            claims,
        }
    }
}

/// Create a JWT token for a user, with optional extra claims.
///
/// # Arguments
/// * `config` - Auth configuration with JWT secret and expiry settings
/// * `subject` - Encoded in the token's `sub` claim
/// * `extra` - Additional claims carried alongside the registered ones
pub fn create_token(
    config: &AuthConfig,
    subject: &str,
    extra: serde_json::Map<String, serde_json::Value>,
) -> Result<String> {
    validate_secret(config)?;
    let now = jiff::Timestamp::now();
    let hours = config.token_expiry_days as i64 * 24;
    let exp = now + jiff::Span::new().hours(hours);

    let claims = Claims {
        sub: subject.to_string(),
        exp: exp.as_second(),
        iat: now.as_second(),
        extra,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Token creation failed: {e}")))?;

    Ok(token)
}

/// Verify and decode a JWT token.
///
/// # Returns
/// - `Ok(Claims)` if the token is valid
/// - `Err(Error::TokenExpired)` if the token has expired
/// - `Err(Error::Unauthorized)` for any other validation failure
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims> {
    validate_secret(config)?;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => Error::Unauthorized,
    })?;

    Ok(token_data.claims)
}

/// Extract and verify the Bearer token from the Authorization header.
pub fn bearer_claims(headers: &HeaderMap, config: &AuthConfig) -> Result<Claims> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(Error::Unauthorized)?;

    let token = auth_header
        .get(..7)
        .filter(|p| p.eq_ignore_ascii_case("bearer "))
        .map(|_| &auth_header[7..])
        .ok_or(Error::Unauthorized)?;

    verify_token(config, token)
}

/// Resolve the caller's principal.
///
/// Authentication is disabled when no secret is configured. Missing or
/// invalid credentials produce [`Principal::Anonymous`]; rejecting them is
/// left to whatever the caller ends up invoking.
pub fn authenticate(headers: &HeaderMap, config: &AuthConfig) -> Principal {
    if config.jwt_secret.is_empty() || !headers.contains_key("Authorization") {
        return Principal::Anonymous;
    }
    match bearer_claims(headers, config) {
        Ok(claims) => claims.into_principal(),
        Err(e) => {
            tracing::debug!("Treating caller as anonymous: {e}");
            Principal::Anonymous
        }
    }
}
