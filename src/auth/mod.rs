pub mod ownership;

use std::fmt;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::SecurityConfig;

pub use ownership::Scope;

/// Caller identity resolved from a verified credential
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(subject: impl Into<String>) -> Self {
        SubjectId(subject.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// A single audience string or an array of them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,
}

impl Claims {
    pub fn new(subject: impl Into<String>, expiry_hours: u64) -> Result<Self, AuthError> {
        let now = Utc::now();
        let exp = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AuthError::TokenGeneration(format!("expiry of {} hours is out of range", expiry_hours)))?;

        Ok(Self {
            sub: subject.into(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: None,
            aud: None,
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,

    #[error("{0}")]
    MalformedHeader(&'static str),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Token has no subject")]
    MissingSubject,

    #[error("Identity provider unavailable: {0}")]
    Upstream(String),

    #[error("JWT key configuration error: {0}")]
    KeyConfig(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

/// Opaque identity provider: turns a bearer token into a subject.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError>;
}

/// Verifies locally signed JWTs, either HS256 (shared secret) or RS256 (provider public key)
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        let (key, algorithm) = match &security.jwt_public_key_pem {
            Some(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::KeyConfig(e.to_string()))?,
                Algorithm::RS256,
            ),
            None if !security.jwt_secret.is_empty() => {
                (DecodingKey::from_secret(security.jwt_secret.as_bytes()), Algorithm::HS256)
            }
            None => {
                return Err(AuthError::KeyConfig(
                    "set SECURITY_JWT_SECRET or SECURITY_JWT_PUBLIC_KEY".to_string(),
                ))
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &security.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        match &security.jwt_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let subject = token_data.claims.sub.trim();
        if subject.is_empty() {
            return Err(AuthError::MissingSubject);
        }
        Ok(SubjectId::new(subject))
    }
}

/// Mint an HS256 token with the configured secret, for local development and tests
pub fn generate_jwt(security: &SecurityConfig, mut claims: Claims) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::KeyConfig("JWT secret not configured".to_string()));
    }
    claims.iss = claims.iss.or_else(|| security.jwt_issuer.clone());
    claims.aud = claims.aud.or_else(|| security.jwt_audience.clone().map(Value::String));

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(secret: &str) -> SecurityConfig {
        SecurityConfig {
            cors_origins: vec![],
            jwt_secret: secret.to_string(),
            jwt_public_key_pem: None,
            jwt_issuer: None,
            jwt_audience: None,
            jwt_expiry_hours: 1,
        }
    }

    #[tokio::test]
    async fn verifies_token_signed_with_same_secret() {
        let config = security("s3cret");
        let token = generate_jwt(&config, Claims::new("user-a", 1).unwrap()).unwrap();
        let verifier = JwtVerifier::from_config(&config).unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), SubjectId::new("user-a"));
    }

    #[tokio::test]
    async fn rejects_token_signed_with_other_secret() {
        let token = generate_jwt(&security("other"), Claims::new("user-a", 1).unwrap()).unwrap();
        let verifier = JwtVerifier::from_config(&security("s3cret")).unwrap();
        assert!(matches!(verifier.verify(&token).await, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let config = security("s3cret");
        let mut claims = Claims::new("user-a", 1).unwrap();
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = generate_jwt(&config, claims).unwrap();
        let verifier = JwtVerifier::from_config(&config).unwrap();
        assert!(matches!(verifier.verify(&token).await, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn rejects_garbage_and_empty_subject() {
        let config = security("s3cret");
        let verifier = JwtVerifier::from_config(&config).unwrap();
        assert!(verifier.verify("not.a.jwt").await.is_err());

        let token = generate_jwt(&config, Claims::new("  ", 1).unwrap()).unwrap();
        assert!(matches!(verifier.verify(&token).await, Err(AuthError::MissingSubject)));
    }

    #[tokio::test]
    async fn enforces_configured_audience() {
        let mut config = security("s3cret");
        config.jwt_audience = Some("budget-app".to_string());
        let verifier = JwtVerifier::from_config(&config).unwrap();

        let good = generate_jwt(&config, Claims::new("user-a", 1).unwrap()).unwrap();
        assert!(verifier.verify(&good).await.is_ok());

        let mut claims = Claims::new("user-a", 1).unwrap();
        claims.aud = Some(Value::String("someone-else".to_string()));
        let bad = generate_jwt(&config, claims).unwrap();
        assert!(verifier.verify(&bad).await.is_err());
    }

    #[tokio::test]
    async fn accepts_audience_array_containing_configured_audience() {
        let mut config = security("s3cret");
        config.jwt_audience = Some("budget-app".to_string());
        let verifier = JwtVerifier::from_config(&config).unwrap();

        let mut claims = Claims::new("user-a", 1).unwrap();
        claims.aud = Some(serde_json::json!(["other-app", "budget-app"]));
        let token = generate_jwt(&config, claims).unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), SubjectId::new("user-a"));

        let mut claims = Claims::new("user-a", 1).unwrap();
        claims.aud = Some(serde_json::json!(["other-app"]));
        let token = generate_jwt(&config, claims).unwrap();
        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn audience_array_passes_when_no_audience_configured() {
        let config = security("s3cret");
        let verifier = JwtVerifier::from_config(&config).unwrap();

        let mut claims = Claims::new("user-a", 1).unwrap();
        claims.aud = Some(serde_json::json!(["a", "b"]));
        let token = generate_jwt(&config, claims).unwrap();
        assert!(verifier.verify(&token).await.is_ok());
    }

    #[test]
    fn out_of_range_lifetime_is_an_error_not_a_panic() {
        assert!(matches!(
            Claims::new("user-a", u64::MAX),
            Err(AuthError::TokenGeneration(_))
        ));
        assert!(matches!(
            Claims::new("user-a", i64::MAX as u64),
            Err(AuthError::TokenGeneration(_))
        ));
        assert!(Claims::new("user-a", 24 * 365).is_ok());
    }

    #[test]
    fn verifier_requires_a_key() {
        assert!(matches!(
            JwtVerifier::from_config(&security("")),
            Err(AuthError::KeyConfig(_))
        ));
    }
}
