//! JWT token generation and validation
//! Implements access token + refresh token pattern

use crate::{config::SecurityConfig, error::AppError, models::user::Role};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token kind, carried in the `kind` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Role at issuance time
    pub role: Role,

    pub kind: TokenKind,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}

/// Why a token was rejected. All variants surface to clients as the same 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("unexpected token kind")]
    WrongKind,
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        tracing::debug!(reason = %e, "Token rejected");
        AppError::Unauthorized
    }
}

/// Token pair response
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64, // seconds until access token expires
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_token_exp_secs: u64,
    refresh_token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AppError> {
        let secret = security.jwt_secret.expose_secret();

        // HMAC keys shorter than 32 bytes are rejected
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let algorithm = security.algorithm()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            access_token_exp_secs: security.access_token_exp_secs,
            refresh_token_exp_secs: security.refresh_token_exp_secs,
        })
    }

    pub fn lifetime(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Access => self.access_token_exp_secs,
            TokenKind::Refresh => self.refresh_token_exp_secs,
        }
    }

    /// Issue a token of the given kind
    pub fn issue(&self, user_id: &Uuid, role: Role, kind: TokenKind) -> Result<String, AppError> {
        self.issue_at(user_id, role, kind, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds)
    pub fn issue_at(
        &self,
        user_id: &Uuid,
        role: Role,
        kind: TokenKind,
        now: i64,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            kind,
            iat: now,
            exp: now + self.lifetime(kind) as i64,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode {:?} token: {:?}", kind, e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Generate token pair
    pub fn issue_pair(&self, user_id: &Uuid, role: Role) -> Result<TokenPair, AppError> {
        let access_token = self.issue(user_id, role, TokenKind::Access)?;
        let refresh_token = self.issue(user_id, role, TokenKind::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: self.access_token_exp_secs,
        })
    }

    /// Validate and decode token
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate as if the current time were `now`. A token is still valid at `exp == now`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // expiry is checked below against the injected clock, without leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.exp < now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Validate a token and require a specific kind
    pub fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.validate(token)?;

        if claims.kind != expected {
            tracing::debug!(expected = ?expected, got = ?claims.kind, "Token kind mismatch");
            return Err(TokenError::WrongKind);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn security(secret: &str, algorithm: &str) -> SecurityConfig {
        SecurityConfig {
            jwt_secret: Secret::new(secret.to_string()),
            jwt_algorithm: algorithm.to_string(),
            access_token_exp_secs: 900,
            refresh_token_exp_secs: 604800,
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_digit: true,
            password_require_special: false,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        }
    }

    fn service() -> JwtService {
        JwtService::from_config(&security("test_secret_key_32_characters_long!", "HS256")).unwrap()
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.issue(&user_id, Role::Admin, TokenKind::Access).unwrap();

        let claims = service.validate_kind(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_pair_has_both_kinds() {
        let service = service();
        let pair = service.issue_pair(&Uuid::new_v4(), Role::User).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 900);
        assert!(service.validate_kind(&pair.access_token, TokenKind::Access).is_ok());
        assert!(service.validate_kind(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let service = service();
        let pair = service.issue_pair(&Uuid::new_v4(), Role::User).unwrap();

        assert_eq!(
            service.validate_kind(&pair.access_token, TokenKind::Refresh).unwrap_err(),
            TokenError::WrongKind
        );
        assert_eq!(
            service.validate_kind(&pair.refresh_token, TokenKind::Access).unwrap_err(),
            TokenError::WrongKind
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let service = service();
        let issued = 1_700_000_000;
        let token = service
            .issue_at(&Uuid::new_v4(), Role::User, TokenKind::Access, issued)
            .unwrap();

        assert!(service.validate_at(&token, issued).is_ok());
        assert!(service.validate_at(&token, issued + 899).is_ok());
        assert!(service.validate_at(&token, issued + 900).is_ok());
        assert_eq!(service.validate_at(&token, issued + 901).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_refresh_lifetime_boundary() {
        let service = service();
        let issued = 1_700_000_000;
        let token = service
            .issue_at(&Uuid::new_v4(), Role::User, TokenKind::Refresh, issued)
            .unwrap();

        assert!(service.validate_at(&token, issued + 604_799).is_ok());
        assert_eq!(
            service.validate_at(&token, issued + 604_801).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let service = service();
        assert_eq!(service.validate("invalid_token").unwrap_err(), TokenError::Malformed);
        assert_eq!(service.validate("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_wrong_key_is_signature_invalid() {
        let issuer = JwtService::from_config(&security(
            "another_secret_key_32_characters_long",
            "HS256",
        ))
        .unwrap();
        let token = issuer.issue(&Uuid::new_v4(), Role::User, TokenKind::Access).unwrap();

        assert_eq!(service().validate(&token).unwrap_err(), TokenError::SignatureInvalid);
    }

    #[test]
    fn test_wrong_algorithm_is_signature_invalid() {
        let issuer = JwtService::from_config(&security(
            "test_secret_key_32_characters_long!",
            "HS512",
        ))
        .unwrap();
        let token = issuer.issue(&Uuid::new_v4(), Role::User, TokenKind::Access).unwrap();

        assert_eq!(service().validate(&token).unwrap_err(), TokenError::SignatureInvalid);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = service();
        let token = service.issue(&Uuid::new_v4(), Role::User, TokenKind::Access).unwrap();
        let admin = service.issue(&Uuid::new_v4(), Role::Admin, TokenKind::Access).unwrap();

        // 用另一个令牌的载荷替换，签名不再匹配
        let parts: Vec<&str> = token.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], admin_parts[1], parts[2]);

        assert_eq!(service.validate(&forged).unwrap_err(), TokenError::SignatureInvalid);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtService::from_config(&security("short", "HS256")).is_err());
    }
}
