// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, AuthenticatedUser, Role, SessionClaims};
use crate::storage::StoredUser;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly signed session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with a shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Issue a session for a stored user.
    ///
    /// Fails with `InvalidRole` if the stored role is outside the closed set.
    pub fn issue(&self, user: &StoredUser) -> Result<IssuedToken, AuthError> {
        let role = Role::parse(&user.role).ok_or(AuthError::InvalidRole)?;
        let now = Utc::now();
        let expires_at = now + self.ttl;

        let claims = SessionClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a bearer token and extract the caller.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        let token_data = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        AuthenticatedUser::from_claims(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_user(role: &str) -> StoredUser {
        StoredUser {
            id: "user_1".to_string(),
            username: "s1".to_string(),
            password_hash: String::new(),
            role: role.to_string(),
            capture_count: 0,
            is_victim: false,
            reward: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issue_then_verify() {
        let issuer = TokenIssuer::new(b"test-secret", 3600);
        let issued = issuer.issue(&stored_user("slave")).unwrap();

        let user = issuer.verify(&issued.token).unwrap();
        assert_eq!(user.user_id, "user_1");
        assert_eq!(user.username, "s1");
        assert_eq!(user.role, Role::Slave);
        assert_eq!(user.expires_at, issued.expires_at.timestamp());
    }

    #[test]
    fn issue_rejects_corrupted_role() {
        let issuer = TokenIssuer::new(b"test-secret", 3600);
        let result = issuer.issue(&stored_user("Juan"));
        assert!(matches!(result, Err(AuthError::InvalidRole)));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let issued = TokenIssuer::new(b"secret-a", 3600)
            .issue(&stored_user("juan"))
            .unwrap();
        let result = TokenIssuer::new(b"secret-b", 3600).verify(&issued.token);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn verify_rejects_expired_token() {
        // Expired well beyond the leeway
        let issuer = TokenIssuer::new(b"test-secret", -3600);
        let issued = issuer.issue(&stored_user("developer")).unwrap();
        assert!(matches!(
            issuer.verify(&issued.token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn verify_rejects_garbage() {
        let issuer = TokenIssuer::new(b"test-secret", 3600);
        assert!(matches!(
            issuer.verify("not.a.token"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn verify_rejects_tampered_role_claim() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let issuer = TokenIssuer::new(b"test-secret", 3600);
        let issued = issuer.issue(&stored_user("developer")).unwrap();

        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let payload = URL_SAFE_NO_PAD.decode(&parts[1]).unwrap();
        let forged = String::from_utf8(payload)
            .unwrap()
            .replace("\"developer\"", "\"juan\"");
        parts[1] = URL_SAFE_NO_PAD.encode(forged.as_bytes());

        assert!(matches!(
            issuer.verify(&parts.join(".")),
            Err(AuthError::InvalidSignature)
        ));
    }
}
