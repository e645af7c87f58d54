//! Bearer token issuance and validation.
//!
//! Tokens are HS256 JWTs. Signing and checking is delegated to
//! `jsonwebtoken`; this module only decides which claims go in and how
//! failures are classified.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account's username.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
    /// Issuer.
    pub iss: String,
    /// Token id, unique per issued token.
    pub jti: String,
    /// Admin flag. Absent means false.
    #[serde(default)]
    pub is_admin: bool,
}

impl Claims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact JWT.
    pub token: String,
    /// Its claims.
    pub claims: Claims,
}

/// Signing and verification keys plus issuance policy.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Build keys from an HMAC secret.
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl,
        }
    }

    /// The `iss` value written into and required from tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenSign`] if encoding fails.
    pub fn issue(&self, username: &str, is_admin: bool) -> Result<IssuedToken> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: username.to_string(),
            exp: now.saturating_add(ttl),
            iat: now,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().simple().to_string(),
            is_admin,
        };
        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenSign`] if encoding fails.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| Error::TokenSign(e.to_string()))
    }

    /// Check signature, expiry and issuer, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenExpired`] for expired tokens and
    /// [`Error::TokenInvalid`] for anything else that fails.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::token_invalid(e.to_string()),
            })
    }
}

/// BLAKE3 hex digest of a token, used for revocation and logging.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Short form of [`fingerprint`] for log lines.
#[must_use]
pub fn short_fingerprint(token: &str) -> String {
    let mut fp = fingerprint(token);
    fp.truncate(12);
    fp
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn keys() -> TokenKeys {
        TokenKeys::new(SECRET, "pfa-api", Duration::from_secs(24 * 60 * 60))
    }

    #[test]
    fn test_issue_and_validate() {
        let keys = keys();
        let issued = keys.issue("admin", true).unwrap();

        let claims = keys.validate(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, "admin");
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                sub: "user".to_string(),
                exp: now - 60,
                iat: now - 120,
                iss: "pfa-api".to_string(),
                jti: "expired".to_string(),
                is_admin: false,
            })
            .unwrap();

        let err = keys.validate(&token).unwrap_err();
        assert!(err.is_token_expired());
    }

    #[test]
    fn test_wrong_secret() {
        let issued = keys().issue("user", false).unwrap();
        let other = TokenKeys::new(
            b"ffffffffffffffffffffffffffffffff",
            "pfa-api",
            Duration::from_secs(60),
        );

        let err = other.validate(&issued.token).unwrap_err();
        assert!(matches!(err, Error::TokenInvalid { .. }));
    }

    #[test]
    fn test_wrong_issuer() {
        let issued = keys().issue("user", false).unwrap();
        let other = TokenKeys::new(SECRET, "someone-else", Duration::from_secs(60));

        assert!(matches!(
            other.validate(&issued.token),
            Err(Error::TokenInvalid { .. })
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            keys().validate("not.a.jwt"),
            Err(Error::TokenInvalid { .. })
        ));
        assert!(matches!(keys().validate(""), Err(Error::TokenInvalid { .. })));
    }

    #[test]
    fn test_missing_iat_rejected() {
        #[derive(Serialize)]
        struct Minimal<'a> {
            sub: &'a str,
            exp: i64,
            iss: &'a str,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &Minimal {
                sub: "user",
                exp: Utc::now().timestamp() + 60,
                iss: "pfa-api",
            },
            &EncodingKey::from_secret(SECRET),
        );
        assert!(keys().validate(&token.unwrap()).is_err());
    }

    #[test]
    fn test_admin_flag_absent_deserializes_false() {
        let claims: Claims =
            serde_json::from_str(r#"{"sub":"u","exp":1,"iat":0,"iss":"pfa-api","jti":"j"}"#).unwrap();
        assert!(!claims.is_admin);
    }

    #[test]
    fn test_missing_jti_rejected() {
        #[derive(Serialize)]
        struct NoId<'a> {
            sub: &'a str,
            exp: i64,
            iat: i64,
            iss: &'a str,
        }

        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoId {
                sub: "user",
                exp: now + 60,
                iat: now,
                iss: "pfa-api",
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(
            keys().validate(&token),
            Err(Error::TokenInvalid { .. })
        ));
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let keys = keys();
        let a = keys.issue("user", false).unwrap();
        let b = keys.issue("user", false).unwrap();

        assert_ne!(a.claims.jti, b.claims.jti);
        assert_ne!(a.token, b.token);
        assert_ne!(fingerprint(&a.token), fingerprint(&b.token));
    }

    #[test]
    fn test_expires_at() {
        let issued = keys().issue("user", false).unwrap();
        assert_eq!(issued.claims.expires_at().timestamp(), issued.claims.exp);
    }

    #[test]
    fn test_fingerprint_stable_and_distinct() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), 64);
        assert_eq!(short_fingerprint("abc").len(), 12);
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", keys());
        assert!(debug.contains("pfa-api"));
        assert!(!debug.contains("0123456789abcdef"));
    }
}
