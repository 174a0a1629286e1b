//! Ed25519-signed bearer tokens.
//!
//! Wire form: `base64url(claims_json) "." base64url(signature)`, both
//! unpadded. The signature covers the first segment's ASCII bytes.

use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64URL, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use prestasi_core::{Caller, Role};
use serde::{Deserialize, Serialize};

use crate::trust::keygen;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub perms: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn into_caller(self) -> Caller {
        Caller {
            user_id: self.sub,
            username: self.username,
            role: self.role,
            permissions: self.perms,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

pub fn issue(claims: &Claims, key: &SigningKey) -> Result<String, serde_json::Error> {
    let payload = B64URL.encode(serde_json::to_vec(claims)?);
    let signature = key.sign(payload.as_bytes());
    Ok(format!("{}.{}", payload, B64URL.encode(signature.to_bytes())))
}

/// Check the signature and expiry, then parse the claims. `now` is unix
/// seconds.
pub fn verify(token: &str, key: &VerifyingKey, now: i64) -> Result<Claims, TokenError> {
    let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
    let sig_bytes: [u8; 64] = B64URL
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?
        .try_into()
        .map_err(|_| TokenError::Malformed)?;
    key.verify(payload.as_bytes(), &Signature::from_bytes(&sig_bytes))
        .map_err(|_| TokenError::BadSignature)?;

    let json = B64URL.decode(payload).map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;
    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// `prestasi token`: print a signed token for local development.
pub fn cmd_token(
    key_path: &Path,
    user_id: &str,
    username: &str,
    role: &str,
    perms: Vec<String>,
    ttl_hours: i64,
) {
    let role: Role = match role.parse() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    let signing_key = match keygen::read_secret_key(key_path) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if ttl_hours <= 0 {
        eprintln!("error: --ttl-hours must be positive");
        std::process::exit(1);
    }

    let iat = time::OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        perms,
        iat,
        exp: iat + ttl_hours * 3600,
    };
    match issue(&claims, &signing_key) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("error encoding claims: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> Claims {
        Claims {
            sub: "u-adv".to_string(),
            username: "budi".to_string(),
            role: Role::Advisor,
            perms: vec!["achievement:verify".to_string()],
            iat: 1_000,
            exp,
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let token = issue(&claims(2_000), &key).unwrap();
        let parsed = verify(&token, &key.verifying_key(), 1_500).unwrap();
        assert_eq!(parsed, claims(2_000));

        let caller = parsed.into_caller();
        assert_eq!(caller.user_id, "u-adv");
        assert_eq!(caller.role, Role::Advisor);
    }

    #[test]
    fn test_role_travels_as_display_name() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let token = issue(&claims(2_000), &key).unwrap();
        let payload = token.split('.').next().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&B64URL.decode(payload).unwrap()).unwrap();
        assert_eq!(json["role"], "Dosen Wali");
    }

    #[test]
    fn test_expired_token_rejected() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let token = issue(&claims(2_000), &key).unwrap();
        assert_eq!(
            verify(&token, &key.verifying_key(), 2_000),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_foreign_key_rejected() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let other = SigningKey::from_bytes(&[10u8; 32]);
        let token = issue(&claims(2_000), &key).unwrap();
        assert_eq!(
            verify(&token, &other.verifying_key(), 1_500),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let token = issue(&claims(2_000), &key).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let mut forged = claims(2_000);
        forged.role = Role::Admin;
        let forged_payload = B64URL.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{}", forged_payload, sig);
        assert_eq!(
            verify(&forged_token, &key.verifying_key(), 1_500),
            Err(TokenError::BadSignature)
        );
        assert_eq!(
            verify("garbage", &key.verifying_key(), 1_500),
            Err(TokenError::Malformed)
        );
    }
}
