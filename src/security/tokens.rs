//! Optional bearer-token minting.
//!
//! Not required by the pairing protocol; exists for collaborators that want
//! an authenticated handshake before `identify`. Reuses the hmac/sha2/base64
//! stack already in the dependency tree rather than pulling in a JWT crate,
//! since the claim set is small and fixed.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TTL_SECS: u64 = 900;
pub const REFRESH_TTL_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub fingerprint: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

pub struct TokenMinter {
    secret: Vec<u8>,
}

impl TokenMinter {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn mint(&self, user_id: &str, fingerprint: &str, now_unix: u64, refresh: bool) -> String {
        let ttl = if refresh { REFRESH_TTL_SECS } else { DEFAULT_TTL_SECS };
        let claims = Claims {
            user_id: user_id.to_string(),
            fingerprint: fingerprint.to_string(),
            iat: now_unix,
            exp: now_unix + ttl,
        };
        let payload = serde_json::to_vec(&claims).expect("claims always serialize");
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload);

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(payload_b64.as_bytes());
        let signature = mac.finalize().into_bytes();
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

        format!("{payload_b64}.{sig_b64}")
    }

    pub fn verify(&self, token: &str, now_unix: u64) -> Result<Claims, TokenError> {
        let (payload_b64, sig_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(payload_b64.as_bytes());
        let expected_sig = mac.finalize().into_bytes();
        let expected_b64 = URL_SAFE_NO_PAD.encode(expected_sig);

        if !constant_time_eq(expected_b64.as_bytes(), sig_b64.as_bytes()) {
            return Err(TokenError::BadSignature);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if now_unix > claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.len() == b.len() && a.ct_eq(b).into()
}
