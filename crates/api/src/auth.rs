//! Request signing
//!
//! Stations sign each request body with HMAC-SHA256 under the shared key and
//! send the lowercase hex digest in the `x-signature` header. A `sha256=`
//! prefix on the header value is accepted.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-signature header")]
    MissingSignature,
    #[error("signature is not valid hex")]
    MalformedSignature,
    #[error("signature does not match request body")]
    BadSignature,
}

/// Checks body signatures against the shared key
#[derive(Clone)]
pub struct SignatureVerifier {
    key: Option<Vec<u8>>,
}

impl SignatureVerifier {
    /// `None` accepts every request unsigned
    pub fn new(key: Option<&str>) -> Self {
        Self {
            key: key.map(|k| k.as_bytes().to_vec()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    fn mac(key: &[u8], body: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::BadSignature)?;
        mac.update(body);
        Ok(mac)
    }

    /// Hex signature for `body`, or `None` when signing is disabled
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let key = self.key.as_ref()?;
        let mac = Self::mac(key, body).ok()?;
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify `signature` (the raw header value) over `body`.
    ///
    /// The digest comparison is constant-time.
    pub fn verify(&self, signature: Option<&str>, body: &[u8]) -> Result<(), AuthError> {
        let Some(key) = &self.key else {
            return Ok(());
        };

        let signature = signature.ok_or(AuthError::MissingSignature)?.trim();
        let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
        let expected = hex::decode(signature).map_err(|_| AuthError::MalformedSignature)?;

        Self::mac(key, body)?
            .verify_slice(&expected)
            .map_err(|_| AuthError::BadSignature)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
