//! Rate-override credential check.
//!
//! The configured secret is kept only as an HMAC-SHA256 tag.  A submitted
//! credential is tagged the same way and compared with
//! `hmac_sha256::HMAC::verify`, which is constant-time, so response timing
//! does not reveal how much of a guess matched.

use log::warn;

/// Fixed HMAC key separating credential tags from any other use of the hash.
const CREDENTIAL_TAG_KEY: &[u8] = b"ventilator/rate-override/v1";

pub struct RateOverrideCredential {
    tag: [u8; 32],
}

impl RateOverrideCredential {
    pub fn new(secret: &str) -> Self {
        Self {
            tag: hmac_sha256::HMAC::mac(secret.as_bytes(), CREDENTIAL_TAG_KEY),
        }
    }

    pub fn verify(&self, submitted: &str) -> bool {
        let ok = hmac_sha256::HMAC::verify(submitted.as_bytes(), CREDENTIAL_TAG_KEY, &self.tag);
        if !ok {
            warn!("auth: rate override credential rejected");
        }
        ok
    }
}
