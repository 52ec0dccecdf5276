//! Message authentication: HMAC-SHA1 truncated to the suite tag length.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::error::{CryptoError, Result};
use super::suite::AuthAlgorithm;

type HmacSha1 = Hmac<Sha1>;

/// HMAC keyed once with the session authentication key.
///
/// Each packet clones the pre-keyed state instead of re-running the key
/// setup.
pub(crate) enum AuthState {
    HmacSha1(HmacSha1),
}

impl AuthState {
    pub(crate) fn new(algorithm: AuthAlgorithm, auth_key: &[u8]) -> Result<Self> {
        match algorithm {
            AuthAlgorithm::HmacSha1 => {
                let mac = HmacSha1::new_from_slice(auth_key)
                    .map_err(|e| CryptoError::KeySchedule(format!("HMAC-SHA1: {}", e)))?;
                Ok(AuthState::HmacSha1(mac))
            }
        }
    }

    /// Tag over `input || ROC` (RFC 3711, 4.2), truncated to `out.len()`.
    pub(crate) fn hash_rtp(&self, out: &mut [u8], input: &[u8], roc: u32) {
        let AuthState::HmacSha1(mac) = self;
        let mut mac = mac.clone();
        mac.update(input);
        mac.update(&roc.to_be_bytes());
        truncate_into(out, &mac.finalize().into_bytes());
    }

    /// Tag over `input`, which already ends in the E||SRTCP index word.
    pub(crate) fn hash_rtcp(&self, out: &mut [u8], input: &[u8]) {
        let AuthState::HmacSha1(mac) = self;
        let mut mac = mac.clone();
        mac.update(input);
        truncate_into(out, &mac.finalize().into_bytes());
    }

    /// Constant-time check of a truncated RTP tag.
    pub(crate) fn verify_rtp(&self, input: &[u8], roc: u32, tag: &[u8]) -> Result<()> {
        let AuthState::HmacSha1(mac) = self;
        let mut mac = mac.clone();
        mac.update(input);
        mac.update(&roc.to_be_bytes());
        mac.verify_truncated_left(tag)
            .map_err(|_| CryptoError::AuthFailed)
    }

    pub(crate) fn verify_rtcp(&self, input: &[u8], tag: &[u8]) -> Result<()> {
        let AuthState::HmacSha1(mac) = self;
        let mut mac = mac.clone();
        mac.update(input);
        mac.verify_truncated_left(tag)
            .map_err(|_| CryptoError::AuthFailed)
    }
}

fn truncate_into(out: &mut [u8], digest: &[u8]) {
    let n = out.len().min(digest.len());
    out[..n].copy_from_slice(&digest[..n]);
}
