//! Session key derivation with the AES-CM PRF (RFC 3711, section 4.3).

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;

use super::error::{CryptoError, Result};
use super::suite::Protocol;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// SRTP key derivation labels (RFC 3711, section 4.3.1).
pub const LABEL_RTP_CIPHER_KEY: u8 = 0x00;
pub const LABEL_RTP_AUTH_KEY: u8 = 0x01;
pub const LABEL_RTP_SALT: u8 = 0x02;

/// SRTCP key derivation labels (RFC 3711, section 4.3.2).
pub const LABEL_RTCP_CIPHER_KEY: u8 = 0x03;
pub const LABEL_RTCP_AUTH_KEY: u8 = 0x04;
pub const LABEL_RTCP_SALT: u8 = 0x05;

/// The three labels one protocol derives its session keys under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLabels {
    pub cipher: u8,
    pub auth: u8,
    pub salt: u8,
}

impl KeyLabels {
    pub fn for_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Rtp => Self {
                cipher: LABEL_RTP_CIPHER_KEY,
                auth: LABEL_RTP_AUTH_KEY,
                salt: LABEL_RTP_SALT,
            },
            Protocol::Rtcp => Self {
                cipher: LABEL_RTCP_CIPHER_KEY,
                auth: LABEL_RTCP_AUTH_KEY,
                salt: LABEL_RTCP_SALT,
            },
        }
    }
}

/// Fill `out` with PRF output for `label`.
///
/// The key derivation rate is 0, so `r = index DIV kdr = 0` and
/// `key_id = label || 0x000000000000`:
///
/// ```text
/// x  = key_id XOR master_salt      (label lands on salt byte 7)
/// IV = x || 0x0000
/// out = AES-CTR(master_key, IV) keystream, truncated to out.len()
/// ```
pub fn derive_key(master_key: &[u8], master_salt: &[u8], label: u8, out: &mut [u8]) -> Result<()> {
    let mut iv = [0u8; 16];
    for (b, s) in iv.iter_mut().zip(master_salt.iter().take(14)) {
        *b = *s;
    }
    iv[7] ^= label;

    let mut keystream = Aes128Ctr::new_from_slices(master_key, &iv)
        .map_err(|_| CryptoError::KeySchedule("AES-CM PRF needs a 128-bit master key".into()))?;
    out.fill(0);
    keystream.apply_keystream(out);
    Ok(())
}
