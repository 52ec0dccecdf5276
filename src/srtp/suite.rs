//! Static registry of the supported SRTP crypto suites.
//!
//! The table is read-only for the whole life of the process; lookups hand
//! out `&'static` references that callers never own or free.

use std::fmt;

use serde::Serialize;

use super::error::CryptoError;
use super::{
    MAX_AUTH_KEY_LEN, MAX_MASTER_KEY_LEN, MAX_MASTER_SALT_LEN, MAX_SESSION_KEY_LEN,
    MAX_SESSION_SALT_LEN,
};

/// Which half of the media stream an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Protocol {
    Rtp,
    Rtcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Rtp => f.write_str("RTP"),
            Protocol::Rtcp => f.write_str("RTCP"),
        }
    }
}

/// Confidentiality transform of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CipherAlgorithm {
    /// AES-128 in counter mode (RFC 3711, 4.1.1).
    AesCm,
    /// AES-128 in f8 mode (RFC 3711, 4.1.2).
    AesF8,
    /// Payload passes through unencrypted.
    Null,
}

/// Message authentication transform of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthAlgorithm {
    /// HMAC-SHA1, truncated to the suite's tag length (RFC 3711, 4.2.1).
    HmacSha1,
}

/// Cipher identifier a kernel forwarding path can be programmed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KernelCipher {
    Null,
    AesCm,
    AesF8,
}

/// HMAC identifier a kernel forwarding path can be programmed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KernelHmac {
    HmacSha1,
}

/// A named bundle of cipher, authenticator and parameter lengths.
///
/// All lengths are in bytes.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct CryptoSuite {
    pub name: &'static str,
    pub master_key_len: usize,
    pub master_salt_len: usize,
    /// n_e
    pub session_key_len: usize,
    /// n_s
    pub session_salt_len: usize,
    pub srtp_auth_tag: usize,
    pub srtcp_auth_tag: usize,
    pub srtp_auth_key_len: usize,
    pub srtcp_auth_key_len: usize,
    /// Packets that may be protected under one session key.
    pub srtp_lifetime: u64,
    pub srtcp_lifetime: u64,
    /// Advisory offload hints; `None` means software only.
    pub kernel_cipher: Option<KernelCipher>,
    pub kernel_hmac: Option<KernelHmac>,
    pub cipher: CipherAlgorithm,
    pub auth: Option<AuthAlgorithm>,
}

impl CryptoSuite {
    pub fn auth_tag_len(&self, protocol: Protocol) -> usize {
        match protocol {
            Protocol::Rtp => self.srtp_auth_tag,
            Protocol::Rtcp => self.srtcp_auth_tag,
        }
    }

    pub fn auth_key_len(&self, protocol: Protocol) -> usize {
        match protocol {
            Protocol::Rtp => self.srtp_auth_key_len,
            Protocol::Rtcp => self.srtcp_auth_key_len,
        }
    }

    pub fn lifetime(&self, protocol: Protocol) -> u64 {
        match protocol {
            Protocol::Rtp => self.srtp_lifetime,
            Protocol::Rtcp => self.srtcp_lifetime,
        }
    }

    /// Whether payloads are actually encrypted (drives the SRTCP E flag).
    pub fn encrypts(&self) -> bool {
        self.cipher != CipherAlgorithm::Null
    }

    /// A suite is valid when it carries an authenticator exactly when
    /// it declares authentication keys and tags, and every length fits the
    /// fixed-capacity key buffers.
    pub const fn validate(&self) -> bool {
        let wants_auth = self.srtp_auth_key_len > 0
            || self.srtcp_auth_key_len > 0
            || self.srtp_auth_tag > 0
            || self.srtcp_auth_tag > 0;
        if wants_auth != self.auth.is_some() {
            return false;
        }
        // HMAC-SHA1 output caps the tag length.
        if self.srtp_auth_tag > 20 || self.srtcp_auth_tag > 20 {
            return false;
        }
        self.master_key_len <= MAX_MASTER_KEY_LEN
            && self.master_salt_len <= MAX_MASTER_SALT_LEN
            && self.session_key_len <= MAX_SESSION_KEY_LEN
            && self.session_salt_len <= MAX_SESSION_SALT_LEN
            && self.srtp_auth_key_len <= MAX_AUTH_KEY_LEN
            && self.srtcp_auth_key_len <= MAX_AUTH_KEY_LEN
    }
}

const SRTP_LIFETIME: u64 = 1 << 48;
const SRTCP_LIFETIME: u64 = 1 << 31;

const SUITE_TABLE: [CryptoSuite; 5] = [
    CryptoSuite {
        name: "AES_CM_128_HMAC_SHA1_80",
        master_key_len: 16,
        master_salt_len: 14,
        session_key_len: 16,
        session_salt_len: 14,
        srtp_auth_tag: 10,
        srtcp_auth_tag: 10,
        srtp_auth_key_len: 20,
        srtcp_auth_key_len: 20,
        srtp_lifetime: SRTP_LIFETIME,
        srtcp_lifetime: SRTCP_LIFETIME,
        kernel_cipher: Some(KernelCipher::AesCm),
        kernel_hmac: Some(KernelHmac::HmacSha1),
        cipher: CipherAlgorithm::AesCm,
        auth: Some(AuthAlgorithm::HmacSha1),
    },
    CryptoSuite {
        name: "AES_CM_128_HMAC_SHA1_32",
        master_key_len: 16,
        master_salt_len: 14,
        session_key_len: 16,
        session_salt_len: 14,
        srtp_auth_tag: 4,
        // RFC 4568 6.2: SRTCP keeps the 80-bit tag
        srtcp_auth_tag: 10,
        srtp_auth_key_len: 20,
        srtcp_auth_key_len: 20,
        srtp_lifetime: SRTP_LIFETIME,
        srtcp_lifetime: SRTCP_LIFETIME,
        kernel_cipher: Some(KernelCipher::AesCm),
        kernel_hmac: Some(KernelHmac::HmacSha1),
        cipher: CipherAlgorithm::AesCm,
        auth: Some(AuthAlgorithm::HmacSha1),
    },
    CryptoSuite {
        name: "F8_128_HMAC_SHA1_80",
        master_key_len: 16,
        master_salt_len: 14,
        session_key_len: 16,
        session_salt_len: 14,
        srtp_auth_tag: 10,
        srtcp_auth_tag: 10,
        srtp_auth_key_len: 20,
        srtcp_auth_key_len: 20,
        srtp_lifetime: SRTP_LIFETIME,
        srtcp_lifetime: SRTCP_LIFETIME,
        kernel_cipher: Some(KernelCipher::AesF8),
        kernel_hmac: Some(KernelHmac::HmacSha1),
        cipher: CipherAlgorithm::AesF8,
        auth: Some(AuthAlgorithm::HmacSha1),
    },
    CryptoSuite {
        name: "NULL_HMAC_SHA1_80",
        master_key_len: 16,
        master_salt_len: 14,
        session_key_len: 16,
        session_salt_len: 14,
        srtp_auth_tag: 10,
        srtcp_auth_tag: 10,
        srtp_auth_key_len: 20,
        srtcp_auth_key_len: 20,
        srtp_lifetime: SRTP_LIFETIME,
        srtcp_lifetime: SRTCP_LIFETIME,
        kernel_cipher: Some(KernelCipher::Null),
        kernel_hmac: Some(KernelHmac::HmacSha1),
        cipher: CipherAlgorithm::Null,
        auth: Some(AuthAlgorithm::HmacSha1),
    },
    CryptoSuite {
        name: "NULL_HMAC_SHA1_32",
        master_key_len: 16,
        master_salt_len: 14,
        session_key_len: 16,
        session_salt_len: 14,
        srtp_auth_tag: 4,
        srtcp_auth_tag: 10,
        srtp_auth_key_len: 20,
        srtcp_auth_key_len: 20,
        srtp_lifetime: SRTP_LIFETIME,
        srtcp_lifetime: SRTCP_LIFETIME,
        kernel_cipher: Some(KernelCipher::Null),
        kernel_hmac: Some(KernelHmac::HmacSha1),
        cipher: CipherAlgorithm::Null,
        auth: Some(AuthAlgorithm::HmacSha1),
    },
];

// A malformed table entry fails the build instead of a packet.
const _: () = {
    let mut i = 0;
    while i < SUITE_TABLE.len() {
        assert!(SUITE_TABLE[i].validate());
        i += 1;
    }
};

/// Every suite this process can negotiate.
pub static CRYPTO_SUITES: [CryptoSuite; 5] = SUITE_TABLE;

/// Look up a suite by its exact SDES name.
pub fn find_suite(name: &str) -> Option<&'static CryptoSuite> {
    CRYPTO_SUITES.iter().find(|suite| suite.name == name)
}

/// Like [`find_suite`], for callers that treat an unknown name as an error.
pub fn lookup_suite(name: &str) -> Result<&'static CryptoSuite, CryptoError> {
    find_suite(name).ok_or_else(|| CryptoError::UnknownSuite(name.to_string()))
}
