//! Error type shared by every SRTP operation.

use thiserror::Error;

use super::suite::Protocol;

/// Failure reported by the crypto core.
///
/// None of these abort anything: the caller decides whether to drop the
/// packet, refuse the stream, or rekey.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("unknown crypto suite: {0}")]
    UnknownSuite(String),

    #[error("{what} is {got} bytes, suite {suite} requires {expected}")]
    InvalidKeyLength {
        what: &'static str,
        suite: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("MKI length {0} exceeds the maximum of {max}", max = super::MAX_MKI_LEN)]
    InvalidMkiLength(usize),

    #[error("crypto context has no suite assigned")]
    NotConfigured,

    #[error("crypto context has no session key")]
    NoSessionKey,

    #[error("session keys were derived for {keyed}, not {requested}")]
    ProtocolMismatch { keyed: Protocol, requested: Protocol },

    #[error("key schedule initialization failed: {0}")]
    KeySchedule(String),

    #[error("{protocol} index {index} reached the key lifetime limit of {limit}")]
    LifetimeExceeded {
        protocol: Protocol,
        index: u64,
        limit: u64,
    },

    #[error("packet index {index} is not newer than last seen index {last}")]
    Replayed { index: u64, last: u64 },

    #[error("authentication tag mismatch")]
    AuthFailed,

    #[error("MKI in packet does not match the context")]
    MkiMismatch,

    #[error("packet too short: {0}")]
    Truncated(&'static str),

    #[error("failed to decode key material: {0}")]
    Decode(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::InvalidKeyLength {
            what: "master key",
            suite: "AES_CM_128_HMAC_SHA1_80",
            expected: 16,
            got: 8,
        };
        assert_eq!(
            err.to_string(),
            "master key is 8 bytes, suite AES_CM_128_HMAC_SHA1_80 requires 16"
        );

        let err = CryptoError::LifetimeExceeded {
            protocol: Protocol::Rtcp,
            index: 1 << 31,
            limit: 1 << 31,
        };
        assert_eq!(
            err.to_string(),
            "RTCP index 2147483648 reached the key lifetime limit of 2147483648"
        );

        assert_eq!(
            CryptoError::InvalidMkiLength(200).to_string(),
            "MKI length 200 exceeds the maximum of 128"
        );

        let err = CryptoError::ProtocolMismatch {
            keyed: Protocol::Rtp,
            requested: Protocol::Rtcp,
        };
        assert_eq!(err.to_string(), "session keys were derived for RTP, not RTCP");
    }
}
