//! SRTP/SRTCP crypto core (RFC 3711).
//!
//! A [`CryptoSuite`] from the static registry describes lengths, limits and
//! algorithms; a [`CryptoContext`] owns the master key handed over by
//! signaling, derives the session keys, and dispatches per-packet
//! encryption and authentication to the suite's algorithms. The
//! [`protect`] module layers SRTP/SRTCP packet framing (MKI, tag, SRTCP
//! index) on top.

mod auth;
mod cipher;
pub mod context;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod protect;
pub mod suite;

pub use context::{ContextPair, ContextStatus, CryptoContext, SessionKeys};
pub use error::{CryptoError, Result};
pub use keys::{CryptoParams, KeyBuf};
pub use suite::{
    find_suite, lookup_suite, AuthAlgorithm, CipherAlgorithm, CryptoSuite, KernelCipher,
    KernelHmac, Protocol, CRYPTO_SUITES,
};

/// Buffer capacities: the maximum of each length over all suites.
pub const MAX_MASTER_KEY_LEN: usize = 16;
pub const MAX_MASTER_SALT_LEN: usize = 14;
pub const MAX_SESSION_KEY_LEN: usize = 16;
pub const MAX_SESSION_SALT_LEN: usize = 14;
pub const MAX_AUTH_KEY_LEN: usize = 20;

/// Longest authentication tag any suite produces (full HMAC-SHA1 output).
pub const MAX_AUTH_TAG_LEN: usize = 20;

/// Longest MKI accepted from signaling (RFC 4568 caps it at 128 bytes).
pub const MAX_MKI_LEN: usize = 128;

/// Packet indices are 48 bits: rollover counter (32) || sequence number (16).
pub const MAX_PACKET_INDEX: u64 = (1 << 48) - 1;

/// SRTCP indices are 31 bits; the top bit of the trailer word is the E flag.
pub const SRTCP_INDEX_MASK: u32 = 0x7FFF_FFFF;
pub const SRTCP_E_FLAG: u32 = 0x8000_0000;

/// Compose a 48-bit packet index from a rollover counter and sequence number.
pub fn packet_index(roc: u32, seq: u16) -> u64 {
    ((roc as u64) << 16) | seq as u64
}

/// Rollover counter carried in a packet index.
pub fn rollover_counter(index: u64) -> u32 {
    ((index & MAX_PACKET_INDEX) >> 16) as u32
}
