//! SRTP relay crypto core
//!
//! Suite registry, session key derivation, per-packet crypto dispatch and
//! crypto context lifecycle for a media relay terminating SRTP/SRTCP
//! (RFC 3711) with SDES-negotiated keys.

pub mod packet;
pub mod srtp;

pub use srtp::{
    find_suite, lookup_suite, ContextPair, ContextStatus, CryptoContext, CryptoError,
    CryptoParams, CryptoSuite, Protocol, CRYPTO_SUITES,
};
