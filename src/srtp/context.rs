//! Per-direction crypto context and its lifecycle.
//!
//! ```text
//! Empty --setup--> Keyed --derive_session_keys--> SessionReady
//!   ^                                                  |
//!   +------------------------ cleanup -----------------+
//! ```
//!
//! The key schedules built during derivation are owned by the context and
//! released when it is cleaned up, re-derived, overwritten or dropped.
//! [`CryptoContext::move_from`] hands everything to another context and
//! leaves the source `Empty`.

use super::auth::AuthState;
use super::cipher::CipherState;
use super::error::{CryptoError, Result};
use super::kdf::{self, KeyLabels};
use super::keys::{CryptoParams, KeyBuf};
use super::suite::{CryptoSuite, Protocol};
use super::{
    rollover_counter, MAX_AUTH_KEY_LEN, MAX_SESSION_KEY_LEN, MAX_SESSION_SALT_LEN, SRTCP_E_FLAG,
};
use crate::packet::{RtcpHeader, RtpHeader};

/// Lifecycle stage of a [`CryptoContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    Empty,
    Keyed,
    SessionReady,
}

/// Session keys derived from the master key (k_e, k_s, k_a).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub protocol: Protocol,
    pub key: KeyBuf<MAX_SESSION_KEY_LEN>,
    pub salt: KeyBuf<MAX_SESSION_SALT_LEN>,
    pub auth_key: KeyBuf<MAX_AUTH_KEY_LEN>,
}

/// The two algorithm handles a session owns.
struct KeySchedule {
    cipher: CipherState,
    auth: Option<AuthState>,
}

struct Session {
    keys: SessionKeys,
    schedule: KeySchedule,
}

impl Session {
    fn derive(params: &CryptoParams, protocol: Protocol) -> Result<Self> {
        let suite = params.suite;
        let labels = KeyLabels::for_protocol(protocol);
        let master_key = params.master_key.as_bytes();
        let master_salt = params.master_salt.as_bytes();

        let mut keys = SessionKeys {
            protocol,
            key: KeyBuf::zeroed(suite.session_key_len),
            salt: KeyBuf::zeroed(suite.session_salt_len),
            auth_key: KeyBuf::zeroed(suite.auth_key_len(protocol)),
        };
        kdf::derive_key(master_key, master_salt, labels.cipher, keys.key.as_bytes_mut())?;
        kdf::derive_key(master_key, master_salt, labels.auth, keys.auth_key.as_bytes_mut())?;
        kdf::derive_key(master_key, master_salt, labels.salt, keys.salt.as_bytes_mut())?;

        let cipher = CipherState::new(suite.cipher, keys.key.as_bytes(), keys.salt.as_bytes())?;
        let auth = match suite.auth {
            Some(algorithm) => Some(AuthState::new(algorithm, keys.auth_key.as_bytes())?),
            None => None,
        };

        Ok(Self {
            keys,
            schedule: KeySchedule { cipher, auth },
        })
    }
}

#[derive(Default)]
enum ContextState {
    #[default]
    Empty,
    Keyed(CryptoParams),
    SessionReady {
        params: CryptoParams,
        session: Session,
    },
}

/// Crypto state for one direction of one stream.
///
/// Not internally synchronized: the task that owns the stream direction
/// owns the context.
#[derive(Default)]
pub struct CryptoContext {
    state: ContextState,
    /// Highest packet (or SRTCP) index accepted or sent so far.
    last_index: Option<u64>,
}

impl CryptoContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign suite and master key material.
    ///
    /// Whatever the context owned before is released first.
    pub fn setup(&mut self, params: CryptoParams) {
        self.cleanup();
        self.state = ContextState::Keyed(params);
    }

    /// Shorthand for [`Self::setup`] on a fresh context.
    pub fn with_params(params: CryptoParams) -> Self {
        let mut ctx = Self::new();
        ctx.setup(params);
        ctx
    }

    pub fn status(&self) -> ContextStatus {
        match self.state {
            ContextState::Empty => ContextStatus::Empty,
            ContextState::Keyed(_) => ContextStatus::Keyed,
            ContextState::SessionReady { .. } => ContextStatus::SessionReady,
        }
    }

    pub fn params(&self) -> Option<&CryptoParams> {
        match &self.state {
            ContextState::Empty => None,
            ContextState::Keyed(params) | ContextState::SessionReady { params, .. } => Some(params),
        }
    }

    pub fn suite(&self) -> Option<&'static CryptoSuite> {
        self.params().map(|p| p.suite)
    }

    pub fn has_session_key(&self) -> bool {
        matches!(self.state, ContextState::SessionReady { .. })
    }

    pub fn session_keys(&self) -> Option<&SessionKeys> {
        match &self.state {
            ContextState::SessionReady { session, .. } => Some(&session.keys),
            _ => None,
        }
    }

    /// Run the key derivation PRF for an arbitrary label into `out`.
    ///
    /// This is the raw building block; [`Self::derive_session_keys`] is what
    /// makes the context usable.
    pub fn derive_session_key(&self, label: u8, out: &mut [u8]) -> Result<()> {
        let params = self.params().ok_or(CryptoError::NotConfigured)?;
        kdf::derive_key(
            params.master_key.as_bytes(),
            params.master_salt.as_bytes(),
            label,
            out,
        )
    }

    /// Derive k_e, k_s and k_a for `protocol` and build the key schedules.
    ///
    /// A previous session is released before anything new is built. On
    /// failure the context is left `Keyed`, holding no session state.
    pub fn derive_session_keys(&mut self, protocol: Protocol) -> Result<()> {
        let params = match std::mem::take(&mut self.state) {
            ContextState::Empty => return Err(CryptoError::NotConfigured),
            ContextState::Keyed(params) => params,
            ContextState::SessionReady { params, session } => {
                drop(session);
                tracing::debug!(suite = params.suite.name, "released previous session key schedule");
                params
            }
        };

        match Session::derive(&params, protocol) {
            Ok(session) => {
                tracing::debug!(suite = params.suite.name, %protocol, "derived session keys");
                self.state = ContextState::SessionReady { params, session };
                Ok(())
            }
            Err(e) => {
                self.state = ContextState::Keyed(params);
                Err(e)
            }
        }
    }

    /// Release all key material and return to `Empty`.
    ///
    /// Safe on a context that was never keyed, and a no-op when repeated.
    pub fn cleanup(&mut self) {
        match std::mem::take(&mut self.state) {
            ContextState::Empty => {}
            ContextState::Keyed(params) => {
                tracing::debug!(suite = params.suite.name, "cleaned up crypto context");
            }
            ContextState::SessionReady { params, session } => {
                drop(session);
                tracing::debug!(suite = params.suite.name, "released session key schedule");
            }
        }
        self.last_index = None;
    }

    /// Take over everything `src` owns, releasing what `self` held.
    ///
    /// `src` is left `Empty`, so cleaning it up afterwards is a no-op.
    /// Two `&mut` borrows cannot alias, so a context is never moved onto
    /// itself.
    pub fn move_from(&mut self, src: &mut CryptoContext) {
        self.cleanup();
        *self = std::mem::take(src);
        if let Some(suite) = self.suite() {
            tracing::debug!(suite = suite.name, "moved crypto context");
        }
    }

    /// Move the whole context out, leaving `Empty` behind.
    pub fn take(&mut self) -> CryptoContext {
        std::mem::take(self)
    }

    /// The session, provided it was derived for `protocol`.
    fn session(&self, protocol: Protocol) -> Result<(&CryptoParams, &Session)> {
        let ContextState::SessionReady { params, session } = &self.state else {
            return Err(CryptoError::NoSessionKey);
        };
        if session.keys.protocol != protocol {
            return Err(CryptoError::ProtocolMismatch {
                keyed: session.keys.protocol,
                requested: protocol,
            });
        }
        Ok((params, session))
    }

    // --- packet index bookkeeping ---

    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }

    /// Guess the 48-bit index of an incoming sequence number (RFC 3711,
    /// appendix A) relative to the highest index seen so far.
    ///
    /// A rollover past the last ROC is returned as is, at or above 2^48,
    /// so that the lifetime check rejects it.
    pub fn estimate_index(&self, seq: u16) -> u64 {
        let Some(last) = self.last_index else {
            return seq as u64;
        };

        let candidate = (last & !0xFFFF) | seq as u64;
        let index = if candidate >= last {
            // Too far ahead: a late packet from the previous rollover.
            if candidate - last > 0x8000 && candidate >= 0x1_0000 {
                candidate - 0x1_0000
            } else {
                candidate
            }
        } else if last - candidate > 0x8000 {
            candidate + 0x1_0000
        } else {
            candidate
        };

        if rollover_counter(index) != rollover_counter(last) {
            tracing::trace!(index, last, "sequence number rollover");
        }
        index
    }

    /// Reject `index` unless it is strictly newer than the last one.
    pub fn check_index(&self, index: u64) -> Result<()> {
        match self.last_index {
            Some(last) if index <= last => Err(CryptoError::Replayed { index, last }),
            _ => Ok(()),
        }
    }

    /// [`Self::check_index`], then record `index` as the new high-water mark.
    pub fn accept_index(&mut self, index: u64) -> Result<()> {
        self.check_index(index)?;
        self.last_index = Some(index);
        Ok(())
    }

    /// Raise the high-water mark for an outgoing packet; never rejects.
    pub fn advance_index(&mut self, index: u64) {
        if self.last_index.map_or(true, |last| index > last) {
            self.last_index = Some(index);
        }
    }

    /// Index the next outgoing packet takes when the context numbers packets
    /// itself (SRTCP).
    pub fn next_index(&self) -> u64 {
        self.last_index.map_or(0, |last| last + 1)
    }

    /// Fail once `index` reaches the suite's key lifetime for `protocol`.
    pub fn check_lifetime(&self, index: u64, protocol: Protocol) -> Result<()> {
        let suite = self.suite().ok_or(CryptoError::NotConfigured)?;
        let limit = suite.lifetime(protocol);
        if index >= limit {
            return Err(CryptoError::LifetimeExceeded {
                protocol,
                index,
                limit,
            });
        }
        Ok(())
    }

    /// Packets that can still be protected before a rekey is mandatory.
    pub fn remaining_lifetime(&self, protocol: Protocol) -> Option<u64> {
        let suite = self.suite()?;
        Some(suite.lifetime(protocol).saturating_sub(self.next_index()))
    }

    // --- per-packet dispatch ---

    /// Encrypt an RTP payload in place under the 48-bit `index`.
    pub fn encrypt_rtp(&self, header: &RtpHeader, payload: &mut [u8], index: u64) -> Result<()> {
        let (_, session) = self.session(Protocol::Rtp)?;
        self.check_lifetime(index, Protocol::Rtp)?;
        session
            .schedule
            .cipher
            .apply_rtp(session.keys.salt.as_bytes(), header, index, payload);
        Ok(())
    }

    /// Decrypt an RTP payload in place; the stream ciphers are symmetric.
    pub fn decrypt_rtp(&self, header: &RtpHeader, payload: &mut [u8], index: u64) -> Result<()> {
        self.encrypt_rtp(header, payload, index)
    }

    /// Encrypt everything after the RTCP header in place under the SRTCP
    /// `index`.
    pub fn encrypt_rtcp(&self, header: &RtcpHeader, payload: &mut [u8], index: u64) -> Result<()> {
        let (params, session) = self.session(Protocol::Rtcp)?;
        self.check_lifetime(index, Protocol::Rtcp)?;
        // Below the lifetime limit the index fits in 31 bits.
        let mut e_index = index as u32;
        if params.suite.encrypts() {
            e_index |= SRTCP_E_FLAG;
        }
        session
            .schedule
            .cipher
            .apply_rtcp(session.keys.salt.as_bytes(), header, e_index, payload);
        Ok(())
    }

    pub fn decrypt_rtcp(&self, header: &RtcpHeader, payload: &mut [u8], index: u64) -> Result<()> {
        self.encrypt_rtcp(header, payload, index)
    }

    /// Write the SRTP authentication tag of `input` (header || encrypted
    /// payload) to the front of `out`. Returns the tag length, which is
    /// always the suite's `srtp_auth_tag`.
    pub fn hash_rtp(&self, out: &mut [u8], input: &[u8], index: u64) -> Result<usize> {
        let (params, session) = self.session(Protocol::Rtp)?;
        self.check_lifetime(index, Protocol::Rtp)?;
        let tag_len = params.suite.srtp_auth_tag;
        let Some(auth) = &session.schedule.auth else {
            return Ok(0);
        };
        let out = out
            .get_mut(..tag_len)
            .ok_or(CryptoError::Truncated("SRTP tag buffer"))?;
        auth.hash_rtp(out, input, rollover_counter(index));
        Ok(tag_len)
    }

    /// Write the SRTCP authentication tag of `input` (which ends in the
    /// E||index word) to the front of `out`. Returns `srtcp_auth_tag`.
    pub fn hash_rtcp(&self, out: &mut [u8], input: &[u8]) -> Result<usize> {
        let (params, session) = self.session(Protocol::Rtcp)?;
        let tag_len = params.suite.srtcp_auth_tag;
        let Some(auth) = &session.schedule.auth else {
            return Ok(0);
        };
        let out = out
            .get_mut(..tag_len)
            .ok_or(CryptoError::Truncated("SRTCP tag buffer"))?;
        auth.hash_rtcp(out, input);
        Ok(tag_len)
    }

    /// Check an SRTP tag against `input` in constant time.
    pub fn verify_rtp(&self, input: &[u8], tag: &[u8], index: u64) -> Result<()> {
        let (params, session) = self.session(Protocol::Rtp)?;
        match &session.schedule.auth {
            Some(auth) if tag.len() == params.suite.srtp_auth_tag => {
                auth.verify_rtp(input, rollover_counter(index), tag)
            }
            Some(_) => Err(CryptoError::AuthFailed),
            None => Ok(()),
        }
    }

    pub fn verify_rtcp(&self, input: &[u8], tag: &[u8]) -> Result<()> {
        let (params, session) = self.session(Protocol::Rtcp)?;
        match &session.schedule.auth {
            Some(auth) if tag.len() == params.suite.srtcp_auth_tag => {
                auth.verify_rtcp(input, tag)
            }
            Some(_) => Err(CryptoError::AuthFailed),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext")
            .field("status", &self.status())
            .field("suite", &self.suite().map(|s| s.name))
            .field("last_index", &self.last_index)
            .finish()
    }
}

/// Inbound and outbound contexts of one stream, keyed independently.
#[derive(Debug, Default)]
pub struct ContextPair {
    pub inbound: CryptoContext,
    pub outbound: CryptoContext,
}

impl ContextPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cleanup(&mut self) {
        self.inbound.cleanup();
        self.outbound.cleanup();
    }

    /// Take over both halves of `src`, leaving it empty.
    pub fn move_from(&mut self, src: &mut ContextPair) {
        self.inbound.move_from(&mut src.inbound);
        self.outbound.move_from(&mut src.outbound);
    }
}
