//! Fixed-capacity key buffers and the parameters a context is set up with.

use std::fmt;

use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::{CryptoError, Result};
use super::suite::CryptoSuite;
use super::{MAX_MASTER_KEY_LEN, MAX_MASTER_SALT_LEN, MAX_MKI_LEN};

/// Inline key storage of capacity `N` with a logical length.
///
/// The bytes are wiped when the buffer is dropped, and `Debug` never
/// prints them.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyBuf<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> KeyBuf<N> {
    /// Zero-filled buffer of logical length `len` (clamped to capacity).
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: [0u8; N],
            len: len.min(N),
        }
    }

    /// Copy `data` in; `None` if it exceeds the capacity.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() > N {
            return None;
        }
        let mut buf = Self::zeroed(data.len());
        buf.bytes[..data.len()].copy_from_slice(data);
        Some(buf)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }
}

impl<const N: usize> PartialEq for KeyBuf<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const N: usize> Eq for KeyBuf<N> {}

impl<const N: usize> fmt::Debug for KeyBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBuf({} bytes)", self.len)
    }
}

/// Everything signaling hands over to key a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoParams {
    pub(crate) suite: &'static CryptoSuite,
    pub(crate) master_key: KeyBuf<MAX_MASTER_KEY_LEN>,
    pub(crate) master_salt: KeyBuf<MAX_MASTER_SALT_LEN>,
    pub(crate) mki: u64,
    pub(crate) mki_len: usize,
    pub(crate) tag: u32,
}

impl CryptoParams {
    /// Validate master key and salt against the suite's declared lengths.
    ///
    /// No MKI is used and the crypto tag is 0; see [`Self::with_mki`] and
    /// [`Self::with_tag`].
    pub fn new(
        suite: &'static CryptoSuite,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self> {
        if master_key.len() != suite.master_key_len {
            return Err(CryptoError::InvalidKeyLength {
                what: "master key",
                suite: suite.name,
                expected: suite.master_key_len,
                got: master_key.len(),
            });
        }
        if master_salt.len() != suite.master_salt_len {
            return Err(CryptoError::InvalidKeyLength {
                what: "master salt",
                suite: suite.name,
                expected: suite.master_salt_len,
                got: master_salt.len(),
            });
        }

        // Suite lengths are checked against buffer capacities at build time.
        let master_key =
            KeyBuf::from_slice(master_key).ok_or(CryptoError::InvalidKeyLength {
                what: "master key",
                suite: suite.name,
                expected: MAX_MASTER_KEY_LEN,
                got: master_key.len(),
            })?;
        let master_salt =
            KeyBuf::from_slice(master_salt).ok_or(CryptoError::InvalidKeyLength {
                what: "master salt",
                suite: suite.name,
                expected: MAX_MASTER_SALT_LEN,
                got: master_salt.len(),
            })?;

        Ok(Self {
            suite,
            master_key,
            master_salt,
            mki: 0,
            mki_len: 0,
            tag: 0,
        })
    }

    /// Split a base64 `key || salt` blob (the SDES inline key form).
    ///
    /// Anything after a `|` (lifetime, MKI) is ignored.
    pub fn from_inline_key(suite: &'static CryptoSuite, inline: &str) -> Result<Self> {
        let b64 = inline.trim();
        let b64 = b64.strip_prefix("inline:").unwrap_or(b64);
        let b64 = b64.split('|').next().unwrap_or(b64);

        let decoded = zeroize::Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| CryptoError::Decode(e.to_string()))?,
        );

        let needed = suite.master_key_len + suite.master_salt_len;
        if decoded.len() != needed {
            return Err(CryptoError::InvalidKeyLength {
                what: "inline key material",
                suite: suite.name,
                expected: needed,
                got: decoded.len(),
            });
        }

        let (key, salt) = decoded.split_at(suite.master_key_len);
        Self::new(suite, key, salt)
    }

    /// Attach a Master Key Identifier of `mki_len` bytes (0 disables MKI).
    pub fn with_mki(mut self, mki: u64, mki_len: usize) -> Result<Self> {
        if mki_len > MAX_MKI_LEN {
            return Err(CryptoError::InvalidMkiLength(mki_len));
        }
        self.mki = mki;
        self.mki_len = mki_len;
        Ok(self)
    }

    /// Record the crypto attribute tag signaling selected this entry with.
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    pub fn suite(&self) -> &'static CryptoSuite {
        self.suite
    }

    pub fn mki(&self) -> u64 {
        self.mki
    }

    pub fn mki_len(&self) -> usize {
        self.mki_len
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Big-endian MKI in exactly `mki_len` bytes, zero-padded on the left
    /// past eight bytes.
    pub fn encode_mki(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.mki_len];
        let be = self.mki.to_be_bytes();
        let n = self.mki_len.min(be.len());
        out[self.mki_len - n..].copy_from_slice(&be[be.len() - n..]);
        out
    }
}
