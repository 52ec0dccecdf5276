//! Payload confidentiality: AES-CM, AES-f8 and the NULL cipher.

use aes::cipher::{BlockEncrypt, InnerIvInit, KeyInit, StreamCipher};
use aes::{Aes128, Block};

use super::error::{CryptoError, Result};
use super::suite::CipherAlgorithm;
use crate::packet::{RtcpHeader, RtpHeader};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Expanded cipher key schedule, built once per session key.
pub(crate) enum CipherState {
    AesCm(Aes128),
    AesF8 {
        /// E(k_e, .)
        data: Aes128,
        /// E(k_e XOR m, .), only used to form IV'
        iv: Aes128,
    },
    Null,
}

impl CipherState {
    pub(crate) fn new(
        algorithm: CipherAlgorithm,
        session_key: &[u8],
        session_salt: &[u8],
    ) -> Result<Self> {
        match algorithm {
            CipherAlgorithm::AesCm => Ok(CipherState::AesCm(aes_key(session_key)?)),
            CipherAlgorithm::AesF8 => {
                // m = k_s || 0x555..5, as long as k_e
                let mut masked = [0u8; 16];
                if session_key.len() != masked.len() {
                    return Err(key_len_error(session_key.len()));
                }
                for (i, b) in masked.iter_mut().enumerate() {
                    let m = session_salt.get(i).copied().unwrap_or(0x55);
                    *b = session_key[i] ^ m;
                }
                let state = CipherState::AesF8 {
                    data: aes_key(session_key)?,
                    iv: aes_key(&masked)?,
                };
                zeroize::Zeroize::zeroize(&mut masked);
                Ok(state)
            }
            CipherAlgorithm::Null => Ok(CipherState::Null),
        }
    }

    /// Encrypt or decrypt an RTP payload in place.
    pub(crate) fn apply_rtp(&self, salt: &[u8], header: &RtpHeader, index: u64, payload: &mut [u8]) {
        match self {
            CipherState::AesCm(aes) => {
                let iv = aes_cm_iv(salt, header.ssrc, index);
                aes_cm_keystream(aes, iv).apply_keystream(payload);
            }
            CipherState::AesF8 { data, iv } => {
                // IV = 0x00 || M || PT || SEQ || TS || SSRC || ROC
                let mut f8_iv = [0u8; 16];
                f8_iv[1] = header.marker_pt;
                f8_iv[2..4].copy_from_slice(&header.sequence_number.to_be_bytes());
                f8_iv[4..8].copy_from_slice(&header.timestamp.to_be_bytes());
                f8_iv[8..12].copy_from_slice(&header.ssrc.to_be_bytes());
                f8_iv[12..16].copy_from_slice(&super::rollover_counter(index).to_be_bytes());
                f8_apply(data, iv, f8_iv, payload);
            }
            CipherState::Null => {}
        }
    }

    /// Encrypt or decrypt the portion of an RTCP packet after its header.
    ///
    /// `e_index` is the SRTCP trailer word (E flag || 31-bit index).
    pub(crate) fn apply_rtcp(&self, salt: &[u8], header: &RtcpHeader, e_index: u32, payload: &mut [u8]) {
        match self {
            CipherState::AesCm(aes) => {
                let srtcp_index = e_index & super::SRTCP_INDEX_MASK;
                let iv = aes_cm_iv(salt, header.ssrc, srtcp_index as u64);
                aes_cm_keystream(aes, iv).apply_keystream(payload);
            }
            CipherState::AesF8 { data, iv } => {
                // IV = 0x00000000 || E || SRTCP index || V||P||RC||PT||length || SSRC
                let mut f8_iv = [0u8; 16];
                f8_iv[4..8].copy_from_slice(&e_index.to_be_bytes());
                f8_iv[8..12].copy_from_slice(&header.first_word.to_be_bytes());
                f8_iv[12..16].copy_from_slice(&header.ssrc.to_be_bytes());
                f8_apply(data, iv, f8_iv, payload);
            }
            CipherState::Null => {}
        }
    }
}

fn aes_key(key: &[u8]) -> Result<Aes128> {
    Aes128::new_from_slice(key).map_err(|_| key_len_error(key.len()))
}

/// CTR keystream over an already expanded key, so the schedule is not
/// rebuilt per packet.
fn aes_cm_keystream(aes: &Aes128, iv: [u8; 16]) -> Aes128Ctr {
    Aes128Ctr::from_core(ctr::CtrCore::inner_iv_init(aes.clone(), &iv.into()))
}

fn key_len_error(len: usize) -> CryptoError {
    CryptoError::KeySchedule(format!("AES-128 needs a 16-byte session key, got {}", len))
}

/// Build the AES-CM IV (RFC 3711, 4.1.1).
///
/// IV = (k_s * 2^16) XOR (SSRC * 2^64) XOR (i * 2^16), where `i` is the
/// 48-bit packet index (SRTP) or the SRTCP index. The last two bytes are
/// the block counter and start at zero.
fn aes_cm_iv(salt: &[u8], ssrc: u32, index: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[4..8].copy_from_slice(&ssrc.to_be_bytes());
    iv[8..14].copy_from_slice(&index.to_be_bytes()[2..]);
    for (b, s) in iv.iter_mut().zip(salt.iter().take(14)) {
        *b ^= s;
    }
    iv
}

/// AES-f8 keystream (RFC 3711, 4.1.2.2), XORed into `buf`.
///
/// ```text
/// IV'  = E(k_e XOR m, IV)
/// S(j) = E(k_e, IV' XOR j XOR S(j-1)),  S(-1) = 0
/// ```
fn f8_apply(data: &Aes128, iv_cipher: &Aes128, iv: [u8; 16], buf: &mut [u8]) {
    let mut iv_prime = Block::from(iv);
    iv_cipher.encrypt_block(&mut iv_prime);

    let mut s = Block::default();
    for (j, chunk) in buf.chunks_mut(16).enumerate() {
        let counter = (j as u128).to_be_bytes();
        for k in 0..16 {
            s[k] ^= iv_prime[k] ^ counter[k];
        }
        data.encrypt_block(&mut s);
        for (b, k) in chunk.iter_mut().zip(s.iter()) {
            *b ^= k;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::rtp;

    const KEY: [u8; 16] = [0x11; 16];
    const SALT: [u8; 14] = [0x22; 14];

    fn rtp_header(seq: u16) -> RtpHeader {
        RtpHeader::parse(&rtp::encode(0, seq, 160, 0xDEADBEEF, &[])).unwrap()
    }

    #[test]
    fn test_aes_cm_iv_layout() {
        let iv = aes_cm_iv(&[0u8; 14], 0x0102_0304, 0x0A0B_0C0D_0E0F);
        assert_eq!(
            iv,
            [0, 0, 0, 0, 1, 2, 3, 4, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0, 0]
        );

        let salted = aes_cm_iv(&[0xFF; 14], 0, 0);
        assert_eq!(&salted[..14], &[0xFF; 14]);
        assert_eq!(&salted[14..], &[0, 0]);
    }

    #[test]
    fn test_aes_cm_is_symmetric() {
        let state = CipherState::new(CipherAlgorithm::AesCm, &KEY, &SALT).unwrap();
        let header = rtp_header(7);
        let mut payload = vec![0x5A; 100];
        state.apply_rtp(&SALT, &header, 7, &mut payload);
        assert_ne!(payload, vec![0x5A; 100]);
        state.apply_rtp(&SALT, &header, 7, &mut payload);
        assert_eq!(payload, vec![0x5A; 100]);
    }

    #[test]
    fn test_keystream_depends_on_index() {
        let state = CipherState::new(CipherAlgorithm::AesCm, &KEY, &SALT).unwrap();
        let header = rtp_header(7);
        let mut a = vec![0u8; 32];
        let mut b = vec![0u8; 32];
        state.apply_rtp(&SALT, &header, 7, &mut a);
        state.apply_rtp(&SALT, &header, 7 + 0x1_0000, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_f8_is_symmetric_across_blocks() {
        let state = CipherState::new(CipherAlgorithm::AesF8, &KEY, &SALT).unwrap();
        let header = rtp_header(1);
        let original: Vec<u8> = (0..77u8).collect();
        let mut payload = original.clone();
        state.apply_rtp(&SALT, &header, 1, &mut payload);
        assert_ne!(payload, original);
        state.apply_rtp(&SALT, &header, 1, &mut payload);
        assert_eq!(payload, original);
    }

    #[test]
    fn test_f8_blocks_are_chained() {
        // Identical plaintext blocks must not yield identical ciphertext.
        let state = CipherState::new(CipherAlgorithm::AesF8, &KEY, &SALT).unwrap();
        let mut payload = vec![0u8; 48];
        state.apply_rtp(&SALT, &rtp_header(3), 3, &mut payload);
        assert_ne!(&payload[..16], &payload[16..32]);
        assert_ne!(&payload[16..32], &payload[32..48]);
    }

    #[test]
    fn test_rtcp_e_flag_feeds_f8_iv() {
        let state = CipherState::new(CipherAlgorithm::AesF8, &KEY, &SALT).unwrap();
        let header = RtcpHeader { first_word: 0x80C8_0006, ssrc: 1 };
        let mut with_e = vec![0u8; 20];
        let mut without_e = vec![0u8; 20];
        state.apply_rtcp(&SALT, &header, super::super::SRTCP_E_FLAG | 5, &mut with_e);
        state.apply_rtcp(&SALT, &header, 5, &mut without_e);
        assert_ne!(with_e, without_e);
    }

    #[test]
    fn test_f8_rfc3711_vector() {
        // RFC 3711, appendix B.2
        let key = hex::decode("234829008467be186c3de14aae72d62c").unwrap();
        let salt = hex::decode("32f2870d").unwrap();
        let header = RtpHeader {
            marker_pt: 0x6e,
            sequence_number: 0x5cba,
            timestamp: 0x5068_1de5,
            ssrc: 0x5c62_1599,
            header_len: 12,
        };
        let index = (0xd462_564a_u64 << 16) | 0x5cba;

        let state = CipherState::new(CipherAlgorithm::AesF8, &key, &salt).unwrap();
        let mut payload = b"pseudorandomness is the next best thing".to_vec();
        state.apply_rtp(&salt, &header, index, &mut payload);
        assert_eq!(
            hex::encode(&payload[..32]),
            "019ce7a26e7854014a6366aa95d4eefd1ad4172a14f9faf455b7f1d4b62bd08f"
        );
    }

    #[test]
    fn test_null_cipher_passthrough() {
        let state = CipherState::new(CipherAlgorithm::Null, &KEY, &SALT).unwrap();
        let mut payload = vec![0x42; 10];
        state.apply_rtp(&SALT, &rtp_header(1), 1, &mut payload);
        assert_eq!(payload, vec![0x42; 10]);
    }

    #[test]
    fn test_rejects_short_session_key() {
        assert!(matches!(
            CipherState::new(CipherAlgorithm::AesCm, &[0u8; 8], &SALT),
            Err(CryptoError::KeySchedule(_))
        ));
        assert!(matches!(
            CipherState::new(CipherAlgorithm::AesF8, &[0u8; 8], &SALT),
            Err(CryptoError::KeySchedule(_))
        ));
    }
}
