//! SRTP/SRTCP packet framing on top of a [`CryptoContext`].
//!
//! ```text
//! SRTP:  | RTP header | encrypted payload | MKI? | tag |
//!        <------ authenticated ----------->
//!
//! SRTCP: | RTCP header | encrypted rest | E|index | MKI? | tag |
//!        <------------ authenticated ------------->
//! ```
//!
//! Each function transforms one packet held in a `Vec<u8>` in place and
//! returns the index it was protected under. On error the packet is left
//! as it was.

use super::context::CryptoContext;
use super::error::{CryptoError, Result};
use super::suite::Protocol;
use super::{MAX_AUTH_TAG_LEN, SRTCP_E_FLAG, SRTCP_INDEX_MASK};
use crate::packet::rtcp::RTCP_HEADER_SIZE;
use crate::packet::{RtcpHeader, RtpHeader};

/// Length of the SRTCP E||index trailer word.
const SRTCP_INDEX_LEN: usize = 4;

/// Expected MKI bytes and tag length, or `NoSessionKey`.
fn trailer(ctx: &CryptoContext, protocol: Protocol) -> Result<(Vec<u8>, usize)> {
    if !ctx.has_session_key() {
        return Err(CryptoError::NoSessionKey);
    }
    let params = ctx.params().ok_or(CryptoError::NoSessionKey)?;
    Ok((params.encode_mki(), params.suite().auth_tag_len(protocol)))
}

/// Turn an RTP packet into SRTP.
pub fn protect_rtp(ctx: &mut CryptoContext, packet: &mut Vec<u8>) -> Result<u64> {
    let header = RtpHeader::parse(packet).ok_or(CryptoError::Truncated("RTP header"))?;
    let (mki, _) = trailer(ctx, Protocol::Rtp)?;
    let index = ctx.estimate_index(header.sequence_number);

    ctx.encrypt_rtp(&header, &mut packet[header.header_len..], index)?;

    let auth_end = packet.len();
    let mut tag = [0u8; MAX_AUTH_TAG_LEN];
    let tag_len = ctx.hash_rtp(&mut tag, &packet[..auth_end], index)?;
    packet.extend_from_slice(&mki);
    packet.extend_from_slice(&tag[..tag_len]);

    ctx.advance_index(index);
    Ok(index)
}

/// Verify and decrypt an SRTP packet back into RTP.
pub fn unprotect_rtp(ctx: &mut CryptoContext, packet: &mut Vec<u8>) -> Result<u64> {
    let (expected_mki, tag_len) = trailer(ctx, Protocol::Rtp)?;
    let header = RtpHeader::parse(packet).ok_or(CryptoError::Truncated("SRTP header"))?;

    let trailer_len = expected_mki.len() + tag_len;
    if packet.len() < header.header_len + trailer_len {
        return Err(CryptoError::Truncated("SRTP packet"));
    }
    let auth_end = packet.len() - trailer_len;
    let (mki, tag) = packet[auth_end..].split_at(expected_mki.len());
    if mki != expected_mki.as_slice() {
        return Err(CryptoError::MkiMismatch);
    }

    let index = ctx.estimate_index(header.sequence_number);
    ctx.check_index(index)?;
    ctx.check_lifetime(index, Protocol::Rtp)?;
    ctx.verify_rtp(&packet[..auth_end], tag, index)?;

    packet.truncate(auth_end);
    ctx.decrypt_rtp(&header, &mut packet[header.header_len..], index)?;
    ctx.accept_index(index)?;
    Ok(index)
}

/// Turn an RTCP (compound) packet into SRTCP.
///
/// The SRTCP index is the context's own counter: 0 for the first packet,
/// then one past the last one sent.
pub fn protect_rtcp(ctx: &mut CryptoContext, packet: &mut Vec<u8>) -> Result<u64> {
    let header = RtcpHeader::parse(packet).ok_or(CryptoError::Truncated("RTCP header"))?;
    let (mki, _) = trailer(ctx, Protocol::Rtcp)?;
    let index = ctx.next_index();

    ctx.encrypt_rtcp(&header, &mut packet[RTCP_HEADER_SIZE..], index)?;

    let mut word = index as u32 & SRTCP_INDEX_MASK;
    if ctx.suite().is_some_and(|suite| suite.encrypts()) {
        word |= SRTCP_E_FLAG;
    }
    packet.extend_from_slice(&word.to_be_bytes());

    let auth_end = packet.len();
    let mut tag = [0u8; MAX_AUTH_TAG_LEN];
    let tag_len = match ctx.hash_rtcp(&mut tag, &packet[..auth_end]) {
        Ok(n) => n,
        Err(e) => {
            packet.truncate(auth_end - SRTCP_INDEX_LEN);
            return Err(e);
        }
    };
    packet.extend_from_slice(&mki);
    packet.extend_from_slice(&tag[..tag_len]);

    ctx.advance_index(index);
    Ok(index)
}

/// Verify and decrypt an SRTCP packet back into RTCP.
///
/// The encrypted portion is only decrypted when the sender set the E flag.
pub fn unprotect_rtcp(ctx: &mut CryptoContext, packet: &mut Vec<u8>) -> Result<u64> {
    let (expected_mki, tag_len) = trailer(ctx, Protocol::Rtcp)?;
    let trailer_len = SRTCP_INDEX_LEN + expected_mki.len() + tag_len;
    if packet.len() < RTCP_HEADER_SIZE + trailer_len {
        return Err(CryptoError::Truncated("SRTCP packet"));
    }
    let header = RtcpHeader::parse(packet).ok_or(CryptoError::Truncated("SRTCP header"))?;

    let auth_end = packet.len() - expected_mki.len() - tag_len;
    let (mki, tag) = packet[auth_end..].split_at(expected_mki.len());
    if mki != expected_mki.as_slice() {
        return Err(CryptoError::MkiMismatch);
    }

    let rtcp_end = auth_end - SRTCP_INDEX_LEN;
    let word = u32::from_be_bytes([
        packet[rtcp_end],
        packet[rtcp_end + 1],
        packet[rtcp_end + 2],
        packet[rtcp_end + 3],
    ]);
    let index = (word & SRTCP_INDEX_MASK) as u64;
    let encrypted = word & SRTCP_E_FLAG != 0;

    ctx.check_index(index)?;
    ctx.check_lifetime(index, Protocol::Rtcp)?;
    ctx.verify_rtcp(&packet[..auth_end], tag)?;

    packet.truncate(rtcp_end);
    if encrypted {
        ctx.decrypt_rtcp(&header, &mut packet[RTCP_HEADER_SIZE..], index)?;
    }
    ctx.accept_index(index)?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{rtcp, rtp};
    use crate::srtp::keys::CryptoParams;
    use crate::srtp::suite::{find_suite, CRYPTO_SUITES};
    use crate::srtp::CryptoSuite;
    use proptest::prelude::*;

    const MASTER_KEY: &str = "e1f97a0d3e018be0d64fa32c06de4139";
    const MASTER_SALT: &str = "0ec675ad498afeebb6960b3aabe6";

    fn context(suite: &'static CryptoSuite, protocol: Protocol, mki_len: usize) -> CryptoContext {
        let key = hex::decode(MASTER_KEY).unwrap();
        let salt = hex::decode(MASTER_SALT).unwrap();
        let params = CryptoParams::new(suite, &key, &salt)
            .unwrap()
            .with_mki(0xE1F9_7A0D, mki_len)
            .unwrap();
        let mut ctx = CryptoContext::with_params(params);
        ctx.derive_session_keys(protocol).unwrap();
        ctx
    }

    fn default_pair(protocol: Protocol) -> (CryptoContext, CryptoContext) {
        let suite = find_suite("AES_CM_128_HMAC_SHA1_80").unwrap();
        (context(suite, protocol, 0), context(suite, protocol, 0))
    }

    #[test]
    fn test_srtp_known_answer() {
        let (mut send, mut recv) = default_pair(Protocol::Rtp);
        let plaintext = hex::decode(
            "800f1234decafbadcafebabeabababababababababababababababab",
        )
        .unwrap();
        let ciphertext = hex::decode(
            "800f1234decafbadcafebabe4e55dc4ce79978d88ca4d215949d2402b78d6acc99ea179b8dbb",
        )
        .unwrap();

        let mut packet = plaintext.clone();
        assert_eq!(protect_rtp(&mut send, &mut packet).unwrap(), 0x1234);
        assert_eq!(packet, ciphertext);

        assert_eq!(unprotect_rtp(&mut recv, &mut packet).unwrap(), 0x1234);
        assert_eq!(packet, plaintext);
    }

    #[test]
    fn test_srtcp_known_answer() {
        let (mut send, mut recv) = default_pair(Protocol::Rtcp);
        let plaintext =
            hex::decode("81c8000bcafebabeabababababababababababababababab")
                .unwrap();
        let ciphertext = hex::decode(
            "81c8000bcafebabe7128035be487b9bdbef89041f977a5a880000001993e08cd54d6c1230798",
        )
        .unwrap();

        // the reference sender numbers its first SRTCP packet 1
        send.advance_index(0);
        let mut packet = plaintext.clone();
        assert_eq!(protect_rtcp(&mut send, &mut packet).unwrap(), 1);
        assert_eq!(packet, ciphertext);

        assert_eq!(unprotect_rtcp(&mut recv, &mut packet).unwrap(), 1);
        assert_eq!(packet, plaintext);
    }

    #[test]
    fn test_rtp_roundtrip_every_suite_with_mki() {
        for suite in CRYPTO_SUITES.iter() {
            let mut send = context(suite, Protocol::Rtp, 4);
            let mut recv = context(suite, Protocol::Rtp, 4);
            for (seq, len) in [(100u16, 0usize), (101, 1), (102, 172), (103, 1500)] {
                let original = rtp::encode(111, seq, 960 * seq as u32, 0xAABB_CCDD, &vec![0x5Au8; len]);
                let mut packet = original.clone();
                protect_rtp(&mut send, &mut packet).unwrap();
                assert_eq!(packet.len(), original.len() + 4 + suite.srtp_auth_tag);
                let mki_at = original.len();
                assert_eq!(&packet[mki_at..mki_at + 4], &[0xE1, 0xF9, 0x7A, 0x0D]);

                unprotect_rtp(&mut recv, &mut packet).unwrap();
                assert_eq!(packet, original, "{} len {}", suite.name, len);
            }
            assert_eq!(recv.last_index(), Some(103));
        }
    }

    #[test]
    fn test_rtcp_roundtrip_every_suite() {
        for suite in CRYPTO_SUITES.iter() {
            let mut send = context(suite, Protocol::Rtcp, 0);
            let mut recv = context(suite, Protocol::Rtcp, 0);
            for expected_index in 0..3u64 {
                let original = rtcp::encode_sender_report(0x0102_0304);
                let mut packet = original.clone();
                assert_eq!(protect_rtcp(&mut send, &mut packet).unwrap(), expected_index);

                let word_at = original.len();
                let word = u32::from_be_bytes(packet[word_at..word_at + 4].try_into().unwrap());
                assert_eq!(word & SRTCP_E_FLAG != 0, suite.encrypts(), "{}", suite.name);
                assert_eq!((word & SRTCP_INDEX_MASK) as u64, expected_index);

                assert_eq!(unprotect_rtcp(&mut recv, &mut packet).unwrap(), expected_index);
                assert_eq!(packet, original, "{}", suite.name);
            }
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (mut send, mut recv) = default_pair(Protocol::Rtp);
        let mut packet = rtp::encode(0, 1, 160, 7, &[1, 2, 3, 4, 5, 6, 7, 8]);
        protect_rtp(&mut send, &mut packet).unwrap();
        packet[14] ^= 0x01;
        let before = packet.clone();

        assert_eq!(unprotect_rtp(&mut recv, &mut packet), Err(CryptoError::AuthFailed));
        assert_eq!(packet, before);
        assert_eq!(recv.last_index(), None);
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let (mut send, mut recv) = default_pair(Protocol::Rtcp);
        let mut packet = rtcp::encode_sender_report(9);
        protect_rtcp(&mut send, &mut packet).unwrap();
        let last = packet.len() - 1;
        packet[last] ^= 0x80;
        assert_eq!(unprotect_rtcp(&mut recv, &mut packet), Err(CryptoError::AuthFailed));
    }

    #[test]
    fn test_replayed_packet_rejected() {
        let (mut send, mut recv) = default_pair(Protocol::Rtp);
        let mut packet = rtp::encode(0, 500, 0, 7, &[0u8; 20]);
        protect_rtp(&mut send, &mut packet).unwrap();

        let mut first = packet.clone();
        unprotect_rtp(&mut recv, &mut first).unwrap();
        assert_eq!(
            unprotect_rtp(&mut recv, &mut packet),
            Err(CryptoError::Replayed { index: 500, last: 500 })
        );
    }

    #[test]
    fn test_mki_mismatch() {
        let suite = find_suite("AES_CM_128_HMAC_SHA1_32").unwrap();
        let mut send = context(suite, Protocol::Rtp, 4);
        let mut recv = context(suite, Protocol::Rtp, 4);
        let mut packet = rtp::encode(0, 1, 0, 7, &[0u8; 20]);
        protect_rtp(&mut send, &mut packet).unwrap();
        let mki_at = packet.len() - suite.srtp_auth_tag - 4;
        packet[mki_at] = 0x00;
        assert_eq!(unprotect_rtp(&mut recv, &mut packet), Err(CryptoError::MkiMismatch));
    }

    #[test]
    fn test_truncated_packets() {
        let (mut send, mut recv) = default_pair(Protocol::Rtp);
        let mut short = vec![0x80u8, 0, 0, 1];
        assert_eq!(
            protect_rtp(&mut send, &mut short),
            Err(CryptoError::Truncated("RTP header"))
        );

        // valid header, but no room for the tag
        let mut no_tag = rtp::encode(0, 1, 0, 7, &[0u8; 4]);
        assert_eq!(
            unprotect_rtp(&mut recv, &mut no_tag),
            Err(CryptoError::Truncated("SRTP packet"))
        );

        let (_, mut rtcp_recv) = default_pair(Protocol::Rtcp);
        let mut report = rtcp::encode_sender_report(1);
        report.truncate(16);
        assert_eq!(
            unprotect_rtcp(&mut rtcp_recv, &mut report),
            Err(CryptoError::Truncated("SRTCP packet"))
        );
    }

    #[test]
    fn test_requires_session_key() {
        let suite = find_suite("AES_CM_128_HMAC_SHA1_80").unwrap();
        let key = hex::decode(MASTER_KEY).unwrap();
        let salt = hex::decode(MASTER_SALT).unwrap();
        let mut keyed = CryptoContext::with_params(CryptoParams::new(suite, &key, &salt).unwrap());
        let mut packet = rtp::encode(0, 1, 0, 7, &[1, 2, 3]);
        let original = packet.clone();

        assert_eq!(protect_rtp(&mut keyed, &mut packet), Err(CryptoError::NoSessionKey));
        assert_eq!(packet, original);
        assert_eq!(
            protect_rtcp(&mut CryptoContext::new(), &mut rtcp::encode_sender_report(1)),
            Err(CryptoError::NoSessionKey)
        );
    }

    #[test]
    fn test_sequence_rollover() {
        let (mut send, mut recv) = default_pair(Protocol::Rtp);
        let mut indices = Vec::new();
        for seq in [0xFFFEu16, 0xFFFF, 0x0000, 0x0001] {
            let mut packet = rtp::encode(0, seq, 0, 7, &[0xCC; 32]);
            indices.push(protect_rtp(&mut send, &mut packet).unwrap());
            unprotect_rtp(&mut recv, &mut packet).unwrap();
            assert_eq!(&packet[12..], &[0xCC; 32]);
        }
        assert_eq!(indices, vec![0xFFFE, 0xFFFF, 0x1_0000, 0x1_0001]);
    }

    #[test]
    fn test_protect_refuses_to_wrap_packet_index() {
        let (mut send, _) = default_pair(Protocol::Rtp);
        send.advance_index(crate::srtp::MAX_PACKET_INDEX - 0xF);
        let mut packet = rtp::encode(0, 5, 0, 7, &[0x42; 16]);
        let original = packet.clone();
        assert!(matches!(
            protect_rtp(&mut send, &mut packet),
            Err(CryptoError::LifetimeExceeded { protocol: Protocol::Rtp, .. })
        ));
        assert_eq!(packet, original);
    }

    #[test]
    fn test_lifetime_exhausted_on_protect() {
        let (mut send, _) = default_pair(Protocol::Rtcp);
        send.advance_index((1 << 31) - 1);
        let mut packet = rtcp::encode_sender_report(1);
        let original = packet.clone();
        assert!(matches!(
            protect_rtcp(&mut send, &mut packet),
            Err(CryptoError::LifetimeExceeded { protocol: Protocol::Rtcp, .. })
        ));
        assert_eq!(packet, original);
    }

    proptest! {
        #[test]
        fn prop_protect_unprotect_restores_packet(
            suite_idx in 0usize..CRYPTO_SUITES.len(),
            seq in any::<u16>(),
            ssrc in any::<u32>(),
            payload in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let suite = &CRYPTO_SUITES[suite_idx];
            let mut send = context(suite, Protocol::Rtp, 0);
            let mut recv = context(suite, Protocol::Rtp, 0);
            let original = rtp::encode(96, seq, 0, ssrc, &payload);
            let mut packet = original.clone();

            let sent = protect_rtp(&mut send, &mut packet).unwrap();
            prop_assert_eq!(packet.len(), original.len() + suite.srtp_auth_tag);
            let received = unprotect_rtp(&mut recv, &mut packet).unwrap();
            prop_assert_eq!(sent, received);
            prop_assert_eq!(packet, original);
        }
    }
}
