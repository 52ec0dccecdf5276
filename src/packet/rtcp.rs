//! RTCP common header view (RFC 3550 6.4).
//!
//! Only the first RTCP header of a compound packet stays in the clear under
//! SRTCP; everything after it is the encrypted portion.

/// RTCP header: V/P/RC(1) + PT(1) + length(2) + SSRC(4) = 8 bytes.
pub const RTCP_HEADER_SIZE: usize = 8;

/// RTCP packet types (RFC 3550 section 12.1).
pub const PT_SR: u8 = 200;
pub const PT_RR: u8 = 201;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcpHeader {
    /// V||P||RC||PT||length, as it sits on the wire (AES-f8 IV input).
    pub first_word: u32,
    pub ssrc: u32,
}

impl RtcpHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < RTCP_HEADER_SIZE {
            return None;
        }
        Some(Self {
            first_word: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            ssrc: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
        })
    }

    pub fn packet_type(&self) -> u8 {
        (self.first_word >> 16) as u8
    }
}

/// Check if a UDP packet is RTCP (demux from RTP on the same port).
///
/// RTCP packets have payload type 200-204 in byte[1].
pub fn is_rtcp_packet(data: &[u8]) -> bool {
    if data.len() < RTCP_HEADER_SIZE {
        return false;
    }
    (200..=204).contains(&data[1])
}

/// Build a minimal Sender Report: header + 20 bytes of zeroed sender info.
pub fn encode_sender_report(ssrc: u32) -> Vec<u8> {
    let mut pkt = vec![0u8; 28];
    pkt[0] = 0x80; // V=2, P=0, RC=0
    pkt[1] = PT_SR;
    // Length in 32-bit words minus 1: (28/4)-1 = 6
    pkt[3] = 6;
    pkt[4..8].copy_from_slice(&ssrc.to_be_bytes());
    pkt
}
