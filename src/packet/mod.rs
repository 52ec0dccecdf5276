//! Read-only views of the RTP and RTCP header fields the crypto core needs.
//!
//! These are not full parsers: framing, extensions and compound RTCP are
//! the caller's business. Each view copies the fixed-offset fields out of
//! the packet so the payload can then be transformed in place.

pub mod rtcp;
pub mod rtp;

pub use rtcp::RtcpHeader;
pub use rtp::RtpHeader;
