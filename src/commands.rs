//! Subcommand implementations

use anyhow::{bail, Context, Result};
use base64::Engine;
use zeroize::Zeroizing;

use srtp_relay_crypto::packet::rtcp::is_rtcp_packet;
use srtp_relay_crypto::srtp::protect;
use srtp_relay_crypto::{CryptoContext, CryptoSuite, Protocol, CRYPTO_SUITES};

use crate::config::Config;
use crate::KeyArgs;

fn protocol(args: &KeyArgs) -> Protocol {
    if args.rtcp {
        Protocol::Rtcp
    } else {
        Protocol::Rtp
    }
}

/// Print the suite registry as a table or as JSON
pub fn list_suites(json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(&CRYPTO_SUITES[..])
            .context("Failed to serialize suite table")?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "{:<26} {:>4} {:>5} {:>9} {:>10}  {:<7}",
        "SUITE", "KEY", "SALT", "SRTP TAG", "SRTCP TAG", "CIPHER"
    );
    for suite in CRYPTO_SUITES.iter() {
        println!(
            "{:<26} {:>4} {:>5} {:>9} {:>10}  {:<7}",
            suite.name,
            suite.master_key_len,
            suite.master_salt_len,
            suite.srtp_auth_tag,
            suite.srtcp_auth_tag,
            format!("{:?}", suite.cipher),
        );
    }
    Ok(())
}

/// Random master key || salt for `suite`, in SDES inline form
pub fn keygen(suite: &'static CryptoSuite) -> Result<String> {
    let mut material = Zeroizing::new(vec![0u8; suite.master_key_len + suite.master_salt_len]);
    getrandom::getrandom(&mut material[..]).context("Failed to gather randomness")?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&material[..]);
    Ok(format!("inline:{}", encoded))
}

fn keyed_context(config: &Config, args: &KeyArgs) -> Result<CryptoContext> {
    let suite = config.suite(args.suite.as_deref())?;
    let params = config.params(suite, args.key.as_deref())?;
    let mut ctx = CryptoContext::with_params(params);
    ctx.derive_session_keys(protocol(args))
        .context("Session key derivation failed")?;
    Ok(ctx)
}

/// Print the derived session keys in hex
pub fn derive(config: &Config, args: &KeyArgs) -> Result<()> {
    let ctx = keyed_context(config, args)?;
    let Some(keys) = ctx.session_keys() else {
        bail!("Context has no session keys");
    };

    println!("suite:        {}", ctx.suite().map(|s| s.name).unwrap_or("-"));
    println!("protocol:     {}", keys.protocol);
    println!("session key:  {}", hex::encode(keys.key.as_bytes()));
    println!("session salt: {}", hex::encode(keys.salt.as_bytes()));
    println!("auth key:     {}", hex::encode(keys.auth_key.as_bytes()));
    Ok(())
}

fn decode_packet(packet: &str) -> Result<Vec<u8>> {
    hex::decode(packet.trim()).context("Packet is not valid hex")
}

/// Protect one packet and print the result in hex
pub fn protect(
    config: &Config,
    args: &KeyArgs,
    last_index: Option<u64>,
    packet: &str,
) -> Result<()> {
    let mut ctx = keyed_context(config, args)?;
    if let Some(index) = last_index {
        ctx.advance_index(index);
    }
    let mut packet = decode_packet(packet)?;
    if args.rtcp != is_rtcp_packet(&packet) {
        tracing::warn!("Packet does not look like {}", protocol(args));
    }

    let index = match protocol(args) {
        Protocol::Rtp => protect::protect_rtp(&mut ctx, &mut packet),
        Protocol::Rtcp => protect::protect_rtcp(&mut ctx, &mut packet),
    }
    .context("Protect failed")?;

    tracing::debug!("protected {} bytes at index {}", packet.len(), index);
    println!("{}", hex::encode(&packet));
    Ok(())
}

/// Unprotect one packet and print the plaintext in hex
pub fn unprotect(
    config: &Config,
    args: &KeyArgs,
    last_index: Option<u64>,
    packet: &str,
) -> Result<()> {
    let mut ctx = keyed_context(config, args)?;
    if let Some(index) = last_index {
        ctx.accept_index(index)?;
    }
    let mut packet = decode_packet(packet)?;

    let index = match protocol(args) {
        Protocol::Rtp => protect::unprotect_rtp(&mut ctx, &mut packet),
        Protocol::Rtcp => protect::unprotect_rtcp(&mut ctx, &mut packet),
    }
    .context("Unprotect failed")?;

    tracing::debug!("unprotected {} bytes at index {}", packet.len(), index);
    println!("{}", hex::encode(&packet));
    Ok(())
}
