//! Remote device detection.
//!
//! Before a device adapter commits to a port it probes the stream:
//! configure the port, wait out the bootloader, start the protocol, purge
//! stale bytes, and run the adapter's own `test_protocol` check. The probe
//! restores the previous answer timeout and ends the protocol regardless of
//! the outcome, so a failed probe leaves the port reusable.

use std::thread;

use hexlink_protocol::{Command, HexProtocol, Transport};

use crate::serial::SerialTransport;
use crate::settings::SerialSettings;

/// Outcome of probing a stream for a responding device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    /// The device answered the probe.
    CanCommunicate,
    /// The port opened but nothing (or the wrong thing) answered.
    CannotCommunicate,
    /// The port name is unusable.
    Misconfigured,
}

/// Port names that mean "no port chosen yet".
fn is_placeholder(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.is_empty() || lower == "undefined" || lower == "unknown"
}

/// Probe `port_name` for a live responder.
///
/// `test_protocol` runs one or more exchanges (typically a firmware-version
/// get) and reports whether the expected device answered.
pub fn try_stream(
    port_name: &str,
    settings: &SerialSettings,
    test_protocol: impl FnOnce(&mut HexProtocol<SerialTransport>) -> bool,
) -> DetectionStatus {
    if is_placeholder(port_name) {
        return DetectionStatus::Misconfigured;
    }

    let transport = match SerialTransport::open(port_name, settings) {
        Ok(t) => t,
        Err(err) => {
            tracing::debug!(port = port_name, error = %err, "probe could not open port");
            return DetectionStatus::CannotCommunicate;
        }
    };

    // The bootloader listens for firmware uploads right after the port
    // opens; probing too early wedges it.
    thread::sleep(settings.post_open_wait());

    let status = probe_transport(transport, test_protocol);
    tracing::debug!(port = port_name, ?status, "probe finished");
    status
}

/// Transport-level probe: start, purge, test, end. Split out from
/// [`try_stream`] so adapters with exotic links can reuse the sequence.
pub fn probe_transport(
    transport: SerialTransport,
    test_protocol: impl FnOnce(&mut HexProtocol<SerialTransport>) -> bool,
) -> DetectionStatus {
    let mut proto = HexProtocol::new();
    proto.start(transport);
    if let Some(t) = proto.transport_mut() {
        if let Err(err) = t.purge() {
            tracing::debug!(error = %err, "purge failed before probe");
        }
    }
    let answered = test_protocol(&mut proto);
    proto.end();
    if answered {
        DetectionStatus::CanCommunicate
    } else {
        DetectionStatus::CannotCommunicate
    }
}

/// Standard `test_protocol` body: get the firmware identifier and require
/// the expected prefix.
pub fn check_firmware<T: Transport>(
    proto: &mut HexProtocol<T>,
    cmd: Command,
    expected_prefix: &str,
) -> bool {
    match proto.dispatch_get_string(cmd) {
        Ok(id) => {
            let matched = id.starts_with(expected_prefix);
            if !matched {
                tracing::debug!(firmware = %id, expected = expected_prefix, "unexpected firmware id");
            }
            matched
        }
        Err(err) => {
            tracing::debug!(error = %err, "firmware query failed");
            false
        }
    }
}
