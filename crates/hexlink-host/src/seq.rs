//! String-sequence marshalling for array commands.
//!
//! Property sequences arrive from the host application as strings. Each
//! element is parsed with a caller-supplied codec into the wire element
//! type, then the normal array-set flow streams the values. A parse
//! failure fails the whole sequence before anything touches the wire.

use thiserror::Error;

use hexlink_protocol::{Channel, Command, HexProtocol, ProtocolError, Transport, WireValue};

/// Failures while uploading a string sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// An element failed the caller's parse.
    #[error("element {index} ({text:?}) did not parse")]
    Parse {
        /// Index of the offending element.
        index: usize,
        /// Its original text.
        text: String,
    },

    /// The wire exchange failed after parsing.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

fn parse_all<V>(
    items: &[String],
    parse: impl Fn(&str) -> Option<V>,
) -> Result<Vec<V>, SequenceError> {
    let mut elems = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match parse(item) {
            Some(v) => elems.push(v),
            None => {
                return Err(SequenceError::Parse {
                    index,
                    text: item.clone(),
                })
            }
        }
    }
    Ok(elems)
}

/// Parse `items` with `parse` and stream them under `cmd`.
pub fn set_sequence<T, V>(
    proto: &mut HexProtocol<T>,
    cmd: Command,
    items: &[String],
    parse: impl Fn(&str) -> Option<V>,
) -> Result<(), SequenceError>
where
    T: Transport,
    V: WireValue,
{
    let elems = parse_all(items, parse)?;
    proto.dispatch_set_array(cmd, &elems)?;
    Ok(())
}

/// Channel variant of [`set_sequence`].
pub fn set_channel_sequence<T, V>(
    proto: &mut HexProtocol<T>,
    cmd: Command,
    chan: Channel,
    items: &[String],
    parse: impl Fn(&str) -> Option<V>,
) -> Result<(), SequenceError>
where
    T: Transport,
    V: WireValue,
{
    let elems = parse_all(items, parse)?;
    proto.dispatch_channel_set_array(cmd, chan, &elems)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlink_protocol::{ChannelTransport, Transport as _};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_failure_reports_index_and_text() {
        let (near, _far) = ChannelTransport::pair();
        let mut proto = HexProtocol::new();
        proto.start(near);

        let err = set_sequence::<_, u16>(&mut proto, 0x4d, &strings(&["100", "bad"]), |s| {
            s.parse().ok()
        })
        .expect_err("parse must fail");
        assert_eq!(
            err,
            SequenceError::Parse {
                index: 1,
                text: "bad".to_string()
            }
        );
    }

    #[test]
    fn test_parsed_sequence_reaches_the_wire() {
        let (near, mut far) = ChannelTransport::pair();
        let mut proto = HexProtocol::new();
        proto.start(near);

        // Max size 256, then echo each of the four exchanges that follow.
        far.write_all(b"4d\x04");
        far.write_all(b"100\x04");
        for _ in 0..3 {
            far.write_all(b"4d\x04");
        }

        set_sequence::<_, u16>(&mut proto, 0x4d, &strings(&["100", "110"]), |s| s.parse().ok())
            .expect("sequence succeeds");

        // Decimal 100/110 parsed, then re-encoded as hex 64/6e.
        let mut received = Vec::new();
        while far.has_byte() {
            if let Some(b) = far.read_byte() {
                received.push(b);
            }
        }
        let mut expected = Vec::new();
        expected.extend_from_slice(b"\x4d1\x04");
        expected.extend_from_slice(b"\x4d3\x040\x0464\x04");
        expected.extend_from_slice(b"\x4d3\x041\x046e\x04");
        expected.extend_from_slice(b"\x4d4\x042\x04");
        assert_eq!(received, expected);
    }
}
