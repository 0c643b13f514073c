//! Array streaming: the sub-command exchanges, checked byte-for-byte and
//! end-to-end against a polling responder.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hexlink_protocol::{
    shared_store, ArrayStore, ChannelTransport, CommandTable, HexProtocol, ProtocolError, Session,
    Transport, ERROR, SUBCMD_ARRAY_ELEMENT,
};

const SEQ: u8 = 0x4d;
const SEQ_GET: u8 = 0x4f;

fn drain(far: &mut ChannelTransport) -> Vec<u8> {
    let mut out = Vec::new();
    while far.has_byte() {
        if let Some(b) = far.read_byte() {
            out.push(b);
        }
    }
    out
}

fn started() -> (HexProtocol<ChannelTransport>, ChannelTransport) {
    let (near, far) = ChannelTransport::pair();
    let mut proto = HexProtocol::new();
    proto.start(near);
    (proto, far)
}

fn spawn_responder(
    mut proto: HexProtocol<ChannelTransport>,
    mut table: CommandTable<ChannelTransport>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            if table.poll_once(&mut proto).is_none() {
                thread::sleep(Duration::from_millis(1));
            }
        }
    })
}

// ============================================================================
// Byte-for-byte scenarios
// ============================================================================

#[test]
fn test_set_sequence_wire_bytes() {
    let (mut proto, mut far) = started();

    // Remote advertises 256 slots, then echoes each exchange.
    far.write_all(b"4d\x04");
    far.write_all(b"100\x04");
    for _ in 0..5 {
        far.write_all(b"4d\x04");
    }

    proto
        .dispatch_set_array(SEQ, &[100u16, 110, 120, 130])
        .expect("sequence upload succeeds");

    let mut expected = Vec::new();
    expected.extend_from_slice(b"\x4d1\x04");
    expected.extend_from_slice(b"\x4d3\x040\x0464\x04");
    expected.extend_from_slice(b"\x4d3\x041\x046e\x04");
    expected.extend_from_slice(b"\x4d3\x042\x0478\x04");
    expected.extend_from_slice(b"\x4d3\x043\x0482\x04");
    expected.extend_from_slice(b"\x4d4\x044\x04");
    assert_eq!(drain(&mut far), expected);
}

#[test]
fn test_get_sequence_wire_bytes() {
    let (mut proto, mut far) = started();

    // Starting marker echo, size 2, then one echo + element per index.
    far.write_all(b"4f\x04");
    far.write_all(b"4f\x04");
    far.write_all(b"2\x04");
    far.write_all(b"4f\x04");
    far.write_all(b"64\x04");
    far.write_all(b"4f\x04");
    far.write_all(b"6e\x04");

    let elems: Vec<u16> = proto
        .dispatch_get_array(SEQ_GET, 16)
        .expect("sequence download succeeds");
    assert_eq!(elems, [100, 110]);

    let mut expected = Vec::new();
    expected.extend_from_slice(b"\x4f2\x04");
    expected.extend_from_slice(b"\x4f1\x04");
    expected.extend_from_slice(b"\x4f3\x040\x04");
    expected.extend_from_slice(b"\x4f3\x041\x04");
    assert_eq!(drain(&mut far), expected);
}

#[test]
fn test_responder_rejects_out_of_range_index() {
    let (mut device, mut far) = started();
    let mut store: ArrayStore<u16> = ArrayStore::new(2);

    // Element at index 5 against a 2-slot store.
    far.write_all(b"3\x04");
    far.write_all(b"5\x04");
    far.write_all(b"64\x04");
    assert!(!device.process_set_array(SEQ, &mut store, None));
    assert_eq!(drain(&mut far), b"15\x04");
    assert!(store.is_empty());
}

#[test]
fn test_initiator_surfaces_index_rejection() {
    let (mut proto, mut far) = started();

    // The responder answers the element exchange with the error sentinel.
    far.write_all(b"15\x04");
    proto.put_command(SEQ).expect("command byte");
    proto.put_value(&SUBCMD_ARRAY_ELEMENT).expect("sub-command");
    proto.put_value(&5u16).expect("index");
    proto.put_value(&0x64u16).expect("element");
    assert_eq!(
        proto.check_reply(SEQ),
        Err(ProtocolError::Framing {
            expected: SEQ,
            actual: ERROR
        })
    );
}

#[test]
fn test_oversized_upload_fails_before_elements_move() {
    let (mut proto, mut far) = started();

    far.write_all(b"4d\x04");
    far.write_all(b"2\x04");
    let err = proto
        .dispatch_set_array(SEQ, &[1u16, 2, 3])
        .expect_err("upload must fail");
    assert_eq!(err, ProtocolError::PayloadTooLarge { len: 3, limit: 2 });

    // Only the size query reached the wire.
    assert_eq!(drain(&mut far), b"\x4d1\x04");
}

#[test]
fn test_oversized_download_fails_before_elements_move() {
    let (mut proto, mut far) = started();

    far.write_all(b"4f\x04");
    far.write_all(b"4f\x04");
    far.write_all(b"40\x04");
    let err = proto
        .dispatch_get_array::<u16>(SEQ_GET, 4)
        .expect_err("download must fail");
    assert_eq!(err, ProtocolError::PayloadTooLarge { len: 64, limit: 4 });
}

// ============================================================================
// End-to-end over a polling responder
// ============================================================================

#[test]
fn test_sequence_upload_and_download() {
    let (host_end, dev_end) = ChannelTransport::pair();
    let session = Session::started(host_end);

    let mut device = HexProtocol::new();
    device.start(dev_end);

    let uploads = shared_store(ArrayStore::<u16>::new(256));
    let downloads = shared_store(ArrayStore::with_elems(8, vec![100u16, 110, 120]));
    let finished = Arc::new(AtomicUsize::new(0));

    let mut table: CommandTable<ChannelTransport> = CommandTable::new();
    {
        let finished = Arc::clone(&finished);
        table.on_set_array_with(SEQ, Arc::clone(&uploads), move || {
            finished.fetch_add(1, Ordering::Relaxed);
            true
        });
    }
    table.on_get_array(SEQ_GET, Arc::clone(&downloads));

    let stop = Arc::new(AtomicBool::new(false));
    let responder = spawn_responder(device, table, Arc::clone(&stop));

    {
        let mut txn = session.transaction();
        txn.dispatch_set_array(SEQ, &[100u16, 110, 120, 130])
            .expect("upload succeeds");
    }
    {
        let store = uploads.lock().expect("store lock");
        assert_eq!(store.as_slice(), &[100, 110, 120, 130]);
    }
    // The after-set task ran exactly once, on the finished marker.
    assert_eq!(finished.load(Ordering::Relaxed), 1);

    {
        let mut txn = session.transaction();
        let elems: Vec<u16> = txn
            .dispatch_get_array(SEQ_GET, 8)
            .expect("download succeeds");
        assert_eq!(elems, [100, 110, 120]);
    }

    stop.store(true, Ordering::Relaxed);
    responder.join().expect("responder exits");
}

#[test]
fn test_channel_sequences_select_their_store() {
    let (host_end, dev_end) = ChannelTransport::pair();
    let session = Session::started(host_end);

    let mut device = HexProtocol::new();
    device.start(dev_end);

    // Channel-addressed arrays: one store per channel, registered through
    // a raw handler so the slice lives in one place.
    let stores = Arc::new(std::sync::Mutex::new(vec![
        ArrayStore::<u16>::new(4),
        ArrayStore::<u16>::new(4),
    ]));
    let mut table: CommandTable<ChannelTransport> = CommandTable::new();
    {
        let stores = Arc::clone(&stores);
        table.register(SEQ, move |proto, cmd| {
            let mut stores = stores.lock().expect("store lock");
            proto.process_channel_set_array(cmd, stores.as_mut_slice(), None)
        });
    }

    let stop = Arc::new(AtomicBool::new(false));
    let responder = spawn_responder(device, table, Arc::clone(&stop));

    {
        let mut txn = session.transaction();
        txn.dispatch_channel_set_array(SEQ, 1, &[7u16, 8])
            .expect("upload succeeds");
    }
    {
        let stores = stores.lock().expect("store lock");
        assert!(stores[0].is_empty());
        assert_eq!(stores[1].as_slice(), &[7, 8]);
    }

    // A channel with no store behind it is rejected.
    {
        let mut txn = session.transaction();
        let err = txn
            .dispatch_channel_set_array(SEQ, 5, &[1u16])
            .expect_err("channel 5 must fail");
        assert!(matches!(err, ProtocolError::Framing { actual: ERROR, .. }));
    }

    stop.store(true, Ordering::Relaxed);
    responder.join().expect("responder exits");
}
