//! End-to-end tests across sender, codec, store, and dispatcher

use gatelink_core::{
    ChannelHuntingSender, FirmwareVersion, FixedClock, PeerIdentity, SensorFrame,
    transport::ScriptedTransport,
};
use gatelink_station::{
    events::{EventSink, LedDriver, NullLeds, NullSink, StationEvent},
    storage::{MemoryStorage, Storage, StorageError},
    Dispatch, Station,
};

const SLOTS: usize = 2;
const CAP: usize = 25;

type TestStation<S> = Station<S, FixedClock, SLOTS, CAP>;

const SENSOR: PeerIdentity = PeerIdentity::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

#[derive(Default)]
struct RecordingSink(Vec<StationEvent>);

impl EventSink for RecordingSink {
    fn publish(&mut self, event: &StationEvent) {
        self.0.push(*event);
    }
}

#[derive(Default)]
struct RecordingLeds(Vec<(u8, bool, bool)>);

impl LedDriver for RecordingLeds {
    fn set_sensor_status(&mut self, slot: u8, open: bool, battery_low: bool) {
        self.0.push((slot, open, battery_low));
    }
    fn set_off(&mut self, _slot: u8) {}
}

/// Storage that starts failing writes after a budget, for fail-soft tests
struct FlakyStorage {
    inner: MemoryStorage<4096>,
    writes_left: usize,
}

impl FlakyStorage {
    fn new(writes_left: usize) -> Self {
        Self {
            inner: MemoryStorage::new(),
            writes_left,
        }
    }
}

impl Storage for FlakyStorage {
    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        if self.writes_left == 0 {
            return Err(StorageError::Io);
        }
        self.writes_left -= 1;
        self.inner.write(offset, data)
    }
}

/// The radio path end to end: a frame leaves the sensor through the
/// channel-hunting sender and is dispatched by the station, attempt
/// counter and all.
#[test]
fn sensor_report_travels_link_to_history() {
    // Sensor side: first two attempts unheard, third lands
    let mut sender = ChannelHuntingSender::new(ScriptedTransport::fail_then_deliver(2));
    let frame = SensorFrame::new(true, 3732, FirmwareVersion::new(1, 4));
    let report = sender.send_frame(frame, &SENSOR).unwrap();
    assert!(report.delivered);
    assert_eq!(report.attempts, 3);

    // The payload that actually made it over the air
    let transport = sender.into_transport();
    let delivered_payload = transport.sent.last().unwrap().clone();

    // Station side
    let mut station =
        TestStation::open(MemoryStorage::<4096>::new(), FixedClock::new(1_700_000_000)).unwrap();
    let mut sink = NullSink;
    station.start_pairing(0, &mut sink);
    station.handle_frame(SENSOR, &gatelink_core::PairingFrame.encode(), &mut NullLeds, &mut sink);

    let dispatch = station.handle_frame(SENSOR, &delivered_payload, &mut NullLeds, &mut sink);
    assert_eq!(dispatch, Dispatch::Reading { slot: 0 });

    let stored = station.history_mut().read_latest(0);
    assert!(stored.frame.door_open);
    assert_eq!(stored.frame.battery_millivolts, 3732);
    // Two failed attempts preceded the delivered frame
    assert_eq!(stored.frame.send_attempts, 2);
    assert_eq!(stored.frame.firmware_version, FirmwareVersion::new(1, 4));
    assert_eq!(stored.timestamp, 1_700_000_000);
}

/// A frame from an address no slot is paired to must never be attributed
/// or persisted, even when a slot is still all-zero.
#[test]
fn unknown_sender_never_attributed() {
    let mut station =
        TestStation::open(MemoryStorage::<4096>::new(), FixedClock::new(1_000)).unwrap();
    let mut sink = RecordingSink::default();
    let mut leds = RecordingLeds::default();

    let payload = SensorFrame::new(true, 3900, FirmwareVersion::new(1, 0)).encode();
    let dispatch = station.handle_frame(SENSOR, &payload, &mut leds, &mut sink);

    assert_eq!(dispatch, Dispatch::Unknown);
    for slot in 0..SLOTS {
        assert!(station.latest(slot).is_none());
        assert_eq!(station.history_mut().count(slot), 0);
    }
    assert!(leds.0.is_empty());
    assert_eq!(
        sink.0,
        vec![StationEvent::UnknownSender { address: SENSOR }]
    );
}

/// Pairing and history survive a reboot through the persisted blob.
#[test]
fn state_survives_reopen() {
    let mut storage = MemoryStorage::<4096>::new();

    {
        let mut station = TestStation::open(storage, FixedClock::new(500)).unwrap();
        let mut sink = NullSink;
        station.start_pairing(1, &mut sink);
        station.handle_frame(SENSOR, &gatelink_core::PairingFrame.encode(), &mut NullLeds, &mut sink);

        let payload = SensorFrame::new(false, 4050, FirmwareVersion::new(2, 0)).encode();
        station.handle_frame(SENSOR, &payload, &mut NullLeds, &mut sink);
        storage = station.into_parts().0.into_storage();
    }

    let mut station = TestStation::open(storage, FixedClock::new(900)).unwrap();
    // Peer table reloaded: the same sensor is still slot 1
    assert_eq!(station.peer(1), Some(&SENSOR));
    // Last-known state warmed from history
    let latest = station.latest(1).unwrap();
    assert_eq!(latest.frame.battery_millivolts, 4050);
    assert_eq!(latest.timestamp, 500);

    // And it still dispatches without re-pairing
    let payload = SensorFrame::new(true, 4000, FirmwareVersion::new(2, 0)).encode();
    let dispatch = station.handle_frame(SENSOR, &payload, &mut NullLeds, &mut NullSink);
    assert_eq!(dispatch, Dispatch::Reading { slot: 1 });
}

/// Storage gone bad mid-flight: readings keep flowing to LEDs and UI,
/// history just stops growing.
#[test]
fn storage_failure_fails_soft() {
    // Format costs 5 writes (header + 2 peers + 2 indices), pairing
    // costs 2 more; the append's record write is the first to fail
    let probe = FlakyStorage::new(7);

    let mut station = TestStation::open(probe, FixedClock::new(42)).unwrap();
    let mut sink = NullSink;
    station.start_pairing(0, &mut sink);
    station.handle_frame(SENSOR, &gatelink_core::PairingFrame.encode(), &mut NullLeds, &mut sink);

    let mut leds = RecordingLeds::default();
    let mut events = RecordingSink::default();
    let payload = SensorFrame::new(true, 3100, FirmwareVersion::new(1, 0)).encode();
    let dispatch = station.handle_frame(SENSOR, &payload, &mut leds, &mut events);

    // Append failed silently; the reading still went everywhere else
    assert_eq!(dispatch, Dispatch::Reading { slot: 0 });
    assert!(station.latest(0).is_some());
    assert_eq!(leds.0.len(), 1);
    assert!(matches!(events.0[0], StationEvent::ReadingChanged { battery_low: true, .. }));
}

/// Ring eviction across the whole stack: only the newest CAP readings
/// remain after sustained reporting.
#[test]
fn sustained_reporting_keeps_only_newest_records() {
    let mut station =
        TestStation::open(MemoryStorage::<4096>::new(), FixedClock::new(0)).unwrap();
    let mut sink = NullSink;
    station.start_pairing(0, &mut sink);
    station.handle_frame(SENSOR, &gatelink_core::PairingFrame.encode(), &mut NullLeds, &mut sink);

    for i in 0..(CAP as u16 + 10) {
        let payload = SensorFrame::new(i % 2 == 0, 3500 + i, FirmwareVersion::new(1, 0)).encode();
        station.handle_frame(SENSOR, &payload, &mut NullLeds, &mut sink);
    }

    let all = station.history_mut().read_all(0);
    assert_eq!(all.len(), CAP);
    // Oldest surviving record is reading number 10
    assert_eq!(all.first().unwrap().frame.battery_millivolts, 3510);
    assert_eq!(all.last().unwrap().frame.battery_millivolts, 3500 + CAP as u16 + 9);
}
