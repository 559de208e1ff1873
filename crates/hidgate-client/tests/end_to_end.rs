//! End-to-end tests: typed client ↔ Unix socket ↔ filter control surface.
//!
//! These spin the real server task from `hidgate-filter` against an
//! in-process session, then talk to it exactly the way `hidgatectl` does.

#![cfg(unix)]

use std::sync::{Arc, Mutex};

use hidgate_client::{ClientError, ControlClient, UnixTransport};
use hidgate_core::attributes::KeyboardAttributes;
use hidgate_core::error::ControlError;
use hidgate_core::packet::{predicate, KeyboardPacket};
use hidgate_core::rules::{FilterConfig, FilterMode, FilterRule, ModifyRule};
use hidgate_filter::application::device::{DeviceContext, InputSink};
use hidgate_filter::application::session::FilterSession;

#[derive(Default)]
struct RecordingSink {
    packets: Mutex<Vec<KeyboardPacket>>,
}

impl InputSink<KeyboardPacket> for RecordingSink {
    fn deliver(&self, packets: &[KeyboardPacket]) -> usize {
        self.packets.lock().unwrap().extend_from_slice(packets);
        packets.len()
    }
}

struct Harness {
    session: Arc<FilterSession<KeyboardPacket>>,
    devices: Vec<Arc<DeviceContext<KeyboardPacket>>>,
    sinks: Vec<Arc<RecordingSink>>,
    server: tokio::task::JoinHandle<anyhow::Result<()>>,
    socket_dir: std::path::PathBuf,
    socket_path: std::path::PathBuf,
}

impl Harness {
    /// Starts a server over `device_count` connected simulated keyboards.
    async fn start(device_count: usize) -> Self {
        let session = Arc::new(FilterSession::new());
        let mut devices = Vec::new();
        let mut sinks = Vec::new();
        for _ in 0..device_count {
            let device = session.attach(KeyboardAttributes::enhanced_101_key().encode());
            let sink = Arc::new(RecordingSink::default());
            device
                .connect(sink.clone() as Arc<dyn InputSink<KeyboardPacket>>)
                .expect("connect");
            devices.push(device);
            sinks.push(sink);
        }

        // Each harness gets its own directory; tests in one binary run
        // concurrently, so the pid alone is not unique enough.
        static NEXT_HARNESS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
        let harness_id = NEXT_HARNESS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let socket_dir = std::env::temp_dir().join(format!(
            "hidgate-e2e-{}-{harness_id}",
            std::process::id()
        ));
        std::fs::create_dir_all(&socket_dir).expect("tempdir");
        let socket_path = socket_dir.join("control.sock");
        let listener = tokio::net::UnixListener::bind(&socket_path).expect("bind");
        let server = tokio::spawn(hidgate_filter::infrastructure::server::serve(
            session.clone(),
            listener,
        ));

        Self {
            session,
            devices,
            sinks,
            server,
            socket_dir,
            socket_path,
        }
    }

    async fn client(&self) -> ControlClient<UnixTransport> {
        ControlClient::new(
            UnixTransport::connect(&self.socket_path)
                .await
                .expect("client connect"),
        )
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
        let _ = std::fs::remove_dir_all(&self.socket_dir);
    }
}

#[tokio::test]
async fn test_device_query_and_active_selection() {
    // Arrange
    let harness = Harness::start(2).await;
    let mut client = harness.client().await;

    // Act / Assert
    let query = client.get_devices().await.expect("get_devices");
    assert_eq!((query.active_id, query.count), (0, 2));

    client.set_active_device(1).await.expect("set_active");
    let query = client.get_devices().await.expect("get_devices");
    assert_eq!(query.active_id, 1);

    let out_of_range = client.set_active_device(2).await;
    assert!(matches!(
        out_of_range,
        Err(ClientError::Operation(ControlError::InvalidParameter))
    ));
}

#[tokio::test]
async fn test_filter_round_trip_with_reissue_after_truncation() {
    // Arrange
    let harness = Harness::start(1).await;
    let mut client = harness.client().await;
    let rules: Vec<FilterRule> = (1..=5)
        .map(|i| FilterRule {
            flag_predicates: predicate::KEY_DOWN,
            scan_code: i,
        })
        .collect();

    // Act
    client
        .set_filter(&FilterConfig::Rules(rules.clone()))
        .await
        .expect("set_filter");

    // First read with room for two rules only
    let (mode, true_count, prefix) = client.get_filter(2).await.expect("get_filter");
    assert_eq!(mode, FilterMode::FlagAndScanCode);
    assert_eq!(true_count, 5);
    assert_eq!(prefix, rules[..2].to_vec());

    // Reissue sized from the true count
    let (_, _, full) = client.get_filter(true_count).await.expect("get_filter");
    assert_eq!(full, rules);
}

#[tokio::test]
async fn test_scenario_rule_blocks_injected_batch_until_removed() {
    // One device, active id 0. A drop-on-9 rule swallows real input from
    // the device; after the rule is cleared the same batch flows through
    // unchanged. Injection is used to verify the sink is reachable either
    // way, since injected packets bypass filtering.
    let harness = Harness::start(1).await;
    let mut client = harness.client().await;
    let device = &harness.devices[0];
    let sink = &harness.sinks[0];

    client
        .set_filter(&FilterConfig::Rules(vec![FilterRule {
            flag_predicates: predicate::ANY,
            scan_code: 9,
        }]))
        .await
        .expect("set_filter");

    // Real input is dropped but consumed…
    let consumed = harness
        .session
        .handle_input(device, vec![KeyboardPacket::key_down(0, 9)]);
    assert_eq!(consumed, 1);
    assert!(sink.packets.lock().unwrap().is_empty());

    // …while injection bypasses the rule entirely.
    client
        .insert_packets(&[KeyboardPacket::key_down(0, 9)])
        .await
        .expect("insert");
    assert_eq!(sink.packets.lock().unwrap().len(), 1);

    // Clear the rule; the same real batch now flows through.
    client
        .set_filter(&FilterConfig::None)
        .await
        .expect("set_filter");
    let consumed = harness
        .session
        .handle_input(device, vec![KeyboardPacket::key_down(0, 9)]);
    assert_eq!(consumed, 1);
    assert_eq!(sink.packets.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_modify_rules_rewrite_over_the_wire() {
    let harness = Harness::start(1).await;
    let mut client = harness.client().await;

    client
        .set_modify(&[ModifyRule {
            flag_predicates: predicate::ANY,
            from_code: 0x1E,
            to_code: 0x30,
        }])
        .await
        .expect("set_modify");

    harness
        .session
        .handle_input(&harness.devices[0], vec![KeyboardPacket::key_down(0, 0x1E)]);

    let delivered = harness.sinks[0].packets.lock().unwrap().clone();
    assert_eq!(delivered, vec![KeyboardPacket::key_down(0, 0x30)]);

    let (true_count, rules) = client.get_modify(4).await.expect("get_modify");
    assert_eq!(true_count, 1);
    assert_eq!(rules[0].to_code, 0x30);
}

#[tokio::test]
async fn test_detection_parks_until_input_and_activates_origin() {
    // Arrange – detection client parked on its own connection
    let harness = Harness::start(2).await;
    let mut detect_client = harness.client().await;
    let mut admin_client = harness.client().await;

    let parked = tokio::spawn(async move { detect_client.detect_device_id().await });
    while !harness.session.detection().is_armed() {
        tokio::task::yield_now().await;
    }

    // A concurrent detect on another connection is single-flighted away.
    assert!(matches!(
        admin_client.detect_device_id().await,
        Err(ClientError::Operation(ControlError::OperationInProgress))
    ));

    // Act – keyboard 1 types
    harness
        .session
        .handle_input(&harness.devices[1], vec![KeyboardPacket::key_down(0, 0x1C)]);

    // Assert
    let detected = parked.await.expect("join").expect("detect");
    assert_eq!(detected, 1);
    let query = admin_client.get_devices().await.expect("get_devices");
    assert_eq!(query.active_id, 1);
}

#[tokio::test]
async fn test_attributes_served_verbatim() {
    let harness = Harness::start(1).await;
    let mut client = harness.client().await;

    let attrs = client.get_keyboard_attributes().await.expect("attributes");

    assert_eq!(attrs, KeyboardAttributes::enhanced_101_key());
}
