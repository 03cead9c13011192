//! End-to-end scenarios for the relayseqd stack.
//!
//! Each test wires the real controller, the virtual relay board and the
//! JSON rule store on a temporary file, then drives the inputs tick by
//! tick with explicit instants. No timer runs in the background.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use relayseq_adapter_storage_json::JsonRuleStore;
use relayseq_adapter_virtual::{VirtualRelay, Write};
use relayseq_app::controller::SequenceController;
use relayseq_app::ports::{RelayDevice, RuleStore};
use relayseq_app::services::rule_service::RuleService;
use relayseq_domain::channel::Channel;

fn ch(n: u8) -> Channel {
    Channel::new(n).unwrap()
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn rule_file(content: &serde_json::Value) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("relayseqd-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sequences.json");
    std::fs::write(&path, serde_json::to_vec_pretty(content).unwrap()).unwrap();
    path
}

async fn start(
    content: &serde_json::Value,
) -> (
    SequenceController<VirtualRelay>,
    VirtualRelay,
    RuleService<JsonRuleStore>,
) {
    let path = rule_file(content);
    let relay = VirtualRelay::new();
    let mut controller = SequenceController::new(relay.clone());
    controller.connect().await.unwrap();
    let service = RuleService::new(JsonRuleStore::new(path));
    service.restore(&mut controller).await.unwrap();
    (controller, relay, service)
}

#[tokio::test]
async fn should_cycle_two_step_production_line_from_rule_file() {
    let (mut controller, relay, _) = start(&serde_json::json!({
        "sequences": [
            {"type": "production_line", "name": "press", "steps": "DI1->DO1(ON)\nDI2->DO1(OFF)"}
        ],
        "enabled_states": [true]
    }))
    .await;
    let t0 = Instant::now();

    for cycle in 0..3u64 {
        let base = t0 + ms(cycle * 1_000);

        relay.set_input(ch(1), true);
        controller.tick(base).await;
        assert!(relay.output(ch(1)), "cycle {cycle}: DO1 should switch on");

        relay.set_input(ch(1), false);
        controller.tick(base + ms(250)).await;
        assert!(relay.output(ch(1)));

        relay.set_input(ch(2), true);
        controller.tick(base + ms(500)).await;
        assert!(!relay.output(ch(1)), "cycle {cycle}: DO1 should switch off");

        relay.set_input(ch(2), false);
        controller.tick(base + ms(750)).await;
    }
}

#[tokio::test]
async fn should_revert_timed_output_after_duration() {
    let (mut controller, relay, _) = start(&serde_json::json!({
        "sequences": [
            {"type": "production_line", "steps": ["DI1(EDGE)->DO3(ON):5s"]}
        ]
    }))
    .await;
    let t0 = Instant::now();

    controller.tick(t0).await;
    relay.set_input(ch(1), true);
    controller.tick(t0 + ms(250)).await;
    assert!(relay.output(ch(3)));

    controller.tick(t0 + ms(4_900)).await;
    assert!(relay.output(ch(3)));

    controller.tick(t0 + ms(5_350)).await;
    assert!(!relay.output(ch(3)));
}

#[tokio::test]
async fn should_force_station_off_on_timeout() {
    let (mut controller, relay, _) = start(&serde_json::json!({
        "sequences": [{
            "type": "station",
            "operation_type": "Clamping",
            "part_sensor": 1,
            "process_device": 2,
            "feedback_sensor": 2,
            "timeout": 5,
            "duration": 0
        }]
    }))
    .await;
    let t0 = Instant::now();

    relay.set_input(ch(1), true);
    controller.tick(t0).await;
    assert!(relay.output(ch(2)));

    controller.tick(t0 + ms(4_750)).await;
    assert!(relay.output(ch(2)));

    controller.tick(t0 + ms(5_000)).await;
    assert!(!relay.output(ch(2)));
}

#[tokio::test]
async fn should_apply_initial_states_once_and_skip_disabled_rules() {
    let (mut controller, relay, _) = start(&serde_json::json!({
        "sequences": [
            {
                "type": "simple",
                "logic": "Single DI",
                "di1": 4,
                "do": 5,
                "initial_states": {"7": true}
            },
            {
                "type": "simple",
                "logic": "OR Gate",
                "di1": 1,
                "di2": 2,
                "do": 6
            }
        ],
        "enabled_states": [true, false]
    }))
    .await;
    let t0 = Instant::now();

    controller.tick(t0).await;
    assert!(relay.output(ch(7)));
    let first = relay.take_writes();
    assert_eq!(first, vec![Write::Set { channel: ch(7), on: true }]);

    relay.set_input(ch(1), true);
    controller.tick(t0 + ms(250)).await;
    assert!(!relay.output(ch(6)));
    assert!(relay.take_writes().is_empty());
}

#[tokio::test]
async fn should_skip_tick_while_relay_is_unreadable() {
    let (mut controller, relay, _) = start(&serde_json::json!({
        "sequences": [{"type": "production_line", "steps": "DI1->DO1(ON)"}]
    }))
    .await;
    let t0 = Instant::now();

    relay.set_input(ch(1), true);
    relay.fail_reads(true);
    let report = controller.tick(t0).await;
    assert!(report.skipped);
    assert!(!relay.output(ch(1)));

    relay.fail_reads(false);
    let report = controller.tick(t0 + ms(250)).await;
    assert!(!report.skipped);
    assert!(relay.output(ch(1)));
}

#[tokio::test]
async fn should_apply_end_states_and_release_relay_on_shutdown() {
    let (mut controller, relay, service) = start(&serde_json::json!({
        "sequences": [{
            "type": "production_line",
            "steps": "DI1->DO2(BLINK):10s",
            "end_states": {"8": true}
        }],
        "enabled_states": [true]
    }))
    .await;
    let t0 = Instant::now();

    relay.set_input(ch(1), true);
    controller.tick(t0).await;
    assert!(relay.output(ch(2)));
    relay.take_writes();

    service.persist(&controller).await.unwrap();
    controller.shutdown().await.unwrap();

    assert_eq!(
        relay.take_writes(),
        vec![
            Write::Set { channel: ch(2), on: false },
            Write::Set { channel: ch(8), on: true },
            Write::AllOff,
        ]
    );
    assert!(!relay.is_connected());
}

#[tokio::test]
async fn should_persist_rules_with_enabled_flags() {
    let path = rule_file(&serde_json::json!({
        "sequences": [
            {"type": "production_line", "name": "a", "steps": "DI1->DO1(ON)"},
            {"type": "multi", "name": "b", "steps": "WAIT:2s->DO2(ON)"}
        ],
        "enabled_states": [false]
    }));
    let store = JsonRuleStore::new(&path);
    let service = RuleService::new(store.clone());
    let mut controller = SequenceController::new(VirtualRelay::new());
    assert_eq!(service.restore(&mut controller).await.unwrap(), 2);

    service.persist(&controller).await.unwrap();
    let reloaded = store.load().await.unwrap();

    let flags: Vec<bool> = reloaded.entries.iter().map(|entry| entry.enabled).collect();
    assert_eq!(flags, vec![false, true]);
    let names: Vec<&str> = reloaded
        .entries
        .iter()
        .map(|entry| entry.rule.name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(reloaded.saved_at.is_some());

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["sequences"][1]["type"], "production_line");
    assert_eq!(raw["sequences"][1]["steps"], "WAIT:2s->DO2(ON)");
}

#[tokio::test]
async fn should_start_with_the_readable_rules_when_one_record_is_bad() {
    let (mut controller, relay, _) = start(&serde_json::json!({
        "sequences": [
            {"type": "simple", "name": "broken", "logic": "Single DI", "di1": 1, "do": 9},
            {"type": "production_line", "name": "press", "steps": "DI1->DO1(ON)"}
        ]
    }))
    .await;
    let names: Vec<String> = controller
        .rules()
        .map(|(rule, _)| rule.name.clone())
        .collect();
    assert_eq!(names, vec!["press"]);

    relay.set_input(ch(1), true);
    controller.tick(Instant::now()).await;
    assert!(relay.output(ch(1)));
}
