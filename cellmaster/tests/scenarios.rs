// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios driving the master through its dispatcher loop.
//!
//! Each test wires the master to recording stand-ins for the site bus and
//! the operator transport, feeds it literal inputs, and asserts on the
//! externally observable publications. Time is paused, so the multi-minute
//! phase timeouts run instantly.

use camino_tempfile::Utf8TempDir;
use cellmaster::{
    config::MasterConfig,
    coordinator::MasterBuilder,
    messages::{
        ControlState, OperatorPush, ResourceRequest, SiteBus, SiteCommand, SiteEvent,
        SiteEventKind, TestAppState,
    },
    settings::SettingName,
    stdf::{MemoryStdfFactory, StdfRecord},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Everything the master sent towards the sites.
#[derive(Clone, Debug, PartialEq)]
enum BusRecord {
    State(String),
    Command(SiteCommand),
}

struct RecordingBus {
    tx: UnboundedSender<BusRecord>,
}

impl SiteBus for RecordingBus {
    fn broadcast(&mut self, command: SiteCommand) {
        let _ = self.tx.send(BusRecord::Command(command));
    }

    fn publish_state(&mut self, state: &str) {
        let _ = self.tx.send(BusRecord::State(state.to_owned()));
    }
}

/// A running master plus handles on all of its seams.
struct Cell {
    site_tx: UnboundedSender<SiteEvent>,
    operator_tx: UnboundedSender<Value>,
    bus_rx: UnboundedReceiver<BusRecord>,
    push_rx: UnboundedReceiver<OperatorPush>,
    stdf: MemoryStdfFactory,
    _tempdir: Utf8TempDir,
}

fn cell_config(sites: &[&str], tempdir: &Utf8TempDir) -> MasterConfig {
    serde_json::from_value(json!({
        "device_id": "SCT_2010",
        "sites": sites,
        "broker_host": "127.0.0.1",
        "broker_port": 1883,
        "enable_timeouts": true,
        "environment": "F1",
        "skip_jobdata_verification": true,
        "user_settings_filepath": tempdir.path().join("user_settings.json"),
    }))
    .expect("config parses")
}

impl Cell {
    fn start(sites: &[&str]) -> Self {
        Self::start_with(sites, |_| {})
    }

    fn start_with(sites: &[&str], customize: impl FnOnce(&mut MasterBuilder)) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let tempdir = Utf8TempDir::new().expect("tempdir");
        let stdf = MemoryStdfFactory::new();

        let mut builder = MasterBuilder::new(cell_config(sites, &tempdir));
        builder.set_stdf_factory(Box::new(stdf.clone()));
        customize(&mut builder);

        let (bus_tx, bus_rx) = unbounded_channel();
        let (push_tx, push_rx) = unbounded_channel();
        let master = builder
            .build(
                Box::new(RecordingBus { tx: bus_tx }),
                move |push| {
                    let _ = push_tx.send(push);
                },
            )
            .expect("master builds");

        let (site_tx, site_rx) = unbounded_channel();
        let (operator_tx, operator_rx) = unbounded_channel();
        tokio::spawn(master.run(site_rx, operator_rx));

        Self {
            site_tx,
            operator_tx,
            bus_rx,
            push_rx,
            stdf,
            _tempdir: tempdir,
        }
    }

    /// Lets the dispatcher drain its queues. Time is paused, so this is
    /// instant in real time.
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    /// Sleeps past at least one UI tick.
    async fn tick(&self) {
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    fn control_status(&self, site: &str, state: ControlState) {
        self.site(site, SiteEventKind::ControlStatus {
            interface_version: 1,
            state,
        });
    }

    fn testapp_status(&self, site: &str, state: TestAppState) {
        self.site(site, SiteEventKind::TestAppStatus { state });
    }

    fn testresult(&self, site: &str, payload: Value) {
        self.site(site, SiteEventKind::TestAppTestResult { payload });
    }

    fn testsummary(&self, site: &str, payload: Value) {
        self.site(site, SiteEventKind::TestAppTestSummary { payload });
    }

    fn resource_request(&self, site: &str, resource_id: &str, config: Value) {
        self.site(
            site,
            SiteEventKind::TestAppResourceRequest(ResourceRequest {
                resource_id: resource_id.to_owned(),
                config,
            }),
        );
    }

    fn site(&self, site: &str, kind: SiteEventKind) {
        self.site_tx
            .send(SiteEvent {
                site_id: site.into(),
                kind,
            })
            .expect("master is running");
    }

    fn operator(&self, command: Value) {
        self.operator_tx.send(command).expect("master is running");
    }

    fn drain_bus(&mut self) -> Vec<BusRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.bus_rx.try_recv() {
            records.push(record);
        }
        records
    }

    fn drain_pushes(&mut self) -> Vec<OperatorPush> {
        let mut pushes = Vec::new();
        while let Ok(push) = self.push_rx.try_recv() {
            pushes.push(push);
        }
        pushes
    }
}

fn published_states(records: &[BusRecord]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|record| match record {
            BusRecord::State(state) => Some(state.as_str()),
            BusRecord::Command(_) => None,
        })
        .collect()
}

fn broadcasts(records: &[BusRecord]) -> Vec<&SiteCommand> {
    records
        .iter()
        .filter_map(|record| match record {
            BusRecord::Command(command) => Some(command),
            BusRecord::State(_) => None,
        })
        .collect()
}

/// Drives a two-site cell from startup to `ready` with a loaded lot.
async fn bring_to_ready(cell: &Cell, lot: &str) {
    cell.control_status("s1", ControlState::Idle);
    cell.control_status("s2", ControlState::Idle);
    cell.settle().await;

    cell.operator(json!({"command": "load", "payload": {"lot_number": lot}}));
    cell.settle().await;

    for site in ["s1", "s2"] {
        cell.control_status(site, ControlState::Loading);
        cell.control_status(site, ControlState::Busy);
        cell.testapp_status(site, TestAppState::Idle);
    }
    cell.settle().await;
}

/// Runs one complete, uneventful test cycle from `ready` back to `ready`.
async fn run_cycle(cell: &Cell) {
    cell.operator(json!({"command": "next"}));
    cell.settle().await;

    for site in ["s1", "s2"] {
        cell.testapp_status(site, TestAppState::Testing);
    }
    cell.testapp_status("s1", TestAppState::Idle);
    cell.testresult("s1", json!({"site": "s1", "part_id": 1}));
    cell.testresult("s2", json!({"site": "s2", "part_id": 1}));
    cell.testapp_status("s2", TestAppState::Idle);
    cell.settle().await;
}

#[tokio::test(start_paused = true)]
async fn s1_happy_path_two_sites() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;

    bring_to_ready(&cell, "306426.001").await;
    run_cycle(&cell).await;

    cell.operator(json!({"command": "unload"}));
    cell.settle().await;
    cell.testapp_status("s1", TestAppState::Terminated);
    cell.testapp_status("s2", TestAppState::Terminated);
    cell.control_status("s1", ControlState::Idle);
    cell.control_status("s2", ControlState::Idle);
    cell.settle().await;

    let records = cell.drain_bus();
    assert_eq!(
        published_states(&records),
        [
            "connecting",
            "initialized",
            "loading",
            "ready",
            "testing",
            "ready",
            "unloading",
            "initialized",
        ],
    );

    // load, next, terminate went out; no resource negotiation happened.
    let commands = broadcasts(&records);
    assert!(matches!(commands[0], SiteCommand::Load { .. }));
    assert!(matches!(commands[1], SiteCommand::Next { .. }));
    assert!(matches!(commands[2], SiteCommand::Terminate));
    assert_eq!(commands.len(), 3);

    // The aggregator saw the header and both results.
    let results: Vec<_> = cell
        .stdf
        .records()
        .into_iter()
        .filter(|record| matches!(record, StdfRecord::Result(_)))
        .collect();
    assert_eq!(results.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn s2_resource_negotiation_same_request() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;

    cell.operator(json!({"command": "next"}));
    cell.settle().await;
    cell.testapp_status("s1", TestAppState::Testing);
    cell.testapp_status("s2", TestAppState::Testing);
    cell.resource_request("s1", "R", json!({"v": 1}));
    cell.resource_request("s2", "R", json!({"v": 1}));
    cell.settle().await;

    // The simulated actuator answers shortly after the quorum forms.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let records = cell.drain_bus();
    let configs: Vec<_> = broadcasts(&records)
        .into_iter()
        .filter(|command| matches!(command, SiteCommand::ResourceConfig { .. }))
        .collect();
    assert_eq!(
        configs,
        [&SiteCommand::ResourceConfig {
            resource_id: "R".to_owned(),
            config: json!({"v": 1}),
        }],
    );

    // Both sites resume and the cycle completes normally.
    for site in ["s1", "s2"] {
        cell.testapp_status(site, TestAppState::Idle);
        cell.testresult(site, json!({"site": site}));
    }
    cell.settle().await;

    let records = cell.drain_bus();
    assert_eq!(published_states(&records), ["ready"]);
}

#[tokio::test(start_paused = true)]
async fn s3_resource_mismatch_fails_the_cycle() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;

    cell.operator(json!({"command": "next"}));
    cell.settle().await;
    cell.testapp_status("s1", TestAppState::Testing);
    cell.testapp_status("s2", TestAppState::Testing);
    cell.resource_request("s1", "R", json!({"v": 1}));
    cell.resource_request("s2", "R", json!({"v": 2}));
    cell.settle().await;

    let records = cell.drain_bus();
    assert!(published_states(&records).contains(&"softerror"));
    // No configuration was ever applied.
    assert!(
        !broadcasts(&records)
            .iter()
            .any(|command| matches!(command, SiteCommand::ResourceConfig { .. }))
    );

    // The status push names both sites.
    cell.tick().await;
    let status = cell
        .drain_pushes()
        .into_iter()
        .filter_map(|push| match push {
            OperatorPush::Status {
                state,
                error_message,
            } if state == "softerror" => Some(error_message),
            _ => None,
        })
        .next_back()
        .expect("a softerror status was pushed");
    assert!(status.contains("s2") && status.contains("s1"), "{status}");
}

#[tokio::test(start_paused = true)]
async fn s4_load_timeout_reports_softerror() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;

    cell.control_status("s1", ControlState::Idle);
    cell.control_status("s2", ControlState::Idle);
    cell.settle().await;
    cell.operator(json!({"command": "load", "payload": {"lot_number": "306426.001"}}));
    cell.settle().await;

    // Nobody ever reports the test program up.
    tokio::time::sleep(Duration::from_secs(181)).await;

    let records = cell.drain_bus();
    assert_eq!(
        published_states(&records),
        ["connecting", "initialized", "loading", "softerror"],
    );

    let status = cell
        .drain_pushes()
        .into_iter()
        .filter_map(|push| match push {
            OperatorPush::Status {
                state,
                error_message,
            } if state == "softerror" => Some(error_message),
            _ => None,
        })
        .next()
        .expect("a softerror status was pushed");
    assert_eq!(status, "not all sites loaded the testprogram");
}

#[tokio::test(start_paused = true)]
async fn s5_reset_recovers_from_softerror() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;

    // A cycle that never finishes: the test timeout trips.
    cell.operator(json!({"command": "next"}));
    cell.settle().await;
    tokio::time::sleep(Duration::from_secs(31)).await;

    cell.operator(json!({"command": "reset"}));
    cell.settle().await;
    cell.control_status("s1", ControlState::Idle);
    cell.control_status("s2", ControlState::Idle);
    cell.settle().await;

    let records = cell.drain_bus();
    let states = published_states(&records);
    assert!(
        states.ends_with(&["softerror", "connecting", "initialized"]),
        "{states:?}"
    );
    assert!(
        broadcasts(&records)
            .iter()
            .any(|command| matches!(command, SiteCommand::Reset))
    );
}

#[tokio::test(start_paused = true)]
async fn s6_interface_version_mismatch_is_terminal() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;

    cell.site("s1", SiteEventKind::ControlStatus {
        interface_version: 2,
        state: ControlState::Idle,
    });
    cell.settle().await;

    let records = cell.drain_bus();
    assert_eq!(published_states(&records), ["connecting", "error"]);

    // Terminal: neither a reset nor further site reports move the master.
    cell.operator(json!({"command": "reset"}));
    cell.control_status("s1", ControlState::Idle);
    cell.control_status("s2", ControlState::Idle);
    cell.settle().await;
    assert_eq!(published_states(&cell.drain_bus()), Vec::<&str>::new());
}

#[tokio::test(start_paused = true)]
async fn summaries_tear_down_the_aggregator() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;
    run_cycle(&cell).await;

    cell.testsummary("s1", json!({"site": "s1", "parts": 1}));
    cell.testsummary("s2", json!({"site": "s2", "parts": 1}));
    cell.settle().await;

    let records = cell.stdf.records();
    assert_eq!(
        records.first(),
        Some(&StdfRecord::Created {
            node_name: "SCT_2010.Master".to_owned(),
            lot_number: "306426.001".to_owned(),
            job_name: "306426.001".to_owned(),
        }),
    );
    assert_eq!(records.get(1), Some(&StdfRecord::Header));
    assert_eq!(records.last(), Some(&StdfRecord::Finalized));
    assert_eq!(
        records
            .iter()
            .filter(|record| matches!(record, StdfRecord::Summary(_)))
            .count(),
        2,
    );

    // A stray summary afterwards is tolerated and changes nothing.
    cell.testsummary("s1", json!({}));
    cell.settle().await;
    assert_eq!(cell.stdf.records().len(), records.len());
    assert!(!published_states(&cell.drain_bus()).contains(&"softerror"));
}

#[tokio::test(start_paused = true)]
async fn lot_variant_rides_along_after_a_pipe() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001|dummymock").await;
    run_cycle(&cell).await;

    // The aggregate is tied to the bare lot number; the full string stays
    // the job name.
    assert_eq!(
        cell.stdf.records().first(),
        Some(&StdfRecord::Created {
            node_name: "SCT_2010.Master".to_owned(),
            lot_number: "306426.001".to_owned(),
            job_name: "306426.001|dummymock".to_owned(),
        }),
    );
    let records = cell.drain_bus();
    assert!(published_states(&records).contains(&"ready"));
}

#[tokio::test(start_paused = true)]
async fn results_stream_to_the_operator_each_tick() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;
    run_cycle(&cell).await;

    cell.tick().await;
    let pushes = cell.drain_pushes();
    let streamed: Vec<_> = pushes
        .iter()
        .filter(|push| matches!(push, OperatorPush::TestResult { .. }))
        .collect();
    assert_eq!(streamed.len(), 2);

    // getresults replays the historical buffer.
    cell.operator(json!({"command": "getresults"}));
    cell.tick().await;
    let results = cell
        .drain_pushes()
        .into_iter()
        .find_map(|push| match push {
            OperatorPush::Results { results } => Some(results),
            _ => None,
        })
        .expect("a results push");
    assert_eq!(results.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn usersettings_are_broadcast_with_next() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;

    cell.operator(json!({
        "command": "usersettings",
        "payload": [
            {"name": "stop_on_fail", "active": true},
            {"name": "stop_at_test_number", "active": true, "value": 17},
        ],
    }));
    cell.settle().await;
    cell.operator(json!({"command": "next"}));
    cell.settle().await;

    let records = cell.drain_bus();
    let settings = broadcasts(&records)
        .into_iter()
        .find_map(|command| match command {
            SiteCommand::Next { settings } => Some(settings.clone()),
            _ => None,
        })
        .expect("a next broadcast");
    assert!(settings.get(SettingName::StopOnFail).active);
    assert_eq!(settings.get(SettingName::StopAtTestNumber).value, 17);

    // The settings push reflects the change too.
    cell.tick().await;
    let pushed = cell
        .drain_pushes()
        .into_iter()
        .filter_map(|push| match push {
            OperatorPush::UserSettings { settings } => Some(settings),
            _ => None,
        })
        .next_back()
        .expect("a settings push");
    let stop_on_fail = pushed
        .iter()
        .find(|setting| setting.name == SettingName::StopOnFail)
        .unwrap();
    assert!(stop_on_fail.active);
}

#[tokio::test(start_paused = true)]
async fn load_resets_usersettings_to_defaults() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;

    cell.control_status("s1", ControlState::Idle);
    cell.control_status("s2", ControlState::Idle);
    cell.settle().await;

    cell.operator(json!({
        "command": "usersettings",
        "payload": [{"name": "single_step", "active": true}],
    }));
    cell.settle().await;

    cell.operator(json!({"command": "load", "payload": {"lot_number": "306426.001"}}));
    for site in ["s1", "s2"] {
        cell.control_status(site, ControlState::Loading);
        cell.control_status(site, ControlState::Busy);
        cell.testapp_status(site, TestAppState::Idle);
    }
    cell.settle().await;
    cell.operator(json!({"command": "next"}));
    cell.settle().await;

    let records = cell.drain_bus();
    let settings = broadcasts(&records)
        .into_iter()
        .find_map(|command| match command {
            SiteCommand::Next { settings } => Some(settings.clone()),
            _ => None,
        })
        .expect("a next broadcast");
    assert!(!settings.get(SettingName::SingleStep).active);
}

#[tokio::test(start_paused = true)]
async fn invalid_commands_leave_the_state_alone() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    cell.drain_bus();

    // next is not valid while connecting; unknown verbs are rejected.
    cell.operator(json!({"command": "next"}));
    cell.operator(json!({"command": "selfdestruct"}));
    cell.settle().await;

    assert_eq!(published_states(&cell.drain_bus()), Vec::<&str>::new());

    // The failure shows up in the streamed logs.
    cell.tick().await;
    let logged = cell
        .drain_pushes()
        .into_iter()
        .filter_map(|push| match push {
            OperatorPush::Logs { entries } => Some(entries),
            _ => None,
        })
        .flatten()
        .any(|entry| entry.description.contains("Failed to execute command"));
    assert!(logged);
}

#[tokio::test(start_paused = true)]
async fn testresult_outside_testing_is_a_softerror() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    bring_to_ready(&cell, "306426.001").await;
    cell.drain_bus();

    cell.testresult("s1", json!({"site": "s1"}));
    cell.settle().await;

    assert_eq!(published_states(&cell.drain_bus()), ["softerror"]);
}

#[tokio::test(start_paused = true)]
async fn unconfigured_site_is_a_softerror() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.settle().await;
    cell.drain_bus();

    cell.control_status("s9", ControlState::Idle);
    cell.settle().await;

    assert_eq!(published_states(&cell.drain_bus()), ["softerror"]);
    cell.tick().await;
    let status = cell
        .drain_pushes()
        .into_iter()
        .find_map(|push| match push {
            OperatorPush::Status {
                state,
                error_message,
            } if state == "softerror" => Some(error_message),
            _ => None,
        })
        .expect("a softerror status");
    assert_eq!(status, "Site id received: s9 is not configured");
}

#[tokio::test(start_paused = true)]
async fn getlogfile_reads_the_file_in_the_background() {
    let tempdir = Utf8TempDir::new().expect("tempdir");
    let logfile = tempdir.path().join("master.log");
    std::fs::write(&logfile, "2022-01-01 00:00:00|info|hello").unwrap();

    let mut cell = Cell::start_with(&["s1"], |builder| {
        builder.set_logfile_path(logfile.clone());
    });
    cell.settle().await;

    cell.operator(json!({"command": "getlogfile"}));

    // The read happens on a blocking thread; poll a few ticks for it.
    let mut content = None;
    for _ in 0..200 {
        cell.tick().await;
        if let Some(found) = cell.drain_pushes().into_iter().find_map(|push| match push {
            OperatorPush::Logfile { content } => Some(content),
            _ => None,
        }) {
            content = Some(found);
            break;
        }
    }
    assert_eq!(
        content.as_deref(),
        Some("2022-01-01 00:00:00|info|hello"),
    );
}

#[tokio::test(start_paused = true)]
async fn initial_tick_pushes_status_and_settings() {
    let mut cell = Cell::start(&["s1", "s2"]);
    cell.tick().await;

    let pushes = cell.drain_pushes();
    assert!(pushes.iter().any(|push| matches!(
        push,
        OperatorPush::Status { state, .. } if state == "connecting"
    )));
    assert!(
        pushes
            .iter()
            .any(|push| matches!(push, OperatorPush::UserSettings { .. }))
    );
}
