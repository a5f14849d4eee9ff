// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message types exchanged with the cell and the operator.
//!
//! Site reports arrive over the pub/sub bus and are fed into the master as
//! [`SiteEvent`] values. Commands the master broadcasts to the sites are
//! [`SiteCommand`] values handed to the [`SiteBus`]. Operator requests come in
//! as JSON documents parsed into [`OperatorCommand`]; data flowing back to
//! operator clients is delivered as [`OperatorPush`] events through the
//! callback passed to the master at build time.

use crate::{
    job::TestProgramParameters,
    logs::LogEntry,
    settings::{UserSetting, UserSettingEntry, UserSettings},
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Identifier of a single test position in the cell.
///
/// Site IDs are opaque strings assigned by the cell configuration.
pub type SiteId = SmolStr;

/// State reported by a site's control process.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlState {
    /// No report received from this site yet.
    Unknown,
    /// The control is fetching and unpacking the test program.
    Loading,
    /// The control is supervising a running test application.
    Busy,
    /// The control is idle and ready for commands.
    Idle,
    /// The control crashed.
    Crash,
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Loading => "loading",
            Self::Busy => "busy",
            Self::Idle => "idle",
            Self::Crash => "crash",
        };
        write!(f, "{s}")
    }
}

/// State reported by a site's test application.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestAppState {
    /// The test application is loaded and waiting for a test command.
    Idle,
    /// A test execution is in progress.
    Testing,
    /// The test application crashed.
    Crash,
    /// The test application shut down.
    Terminated,
}

impl fmt::Display for TestAppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Testing => "testing",
            Self::Crash => "crash",
            Self::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

/// A request by one site to reconfigure a shared piece of hardware.
///
/// Two requests are considered the same configuration iff both the resource
/// ID and the configuration document compare equal.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ResourceRequest {
    /// Identifier of the shared resource, e.g. a thermal chamber.
    pub resource_id: String,
    /// Requested configuration, opaque to the master.
    pub config: serde_json::Value,
}

/// A report from one site, delivered to the master over the bus.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SiteEvent {
    /// The reporting site.
    pub site_id: SiteId,
    /// What the site reported.
    #[serde(flatten)]
    pub kind: SiteEventKind,
}

/// The payload of a [`SiteEvent`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SiteEventKind {
    /// Periodic status report from the site's control process.
    #[serde(rename = "control_status")]
    ControlStatus {
        /// Protocol version the control speaks. Must match
        /// [`INTERFACE_VERSION`](crate::coordinator::INTERFACE_VERSION).
        interface_version: u32,
        /// The reported control state.
        state: ControlState,
    },
    /// Status report from the site's test application.
    #[serde(rename = "testapp_status")]
    TestAppStatus {
        /// The reported test application state.
        state: TestAppState,
    },
    /// A per-cycle test result record (STDF-like, opaque).
    #[serde(rename = "testapp_testresult")]
    TestAppTestResult {
        /// The result record.
        payload: serde_json::Value,
    },
    /// End-of-lot summary record (opaque), one per site.
    #[serde(rename = "testapp_testsummary")]
    TestAppTestSummary {
        /// The summary record.
        payload: serde_json::Value,
    },
    /// A shared-resource reconfiguration request raised mid-cycle.
    #[serde(rename = "testapp_resource_request")]
    TestAppResourceRequest(ResourceRequest),
    /// The transport noticed that the site's test application went away.
    #[serde(rename = "testapp_disconnected")]
    TestAppDisconnected,
}

impl SiteEventKind {
    /// A short name for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ControlStatus { .. } => "control_status",
            Self::TestAppStatus { .. } => "testapp_status",
            Self::TestAppTestResult { .. } => "testapp_testresult",
            Self::TestAppTestSummary { .. } => "testapp_testsummary",
            Self::TestAppResourceRequest(_) => "testapp_resource_request",
            Self::TestAppDisconnected => "testapp_disconnected",
        }
    }
}

/// A command the master broadcasts to every site.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SiteCommand {
    /// Load the test program described by the parameters.
    Load {
        /// Parameters assembled from the job data.
        parameters: TestProgramParameters,
    },
    /// Execute one test pass with the given run configuration.
    Next {
        /// The current user settings, broadcast as the run configuration.
        settings: UserSettings,
    },
    /// Shut down the test application.
    Terminate,
    /// Return to the connecting-phase baseline.
    Reset,
    /// Apply the agreed configuration to a shared resource.
    ResourceConfig {
        /// Identifier of the shared resource.
        resource_id: String,
        /// The configuration to apply.
        config: serde_json::Value,
    },
}

/// The pub/sub transport contract, as seen by the master.
///
/// The master never connects to the broker itself; the embedding application
/// implements this trait on top of its client and the master calls it from
/// the dispatcher loop.
pub trait SiteBus: Send {
    /// Broadcasts a command to all sites.
    fn broadcast(&mut self, command: SiteCommand);

    /// Publishes the externally visible master state.
    fn publish_state(&mut self, state: &str);
}

/// An operator request, parsed from the structured message the UI transport
/// received.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum OperatorCommand {
    /// Load a test program for a lot.
    Load {
        /// The lot to load.
        payload: LoadPayload,
    },
    /// Run one synchronized test cycle.
    Next,
    /// Unload the test program.
    Unload,
    /// Recover from a soft error.
    Reset,
    /// Replace the user settings.
    Usersettings {
        /// Settings entries, merged over the defaults.
        payload: Vec<UserSettingEntry>,
    },
    /// Push the historical result buffer to the operator.
    Getresults,
    /// Push (and clear) the accumulated log lines.
    Getlogs,
    /// Push the content of the master's log file.
    Getlogfile,
}

/// Payload of the `load` operator command.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoadPayload {
    /// The lot number. May embed `"|<variant>"` after the lot proper to
    /// select a test-zip mock variant; split on the first `|`.
    pub lot_number: String,
}

impl OperatorCommand {
    /// The verb of this command, as it appears on the wire.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Next => "next",
            Self::Unload => "unload",
            Self::Reset => "reset",
            Self::Usersettings { .. } => "usersettings",
            Self::Getresults => "getresults",
            Self::Getlogs => "getlogs",
            Self::Getlogfile => "getlogfile",
        }
    }
}

/// A push message to connected operator clients.
///
/// Delivered through the callback passed to
/// [`MasterBuilder::build`](crate::coordinator::MasterBuilder::build); the
/// embedding application forwards these to its websocket clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorPush {
    /// The externally visible state plus the current error message.
    Status {
        /// External state name.
        state: String,
        /// Last recorded error message, empty if none.
        error_message: String,
    },
    /// One freshly received per-site test result.
    #[serde(rename = "testresult")]
    TestResult {
        /// The result record.
        payload: serde_json::Value,
    },
    /// The historical result buffer, oldest first.
    Results {
        /// Buffered result records.
        results: Vec<serde_json::Value>,
    },
    /// The current user settings.
    UserSettings {
        /// One entry per known setting name.
        settings: Vec<UserSetting>,
    },
    /// Accumulated log lines.
    Logs {
        /// Structured log entries.
        entries: Vec<LogEntry>,
    },
    /// The content of the master's log file.
    Logfile {
        /// Raw file content.
        content: String,
    },
}
