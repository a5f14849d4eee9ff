// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::MasterState;
use crate::{
    collectors::ResultsCollector,
    config::MasterConfig,
    errors::MasterBuildError,
    job::{JobDataSource, StubJobSource},
    logs::LogBuffer,
    messages::{ControlState, OperatorPush, SiteBus, SiteId, TestAppState},
    sequence::SequenceTracker,
    settings::UserSettings,
    stdf::{NullStdfFactory, StdfAggregator, StdfFactory},
    testing::MultiSiteTesting,
};
use camino::Utf8PathBuf;
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::sync::oneshot;

/// Protocol version the master requires from every site's control.
pub const INTERFACE_VERSION: u32 = 1;

/// Capacity of the historical result buffer.
pub const MAX_NUM_OF_TEST_PROGRAM_RESULTS: usize = 1000;

/// How long the sites get to report in after startup or reset.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(300);
/// How long the sites get to load a test program.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(180);
/// How long the sites get to unload a test program.
pub const UNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// How long one test cycle may take across all sites.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);
/// How long the sites get to return to idle after a reset broadcast.
pub const RESET_TIMEOUT: Duration = Duration::from_secs(20);

// Simulated latency of the resource actuator; the real actuator integration
// is a collaborator behind the bus.
pub(super) const RESOURCE_CONFIG_DELAY: Duration = Duration::from_millis(100);

pub(super) const UI_TICK: Duration = Duration::from_secs(1);

/// Last reported states of one site.
#[derive(Clone, Copy, Debug)]
pub(super) struct SiteStatus {
    pub(super) control: ControlState,
    pub(super) testapp: Option<TestAppState>,
}

/// Which lifecycle phase a control-state tracker belongs to. Decides how
/// completion and off-sequence reports are interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum ControlPhase {
    /// Initial connect: completion means all sites detected.
    Connecting,
    /// Steady state after connect: any movement away from idle is an error.
    Synchronized,
    /// Expecting `loading` then `busy` while a program loads.
    Loading,
    /// Expecting a return to `idle` while a program unloads.
    Unloading,
    /// Reconnect after an operator reset; off-sequence reports are only
    /// warned about, like during the initial connect.
    Resetting,
}

/// Which lifecycle phase a testapp-state tracker belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum TestPhase {
    /// Before any program load; reports are tolerated but unexpected.
    Startup,
    /// Expecting `idle` once the program is up; completion means the load
    /// finished.
    Loading,
    /// Expecting `testing` then `idle` during a cycle.
    Testing,
    /// Expecting `terminated`; nothing to do on completion, the control
    /// tracker drives the unload.
    Unloading,
}

/// A sequence tracker together with the phase that decides how its outcomes
/// are handled.
#[derive(Debug)]
pub(super) struct PhasedTracker<S, P> {
    pub(super) phase: P,
    pub(super) tracker: SequenceTracker<S>,
}

impl<S: Copy + PartialEq, P> PhasedTracker<S, P> {
    pub(super) fn new(
        phase: P,
        expected: Vec<S>,
        sites: impl IntoIterator<Item = SiteId>,
    ) -> Self {
        Self {
            phase,
            tracker: SequenceTracker::new(expected, sites),
        }
    }
}

/// Dirty flags and in-flight work of the UI flush loop.
#[derive(Debug)]
pub(super) struct UiState {
    pub(super) status_required: bool,
    pub(super) usersettings_required: bool,
    pub(super) testresults_required: bool,
    pub(super) log_data_required: bool,
    pub(super) logfile_required: bool,
    // Pending background read of the log file.
    pub(super) logfile_rx: Option<oneshot::Receiver<std::io::Result<String>>>,
}

impl UiState {
    fn new() -> Self {
        Self {
            // Freshly connected operators get the state and the settings
            // without asking.
            status_required: true,
            usersettings_required: true,
            testresults_required: false,
            log_data_required: false,
            logfile_required: false,
            logfile_rx: None,
        }
    }
}

/// Builder for a [`Master`].
pub struct MasterBuilder {
    config: MasterConfig,
    job_source: Box<dyn JobDataSource>,
    stdf_factory: Box<dyn StdfFactory>,
    logfile_path: Option<Utf8PathBuf>,
}

impl MasterBuilder {
    /// Creates a builder with stub collaborators: a job source that skips
    /// verification and an STDF factory that discards everything.
    pub fn new(config: MasterConfig) -> Self {
        Self {
            config,
            job_source: Box::new(StubJobSource),
            stdf_factory: Box::new(NullStdfFactory),
            logfile_path: None,
        }
    }

    /// Installs the job data source consulted on `load`.
    pub fn set_job_source(&mut self, source: Box<dyn JobDataSource>) -> &mut Self {
        self.job_source = source;
        self
    }

    /// Installs the STDF aggregator factory.
    pub fn set_stdf_factory(&mut self, factory: Box<dyn StdfFactory>) -> &mut Self {
        self.stdf_factory = factory;
        self
    }

    /// Remembers the log file served by the `getlogfile` command.
    pub fn set_logfile_path(&mut self, path: Utf8PathBuf) -> &mut Self {
        self.logfile_path = Some(path);
        self
    }

    /// Creates the master.
    ///
    /// Site commands go out through `bus`; operator pushes are delivered
    /// through `callback` from the dispatcher loop. Fails on an invalid
    /// configuration or unreadable persisted user settings.
    pub fn build<F>(self, bus: Box<dyn SiteBus>, callback: F) -> Result<Master<F>, MasterBuildError>
    where
        F: FnMut(OperatorPush) + Send,
    {
        self.config.validate()?;

        let settings = match &self.config.user_settings_filepath {
            Some(path) => {
                let settings = UserSettings::load_or_defaults(path)?;
                // Rewrite so the file exists and carries every known name.
                settings.store(path)?;
                settings
            }
            None => UserSettings::defaults(),
        };

        let sites = self.config.sites.clone();
        let site_states = sites
            .iter()
            .map(|site_id| {
                (
                    site_id.clone(),
                    SiteStatus {
                        control: ControlState::Unknown,
                        testapp: None,
                    },
                )
            })
            .collect();

        let logs = match self.logfile_path {
            Some(path) => LogBuffer::with_file(path),
            None => LogBuffer::new(),
        };

        Ok(Master {
            state: MasterState::Startup,
            prev_logged_state: MasterState::Startup.external_name().to_owned(),
            prev_published: None,
            error_message: String::new(),
            site_states,
            control_tracker: PhasedTracker::new(
                ControlPhase::Connecting,
                vec![ControlState::Idle],
                sites.iter().cloned(),
            ),
            testapp_tracker: PhasedTracker::new(
                TestPhase::Startup,
                vec![TestAppState::Idle],
                sites.iter().cloned(),
            ),
            testing: MultiSiteTesting::new(sites.iter().cloned()),
            resource_epoch: 0,
            settings,
            results: ResultsCollector::new(MAX_NUM_OF_TEST_PROGRAM_RESULTS),
            pending_results: Vec::new(),
            stdf_factory: self.stdf_factory,
            stdf: None,
            summary_counter: 0,
            job_source: self.job_source,
            loaded_jobname: String::new(),
            loaded_lot_number: String::new(),
            logs,
            ui: UiState::new(),
            bus,
            callback: DebugIgnore(callback),
            config: self.config,
        })
    }
}

/// The master coordinator.
///
/// Owns every piece of mutable state: the top-level state machine, the
/// per-site status map, the sequence trackers of the current phase, the
/// testing machines, the result and log collectors, and the user settings.
/// All of it is driven exclusively by [`Master::run`].
pub struct Master<F> {
    pub(super) config: MasterConfig,
    pub(super) state: MasterState,
    // Compound state name of the last log line, e.g. "testing_inprogress".
    pub(super) prev_logged_state: String,
    // External name of the last state published to the bus and the UI.
    pub(super) prev_published: Option<String>,
    pub(super) error_message: String,
    pub(super) site_states: IndexMap<SiteId, SiteStatus>,
    pub(super) control_tracker: PhasedTracker<ControlState, ControlPhase>,
    pub(super) testapp_tracker: PhasedTracker<TestAppState, TestPhase>,
    pub(super) testing: MultiSiteTesting,
    // Bumped whenever a resource configuration is dispatched; stale apply
    // callbacks carry an older epoch and are dropped.
    pub(super) resource_epoch: u64,
    pub(super) settings: UserSettings,
    pub(super) results: ResultsCollector,
    pub(super) pending_results: Vec<serde_json::Value>,
    pub(super) stdf_factory: Box<dyn StdfFactory>,
    pub(super) stdf: Option<Box<dyn StdfAggregator>>,
    pub(super) summary_counter: usize,
    pub(super) job_source: Box<dyn JobDataSource>,
    pub(super) loaded_jobname: String,
    pub(super) loaded_lot_number: String,
    pub(super) logs: LogBuffer,
    pub(super) ui: UiState,
    pub(super) bus: Box<dyn SiteBus>,
    pub(super) callback: DebugIgnore<F>,
}

impl<F> Master<F> {
    /// The current top-level state.
    pub fn state(&self) -> MasterState {
        self.state
    }

    /// The externally visible state name.
    pub fn external_state(&self) -> &'static str {
        self.state.external_name()
    }

    /// The last recorded error message, empty if none.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }
}
