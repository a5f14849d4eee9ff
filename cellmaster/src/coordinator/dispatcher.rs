// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatcher loop of the master.
//!
//! Every input — site reports, operator commands, the phase timeout, the
//! resource-apply callback, and the UI tick — is turned into an
//! [`InternalEvent`] and handled sequentially on one task. Transitions never
//! preempt each other; suspension happens only between events.

use super::{
    ControlPhase, INTERFACE_VERSION, InternalEvent, LOAD_TIMEOUT, Master, MasterState,
    PhasedTracker, RESET_TIMEOUT, RESOURCE_CONFIG_DELAY, STARTUP_TIMEOUT, TEST_TIMEOUT, TestPhase,
    UI_TICK, UNLOAD_TIMEOUT,
};
use crate::{
    errors::{CommandError, TestingError},
    job,
    logs::LogLevel,
    messages::{
        ControlState, OperatorCommand, OperatorPush, ResourceRequest, SiteCommand, SiteEvent,
        SiteEventKind, SiteId, TestAppState,
    },
    sequence::SequenceOutcome,
    settings::{UserSettingEntry, UserSettings},
    testing::{TestingState, TestingUpdate},
    time::TimeoutTimer,
};
use tokio::{
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
        oneshot,
    },
    time::MissedTickBehavior,
};
use tracing::debug;

impl<F> Master<F>
where
    F: FnMut(OperatorPush) + Send,
{
    /// Runs the master until both input channels close.
    ///
    /// `site_rx` delivers site reports in per-site transport order;
    /// `operator_rx` delivers raw operator command documents. Dropping both
    /// senders shuts the master down; any open STDF aggregate is closed on
    /// the way out.
    pub async fn run(
        mut self,
        mut site_rx: UnboundedReceiver<SiteEvent>,
        mut operator_rx: UnboundedReceiver<serde_json::Value>,
    ) {
        let (internal_tx, mut internal_rx) = unbounded_channel();
        let mut timer = TimeoutTimer::new(self.config.enable_timeouts);
        let mut tick = tokio::time::interval(UI_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.startup_done(&mut timer);

        let mut sites_done = false;
        let mut operator_done = false;
        loop {
            let event = tokio::select! {
                message = timer.fired() => InternalEvent::Timeout(message),
                _ = tick.tick() => InternalEvent::Tick,
                event = site_rx.recv(), if !sites_done => match event {
                    Some(event) => InternalEvent::Site(event),
                    None => {
                        if operator_done {
                            break;
                        }
                        sites_done = true;
                        continue;
                    }
                },
                command = operator_rx.recv(), if !operator_done => match command {
                    Some(command) => InternalEvent::Operator(command),
                    None => {
                        if sites_done {
                            break;
                        }
                        operator_done = true;
                        continue;
                    }
                },
                event = internal_rx.recv() => match event {
                    Some(event) => event,
                    // We hold a sender, so the channel cannot close.
                    None => continue,
                },
            };

            self.handle_event(event, &mut timer, &internal_tx);
        }

        // Teardown on every exit path: close out an open aggregate.
        if let Some(mut stdf) = self.stdf.take() {
            stdf.finalize();
        }
    }

    fn handle_event(
        &mut self,
        event: InternalEvent,
        timer: &mut TimeoutTimer,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        match event {
            InternalEvent::Tick => self.flush_ui(),
            InternalEvent::Timeout(message) => self.on_timeout(message),
            InternalEvent::Site(event) => self.handle_site_event(event, timer, internal_tx),
            InternalEvent::Operator(raw) => {
                let verb = raw
                    .get("command")
                    .and_then(|verb| verb.as_str())
                    .unwrap_or("<unknown>")
                    .to_owned();
                if let Err(error) = self.dispatch_command(raw, timer) {
                    self.log(
                        LogLevel::Error,
                        &format!("Failed to execute command {verb}: {error}"),
                    );
                }
            }
            InternalEvent::ResourceConfigApplied { epoch, request } => {
                self.on_resource_config_applied(epoch, request);
            }
        }
        self.publish_state();
    }

    // ---
    // State publication
    // ---

    fn publish_state(&mut self) {
        let compound = self.compound_state();
        if self.prev_logged_state == compound {
            return;
        }
        self.prev_logged_state = compound.clone();
        self.log(LogLevel::Info, &format!("Master state is {compound}"));

        let external = self.state.external_name();
        if self.prev_published.as_deref() != Some(external) {
            self.prev_published = Some(external.to_owned());
            self.bus.publish_state(external);
            self.ui.status_required = true;
        }
    }

    fn compound_state(&self) -> String {
        match self.state {
            MasterState::Testing => format!("testing_{}", self.testing.state()),
            state => state.external_name().to_owned(),
        }
    }

    // ---
    // Lifecycle transitions
    // ---

    fn startup_done(&mut self, timer: &mut TimeoutTimer) {
        timer.arm(STARTUP_TIMEOUT, "Not all sites connected.");
        self.state = MasterState::Connecting;
        self.publish_state();
    }

    fn on_timeout(&mut self, message: String) {
        if self.state == MasterState::Error {
            return;
        }
        self.log(LogLevel::Error, &message);
        self.error_message = message;
        self.state = MasterState::SoftError;
    }

    fn on_error(&mut self, message: String) {
        self.log(
            LogLevel::Error,
            &format!("Master entered state error, reason: {message}"),
        );
        self.error_message = message;
        self.state = MasterState::SoftError;
    }

    fn all_sites_detected(&mut self, timer: &mut TimeoutTimer) {
        if self.state != MasterState::Connecting {
            debug!(state = %self.state, "ignoring connect completion");
            return;
        }
        // Trap any control that misbehaves and moves out of idle from here
        // on; that is an error, not a connect-phase hiccup.
        self.control_tracker = PhasedTracker::new(
            ControlPhase::Synchronized,
            vec![ControlState::Idle],
            self.config.sites.iter().cloned(),
        );
        self.error_message.clear();
        timer.disarm();
        self.state = MasterState::Initialized;
    }

    fn all_siteloads_complete(&mut self, timer: &mut TimeoutTimer) {
        if self.state != MasterState::Loading {
            debug!(state = %self.state, "ignoring load completion");
            return;
        }
        self.error_message.clear();
        timer.disarm();

        let node_name = format!("{}.Master", self.config.device_id);
        let mut stdf =
            self.stdf_factory
                .create(&node_name, &self.loaded_lot_number, &self.loaded_jobname);
        stdf.write_header_records();
        self.stdf = Some(stdf);
        self.summary_counter = 0;

        self.state = MasterState::Ready;
    }

    fn all_sitetests_complete(&mut self, timer: &mut TimeoutTimer) {
        if self.state != MasterState::Testing {
            debug!(state = %self.state, "ignoring cycle completion");
            return;
        }
        timer.disarm();
        self.testing.reset_completed_sites();
        self.state = MasterState::Ready;
    }

    fn all_siteunloads_complete(&mut self, timer: &mut TimeoutTimer) {
        if self.state != MasterState::Unloading {
            debug!(state = %self.state, "ignoring unload completion");
            return;
        }
        timer.disarm();
        self.results.clear();
        self.loaded_lot_number.clear();
        self.state = MasterState::Initialized;
    }

    // ---
    // Site reports
    // ---

    fn handle_site_event(
        &mut self,
        event: SiteEvent,
        timer: &mut TimeoutTimer,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        if self.state == MasterState::Error {
            debug!(site = %event.site_id, kind = event.kind.name(), "dropping site event");
            return;
        }

        let SiteEvent { site_id, kind } = event;
        match kind {
            SiteEventKind::ControlStatus {
                interface_version,
                state,
            } => self.on_control_status(site_id, interface_version, state, timer),
            SiteEventKind::TestAppStatus { state } => {
                self.on_testapp_status(site_id, state, timer, internal_tx);
            }
            SiteEventKind::TestAppTestResult { payload } => {
                self.on_testresult(site_id, payload, timer, internal_tx);
            }
            SiteEventKind::TestAppTestSummary { payload } => self.on_testsummary(payload),
            SiteEventKind::TestAppResourceRequest(request) => {
                self.on_resource_request(site_id, request, timer, internal_tx);
            }
            SiteEventKind::TestAppDisconnected => self.on_disconnect(site_id),
        }
    }

    fn on_control_status(
        &mut self,
        site_id: SiteId,
        interface_version: u32,
        state: ControlState,
        timer: &mut TimeoutTimer,
    ) {
        if interface_version != INTERFACE_VERSION {
            let message = format!("Bad interface version on site {site_id}");
            self.log(LogLevel::Error, &message);
            if self.state == MasterState::Connecting {
                // Terminal: the cell software mix is wrong, nothing an
                // operator reset could fix.
                self.error_message = message;
                timer.disarm();
                self.state = MasterState::Error;
            } else {
                self.on_error(message);
            }
            return;
        }

        let Some(status) = self.site_states.get_mut(&site_id) else {
            self.on_error(format!("Site id received: {site_id} is not configured"));
            return;
        };
        if status.control == state {
            return;
        }
        status.control = state;
        self.log(LogLevel::Info, &format!("Control {site_id} state is {state}"));

        let outcome = self.control_tracker.tracker.trigger(&site_id, state);
        match (self.control_tracker.phase, outcome) {
            (_, SequenceOutcome::Advanced | SequenceOutcome::Ignored) => {}
            (ControlPhase::Connecting | ControlPhase::Resetting, SequenceOutcome::Completed) => {
                self.all_sites_detected(timer);
            }
            (ControlPhase::Unloading, SequenceOutcome::Completed) => {
                self.all_siteunloads_complete(timer);
            }
            (
                ControlPhase::Synchronized | ControlPhase::Loading,
                SequenceOutcome::Completed,
            ) => {}
            (ControlPhase::Connecting | ControlPhase::Resetting, SequenceOutcome::Unexpected) => {
                self.log(
                    LogLevel::Warning,
                    &format!(
                        "Site {site_id} reported state {state}. \
                         This state is ignored during startup."
                    ),
                );
                self.error_message = format!("Site {site_id} reported state {state}");
            }
            (ControlPhase::Synchronized, SequenceOutcome::Unexpected) => {
                self.on_error(format!(
                    "Bad statetransition of control {site_id} during sync to {state}"
                ));
            }
            (ControlPhase::Loading, SequenceOutcome::Unexpected) => {
                self.on_error(format!(
                    "Bad statetransition of control {site_id} during load to {state}"
                ));
            }
            (ControlPhase::Unloading, SequenceOutcome::Unexpected) => {
                self.on_error(format!(
                    "Bad statetransition of control {site_id} during unload to {state}"
                ));
            }
        }
    }

    fn on_testapp_status(
        &mut self,
        site_id: SiteId,
        state: TestAppState,
        timer: &mut TimeoutTimer,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        let Some(status) = self.site_states.get_mut(&site_id) else {
            self.log(
                LogLevel::Warning,
                &format!("Ignoring testapp status from unconfigured site {site_id}"),
            );
            return;
        };
        status.testapp = Some(state);
        self.log(LogLevel::Info, &format!("Testapp {site_id} state is {state}"));

        // During a cycle an idle report feeds the testing machines before
        // the tracker sees it, so cycle completion is detected first.
        if self.state == MasterState::Testing && state == TestAppState::Idle {
            match self.testing.handle_status_idle(&site_id) {
                Ok(update) => self.apply_testing_update(update, timer, internal_tx),
                Err(TestingError::Transition(error)) => {
                    self.log(LogLevel::Warning, &format!("Ignoring idle report: {error}"));
                }
                Err(error) => self.on_error(error.to_string()),
            }
        }

        let outcome = self.testapp_tracker.tracker.trigger(&site_id, state);
        match (self.testapp_tracker.phase, outcome) {
            (_, SequenceOutcome::Advanced | SequenceOutcome::Ignored) => {}
            (TestPhase::Loading, SequenceOutcome::Completed) => {
                self.all_siteloads_complete(timer);
            }
            (
                TestPhase::Startup | TestPhase::Testing | TestPhase::Unloading,
                SequenceOutcome::Completed,
            ) => {}
            (TestPhase::Startup, SequenceOutcome::Unexpected) => {
                self.log(
                    LogLevel::Warning,
                    &format!(
                        "TestApp for site {site_id} reported state {state}. \
                         This state is ignored during startup."
                    ),
                );
                self.error_message = format!("TestApp for site {site_id} reported state {state}");
            }
            (TestPhase::Loading, SequenceOutcome::Unexpected) => {
                self.on_error(format!(
                    "Bad statetransition of testapp {site_id} during load to {state}"
                ));
            }
            (TestPhase::Testing, SequenceOutcome::Unexpected) => {
                self.on_error("Bad statetransition of testapp during test".to_owned());
            }
            (TestPhase::Unloading, SequenceOutcome::Unexpected) => {}
        }
    }

    fn on_testresult(
        &mut self,
        site_id: SiteId,
        payload: serde_json::Value,
        timer: &mut TimeoutTimer,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        if self.state != MasterState::Testing {
            self.on_error(format!("Received unexpected testresult from site {site_id}"));
            return;
        }

        match self.testing.handle_testresult(&site_id, payload.clone()) {
            Ok(update) => {
                if let Some(stdf) = &mut self.stdf {
                    stdf.append_test_results(&payload);
                }
                self.pending_results.push(payload.clone());
                self.results.append(payload);
                self.apply_testing_update(update, timer, internal_tx);
            }
            Err(TestingError::Transition(error)) => {
                self.log(LogLevel::Warning, &format!("Ignoring testresult: {error}"));
            }
            Err(error) => self.on_error(error.to_string()),
        }
    }

    fn on_testsummary(&mut self, payload: serde_json::Value) {
        let Some(stdf) = &mut self.stdf else {
            self.log(
                LogLevel::Warning,
                "Received a test summary without an open STDF aggregate",
            );
            return;
        };
        stdf.append_test_summary(&payload);
        self.summary_counter += 1;

        if self.summary_counter == self.config.sites.len() {
            let mut stdf = self.stdf.take().expect("aggregate is open");
            stdf.finalize();
            self.summary_counter = 0;
        }
    }

    fn on_resource_request(
        &mut self,
        site_id: SiteId,
        request: ResourceRequest,
        timer: &mut TimeoutTimer,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        if self.state != MasterState::Testing {
            self.on_error(format!(
                "Received unexpected resource request from site {site_id}"
            ));
            return;
        }

        match self.testing.handle_resource_request(&site_id, request) {
            Ok(update) => self.apply_testing_update(update, timer, internal_tx),
            Err(TestingError::Transition(error)) => {
                self.log(
                    LogLevel::Warning,
                    &format!("Ignoring resource request: {error}"),
                );
            }
            Err(error) => self.on_error(error.to_string()),
        }
    }

    fn on_disconnect(&mut self, site_id: SiteId) {
        let message = format!("Master entered state error due to disconnect of site {site_id}");
        self.log(LogLevel::Error, &message);
        self.error_message = message;
        self.state = MasterState::SoftError;
    }

    // ---
    // Resource negotiation
    // ---

    fn apply_testing_update(
        &mut self,
        update: Option<TestingUpdate>,
        timer: &mut TimeoutTimer,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        match update {
            None => {}
            Some(TestingUpdate::AllComplete) => self.all_sitetests_complete(timer),
            Some(TestingUpdate::ApplyResourceConfig(request)) => {
                self.apply_resource_config(request, internal_tx);
            }
        }
    }

    fn apply_resource_config(
        &mut self,
        request: ResourceRequest,
        internal_tx: &UnboundedSender<InternalEvent>,
    ) {
        self.resource_epoch += 1;
        let epoch = self.resource_epoch;
        self.log(
            LogLevel::Info,
            &format!("Configuring resource {} for all sites", request.resource_id),
        );

        let tx = internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RESOURCE_CONFIG_DELAY).await;
            let _ = tx.send(InternalEvent::ResourceConfigApplied { epoch, request });
        });
    }

    fn on_resource_config_applied(&mut self, epoch: u64, request: ResourceRequest) {
        // The callback may outlive the quorum it was spawned for (timeout,
        // reset, a new cycle); apply it only to the negotiation it belongs
        // to.
        if epoch != self.resource_epoch
            || self.state != MasterState::Testing
            || self.testing.state() != TestingState::WaitingForResource
        {
            debug!(epoch, "dropping stale resource-config callback");
            return;
        }

        self.bus.broadcast(SiteCommand::ResourceConfig {
            resource_id: request.resource_id,
            config: request.config,
        });
        self.testing.resource_config_applied();
    }

    // ---
    // Operator commands
    // ---

    fn dispatch_command(
        &mut self,
        raw: serde_json::Value,
        timer: &mut TimeoutTimer,
    ) -> Result<(), CommandError> {
        let command: OperatorCommand =
            serde_json::from_value(raw).map_err(CommandError::Parse)?;
        let verb = command.verb();

        match (command, self.state) {
            (OperatorCommand::Load { payload }, MasterState::Initialized) => {
                self.on_load(payload.lot_number, timer);
            }
            (OperatorCommand::Next, MasterState::Ready) => self.on_next(timer),
            (OperatorCommand::Unload, MasterState::Ready) => self.on_unload(timer),
            (OperatorCommand::Reset, MasterState::SoftError) => self.on_reset(timer),
            (
                OperatorCommand::Usersettings { payload },
                MasterState::Initialized | MasterState::Ready,
            ) => self.on_usersettings(&payload)?,
            (OperatorCommand::Getresults, MasterState::Ready) => {
                self.ui.testresults_required = true;
            }
            (OperatorCommand::Getlogs, _) => self.ui.log_data_required = true,
            (OperatorCommand::Getlogfile, _) => self.ui.logfile_required = true,
            (_, state) => {
                return Err(CommandError::InvalidState {
                    verb: verb.to_owned(),
                    state: state.to_string(),
                });
            }
        }
        Ok(())
    }

    fn on_load(&mut self, lot_number: String, timer: &mut TimeoutTimer) {
        self.loaded_jobname = lot_number.clone();

        // The lot string may carry a test-zip mock variant for development
        // setups: "<lot>|<variant>".
        let (lot_number, variant) = match lot_number.split_once('|') {
            Some((lot, variant)) => (lot.to_owned(), variant.to_owned()),
            None => (lot_number, "sleepmock".to_owned()),
        };
        self.loaded_lot_number = lot_number.clone();
        self.state = MasterState::Loading;

        let parameters = if self.config.skip_jobdata_verification {
            job::debug_parameters(&variant)
        } else {
            match self.job_source.retrieve(&lot_number, &variant) {
                Ok(parameters) => parameters,
                Err(error) => {
                    self.on_error(error.to_string());
                    return;
                }
            }
        };
        self.log(
            LogLevel::Debug,
            &format!("testprogram information: {}", parameters.data),
        );

        timer.arm(LOAD_TIMEOUT, "not all sites loaded the testprogram");
        self.control_tracker = PhasedTracker::new(
            ControlPhase::Loading,
            vec![ControlState::Loading, ControlState::Busy],
            self.config.sites.iter().cloned(),
        );
        self.testapp_tracker = PhasedTracker::new(
            TestPhase::Loading,
            vec![TestAppState::Idle],
            self.config.sites.iter().cloned(),
        );
        self.error_message.clear();

        self.bus.broadcast(SiteCommand::Load { parameters });

        // A fresh lot starts from the hardcoded defaults.
        self.settings = UserSettings::defaults();
        self.persist_settings();
        self.ui.usersettings_required = true;
    }

    fn on_next(&mut self, timer: &mut TimeoutTimer) {
        self.pending_results.clear();
        timer.arm(TEST_TIMEOUT, "not all sites completed the active test");
        self.testapp_tracker = PhasedTracker::new(
            TestPhase::Testing,
            vec![TestAppState::Testing, TestAppState::Idle],
            self.config.sites.iter().cloned(),
        );
        self.error_message.clear();

        self.state = MasterState::Testing;
        self.testing.start_cycle();
        self.bus.broadcast(SiteCommand::Next {
            settings: self.settings.clone(),
        });
    }

    fn on_unload(&mut self, timer: &mut TimeoutTimer) {
        timer.arm(UNLOAD_TIMEOUT, "not all sites unloaded the testprogram");
        self.control_tracker = PhasedTracker::new(
            ControlPhase::Unloading,
            vec![ControlState::Idle],
            self.config.sites.iter().cloned(),
        );
        self.testapp_tracker = PhasedTracker::new(
            TestPhase::Unloading,
            vec![TestAppState::Terminated],
            self.config.sites.iter().cloned(),
        );
        self.error_message.clear();

        self.state = MasterState::Unloading;
        self.bus.broadcast(SiteCommand::Terminate);
    }

    fn on_reset(&mut self, timer: &mut TimeoutTimer) {
        timer.arm(RESET_TIMEOUT, "not all sites unloaded the testprogram");
        self.control_tracker = PhasedTracker::new(
            ControlPhase::Resetting,
            vec![ControlState::Idle],
            self.config.sites.iter().cloned(),
        );
        self.error_message.clear();

        self.state = MasterState::Connecting;
        self.bus.broadcast(SiteCommand::Reset);
    }

    fn on_usersettings(&mut self, entries: &[UserSettingEntry]) -> Result<(), CommandError> {
        let settings = UserSettings::from_entries(entries)?;
        if let Some(path) = &self.config.user_settings_filepath {
            settings.store(path)?;
        }
        self.settings = settings;
        self.ui.usersettings_required = true;
        Ok(())
    }

    fn persist_settings(&mut self) {
        if let Some(path) = &self.config.user_settings_filepath {
            if let Err(error) = self.settings.store(path) {
                let message = format!("{error}");
                self.log(LogLevel::Error, &message);
            }
        }
    }

    // ---
    // UI flush
    // ---

    fn flush_ui(&mut self) {
        if self.ui.status_required {
            let push = OperatorPush::Status {
                state: self.state.external_name().to_owned(),
                error_message: self.error_message.clone(),
            };
            self.push(push);
            self.ui.status_required = false;
        }

        // Per-cycle results stream out as they arrive, independent of any
        // flag.
        for payload in std::mem::take(&mut self.pending_results) {
            self.push(OperatorPush::TestResult { payload });
        }

        if self.ui.usersettings_required {
            let push = OperatorPush::UserSettings {
                settings: self.settings.to_message(),
            };
            self.push(push);
            self.ui.usersettings_required = false;
        }

        if self.ui.testresults_required {
            let push = OperatorPush::Results {
                results: self.results.to_vec(),
            };
            self.push(push);
            self.ui.testresults_required = false;
        }

        if self.ui.log_data_required {
            let entries = self.logs.drain_all();
            self.push(OperatorPush::Logs { entries });
            self.ui.log_data_required = false;
        } else if self.logs.has_new() {
            let entries = self.logs.drain_new();
            self.push(OperatorPush::Logs { entries });
        }

        self.flush_logfile();
    }

    fn flush_logfile(&mut self) {
        if !self.ui.logfile_required {
            return;
        }

        if self.ui.logfile_rx.is_none() {
            let Some(path) = self.logs.file_path().map(|path| path.to_owned()) else {
                self.log(LogLevel::Warning, "No log file configured");
                self.ui.logfile_required = false;
                return;
            };
            let (tx, rx) = oneshot::channel();
            // The read may hit a slow filesystem; it must not stall the
            // dispatcher loop.
            tokio::task::spawn_blocking(move || {
                let _ = tx.send(std::fs::read_to_string(&path));
            });
            self.ui.logfile_rx = Some(rx);
        }

        if let Some(mut rx) = self.ui.logfile_rx.take() {
            match rx.try_recv() {
                Ok(Ok(content)) => {
                    self.push(OperatorPush::Logfile { content });
                    self.ui.logfile_required = false;
                }
                Ok(Err(error)) => {
                    let message = format!("Failed to read the log file: {error}");
                    self.log(LogLevel::Error, &message);
                    self.ui.logfile_required = false;
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    // Not done yet; check again next tick.
                    self.ui.logfile_rx = Some(rx);
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.ui.logfile_required = false;
                }
            }
        }
    }

    fn push(&mut self, push: OperatorPush) {
        (self.callback.0)(push);
    }

    fn log(&mut self, level: LogLevel, message: &str) {
        self.logs.log(level, message);
    }
}
