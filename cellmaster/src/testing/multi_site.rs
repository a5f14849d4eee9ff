// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{SiteTesting, SiteTestingState};
use crate::{
    errors::TestingError,
    messages::{ResourceRequest, SiteId},
};
use indexmap::IndexMap;
use std::fmt;

/// State of the testing phase across all sites.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestingState {
    /// At least one site is still working on its test.
    InProgress,
    /// Every remaining site is waiting for the shared resource; the
    /// configuration is being applied.
    WaitingForResource,
    /// Every site delivered its result and returned to idle.
    Completed,
}

impl fmt::Display for TestingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InProgress => "inprogress",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// An action the coordinator must take after a testing-phase event.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TestingUpdate {
    /// Every site left in-progress and at least one waits for the resource;
    /// apply this configuration and report back via
    /// [`MultiSiteTesting::resource_config_applied`].
    ApplyResourceConfig(ResourceRequest),
    /// The cycle is complete.
    AllComplete,
}

/// Aggregates the per-site testing machines for one cell.
///
/// Lives as long as the master; the per-site machines are reset between
/// cycles.
#[derive(Debug)]
pub(crate) struct MultiSiteTesting {
    state: TestingState,
    sites: IndexMap<SiteId, SiteTesting>,
}

impl MultiSiteTesting {
    pub(crate) fn new(site_ids: impl IntoIterator<Item = SiteId>) -> Self {
        Self {
            state: TestingState::InProgress,
            sites: site_ids
                .into_iter()
                .map(|site_id| (site_id.clone(), SiteTesting::new(site_id)))
                .collect(),
        }
    }

    pub(crate) fn state(&self) -> TestingState {
        self.state
    }

    #[allow(dead_code)]
    pub(crate) fn site_state(&self, site_id: &SiteId) -> Option<SiteTestingState> {
        self.sites.get(site_id).map(|site| site.state())
    }

    /// Prepares a fresh cycle. Sites left mid-state by an interrupted cycle
    /// are forced back to in-progress.
    pub(crate) fn start_cycle(&mut self) {
        self.state = TestingState::InProgress;
        for site in self.sites.values_mut() {
            if site.state() != SiteTestingState::InProgress {
                site.force_reset();
            }
        }
    }

    /// Resets every completed site back to in-progress. Called when a cycle
    /// completes.
    pub(crate) fn reset_completed_sites(&mut self) {
        for site in self.sites.values_mut() {
            if site.state() == SiteTestingState::Completed {
                site.reset().expect("completed sites can reset");
            }
        }
    }

    /// Routes a resource request from one site.
    ///
    /// Fails the cycle if another site currently requests a different
    /// configuration.
    pub(crate) fn handle_resource_request(
        &mut self,
        site_id: &SiteId,
        request: ResourceRequest,
    ) -> Result<Option<TestingUpdate>, TestingError> {
        let Some(site) = self.sites.get_mut(site_id) else {
            return Ok(None);
        };
        site.resource_requested(request.clone())?;

        for other in self.sites.values() {
            if let Some(other_request) = other.resource_request() {
                if *other_request != request {
                    return Err(TestingError::ResourceMismatch {
                        site_id: site_id.clone(),
                        other_site_id: other.site_id().clone(),
                    });
                }
            }
        }

        Ok(self.check_quorum())
    }

    /// Routes a test result record from one site.
    pub(crate) fn handle_testresult(
        &mut self,
        site_id: &SiteId,
        testresult: serde_json::Value,
    ) -> Result<Option<TestingUpdate>, TestingError> {
        let Some(site) = self.sites.get_mut(site_id) else {
            return Ok(None);
        };
        site.testresult_received(testresult)?;
        Ok(self.after_site_event())
    }

    /// Routes an idle report from one site.
    pub(crate) fn handle_status_idle(
        &mut self,
        site_id: &SiteId,
    ) -> Result<Option<TestingUpdate>, TestingError> {
        let Some(site) = self.sites.get_mut(site_id) else {
            return Ok(None);
        };
        site.status_idle()?;
        Ok(self.after_site_event())
    }

    /// The host finished applying the resource configuration.
    ///
    /// Returns false when the callback arrives late, i.e. the testing phase
    /// already left `waiting_for_resource`; such callbacks are ignored.
    pub(crate) fn resource_config_applied(&mut self) -> bool {
        if self.state != TestingState::WaitingForResource {
            return false;
        }
        self.state = TestingState::InProgress;
        for site in self.sites.values_mut() {
            if site.state() == SiteTestingState::WaitingForResource {
                site.resource_ready().expect("site was waiting for resource");
            }
        }
        true
    }

    fn after_site_event(&mut self) -> Option<TestingUpdate> {
        if self
            .sites
            .values()
            .all(|site| site.state() == SiteTestingState::Completed)
        {
            self.state = TestingState::Completed;
            return Some(TestingUpdate::AllComplete);
        }
        self.check_quorum()
    }

    // A quorum forms once no site is in progress anymore and at least one is
    // waiting for the resource. All waiting sites hold the same request at
    // this point; the mismatch check runs on every request.
    fn check_quorum(&mut self) -> Option<TestingUpdate> {
        if self.state != TestingState::InProgress {
            return None;
        }
        if self
            .sites
            .values()
            .any(|site| site.state() == SiteTestingState::InProgress)
        {
            return None;
        }
        let request = self
            .sites
            .values()
            .find(|site| site.state() == SiteTestingState::WaitingForResource)?
            .resource_request()
            .expect("waiting sites hold a request")
            .clone();

        self.state = TestingState::WaitingForResource;
        Some(TestingUpdate::ApplyResourceConfig(request))
    }
}
