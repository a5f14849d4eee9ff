// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::SiteTransitionError,
    messages::{ResourceRequest, SiteId},
};
use std::fmt;

/// Progress of one site through a single test cycle.
///
/// A site reports its test result and its return to idle in either order;
/// both must arrive before the site counts as completed. A resource request
/// may interleave with either while the site's test is still running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SiteTestingState {
    /// The test is executing.
    InProgress,
    /// The site paused its test pending a shared-resource reconfiguration.
    WaitingForResource,
    /// Idle was reported; the result record is still outstanding.
    WaitingForTestresult,
    /// The result record arrived; the idle report is still outstanding.
    WaitingForIdle,
    /// Both the result and the idle report arrived.
    Completed,
}

impl fmt::Display for SiteTestingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InProgress => "inprogress",
            Self::WaitingForResource => "waiting_for_resource",
            Self::WaitingForTestresult => "waiting_for_testresult",
            Self::WaitingForIdle => "waiting_for_idle",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// One site's testing sub-state machine, alive for the duration of the
/// loaded test program and reset between cycles.
#[derive(Debug)]
pub(crate) struct SiteTesting {
    site_id: SiteId,
    state: SiteTestingState,
    // Present only while in WaitingForResource.
    resource_request: Option<ResourceRequest>,
    testresult: Option<serde_json::Value>,
}

impl SiteTesting {
    pub(crate) fn new(site_id: SiteId) -> Self {
        Self {
            site_id,
            state: SiteTestingState::InProgress,
            resource_request: None,
            testresult: None,
        }
    }

    pub(crate) fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    pub(crate) fn state(&self) -> SiteTestingState {
        self.state
    }

    pub(crate) fn resource_request(&self) -> Option<&ResourceRequest> {
        self.resource_request.as_ref()
    }

    #[allow(dead_code)]
    pub(crate) fn testresult(&self) -> Option<&serde_json::Value> {
        self.testresult.as_ref()
    }

    /// The site raised a resource request. Valid only while in progress.
    pub(crate) fn resource_requested(
        &mut self,
        request: ResourceRequest,
    ) -> Result<(), SiteTransitionError> {
        match self.state {
            SiteTestingState::InProgress => {
                self.resource_request = Some(request);
                self.state = SiteTestingState::WaitingForResource;
                Ok(())
            }
            state => Err(self.invalid("resource_requested", state)),
        }
    }

    /// The negotiated resource configuration was applied; the site resumes
    /// its test.
    pub(crate) fn resource_ready(&mut self) -> Result<(), SiteTransitionError> {
        match self.state {
            SiteTestingState::WaitingForResource => {
                self.resource_request = None;
                self.state = SiteTestingState::InProgress;
                Ok(())
            }
            state => Err(self.invalid("resource_ready", state)),
        }
    }

    /// The site delivered its result record for this cycle.
    pub(crate) fn testresult_received(
        &mut self,
        testresult: serde_json::Value,
    ) -> Result<(), SiteTransitionError> {
        match self.state {
            SiteTestingState::InProgress | SiteTestingState::WaitingForResource => {
                self.resource_request = None;
                self.testresult = Some(testresult);
                self.state = SiteTestingState::WaitingForIdle;
                Ok(())
            }
            SiteTestingState::WaitingForTestresult => {
                self.testresult = Some(testresult);
                self.state = SiteTestingState::Completed;
                Ok(())
            }
            state => Err(self.invalid("testresult_received", state)),
        }
    }

    /// The site's test application reported idle.
    pub(crate) fn status_idle(&mut self) -> Result<(), SiteTransitionError> {
        match self.state {
            SiteTestingState::InProgress | SiteTestingState::WaitingForResource => {
                self.resource_request = None;
                self.state = SiteTestingState::WaitingForTestresult;
                Ok(())
            }
            SiteTestingState::WaitingForIdle => {
                self.state = SiteTestingState::Completed;
                Ok(())
            }
            state => Err(self.invalid("status_idle", state)),
        }
    }

    /// Prepares the site for the next cycle. Valid only once completed.
    pub(crate) fn reset(&mut self) -> Result<(), SiteTransitionError> {
        match self.state {
            SiteTestingState::Completed => {
                self.testresult = None;
                self.state = SiteTestingState::InProgress;
                Ok(())
            }
            state => Err(self.invalid("reset", state)),
        }
    }

    /// Forces the site back to in-progress regardless of its state, dropping
    /// any per-cycle data. Used when a new cycle starts after an interrupted
    /// one.
    pub(crate) fn force_reset(&mut self) {
        self.resource_request = None;
        self.testresult = None;
        self.state = SiteTestingState::InProgress;
    }

    fn invalid(&self, event: &'static str, state: SiteTestingState) -> SiteTransitionError {
        SiteTransitionError {
            site_id: self.site_id.clone(),
            event,
            state,
        }
    }
}
