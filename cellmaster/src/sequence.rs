// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracks a set of sites through an expected sequence of states.
//!
//! Each phase of the master's lifecycle (connecting, loading, testing,
//! unloading, resetting) expects every site to walk through a short ordered
//! list of states. The tracker reports completion once the last expected
//! state has been seen from every site, tolerates idempotent repeats, and
//! flags everything else as off-sequence.

use crate::messages::SiteId;
use indexmap::IndexMap;

/// What a state report meant to the tracker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SequenceOutcome {
    /// The site advanced to its next expected state.
    Advanced,
    /// With this report, every site reached the final expected state.
    /// Returned exactly once per tracker.
    Completed,
    /// A repeat of the site's current state; ignored.
    Ignored,
    /// The state is not the next one in the site's sequence. The tracker can
    /// no longer complete.
    Unexpected,
}

/// Tracks per-site progress through an expected list of states.
#[derive(Debug)]
pub(crate) struct SequenceTracker<S> {
    expected: Vec<S>,
    // Index of the last expected state seen per site; None before the first.
    progress: IndexMap<SiteId, Option<usize>>,
    failed: bool,
    completed: bool,
}

impl<S: Copy + PartialEq> SequenceTracker<S> {
    pub(crate) fn new(
        expected: Vec<S>,
        sites: impl IntoIterator<Item = SiteId>,
    ) -> Self {
        debug_assert!(!expected.is_empty());
        Self {
            expected,
            progress: sites.into_iter().map(|site| (site, None)).collect(),
            failed: false,
            completed: false,
        }
    }

    /// Feeds one state report into the tracker.
    ///
    /// Reports for sites the tracker does not know are off-sequence by
    /// definition.
    pub(crate) fn trigger(&mut self, site: &SiteId, state: S) -> SequenceOutcome {
        let Some(progress) = self.progress.get_mut(site) else {
            return SequenceOutcome::Unexpected;
        };

        let next = progress.map_or(0, |i| i + 1);
        if next < self.expected.len() && state == self.expected[next] {
            *progress = Some(next);
            if !self.failed && !self.completed && self.all_done() {
                self.completed = true;
                return SequenceOutcome::Completed;
            }
            return SequenceOutcome::Advanced;
        }

        if let Some(current) = *progress {
            if state == self.expected[current] {
                return SequenceOutcome::Ignored;
            }
        }

        self.failed = true;
        SequenceOutcome::Unexpected
    }

    fn all_done(&self) -> bool {
        let last = self.expected.len() - 1;
        self.progress.values().all(|progress| *progress == Some(last))
    }
}
