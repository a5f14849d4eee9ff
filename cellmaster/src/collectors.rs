// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded collection of historical per-site test results.

use std::collections::VecDeque;

/// A bounded FIFO of result records from completed test cycles.
///
/// Appending beyond the capacity drops the oldest record, so the collector
/// always holds the most recent `capacity` results.
#[derive(Debug)]
pub struct ResultsCollector {
    capacity: usize,
    data: VecDeque<serde_json::Value>,
}

impl ResultsCollector {
    /// Creates a collector holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a record, evicting the oldest one if the collector is full.
    pub fn append(&mut self, record: serde_json::Value) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(record);
    }

    /// The buffered records, oldest first.
    pub fn to_vec(&self) -> Vec<serde_json::Value> {
        self.data.iter().cloned().collect()
    }

    /// Drops all buffered records.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the collector is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
