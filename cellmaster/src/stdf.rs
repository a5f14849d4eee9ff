// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract of the STDF result aggregator.
//!
//! Encoding the industry STDF format is a collaborator concern; the master
//! only routes opaque record payloads to an aggregator created per loaded
//! lot and tears it down after every site delivered its end-of-lot summary.

use debug_ignore::DebugIgnore;
use std::sync::{Arc, Mutex};

/// Sink for the per-lot result stream.
pub trait StdfAggregator: Send {
    /// Writes the file header records. Called once, right after the test
    /// program finished loading.
    fn write_header_records(&mut self);

    /// Appends one per-site test result record.
    fn append_test_results(&mut self, payload: &serde_json::Value);

    /// Appends one per-site end-of-lot summary record.
    fn append_test_summary(&mut self, payload: &serde_json::Value);

    /// Writes the footer records and closes the aggregate.
    fn finalize(&mut self);
}

/// Creates one [`StdfAggregator`] per loaded lot.
pub trait StdfFactory: Send {
    /// Creates an aggregator for the given tester node and lot.
    fn create(
        &self,
        node_name: &str,
        lot_number: &str,
        job_name: &str,
    ) -> Box<dyn StdfAggregator>;
}

/// A factory producing aggregators that discard everything. The default when
/// the embedding application installs no STDF collaborator.
#[derive(Debug, Default)]
pub struct NullStdfFactory;

impl StdfFactory for NullStdfFactory {
    fn create(&self, _: &str, _: &str, _: &str) -> Box<dyn StdfAggregator> {
        struct Null;
        impl StdfAggregator for Null {
            fn write_header_records(&mut self) {}
            fn append_test_results(&mut self, _: &serde_json::Value) {}
            fn append_test_summary(&mut self, _: &serde_json::Value) {}
            fn finalize(&mut self) {}
        }
        Box::new(Null)
    }
}

/// One recorded aggregator call, for tests.
#[derive(Clone, Debug, PartialEq)]
pub enum StdfRecord {
    /// A new aggregator was created.
    Created {
        /// Tester node name.
        node_name: String,
        /// The lot number.
        lot_number: String,
        /// The job name.
        job_name: String,
    },
    /// Header records were written.
    Header,
    /// A result record was appended.
    Result(serde_json::Value),
    /// A summary record was appended.
    Summary(serde_json::Value),
    /// The aggregate was finalized.
    Finalized,
}

/// A factory whose aggregators record every call into a shared log, so tests
/// can assert on the aggregator lifecycle.
#[derive(Clone, Debug, Default)]
pub struct MemoryStdfFactory {
    records: DebugIgnore<Arc<Mutex<Vec<StdfRecord>>>>,
}

impl MemoryStdfFactory {
    /// Creates an empty recording factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, across all created aggregators.
    pub fn records(&self) -> Vec<StdfRecord> {
        self.records.lock().expect("records lock").clone()
    }
}

impl StdfFactory for MemoryStdfFactory {
    fn create(
        &self,
        node_name: &str,
        lot_number: &str,
        job_name: &str,
    ) -> Box<dyn StdfAggregator> {
        let records = Arc::clone(&self.records);
        records.lock().expect("records lock").push(StdfRecord::Created {
            node_name: node_name.to_owned(),
            lot_number: lot_number.to_owned(),
            job_name: job_name.to_owned(),
        });

        struct Memory {
            records: Arc<Mutex<Vec<StdfRecord>>>,
        }
        impl Memory {
            fn push(&self, record: StdfRecord) {
                self.records.lock().expect("records lock").push(record);
            }
        }
        impl StdfAggregator for Memory {
            fn write_header_records(&mut self) {
                self.push(StdfRecord::Header);
            }
            fn append_test_results(&mut self, payload: &serde_json::Value) {
                self.push(StdfRecord::Result(payload.clone()));
            }
            fn append_test_summary(&mut self, payload: &serde_json::Value) {
                self.push(StdfRecord::Summary(payload.clone()));
            }
            fn finalize(&mut self) {
                self.push(StdfRecord::Finalized);
            }
        }
        Box::new(Memory { records })
    }
}
