// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract of the job data source.
//!
//! Parsing lot description files is a collaborator concern. On `load` the
//! master asks the source for already-parsed test parameters and broadcasts
//! them to the sites verbatim.

use crate::errors::JobDataError;
use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::json;

/// Parameters handed to every site with the `load` command.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestProgramParameters {
    /// Path of the test application entry script, relative to `cwd`.
    pub testapp_script_path: Utf8PathBuf,
    /// Arguments for the test application.
    pub testapp_script_args: Vec<String>,
    /// Working directory the sites run the test application in.
    pub cwd: Utf8PathBuf,
    /// The full job data document, opaque to the master.
    pub data: serde_json::Value,
}

/// Produces test parameters for a lot.
pub trait JobDataSource: Send {
    /// Retrieves and verifies the job data for `lot_number` and assembles
    /// the test parameters. `variant` selects a test-zip mock variant in
    /// development setups.
    fn retrieve(
        &self,
        lot_number: &str,
        variant: &str,
    ) -> Result<TestProgramParameters, JobDataError>;
}

/// The parameter set broadcast when job data verification is skipped.
pub(crate) fn debug_parameters(variant: &str) -> TestProgramParameters {
    TestProgramParameters {
        testapp_script_path: "thetest_application.py".into(),
        testapp_script_args: vec![
            "--verbose".to_owned(),
            "--thetestzip_name".to_owned(),
            variant.to_owned(),
        ],
        cwd: ".".into(),
        data: json!({
            "DEBUG_OPTION": "no content because skip_jobdata_verification enabled",
        }),
    }
}

/// A source that never verifies anything and answers every lot with the
/// debug parameter set. The default when the embedding application installs
/// no parser collaborator.
#[derive(Debug, Default)]
pub struct StubJobSource;

impl JobDataSource for StubJobSource {
    fn retrieve(
        &self,
        _lot_number: &str,
        variant: &str,
    ) -> Result<TestProgramParameters, JobDataError> {
        Ok(debug_parameters(variant))
    }
}
