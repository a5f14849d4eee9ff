// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-related utilities.

mod timeout;

pub(crate) use timeout::*;
