/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

mod connector;
mod endpoint;

pub use connector::{ConnFlags, HalfCloseState};
pub use endpoint::{EpAppWritable, EpEndpointWritable, EpFlags};
