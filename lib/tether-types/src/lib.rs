/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

mod flags;
mod state;

pub use flags::*;
pub use state::*;
