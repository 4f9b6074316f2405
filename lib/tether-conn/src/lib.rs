/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

mod tick;

mod channel;
mod connector;
mod endpoint;
mod ops;
mod xref;

pub use channel::{AppCtx, Channel};
pub use connector::{AppKind, Connector, IoEvents, RoomNeeded};
pub use endpoint::{
    AppSide, Endpoint, EndpointDesc, EndpointKind, EndpointSide, ShutWriteMode,
};
pub use ops::{AppOps, WakeStatus};
pub use xref::{link, unlink};
