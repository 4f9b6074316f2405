/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use crate::channel::AppCtx;
use crate::connector::Connector;

/// Outcome of a `wake` notification, fed back into the scheduler's
/// rescheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStatus {
    /// Nothing left to do, wait for the next readiness signal.
    Idle,
    /// The driving task must run again.
    Reschedule,
}

/// The application-layer operations of a connector. A table is selected
/// once when the connector gets attached, from the owner kind and the
/// endpoint kind, and never changes afterwards. All five operations are
/// notifications: failures surface through the flag sets, never through
/// a return path, except for `wake` whose status drives rescheduling.
pub trait AppOps: Sync {
    fn name(&self) -> &'static str;

    /// The consumer tells the producer side it may check for free room.
    fn chk_rcv(&self, sc: &mut Connector, ctx: &mut dyn AppCtx);

    /// The producer tells the consumer side it may check for new data.
    fn chk_snd(&self, sc: &mut Connector, ctx: &mut dyn AppCtx);

    /// Peer-initiated hard close of the read side.
    fn abort(&self, sc: &mut Connector, ctx: &mut dyn AppCtx);

    /// Half-close negotiation on the write side.
    fn shutdown(&self, sc: &mut Connector, ctx: &mut dyn AppCtx);

    /// Generic activity notification.
    fn wake(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) -> WakeStatus;
}

/// Operations of a connector not (or no longer) bound to any endpoint.
pub(crate) struct TaskOps;
/// Operations of a mux-based connector owned by a full stream.
pub(crate) struct ConnOps;
/// Operations of an applet-based connector owned by a full stream.
pub(crate) struct AppletOps;
/// Operations of a connector owned by a health-check context.
pub(crate) struct CheckOps;

pub(crate) static TASK_OPS: TaskOps = TaskOps;
pub(crate) static CONN_OPS: ConnOps = ConnOps;
pub(crate) static APPLET_OPS: AppletOps = AppletOps;
pub(crate) static CHECK_OPS: CheckOps = CheckOps;

impl AppOps for TaskOps {
    fn name(&self) -> &'static str {
        "NONE"
    }

    fn chk_rcv(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_rcv_task(ctx);
    }

    fn chk_snd(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_snd_task(ctx);
    }

    fn abort(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.abort_task(ctx);
    }

    fn shutdown(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.shut_task(ctx);
    }

    fn wake(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) -> WakeStatus {
        sc.process_wake(ctx)
    }
}

impl AppOps for ConnOps {
    fn name(&self) -> &'static str {
        "STRM"
    }

    fn chk_rcv(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_rcv_conn(ctx);
    }

    fn chk_snd(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_snd_conn(ctx);
    }

    fn abort(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.abort_conn(ctx);
    }

    fn shutdown(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.shut_conn(ctx);
    }

    fn wake(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) -> WakeStatus {
        sc.process_wake(ctx)
    }
}

impl AppOps for AppletOps {
    fn name(&self) -> &'static str {
        "STRM"
    }

    fn chk_rcv(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_rcv_applet(ctx);
    }

    fn chk_snd(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_snd_applet(ctx);
    }

    fn abort(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.abort_applet(ctx);
    }

    fn shutdown(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.shut_applet(ctx);
    }

    fn wake(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) -> WakeStatus {
        sc.process_wake(ctx)
    }
}

impl AppOps for CheckOps {
    fn name(&self) -> &'static str {
        "CHCK"
    }

    // a check context has no opposite side feeding it, the rcv/snd
    // notifications reduce to the detached behavior
    fn chk_rcv(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_rcv_task(ctx);
    }

    fn chk_snd(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.chk_snd_task(ctx);
    }

    fn abort(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.abort_task(ctx);
    }

    fn shutdown(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) {
        sc.shut_task(ctx);
    }

    fn wake(&self, sc: &mut Connector, ctx: &mut dyn AppCtx) -> WakeStatus {
        sc.process_wake(ctx)
    }
}
