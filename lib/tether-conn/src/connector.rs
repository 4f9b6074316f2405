/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::Waker;
use std::time::Duration;

use bitflags::bitflags;
use log::trace;

use tether_types::{
    ConnEvent, ConnFlags, ConnState, ConnStateSet, EpAppWritable, EpFlags,
    StateError, transition,
};

use crate::channel::AppCtx;
use crate::endpoint::{EndpointDesc, EndpointKind, ShutWriteMode};
use crate::ops::{
    APPLET_OPS, AppOps, CHECK_OPS, CONN_OPS, TASK_OPS, WakeStatus,
};
use crate::xref;

bitflags! {
    /// I/O readiness events a connector may subscribe to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IoEvents: u8 {
        const RECV = 0x01;
        const SEND = 0x02;
    }
}

/// The rx-side back-pressure hint: how much free input-buffer space the
/// connector needs before it may be driven to receive again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomNeeded {
    /// Waiting for room, no specific amount.
    Unspecified,
    /// At least this many free bytes. Zero means unblock ASAP.
    AtLeast(usize),
}

/// Kind of application object owning a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    Stream,
    Check,
}

static NEXT_CONNECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// The bridge between a stream's generic I/O expectations and a concrete
/// endpoint. It owns the lifecycle state machine, its own flag set, and
/// a claimed [`EndpointDesc`] carrying the endpoint-side flags.
pub struct Connector {
    id: u64,
    state: ConnState,
    flags: ConnFlags,
    ioto: Option<Duration>,
    room_needed: RoomNeeded,
    events: IoEvents,
    sedesc: Arc<EndpointDesc>,
    app: Option<AppKind>,
    ops: &'static dyn AppOps,
    src: Option<SocketAddr>,
    dst: Option<SocketAddr>,
}

impl Connector {
    fn new(sedesc: Option<Arc<EndpointDesc>>, flags: ConnFlags) -> Self {
        let id = NEXT_CONNECTOR_ID.fetch_add(1, Ordering::Relaxed);
        let sedesc = sedesc.unwrap_or_else(EndpointDesc::new);
        sedesc.claim(id);
        Connector {
            id,
            state: ConnState::Init,
            flags,
            ioto: None,
            room_needed: RoomNeeded::AtLeast(0),
            events: IoEvents::empty(),
            sedesc,
            app: None,
            ops: &TASK_OPS,
            src: None,
            dst: None,
        }
    }

    /// Build a connector on a descriptor created by the endpoint side,
    /// typically for the front of an accepted flow. The descriptor loses
    /// its orphan status here; the application is attached afterwards
    /// with [`Connector::attach_app`].
    pub fn new_from_endpoint(sedesc: Arc<EndpointDesc>) -> Self {
        Self::new(Some(sedesc), ConnFlags::empty())
    }

    /// Build a connector for a full stream with no endpoint yet, typically
    /// the back side before routing picked a server. A fresh detached
    /// descriptor is allocated.
    pub fn new_from_stream(flags: ConnFlags) -> Self {
        let mut sc = Self::new(None, flags);
        sc.app = Some(AppKind::Stream);
        sc
    }

    /// Build a connector owned by a health-check context, no endpoint yet.
    pub fn new_from_check(flags: ConnFlags) -> Self {
        let mut sc = Self::new(None, flags);
        sc.app = Some(AppKind::Check);
        sc.ops = &CHECK_OPS;
        sc
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn state_in(&self, set: ConnStateSet) -> bool {
        set.contains(self.state)
    }

    pub fn flags(&self) -> ConnFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ConnFlags) {
        self.flags.insert(flags);
    }

    pub fn clear_flags(&mut self, flags: ConnFlags) {
        self.flags.remove(flags);
    }

    pub fn sedesc(&self) -> &Arc<EndpointDesc> {
        &self.sedesc
    }

    pub fn ep_test(&self, mask: EpFlags) -> bool {
        self.sedesc.test(mask)
    }

    pub fn app(&self) -> Option<AppKind> {
        self.app
    }

    pub fn ops_name(&self) -> &'static str {
        self.ops.name()
    }

    pub fn set_io_timeout(&mut self, ioto: Option<Duration>) {
        self.ioto = ioto;
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.ioto
    }

    pub fn room_needed(&self) -> RoomNeeded {
        self.room_needed
    }

    pub fn set_src(&mut self, addr: SocketAddr) {
        self.src = Some(addr);
    }

    pub fn set_dst(&mut self, addr: SocketAddr) {
        self.dst = Some(addr);
    }

    pub fn src(&self) -> Option<SocketAddr> {
        self.src
    }

    pub fn dst(&self) -> Option<SocketAddr> {
        self.dst
    }

    fn refresh_ops(&mut self) {
        self.ops = match (self.app, self.sedesc.kind()) {
            (Some(AppKind::Check), _) => &CHECK_OPS,
            (Some(AppKind::Stream), Some(EndpointKind::Mux)) => &CONN_OPS,
            (Some(AppKind::Stream), Some(EndpointKind::Applet)) => &APPLET_OPS,
            _ => &TASK_OPS,
        };
    }

    /// Attach the owning application object. Called once the stream or
    /// check context exists, on a connector built from an endpoint.
    pub fn attach_app(&mut self, kind: AppKind) {
        self.app = Some(kind);
        self.sedesc.report_read_activity();
        self.refresh_ops();
    }

    /// Attach a mux stream endpoint to the claimed descriptor.
    pub fn attach_mux(&mut self, endpoint: Box<dyn crate::Endpoint>) {
        debug_assert_eq!(endpoint.kind(), EndpointKind::Mux);
        self.sedesc.attach_endpoint(endpoint);
        self.refresh_ops();
    }

    /// Attach an applet endpoint to the claimed descriptor. The applet
    /// starts out waiting for output data and is woken immediately.
    pub fn attach_applet(&mut self, endpoint: Box<dyn crate::Endpoint>) {
        debug_assert_eq!(endpoint.kind(), EndpointKind::Applet);
        self.sedesc.attach_endpoint(endpoint);
        self.sedesc.app_side().set(EpAppWritable::WAIT_DATA);
        self.refresh_ops();
        self.sedesc.wake_endpoint();
    }

    /// Detach from the endpoint. If one is attached, the whole
    /// responsibility for the current descriptor transfers to it and the
    /// connector claims a freshly built detached descriptor; otherwise
    /// the descriptor is recycled in place. Transient connector flags
    /// are reset, only the side marker survives.
    pub fn detach_endpoint(&mut self) {
        debug_assert_eq!(
            self.sedesc.owner_id(),
            self.id,
            "detaching a descriptor claimed by another connector"
        );
        xref::unlink(&self.sedesc);
        if let Some(ep) = self.sedesc.endpoint_handle() {
            self.sedesc.release(self.id);
            let old = std::mem::replace(&mut self.sedesc, EndpointDesc::new());
            trace!("connector {}: descriptor handed over to endpoint", self.id);
            ep.take_over(old);
            self.sedesc.claim(self.id);
        } else {
            self.sedesc.recycle();
        }
        self.flags &= ConnFlags::IS_BACK;
        self.refresh_ops();
    }

    /// Detach from the application object.
    pub fn detach_app(&mut self) {
        self.app = None;
        self.src = None;
        self.dst = None;
        self.events = IoEvents::empty();
        self.refresh_ops();
    }

    /// Tear the connector down completely.
    pub fn destroy(mut self) {
        self.detach_endpoint();
        self.detach_app();
    }

    /// Renew the endpoint attachment, e.g. for a connection retry. The
    /// old descriptor goes to its endpoint, the connector ends up with a
    /// fresh detached one. Never leaves the connector claiming two
    /// descriptors, or none.
    pub fn reset_endpoint(&mut self) {
        assert!(
            self.app.is_some(),
            "endpoint reset on a connector without an application"
        );
        self.detach_endpoint();
    }

    /// Cross-link with the connector on the opposite side of the flow.
    pub fn link_opposite(&self, other: &Connector) {
        xref::link(&self.sedesc, &other.sedesc);
    }

    pub fn unlink_opposite(&self) {
        xref::unlink(&self.sedesc);
    }

    /// Descriptor of the opposite side, while it is linked and alive.
    pub fn opposite(&self) -> Option<Arc<EndpointDesc>> {
        self.sedesc.peer()
    }

    /// Drive the lifecycle state machine. This is the only place the
    /// state ever changes.
    pub fn apply(&mut self, event: ConnEvent) -> Result<ConnState, StateError> {
        let next = transition(self.state, event)?;
        if next != self.state {
            trace!(
                "connector {}: {:?} -> {:?} on {:?}",
                self.id, self.state, next, event
            );
            self.state = next;
        }
        Ok(next)
    }

    /* rx-side blocking conditions */

    /// Block receives until at least `hint` free bytes are available.
    pub fn need_room(&mut self, hint: RoomNeeded) {
        self.flags.insert(ConnFlags::NEED_ROOM);
        self.room_needed = hint;
    }

    pub fn have_room(&mut self) {
        self.flags.remove(ConnFlags::NEED_ROOM);
        self.room_needed = RoomNeeded::AtLeast(0);
    }

    pub fn need_buffer(&mut self) {
        self.flags.insert(ConnFlags::NEED_BUF);
    }

    pub fn have_buffer(&mut self) {
        self.flags.remove(ConnFlags::NEED_BUF);
    }

    pub fn wont_read(&mut self) {
        self.flags.insert(ConnFlags::WONT_READ);
    }

    pub fn will_read(&mut self) {
        self.flags.remove(ConnFlags::WONT_READ);
    }

    /// Receives must not be driven while any rx blocking condition holds.
    pub fn rx_blocked(&self) -> bool {
        self.flags.intersects(
            ConnFlags::WONT_READ | ConnFlags::NEED_BUF | ConnFlags::NEED_ROOM,
        )
    }

    /// Report one successful receive from the endpoint.
    pub fn ack_receive(&mut self) {
        debug_assert!(
            self.flags.producer_may_write(),
            "receive after read side closed"
        );
        self.flags.remove(ConnFlags::RCV_ONCE);
        self.sedesc.report_read_activity();
    }

    /// Report a fatal error against this connector. Persists until the
    /// connector is destroyed.
    pub fn report_error(&mut self) {
        self.flags.insert(ConnFlags::ERROR);
    }

    /* wake registration */

    pub fn subscribe(&mut self, events: IoEvents, waker: &Waker) {
        self.events.insert(events);
        self.sedesc.register_waker(waker);
    }

    pub fn unsubscribe(&mut self, events: IoEvents) {
        self.events.remove(events);
    }

    pub fn subscribed(&self) -> IoEvents {
        self.events
    }

    fn wake_io(&self) {
        self.sedesc.wake_connector();
    }

    /* application-layer operations, dispatched through the ops table */

    pub fn chk_rcv(&mut self, ctx: &mut dyn AppCtx) {
        let ops = self.ops;
        ops.chk_rcv(self, ctx);
    }

    pub fn chk_snd(&mut self, ctx: &mut dyn AppCtx) {
        let ops = self.ops;
        ops.chk_snd(self, ctx);
    }

    pub fn abort(&mut self, ctx: &mut dyn AppCtx) {
        let ops = self.ops;
        ops.abort(self, ctx);
    }

    pub fn shutdown(&mut self, ctx: &mut dyn AppCtx) {
        let ops = self.ops;
        ops.shutdown(self, ctx);
    }

    pub fn wake(&mut self, ctx: &mut dyn AppCtx) -> WakeStatus {
        let ops = self.ops;
        ops.wake(self, ctx)
    }

    /// Ask for a shutdown on the next occasion, once. No effect when one
    /// was already requested or performed.
    pub fn schedule_shutdown(&mut self) {
        if !self
            .flags
            .intersects(ConnFlags::SHUT_DONE | ConnFlags::SHUT_WANTED)
        {
            self.flags.insert(ConnFlags::SHUT_WANTED);
        }
    }

    /// Whether the read-side close may be forwarded to the write side
    /// right now. When output data still has to be flushed first, the
    /// shutdown is scheduled instead.
    fn cond_forward_shut(&mut self, ctx: &mut dyn AppCtx) -> bool {
        if ctx.input().write_timeout() {
            return true;
        }
        if !self.flags.intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
            || !self.flags.contains(ConnFlags::NO_HALF_CLOSE)
        {
            return false;
        }
        if !ctx.input().is_empty() {
            self.schedule_shutdown();
            return false;
        }
        true
    }

    fn enter_disconnecting(&mut self, ctx: &mut dyn AppCtx) {
        if self.apply(ConnEvent::Disconnected).is_ok()
            && self.flags.contains(ConnFlags::IS_BACK)
        {
            ctx.clear_connect_deadline();
        }
    }

    fn shut_tail(&mut self, ctx: &mut dyn AppCtx) {
        self.flags.remove(ConnFlags::NO_LINGER);
        self.flags.insert(ConnFlags::ABRT_DONE);
        if self.flags.contains(ConnFlags::IS_BACK) {
            ctx.clear_connect_deadline();
        }
    }

    /* detached/embedded variants */

    pub(crate) fn abort_task(&mut self, ctx: &mut dyn AppCtx) {
        if self
            .flags
            .intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
        {
            return;
        }
        self.flags.insert(ConnFlags::ABRT_DONE);
        ctx.input().note_read_event();

        if !self.state_in(ConnStateSet::ALIVE_RW) {
            return;
        }

        if self.flags.contains(ConnFlags::SHUT_DONE) {
            self.enter_disconnecting(ctx);
        } else if self.cond_forward_shut(ctx) {
            return self.shut_task(ctx);
        }

        if !self.flags.contains(ConnFlags::DONT_WAKE) {
            ctx.task_wakeup();
        }
    }

    pub(crate) fn shut_task(&mut self, ctx: &mut dyn AppCtx) {
        self.flags.remove(ConnFlags::SHUT_WANTED);
        if self.flags.contains(ConnFlags::SHUT_DONE) {
            return;
        }
        self.flags.insert(ConnFlags::SHUT_DONE);
        ctx.output().note_write_event();

        match self.state {
            ConnState::Ready | ConnState::Established => {
                // keep reading on a clean half close, until the peer side
                // closes too or reads were given up
                if !self.flags.intersects(
                    ConnFlags::ERROR
                        | ConnFlags::NO_LINGER
                        | ConnFlags::EOS
                        | ConnFlags::ABRT_DONE,
                ) && !ctx.input().dont_read()
                {
                    return;
                }
                self.enter_disconnecting(ctx);
            }
            ConnState::Connecting
            | ConnState::ConnectError
            | ConnState::Queued
            | ConnState::TurnAround => self.enter_disconnecting(ctx),
            _ => {}
        }

        self.shut_tail(ctx);
        if !self.flags.contains(ConnFlags::DONT_WAKE) {
            ctx.task_wakeup();
        }
    }

    pub(crate) fn chk_rcv_task(&mut self, ctx: &mut dyn AppCtx) {
        // (re)start reading
        if !self.flags.contains(ConnFlags::DONT_WAKE) {
            ctx.task_wakeup();
        }
    }

    pub(crate) fn chk_snd_task(&mut self, ctx: &mut dyn AppCtx) {
        if self.state != ConnState::Established
            || self.flags.contains(ConnFlags::SHUT_DONE)
        {
            return;
        }
        if !self.sedesc.test(EpFlags::WAIT_DATA) || ctx.output().is_empty() {
            return;
        }
        // remaining data to push, tell the handler
        self.sedesc.app_side().clear(EpAppWritable::WAIT_DATA);
        if !self.flags.contains(ConnFlags::DONT_WAKE) {
            ctx.task_wakeup();
        }
    }

    /* mux-based variants */

    pub(crate) fn abort_conn(&mut self, ctx: &mut dyn AppCtx) {
        if self
            .flags
            .intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
        {
            return;
        }
        self.flags.insert(ConnFlags::ABRT_DONE);
        ctx.input().note_read_event();

        if !self.state_in(ConnStateSet::ALIVE_RW) {
            return;
        }

        if self.flags.contains(ConnFlags::SHUT_DONE) {
            self.sedesc.shut_endpoint();
            self.enter_disconnecting(ctx);
        } else if self.cond_forward_shut(ctx) {
            self.shut_conn(ctx);
        }
    }

    pub(crate) fn shut_conn(&mut self, ctx: &mut dyn AppCtx) {
        self.flags.remove(ConnFlags::SHUT_WANTED);
        if self.flags.contains(ConnFlags::SHUT_DONE) {
            return;
        }
        self.flags.insert(ConnFlags::SHUT_DONE);
        ctx.output().note_write_event();

        match self.state {
            ConnState::Ready | ConnState::Established => {
                if self.flags.contains(ConnFlags::ERROR) {
                    // quick close, the transport is already dead
                } else if self.flags.contains(ConnFlags::NO_LINGER) {
                    // unclean close, no close notification wanted
                    self.sedesc.shut_endpoint_write(ShutWriteMode::Silent);
                } else {
                    // clean close, let the transport signal the peer first,
                    // and keep reading until the peer side closes too
                    self.sedesc.shut_endpoint_write(ShutWriteMode::Clean);
                    if !self
                        .flags
                        .intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
                        && !ctx.input().dont_read()
                    {
                        return;
                    }
                }
                self.sedesc.shut_endpoint();
                self.enter_disconnecting(ctx);
            }
            ConnState::Connecting => {
                self.sedesc.shut_endpoint();
                self.enter_disconnecting(ctx);
            }
            ConnState::ConnectError | ConnState::Queued
            | ConnState::TurnAround => self.enter_disconnecting(ctx),
            _ => {}
        }

        self.shut_tail(ctx);
    }

    pub(crate) fn chk_rcv_conn(&mut self, _ctx: &mut dyn AppCtx) {
        // (re)start reading, the io task does the work
        if self.state_in(ConnStateSet::ALIVE_RW) {
            self.wake_io();
        }
    }

    pub(crate) fn chk_snd_conn(&mut self, ctx: &mut dyn AppCtx) {
        if !self.state_in(ConnStateSet::SEND_READY)
            || self.flags.contains(ConnFlags::SHUT_DONE)
        {
            return;
        }
        if ctx.output().is_empty() {
            // called with nothing to send
            return;
        }
        if !self.sedesc.test(EpFlags::WAIT_DATA) {
            // not waiting for data
            return;
        }
        self.sedesc.app_side().clear(EpAppWritable::WAIT_DATA);
        self.wake_io();
    }

    /* applet-based variants */

    pub(crate) fn abort_applet(&mut self, ctx: &mut dyn AppCtx) {
        if self
            .flags
            .intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
        {
            return;
        }
        self.flags.insert(ConnFlags::ABRT_DONE);
        ctx.input().note_read_event();

        // the applet itself is not called on abort

        if !self.state_in(ConnStateSet::ALIVE_RW) {
            return;
        }

        if self.flags.contains(ConnFlags::SHUT_DONE) {
            self.sedesc.shut_endpoint();
            self.enter_disconnecting(ctx);
        } else if self.cond_forward_shut(ctx) {
            self.shut_applet(ctx);
        }
    }

    pub(crate) fn shut_applet(&mut self, ctx: &mut dyn AppCtx) {
        self.flags.remove(ConnFlags::SHUT_WANTED);
        if self.flags.contains(ConnFlags::SHUT_DONE) {
            return;
        }
        self.flags.insert(ConnFlags::SHUT_DONE);
        ctx.output().note_write_event();

        // the applet is always woken up on shutdown
        self.sedesc.wake_endpoint();

        match self.state {
            ConnState::Ready | ConnState::Established => {
                if !self.flags.intersects(
                    ConnFlags::ERROR
                        | ConnFlags::NO_LINGER
                        | ConnFlags::EOS
                        | ConnFlags::ABRT_DONE,
                ) && !ctx.input().dont_read()
                {
                    return;
                }
                self.sedesc.shut_endpoint();
                self.enter_disconnecting(ctx);
            }
            ConnState::Connecting
            | ConnState::ConnectError
            | ConnState::Queued
            | ConnState::TurnAround => {
                self.sedesc.shut_endpoint();
                self.enter_disconnecting(ctx);
            }
            _ => {}
        }

        self.shut_tail(ctx);
    }

    pub(crate) fn chk_rcv_applet(&mut self, _ctx: &mut dyn AppCtx) {
        // (re)start reading
        self.sedesc.wake_endpoint();
    }

    pub(crate) fn chk_snd_applet(&mut self, ctx: &mut dyn AppCtx) {
        if self.state != ConnState::Established
            || self.flags.contains(ConnFlags::SHUT_DONE)
        {
            return;
        }
        // only wake the applet if it waits for data it can consume now,
        // or if a shutdown is pending
        if !self
            .sedesc
            .test(EpFlags::WAIT_DATA | EpFlags::WONT_CONSUME)
            && !self.flags.contains(ConnFlags::SHUT_WANTED)
        {
            return;
        }
        if !ctx.output().is_empty() {
            self.sedesc.wake_endpoint();
        }
    }

    /* endpoint-driven notifications */

    /// Propagate an end of stream received from the endpoint. Forwards
    /// the close to the write side when half closes are disabled.
    pub fn endpoint_eos(&mut self, ctx: &mut dyn AppCtx) {
        if self
            .flags
            .intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
        {
            return;
        }
        self.flags.insert(ConnFlags::EOS);
        ctx.input().note_read_event();
        self.sedesc.report_read_activity();

        if !self.state_in(ConnStateSet::ALIVE_RW) {
            return;
        }

        if self.flags.contains(ConnFlags::SHUT_DONE) {
            self.close_both(ctx);
        } else if self.cond_forward_shut(ctx) {
            self.sedesc.shut_endpoint_write(ShutWriteMode::Silent);
            self.close_both(ctx);
        }
    }

    fn close_both(&mut self, ctx: &mut dyn AppCtx) {
        self.sedesc.shut_endpoint();
        self.flags.remove(ConnFlags::SHUT_WANTED);
        self.flags.insert(ConnFlags::SHUT_DONE);
        self.enter_disconnecting(ctx);
    }

    /// Fold the endpoint's input markers into the connector after a
    /// receive round: end of input, end of stream, fatal error.
    pub fn sync_endpoint_markers(&mut self, ctx: &mut dyn AppCtx) {
        if self.sedesc.test(EpFlags::EOI) {
            self.flags.insert(ConnFlags::EOI);
        }
        if self.sedesc.test(EpFlags::EOS) {
            self.endpoint_eos(ctx);
        }
        if self.sedesc.test(EpFlags::ERROR) {
            self.flags.insert(ConnFlags::ERROR);
        }
    }

    /* stream-handler-side refresh */

    /// Refresh the rx blocking state from the input channel. Called by
    /// the stream handler once the channel flags settled.
    pub fn update_rx(&mut self, ctx: &mut dyn AppCtx) {
        if self
            .flags
            .intersects(ConnFlags::EOS | ConnFlags::ABRT_DONE)
        {
            return;
        }

        // unblock when enough free space showed up; a zero requirement
        // always unblocks, an unspecified one never does on its own
        let unblock = match self.room_needed {
            RoomNeeded::Unspecified => false,
            RoomNeeded::AtLeast(0) => true,
            RoomNeeded::AtLeast(n) => ctx.input().recv_max() >= n,
        };
        if unblock {
            self.have_room();
        }

        if ctx.input().dont_read() {
            self.wont_read();
        } else {
            self.will_read();
        }

        self.chk_rcv(ctx);
    }

    /// Refresh the tx readiness state from the output channel. Called by
    /// the stream handler once the channel flags settled.
    pub fn update_tx(&mut self, ctx: &mut dyn AppCtx) {
        if self.flags.contains(ConnFlags::SHUT_DONE) {
            return;
        }

        if ctx.output().is_empty() {
            // nothing to write: wait for data unless a shutdown is pending
            if !self.sedesc.test(EpFlags::WAIT_DATA)
                && !self.flags.contains(ConnFlags::SHUT_WANTED)
            {
                self.sedesc.app_side().set(EpAppWritable::WAIT_DATA);
            }
            return;
        }

        // (re)start writing
        self.sedesc.app_side().clear(EpAppWritable::WAIT_DATA);
    }

    /// Generic activity notification, shared by all ops tables. Performs
    /// the pending shutdown when it became possible, refreshes the
    /// blocking flags, and reports whether the driving task must run.
    pub(crate) fn process_wake(&mut self, ctx: &mut dyn AppCtx) -> WakeStatus {
        // fold a fatal endpoint error into the connector's own flags
        if self.sedesc.test(EpFlags::ERROR) {
            self.flags.insert(ConnFlags::ERROR);
        }

        // the driving task schedules the shutdown once the read side
        // finished and the auto-close policy holds
        if self
            .flags
            .intersects(ConnFlags::ABRT_DONE | ConnFlags::EOS)
            && ctx.output().auto_close()
        {
            self.schedule_shutdown();
        }

        if ctx.output().is_empty()
            && self.flags & (ConnFlags::SHUT_DONE | ConnFlags::SHUT_WANTED)
                == ConnFlags::SHUT_WANTED
            && self.state == ConnState::Established
        {
            let ops = self.ops;
            ops.shutdown(self, ctx);
        }

        let sw = self.flags & (ConnFlags::SHUT_DONE | ConnFlags::SHUT_WANTED);
        if sw.is_empty() {
            self.sedesc.app_side().set(EpAppWritable::WAIT_DATA);
        } else if sw == ConnFlags::SHUT_WANTED {
            self.sedesc.app_side().clear(EpAppWritable::WAIT_DATA);
        }

        if ctx.input().dont_read() {
            self.wont_read();
        } else {
            self.will_read();
        }

        if self.flags.intersects(
            ConnFlags::ERROR
                | ConnFlags::EOI
                | ConnFlags::EOS
                | ConnFlags::ABRT_DONE
                | ConnFlags::SHUT_DONE,
        ) || self.sedesc.test(EpFlags::ERR_PENDING)
        {
            if !self.flags.contains(ConnFlags::DONT_WAKE) {
                ctx.task_wakeup();
            }
            WakeStatus::Reschedule
        } else {
            WakeStatus::Idle
        }
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        xref::unlink(&self.sedesc);
        self.sedesc.release_if(self.id);
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Connector{{id={} state={:?} flags=[{}] ep=[{}]}}",
            self.id,
            self.state,
            self.flags.show("|"),
            self.sedesc.flags().show("|"),
        )
    }
}
