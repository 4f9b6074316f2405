/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::task::Waker;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use atomic_waker::AtomicWaker;

use tether_types::{EpAppWritable, EpEndpointWritable, EpFlags};

use crate::tick;
use crate::xref::Xref;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Mux,
    Applet,
}

/// How the write side of a transport should be shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutWriteMode {
    /// Let the transport emit its close notification first.
    Clean,
    /// Close abruptly, no close notification.
    Silent,
}

/// The endpoint side of a descriptor: a mux stream or an applet context.
/// Implementations live in the transport and applet layers.
pub trait Endpoint: Send + Sync {
    fn kind(&self) -> EndpointKind;

    /// Rouse the endpoint's own processing task.
    fn wake(&self);

    /// Shut the write direction of the underlying transport.
    fn shut_write(&self, mode: ShutWriteMode);

    /// Shut the whole underlying transport.
    fn shut(&self);

    /// The connector detached: full responsibility for the descriptor is
    /// now the endpoint's, including its eventual release.
    fn take_over(&self, desc: Arc<EndpointDesc>);
}

/// The shared anchor between an endpoint and the connector attached to
/// it. It exists as soon as either side needs it and outlives either
/// individual attachment: a descriptor without a connector is *orphan*,
/// one without an endpoint is *detached*.
///
/// `lra` is refreshed on any read activity (successful receive, read
/// shut, unblocked receives). `fsb` is set when the first send of a
/// series blocks and cleared again on a successful send.
pub struct EndpointDesc {
    flags: AtomicU32,
    lra: AtomicU64,
    fsb: AtomicU64,
    /// Id of the connector currently claiming this descriptor, 0 if none.
    owner: AtomicU64,
    endpoint: ArcSwapOption<Box<dyn Endpoint>>,
    waker: AtomicWaker,
    pub(crate) xref: Xref,
}

impl EndpointDesc {
    pub fn new() -> Arc<Self> {
        Arc::new(EndpointDesc {
            flags: AtomicU32::new(
                (EpFlags::ORPHAN | EpFlags::DETACHED).bits(),
            ),
            lra: AtomicU64::new(tick::TICK_NEVER),
            fsb: AtomicU64::new(tick::TICK_NEVER),
            owner: AtomicU64::new(0),
            endpoint: ArcSwapOption::empty(),
            waker: AtomicWaker::new(),
            xref: Xref::new(),
        })
    }

    pub fn flags(&self) -> EpFlags {
        EpFlags::from_bits_retain(self.flags.load(Ordering::Relaxed))
    }

    pub fn test(&self, mask: EpFlags) -> bool {
        self.flags().intersects(mask)
    }

    pub(crate) fn fl_set(&self, flags: EpFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::Relaxed);
    }

    pub(crate) fn fl_clr(&self, flags: EpFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::Relaxed);
    }

    /// The mutation handle reserved for the endpoint implementation.
    pub fn endpoint_side(&self) -> EndpointSide<'_> {
        EndpointSide(self)
    }

    /// The mutation handle reserved for the application layer.
    pub fn app_side(&self) -> AppSide<'_> {
        debug_assert!(!self.is_orphan(), "app flag mutation on orphan descriptor");
        AppSide(self)
    }

    pub fn kind(&self) -> Option<EndpointKind> {
        let flags = self.flags();
        if flags.contains(EpFlags::MUX) {
            Some(EndpointKind::Mux)
        } else if flags.contains(EpFlags::APPLET) {
            Some(EndpointKind::Applet)
        } else {
            None
        }
    }

    /// Bind an endpoint implementation to this descriptor.
    pub fn attach_endpoint(&self, endpoint: Box<dyn Endpoint>) {
        let kind = match endpoint.kind() {
            EndpointKind::Mux => EpFlags::MUX,
            EndpointKind::Applet => EpFlags::APPLET,
        };
        let old = self.endpoint.swap(Some(Arc::new(endpoint)));
        debug_assert!(old.is_none(), "endpoint slot already in use");
        self.fl_set(kind);
        self.fl_clr(EpFlags::DETACHED);
    }

    pub(crate) fn endpoint_handle(&self) -> Option<Arc<Box<dyn Endpoint>>> {
        self.endpoint.load_full()
    }

    /// Drop the endpoint binding and reset the descriptor to a bare
    /// detached state, keeping the connector claim untouched.
    pub(crate) fn recycle(&self) {
        self.endpoint.store(None);
        let keep = self.flags() & EpFlags::ORPHAN;
        self.flags
            .store((keep | EpFlags::DETACHED).bits(), Ordering::Relaxed);
    }

    /// Record the claim of connector `id`. Exactly one connector may
    /// claim a descriptor at a time; a second claim is a fatal bug.
    pub(crate) fn claim(&self, id: u64) {
        if let Err(cur) = self.owner.compare_exchange(
            0,
            id,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            panic!("descriptor already claimed by connector {cur}");
        }
        self.fl_clr(EpFlags::ORPHAN);
    }

    /// Release the claim of connector `id`, leaving the descriptor
    /// orphan. The caller must hold the claim.
    pub(crate) fn release(&self, id: u64) {
        let res = self.owner.compare_exchange(
            id,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        assert!(res.is_ok(), "descriptor released by a non-owning connector");
        self.fl_set(EpFlags::ORPHAN);
    }

    pub(crate) fn release_if(&self, id: u64) {
        if self
            .owner
            .compare_exchange(id, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.fl_set(EpFlags::ORPHAN);
        }
    }

    pub(crate) fn owner_id(&self) -> u64 {
        self.owner.load(Ordering::Acquire)
    }

    /// No connector is attached.
    pub fn is_orphan(&self) -> bool {
        self.owner.load(Ordering::Acquire) == 0
    }

    /// No endpoint (mux stream or applet) is attached.
    pub fn is_detached(&self) -> bool {
        self.test(EpFlags::DETACHED)
    }

    pub fn report_read_activity(&self) {
        self.lra.store(tick::now_millis(), Ordering::Relaxed);
    }

    pub fn report_send_blocked(&self) {
        let _ = self.fsb.compare_exchange(
            tick::TICK_NEVER,
            tick::now_millis(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    pub fn report_send_activity(&self) {
        self.fsb.store(tick::TICK_NEVER, Ordering::Relaxed);
    }

    pub fn last_read_activity(&self) -> Option<u64> {
        match self.lra.load(Ordering::Relaxed) {
            tick::TICK_NEVER => None,
            v => Some(v),
        }
    }

    pub fn first_send_blocked(&self) -> Option<u64> {
        match self.fsb.load(Ordering::Relaxed) {
            tick::TICK_NEVER => None,
            v => Some(v),
        }
    }

    /// Absolute read-side deadline derived from the last read activity.
    pub fn read_deadline(&self, ioto: Option<Duration>) -> Option<u64> {
        tick::deadline(self.lra.load(Ordering::Relaxed), ioto)
    }

    /// Absolute write-side deadline derived from the first blocked send.
    pub fn send_deadline(&self, ioto: Option<Duration>) -> Option<u64> {
        tick::deadline(self.fsb.load(Ordering::Relaxed), ioto)
    }

    /// The descriptor cross-referenced from the opposite side of the
    /// flow, if it is linked and still alive.
    pub fn peer(&self) -> Option<Arc<EndpointDesc>> {
        self.xref.peer()
    }

    /// Arm the wake registration consulted by the connector's scheduler.
    pub fn register_waker(&self, waker: &Waker) {
        self.waker.register(waker);
    }

    /// Rouse the attached connector's driving task, if armed.
    pub fn wake_connector(&self) {
        self.waker.wake();
    }

    pub(crate) fn wake_endpoint(&self) {
        if let Some(ep) = self.endpoint.load_full() {
            ep.wake();
        }
    }

    pub(crate) fn shut_endpoint_write(&self, mode: ShutWriteMode) {
        if let Some(ep) = self.endpoint.load_full() {
            ep.shut_write(mode);
            self.fl_set(match mode {
                ShutWriteMode::Clean => EpFlags::SHUT_WR_CLEAN,
                ShutWriteMode::Silent => EpFlags::SHUT_WR_SILENT,
            });
        }
    }

    pub(crate) fn shut_endpoint(&self) {
        if let Some(ep) = self.endpoint.load_full() {
            ep.shut();
        }
    }
}

/// Flag mutation handle restricted to the endpoint-writable subset.
pub struct EndpointSide<'a>(&'a EndpointDesc);

impl EndpointSide<'_> {
    pub fn set(&self, flags: EpEndpointWritable) {
        self.0.fl_set(flags.into());
    }

    pub fn clear(&self, flags: EpEndpointWritable) {
        self.0.fl_clr(flags.into());
    }

    pub fn test(&self, mask: EpFlags) -> bool {
        self.0.test(mask)
    }

    /// Report an error the way the taxonomy wants it: pending while data
    /// may remain to be read, final once the end of stream was seen.
    pub fn report_error(&self) {
        if self.test(EpFlags::EOS) {
            self.set(EpEndpointWritable::ERROR);
        } else {
            self.set(EpEndpointWritable::ERR_PENDING);
        }
    }
}

/// Flag mutation handle restricted to the application-writable subset.
pub struct AppSide<'a>(&'a EndpointDesc);

impl AppSide<'_> {
    pub fn set(&self, flags: EpAppWritable) {
        self.0.fl_set(flags.into());
    }

    pub fn clear(&self, flags: EpAppWritable) {
        self.0.fl_clr(flags.into());
    }

    pub fn test(&self, mask: EpFlags) -> bool {
        self.0.test(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEndpoint(EndpointKind);

    impl Endpoint for NullEndpoint {
        fn kind(&self) -> EndpointKind {
            self.0
        }
        fn wake(&self) {}
        fn shut_write(&self, _mode: ShutWriteMode) {}
        fn shut(&self) {}
        fn take_over(&self, _desc: Arc<EndpointDesc>) {}
    }

    #[test]
    fn starts_orphan_and_detached() {
        let sd = EndpointDesc::new();
        assert!(sd.is_orphan());
        assert!(sd.is_detached());
        assert!(sd.kind().is_none());
        assert!(sd.last_read_activity().is_none());
        assert!(sd.first_send_blocked().is_none());
    }

    #[test]
    fn attach_endpoint_clears_detached() {
        let sd = EndpointDesc::new();
        sd.attach_endpoint(Box::new(NullEndpoint(EndpointKind::Mux)));
        assert!(!sd.is_detached());
        assert_eq!(sd.kind(), Some(EndpointKind::Mux));
        assert!(sd.test(EpFlags::MUX));
    }

    #[test]
    fn claim_release_cycle() {
        let sd = EndpointDesc::new();
        sd.claim(7);
        assert!(!sd.is_orphan());
        assert_eq!(sd.owner_id(), 7);
        sd.release(7);
        assert!(sd.is_orphan());
    }

    #[test]
    #[should_panic(expected = "already claimed")]
    fn double_claim_is_fatal() {
        let sd = EndpointDesc::new();
        sd.claim(1);
        sd.claim(2);
    }

    #[test]
    #[should_panic(expected = "non-owning")]
    fn foreign_release_is_fatal() {
        let sd = EndpointDesc::new();
        sd.claim(1);
        sd.release(2);
    }

    #[test]
    fn role_views_touch_disjoint_bits() {
        let sd = EndpointDesc::new();
        sd.claim(1);
        sd.endpoint_side().set(EpEndpointWritable::RCV_MORE);
        sd.app_side().set(EpAppWritable::WAIT_DATA);
        assert!(sd.test(EpFlags::RCV_MORE));
        assert!(sd.test(EpFlags::WAIT_DATA));

        sd.endpoint_side().clear(EpEndpointWritable::all());
        assert!(!sd.test(EpFlags::RCV_MORE));
        assert!(sd.test(EpFlags::WAIT_DATA), "app bits survive endpoint clear");

        sd.app_side().clear(EpAppWritable::all());
        assert!(!sd.test(EpFlags::WAIT_DATA));
    }

    #[test]
    fn pending_error_promotes_after_eos() {
        let sd = EndpointDesc::new();
        sd.endpoint_side().report_error();
        assert!(sd.test(EpFlags::ERR_PENDING));
        assert!(!sd.test(EpFlags::ERROR));

        sd.endpoint_side().set(EpEndpointWritable::EOS);
        sd.endpoint_side().report_error();
        assert!(sd.test(EpFlags::ERROR));
    }

    #[test]
    fn send_blocked_keeps_first_mark() {
        let sd = EndpointDesc::new();
        sd.report_send_blocked();
        let first = sd.first_send_blocked().unwrap();
        sd.report_send_blocked();
        assert_eq!(sd.first_send_blocked(), Some(first));
        sd.report_send_activity();
        assert!(sd.first_send_blocked().is_none());
    }

    #[test]
    fn deadlines_need_marker_and_timeout() {
        let sd = EndpointDesc::new();
        let ioto = Some(Duration::from_millis(100));
        assert!(sd.read_deadline(ioto).is_none());
        sd.report_read_activity();
        let lra = sd.last_read_activity().unwrap();
        assert_eq!(sd.read_deadline(ioto), Some(lra + 100));
        assert!(sd.read_deadline(None).is_none());
    }
}
