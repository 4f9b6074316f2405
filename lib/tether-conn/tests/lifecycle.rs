/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use std::sync::Arc;

use tether_conn::{AppCtx, AppKind, Channel, Connector, EndpointDesc};
use tether_types::{ConnEvent, ConnFlags};

#[derive(Default)]
struct NullChannel;

impl Channel for NullChannel {
    fn is_empty(&self) -> bool {
        true
    }
    fn recv_max(&self) -> usize {
        0
    }
    fn dont_read(&self) -> bool {
        false
    }
    fn auto_close(&self) -> bool {
        false
    }
    fn note_read_event(&mut self) {}
    fn note_write_event(&mut self) {}
}

#[derive(Default)]
struct NullCtx {
    ic: NullChannel,
    oc: NullChannel,
}

impl AppCtx for NullCtx {
    fn input(&mut self) -> &mut dyn Channel {
        &mut self.ic
    }
    fn output(&mut self) -> &mut dyn Channel {
        &mut self.oc
    }
    fn task_wakeup(&mut self) {}
}

fn linked_pair() -> (Connector, Connector) {
    let front = Connector::new_from_endpoint(EndpointDesc::new());
    let back = Connector::new_from_stream(ConnFlags::IS_BACK);
    front.link_opposite(&back);
    (front, back)
}

#[test]
fn linked_sides_see_each_other() {
    let (front, back) = linked_pair();
    assert!(Arc::ptr_eq(&front.opposite().unwrap(), back.sedesc()));
    assert!(Arc::ptr_eq(&back.opposite().unwrap(), front.sedesc()));
}

#[test]
fn dropping_one_side_clears_the_view() {
    let (front, back) = linked_pair();
    drop(back);
    assert!(front.opposite().is_none());
}

#[test]
fn destroy_unlinks_before_release() {
    let (front, back) = linked_pair();
    let front_desc = front.sedesc().clone();
    front.destroy();
    assert!(front_desc.is_orphan());
    assert!(back.opposite().is_none());
}

#[test]
fn front_connector_from_accepted_endpoint() {
    let desc = EndpointDesc::new();
    let mut front = Connector::new_from_endpoint(desc.clone());
    assert!(!desc.is_orphan());
    front.attach_app(AppKind::Stream);
    assert!(desc.last_read_activity().is_some());
}

#[test]
fn retry_cycle_renews_the_descriptor() {
    let mut back = Connector::new_from_stream(ConnFlags::IS_BACK);
    let mut ctx = NullCtx::default();

    back.apply(ConnEvent::ConnectRequested).unwrap();
    back.apply(ConnEvent::AttemptStarted).unwrap();
    back.apply(ConnEvent::AttemptFailed).unwrap();

    let before = back.sedesc().clone();
    back.reset_endpoint();
    assert!(Arc::ptr_eq(back.sedesc(), &before), "no endpoint to shed");
    assert_eq!(back.flags(), ConnFlags::IS_BACK);

    back.apply(ConnEvent::RetryNow).unwrap();
    back.apply(ConnEvent::AttemptStarted).unwrap();
    back.apply(ConnEvent::IoSucceeded).unwrap();
    back.apply(ConnEvent::DataPhase).unwrap();

    back.abort(&mut ctx);
    back.shutdown(&mut ctx);
    assert!(back.flags().contains(ConnFlags::ABRT_DONE));
    assert!(back.flags().contains(ConnFlags::SHUT_DONE));
}
