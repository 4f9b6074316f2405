/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use std::sync::{Arc, Barrier};
use std::thread;

use tether_conn::{EndpointDesc, link, unlink};

#[test]
fn concurrent_unlink_from_both_sides() {
    for _ in 0..1000 {
        let a = EndpointDesc::new();
        let b = EndpointDesc::new();
        link(&a, &b);

        let barrier = Arc::new(Barrier::new(2));
        let ta = {
            let a = a.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                unlink(&a);
            })
        };
        let tb = {
            let b = b.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                unlink(&b);
            })
        };
        ta.join().unwrap();
        tb.join().unwrap();

        assert!(a.peer().is_none());
        assert!(b.peer().is_none());
    }
}

#[test]
fn concurrent_unlink_and_peer_drop() {
    for _ in 0..1000 {
        let a = EndpointDesc::new();
        let b = EndpointDesc::new();
        link(&a, &b);

        let barrier = Arc::new(Barrier::new(2));
        let ta = {
            let a = a.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                unlink(&a);
            })
        };
        let tb = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                drop(b);
            })
        };
        ta.join().unwrap();
        tb.join().unwrap();

        assert!(a.peer().is_none());
    }
}

#[test]
fn concurrent_peer_reads_never_dangle() {
    for _ in 0..200 {
        let a = EndpointDesc::new();
        let b = EndpointDesc::new();
        link(&a, &b);

        let barrier = Arc::new(Barrier::new(2));
        let reader = {
            let a = a.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                // either the live peer or nothing, never anything stale
                for _ in 0..100 {
                    if let Some(p) = a.peer() {
                        assert!(p.is_orphan());
                    }
                }
            })
        };
        let dropper = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                unlink(&b);
                drop(b);
            })
        };
        reader.join().unwrap();
        dropper.join().unwrap();
    }
}
