/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;

use crate::endpoint::EndpointDesc;

/// One side of the mutual, non-owning link between the two descriptors
/// of a proxied flow. The peer may live on another thread, so the slot
/// only ever holds a weak reference and is mutated through lock-free
/// swaps: a concurrent unlink from both sides must never leave either
/// slot pointing at a freed peer.
pub(crate) struct Xref {
    slot: ArcSwapOption<Weak<EndpointDesc>>,
}

impl Xref {
    pub(crate) fn new() -> Self {
        Xref {
            slot: ArcSwapOption::empty(),
        }
    }

    pub(crate) fn peer(&self) -> Option<Arc<EndpointDesc>> {
        self.slot.load_full().and_then(|weak| weak.upgrade())
    }
}

/// Link the two descriptors to each other. Idempotent when they are
/// already mutually linked.
pub fn link(a: &Arc<EndpointDesc>, b: &Arc<EndpointDesc>) {
    a.xref.slot.store(Some(Arc::new(Arc::downgrade(b))));
    b.xref.slot.store(Some(Arc::new(Arc::downgrade(a))));
}

/// Break the link from one side. Safe when never linked, and safe
/// against a concurrent unlink from the peer: whichever side loses the
/// race finds the reciprocal slot already empty.
pub fn unlink(this: &Arc<EndpointDesc>) {
    let Some(peer_weak) = this.xref.slot.swap(None) else {
        return;
    };
    let Some(peer) = peer_weak.upgrade() else {
        return;
    };
    let back = peer.xref.slot.load();
    if let Some(back_weak) = back.as_ref() {
        if Weak::ptr_eq(back_weak, &Arc::downgrade(this)) {
            // only clear the reciprocal slot while it still points here,
            // a concurrent relink must not be wiped out
            peer.xref.slot.compare_and_swap(&back, None);
        }
    }
}
