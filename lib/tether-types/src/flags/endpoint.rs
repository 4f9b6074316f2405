/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use bitflags::bitflags;

bitflags! {
    /// Endpoint-side flags, shared between an endpoint (mux stream or
    /// applet) and the connector through the endpoint descriptor.
    ///
    /// Bits `0x0000_1000..=0x0020_0000` are written by the endpoint and
    /// read by the application layer, bits `0x0040_0000..` the other way
    /// around. The two writable subsets are materialized as the
    /// [`EpEndpointWritable`] and [`EpAppWritable`] types so that a
    /// caller holding one role cannot touch the other role's bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EpFlags: u32 {
        /// The endpoint is a mux stream.
        const MUX = 0x0000_0001;
        /// The endpoint is an applet.
        const APPLET = 0x0000_0002;

        /// No endpoint is attached (no mux stream, no applet).
        const DETACHED = 0x0000_0010;
        /// No connector is attached.
        const ORPHAN = 0x0000_0020;

        /// Read side shut, remaining input is being drained.
        const SHUT_RD_DRAIN = 0x0000_0100;
        /// Read side shut, remaining input is being discarded.
        const SHUT_RD_RESET = 0x0000_0200;
        /// Write side shut with a clean close notification.
        const SHUT_WR_CLEAN = 0x0000_0400;
        /// Write side shut silently.
        const SHUT_WR_SILENT = 0x0000_0800;

        /// This connector is not the first user of the endpoint.
        const NOT_FIRST = 0x0000_1000;
        /// The endpoint speaks the websocket protocol.
        const WEBSOCKET = 0x0000_2000;
        /// End of input reached.
        const EOI = 0x0000_4000;
        /// End of stream delivered to the data layer.
        const EOS = 0x0000_8000;
        /// A fatal error was reported. Never cleared once set.
        const ERROR = 0x0001_0000;
        /// An error is pending but readable data remains.
        const ERR_PENDING = 0x0002_0000;
        /// The endpoint may splice data directly to the other side.
        const MAY_SPLICE = 0x0004_0000;
        /// The endpoint may have more bytes to transfer.
        const RCV_MORE = 0x0008_0000;
        /// More bytes to transfer but not enough room for them.
        const WANT_ROOM = 0x0010_0000;
        /// No data is expected by the endpoint.
        const EXP_NO_DATA = 0x0020_0000;

        /// The stream is waiting for a transport handshake.
        const WAIT_FOR_HS = 0x0040_0000;
        /// The connection must be killed when the connector closes.
        const KILL_CONN = 0x0080_0000;
        /// The endpoint cannot work without more output data.
        const WAIT_DATA = 0x0100_0000;
        /// The endpoint will not consume more data.
        const WONT_CONSUME = 0x0200_0000;
        /// The endpoint has no more data to deliver.
        const HAVE_NO_DATA = 0x0400_0000;
        /// The applet is waiting for the other side to (fail to) connect.
        const APPLET_NEED_CONN = 0x4000_0000;
    }
}

bitflags! {
    /// The subset of [`EpFlags`] an endpoint is allowed to mutate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EpEndpointWritable: u32 {
        const NOT_FIRST = 0x0000_1000;
        const WEBSOCKET = 0x0000_2000;
        const EOI = 0x0000_4000;
        const EOS = 0x0000_8000;
        const ERROR = 0x0001_0000;
        const ERR_PENDING = 0x0002_0000;
        const MAY_SPLICE = 0x0004_0000;
        const RCV_MORE = 0x0008_0000;
        const WANT_ROOM = 0x0010_0000;
        const EXP_NO_DATA = 0x0020_0000;
    }
}

bitflags! {
    /// The subset of [`EpFlags`] the application layer is allowed to mutate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EpAppWritable: u32 {
        const WAIT_FOR_HS = 0x0040_0000;
        const KILL_CONN = 0x0080_0000;
        const WAIT_DATA = 0x0100_0000;
        const WONT_CONSUME = 0x0200_0000;
        const HAVE_NO_DATA = 0x0400_0000;
        const APPLET_NEED_CONN = 0x4000_0000;
    }
}

impl From<EpEndpointWritable> for EpFlags {
    fn from(value: EpEndpointWritable) -> Self {
        EpFlags::from_bits_retain(value.bits())
    }
}

impl From<EpAppWritable> for EpFlags {
    fn from(value: EpAppWritable) -> Self {
        EpFlags::from_bits_retain(value.bits())
    }
}

impl EpFlags {
    /// Read shut in any variant.
    pub const SHUT_RD: EpFlags =
        EpFlags::SHUT_RD_DRAIN.union(EpFlags::SHUT_RD_RESET);
    /// Write shut in any variant.
    pub const SHUT_WR: EpFlags =
        EpFlags::SHUT_WR_CLEAN.union(EpFlags::SHUT_WR_SILENT);
    /// All bits the endpoint may mutate.
    pub const ENDPOINT_WRITTEN: EpFlags =
        EpFlags::from_bits_retain(EpEndpointWritable::all().bits());
    /// All bits the application layer may mutate.
    pub const APP_WRITTEN: EpFlags =
        EpFlags::from_bits_retain(EpAppWritable::all().bits());

    /// Render the active flags as a delimited name list, for diagnostics only.
    pub fn show(&self, delim: &str) -> String {
        if self.is_empty() {
            return "NONE".to_string();
        }
        let mut buf = String::new();
        for (name, _) in self.iter_names() {
            if !buf.is_empty() {
                buf.push_str(delim);
            }
            buf.push_str(name);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_subsets_disjoint() {
        assert!(
            (EpFlags::ENDPOINT_WRITTEN & EpFlags::APP_WRITTEN).is_empty()
        );
    }

    #[test]
    fn writable_subsets_map_into_full_set() {
        for (name, v) in EpEndpointWritable::all().iter_names() {
            let full = EpFlags::from(v);
            assert_eq!(full.bits(), v.bits(), "{name}");
            assert!(EpFlags::all().contains(full), "{name}");
            assert!(EpFlags::ENDPOINT_WRITTEN.contains(full), "{name}");
            assert!(!EpFlags::APP_WRITTEN.intersects(full), "{name}");
        }
        for (name, v) in EpAppWritable::all().iter_names() {
            let full = EpFlags::from(v);
            assert_eq!(full.bits(), v.bits(), "{name}");
            assert!(EpFlags::all().contains(full), "{name}");
            assert!(EpFlags::APP_WRITTEN.contains(full), "{name}");
            assert!(!EpFlags::ENDPOINT_WRITTEN.intersects(full), "{name}");
        }
    }

    #[test]
    fn shut_masks() {
        assert_eq!(
            EpFlags::SHUT_RD,
            EpFlags::SHUT_RD_DRAIN | EpFlags::SHUT_RD_RESET
        );
        assert_eq!(
            EpFlags::SHUT_WR,
            EpFlags::SHUT_WR_CLEAN | EpFlags::SHUT_WR_SILENT
        );
    }

    #[test]
    fn show_names() {
        let f = EpFlags::MUX | EpFlags::EOI | EpFlags::WANT_ROOM;
        assert_eq!(f.show("|"), "MUX|EOI|WANT_ROOM");
        assert_eq!(EpFlags::empty().show("|"), "NONE");
    }
}
