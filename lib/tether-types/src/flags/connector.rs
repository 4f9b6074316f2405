/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use bitflags::bitflags;

bitflags! {
    /// Connector-side flags, owned by the connector and its application
    /// layer.
    ///
    /// Once `ABRT_WANTED` or `EOS` is set, the producer side must not
    /// alter the buffer contents anymore. Only the consumer may then
    /// perform a shutdown after draining what remains, otherwise the
    /// driving task does it. `SHUT_WANTED` is set by the driving task
    /// when `ABRT_DONE` or `EOS` holds together with the auto-close
    /// policy, or directly by a producer that observes `EOS` while
    /// forwarding data straight through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConnFlags: u32 {
        /// Set for the connector on the back side of a proxied flow.
        const IS_BACK = 0x0000_0001;
        /// End of input reached, no more data will be received.
        const EOI = 0x0000_0002;
        /// A fatal error was reported. Never cleared once set.
        const ERROR = 0x0000_0004;
        /// May close without lingering. One-shot.
        const NO_LINGER = 0x0000_0008;
        /// No half close, close both sides at once.
        const NO_HALF_CLOSE = 0x0000_0010;
        /// Resync in progress, do not wake the task up.
        const DONT_WAKE = 0x0000_0020;
        /// Independent timers, do not refresh the read deadline on writes.
        const INDEP_TIMERS = 0x0000_0040;
        /// The connector does not want to read data.
        const WONT_READ = 0x0000_0080;
        /// Waiting for an rx buffer allocation to complete.
        const NEED_BUF = 0x0000_0100;
        /// Waiting for more room in the rx buffer.
        const NEED_ROOM = 0x0000_0200;
        /// Do not loop on receive. Cleared after one successful receive.
        const RCV_ONCE = 0x0000_0400;
        /// Do not wait before sending. Cleared once all data was sent.
        const SND_ASAP = 0x0000_0800;
        /// Never wait before sending. Permanent.
        const SND_NEVER_WAIT = 0x0000_1000;
        /// More data expected to be sent very soon.
        const SND_EXP_MORE = 0x0000_2000;
        /// An abort was requested and must be performed ASAP.
        const ABRT_WANTED = 0x0000_4000;
        /// A shutdown was requested and must be performed ASAP.
        const SHUT_WANTED = 0x0000_8000;
        /// An abort was performed.
        const ABRT_DONE = 0x0001_0000;
        /// A shutdown was performed.
        const SHUT_DONE = 0x0002_0000;
        /// End of stream reported by the endpoint side.
        const EOS = 0x0004_0000;
    }
}

/// The only three observable states of one direction of the half-duplex
/// shutdown protocol. `done` wins over `wanted`, so wanted=1/done=1 is
/// still [`HalfCloseState::Closed`]; there is no fourth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfCloseState {
    /// Direction open, data flowing.
    Open,
    /// Close requested, the side may still flush pending data.
    Closing,
    /// Direction closed.
    Closed,
}

impl ConnFlags {
    /// Classify the read half (producer direction) of the connector.
    pub fn read_half(&self) -> HalfCloseState {
        if self.contains(ConnFlags::ABRT_DONE) {
            HalfCloseState::Closed
        } else if self.intersects(ConnFlags::ABRT_WANTED | ConnFlags::EOS) {
            HalfCloseState::Closing
        } else {
            HalfCloseState::Open
        }
    }

    /// Classify the write half (consumer direction) of the connector.
    pub fn write_half(&self) -> HalfCloseState {
        if self.contains(ConnFlags::SHUT_DONE) {
            HalfCloseState::Closed
        } else if self.contains(ConnFlags::SHUT_WANTED) {
            HalfCloseState::Closing
        } else {
            HalfCloseState::Open
        }
    }

    /// Whether the producer may still alter the input buffer contents.
    pub fn producer_may_write(&self) -> bool {
        !self.intersects(
            ConnFlags::ABRT_WANTED | ConnFlags::ABRT_DONE | ConnFlags::EOS,
        )
    }

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
    fn write_half_pairs() {
        let all = [
            (ConnFlags::empty(), HalfCloseState::Open),
            (ConnFlags::SHUT_WANTED, HalfCloseState::Closing),
            (ConnFlags::SHUT_DONE, HalfCloseState::Closed),
            (
                ConnFlags::SHUT_WANTED | ConnFlags::SHUT_DONE,
                HalfCloseState::Closed,
            ),
        ];
        for (flags, expected) in all {
            assert_eq!(flags.write_half(), expected, "{}", flags.show("|"));
        }
    }

    #[test]
    fn read_half_pairs() {
        let all = [
            (ConnFlags::empty(), HalfCloseState::Open),
            (ConnFlags::ABRT_WANTED, HalfCloseState::Closing),
            (ConnFlags::EOS, HalfCloseState::Closing),
            (ConnFlags::ABRT_DONE, HalfCloseState::Closed),
            (
                ConnFlags::ABRT_WANTED | ConnFlags::ABRT_DONE,
                HalfCloseState::Closed,
            ),
        ];
        for (flags, expected) in all {
            assert_eq!(flags.read_half(), expected, "{}", flags.show("|"));
        }
    }

    #[test]
    fn producer_freeze() {
        assert!(ConnFlags::empty().producer_may_write());
        assert!(!ConnFlags::EOS.producer_may_write());
        assert!(!ConnFlags::ABRT_WANTED.producer_may_write());
        assert!(!ConnFlags::ABRT_DONE.producer_may_write());
    }

    #[test]
    fn show_names() {
        let f = ConnFlags::IS_BACK | ConnFlags::SHUT_WANTED;
        assert_eq!(f.show(","), "IS_BACK,SHUT_WANTED");
    }
}
