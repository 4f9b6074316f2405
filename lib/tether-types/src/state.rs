/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use thiserror::Error;

/// Lifecycle state of a connector.
///
/// States are listed in lifecycle order. `Request`, `ConnectError`,
/// `Ready` and `Disconnecting` are transient: the driving task must
/// leave them before yielding back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnState {
    /// Not solicited yet.
    Init,
    /// Connection desired but not started. Transient.
    Request,
    /// Waiting in a server's pending-connection queue.
    Queued,
    /// Turn-around pause after a failed connect attempt.
    TurnAround,
    /// A server was just assigned.
    Assigned,
    /// Connection attempt in flight, the resource exists.
    Connecting,
    /// Previous attempt failed, the resource was released. Transient.
    ConnectError,
    /// Readiness proven by a first successful I/O. Transient.
    Ready,
    /// Established, steady-state data phase.
    Established,
    /// Disconnected, cleanup pending. Transient.
    Disconnecting,
    /// Closed, both directions shut. Terminal.
    Closed,
}

impl ConnState {
    pub const ALL: [ConnState; 11] = [
        ConnState::Init,
        ConnState::Request,
        ConnState::Queued,
        ConnState::TurnAround,
        ConnState::Assigned,
        ConnState::Connecting,
        ConnState::ConnectError,
        ConnState::Ready,
        ConnState::Established,
        ConnState::Disconnecting,
        ConnState::Closed,
    ];

    /// Single-state membership mask, for use with [`ConnStateSet`].
    pub const fn mask(self) -> ConnStateSet {
        ConnStateSet(1u16 << self as u16)
    }

    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            ConnState::Request
                | ConnState::ConnectError
                | ConnState::Ready
                | ConnState::Disconnecting
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ConnState::Closed)
    }
}

/// A set of [`ConnState`] values, derived from the enumeration and only
/// built through it, so the two views cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnStateSet(u16);

impl ConnStateSet {
    pub const EMPTY: ConnStateSet = ConnStateSet(0);
    pub const ALL: ConnStateSet = ConnStateSet((1u16 << 11) - 1);

    /// States in which read/write activity with the endpoint is possible.
    pub const ALIVE_RW: ConnStateSet = ConnStateSet::EMPTY
        .with(ConnState::Connecting)
        .with(ConnState::Ready)
        .with(ConnState::Established);

    /// States in which pending output may be pushed to the endpoint.
    pub const SEND_READY: ConnStateSet = ConnStateSet::EMPTY
        .with(ConnState::Ready)
        .with(ConnState::Established);

    /// States in which a connection attempt is pending somewhere.
    pub const CONNECT_PENDING: ConnStateSet = ConnStateSet::EMPTY
        .with(ConnState::Queued)
        .with(ConnState::TurnAround)
        .with(ConnState::Assigned)
        .with(ConnState::Connecting)
        .with(ConnState::ConnectError);

    pub const fn with(self, state: ConnState) -> ConnStateSet {
        ConnStateSet(self.0 | state.mask().0)
    }

    pub const fn contains(self, state: ConnState) -> bool {
        self.0 & state.mask().0 != 0
    }
}

/// Edges of the connector state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnEvent {
    /// The stream decided to initiate a connection.
    ConnectRequested,
    /// No server slot is available, the connector must queue.
    MustQueue,
    /// The connector left the pending-connection queue.
    Dequeued,
    /// A server was assigned without queuing.
    ServerAssigned,
    /// A connection attempt was started.
    AttemptStarted,
    /// The in-flight connection attempt failed.
    AttemptFailed,
    /// A first I/O succeeded while connecting.
    IoSucceeded,
    /// The proven-ready connector enters the data phase.
    DataPhase,
    /// Retry immediately after a failed attempt.
    RetryNow,
    /// Retry after a turn-around pause.
    RetryAfterPause,
    /// The turn-around pause elapsed, the previous server is kept.
    PauseElapsedAssign,
    /// The turn-around pause elapsed, server selection restarts.
    PauseElapsedRequest,
    /// No further connect attempts are permitted.
    GiveUp,
    /// Either side signalled a disconnect.
    Disconnected,
    /// Post-disconnect cleanup completed.
    CleanupDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no transition from {state:?} on {event:?}")]
    InvalidTransition { state: ConnState, event: ConnEvent },
}

/// The single authoritative transition function of the connector state
/// machine. Every state change, wherever it is triggered from, goes
/// through here.
pub fn transition(
    state: ConnState,
    event: ConnEvent,
) -> Result<ConnState, StateError> {
    use ConnEvent::*;
    use ConnState::*;

    let next = match (state, event) {
        (Init, ConnectRequested) => Request,

        (Request, MustQueue) => Queued,
        (Request, ServerAssigned) => Assigned,
        (Request, AttemptStarted) => Connecting,

        (Queued, Dequeued) => Assigned,

        (TurnAround, PauseElapsedRequest) => Request,
        (TurnAround, PauseElapsedAssign) => Assigned,

        (Assigned, AttemptStarted) => Connecting,

        (Connecting, IoSucceeded) => Ready,
        (Connecting, AttemptFailed) => ConnectError,

        (ConnectError, RetryNow) => Request,
        (ConnectError, RetryAfterPause) => TurnAround,

        (Ready, DataPhase) => Established,

        (
            Queued | TurnAround | Connecting | ConnectError | Ready
            | Established,
            Disconnected,
        ) => Disconnecting,

        (
            Init | Request | Queued | TurnAround | Assigned | Connecting
            | ConnectError,
            GiveUp,
        ) => Closed,

        (Disconnecting, CleanupDone) => Closed,

        _ => return Err(StateError::InvalidTransition { state, event }),
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_connect_path() {
        let mut st = ConnState::Init;
        for ev in [
            ConnEvent::ConnectRequested,
            ConnEvent::AttemptStarted,
            ConnEvent::IoSucceeded,
            ConnEvent::DataPhase,
            ConnEvent::Disconnected,
            ConnEvent::CleanupDone,
        ] {
            st = transition(st, ev).unwrap();
        }
        assert_eq!(st, ConnState::Closed);
    }

    #[test]
    fn queued_path() {
        let st = transition(ConnState::Request, ConnEvent::MustQueue).unwrap();
        assert_eq!(st, ConnState::Queued);
        let st = transition(st, ConnEvent::Dequeued).unwrap();
        assert_eq!(st, ConnState::Assigned);
        let st = transition(st, ConnEvent::AttemptStarted).unwrap();
        assert_eq!(st, ConnState::Connecting);
    }

    #[test]
    fn retry_paths() {
        let st =
            transition(ConnState::Connecting, ConnEvent::AttemptFailed).unwrap();
        assert_eq!(st, ConnState::ConnectError);
        assert_eq!(
            transition(st, ConnEvent::RetryNow).unwrap(),
            ConnState::Request
        );
        assert_eq!(
            transition(st, ConnEvent::RetryAfterPause).unwrap(),
            ConnState::TurnAround
        );
        assert_eq!(
            transition(ConnState::TurnAround, ConnEvent::PauseElapsedAssign)
                .unwrap(),
            ConnState::Assigned
        );
        assert_eq!(
            transition(ConnState::TurnAround, ConnEvent::PauseElapsedRequest)
                .unwrap(),
            ConnState::Request
        );
    }

    #[test]
    fn invalid_edges_rejected() {
        assert!(transition(ConnState::Init, ConnEvent::DataPhase).is_err());
        assert!(transition(ConnState::Closed, ConnEvent::GiveUp).is_err());
        assert!(
            transition(ConnState::Established, ConnEvent::AttemptStarted)
                .is_err()
        );
        assert!(
            transition(ConnState::Assigned, ConnEvent::Disconnected).is_err()
        );
    }

    #[test]
    fn closed_is_terminal() {
        let evs = [
            ConnEvent::ConnectRequested,
            ConnEvent::MustQueue,
            ConnEvent::Dequeued,
            ConnEvent::ServerAssigned,
            ConnEvent::AttemptStarted,
            ConnEvent::AttemptFailed,
            ConnEvent::IoSucceeded,
            ConnEvent::DataPhase,
            ConnEvent::RetryNow,
            ConnEvent::RetryAfterPause,
            ConnEvent::PauseElapsedAssign,
            ConnEvent::PauseElapsedRequest,
            ConnEvent::GiveUp,
            ConnEvent::Disconnected,
            ConnEvent::CleanupDone,
        ];
        for ev in evs {
            assert!(transition(ConnState::Closed, ev).is_err());
        }
    }

    // Liveness: with retries forbidden, every state reaches Closed in a
    // bounded number of steps.
    #[test]
    fn reaches_closed_without_retries() {
        fn next_event(st: ConnState) -> ConnEvent {
            match st {
                ConnState::Established => ConnEvent::Disconnected,
                ConnState::Disconnecting => ConnEvent::CleanupDone,
                ConnState::Ready => ConnEvent::Disconnected,
                _ => ConnEvent::GiveUp,
            }
        }
        for mut st in ConnState::ALL {
            for _ in 0..4 {
                if st.is_terminal() {
                    break;
                }
                st = transition(st, next_event(st)).unwrap();
            }
            assert_eq!(st, ConnState::Closed);
        }
    }

    #[test]
    fn state_set_membership() {
        assert!(ConnStateSet::ALIVE_RW.contains(ConnState::Established));
        assert!(!ConnStateSet::ALIVE_RW.contains(ConnState::Queued));
        assert!(ConnStateSet::SEND_READY.contains(ConnState::Ready));
        assert!(!ConnStateSet::SEND_READY.contains(ConnState::Connecting));
        for st in ConnState::ALL {
            assert!(ConnStateSet::ALL.contains(st));
            assert!(!ConnStateSet::EMPTY.contains(st));
            assert!(st.mask().contains(st));
        }
    }

    #[test]
    fn transient_marking() {
        assert!(ConnState::Request.is_transient());
        assert!(ConnState::ConnectError.is_transient());
        assert!(ConnState::Ready.is_transient());
        assert!(ConnState::Disconnecting.is_transient());
        assert!(!ConnState::Established.is_transient());
        assert!(!ConnState::Closed.is_transient());
    }
}
