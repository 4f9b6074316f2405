/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

/// The payload buffer the connector consults but never implements. One
/// channel per direction: the input channel fills from this connector's
/// endpoint, the output channel drains toward it.
pub trait Channel {
    /// No data is pending in the channel.
    fn is_empty(&self) -> bool;

    /// Free space available for newly received data, in bytes.
    fn recv_max(&self) -> usize;

    /// The stream asked to stop reading into this channel.
    fn dont_read(&self) -> bool;

    /// This direction should be closed automatically once the other
    /// side finished.
    fn auto_close(&self) -> bool;

    /// A write on this channel timed out.
    fn write_timeout(&self) -> bool {
        false
    }

    /// Record a read-side event for the stream to inspect on wake-up.
    fn note_read_event(&mut self);

    /// Record a write-side event for the stream to inspect on wake-up.
    fn note_write_event(&mut self);
}

/// The owning application object: a full stream, or a lightweight
/// health-check context. Passed into every connector operation that may
/// need to reach the channels or the driving task.
pub trait AppCtx {
    /// The channel receiving data from this connector's endpoint.
    fn input(&mut self) -> &mut dyn Channel;

    /// The channel holding data to send to this connector's endpoint.
    fn output(&mut self) -> &mut dyn Channel;

    /// Wake the stream's driving task.
    fn task_wakeup(&mut self);

    /// Reset the connect deadline of a back-side connector once it can
    /// no longer make progress.
    fn clear_connect_deadline(&mut self) {}
}
