//! Callback-to-control event channel.
//!
//! Everything that leaves the audio callback crosses an SPSC ring buffer.
//! All payloads are `Copy`, and a full ring drops the event rather than
//! blocking: the callback can never wait on the control thread.

/// Events emitted by the render callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// First buffer requested for this configuration.
    Started,
    /// One host buffer rendered: frame count and decoded peak magnitude.
    Rendered {
        /// Frames written into this buffer.
        frames: usize,
        /// Largest normalized sample magnitude in the buffer.
        peak: f32,
    },
}

/// Producer half, owned by the render callback.
pub type EventSender = rtrb::Producer<EngineEvent>;
/// Consumer half, drained by the control thread.
pub type EventReceiver = rtrb::Consumer<EngineEvent>;

/// Creates the event ring. `capacity` bounds how many buffers of history the
/// control side may fall behind before events are dropped.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    rtrb::RingBuffer::new(capacity)
}
