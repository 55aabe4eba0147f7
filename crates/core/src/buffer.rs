use smallvec::{SmallVec, smallvec};

/// Caller-owned media buffer exchanged across the session boundary.
///
/// The payload memory is supplied and owned by the caller; a task only holds
/// a buffer while it is in flight between queue and dequeue. `frame_end`
/// marks end-of-input on a queued input buffer, `stream_end` marks the final
/// deliverable output on a dequeued output buffer.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::MediaBuffer;
///
/// let mut buf = MediaBuffer::with_capacity(16);
/// buf.payload_mut().fill(0xAB);
/// buf.frame_end = true;
/// assert_eq!(buf.len(), 16);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MediaBuffer {
    /// Plane payloads; single-plane for bitstreams, up to three for frames.
    pub planes: SmallVec<[Vec<u8>; 3]>,
    /// Presentation timestamp in caller-defined ticks.
    pub timestamp: u64,
    /// Sequence number stamped by the session on queue/produce.
    pub sequence: u64,
    /// Set on an input buffer to mark end-of-stream.
    pub frame_end: bool,
    /// Set on an output buffer when the stream has fully drained.
    pub stream_end: bool,
    /// Set on an output buffer holding an intra (sync) frame.
    pub keyframe: bool,
}

impl MediaBuffer {
    /// Single-plane buffer of `len` zeroed bytes.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            planes: smallvec![vec![0u8; len]],
            ..Self::default()
        }
    }

    /// Buffer wrapping caller-provided planes.
    pub fn from_planes(planes: SmallVec<[Vec<u8>; 3]>) -> Self {
        Self {
            planes,
            ..Self::default()
        }
    }

    /// First-plane payload; the whole payload for single-plane buffers.
    pub fn payload(&self) -> &[u8] {
        self.planes.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable first-plane payload.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.planes
            .first_mut()
            .map(Vec::as_mut_slice)
            .unwrap_or(&mut [])
    }

    /// Total bytes across all planes.
    pub fn len(&self) -> usize {
        self.planes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset flags and stamps for recycling; payload allocations are kept so
    /// the next holder writes into the same memory.
    pub fn reset_for_reuse(&mut self) {
        self.timestamp = 0;
        self.sequence = 0;
        self.frame_end = false;
        self.stream_end = false;
        self.keyframe = false;
    }
}

/// Metadata describing a dequeued output buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputBufferInfo {
    pub timestamp: u64,
    pub sequence: u64,
    pub keyframe: bool,
}

impl OutputBufferInfo {
    pub fn for_buffer(buffer: &MediaBuffer) -> Self {
        Self {
            timestamp: buffer.timestamp,
            sequence: buffer.sequence,
            keyframe: buffer.keyframe,
        }
    }
}

/// User-data blob carried through the encoder into the stream (and back out
/// of a decoder).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub data: Vec<u8>,
}

impl UserData {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}
