#![doc = include_str!("../README.md")]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crossbeam_queue::ArrayQueue;

use acheron_core::prelude::*;

mod loopback;

pub use loopback::LoopbackEngine;

/// Errors surfaced by codec engines.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine already running")]
    AlreadyRunning,
    #[error("engine not running")]
    NotRunning,
    #[error("engine backend failure: {0}")]
    Backend(String),
}

/// Completion sink an engine reports into.
///
/// Implementations must be cheap and non-blocking; they run on the engine's
/// worker thread.
pub trait EngineObserver: Send + Sync + 'static {
    /// A consumed input buffer was recycled to the free queue.
    fn input_available(&self);
    /// An output buffer landed in the ready queue.
    fn output_available(&self);
    /// Out-of-band engine message.
    fn message(&self, message: CodecMessage);
}

/// Shape of one engine run, fixed at `start`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub identity: CodecIdentity,
    pub instance: u32,
    pub width: u32,
    pub height: u32,
    pub pix_fmt: PixelFormat,
    pub input_buf_count: u32,
    pub input_buf_size: usize,
    pub output_buf_count: u32,
    pub output_buf_size: usize,
    /// Stop producing after this many outputs; 0 means unbounded.
    pub receive_frame_count: u32,
}

/// Queue bundle wiring an engine to its session.
///
/// The session owns the queues; the engine holds cheap clones for the
/// duration of a run. Input is consumed from `pending_input` in queue order;
/// consumed buffers are recycled into `free_input`; produced output is pushed
/// to `ready_output` in completion order, bounded by the credits the caller
/// returns through `returned_output`.
#[derive(Clone)]
pub struct EngineIo {
    pub pending_input: WaitQueue<MediaBuffer>,
    pub free_input: WaitQueue<MediaBuffer>,
    pub ready_output: WaitQueue<MediaBuffer>,
    /// Output buffers handed back by the caller, acting as produce credits.
    pub returned_output: Arc<ArrayQueue<MediaBuffer>>,
    /// User-data blobs staged for insertion into the stream.
    pub pending_user_data: Arc<ArrayQueue<UserData>>,
    /// User-data blobs recovered from the stream, drained by the caller.
    pub user_data_out: WaitQueue<UserData>,
    /// Set while the session is paused; the engine must not consume input.
    pub paused: Arc<AtomicBool>,
    pub counters: Arc<SessionCounters>,
    pub observer: Arc<dyn EngineObserver>,
}

/// A codec backend driving one session.
///
/// Lifecycle: `start` is called once per run when the session enters the
/// running state; `flush` may be called while running, paused, or stopped;
/// `stop` joins any worker and ends the run. Pause/resume is signalled
/// through [`EngineIo::paused`], not through this trait.
pub trait Engine: Send {
    /// Implementation name for logs.
    fn name(&self) -> &'static str;

    /// Begin a run against the given queues.
    fn start(&mut self, config: &EngineConfig, io: EngineIo) -> Result<(), EngineError>;

    /// Drop whatever the engine holds in flight. Queued-but-unconsumed
    /// buffers are the session's to discard.
    fn flush(&mut self) -> Result<(), EngineError>;

    /// End the run and join the worker.
    fn stop(&mut self) -> Result<(), EngineError>;
}

/// Factory producing an engine for a codec identity.
pub type EngineFactory = Arc<dyn Fn(&CodecIdentity) -> Box<dyn Engine> + Send + Sync>;

/// Factory for the software loopback engine.
pub fn loopback_factory() -> EngineFactory {
    Arc::new(|_| Box::new(LoopbackEngine::new()) as Box<dyn Engine>)
}
