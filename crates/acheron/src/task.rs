//! One live codec session: lifecycle state machine, reference count, buffer
//! exchange queues, and callback delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use acheron_core::prelude::*;
use acheron_engine::{Engine, EngineConfig, EngineFactory, EngineIo, EngineObserver};

use crate::config::{self, AppliedConfig, ConfigKind, ConfigValue};
use crate::context::{MediaContext, StartupParams};

const USER_DATA_DEPTH: usize = 16;

/// Callback invoked when a buffer becomes available.
///
/// Callbacks run on the engine's worker thread and must not call back into
/// the owning service.
pub type BufferCallback = Arc<dyn Fn(&CallbackInfo) + Send + Sync>;
/// Callback invoked for out-of-band codec messages.
pub type MessageCallback = Arc<dyn Fn(&CallbackInfo, &CodecMessage) + Send + Sync>;

/// Identity snapshot handed to callbacks.
#[derive(Debug, Clone, Copy)]
pub struct CallbackInfo {
    pub identity: CodecIdentity,
    pub instance: u32,
    pub user_tag: u64,
}

/// Caller-registered callback bundle.
///
/// The primary set (`on_input_available`, `on_output_available`,
/// `on_message`) must be registered complete or not at all. The stream
/// buffer listener is a separate, informative-only delivery mode; supplying
/// primary callbacks alongside it is accepted and logged, never an error.
#[derive(Clone, Default)]
pub struct CodecCallback {
    pub on_input_available: Option<BufferCallback>,
    pub on_output_available: Option<BufferCallback>,
    pub on_message: Option<MessageCallback>,
    pub on_stream_buffer: Option<BufferCallback>,
}

#[derive(Clone)]
pub(crate) struct PrimaryCallbacks {
    pub on_input_available: BufferCallback,
    pub on_output_available: BufferCallback,
    pub on_message: MessageCallback,
}

#[derive(Default)]
struct CallbackSlots {
    primary: Option<PrimaryCallbacks>,
    stream: Option<BufferCallback>,
    user_tag: u64,
}

/// Status snapshot of a live task.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub state: CodecState,
    pub input_free: usize,
    pub input_pending: usize,
    pub output_ready: usize,
    pub frames_submitted: u64,
    pub frames_consumed: u64,
    pub frames_produced: u64,
    pub buffers_returned: u64,
    pub input_drained: bool,
    pub user_flags: u32,
}

/// Buffer geometry derived from the configure-time parameters.
#[derive(Debug, Clone)]
struct SessionShape {
    width: u32,
    height: u32,
    pix_fmt: PixelFormat,
    input_buf_count: u32,
    input_buf_size: usize,
    output_buf_count: u32,
    output_buf_size: usize,
}

fn shape_for(ctx: &MediaContext) -> Result<SessionShape, MediaError> {
    match &ctx.params {
        CodecParams::VideoEncoder(p) => {
            let frame = p.pix_fmt.frame_bytes(p.width, p.height);
            let bitstream = if p.bitstream_buf_size == 0 {
                frame
            } else {
                p.bitstream_buf_size as usize
            };
            Ok(SessionShape {
                width: p.width,
                height: p.height,
                pix_fmt: p.pix_fmt,
                input_buf_count: p.frame_buf_count,
                input_buf_size: frame,
                output_buf_count: p.bitstream_buf_count,
                output_buf_size: bitstream,
            })
        }
        CodecParams::VideoDecoder(p) => {
            let frame = p.pix_fmt.frame_bytes(p.width, p.height);
            let bitstream = if p.bitstream_buf_size == 0 {
                frame
            } else {
                p.bitstream_buf_size as usize
            };
            Ok(SessionShape {
                width: p.width,
                height: p.height,
                pix_fmt: p.pix_fmt,
                input_buf_count: p.bitstream_buf_count,
                input_buf_size: bitstream,
                output_buf_count: p.frame_buf_count,
                output_buf_size: frame,
            })
        }
        CodecParams::AudioEncoder(_) | CodecParams::AudioDecoder(_) => Err(
            MediaError::InvalidParams("audio parameters are not accepted by the video task path"),
        ),
    }
}

struct TaskState {
    lifecycle: CodecState,
    config: Option<AppliedConfig>,
    shape: Option<SessionShape>,
    engine: Option<Box<dyn Engine>>,
    io: Option<EngineIo>,
    input_drained: bool,
    ever_queued: bool,
    user_flags: u32,
}

/// A live codec session owned by the registry.
///
/// Callers never hold a `Task` directly; they hold counted `TaskRef` guards
/// resolved through the registry for the duration of one call.
pub(crate) struct Task {
    identity: CodecIdentity,
    instance: u32,
    refs: AtomicU32,
    released: AtomicBool,
    counters: Arc<SessionCounters>,
    callbacks: Arc<Mutex<CallbackSlots>>,
    state: Mutex<TaskState>,
}

fn wrong_state(op: &'static str, state: CodecState) -> MediaError {
    MediaError::OperationNotAllowed(NotAllowed::WrongState { op, state })
}

impl Task {
    pub fn new(identity: CodecIdentity, instance: u32) -> Self {
        Self {
            identity,
            instance,
            refs: AtomicU32::new(0),
            released: AtomicBool::new(false),
            counters: Arc::new(SessionCounters::default()),
            callbacks: Arc::new(Mutex::new(CallbackSlots::default())),
            state: Mutex::new(TaskState {
                lifecycle: CodecState::Uninitialized,
                config: None,
                shape: None,
                engine: None,
                io: None,
                input_drained: false,
                ever_queued: false,
                user_flags: 0,
            }),
        }
    }

    pub fn identity(&self) -> CodecIdentity {
        self.identity
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn lifecycle(&self) -> CodecState {
        self.state.lock().lifecycle
    }

    pub fn inc_ref(&self) -> u32 {
        self.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn dec_ref(&self) -> u32 {
        self.refs.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub fn refs(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// `UNINITIALIZED → INITIALIZED`; a no-op success when already live.
    pub fn initialize(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        match state.lifecycle {
            CodecState::Uninitialized => {
                state.lifecycle = CodecState::Initialized;
                Ok(())
            }
            CodecState::Released => Err(wrong_state("initialize", CodecState::Released)),
            _ => Ok(()),
        }
    }

    /// `INITIALIZED → CONFIGURED` after full parameter validation.
    pub fn configure(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if state.lifecycle != CodecState::Initialized {
            return Err(wrong_state("configure", state.lifecycle));
        }
        config::validate_configure(ctx)?;
        state.shape = Some(shape_for(ctx)?);
        state.config = Some(AppliedConfig::for_context(ctx));
        state.lifecycle = CodecState::Configured;
        info!(instance = self.instance, "codec task configured");
        Ok(())
    }

    /// `CONFIGURED → RUNNING` (fresh run) or `PAUSED → RUNNING` (resume).
    pub fn start(
        &self,
        startup: &StartupParams,
        engines: &EngineFactory,
    ) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        match state.lifecycle {
            CodecState::Paused => {
                if let Some(io) = &state.io {
                    io.paused.store(false, Ordering::Release);
                }
                state.lifecycle = CodecState::Running;
                debug!(instance = self.instance, "codec task resumed");
                Ok(())
            }
            CodecState::Configured => {
                let shape = state.shape.clone().ok_or(MediaError::Unknown)?;
                let io = self.build_io(&shape);
                let engine_config = EngineConfig {
                    identity: self.identity,
                    instance: self.instance,
                    width: shape.width,
                    height: shape.height,
                    pix_fmt: shape.pix_fmt,
                    input_buf_count: shape.input_buf_count,
                    input_buf_size: shape.input_buf_size,
                    output_buf_count: shape.output_buf_count,
                    output_buf_size: shape.output_buf_size,
                    receive_frame_count: startup.receive_frame_count,
                };
                let mut engine = match state.engine.take() {
                    Some(engine) => engine,
                    None => (engines)(&self.identity),
                };
                if let Err(e) = engine.start(&engine_config, io.clone()) {
                    warn!(instance = self.instance, error = %e, "engine start failed");
                    state.engine = Some(engine);
                    return Err(MediaError::Unknown);
                }
                let engine_name = engine.name();
                state.engine = Some(engine);
                state.io = Some(io);
                state.input_drained = false;
                state.lifecycle = CodecState::Running;
                info!(
                    instance = self.instance,
                    engine = engine_name,
                    "codec task started"
                );
                Ok(())
            }
            other => Err(wrong_state("start", other)),
        }
    }

    fn build_io(&self, shape: &SessionShape) -> EngineIo {
        let free_input = WaitQueue::bounded(shape.input_buf_count as usize);
        for _ in 0..shape.input_buf_count {
            let _ = free_input.push(
                MediaBuffer::with_capacity(shape.input_buf_size),
                Wait::NonBlocking,
            );
        }
        let returned_output = Arc::new(ArrayQueue::new(shape.output_buf_count as usize));
        for _ in 0..shape.output_buf_count {
            let _ = returned_output.push(MediaBuffer::with_capacity(shape.output_buf_size));
        }
        EngineIo {
            pending_input: WaitQueue::bounded(shape.input_buf_count as usize),
            free_input,
            ready_output: WaitQueue::bounded(shape.output_buf_count as usize),
            returned_output,
            pending_user_data: Arc::new(ArrayQueue::new(USER_DATA_DEPTH)),
            user_data_out: WaitQueue::bounded(USER_DATA_DEPTH),
            paused: Arc::new(AtomicBool::new(false)),
            counters: self.counters.clone(),
            observer: Arc::new(TaskObserver {
                identity: self.identity,
                instance: self.instance,
                slots: self.callbacks.clone(),
            }),
        }
    }

    /// `RUNNING → PAUSED`; queued buffers are preserved.
    pub fn pause(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if state.lifecycle != CodecState::Running {
            return Err(wrong_state("pause", state.lifecycle));
        }
        if let Some(io) = &state.io {
            io.paused.store(true, Ordering::Release);
        }
        state.lifecycle = CodecState::Paused;
        debug!(instance = self.instance, "codec task paused");
        Ok(())
    }

    /// Momentary drain: discard queued-but-unconsumed buffers and wake
    /// blocked waiters with a `Flushed` outcome. A second flush with nothing
    /// queued is a no-op success.
    pub fn flush(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if !matches!(
            state.lifecycle,
            CodecState::Running | CodecState::Paused | CodecState::Stopped
        ) {
            return Err(wrong_state("flush", state.lifecycle));
        }
        if let Some(io) = &state.io {
            for mut buf in io.pending_input.flush() {
                buf.reset_for_reuse();
                let _ = io.free_input.push(buf, Wait::NonBlocking);
            }
            for mut buf in io.ready_output.flush() {
                buf.reset_for_reuse();
                let _ = io.returned_output.push(buf);
            }
        }
        if let Some(engine) = state.engine.as_mut()
            && let Err(e) = engine.flush()
        {
            warn!(instance = self.instance, error = %e, "engine flush failed");
        }
        debug!(instance = self.instance, "codec task flushed");
        Ok(())
    }

    /// `RUNNING|PAUSED → STOPPED`; wakes blocked waiters with `Stopped`.
    /// Engine failures are logged and teardown proceeds.
    pub fn stop(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if !matches!(state.lifecycle, CodecState::Running | CodecState::Paused) {
            return Err(wrong_state("stop", state.lifecycle));
        }
        if let Some(engine) = state.engine.as_mut()
            && let Err(e) = engine.stop()
        {
            warn!(instance = self.instance, error = %e, "engine stop failed");
        }
        if let Some(io) = &state.io {
            io.paused.store(false, Ordering::Release);
            io.pending_input.close();
            io.free_input.close();
            io.ready_output.close();
            io.user_data_out.close();
            while io.returned_output.pop().is_some() {}
        }
        state.lifecycle = CodecState::Stopped;
        info!(instance = self.instance, "codec task stopped");
        Ok(())
    }

    /// `STOPPED → RELEASED`, also legal from `INITIALIZED`/`CONFIGURED` when
    /// no buffer was ever queued. The registry entry is finalized when the
    /// last reference drops.
    pub fn release(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        let allowed = matches!(state.lifecycle, CodecState::Stopped)
            || (matches!(
                state.lifecycle,
                CodecState::Initialized | CodecState::Configured
            ) && !state.ever_queued);
        if !allowed {
            return Err(wrong_state("release", state.lifecycle));
        }
        state.engine = None;
        state.io = None;
        state.lifecycle = CodecState::Released;
        self.released.store(true, Ordering::Release);
        info!(instance = self.instance, "codec task released");
        Ok(())
    }

    fn running_io(&self, op: &'static str) -> Result<EngineIo, MediaError> {
        let state = self.state.lock();
        match state.lifecycle {
            CodecState::Running | CodecState::Paused => {
                state.io.clone().ok_or(MediaError::Unknown)
            }
            other => Err(wrong_state(op, other)),
        }
    }

    /// Obtain an empty input buffer to fill.
    pub fn dequeue_input(&self, wait: Wait) -> Result<DequeueOutcome<MediaBuffer>, MediaError> {
        let io = self.running_io("dequeue_input_buffer")?;
        Ok(io.free_input.pop(wait))
    }

    /// Submit a filled input buffer. `frame_end` marks end-of-stream; after
    /// it is accepted no further input is accepted until the next start.
    pub fn queue_input(
        &self,
        mut buffer: MediaBuffer,
        wait: Wait,
    ) -> Result<QueueOutcome<MediaBuffer>, MediaError> {
        let marks_eos = buffer.frame_end;
        let io = {
            let mut state = self.state.lock();
            match state.lifecycle {
                CodecState::Running | CodecState::Paused => {}
                other => return Err(wrong_state("queue_input_buffer", other)),
            }
            if state.input_drained {
                return Err(MediaError::OperationNotAllowed(NotAllowed::InputDrained));
            }
            if marks_eos {
                state.input_drained = true;
            }
            state.ever_queued = true;
            state.io.clone().ok_or(MediaError::Unknown)?
        };
        buffer.sequence = self.counters.inc_submitted();
        let outcome = io.pending_input.push(buffer, wait);
        if marks_eos && !outcome.is_queued() {
            // The EOS buffer was not accepted; let the caller retry it.
            self.state.lock().input_drained = false;
        }
        Ok(outcome)
    }

    /// Receive the next produced output buffer with its metadata.
    pub fn dequeue_output(
        &self,
        wait: Wait,
    ) -> Result<DequeueOutcome<(MediaBuffer, OutputBufferInfo)>, MediaError> {
        let io = self.running_io("dequeue_output_buffer")?;
        let outcome = match io.ready_output.pop(wait) {
            DequeueOutcome::Ready(buf) => {
                let info = OutputBufferInfo::for_buffer(&buf);
                DequeueOutcome::Ready((buf, info))
            }
            DequeueOutcome::TimedOut => DequeueOutcome::TimedOut,
            DequeueOutcome::Flushed => DequeueOutcome::Flushed,
            DequeueOutcome::Stopped => DequeueOutcome::Stopped,
        };
        Ok(outcome)
    }

    /// Return a consumed output buffer to the engine's pool. Never blocks;
    /// the pool is sized to the outstanding buffer count.
    pub fn queue_output(
        &self,
        mut buffer: MediaBuffer,
        _wait: Wait,
    ) -> Result<QueueOutcome<MediaBuffer>, MediaError> {
        let io = self.running_io("queue_output_buffer")?;
        buffer.reset_for_reuse();
        if io.returned_output.push(buffer).is_err() {
            return Err(MediaError::InvalidParams(
                "output buffer was never dequeued from this session",
            ));
        }
        self.counters.inc_returned();
        Ok(QueueOutcome::Queued)
    }

    /// Claim the next user-data blob recovered from the stream.
    pub fn user_data(&self, wait: Wait) -> Result<DequeueOutcome<UserData>, MediaError> {
        let io = self.running_io("get_user_data")?;
        Ok(io.user_data_out.pop(wait))
    }

    pub fn get_config(
        &self,
        kind: ConfigKind,
        ctx: &MediaContext,
        arg: Option<u32>,
    ) -> Result<ConfigValue, MediaError> {
        let state = self.state.lock();
        match &state.config {
            Some(cfg) => config::get_applied(cfg, kind, &self.identity, arg),
            // Live but unconfigured: structural defaults still apply.
            None => config::default_value(kind, ctx, arg),
        }
    }

    pub fn set_config(&self, value: ConfigValue) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if !matches!(
            state.lifecycle,
            CodecState::Configured | CodecState::Running | CodecState::Paused
        ) {
            return Err(wrong_state("set_config", state.lifecycle));
        }
        if let ConfigValue::InsertUserData(data) = value {
            let io = state
                .io
                .as_ref()
                .ok_or_else(|| wrong_state("insert_user_data", state.lifecycle))?;
            return io
                .pending_user_data
                .push(data)
                .map_err(|_| MediaError::InsufficientResources("user-data queue is full"));
        }
        let identity = self.identity;
        let cfg = state.config.as_mut().ok_or(MediaError::Unknown)?;
        config::apply(cfg, &identity, value)
    }

    pub fn install_primary(&self, primary: PrimaryCallbacks, user_tag: u64) {
        let mut slots = self.callbacks.lock();
        slots.primary = Some(primary);
        slots.user_tag = user_tag;
    }

    pub fn install_stream_listener(&self, stream: BufferCallback, user_tag: u64) {
        let mut slots = self.callbacks.lock();
        slots.stream = Some(stream);
        slots.user_tag = user_tag;
    }

    pub fn status(&self) -> TaskStatus {
        let state = self.state.lock();
        let (input_free, input_pending, output_ready) = match &state.io {
            Some(io) => (
                io.free_input.len(),
                io.pending_input.len(),
                io.ready_output.len(),
            ),
            None => (0, 0, 0),
        };
        TaskStatus {
            state: state.lifecycle,
            input_free,
            input_pending,
            output_ready,
            frames_submitted: self.counters.submitted(),
            frames_consumed: self.counters.consumed(),
            frames_produced: self.counters.produced(),
            buffers_returned: self.counters.returned(),
            input_drained: state.input_drained,
            user_flags: state.user_flags,
        }
    }

    pub fn set_user_flags(&self, flags: u32) {
        self.state.lock().user_flags = flags;
    }
}

/// Bridges engine completions to the registered callback sets.
struct TaskObserver {
    identity: CodecIdentity,
    instance: u32,
    slots: Arc<Mutex<CallbackSlots>>,
}

impl TaskObserver {
    fn snapshot(&self) -> (Option<PrimaryCallbacks>, Option<BufferCallback>, CallbackInfo) {
        let slots = self.slots.lock();
        let info = CallbackInfo {
            identity: self.identity,
            instance: self.instance,
            user_tag: slots.user_tag,
        };
        (slots.primary.clone(), slots.stream.clone(), info)
    }
}

impl EngineObserver for TaskObserver {
    fn input_available(&self) {
        let (primary, _, info) = self.snapshot();
        if let Some(p) = primary {
            (p.on_input_available)(&info);
        }
    }

    fn output_available(&self) {
        let (primary, stream, info) = self.snapshot();
        if let Some(p) = primary {
            (p.on_output_available)(&info);
        }
        if let Some(listener) = stream {
            (listener)(&info);
        }
    }

    fn message(&self, message: CodecMessage) {
        let (primary, _, info) = self.snapshot();
        if let Some(p) = primary {
            (p.on_message)(&info, &message);
        }
    }
}
