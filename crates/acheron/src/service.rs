//! Public operation surface: validate arguments, resolve a task through the
//! registry, perform the state-checked operation, release the reference.

use tracing::{debug, error, info};

use acheron_core::prelude::*;
use acheron_engine::{EngineFactory, loopback_factory};

use crate::config::{ConfigKind, ConfigValue};
use crate::context::{self, MediaContext, StartupParams};
use crate::registry::{TaskRef, TaskRegistry};
use crate::task::{CodecCallback, PrimaryCallbacks, TaskStatus};

/// Session manager for hardware media encode/decode engines.
///
/// One service instance owns the process-wide task registry and the engine
/// factory. Every operation resolves its task by context identity, holds a
/// counted reference for the call's duration, and releases it on every exit
/// path.
///
/// # Example
/// ```rust
/// use acheron::prelude::*;
///
/// let service = MediaService::new();
/// let mut ctx = MediaService::default_context(CodecId::H265, Direction::Encoder);
/// service.initialize(&mut ctx)?;
/// assert_eq!(service.state(&ctx)?, CodecState::Initialized);
/// service.release(&ctx)?;
/// # Ok::<(), acheron::MediaError>(())
/// ```
pub struct MediaService {
    registry: TaskRegistry,
    engines: EngineFactory,
    #[cfg(feature = "audio")]
    audio: crate::audio::AudioRegistry,
}

impl Default for MediaService {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaService {
    /// Service backed by the software loopback engine.
    pub fn new() -> Self {
        Self::with_engine_factory(loopback_factory())
    }

    /// Service backed by a caller-supplied engine factory.
    pub fn with_engine_factory(engines: EngineFactory) -> Self {
        Self {
            registry: TaskRegistry::new(),
            engines,
            #[cfg(feature = "audio")]
            audio: crate::audio::AudioRegistry::new(),
        }
    }

    /// Context pre-filled with the default parameter block for the codec
    /// kind and role.
    pub fn default_context(codec_id: CodecId, direction: Direction) -> MediaContext {
        context::default_context(codec_id, direction)
    }

    #[cfg(feature = "audio")]
    pub(crate) fn audio_registry(&self) -> &crate::audio::AudioRegistry {
        &self.audio
    }

    fn resolve(&self, ctx: &MediaContext) -> Result<TaskRef, MediaError> {
        self.registry.lookup(ctx).map_err(|err| {
            let err: MediaError = err.into();
            debug!(code = err.code(), "failed to resolve codec task");
            err
        })
    }

    /// Create the task for this identity (or succeed as a no-op when it
    /// already exists) and write the assigned instance index back into the
    /// context.
    pub fn initialize(&self, ctx: &mut MediaContext) -> Result<(), MediaError> {
        let (task, fresh) = self.registry.create_or_get(ctx).map_err(|err| {
            error!(code = err.code(), codec = ?ctx.codec_id, "initialize failed");
            err
        })?;
        if fresh {
            task.initialize()?;
            ctx.instance_index = Some(task.instance());
            info!(
                instance = task.instance(),
                codec = ?ctx.codec_id,
                encoder = ctx.direction.is_encoder(),
                "media codec initialized"
            );
        } else {
            // Re-initialize for the same identity is an idempotent success.
            debug!(instance = task.instance(), "codec task already initialized");
        }
        Ok(())
    }

    /// Register the complete primary callback set. All three callbacks must
    /// be present.
    pub fn set_callback(
        &self,
        ctx: &MediaContext,
        callback: CodecCallback,
        user_tag: u64,
    ) -> Result<(), MediaError> {
        let (Some(on_input), Some(on_output), Some(on_message)) = (
            callback.on_input_available,
            callback.on_output_available,
            callback.on_message,
        ) else {
            return Err(MediaError::InvalidParams(
                "primary callback set must be complete",
            ));
        };
        let task = self.resolve(ctx)?;
        task.install_primary(
            PrimaryCallbacks {
                on_input_available: on_input,
                on_output_available: on_output,
                on_message,
            },
            user_tag,
        );
        Ok(())
    }

    /// Register the vestigial raw stream-buffer listener. Supplying primary
    /// callbacks alongside it is accepted and logged, never an error.
    pub fn set_stream_buffer_listener(
        &self,
        ctx: &MediaContext,
        callback: CodecCallback,
        user_tag: u64,
    ) -> Result<(), MediaError> {
        let Some(listener) = callback.on_stream_buffer else {
            return Err(MediaError::InvalidParams(
                "stream buffer callback is required",
            ));
        };
        if callback.on_input_available.is_some()
            || callback.on_output_available.is_some()
            || callback.on_message.is_some()
        {
            info!("primary callbacks are ignored by the stream buffer listener interface");
        }
        let task = self.resolve(ctx)?;
        task.install_stream_listener(listener, user_tag);
        Ok(())
    }

    /// Validate the full parameter set and move the task to `CONFIGURED`.
    pub fn configure(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.configure(ctx)
    }

    /// Start a configured task, or resume a paused one.
    pub fn start(&self, ctx: &MediaContext, startup: &StartupParams) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.start(startup, &self.engines)
    }

    /// `RUNNING|PAUSED → STOPPED`, waking blocked waiters with `Stopped`.
    pub fn stop(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.stop()
    }

    /// `RUNNING → PAUSED`; buffers already queued are preserved.
    pub fn pause(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.pause()
    }

    /// Discard queued-but-unconsumed buffers and wake blocked waiters with
    /// `Flushed`.
    pub fn flush(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.flush()
    }

    /// Release the task. The registry entry is finalized once the last
    /// outstanding reference drops.
    pub fn release(&self, ctx: &MediaContext) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.release()
    }

    /// Lifecycle state; a context with no live task reports `Uninitialized`
    /// rather than an error.
    pub fn state(&self, ctx: &MediaContext) -> Result<CodecState, MediaError> {
        match self.registry.lookup(ctx) {
            Ok(task) => Ok(task.lifecycle()),
            Err(err) if err.task_absent() => Ok(CodecState::Uninitialized),
            Err(err) => Err(err.into()),
        }
    }

    /// Counter and queue-depth snapshot for a live task.
    pub fn status(&self, ctx: &MediaContext) -> Result<TaskStatus, MediaError> {
        let task = self.resolve(ctx)?;
        Ok(task.status())
    }

    /// Store a caller-owned status word on the task.
    pub fn set_status(&self, ctx: &MediaContext, flags: u32) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.set_user_flags(flags);
        Ok(())
    }

    /// Obtain an empty input buffer to fill.
    pub fn dequeue_input_buffer(
        &self,
        ctx: &MediaContext,
        wait: Wait,
    ) -> Result<DequeueOutcome<MediaBuffer>, MediaError> {
        let task = self.resolve(ctx)?;
        task.dequeue_input(wait)
    }

    /// Submit a filled input buffer; `frame_end` marks end-of-stream.
    pub fn queue_input_buffer(
        &self,
        ctx: &MediaContext,
        buffer: MediaBuffer,
        wait: Wait,
    ) -> Result<QueueOutcome<MediaBuffer>, MediaError> {
        let task = self.resolve(ctx)?;
        task.queue_input(buffer, wait)
    }

    /// Receive the next produced output buffer and its metadata; a buffer
    /// with `stream_end` is the final deliverable for this run.
    pub fn dequeue_output_buffer(
        &self,
        ctx: &MediaContext,
        wait: Wait,
    ) -> Result<DequeueOutcome<(MediaBuffer, OutputBufferInfo)>, MediaError> {
        let task = self.resolve(ctx)?;
        task.dequeue_output(wait)
    }

    /// Return a consumed output buffer to the engine's pool.
    pub fn queue_output_buffer(
        &self,
        ctx: &MediaContext,
        buffer: MediaBuffer,
        wait: Wait,
    ) -> Result<QueueOutcome<MediaBuffer>, MediaError> {
        let task = self.resolve(ctx)?;
        task.queue_output(buffer, wait)
    }

    /// Claim the next user-data blob recovered from the stream.
    pub fn user_data(
        &self,
        ctx: &MediaContext,
        wait: Wait,
    ) -> Result<DequeueOutcome<UserData>, MediaError> {
        let task = self.resolve(ctx)?;
        task.user_data(wait)
    }

    /// Hand a claimed user-data blob back. Ownership already moved with the
    /// claim; this validates the context and completes the round trip.
    pub fn release_user_data(
        &self,
        ctx: &MediaContext,
        _data: UserData,
    ) -> Result<(), MediaError> {
        let _task = self.resolve(ctx)?;
        Ok(())
    }

    /// Generic config read; for a context with no live task this returns the
    /// structural default when the kind is universally defaultable for the
    /// identity.
    pub fn get_config(
        &self,
        ctx: &MediaContext,
        kind: ConfigKind,
    ) -> Result<ConfigValue, MediaError> {
        self.get_config_indexed(ctx, kind, None)
    }

    pub(crate) fn get_config_indexed(
        &self,
        ctx: &MediaContext,
        kind: ConfigKind,
        arg: Option<u32>,
    ) -> Result<ConfigValue, MediaError> {
        match self.registry.lookup(ctx) {
            Ok(task) => task.get_config(kind, ctx, arg),
            Err(err) if err.task_absent() => crate::config::default_value(kind, ctx, arg),
            Err(err) => Err(err.into()),
        }
    }

    /// Generic config write; always requires a live, compatible task.
    pub fn set_config(&self, ctx: &MediaContext, value: ConfigValue) -> Result<(), MediaError> {
        let task = self.resolve(ctx)?;
        task.set_config(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigKind;
    use acheron_engine::{Engine, EngineConfig, EngineError, EngineIo};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    fn small_enc_ctx(codec: CodecId) -> MediaContext {
        let mut ctx = MediaService::default_context(codec, Direction::Encoder);
        let p = ctx.video_enc_params_mut().expect("enc params");
        p.width = 64;
        p.height = 64;
        p.frame_buf_count = 3;
        p.bitstream_buf_count = 3;
        ctx
    }

    fn running_session(service: &MediaService, codec: CodecId) -> MediaContext {
        let mut ctx = small_enc_ctx(codec);
        service.initialize(&mut ctx).expect("initialize");
        service.configure(&ctx).expect("configure");
        service
            .start(&ctx, &StartupParams::default())
            .expect("start");
        ctx
    }

    #[test]
    fn state_before_initialize_is_uninitialized_not_an_error() {
        let service = MediaService::new();
        let ctx = MediaService::default_context(CodecId::H264, Direction::Encoder);
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Uninitialized);
    }

    #[test]
    fn initialize_is_idempotent_for_the_same_identity() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H265);
        service.initialize(&mut ctx).expect("first initialize");
        let index = ctx.instance_index;
        service.initialize(&mut ctx).expect("re-initialize");
        assert_eq!(ctx.instance_index, index, "index must be stable");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Initialized);
        service.release(&ctx).expect("release");
    }

    #[test]
    fn initialize_rejects_identity_mismatch_at_the_same_instance() {
        let service = MediaService::new();
        let mut h264 = small_enc_ctx(CodecId::H264);
        service.initialize(&mut h264).expect("initialize");

        let mut imposter = small_enc_ctx(CodecId::H265);
        imposter.instance_index = h264.instance_index;
        let err = service.initialize(&mut imposter).unwrap_err();
        assert_eq!(err.code(), "wrong_app_type");
        service.release(&h264).expect("release");
    }

    #[test]
    fn audio_identities_are_delegated_to_the_audio_subsystem() {
        let service = MediaService::new();
        let mut ctx = MediaService::default_context(CodecId::Aac, Direction::Encoder);
        assert_eq!(
            service.initialize(&mut ctx).unwrap_err(),
            MediaError::CodecNotFound
        );
    }

    #[test]
    fn operations_out_of_order_fail_without_side_effects() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H265);
        service.initialize(&mut ctx).expect("initialize");

        // start before configure
        let err = service.start(&ctx, &StartupParams::default()).unwrap_err();
        assert_eq!(err.code(), "wrong_state");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Initialized);

        // stop before start
        assert_eq!(service.stop(&ctx).unwrap_err().code(), "wrong_state");

        // queue before start
        let err = service
            .queue_input_buffer(&ctx, MediaBuffer::with_capacity(8), Wait::NonBlocking)
            .unwrap_err();
        assert_eq!(err.code(), "wrong_state");

        service.configure(&ctx).expect("configure");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Configured);

        // configure twice is not legal
        assert_eq!(service.configure(&ctx).unwrap_err().code(), "wrong_state");

        // release from CONFIGURED with nothing ever queued is legal
        service.release(&ctx).expect("release");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Uninitialized);
    }

    #[test]
    fn release_from_running_is_rejected() {
        let service = MediaService::new();
        let ctx = running_session(&service, CodecId::H264);
        let err = service.release(&ctx).unwrap_err();
        assert_eq!(err.code(), "wrong_state");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Running);
        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn configure_failure_leaves_state_unchanged() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H265);
        service.initialize(&mut ctx).expect("initialize");
        ctx.video_enc_params_mut().expect("params").width = 7;
        assert_eq!(service.configure(&ctx).unwrap_err().code(), "invalid_params");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Initialized);
        service.release(&ctx).expect("release");
    }

    #[test]
    fn dequeue_input_times_out_within_slack_on_an_exhausted_queue() {
        let service = MediaService::new();
        let ctx = running_session(&service, CodecId::H264);
        // Drain the free-input queue completely.
        let mut held = Vec::new();
        while let DequeueOutcome::Ready(buf) = service
            .dequeue_input_buffer(&ctx, Wait::NonBlocking)
            .expect("dequeue")
        {
            held.push(buf);
        }
        let start = Instant::now();
        let outcome = service
            .dequeue_input_buffer(&ctx, Wait::from_millis(100))
            .expect("dequeue");
        let elapsed = start.elapsed();
        assert!(matches!(outcome, DequeueOutcome::TimedOut));
        assert!(elapsed >= Duration::from_millis(80), "too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "too late: {elapsed:?}");
        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn flush_wakes_a_blocked_output_dequeue_with_flushed() {
        let service = Arc::new(MediaService::new());
        let ctx = running_session(&service, CodecId::H265);
        let waiter = {
            let service = service.clone();
            let ctx = ctx.clone();
            thread::spawn(move || service.dequeue_output_buffer(&ctx, Wait::from_millis(5000)))
        };
        thread::sleep(Duration::from_millis(50));
        service.flush(&ctx).expect("flush");
        let outcome = waiter.join().expect("waiter").expect("dequeue");
        assert!(matches!(outcome, DequeueOutcome::Flushed));
        // A second flush with nothing queued is a no-op success.
        service.flush(&ctx).expect("second flush");
        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn stop_wakes_a_blocked_output_dequeue_with_stopped() {
        let service = Arc::new(MediaService::new());
        let ctx = running_session(&service, CodecId::H265);
        let waiter = {
            let service = service.clone();
            let ctx = ctx.clone();
            thread::spawn(move || service.dequeue_output_buffer(&ctx, Wait::Forever))
        };
        thread::sleep(Duration::from_millis(50));
        service.stop(&ctx).expect("stop");
        let outcome = waiter.join().expect("waiter").expect("dequeue");
        assert!(matches!(outcome, DequeueOutcome::Stopped));
        service.release(&ctx).expect("release");
    }

    #[test]
    fn input_after_frame_end_is_rejected_until_next_start() {
        let service = MediaService::new();
        let ctx = running_session(&service, CodecId::H264);

        let mut eos = service
            .dequeue_input_buffer(&ctx, Wait::from_millis(500))
            .expect("dequeue")
            .into_ready()
            .expect("input buffer");
        eos.frame_end = true;
        assert!(
            service
                .queue_input_buffer(&ctx, eos, Wait::from_millis(500))
                .expect("queue")
                .is_queued()
        );

        let err = service
            .queue_input_buffer(&ctx, MediaBuffer::with_capacity(8), Wait::NonBlocking)
            .unwrap_err();
        assert_eq!(err.code(), "input_drained");

        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn pause_preserves_queued_input_and_resume_drains_it() {
        let service = MediaService::new();
        let ctx = running_session(&service, CodecId::H264);
        service.pause(&ctx).expect("pause");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Paused);

        let mut buf = service
            .dequeue_input_buffer(&ctx, Wait::from_millis(500))
            .expect("dequeue")
            .into_ready()
            .expect("input buffer");
        buf.frame_end = true;
        assert!(
            service
                .queue_input_buffer(&ctx, buf, Wait::from_millis(500))
                .expect("queue")
                .is_queued()
        );
        thread::sleep(Duration::from_millis(60));
        assert_eq!(
            service.status(&ctx).expect("status").input_pending,
            1,
            "paused engine must not consume"
        );

        service
            .start(&ctx, &StartupParams::default())
            .expect("resume");
        let (out, _) = loop {
            match service
                .dequeue_output_buffer(&ctx, Wait::from_millis(2000))
                .expect("dequeue output")
            {
                DequeueOutcome::Ready(pair) => break pair,
                DequeueOutcome::TimedOut => continue,
                other => panic!("unexpected outcome {other:?}"),
            }
        };
        assert!(out.stream_end);
        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn set_status_round_trips_through_the_status_snapshot() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H264);
        service.initialize(&mut ctx).expect("initialize");
        assert_eq!(service.status(&ctx).expect("status").user_flags, 0);
        service.set_status(&ctx, 0x5A).expect("set status");
        assert_eq!(service.status(&ctx).expect("status").user_flags, 0x5A);
        service.release(&ctx).expect("release");

        // Status needs a live task; state does not.
        assert_eq!(service.status(&ctx).unwrap_err().code(), "task_not_exist");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Uninitialized);
    }

    #[test]
    fn callbacks_must_be_registered_complete() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H264);
        service.initialize(&mut ctx).expect("initialize");

        let partial = CodecCallback {
            on_input_available: Some(Arc::new(|_| {})),
            ..CodecCallback::default()
        };
        assert_eq!(
            service.set_callback(&ctx, partial, 0).unwrap_err().code(),
            "invalid_params"
        );

        let complete = CodecCallback {
            on_input_available: Some(Arc::new(|_| {})),
            on_output_available: Some(Arc::new(|_| {})),
            on_message: Some(Arc::new(|_, _| {})),
            on_stream_buffer: None,
        };
        service.set_callback(&ctx, complete, 7).expect("set callback");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn callbacks_fire_on_engine_completions() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H264);
        service.initialize(&mut ctx).expect("initialize");

        let inputs = Arc::new(AtomicU64::new(0));
        let outputs = Arc::new(AtomicU64::new(0));
        let tags = Arc::new(AtomicU64::new(0));
        let callback = CodecCallback {
            on_input_available: Some({
                let inputs = inputs.clone();
                let tags = tags.clone();
                Arc::new(move |info| {
                    inputs.fetch_add(1, Ordering::Relaxed);
                    tags.store(info.user_tag, Ordering::Relaxed);
                })
            }),
            on_output_available: Some({
                let outputs = outputs.clone();
                Arc::new(move |_| {
                    outputs.fetch_add(1, Ordering::Relaxed);
                })
            }),
            on_message: Some(Arc::new(|_, _| {})),
            on_stream_buffer: None,
        };
        service.set_callback(&ctx, callback, 0xC0DEC).expect("set callback");
        service.configure(&ctx).expect("configure");
        service
            .start(&ctx, &StartupParams::default())
            .expect("start");

        let mut buf = service
            .dequeue_input_buffer(&ctx, Wait::from_millis(500))
            .expect("dequeue")
            .into_ready()
            .expect("input buffer");
        buf.frame_end = true;
        service
            .queue_input_buffer(&ctx, buf, Wait::from_millis(500))
            .expect("queue");

        loop {
            match service
                .dequeue_output_buffer(&ctx, Wait::from_millis(2000))
                .expect("dequeue output")
            {
                DequeueOutcome::Ready((out, _)) if out.stream_end => break,
                DequeueOutcome::Ready(_) | DequeueOutcome::TimedOut => continue,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(inputs.load(Ordering::Relaxed), 1);
        assert_eq!(outputs.load(Ordering::Relaxed), 1);
        assert_eq!(tags.load(Ordering::Relaxed), 0xC0DEC);

        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    #[test]
    fn generic_config_reads_defaults_without_a_task() {
        let service = MediaService::new();
        let ctx = MediaService::default_context(CodecId::H265, Direction::Encoder);
        assert!(matches!(
            service.get_config(&ctx, ConfigKind::Sao).expect("default"),
            ConfigValue::Sao(_)
        ));
        // Writes always require a live task.
        let err = service
            .set_config(&ctx, ConfigValue::Sao(SaoParams::default()))
            .unwrap_err();
        assert_eq!(err.code(), "task_not_exist");
    }

    #[test]
    fn config_round_trips_on_a_live_task() {
        let service = MediaService::new();
        let mut ctx = small_enc_ctx(CodecId::H265);
        service.initialize(&mut ctx).expect("initialize");
        service.configure(&ctx).expect("configure");

        let mut rc = match service
            .get_config(&ctx, ConfigKind::RateControl)
            .expect("get")
        {
            ConfigValue::RateControl(p) => p,
            other => panic!("unexpected value {other:?}"),
        };
        rc.bit_rate = 4321;
        service
            .set_config(&ctx, ConfigValue::RateControl(rc.clone()))
            .expect("set");
        assert_eq!(
            service.get_config(&ctx, ConfigKind::RateControl).expect("get"),
            ConfigValue::RateControl(rc)
        );
        service.release(&ctx).expect("release");
    }

    #[test]
    fn user_data_round_trips_through_the_engine() {
        let service = MediaService::new();
        let ctx = running_session(&service, CodecId::H264);
        service
            .set_config(
                &ctx,
                ConfigValue::InsertUserData(UserData::new(vec![1, 2, 3])),
            )
            .expect("insert");

        let mut buf = service
            .dequeue_input_buffer(&ctx, Wait::from_millis(500))
            .expect("dequeue")
            .into_ready()
            .expect("input buffer");
        buf.frame_end = true;
        service
            .queue_input_buffer(&ctx, buf, Wait::from_millis(500))
            .expect("queue");

        let data = service
            .user_data(&ctx, Wait::from_millis(2000))
            .expect("user data")
            .into_ready()
            .expect("blob");
        assert_eq!(data.data, vec![1, 2, 3]);
        service.release_user_data(&ctx, data).expect("release blob");

        service.stop(&ctx).expect("stop");
        service.release(&ctx).expect("release");
    }

    /// Engine whose stop always fails; release must still tear down.
    struct FaultyEngine {
        inner: acheron_engine::LoopbackEngine,
    }

    impl Engine for FaultyEngine {
        fn name(&self) -> &'static str {
            "faulty"
        }

        fn start(&mut self, config: &EngineConfig, io: EngineIo) -> Result<(), EngineError> {
            self.inner.start(config, io)
        }

        fn flush(&mut self) -> Result<(), EngineError> {
            Err(EngineError::Backend("flush rejected".into()))
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            let _ = self.inner.stop();
            Err(EngineError::Backend("stop rejected".into()))
        }
    }

    #[test]
    fn backend_failures_during_teardown_do_not_strand_the_task() {
        let service = MediaService::with_engine_factory(Arc::new(|_| {
            Box::new(FaultyEngine {
                inner: acheron_engine::LoopbackEngine::new(),
            }) as Box<dyn Engine>
        }));
        let ctx = running_session(&service, CodecId::H264);
        service.flush(&ctx).expect("flush is best-effort");
        service.stop(&ctx).expect("stop is best-effort");
        service.release(&ctx).expect("release");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Uninitialized);
    }

    #[test]
    fn h265_encode_session_drains_to_stream_end() {
        let service = MediaService::new();
        let mut ctx = MediaService::default_context(CodecId::H265, Direction::Encoder);
        {
            let p = ctx.video_enc_params_mut().expect("enc params");
            p.width = 1920;
            p.height = 1080;
            p.frame_buf_count = 5;
            p.bitstream_buf_count = 5;
            p.rc.bit_rate = 8000;
            p.rc.frame_rate = 30;
            p.rc.intra_period = 30;
        }
        service.initialize(&mut ctx).expect("initialize");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Initialized);
        service.configure(&ctx).expect("configure");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Configured);
        service
            .start(&ctx, &StartupParams::default())
            .expect("start");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Running);

        // Feed frames until the "file" runs dry, then mark frame_end.
        let total_frames = 4u64;
        let mut submitted = 0u64;
        while submitted <= total_frames {
            let mut buf = match service
                .dequeue_input_buffer(&ctx, Wait::from_millis(100))
                .expect("dequeue input")
            {
                DequeueOutcome::Ready(buf) => buf,
                DequeueOutcome::TimedOut => continue,
                other => panic!("unexpected outcome {other:?}"),
            };
            let fill = (submitted & 0xFF) as u8;
            buf.payload_mut().fill(fill);
            buf.timestamp = submitted * 33;
            if submitted == total_frames {
                buf.frame_end = true;
            }
            assert!(
                service
                    .queue_input_buffer(&ctx, buf, Wait::from_millis(100))
                    .expect("queue input")
                    .is_queued()
            );
            submitted += 1;
        }

        // Drain outputs until stream_end is observed.
        let mut produced = 0u64;
        loop {
            match service
                .dequeue_output_buffer(&ctx, Wait::from_millis(3000))
                .expect("dequeue output")
            {
                DequeueOutcome::Ready((out, info)) => {
                    assert_eq!(info.sequence, produced);
                    assert_eq!(out.len(), 1920 * 1080 * 3 / 2);
                    produced += 1;
                    let ends = out.stream_end;
                    assert!(
                        service
                            .queue_output_buffer(&ctx, out, Wait::from_millis(100))
                            .expect("queue output")
                            .is_queued()
                    );
                    if ends {
                        break;
                    }
                }
                DequeueOutcome::TimedOut => continue,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(produced, total_frames + 1);

        let status = service.status(&ctx).expect("status");
        assert_eq!(status.frames_submitted, total_frames + 1);
        assert_eq!(status.frames_produced, total_frames + 1);
        assert!(status.input_drained);

        service.stop(&ctx).expect("stop");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Stopped);
        service.release(&ctx).expect("release");
        assert_eq!(service.state(&ctx).expect("state"), CodecState::Uninitialized);
    }
}
