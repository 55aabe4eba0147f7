//! Software loopback engine: consumes input in queue order and echoes
//! payloads back as "bitstream" output with faithful session semantics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use acheron_core::prelude::*;

use crate::{Engine, EngineConfig, EngineError, EngineIo};

const IDLE_POLL: Duration = Duration::from_millis(5);
const CREDIT_POLL: Duration = Duration::from_millis(1);

/// Software stand-in for the hardware codec pipeline.
///
/// One worker thread per run. Input buffers are claimed in queue order and
/// recycled to the free queue once consumed; outputs appear in completion
/// order, gated by the output credits the caller returns. The input buffer
/// carrying `frame_end` produces the output carrying `stream_end`.
pub struct LoopbackEngine {
    worker: Option<thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            worker: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for LoopbackEngine {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn start(&mut self, config: &EngineConfig, io: EngineIo) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        self.stop = Arc::new(AtomicBool::new(false));
        let stop = self.stop.clone();
        let config = config.clone();
        let worker = thread::Builder::new()
            .name(format!("loopback-{}", config.instance))
            .spawn(move || run(config, io, stop))
            .map_err(|e| EngineError::Backend(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EngineError> {
        // Nothing is held beyond the buffer currently being copied.
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        let worker = self.worker.take().ok_or(EngineError::NotRunning)?;
        self.stop.store(true, Ordering::Release);
        if worker.join().is_err() {
            warn!("loopback worker panicked during stop");
            return Err(EngineError::Backend("worker panicked".into()));
        }
        Ok(())
    }
}

impl Drop for LoopbackEngine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.stop.store(true, Ordering::Release);
            let _ = worker.join();
        }
    }
}

fn run(config: EngineConfig, io: EngineIo, stop: Arc<AtomicBool>) {
    debug!(
        instance = config.instance,
        codec = ?config.identity.codec,
        "loopback worker started"
    );
    let mut produced: u64 = 0;
    let mut drained = false;
    'run: loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        if io.paused.load(Ordering::Acquire) {
            thread::sleep(CREDIT_POLL);
            continue;
        }
        let mut input = match io.pending_input.pop(Wait::Bounded(IDLE_POLL)) {
            DequeueOutcome::Ready(buf) => buf,
            DequeueOutcome::TimedOut | DequeueOutcome::Flushed => continue,
            DequeueOutcome::Stopped => break,
        };
        io.counters.inc_consumed();

        // Claim an output credit returned by the caller.
        let mut out = loop {
            match io.returned_output.pop() {
                Some(buf) => break buf,
                None => {
                    if stop.load(Ordering::Acquire) {
                        break 'run;
                    }
                    thread::sleep(CREDIT_POLL);
                }
            }
        };

        transcode(&input, &mut out, produced);
        produced += 1;
        let frame_limit = config.receive_frame_count as u64;
        let ends_stream =
            input.frame_end || (frame_limit > 0 && produced >= frame_limit);
        out.stream_end = ends_stream;

        // Round-trip any user data staged for insertion.
        if let Some(user_data) = io.pending_user_data.pop() {
            let _ = io.user_data_out.push(user_data, Wait::NonBlocking);
        }

        input.reset_for_reuse();
        if io.free_input.push(input, Wait::NonBlocking).is_queued() {
            io.observer.input_available();
        }

        // Capacity matches the credit pool, so this only fails across a
        // concurrent flush/stop, where dropping the output is correct.
        if io.ready_output.push(out, Wait::NonBlocking).is_queued() {
            io.counters.inc_produced();
            io.observer.output_available();
        }

        if ends_stream && !drained {
            drained = true;
            io.observer.message(CodecMessage::StreamDrained { frames: produced });
        }
    }
    debug!(
        instance = config.instance,
        frames = produced,
        "loopback worker exited"
    );
}

/// "Encode": concatenate the input planes into the output payload.
fn transcode(input: &MediaBuffer, out: &mut MediaBuffer, sequence: u64) {
    if out.planes.is_empty() {
        out.planes.push(Vec::new());
    }
    out.planes.truncate(1);
    let payload = &mut out.planes[0];
    payload.clear();
    for plane in &input.planes {
        payload.extend_from_slice(plane);
    }
    out.timestamp = input.timestamp;
    out.sequence = sequence;
    out.frame_end = false;
    out.stream_end = false;
    out.keyframe = sequence == 0;
}
