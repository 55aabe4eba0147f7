//! Process-wide locked task registry with guard-based reference counting.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use acheron_core::prelude::*;

use crate::context::MediaContext;
use crate::task::Task;

const MAX_VIDEO_INSTANCES: u32 = 32;
const MAX_JPEG_INSTANCES: u32 = 64;

fn instance_cap(app_type: AppType) -> u32 {
    match app_type {
        AppType::Video => MAX_VIDEO_INSTANCES,
        AppType::Jpeg => MAX_JPEG_INSTANCES,
        AppType::Audio => 0,
    }
}

type TaskKey = (AppType, u32);

struct RegistryShared {
    tasks: Mutex<HashMap<TaskKey, Arc<Task>>>,
}

/// Registry mapping a codec identity to at most one live task per instance
/// index.
///
/// The lock guards only the structural steps (lookup, insert, remove) and is
/// never held across a blocking buffer operation. Every successful lookup
/// hands out a [`TaskRef`] whose drop releases the reference (including on
/// error paths), so a task stays alive across the window between "found it"
/// and "used it" even if another thread concurrently releases the codec.
pub(crate) struct TaskRegistry {
    shared: Arc<RegistryShared>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolve the task addressed by the context, incrementing its reference
    /// count on success.
    pub fn lookup(&self, ctx: &MediaContext) -> Result<TaskRef, LookupError> {
        let identity = ctx.identity();
        let index = ctx.instance_index.ok_or(LookupError::NotExist)?;
        let cap = instance_cap(identity.app_type());
        if index >= cap {
            return Err(LookupError::WrongInstance(index));
        }
        let tasks = self.shared.tasks.lock();
        let task = tasks
            .get(&(identity.app_type(), index))
            .ok_or(LookupError::NotExist)?;
        if task.is_released() {
            // Released entries linger until their last reference drops but
            // are invisible to lookups.
            return Err(LookupError::NotExist);
        }
        if task.identity() != identity {
            return Err(LookupError::WrongAppType {
                requested: identity,
                actual: task.identity(),
            });
        }
        task.inc_ref();
        Ok(TaskRef {
            task: task.clone(),
            shared: self.shared.clone(),
        })
    }

    /// Resolve an existing task or create a fresh one at the lowest free
    /// instance index for the identity's app type.
    pub fn create_or_get(&self, ctx: &MediaContext) -> Result<(TaskRef, bool), MediaError> {
        match self.lookup(ctx) {
            Ok(task) => return Ok((task, false)),
            Err(LookupError::NotExist) => {}
            Err(err) => return Err(err.into()),
        }
        let identity = ctx.identity();
        if identity.app_type() == AppType::Audio {
            // Audio codecs go through the audio subsystem registration path.
            return Err(MediaError::CodecNotFound);
        }
        let cap = instance_cap(identity.app_type());
        let mut tasks = self.shared.tasks.lock();
        let index = (0..cap)
            .find(|i| !tasks.contains_key(&(identity.app_type(), *i)))
            .ok_or(MediaError::InsufficientResources(
                "no free codec instance slot",
            ))?;
        let task = Arc::new(Task::new(identity, index));
        task.inc_ref();
        tasks.insert((identity.app_type(), index), task.clone());
        info!(instance = index, identity = ?identity, "codec task created");
        Ok((
            TaskRef {
                task,
                shared: self.shared.clone(),
            },
            true,
        ))
    }

    /// Defensive removal: fails while any reference other than the caller's
    /// own guard is outstanding, or when the task is not present. The normal
    /// teardown path is deferred finalization on last-guard drop.
    #[allow(dead_code)]
    pub fn remove(&self, task: &TaskRef) -> Result<(), MediaError> {
        let mut tasks = self.shared.tasks.lock();
        let key = (task.identity().app_type(), task.instance());
        match tasks.get(&key) {
            Some(existing) if Arc::ptr_eq(existing, &task.task) => {
                let refs = task.task.refs();
                if refs > 1 {
                    return Err(MediaError::OperationNotAllowed(NotAllowed::TaskBusy {
                        refs: refs - 1,
                    }));
                }
                tasks.remove(&key);
                Ok(())
            }
            _ => Err(MediaError::InvalidParams(
                "task is not present in the registry",
            )),
        }
    }

    #[cfg(test)]
    pub fn live_tasks(&self) -> usize {
        self.shared.tasks.lock().len()
    }
}

/// Scope-bound counted reference to a task.
///
/// Dropping the guard releases the reference; the last guard dropped on a
/// released task finalizes its registry entry, which is what frees the
/// instance index for reuse.
pub(crate) struct TaskRef {
    task: Arc<Task>,
    shared: Arc<RegistryShared>,
}

impl Deref for TaskRef {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

impl std::fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRef")
            .field("identity", &self.task.identity())
            .field("instance", &self.task.instance())
            .finish()
    }
}

impl Drop for TaskRef {
    fn drop(&mut self) {
        if self.task.dec_ref() == 0 && self.task.is_released() {
            let mut tasks = self.shared.tasks.lock();
            let key = (self.task.identity().app_type(), self.task.instance());
            if let Some(existing) = tasks.get(&key)
                && Arc::ptr_eq(existing, &self.task)
                && self.task.refs() == 0
            {
                tasks.remove(&key);
                debug!(instance = self.task.instance(), "codec task finalized");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::default_context;
    use std::thread;
    use std::time::Duration;

    fn enc_ctx(codec: CodecId) -> MediaContext {
        default_context(codec, Direction::Encoder)
    }

    fn create(registry: &TaskRegistry, ctx: &mut MediaContext) {
        let (task, fresh) = registry.create_or_get(ctx).expect("create");
        assert!(fresh);
        task.initialize().expect("initialize");
        ctx.instance_index = Some(task.instance());
    }

    #[test]
    fn create_assigns_lowest_free_index() {
        let registry = TaskRegistry::new();
        let mut a = enc_ctx(CodecId::H264);
        let mut b = enc_ctx(CodecId::H264);
        create(&registry, &mut a);
        create(&registry, &mut b);
        assert_eq!(a.instance_index, Some(0));
        assert_eq!(b.instance_index, Some(1));
    }

    #[test]
    fn lookup_before_create_reports_not_exist() {
        let registry = TaskRegistry::new();
        let ctx = enc_ctx(CodecId::H265);
        assert_eq!(registry.lookup(&ctx).unwrap_err(), LookupError::NotExist);
    }

    #[test]
    fn out_of_range_index_reports_wrong_instance() {
        let registry = TaskRegistry::new();
        let mut ctx = enc_ctx(CodecId::H265);
        ctx.instance_index = Some(MAX_VIDEO_INSTANCES);
        assert_eq!(
            registry.lookup(&ctx).unwrap_err(),
            LookupError::WrongInstance(MAX_VIDEO_INSTANCES)
        );
    }

    #[test]
    fn identity_mismatch_reports_wrong_app_type() {
        let registry = TaskRegistry::new();
        let mut h264 = enc_ctx(CodecId::H264);
        create(&registry, &mut h264);

        let mut h265 = enc_ctx(CodecId::H265);
        h265.instance_index = h264.instance_index;
        match registry.lookup(&h265).unwrap_err() {
            LookupError::WrongAppType { requested, actual } => {
                assert_eq!(requested.codec, CodecId::H265);
                assert_eq!(actual.codec, CodecId::H264);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn audio_identities_never_enter_the_registry() {
        let registry = TaskRegistry::new();
        let ctx = default_context(CodecId::Aac, Direction::Encoder);
        let err = registry.create_or_get(&ctx).unwrap_err();
        assert_eq!(err, MediaError::CodecNotFound);
    }

    #[test]
    fn released_index_is_not_reused_while_references_remain() {
        let registry = TaskRegistry::new();
        let mut ctx = enc_ctx(CodecId::H264);
        create(&registry, &mut ctx);

        let held = registry.lookup(&ctx).expect("extra reference");
        {
            let task = registry.lookup(&ctx).expect("releaser");
            task.release().expect("release");
        }
        // Entry lingers for `held`, so a fresh create must skip index 0.
        let mut next = enc_ctx(CodecId::H264);
        create(&registry, &mut next);
        assert_eq!(next.instance_index, Some(1));

        drop(held);
        assert_eq!(registry.live_tasks(), 1);
        let mut reused = enc_ctx(CodecId::H264);
        create(&registry, &mut reused);
        assert_eq!(reused.instance_index, Some(0));
    }

    #[test]
    fn lookup_after_release_reports_not_exist() {
        let registry = TaskRegistry::new();
        let mut ctx = enc_ctx(CodecId::H264);
        create(&registry, &mut ctx);
        registry.lookup(&ctx).expect("task").release().expect("release");
        assert_eq!(registry.lookup(&ctx).unwrap_err(), LookupError::NotExist);
        assert_eq!(registry.live_tasks(), 0);
    }

    #[test]
    fn remove_refuses_busy_tasks() {
        let registry = TaskRegistry::new();
        let mut ctx = enc_ctx(CodecId::H264);
        create(&registry, &mut ctx);
        let a = registry.lookup(&ctx).expect("a");
        let b = registry.lookup(&ctx).expect("b");
        let err = registry.remove(&a).unwrap_err();
        assert_eq!(err.code(), "task_busy");
        drop(b);
        registry.remove(&a).expect("remove with a single holder");
    }

    #[test]
    fn concurrent_release_waits_for_in_flight_references() {
        let registry = Arc::new(TaskRegistry::new());
        let mut ctx = enc_ctx(CodecId::H264);
        create(&registry, &mut ctx);

        let worker = {
            let registry = registry.clone();
            let ctx = ctx.clone();
            thread::spawn(move || {
                let task = registry.lookup(&ctx).expect("mid-call reference");
                // Simulate a call in progress while another thread releases.
                thread::sleep(Duration::from_millis(100));
                assert!(task.is_released());
                drop(task);
            })
        };
        thread::sleep(Duration::from_millis(30));
        registry
            .lookup(&ctx)
            .expect("releaser")
            .release()
            .expect("release");
        worker.join().expect("worker");
        assert_eq!(registry.live_tasks(), 0, "finalized after last reference");
    }
}
