//! General-purpose priority task scheduler with tag-indexed completion.
//!
//! A fixed-size pool of worker threads drains a shared priority queue; lower
//! priority values run first, ties break in submission order. Completed
//! tracked tasks land in per-tag buckets that callers drain with
//! [`TaskScheduler::fetch_completed`], and every tracked completion also
//! records its tag-specific key so [`TaskScheduler::wait_for`] can block on
//! one exact unit of work.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::thread::JoinHandle;
use std::time::Duration;

use ember_utils::ChunkPos;
use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};

/// Classification of tracked tasks, used for result retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskTag {
    /// A chunk block-loading task.
    ChunkLoad,
    /// A chunk lighting task.
    ChunkLight,
}

/// Whether a task's completion is recorded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    /// Completion is recorded under the given tag.
    Tracked(TaskTag),
    /// Fire-and-forget: the task leaves no completion record.
    Hidden,
}

/// The typed result a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutput {
    /// The task acted on this chunk.
    Chunk(ChunkPos),
    /// The task produced no data.
    Empty,
}

/// A recorded completion.
///
/// `output == None` means the work failed (and was logged); callers must
/// treat that as "no data produced", never as a crash signal.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    /// The tag the task was submitted under.
    pub tag: TaskTag,
    /// The tag-specific key, when the submitter provided one.
    pub key: Option<ChunkPos>,
    /// The produced result, `None` on failure.
    pub output: Option<TaskOutput>,
}

type TaskFn = Box<dyn FnOnce() -> anyhow::Result<TaskOutput> + Send>;

struct QueuedTask {
    priority: i32,
    sequence: u64,
    class: TaskClass,
    key: Option<ChunkPos>,
    work: TaskFn,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedTask {}

// BinaryHeap is a max-heap; invert so the lowest (priority, sequence) pops first.
impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct SchedulerShared {
    queue: Mutex<BinaryHeap<QueuedTask>>,
    work_available: Condvar,
    completed: Mutex<FxHashMap<TaskTag, Vec<CompletedTask>>>,
    finished_keys: Mutex<FxHashSet<(TaskTag, ChunkPos)>>,
    shutdown: AtomicBool,
}

impl SchedulerShared {
    /// Runs one task and records its completion.
    fn execute(&self, task: QueuedTask) {
        let QueuedTask {
            class, key, work, ..
        } = task;

        let output = match catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(output)) => Some(output),
            Ok(Err(error)) => {
                log::error!("task {class:?} (key {key:?}) failed: {error:#}");
                None
            }
            Err(_) => {
                log::error!("task {class:?} (key {key:?}) panicked");
                None
            }
        };

        let TaskClass::Tracked(tag) = class else {
            return;
        };

        self.completed
            .lock()
            .entry(tag)
            .or_default()
            .push(CompletedTask { tag, key, output });

        if let Some(key) = key {
            self.finished_keys.lock().insert((tag, key));
        }
    }
}

/// The worker-pool task scheduler.
pub struct TaskScheduler {
    shared: Arc<SchedulerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_sequence: AtomicU64,
    inline: bool,
}

impl TaskScheduler {
    /// Poll granularity for [`Self::wait_for`].
    const WAIT_POLL: Duration = Duration::from_millis(1);

    /// Creates a scheduler with the given worker count.
    ///
    /// A count of `1` or less selects the single-threaded debug mode: no
    /// workers are spawned and submitted work executes inline on the calling
    /// thread.
    #[must_use]
    pub fn new(worker_threads: usize) -> Self {
        let shared = Arc::new(SchedulerShared {
            queue: Mutex::new(BinaryHeap::new()),
            work_available: Condvar::new(),
            completed: Mutex::new(FxHashMap::default()),
            finished_keys: Mutex::new(FxHashSet::default()),
            shutdown: AtomicBool::new(false),
        });

        let inline = worker_threads <= 1;
        let mut workers = Vec::new();

        if !inline {
            for worker_id in 0..worker_threads {
                let shared = Arc::clone(&shared);
                let handle = std::thread::Builder::new()
                    .name(format!("ember-worker-{worker_id}"))
                    .spawn(move || Self::worker_loop(&shared))
                    .unwrap_or_else(|error| panic!("failed to spawn worker: {error}"));
                workers.push(handle);
            }
        }

        Self {
            shared,
            workers: Mutex::new(workers),
            next_sequence: AtomicU64::new(0),
            inline,
        }
    }

    fn worker_loop(shared: &SchedulerShared) {
        loop {
            let task = {
                let mut queue = shared.queue.lock();
                loop {
                    if shared.shutdown.load(AtomicOrdering::Acquire) {
                        return;
                    }
                    if let Some(task) = queue.pop() {
                        break task;
                    }
                    // Blocks until submit or shutdown signals; a spurious
                    // wake just re-checks and re-blocks.
                    shared.work_available.wait(&mut queue);
                }
            };

            shared.execute(task);
        }
    }

    /// Enqueues a unit of work.
    ///
    /// Lower `priority` values run first; equal priorities run in submission
    /// order. Once shutdown has begun this is a silent no-op.
    pub fn submit<F>(&self, work: F, priority: i32, class: TaskClass, key: Option<ChunkPos>)
    where
        F: FnOnce() -> anyhow::Result<TaskOutput> + Send + 'static,
    {
        if self.shared.shutdown.load(AtomicOrdering::Acquire) {
            return;
        }

        // A new task claiming a tracked key invalidates the previous
        // generation's completion record, so wait_for and is_finished only
        // answer for the latest submission under that key.
        if let (TaskClass::Tracked(tag), Some(key)) = (class, key) {
            self.shared.finished_keys.lock().remove(&(tag, key));
            if let Some(bucket) = self.shared.completed.lock().get_mut(&tag) {
                bucket.retain(|completed| completed.key != Some(key));
            }
        }

        let task = QueuedTask {
            priority,
            sequence: self.next_sequence.fetch_add(1, AtomicOrdering::Relaxed),
            class,
            key,
            work: Box::new(work),
        };

        if self.inline {
            self.shared.execute(task);
            return;
        }

        self.shared.queue.lock().push(task);
        self.shared.work_available.notify_one();
    }

    /// Enqueues tracked work under a tag and key.
    pub fn submit_tracked<F>(&self, work: F, priority: i32, tag: TaskTag, key: ChunkPos)
    where
        F: FnOnce() -> anyhow::Result<TaskOutput> + Send + 'static,
    {
        self.submit(work, priority, TaskClass::Tracked(tag), Some(key));
    }

    /// Atomically removes and returns every recorded completion for `tag`.
    ///
    /// Completions under other tags are left untouched and are never
    /// returned here.
    #[must_use]
    pub fn fetch_completed(&self, tag: TaskTag) -> Vec<CompletedTask> {
        self.shared
            .completed
            .lock()
            .remove(&tag)
            .unwrap_or_default()
    }

    /// Blocks the calling thread until a completed task with this tag and
    /// key has been recorded, or the scheduler shuts down.
    ///
    /// Implemented as a sleep-poll loop with millisecond granularity. Must
    /// only be called from coordinator threads, never from a worker, and the
    /// caller is trusted to have actually submitted matching work.
    pub fn wait_for(&self, tag: TaskTag, key: ChunkPos) {
        loop {
            if self.shared.finished_keys.lock().contains(&(tag, key)) {
                return;
            }
            if self.shared.shutdown.load(AtomicOrdering::Acquire) {
                return;
            }
            std::thread::sleep(Self::WAIT_POLL);
        }
    }

    /// Checks whether a completion with this tag and key has been recorded.
    #[must_use]
    pub fn is_finished(&self, tag: TaskTag, key: ChunkPos) -> bool {
        self.shared.finished_keys.lock().contains(&(tag, key))
    }

    /// Begins shutdown: pending tasks are dropped, workers are woken and
    /// joined. Tasks already claimed by a worker run to completion. After
    /// this, [`Self::submit`] is a no-op.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, AtomicOrdering::AcqRel) {
            return;
        }

        let dropped = {
            let mut queue = self.shared.queue.lock();
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        if dropped > 0 {
            log::debug!("scheduler shutdown dropped {dropped} pending tasks");
        }

        self.shared.work_available.notify_all();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pos(x: i32, y: i32) -> ChunkPos {
        ChunkPos::new(x, y)
    }

    #[test]
    fn test_queue_ordering() {
        // Unit-level check of the heap ordering: lower priority value first,
        // FIFO for ties.
        let mut heap = BinaryHeap::new();
        for (priority, sequence) in [(5, 0), (1, 1), (5, 2), (0, 3)] {
            heap.push(QueuedTask {
                priority,
                sequence,
                class: TaskClass::Hidden,
                key: None,
                work: Box::new(|| Ok(TaskOutput::Empty)),
            });
        }

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|task| (task.priority, task.sequence))
            .collect();
        assert_eq!(order, vec![(0, 3), (1, 1), (5, 0), (5, 2)]);
    }

    #[test]
    fn test_tag_isolation() {
        let scheduler = TaskScheduler::new(4);

        scheduler.submit_tracked(
            || Ok(TaskOutput::Chunk(ChunkPos::new(0, 0))),
            0,
            TaskTag::ChunkLoad,
            pos(0, 0),
        );
        scheduler.submit_tracked(
            || Ok(TaskOutput::Chunk(ChunkPos::new(1, 0))),
            0,
            TaskTag::ChunkLight,
            pos(1, 0),
        );

        scheduler.wait_for(TaskTag::ChunkLoad, pos(0, 0));
        scheduler.wait_for(TaskTag::ChunkLight, pos(1, 0));

        let loads = scheduler.fetch_completed(TaskTag::ChunkLoad);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].tag, TaskTag::ChunkLoad);

        let lights = scheduler.fetch_completed(TaskTag::ChunkLight);
        assert_eq!(lights.len(), 1);

        // Both buckets drained.
        assert!(scheduler.fetch_completed(TaskTag::ChunkLoad).is_empty());
    }

    #[test]
    fn test_failed_task_records_empty_result() {
        let scheduler = TaskScheduler::new(2);

        scheduler.submit_tracked(
            || Err(anyhow::anyhow!("missing work target")),
            0,
            TaskTag::ChunkLoad,
            pos(3, 3),
        );
        scheduler.wait_for(TaskTag::ChunkLoad, pos(3, 3));

        let completed = scheduler.fetch_completed(TaskTag::ChunkLoad);
        assert_eq!(completed.len(), 1);
        assert!(completed[0].output.is_none());
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let scheduler = TaskScheduler::new(2);

        scheduler.submit_tracked(|| panic!("boom"), 0, TaskTag::ChunkLoad, pos(0, 0));
        scheduler.wait_for(TaskTag::ChunkLoad, pos(0, 0));

        // The pool still makes progress afterwards.
        scheduler.submit_tracked(|| Ok(TaskOutput::Empty), 0, TaskTag::ChunkLoad, pos(1, 1));
        scheduler.wait_for(TaskTag::ChunkLoad, pos(1, 1));

        let completed = scheduler.fetch_completed(TaskTag::ChunkLoad);
        assert_eq!(completed.len(), 2);
    }

    #[test]
    fn test_inline_mode_runs_at_submission() {
        let scheduler = TaskScheduler::new(1);
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        scheduler.submit_tracked(
            move || {
                flag.store(true, AtomicOrdering::Release);
                Ok(TaskOutput::Empty)
            },
            0,
            TaskTag::ChunkLoad,
            pos(0, 0),
        );

        // Inline mode completes before submit returns.
        assert!(ran.load(AtomicOrdering::Acquire));
        assert!(scheduler.is_finished(TaskTag::ChunkLoad, pos(0, 0)));
    }

    #[test]
    fn test_submit_after_shutdown_is_noop() {
        let scheduler = TaskScheduler::new(2);
        scheduler.shutdown();

        scheduler.submit_tracked(|| Ok(TaskOutput::Empty), 0, TaskTag::ChunkLoad, pos(0, 0));
        assert!(scheduler.fetch_completed(TaskTag::ChunkLoad).is_empty());
        assert!(!scheduler.is_finished(TaskTag::ChunkLoad, pos(0, 0)));
    }

    #[test]
    fn test_resubmitted_key_discards_stale_completion() {
        let scheduler = TaskScheduler::new(1);

        scheduler.submit_tracked(|| Ok(TaskOutput::Empty), 0, TaskTag::ChunkLoad, pos(2, 2));
        assert!(scheduler.is_finished(TaskTag::ChunkLoad, pos(2, 2)));

        // Same key again, first completion never fetched: only the new
        // generation's record survives.
        scheduler.submit_tracked(
            || Ok(TaskOutput::Chunk(ChunkPos::new(2, 2))),
            0,
            TaskTag::ChunkLoad,
            pos(2, 2),
        );

        let completed = scheduler.fetch_completed(TaskTag::ChunkLoad);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].output, Some(TaskOutput::Chunk(ChunkPos::new(2, 2))));
    }

    #[test]
    fn test_resubmitted_key_blocks_wait_until_new_completion() {
        let scheduler = TaskScheduler::new(2);

        scheduler.submit_tracked(|| Ok(TaskOutput::Empty), 0, TaskTag::ChunkLoad, pos(4, 4));
        scheduler.wait_for(TaskTag::ChunkLoad, pos(4, 4));

        let gate = Arc::new(AtomicBool::new(false));
        let release = Arc::clone(&gate);
        scheduler.submit_tracked(
            move || {
                while !release.load(AtomicOrdering::Acquire) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(TaskOutput::Empty)
            },
            0,
            TaskTag::ChunkLoad,
            pos(4, 4),
        );

        // The generation-1 completion no longer satisfies the key while the
        // new task is gated.
        assert!(!scheduler.is_finished(TaskTag::ChunkLoad, pos(4, 4)));

        gate.store(true, AtomicOrdering::Release);
        scheduler.wait_for(TaskTag::ChunkLoad, pos(4, 4));
        assert!(scheduler.is_finished(TaskTag::ChunkLoad, pos(4, 4)));
    }

    #[test]
    fn test_hidden_tasks_leave_no_record() {
        let scheduler = TaskScheduler::new(1);
        scheduler.submit(|| Ok(TaskOutput::Empty), 0, TaskClass::Hidden, None);

        assert!(scheduler.fetch_completed(TaskTag::ChunkLoad).is_empty());
        assert!(scheduler.fetch_completed(TaskTag::ChunkLight).is_empty());
    }
}
