//! Batch coordinator: fan transcode tasks out to a worker pool and write each
//! result back into the document as it arrives.
//!
//! # Concurrency
//!
//! Tasks run on a dedicated `rayon` pool and report over a `crossbeam`
//! channel. The calling thread drains the channel and is the only thread that
//! touches the [`Document`]. Each task owns a distinct [`NodeId`], so every
//! node is written at most once and completion order cannot change the
//! output.
//!
//! A pool of one worker runs tasks inline on the calling thread. That is
//! also the path taken on targets without threads.
//!
//! # Failure isolation
//!
//! Every task runs under `catch_unwind`; errors and panics become
//! [`TranscodeResult::Failed`] and leave the node untouched. Nothing is
//! retried.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

use crossbeam::channel::unbounded;

use crate::document::{Document, NodeId};
use crate::payload::InlinePayload;
use crate::stats::Stopwatch;
use crate::transcode::{TranscodeError, Transcoded, Transcoder};

/// Default multiplier applied to hardware parallelism by [`WorkerPolicy::Auto`].
pub const DEFAULT_WORKER_FACTOR: usize = 2;

/// Something that can turn image bytes into JPEG bytes.
///
/// [`Transcoder`] is the production implementation.
pub trait Transcode: Sync {
    fn transcode(&self, bytes: &[u8]) -> Result<Transcoded, TranscodeError>;
}

impl Transcode for Transcoder {
    fn transcode(&self, bytes: &[u8]) -> Result<Transcoded, TranscodeError> {
        Transcoder::transcode(self, bytes)
    }
}

/// How many workers a batch may use.
///
/// Each worker holds at most one decoded pixel buffer at a time, so this is
/// also the bound on peak decode memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPolicy {
    /// `min(tasks, available_parallelism * factor)`.
    Auto { factor: usize },
    /// A fixed count, still capped by the number of tasks.
    Fixed(usize),
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        WorkerPolicy::Auto {
            factor: DEFAULT_WORKER_FACTOR,
        }
    }
}

impl WorkerPolicy {
    /// Number of workers to use for `tasks` tasks. Always at least 1.
    pub fn worker_count(self, tasks: usize) -> usize {
        let wanted = match self {
            WorkerPolicy::Auto { factor } => {
                let hardware = std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1);
                hardware.saturating_mul(factor.max(1))
            }
            WorkerPolicy::Fixed(count) => count,
        };
        wanted.min(tasks).max(1)
    }
}

/// One unit of work: an image node and the payload read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeTask {
    node: NodeId,
    payload: InlinePayload,
}

impl TranscodeTask {
    pub fn new(node: NodeId, payload: InlinePayload) -> Self {
        Self { node, payload }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn payload(&self) -> &InlinePayload {
        &self.payload
    }
}

/// Terminal outcome of one task.
#[derive(Debug)]
pub enum TranscodeResult {
    Succeeded {
        node: NodeId,
        original_bytes: u64,
        optimized_bytes: u64,
        /// False when the original source was kept because re-encoding an
        /// existing JPEG would not have made it smaller.
        replaced: bool,
    },
    Failed {
        node: NodeId,
        original_bytes: u64,
        reason: TranscodeError,
    },
}

impl TranscodeResult {
    pub fn node(&self) -> NodeId {
        match self {
            TranscodeResult::Succeeded { node, .. } | TranscodeResult::Failed { node, .. } => *node,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscodeResult::Succeeded { .. })
    }
}

/// Lifecycle of a task within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// Per-task state for one batch.
#[derive(Debug)]
struct BatchProgress {
    states: Vec<TaskState>,
    terminal: usize,
}

impl BatchProgress {
    fn new(tasks: usize) -> Self {
        Self {
            states: vec![TaskState::Pending; tasks],
            terminal: 0,
        }
    }

    /// Move task `index` to `next`, rejecting anything but
    /// `Pending -> Running -> {Succeeded, Failed}`.
    fn advance(&mut self, index: usize, next: TaskState) -> bool {
        let Some(state) = self.states.get_mut(index) else {
            log::error!("progress update for unknown task {index}");
            return false;
        };
        let valid = matches!(
            (*state, next),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
        );
        if !valid {
            log::error!("task {index}: invalid transition {:?} -> {:?}", state, next);
            debug_assert!(valid, "invalid task transition");
            return false;
        }
        *state = next;
        if next.is_terminal() {
            self.terminal += 1;
        }
        true
    }

    fn is_complete(&self) -> bool {
        self.terminal == self.states.len()
    }
}

/// What a worker reports back to the coordinator.
enum TaskEvent {
    Started(usize),
    Finished {
        index: usize,
        result: TranscodeResult,
        replacement: Option<String>,
    },
}

/// Everything the coordinator hands back once all tasks are terminal.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Results in completion order.
    pub results: Vec<TranscodeResult>,
    /// Workers actually used.
    pub workers: usize,
    /// Seconds from dispatch to the last collected result.
    pub elapsed_seconds: f64,
}

/// Runs transcode tasks and applies their results to a document.
#[derive(Debug, Clone)]
pub struct BatchCoordinator<T = Transcoder> {
    transcoder: T,
    workers: WorkerPolicy,
    never_grow: bool,
}

impl<T: Transcode> BatchCoordinator<T> {
    pub fn new(transcoder: T, workers: WorkerPolicy) -> Self {
        Self {
            transcoder,
            workers,
            never_grow: true,
        }
    }

    /// Keep an existing JPEG source when re-encoding would not shrink it.
    pub fn with_never_grow(mut self, never_grow: bool) -> Self {
        self.never_grow = never_grow;
        self
    }

    /// Run every task to a terminal state, writing successes into `document`.
    ///
    /// Each task's node must be a distinct image node of `document` with a
    /// `src` attribute, as produced by [`crate::payload::extract`].
    pub fn run(&self, document: &mut Document, tasks: Vec<TranscodeTask>) -> BatchOutcome {
        let stopwatch = Stopwatch::start();
        let task_count = tasks.len();
        let workers = self.workers.worker_count(task_count);
        let mut progress = BatchProgress::new(task_count);
        let mut results = Vec::with_capacity(task_count);

        log::debug!("dispatching {task_count} transcode tasks on {workers} workers");

        let workers = if workers <= 1 {
            self.run_inline(document, tasks, &mut progress, &mut results);
            1
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("slimdoc-worker-{i}"))
                .build()
            {
                Ok(pool) => {
                    self.run_pooled(&pool, document, tasks, &mut progress, &mut results);
                    workers
                }
                Err(err) => {
                    log::warn!("could not build worker pool ({err}); transcoding inline");
                    self.run_inline(document, tasks, &mut progress, &mut results);
                    1
                }
            }
        };

        if !progress.is_complete() {
            log::error!(
                "batch ended with {} of {} tasks terminal",
                progress.terminal,
                task_count
            );
        }

        BatchOutcome {
            results,
            workers,
            elapsed_seconds: stopwatch.elapsed_seconds(),
        }
    }

    fn run_inline(
        &self,
        document: &mut Document,
        tasks: Vec<TranscodeTask>,
        progress: &mut BatchProgress,
        results: &mut Vec<TranscodeResult>,
    ) {
        for (index, task) in tasks.into_iter().enumerate() {
            handle_event(TaskEvent::Started(index), document, progress, results);
            let (result, replacement) = self.execute(&task);
            let event = TaskEvent::Finished {
                index,
                result,
                replacement,
            };
            handle_event(event, document, progress, results);
        }
    }

    fn run_pooled(
        &self,
        pool: &rayon::ThreadPool,
        document: &mut Document,
        tasks: Vec<TranscodeTask>,
        progress: &mut BatchProgress,
        results: &mut Vec<TranscodeResult>,
    ) {
        let (tx, rx) = unbounded();

        // The closure runs on this thread, so blocking on `rx` leaves every
        // pool thread free for tasks.
        pool.in_place_scope(|scope| {
            for (index, task) in tasks.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let _ = tx.send(TaskEvent::Started(index));
                    let (result, replacement) = self.execute(&task);
                    let _ = tx.send(TaskEvent::Finished {
                        index,
                        result,
                        replacement,
                    });
                });
            }
            drop(tx);

            for event in rx.iter() {
                handle_event(event, document, progress, results);
            }
        });
    }

    /// Run one task to completion. Never panics.
    fn execute(&self, task: &TranscodeTask) -> (TranscodeResult, Option<String>) {
        let original_bytes = task.payload.encoded_len();
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.transcode_payload(task)));

        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(payload) => Err(TranscodeError::Panicked(panic_message(payload.as_ref()))),
        };

        match outcome {
            Ok(optimized) => {
                let optimized_bytes = optimized.encoded_len();
                if self.never_grow && task.payload.is_jpeg() && optimized_bytes >= original_bytes {
                    let result = TranscodeResult::Succeeded {
                        node: task.node,
                        original_bytes,
                        optimized_bytes: original_bytes,
                        replaced: false,
                    };
                    return (result, None);
                }
                let result = TranscodeResult::Succeeded {
                    node: task.node,
                    original_bytes,
                    optimized_bytes,
                    replaced: true,
                };
                (result, Some(optimized.to_source()))
            }
            Err(reason) => {
                let result = TranscodeResult::Failed {
                    node: task.node,
                    original_bytes,
                    reason,
                };
                (result, None)
            }
        }
    }

    fn transcode_payload(&self, task: &TranscodeTask) -> Result<InlinePayload, TranscodeError> {
        let bytes = task.payload.decode()?;
        let transcoded = self.transcoder.transcode(&bytes)?;
        log::trace!(
            "node {}: {} {} -> jpeg {}",
            task.node,
            task.payload.subtype(),
            transcoded.source_dimensions,
            transcoded.dimensions
        );
        Ok(InlinePayload::from_jpeg(&transcoded.bytes))
    }
}

impl Default for BatchCoordinator<Transcoder> {
    fn default() -> Self {
        Self::new(Transcoder::default(), WorkerPolicy::default())
    }
}

/// Apply one worker event on the coordinating thread.
fn handle_event(
    event: TaskEvent,
    document: &mut Document,
    progress: &mut BatchProgress,
    results: &mut Vec<TranscodeResult>,
) {
    match event {
        TaskEvent::Started(index) => {
            progress.advance(index, TaskState::Running);
        }
        TaskEvent::Finished {
            index,
            result,
            replacement,
        } => {
            let next = if result.is_success() {
                TaskState::Succeeded
            } else {
                TaskState::Failed
            };
            if !progress.advance(index, next) {
                return;
            }

            match &result {
                TranscodeResult::Failed { node, reason, .. } => {
                    log::warn!("image {node} left unchanged: {reason}");
                }
                TranscodeResult::Succeeded {
                    node,
                    original_bytes,
                    optimized_bytes,
                    ..
                } => {
                    log::trace!("image {node}: {original_bytes} -> {optimized_bytes} bytes");
                }
            }

            if let Some(src) = replacement {
                if let Err(err) = document.replace_src(result.node(), src) {
                    log::error!("could not write optimized image: {err}");
                    debug_assert!(false, "task addressed a node without src: {err}");
                }
            }
            results.push(result);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
