//! Fixed-size worker pool with a bounded job queue and scoped task groups

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    /// Address of the `Shared` block of the pool owning this thread, 0 elsewhere
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// Worker pool configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Maximum number of queued jobs; submission blocks beyond it
    pub queue_capacity: usize,
    /// Prefix of the worker thread names
    pub thread_name: String,
}

impl PoolConfig {
    /// Configuration with `workers` threads and the default queue capacity
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: 4 * workers,
            thread_name: String::from("ndexpr-worker"),
        }
    }

    /// Override the queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Override the thread name prefix
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for PoolConfig {
    /// One worker per available hardware thread
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        Self::with_workers(workers)
    }
}

struct Queue {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl Shared {
    fn push(&self, job: Job) {
        let mut queue = self.queue.lock();
        while queue.jobs.len() >= self.capacity {
            self.not_full.wait(&mut queue);
        }
        queue.jobs.push_back(job);
        drop(queue);
        self.not_empty.notify_one();
    }

    fn address(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

/// A fixed set of worker threads fed from a bounded FIFO queue
///
/// The pool is created explicitly and handed to parallel entry points
/// through [`super::ExecutionPolicy`]. Dropping it lets the workers drain the
/// queue, then joins them.
///
/// # Example
///
/// ```
/// use ndexpr::runtime::{PoolConfig, WorkerPool};
///
/// let pool = WorkerPool::new(PoolConfig::with_workers(2)).unwrap();
/// let mut halves = [0u64; 2];
/// pool.scope(|s| {
///     let (lo, hi) = halves.split_at_mut(1);
///     s.spawn(move || lo[0] = (0..50).sum());
///     s.spawn(move || hi[0] = (50..100).sum());
/// });
/// assert_eq!(halves[0] + halves[1], 4950);
/// ```
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start the workers described by `config`
    ///
    /// # Errors
    /// `Error::InvalidArgument` for zero workers or a zero queue capacity,
    /// `Error::ThreadSpawn` if the OS refuses to start a thread; workers
    /// started before the failure are shut down again.
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::invalid_argument(
                "workers",
                "a worker pool needs at least one thread",
            ));
        }
        if config.queue_capacity == 0 {
            return Err(Error::invalid_argument(
                "queue_capacity",
                "the job queue must hold at least one job",
            ));
        }

        let mut pool = Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    jobs: VecDeque::with_capacity(config.queue_capacity),
                    shutdown: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity: config.queue_capacity,
            }),
            handles: Vec::with_capacity(config.workers),
        };

        for i in 0..config.workers {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("{}-{i}", config.thread_name))
                .spawn(move || worker_loop(shared))?;
            pool.handles.push(handle);
        }

        log::debug!(
            "worker pool started: {} workers, queue capacity {}",
            config.workers,
            config.queue_capacity
        );
        Ok(pool)
    }

    /// Pool with `workers` threads and default settings otherwise
    pub fn with_workers(workers: usize) -> Result<Self> {
        Self::new(PoolConfig::with_workers(workers))
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Maximum number of queued jobs
    pub fn queue_capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Jobs waiting for a worker
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }

    /// Run a detached job
    ///
    /// Blocks while the queue is full. A panic inside `job` is logged and
    /// swallowed; the worker survives it.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.push(Box::new(move || {
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                log::error!("detached job panicked");
            }
        }));
    }

    /// Run a group of tasks that may borrow from the caller's stack
    ///
    /// Every task spawned on the [`Scope`] has finished when this returns. If
    /// a task panicked, the first panic is resumed here after the whole group
    /// drained. Tasks spawned from inside a task of the same pool run inline
    /// on the spawning worker.
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> R,
    {
        let scope = Scope {
            shared: Arc::clone(&self.shared),
            state: Arc::new(ScopeState::default()),
            scope: PhantomData,
            env: PhantomData,
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));
        scope.state.wait();

        if let Some(payload) = scope.state.panic.lock().take() {
            panic::resume_unwind(payload);
        }
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        log::debug!("worker pool shut down");
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers())
            .field("queue_capacity", &self.queue_capacity())
            .field("queued", &self.queued())
            .finish()
    }
}

fn worker_loop(shared: Arc<Shared>) {
    CURRENT_POOL.with(|pool| pool.set(shared.address()));
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.shutdown {
                    return;
                }
                shared.not_empty.wait(&mut queue);
            }
        };
        shared.not_full.notify_one();
        job();
    }
}

#[derive(Default)]
struct ScopeState {
    pending: Mutex<usize>,
    all_done: Condvar,
    panic: Mutex<Option<Box<dyn Any + Send + 'static>>>,
}

impl ScopeState {
    fn complete(&self) {
        let mut pending = self.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.all_done.notify_all();
        }
    }

    fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.all_done.wait(&mut pending);
        }
    }
}

/// Handle for spawning borrowed tasks, see [`WorkerPool::scope`]
pub struct Scope<'scope, 'env: 'scope> {
    shared: Arc<Shared>,
    state: Arc<ScopeState>,
    scope: PhantomData<&'scope mut &'scope ()>,
    env: PhantomData<&'env mut &'env ()>,
}

impl<'scope> Scope<'scope, '_> {
    /// Queue `task`, blocking while the pool's queue is full
    pub fn spawn<F>(&'scope self, task: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        *self.state.pending.lock() += 1;

        let state = Arc::clone(&self.state);
        let job: Box<dyn FnOnce() + Send + 'scope> = Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let mut first = state.panic.lock();
                if first.is_none() {
                    *first = Some(payload);
                }
            }
            state.complete();
        });
        // SAFETY: `WorkerPool::scope` does not return before `pending` is
        // back to zero, so everything borrowed for 'scope outlives the job.
        let job: Job = unsafe {
            std::mem::transmute::<Box<dyn FnOnce() + Send + 'scope>, Job>(job)
        };

        if CURRENT_POOL.with(Cell::get) == self.shared.address() {
            job();
        } else {
            self.shared.push(job);
        }
    }
}

impl fmt::Debug for Scope<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("pending", &*self.state.pending.lock())
            .finish()
    }
}
