use super::{
    config::{check_num_threads, Config},
    errors::SpawnError,
    result::SpawnResult,
    handle::{
        Job,
        JoinHandle,
    },
};
use std::{
    any::Any,
    fmt::Display,
    panic::{self, AssertUnwindSafe},
    thread,
};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tokio::sync::oneshot;


struct PoolState {
    // None после shutdown
    sender: Option<Sender<Job>>,
    num_threads: usize,
    next_worker_id: usize,
    workers: Vec<thread::JoinHandle<()>>,
}

/// Пул потоков фиксированного размера с общей FIFO очередью.
///
/// Воркеры - обычные потоки ОС. Размер пула можно менять на лету через
/// [`TaskPool::set_num_threads`]: лишние воркеры выходят только между задачами,
/// поэтому задачи в очереди и в работе не теряются и не дублируются.
pub struct TaskPool {
    state: RwLock<PoolState>,
    jobs: Receiver<Job>,
    retire_tx: Sender<()>,
    retire_rx: Receiver<()>,
    thread_name_prefix: String,
    stack_size: Option<usize>,
}

impl TaskPool {
    pub fn new(num_threads: usize) -> SpawnResult<Self> {
        let config = Config {
            num_threads,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Пул с числом воркеров по количеству аппаратных потоков
    pub fn default_pool() -> SpawnResult<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> SpawnResult<Self> {
        config.validate()?;

        let (sender, jobs) = match config.max_pending {
            Some(bound) => channel::bounded(bound),
            None => channel::unbounded(),
        };
        let (retire_tx, retire_rx) = channel::unbounded();

        let pool = TaskPool {
            state: RwLock::new(PoolState {
                sender: Some(sender),
                num_threads: 0,
                next_worker_id: 0,
                workers: Vec::with_capacity(config.num_threads),
            }),
            jobs,
            retire_tx,
            retire_rx,
            thread_name_prefix: config.thread_name_prefix,
            stack_size: config.stack_size,
        };

        {
            let mut state = pool.state.write();
            pool.grow(&mut state, config.num_threads)?;
        }

        log::debug!(
            "task pool started: {} workers, queue bound {:?}",
            config.num_threads,
            config.max_pending
        );
        Ok(pool)
    }

    pub fn num_threads(&self) -> usize {
        self.state.read().num_threads
    }

    /// Меняет целевое число воркеров. Очередь и выполняющиеся задачи не затрагиваются.
    pub fn set_num_threads(&self, num_threads: usize) -> SpawnResult<()> {
        check_num_threads(num_threads)?;

        let mut state = self.state.write();
        if state.sender.is_none() {
            return Err(SpawnError::ShutDown);
        }
        state.workers.retain(|w| !w.is_finished());

        let current = state.num_threads;
        if num_threads > current {
            let mut missing = num_threads - current;
            // Сначала отзываем ещё не полученные сигналы на выход
            while missing > 0 && self.retire_rx.try_recv().is_ok() {
                missing -= 1;
                state.num_threads += 1;
            }
            self.grow(&mut state, missing)?;
        } else {
            for _ in num_threads..current {
                // retire_rx живёт в пуле, канал не может быть закрыт
                let _ = self.retire_tx.send(());
            }
            state.num_threads = num_threads;
        }

        log::debug!("task pool resized: {} -> {} workers", current, num_threads);
        Ok(())
    }

    /// Число потоков-воркеров, которые ещё не завершились.
    /// После уменьшения пула сходится к [`TaskPool::num_threads`].
    pub fn running_workers(&self) -> usize {
        self.state
            .read()
            .workers
            .iter()
            .filter(|w| !w.is_finished())
            .count()
    }

    pub fn queued_tasks(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.read().sender.is_none()
    }

    /// Задача с результатом, которая может вернуть ошибку.
    /// `Err(e)` переводит handle в [`SpawnError::TaskFailed`] с текстом `e.to_string()`.
    pub fn submit<T, E, F>(&self, f: F) -> SpawnResult<JoinHandle<T>>
    where
        T: Send + 'static,
        E: Display,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.spawn_with_handle(move || f().map_err(|e| SpawnError::TaskFailed(e.to_string())))
    }

    pub fn spawn<T, F>(&self, f: F) -> SpawnResult<JoinHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.spawn_with_handle(move || Ok(f()))
    }

    /// Fire-and-forget. Паника логируется воркером, пул продолжает работу.
    pub fn execute<F>(&self, f: F) -> SpawnResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_job(Box::new(f))
    }

    pub fn execute_fallible<E, F>(&self, f: F) -> SpawnResult<()>
    where
        E: Display,
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        self.push_job(Box::new(move || {
            if let Err(e) = f() {
                log::error!("fire-and-forget task failed: {}", e);
            }
        }))
    }

    /// Закрывает приём задач, дожидается выполнения всей очереди и останавливает воркеры.
    /// Повторный вызов ничего не делает.
    pub fn shutdown(&self) {
        let workers = {
            let mut state = self.state.write();
            if state.sender.take().is_none() {
                return;
            }
            std::mem::take(&mut state.workers)
        };

        log::debug!("task pool shutting down, {} queued tasks", self.jobs.len());
        let current = thread::current().id();
        for worker in workers {
            // shutdown из задачи: свой поток не ждём, он выйдет после текущей задачи
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                log::error!("worker thread terminated abnormally");
            }
        }
        log::debug!("task pool stopped");
    }

    #[inline]
    fn spawn_with_handle<T, F>(&self, f: F) -> SpawnResult<JoinHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> SpawnResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<SpawnResult<T>>();

        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f))
                .unwrap_or_else(|payload| Err(SpawnError::Panic(panic_message(&*payload))));
            // Получатель мог уже отбросить handle
            let _ = tx.send(result);
        });

        self.push_job(job)?;
        Ok(JoinHandle::new(rx))
    }

    #[inline(always)]
    fn push_job(&self, job: Job) -> SpawnResult<()> {
        let state = self.state.read();
        let sender = state.sender.as_ref().ok_or(SpawnError::ShutDown)?;
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => SpawnError::QueueFull,
            TrySendError::Disconnected(_) => SpawnError::ShutDown,
        })
    }

    fn grow(&self, state: &mut PoolState, count: usize) -> SpawnResult<()> {
        for _ in 0..count {
            let id = state.next_worker_id;
            let mut builder = thread::Builder::new()
                .name(format!("{}-{}", self.thread_name_prefix, id));
            if let Some(stack_size) = self.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let jobs = self.jobs.clone();
            let retire = self.retire_rx.clone();
            let worker = builder
                .spawn(move || worker_loop(id, jobs, retire))
                .map_err(|e| SpawnError::ThreadSpawn(e.to_string()))?;

            state.workers.push(worker);
            state.next_worker_id += 1;
            state.num_threads += 1;
        }
        Ok(())
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Воркеры сами доработают очередь и выйдут, когда канал закроется
        self.state.get_mut().sender.take();
    }
}


fn worker_loop(id: usize, jobs: Receiver<Job>, retire: Receiver<()>) {
    log::trace!("worker {} started", id);
    loop {
        let keep_running = channel::select! {
            recv(jobs) -> job => match job {
                Ok(job) => {
                    run_job(id, job);
                    true
                }
                Err(_) => false,
            },
            recv(retire) -> signal => match signal {
                Ok(()) => false,
                Err(_) => {
                    // Пул уничтожен: дорабатываем очередь
                    for job in jobs.iter() {
                        run_job(id, job);
                    }
                    false
                }
            },
        };
        if !keep_running {
            break;
        }
    }
    log::trace!("worker {} stopped", id);
}

#[inline]
fn run_job(id: usize, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        log::error!("task panicked on worker {}: {}", id, panic_message(&*payload));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
