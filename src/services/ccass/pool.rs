//! 固定大小的工作线程池
//!
//! 基于 rayon 线程池，启动时创建一次，所有交易日复用

use log::{debug, error};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{CrawlError, CrawlResult};

/// 线程池大小上限
pub const MAX_POOL_SIZE: usize = 256;

pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(size: usize) -> CrawlResult<Self> {
        // rayon 把 0 当作“按 CPU 核数”，这里不允许
        if size == 0 || size > MAX_POOL_SIZE {
            return Err(CrawlError::Configuration(format!(
                "线程池大小必须在 1 到 {} 之间，收到 {}",
                MAX_POOL_SIZE, size
            )));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("ccass-worker-{}", i))
            // 任务 panic 时线程继续服务后续任务
            .panic_handler(|_| error!("工作线程执行的任务异常终止"))
            .build()
            .map_err(|e| CrawlError::Worker(format!("无法创建工作线程池: {}", e)))?;

        debug!("工作线程池已启动，共 {} 个线程", size);
        Ok(Self { pool })
    }

    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;

    #[test]
    fn test_size_out_of_range_is_config_error() {
        for size in [0, MAX_POOL_SIZE + 1, usize::MAX] {
            assert!(matches!(
                WorkerPool::new(size),
                Err(CrawlError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_jobs_run_on_pool_threads() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.size(), 3);
        let (tx, rx) = mpsc::channel();

        for i in 0..12 {
            let tx = tx.clone();
            pool.execute(move || {
                let name = thread::current().name().unwrap_or_default().to_string();
                tx.send((i, name)).unwrap();
            });
        }
        drop(tx);

        let results: Vec<(i32, String)> = rx.iter().collect();
        assert_eq!(results.len(), 12);
        let ids: HashSet<i32> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids.len(), 12);
        assert!(results.iter().all(|(_, n)| n.starts_with("ccass-worker-")));
    }

    #[test]
    fn test_pool_survives_panicking_job() {
        let pool = WorkerPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        pool.execute(|| panic!("boom"));
        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            let tx = tx.clone();
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            });
        }
        drop(tx);

        assert_eq!(rx.iter().count(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
