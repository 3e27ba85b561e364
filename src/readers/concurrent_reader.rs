use crate::error::Result;
use crate::models::{MonthlyAggregate, RawTable};
use crate::readers::{PartitionReader, TableReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Outcome of reading one input file.
pub type FileResult<T> = (PathBuf, Result<T>);

/// Reads many files on the blocking pool with at most `max_workers` in flight.
pub struct ConcurrentReader {
    max_workers: usize,
    use_mmap: bool,
}

impl ConcurrentReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            use_mmap: false,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Read raw tables. Per-file failures are returned, not raised.
    pub async fn read_tables(&self, paths: Vec<PathBuf>) -> Result<Vec<FileResult<RawTable>>> {
        let use_mmap = self.use_mmap;
        self.read_all(paths, move |path| {
            TableReader::new().with_mmap(use_mmap).read(path)
        })
        .await
    }

    /// Read monthly aggregate files.
    pub async fn read_partitions(
        &self,
        paths: Vec<PathBuf>,
    ) -> Result<Vec<FileResult<MonthlyAggregate>>> {
        let use_mmap = self.use_mmap;
        self.read_all(paths, move |path| {
            PartitionReader::new()
                .with_table_reader(TableReader::new().with_mmap(use_mmap))
                .read(path)
        })
        .await
    }

    /// Apply `read` to every path; results come back sorted by path so the
    /// caller never sees completion order.
    pub async fn read_all<T, F>(&self, paths: Vec<PathBuf>, read: F) -> Result<Vec<FileResult<T>>>
    where
        T: Send + 'static,
        F: Fn(&Path) -> Result<T> + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let read = Arc::new(read);
        let mut tasks = JoinSet::new();

        for path in paths {
            let semaphore = semaphore.clone();
            let read = read.clone();
            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || (*read)(&task_path)).await;
                (path, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (path, result) = joined?;
            debug!("read {}", path.display());
            results.push((path, result?));
        }

        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
