//! Worker pool sizing for concurrent file transfers.

/// Processor count below which transfers run one file at a time.
const MIN_CORES_FOR_PARALLEL: usize = 4;

/// Number of concurrent file transfers for a machine with `cpus` cores.
///
/// Returns `min(max_concurrency, max(1, cpus))`, dropping to 1 on machines
/// with fewer than four cores.
pub fn worker_pool_size(max_concurrency: usize, cpus: usize) -> usize {
    if cpus < MIN_CORES_FOR_PARALLEL {
        return 1;
    }
    max_concurrency.max(1).min(cpus.max(1))
}

/// Pool size for the current machine.
pub fn default_worker_pool_size(max_concurrency: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    worker_pool_size(max_concurrency, cpus)
}
