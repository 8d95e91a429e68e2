use std::ops::Range;

/// caps the worker count so that no worker is left without an acquisition. At least one worker
/// is always returned.
pub fn worker_count(available: usize, n_acquisitions: usize) -> usize {
    available.min(n_acquisitions).max(1)
}

/// splits `0..n_acquisitions` into `n_workers` contiguous ranges whose lengths differ by at most
/// one. The leading `n_acquisitions % n_workers` ranges carry the extra acquisition. Ranges are
/// returned in increasing order and are empty only if there are more workers than acquisitions.
/// No workers means no ranges.
pub fn partition(n_acquisitions: usize, n_workers: usize) -> Vec<Range<usize>> {
    if n_workers == 0 {
        return Vec::new();
    }
    let base = n_acquisitions / n_workers;
    let extra = n_acquisitions % n_workers;
    let mut start = 0;
    (0..n_workers).map(|i| {
        let len = base + (i < extra) as usize;
        let r = start..(start + len);
        start += len;
        r
    }).collect()
}

/// hardware parallelism reported by the OS, 1 if it cannot be queried
pub fn detected_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// number of workers the engine may use before capping at the acquisition count. A budget can
/// only lower the detected hardware parallelism, never raise it.
pub fn available_workers(budget: Option<usize>) -> usize {
    let detected = detected_parallelism();
    budget.map_or(detected, |b| b.min(detected))
}
