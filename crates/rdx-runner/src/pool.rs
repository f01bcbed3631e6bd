use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Apply `work` to every item on at most `jobs` threads. Results come back in
/// input order. Workers share nothing but the read-only inputs.
pub fn run_pool<T, R, F>(items: &[T], jobs: usize, work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let jobs = jobs.clamp(1, items.len());
    if jobs == 1 {
        return items.iter().map(&work).collect();
    }

    let next = AtomicUsize::new(0);
    let done: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(items.len()));

    std::thread::scope(|scope| {
        for _ in 0..jobs {
            scope.spawn(|| loop {
                let idx = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(idx) else {
                    return;
                };
                let out = work(item);
                match done.lock() {
                    Ok(mut guard) => guard.push((idx, out)),
                    Err(poisoned) => poisoned.into_inner().push((idx, out)),
                }
            });
        }
    });

    let mut out = done.into_inner().unwrap_or_else(|e| e.into_inner());
    out.sort_by_key(|(idx, _)| *idx);
    out.into_iter().map(|(_, r)| r).collect()
}
