//! Bounded fan-out over a slice of work items.
//!
//! A fixed set of workers share one cursor and pull the next unstarted index
//! until the slice is exhausted. All workers are polled from the calling
//! task, so there are never more than `limit` checks in flight and nothing
//! needs a lock.

use futures::future::join_all;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Runs `check` over every item with at most `limit` in flight.
///
/// `results[i]` always belongs to `items[i]`. A panicking check is caught and
/// replaced by `on_panic(item)`; the other checks are unaffected.
pub async fn run_bounded<'a, T, R, F, Fut, P>(
    items: &'a [T],
    limit: usize,
    check: F,
    on_panic: P,
) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
    P: Fn(&'a T) -> R,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = limit.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);

    let (cursor, check, on_panic) = (&cursor, &check, &on_panic);
    let batches = join_all((0..workers).map(move |_| async move {
        let mut done = Vec::new();
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(index) else { break };
            let out = match AssertUnwindSafe(check(item)).catch_unwind().await {
                Ok(out) => out,
                Err(_) => {
                    warn!(index, "check panicked, recording internal error");
                    on_panic(item)
                }
            };
            done.push((index, out));
        }
        done
    }))
    .await;

    let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();
    for (index, out) in batches.into_iter().flatten() {
        slots[index] = Some(out);
    }
    slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| slot.unwrap_or_else(|| on_panic(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::time::Duration;

    #[tokio::test]
    async fn results_follow_input_order() {
        let items: Vec<u64> = (0..40).collect();
        let delays: Vec<u64> = {
            let mut rng = rand::thread_rng();
            items.iter().map(|_| rng.gen_range(0..15)).collect()
        };
        let delays = &delays;

        let out = run_bounded(
            &items,
            7,
            move |x| async move {
                tokio::time::sleep(Duration::from_millis(delays[*x as usize])).await;
                x * 10
            },
            |_| u64::MAX,
        )
        .await;

        assert_eq!(out.len(), items.len());
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, i as u64 * 10);
        }
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let items: Vec<u32> = (0..25).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (in_flight, peak_ref) = (&in_flight, &peak);

        run_bounded(
            &items,
            3,
            move |_| async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak_ref.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            },
            |_| (),
        )
        .await;

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak >= 2);
    }

    #[tokio::test]
    async fn panic_is_isolated_to_its_index() {
        let items = [1i64, 2, 3, 4];
        let out = run_bounded(
            &items,
            2,
            |x| async move {
                if *x == 2 {
                    panic!("boom");
                }
                *x
            },
            |_| -1,
        )
        .await;
        assert_eq!(out, vec![1, -1, 3, 4]);
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let items = [5u8];
        let out = run_bounded(&items, 0, |x| async move { *x }, |_| 0).await;
        assert_eq!(out, vec![5]);

        let empty: [u8; 0] = [];
        assert!(run_bounded(&empty, 4, |x| async move { *x }, |_| 0).await.is_empty());
    }
}
