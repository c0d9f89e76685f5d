use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Waits on `next_signal` twice. The first signal raises `flag` so the
/// translation engine stops at the next value boundary. Returns `true` on the
/// second signal, when the caller should abort without waiting, and `false`
/// if the signal source fails.
pub async fn watch_interrupts<S, Fut>(mut next_signal: S, flag: Arc<AtomicBool>) -> bool
where
    S: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    warn!("Interrupt received, stopping after the current value (interrupt again to abort)");
    flag.store(true, Ordering::SeqCst);
    if next_signal().await.is_err() {
        return false;
    }
    warn!("Second interrupt received, aborting");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn test_second_interrupt_ends_the_watch() {
        let (tx, rx) = mpsc::unbounded_channel::<()>();
        let rx = Arc::new(Mutex::new(rx));
        let flag = Arc::new(AtomicBool::new(false));

        let signal = {
            let rx = rx.clone();
            move || {
                let rx = rx.clone();
                async move {
                    match rx.lock().await.recv().await {
                        Some(()) => Ok(()),
                        None => Err(io::Error::new(io::ErrorKind::Other, "closed")),
                    }
                }
            }
        };
        let watch = tokio::spawn(watch_interrupts(signal, flag.clone()));

        tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(flag.load(Ordering::SeqCst));
        assert!(!watch.is_finished());

        tx.send(()).unwrap();
        let abort = tokio::time::timeout(Duration::from_secs(1), watch)
            .await
            .expect("watch should end on the second interrupt")
            .unwrap();
        assert!(abort);
    }

    #[tokio::test]
    async fn test_failed_signal_source_leaves_flag_down() {
        let flag = Arc::new(AtomicBool::new(false));
        let abort = watch_interrupts(
            || async { Err(io::Error::new(io::ErrorKind::Other, "no handler")) },
            flag.clone(),
        )
        .await;
        assert!(!abort);
        assert!(!flag.load(Ordering::SeqCst));
    }
}
