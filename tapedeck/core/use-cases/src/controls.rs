/// Cancellation and pause token of one download job.
///
/// The interface flips the flags, the worker only reads them. A fresh token is
/// created for every job, so a job always starts neither canceled nor paused.
#[derive(Debug, Default)]
pub struct JobControl {
    canceled: ::std::sync::atomic::AtomicBool,
    paused: ::std::sync::atomic::AtomicBool,
    changed: ::tokio::sync::Notify,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(::std::sync::atomic::Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(::std::sync::atomic::Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.canceled.store(true, ::std::sync::atomic::Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    /// Returns the flag's new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.paused.fetch_xor(true, ::std::sync::atomic::Ordering::SeqCst);
        self.changed.notify_waiters();

        paused
    }

    /// Parks the caller while paused, re-checking every `interval` or as soon
    /// as a flag changes. Returns whether the job was canceled meanwhile.
    pub async fn wait_while_paused(&self, interval: ::std::time::Duration) -> bool {
        while self.is_paused() && !self.is_canceled() {
            ::tokio::select! {
                _ = self.changed.notified() => {},
                _ = ::tokio::time::sleep(interval) => {},
            }
        }

        self.is_canceled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: ::std::time::Duration = ::std::time::Duration::from_millis(500);

    #[test]
    fn starts_neither_canceled_nor_paused() {
        let control = JobControl::new();

        assert!(!control.is_canceled());
        assert!(!control.is_paused());
    }

    #[test]
    fn toggle_pause_is_its_own_inverse() {
        let control = JobControl::new();

        assert!(control.toggle_pause());
        assert!(control.is_paused());
        assert!(!control.toggle_pause());
        assert!(!control.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_not_paused() {
        let control = JobControl::new();
        let before = ::tokio::time::Instant::now();

        assert!(!control.wait_while_paused(INTERVAL).await);
        assert_eq!(before.elapsed(), ::std::time::Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_once_unpaused() {
        let control = ::std::sync::Arc::new(JobControl::new());
        control.toggle_pause();

        let waiter = ::tokio::spawn({
            let control = ::std::sync::Arc::clone(&control);
            async move { control.wait_while_paused(INTERVAL).await }
        });

        ::tokio::time::sleep(INTERVAL * 4).await;
        assert!(!waiter.is_finished());

        control.toggle_pause();

        assert!(!waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ends_the_wait() {
        let control = ::std::sync::Arc::new(JobControl::new());
        control.toggle_pause();

        let waiter = ::tokio::spawn({
            let control = ::std::sync::Arc::clone(&control);
            async move { control.wait_while_paused(INTERVAL).await }
        });

        ::tokio::time::sleep(INTERVAL).await;
        control.cancel();

        assert!(waiter.await.unwrap());
        assert!(control.is_paused());
    }
}
