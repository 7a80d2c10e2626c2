use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::debug;

use quiz_core::timer::{Tick, Timer};

/// Drives a [`Timer`] once per second on a Tokio task.
///
/// Restarting, resetting, stopping or dropping the driver aborts the task, so a
/// hook registered for an earlier countdown can never fire afterwards.
#[derive(Default)]
pub struct QuizTimer {
    timer: Arc<Mutex<Timer>>,
    task: Option<JoinHandle<()>>,
}

fn lock(timer: &Mutex<Timer>) -> MutexGuard<'_, Timer> {
    timer.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QuizTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a countdown of `duration_secs`, calling `on_expire`
    /// once when it reaches zero. A zero duration starts nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self, duration_secs: u32, on_expire: impl FnMut() + Send + 'static) {
        self.abort();
        {
            let mut timer = lock(&self.timer);
            timer.on_expire(on_expire);
            timer.start(duration_secs);
        }
        if duration_secs == 0 {
            return;
        }

        let timer = Arc::clone(&self.timer);
        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let mut guard = lock(&timer);
                match guard.tick() {
                    Tick::Expired => {
                        debug!("quiz timer expired");
                        break;
                    }
                    Tick::Idle if guard.remaining() == 0 => break,
                    Tick::Idle | Tick::Running { .. } => {}
                }
            }
        }));
    }

    pub fn pause(&self) {
        lock(&self.timer).pause();
    }

    pub fn resume(&self) {
        lock(&self.timer).resume();
    }

    /// Stop counting but keep the remaining time, e.g. once the session is over.
    pub fn stop(&mut self) {
        self.abort();
        lock(&self.timer).pause();
    }

    /// Stop and zero the countdown, dropping the expiry hook.
    pub fn reset(&mut self) {
        self.abort();
        let mut timer = lock(&self.timer);
        timer.reset();
        timer.clear_hook();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        lock(&self.timer).remaining()
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        lock(&self.timer).duration()
    }

    #[must_use]
    pub fn elapsed(&self) -> u32 {
        lock(&self.timer).elapsed()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.timer).is_running()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        lock(&self.timer).is_expired()
    }

    #[must_use]
    pub fn formatted_time(&self) -> String {
        lock(&self.timer).formatted_time()
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&count);
        (count, move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_duration() {
        let (count, hook) = counter();
        let mut timer = QuizTimer::new();
        timer.start(10, hook);
        assert_eq!(timer.formatted_time(), "00:10");

        sleep(Duration::from_millis(9_500)).await;
        assert_eq!(timer.remaining(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(timer.is_expired());
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_remaining_time() {
        let (count, hook) = counter();
        let mut timer = QuizTimer::new();
        timer.start(10, hook);

        sleep(Duration::from_millis(3_500)).await;
        timer.pause();
        assert_eq!(timer.remaining(), 7);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.remaining(), 7);

        timer.resume();
        sleep(Duration::from_millis(7_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_countdown() {
        let (first, first_hook) = counter();
        let (second, second_hook) = counter();
        let mut timer = QuizTimer::new();
        timer.start(5, first_hook);
        sleep(Duration::from_millis(2_500)).await;
        timer.start(3, second_hook);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_and_drop_cancel_expiry() {
        let (count, hook) = counter();
        let mut timer = QuizTimer::new();
        timer.start(3, hook);
        timer.reset();
        assert_eq!(timer.remaining(), 0);

        let (dropped_count, dropped_hook) = counter();
        let mut dropped = QuizTimer::new();
        dropped.start(2, dropped_hook);
        drop(dropped);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(dropped_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_never_fires() {
        let (count, hook) = counter();
        let mut timer = QuizTimer::new();
        timer.start(0, hook);
        assert!(timer.is_expired());
        assert!(!timer.is_running());
        sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeps_elapsed() {
        let (count, hook) = counter();
        let mut timer = QuizTimer::new();
        timer.start(60, hook);
        sleep(Duration::from_millis(4_500)).await;
        timer.stop();
        sleep(Duration::from_secs(100)).await;
        assert_eq!(timer.elapsed(), 4);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
