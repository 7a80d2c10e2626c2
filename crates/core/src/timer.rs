use std::fmt;

/// Outcome of a single one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer was stopped or paused; nothing changed.
    Idle,
    /// One second elapsed and time remains.
    Running { remaining: u32 },
    /// This tick brought the countdown to zero.
    Expired,
}

type ExpireHook = Box<dyn FnMut() + Send>;

/// Countdown clock advanced by explicit ticks.
///
/// The timer does not own a thread or task; a driver calls [`Timer::tick`] once per
/// second. When the countdown reaches zero while running, the registered hook is
/// invoked exactly once and the timer stops until the next [`Timer::start`].
#[derive(Default)]
pub struct Timer {
    duration: u32,
    remaining: u32,
    running: bool,
    on_expire: Option<ExpireHook>,
}

impl Timer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hook fired on expiry, replacing any previous one.
    pub fn on_expire(&mut self, hook: impl FnMut() + Send + 'static) {
        self.on_expire = Some(Box::new(hook));
    }

    pub fn clear_hook(&mut self) {
        self.on_expire = None;
    }

    /// Starts (or restarts) the countdown from `duration_secs`.
    ///
    /// A zero duration leaves the timer stopped and already expired.
    pub fn start(&mut self, duration_secs: u32) {
        self.duration = duration_secs;
        self.remaining = duration_secs;
        self.running = duration_secs > 0;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = 0;
        self.duration = 0;
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> Tick {
        if !self.running || self.remaining == 0 {
            return Tick::Idle;
        }
        self.remaining -= 1;
        if self.remaining > 0 {
            return Tick::Running {
                remaining: self.remaining,
            };
        }

        self.running = false;
        if let Some(hook) = self.on_expire.as_mut() {
            hook();
        }
        Tick::Expired
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Seconds counted down since the last start.
    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.duration.saturating_sub(self.remaining)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Remaining time as zero-padded `MM:SS`.
    #[must_use]
    pub fn formatted_time(&self) -> String {
        format_mm_ss(self.remaining)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("duration", &self.duration)
            .field("remaining", &self.remaining)
            .field("running", &self.running)
            .field("has_hook", &self.on_expire.is_some())
            .finish()
    }
}

/// Formats seconds as `MM:SS`; minutes are not capped at 59.
#[must_use]
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_timer() -> (Timer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::new();
        let counter = Arc::clone(&fired);
        timer.on_expire(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (timer, fired)
    }

    #[test]
    fn ten_ticks_expire_once() {
        let (mut timer, fired) = counting_timer();
        timer.start(10);
        for _ in 0..9 {
            assert!(matches!(timer.tick(), Tick::Running { .. }));
        }
        assert_eq!(timer.tick(), Tick::Expired);
        assert_eq!(timer.remaining(), 0);
        assert!(timer.is_expired());
        assert!(!timer.is_running());

        for _ in 0..5 {
            assert_eq!(timer.tick(), Tick::Idle);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn paused_ticks_do_not_count() {
        let (mut uninterrupted, _) = counting_timer();
        uninterrupted.start(10);
        for _ in 0..4 {
            uninterrupted.tick();
        }

        let (mut paused, _) = counting_timer();
        paused.start(10);
        paused.tick();
        paused.tick();
        paused.pause();
        for _ in 0..5 {
            assert_eq!(paused.tick(), Tick::Idle);
        }
        paused.resume();
        paused.tick();
        paused.tick();

        assert_eq!(paused.remaining(), uninterrupted.remaining());
        assert_eq!(paused.elapsed(), 4);
    }

    #[test]
    fn restart_rearms_the_hook() {
        let (mut timer, fired) = counting_timer();
        timer.start(1);
        assert_eq!(timer.tick(), Tick::Expired);
        timer.start(2);
        timer.tick();
        assert_eq!(timer.tick(), Tick::Expired);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn restart_replaces_running_countdown() {
        let (mut timer, fired) = counting_timer();
        timer.start(3);
        timer.tick();
        timer.start(5);
        assert_eq!(timer.remaining(), 5);
        assert_eq!(timer.elapsed(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_duration_is_expired_without_firing() {
        let (mut timer, fired) = counting_timer();
        timer.start(0);
        assert!(timer.is_expired());
        assert!(!timer.is_running());
        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resume_after_expiry_is_noop() {
        let (mut timer, _) = counting_timer();
        timer.start(1);
        timer.tick();
        timer.resume();
        assert!(!timer.is_running());
    }

    #[test]
    fn reset_stops_and_zeroes() {
        let (mut timer, fired) = counting_timer();
        timer.start(30);
        timer.tick();
        timer.reset();
        assert_eq!(timer.remaining(), 0);
        assert!(!timer.is_running());
        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(300), "05:00");
        assert_eq!(format_mm_ss(6_000), "100:00");

        let mut timer = Timer::new();
        timer.start(125);
        assert_eq!(timer.formatted_time(), "02:05");
    }
}
