//! Interval timer
//!
//! The timer measures time against a reference instant taken at construction
//! and on every `reset`/`lap`. There is no paused state. Switching precision
//! never moves the reference instant; the next `elapsed` call simply reports
//! the same span in the new unit.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tempora_core::{TimeError, TimeUnit};

use crate::hook::Released;
use crate::{Clock, MonotonicClock, YieldHook};

const VALID_PRECISIONS: &str = "ns, us, ms, s";

/// Unit used by a timer for every input and output
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TimerPrecision {
    Nanosecond,
    #[default]
    Microsecond,
    Millisecond,
    Second,
}

impl TimerPrecision {
    pub const ALL: [TimerPrecision; 4] = [
        TimerPrecision::Nanosecond,
        TimerPrecision::Microsecond,
        TimerPrecision::Millisecond,
        TimerPrecision::Second,
    ];

    #[inline]
    pub const fn unit(self) -> TimeUnit {
        match self {
            TimerPrecision::Nanosecond => TimeUnit::Nanosecond,
            TimerPrecision::Microsecond => TimeUnit::Microsecond,
            TimerPrecision::Millisecond => TimeUnit::Millisecond,
            TimerPrecision::Second => TimeUnit::Second,
        }
    }

    /// Span of `count` units
    pub fn duration(self, count: u64) -> Duration {
        match self {
            TimerPrecision::Nanosecond => Duration::from_nanos(count),
            TimerPrecision::Microsecond => Duration::from_micros(count),
            TimerPrecision::Millisecond => Duration::from_millis(count),
            TimerPrecision::Second => Duration::from_secs(count),
        }
    }

    /// Whole units in `span`, truncated toward zero and saturating
    pub fn count(self, span: Duration) -> u64 {
        let whole = span.as_nanos() / self.unit().nanos() as u128;
        u64::try_from(whole).unwrap_or(u64::MAX)
    }
}

impl From<TimerPrecision> for TimeUnit {
    fn from(p: TimerPrecision) -> Self {
        p.unit()
    }
}

impl fmt::Display for TimerPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit().symbol())
    }
}

impl FromStr for TimerPrecision {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimerPrecision::ALL
            .into_iter()
            .find(|p| s == p.unit().symbol() || s == p.unit().name())
            .ok_or_else(|| {
                TimeError::InvalidPrecision {
                    value: s.to_string(),
                    valid: VALID_PRECISIONS,
                }
                .reported()
            })
    }
}

/// Delay tuning
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerConfig {
    /// Tail of a sleeping delay that is always busy-waited
    pub spin_threshold: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            spin_threshold: Duration::from_millis(1),
        }
    }
}

impl TimerConfig {
    /// Busy-wait a longer tail, trading CPU for wake-up accuracy
    pub fn low_latency() -> Self {
        TimerConfig {
            spin_threshold: Duration::from_millis(2),
        }
    }

    /// Busy-wait a shorter tail, trading wake-up accuracy for CPU
    pub fn power_saving() -> Self {
        TimerConfig {
            spin_threshold: Duration::from_micros(250),
        }
    }

    pub fn with_spin_threshold(mut self, spin_threshold: Duration) -> Self {
        self.spin_threshold = spin_threshold;
        self
    }
}

/// Segment units for `format_elapsed`, largest first
const SEGMENTS: [TimeUnit; 7] = [
    TimeUnit::Day,
    TimeUnit::Hour,
    TimeUnit::Minute,
    TimeUnit::Second,
    TimeUnit::Millisecond,
    TimeUnit::Microsecond,
    TimeUnit::Nanosecond,
];

/// Interval timer with lap recording and precise delays.
///
/// Not internally synchronized: mutating calls take `&mut self`.
pub struct IntervalTimer<C: Clock = MonotonicClock> {
    clock: C,
    /// Reading at construction or last reset
    reference: C::Instant,
    precision: TimerPrecision,
    laps: Vec<u64>,
    config: TimerConfig,
    hook: Option<Arc<dyn YieldHook>>,
}

impl IntervalTimer<MonotonicClock> {
    /// Create a timer on the OS monotonic clock
    pub fn new(precision: TimerPrecision) -> Self {
        Self::with_clock(MonotonicClock, precision)
    }
}

impl Default for IntervalTimer<MonotonicClock> {
    fn default() -> Self {
        Self::new(TimerPrecision::default())
    }
}

impl<C: Clock> IntervalTimer<C> {
    pub fn with_clock(clock: C, precision: TimerPrecision) -> Self {
        Self::with_config(clock, precision, TimerConfig::default())
    }

    pub fn with_config(clock: C, precision: TimerPrecision, config: TimerConfig) -> Self {
        let reference = clock.now();
        IntervalTimer {
            clock,
            reference,
            precision,
            laps: Vec::new(),
            config,
            hook: None,
        }
    }

    /// Install the hook released by non-blocking delays
    pub fn with_yield_hook(mut self, hook: Arc<dyn YieldHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn precision(&self) -> TimerPrecision {
        self.precision
    }

    pub fn set_precision(&mut self, precision: TimerPrecision) {
        tracing::trace!(from = %self.precision, to = %precision, "timer precision changed");
        self.precision = precision;
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Span since the reference instant
    pub fn elapsed_duration(&self) -> Duration {
        self.clock.duration_since(self.clock.now(), self.reference)
    }

    /// Whole precision units since the reference instant
    pub fn elapsed(&self) -> u64 {
        self.precision.count(self.elapsed_duration())
    }

    /// Restart from now and drop all laps
    pub fn reset(&mut self) {
        self.reference = self.clock.now();
        self.laps.clear();
        tracing::trace!("timer reset");
    }

    /// Wait `duration` precision units, measured from a fresh start point.
    ///
    /// Without `allow_sleep` the whole wait is busy. With it, the processor is
    /// yielded until only `spin_threshold` remains, then the tail is busy.
    /// Unless `block` is set, the installed yield hook is released for the
    /// duration of the wait.
    pub fn delay(&self, duration: u64, allow_sleep: bool, block: bool) {
        let target = self.precision.duration(duration);
        tracing::trace!(
            duration,
            precision = %self.precision,
            allow_sleep,
            block,
            "delay"
        );

        let _released = match (&self.hook, block) {
            (Some(hook), false) => Some(Released::new(&**hook)),
            _ => None,
        };

        let start = self.clock.now();
        if allow_sleep {
            loop {
                let waited = self.clock.duration_since(self.clock.now(), start);
                let remaining = target.saturating_sub(waited);
                if remaining <= self.config.spin_threshold {
                    break;
                }
                self.clock.sleep(remaining - self.config.spin_threshold);
            }
        }
        while self.clock.duration_since(self.clock.now(), start) < target {
            std::hint::spin_loop();
        }
        tracing::trace!("delay finished");
    }

    /// Record the current elapsed value as a lap and restart the reference
    /// instant. Earlier laps are kept.
    pub fn lap(&mut self) -> u64 {
        let duration = self.elapsed();
        self.laps.push(duration);
        self.reference = self.clock.now();
        tracing::trace!(lap = duration, count = self.laps.len(), "lap recorded");
        duration
    }

    /// Laps recorded since the last reset, oldest first
    pub fn laps(&self) -> &[u64] {
        &self.laps
    }

    /// Render the elapsed time as e.g. `"1 m 30 s"` or `"1.5 ms"`.
    ///
    /// All segments but the last are whole counts; the last keeps up to three
    /// decimals. At most `max_fields` segments are emitted (at least one).
    /// Zero renders as `0` followed by the precision symbol, e.g. `"0s"`.
    pub fn format_elapsed(&self, max_fields: usize) -> String {
        let elapsed = self.elapsed();
        if elapsed == 0 {
            return format!("0{}", self.precision);
        }
        let max_fields = max_fields.max(1);

        let mut remaining = elapsed as u128 * self.precision.unit().nanos() as u128;
        let mut parts: Vec<String> = Vec::new();
        for unit in SEGMENTS {
            let size = unit.nanos() as u128;
            if remaining < size {
                continue;
            }
            if parts.len() + 1 == max_fields || unit == TimeUnit::Nanosecond {
                let count = remaining as f64 / size as f64;
                let rounded = (count * 1000.0).round() / 1000.0;
                parts.push(format!("{} {}", rounded, unit));
                break;
            }
            let whole = remaining / size;
            parts.push(format!("{} {}", whole, unit));
            remaining -= whole * size;
        }
        parts.join(" ")
    }

    /// Endless iterator yielding 1, 2, 3, ... each after one `delay(interval)`
    pub fn poll(&self, interval: u64, allow_sleep: bool, block: bool) -> Poll<'_, C> {
        Poll {
            timer: self,
            interval,
            allow_sleep,
            block,
            count: 0,
        }
    }
}

impl<C: Clock> fmt::Debug for IntervalTimer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("precision", &self.precision)
            .field("elapsed", &self.elapsed())
            .field("laps", &self.laps.len())
            .finish()
    }
}

/// Iterator returned by [`IntervalTimer::poll`]
pub struct Poll<'a, C: Clock> {
    timer: &'a IntervalTimer<C>,
    interval: u64,
    allow_sleep: bool,
    block: bool,
    count: u64,
}

impl<C: Clock> Iterator for Poll<'_, C> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.timer.delay(self.interval, self.allow_sleep, self.block);
        self.count += 1;
        Some(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manual(precision: TimerPrecision) -> (ManualClock, IntervalTimer<ManualClock>) {
        let clock = ManualClock::new();
        let timer = IntervalTimer::with_clock(clock.clone(), precision);
        (clock, timer)
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("ns".parse::<TimerPrecision>().unwrap(), TimerPrecision::Nanosecond);
        assert_eq!("millisecond".parse::<TimerPrecision>().unwrap(), TimerPrecision::Millisecond);
        assert_eq!(TimerPrecision::default().to_string(), "us");

        let err = "m".parse::<TimerPrecision>().unwrap_err();
        assert_eq!(
            err,
            TimeError::InvalidPrecision {
                value: "m".into(),
                valid: VALID_PRECISIONS,
            }
        );
        assert!("invalid".parse::<TimerPrecision>().unwrap_err().to_string().contains("ns, us, ms, s"));
    }

    #[test]
    fn test_precision_duration_and_count() {
        assert_eq!(TimerPrecision::Second.duration(2), Duration::from_secs(2));
        assert_eq!(TimerPrecision::Microsecond.count(Duration::from_nanos(2_999)), 2);
        assert_eq!(TimerPrecision::Nanosecond.count(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_elapsed_and_precision_switch() {
        let (clock, mut timer) = manual(TimerPrecision::Nanosecond);
        assert_eq!(timer.elapsed(), 0);

        clock.advance(Duration::from_nanos(1_500_700));
        assert_eq!(timer.elapsed(), 1_500_700);

        timer.set_precision(TimerPrecision::Microsecond);
        assert_eq!(timer.elapsed(), 1_500);

        timer.set_precision(TimerPrecision::Millisecond);
        assert_eq!(timer.elapsed(), 1);
        assert_eq!(timer.precision(), TimerPrecision::Millisecond);

        timer.set_precision(TimerPrecision::Second);
        assert_eq!(timer.elapsed(), 0);
    }

    #[test]
    fn test_reset_restarts_and_clears_laps() {
        let (clock, mut timer) = manual(TimerPrecision::Millisecond);
        clock.advance(Duration::from_millis(5));
        timer.lap();
        clock.advance(Duration::from_millis(5));
        timer.lap();
        assert_eq!(timer.laps().len(), 2);

        clock.advance(Duration::from_millis(3));
        timer.reset();
        assert!(timer.laps().is_empty());
        assert_eq!(timer.elapsed(), 0);
    }

    #[test]
    fn test_laps_record_and_restart() {
        let (clock, mut timer) = manual(TimerPrecision::Millisecond);
        assert!(timer.laps().is_empty());

        let mut returned = Vec::new();
        for ms in [10, 5, 7] {
            clock.advance(Duration::from_millis(ms));
            let lap = timer.lap();
            assert_eq!(lap, ms);
            assert!(timer.elapsed() < lap);
            returned.push(lap);
        }
        assert_eq!(timer.laps(), returned.as_slice());
    }

    #[test]
    fn test_laps_on_real_clock() {
        let mut timer = IntervalTimer::new(TimerPrecision::Microsecond);
        let mut returned = Vec::new();
        for _ in 0..3 {
            timer.delay(200, false, false);
            let lap = timer.lap();
            assert!(lap >= 200);
            assert!(timer.elapsed() < lap);
            returned.push(lap);
        }
        assert_eq!(timer.laps(), returned.as_slice());
    }

    #[test]
    fn test_busy_delay_on_real_clock() {
        let timer = IntervalTimer::new(TimerPrecision::Nanosecond);
        timer.delay(1000, false, false);
        assert!(timer.elapsed() >= 1000);

        let timer = IntervalTimer::new(TimerPrecision::Millisecond);
        timer.delay(3, true, true);
        assert!(timer.elapsed() >= 3);
    }

    /// Manual clock that journals every sleep request
    #[derive(Clone, Default)]
    struct SleepJournal {
        inner: ManualClock,
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl Clock for SleepJournal {
        type Instant = Duration;

        fn now(&self) -> Duration {
            self.inner.now()
        }

        fn duration_since(&self, later: Duration, earlier: Duration) -> Duration {
            self.inner.duration_since(later, earlier)
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
            self.inner.sleep(duration);
        }
    }

    fn journal() -> SleepJournal {
        SleepJournal {
            inner: ManualClock::with_auto_advance(Duration::from_micros(1)),
            sleeps: Arc::default(),
        }
    }

    #[test]
    fn test_sleeping_delay_spins_the_tail() {
        let clock = journal();
        let timer = IntervalTimer::with_clock(clock.clone(), TimerPrecision::Millisecond);
        let before = clock.inner.elapsed();

        timer.delay(5, true, false);

        let sleeps = clock.sleeps.lock().clone();
        assert_eq!(sleeps.len(), 1);
        assert!(sleeps[0] < Duration::from_millis(4));
        assert!(sleeps[0] > Duration::from_micros(3_900));
        assert!(clock.inner.elapsed() - before >= Duration::from_millis(5));
    }

    #[test]
    fn test_busy_delay_never_sleeps() {
        let clock = journal();
        let timer = IntervalTimer::with_clock(clock.clone(), TimerPrecision::Microsecond);

        timer.delay(300, false, false);

        assert!(clock.sleeps.lock().is_empty());
        assert!(clock.inner.elapsed() >= Duration::from_micros(300));
    }

    #[test]
    fn test_short_sleeping_delay_only_spins() {
        let clock = journal();
        let config = TimerConfig::default().with_spin_threshold(Duration::from_millis(1));
        let timer = IntervalTimer::with_config(clock.clone(), TimerPrecision::Microsecond, config);

        timer.delay(800, true, false);

        assert!(clock.sleeps.lock().is_empty());
    }

    #[test]
    fn test_config_presets_set_spin_tail() {
        for (config, slept) in [
            (TimerConfig::low_latency(), Duration::from_micros(2_999)),
            (TimerConfig::power_saving(), Duration::from_micros(4_749)),
        ] {
            let clock = journal();
            let timer = IntervalTimer::with_config(clock.clone(), TimerPrecision::Millisecond, config);

            timer.delay(5, true, true);

            assert_eq!(*clock.sleeps.lock(), vec![slept]);
        }
    }

    #[test]
    fn test_delay_is_independent_of_reference() {
        let clock = ManualClock::with_auto_advance(Duration::from_micros(1));
        let mut timer = IntervalTimer::with_clock(clock.clone(), TimerPrecision::Microsecond);
        clock.advance(Duration::from_millis(10));
        timer.lap();

        // A fresh start point: the 10ms already on the clock do not count
        let before = clock.elapsed();
        timer.delay(50, false, false);
        assert!(clock.elapsed() - before >= Duration::from_micros(50));
        assert_eq!(timer.laps().len(), 1);
    }

    #[derive(Default)]
    struct CountingHook {
        released: AtomicUsize,
        reacquired: AtomicUsize,
    }

    impl YieldHook for CountingHook {
        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }

        fn reacquire(&self) {
            self.reacquired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_block_controls_yield_hook() {
        let hook = Arc::new(CountingHook::default());
        let clock = ManualClock::with_auto_advance(Duration::from_micros(1));
        let timer = IntervalTimer::with_clock(clock, TimerPrecision::Microsecond)
            .with_yield_hook(hook.clone());

        timer.delay(10, false, true);
        assert_eq!(hook.released.load(Ordering::SeqCst), 0);

        timer.delay(10, true, false);
        assert_eq!(hook.released.load(Ordering::SeqCst), 1);
        assert_eq!(hook.reacquired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_format_elapsed() {
        let (clock, mut timer) = manual(TimerPrecision::Second);
        assert_eq!(timer.format_elapsed(2), "0s");

        clock.advance(Duration::from_secs(90));
        assert_eq!(timer.format_elapsed(2), "1 m 30 s");
        assert_eq!(timer.format_elapsed(1), "1.5 m");
        assert_eq!(timer.format_elapsed(0), "1.5 m");

        clock.advance(Duration::from_secs(2 * 86_400 + 3 * 3_600 - 90));
        assert_eq!(timer.format_elapsed(2), "2 d 3 h");
        assert_eq!(timer.format_elapsed(7), "2 d 3 h");

        timer.set_precision(TimerPrecision::Nanosecond);
        timer.reset();
        clock.advance(Duration::from_nanos(1_234_567));
        assert_eq!(timer.format_elapsed(2), "1 ms 234.567 us");
        assert_eq!(timer.format_elapsed(3), "1 ms 234 us 567 ns");
        assert_eq!(timer.format_elapsed(1), "1.235 ms");

        timer.reset();
        clock.advance(Duration::from_nanos(500));
        assert_eq!(timer.format_elapsed(2), "500 ns");

        timer.set_precision(TimerPrecision::Millisecond);
        assert_eq!(timer.format_elapsed(2), "0ms");
    }

    #[test]
    fn test_poll_counts_from_one() {
        let clock = ManualClock::with_auto_advance(Duration::from_micros(1));
        let timer = IntervalTimer::with_clock(clock.clone(), TimerPrecision::Millisecond);

        let counts: Vec<u64> = timer.poll(1, false, false).take(3).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(clock.elapsed() >= Duration::from_millis(3));

        let mut seen = Vec::new();
        for count in timer.poll(1, true, false) {
            seen.push(count);
            if count >= 2 {
                break;
            }
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_debug_output() {
        let (_clock, timer) = manual(TimerPrecision::Millisecond);
        let repr = format!("{:?}", timer);
        assert!(repr.contains("Millisecond"));
        assert!(repr.contains("elapsed: 0"));
    }

    proptest! {
        #[test]
        fn format_respects_field_budget(nanos in 1u64..=u64::MAX / 2, max_fields in 1usize..=7) {
            let (clock, timer) = manual(TimerPrecision::Nanosecond);
            clock.advance(Duration::from_nanos(nanos));
            let rendered = timer.format_elapsed(max_fields);
            let segments = rendered.split(' ').count() / 2;
            prop_assert!(segments >= 1 && segments <= max_fields);
        }

        #[test]
        fn coarser_precision_is_truncated_finer(nanos in 0u64..=u64::MAX / 2) {
            let (clock, mut timer) = manual(TimerPrecision::Nanosecond);
            clock.advance(Duration::from_nanos(nanos));
            let fine = timer.elapsed();
            for precision in TimerPrecision::ALL {
                timer.set_precision(precision);
                let per_unit = precision.unit().nanos() as u64;
                prop_assert_eq!(timer.elapsed(), fine / per_unit);
            }
        }
    }
}
