use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
const DEFAULT_MAX_SAMPLES: usize = 64;

/// Sliding-window throughput estimate over acknowledged bytes.
///
/// Samples are `(instant, bytes)` pairs; only those inside the window count.
pub struct SpeedCalculator {
    samples: Mutex<VecDeque<(Instant, u64)>>,
    window: Duration,
    max_samples: usize,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_SAMPLES)
    }
}

impl SpeedCalculator {
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::new()),
            window,
            max_samples: max_samples.max(2),
        }
    }

    /// Records `bytes` transferred now.
    pub fn add_sample(&self, bytes: u64) {
        self.add_sample_at(bytes, Instant::now());
    }

    /// Records `bytes` transferred at `at`.
    pub fn add_sample_at(&self, bytes: u64, at: Instant) {
        let Ok(mut samples) = self.samples.lock() else {
            return;
        };
        samples.push_back((at, bytes));
        while let Some(&(first, _)) = samples.front() {
            if at.duration_since(first) > self.window || samples.len() > self.max_samples {
                samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Average bytes per second across the retained samples.
    ///
    /// Zero until two samples with distinct instants exist.
    pub fn bytes_per_second(&self) -> f64 {
        let Ok(samples) = self.samples.lock() else {
            return 0.0;
        };
        let (Some(&(first, _)), Some(&(last, _))) = (samples.front(), samples.back()) else {
            return 0.0;
        };
        let elapsed = last.duration_since(first);
        if elapsed.is_zero() {
            return 0.0;
        }
        // The first sample marks the start of the span; its bytes precede it.
        let bytes: u64 = samples.iter().skip(1).map(|&(_, b)| b).sum();
        bytes as f64 / elapsed.as_secs_f64()
    }

    /// Time left for `remaining` bytes at the current speed.
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        (speed > 0.0).then(|| Duration::from_secs_f64(remaining as f64 / speed))
    }

    pub fn reset(&self) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_two_samples() {
        let calc = SpeedCalculator::default();
        assert_eq!(calc.bytes_per_second(), 0.0);
        calc.add_sample(100);
        assert_eq!(calc.bytes_per_second(), 0.0);
        assert!(calc.eta(10).is_none());
    }

    #[test]
    fn steady_rate() {
        let calc = SpeedCalculator::new(Duration::from_secs(10), 16);
        let t0 = Instant::now();
        calc.add_sample_at(0, t0);
        calc.add_sample_at(1000, t0 + Duration::from_secs(1));
        calc.add_sample_at(1000, t0 + Duration::from_secs(2));

        assert!((calc.bytes_per_second() - 1000.0).abs() < 1e-6);
        let eta = calc.eta(5000).unwrap();
        assert!((eta.as_secs_f64() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn old_samples_leave_the_window() {
        let calc = SpeedCalculator::new(Duration::from_secs(2), 16);
        let t0 = Instant::now();
        calc.add_sample_at(0, t0);
        calc.add_sample_at(1_000_000, t0 + Duration::from_secs(1));
        calc.add_sample_at(100, t0 + Duration::from_secs(10));
        calc.add_sample_at(100, t0 + Duration::from_secs(11));

        assert!((calc.bytes_per_second() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn caps_sample_count() {
        let calc = SpeedCalculator::new(Duration::from_secs(60), 4);
        let t0 = Instant::now();
        for i in 0..20u64 {
            calc.add_sample_at(10, t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(calc.samples.lock().unwrap().len(), 4);
    }

    #[test]
    fn reset_clears() {
        let calc = SpeedCalculator::default();
        let t0 = Instant::now();
        calc.add_sample_at(1, t0);
        calc.add_sample_at(1, t0 + Duration::from_secs(1));
        calc.reset();
        assert_eq!(calc.bytes_per_second(), 0.0);
    }
}
