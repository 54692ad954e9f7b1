use rand::Rng;

use crate::dwell::DwellLevel;

/// One beep to synthesize
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beep {
    /// When to start, on the caller's clock
    pub at_ms: f64,
    /// Tone frequency
    pub freq_hz: f64,
    /// Tone length
    pub duration_secs: f64,
    /// Peak gain in `[0, 1]`
    pub volume: f64,
}

const BLIP_FREQS: [f64; 4] = [520.0, 880.0, 660.0, 980.0];

const SINGLE_PERIOD_MS: f64 = 650.0;
const BURST_PERIOD_MS: f64 = 800.0;
const BURST_COUNT: usize = 3;
const BURST_SPACING_MS: f64 = 110.0;

/// Short confirmation tone played when a level rises
#[must_use]
pub fn level_blip(level: DwellLevel, at_ms: f64) -> Beep {
    Beep {
        at_ms,
        freq_hz: BLIP_FREQS[usize::from(level.value()).min(BLIP_FREQS.len() - 1)],
        duration_secs: 0.1,
        volume: 0.65,
    }
}

/// Repeating beep pattern keyed by dwell level
///
/// Level 1 plays a single beep every 650 ms, level 2 a burst of three every
/// 800 ms, level 3 a near-continuous stream with randomised 70-120 ms gaps.
/// Level 0 is silent. A level change restarts the
/// pattern.
#[derive(Debug, Clone, Default)]
pub struct BeepScheduler {
    level: DwellLevel,
    next_ms: Option<f64>,
}

impl BeepScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Beeps due at `now_ms`
    ///
    /// Pass level 0 while there is no signal to silence the pattern.
    pub fn poll<R: Rng + ?Sized>(&mut self, now_ms: f64, level: DwellLevel, rng: &mut R) -> Vec<Beep> {
        if level.value() == 0 {
            self.level = level;
            self.next_ms = None;
            return Vec::new();
        }

        if level != self.level || self.next_ms.is_none() {
            self.level = level;
            self.next_ms = Some(now_ms + Self::first_delay(level));
        }

        match self.next_ms {
            Some(next) if next <= now_ms => {}
            _ => return Vec::new(),
        }

        let (beeps, period) = Self::pattern(level, now_ms, rng);
        self.next_ms = Some(now_ms + period);
        beeps
    }

    fn first_delay(level: DwellLevel) -> f64 {
        match level.value() {
            1 => SINGLE_PERIOD_MS,
            2 => BURST_PERIOD_MS,
            _ => 0.0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn pattern<R: Rng + ?Sized>(level: DwellLevel, now_ms: f64, rng: &mut R) -> (Vec<Beep>, f64) {
        match level.value() {
            1 => (
                vec![Beep {
                    at_ms: now_ms,
                    freq_hz: 880.0,
                    duration_secs: 0.11,
                    volume: 0.65,
                }],
                SINGLE_PERIOD_MS,
            ),
            2 => (
                (0..BURST_COUNT)
                    .map(|i| Beep {
                        at_ms: (i as f64).mul_add(BURST_SPACING_MS, now_ms),
                        freq_hz: rng.gen_range(740.0..880.0),
                        duration_secs: 0.095,
                        volume: 0.62,
                    })
                    .collect(),
                BURST_PERIOD_MS,
            ),
            _ => (
                vec![Beep {
                    at_ms: now_ms,
                    freq_hz: rng.gen_range(900.0..1140.0),
                    duration_secs: rng.gen_range(0.07..0.10),
                    volume: rng.gen_range(0.62..0.72),
                }],
                rng.gen_range(70.0..120.0),
            ),
        }
    }

    /// Time of the next scheduled beep
    #[must_use]
    pub const fn next_due(&self) -> Option<f64> {
        self.next_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_silent_at_level_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut scheduler = BeepScheduler::new();
        assert!(scheduler.poll(0.0, DwellLevel::new(0), &mut rng).is_empty());
        assert_eq!(scheduler.poll(10.0, DwellLevel::new(3), &mut rng).len(), 1);
        assert!(scheduler.poll(20.0, DwellLevel::new(0), &mut rng).is_empty());
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn test_single_beep_period() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut scheduler = BeepScheduler::new();
        let level = DwellLevel::new(1);
        assert!(scheduler.poll(0.0, level, &mut rng).is_empty());
        assert!(scheduler.poll(649.0, level, &mut rng).is_empty());

        let beeps = scheduler.poll(650.0, level, &mut rng);
        assert_eq!(beeps.len(), 1);
        assert_eq!(beeps[0].freq_hz, 880.0);
        assert_eq!(scheduler.next_due(), Some(1300.0));
    }

    #[test]
    fn test_burst_of_three() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scheduler = BeepScheduler::new();
        let level = DwellLevel::new(2);
        scheduler.poll(0.0, level, &mut rng);
        let beeps = scheduler.poll(800.0, level, &mut rng);
        assert_eq!(beeps.len(), 3);
        assert_eq!(beeps[2].at_ms, 1020.0);
        assert!(beeps.iter().all(|b| (740.0..880.0).contains(&b.freq_hz)));
    }

    #[test]
    fn test_rapid_beeps_start_immediately() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut scheduler = BeepScheduler::new();
        let level = DwellLevel::new(3);
        let beeps = scheduler.poll(100.0, level, &mut rng);
        assert_eq!(beeps.len(), 1);
        assert!((900.0..1140.0).contains(&beeps[0].freq_hz));

        let next = scheduler.next_due().unwrap();
        assert!((170.0..220.0).contains(&next));
    }

    #[test]
    fn test_level_blip_frequencies() {
        assert_eq!(level_blip(DwellLevel::new(0), 0.0).freq_hz, 520.0);
        assert_eq!(level_blip(DwellLevel::new(3), 0.0).freq_hz, 980.0);
    }
}
