//! Trace replay application.
//!
//! Replays a recorded sample trace through the conditioner at a fixed frame
//! interval, driving the level grid, heat field and beep scheduler the way a
//! live host would, and optionally runs a synthetic calibration first.

use crate::{
    calibration::{AffineTransform, CalibrationOutcome, SessionEvent},
    conditioner::{FrameOutput, GazeConditioner},
    config::Config,
    dwell::DwellLevel,
    feed::{self, SampleReceiver},
    feedback::{level_blip, BeepScheduler, HeatBrush, HeatField, LevelGrid},
    geometry::{Point, RawSample},
    Error, Result,
};
use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Pending ticks the replay feed can hold between frames
const FEED_CAPACITY: usize = 256;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Trace file to replay
    pub trace: Option<PathBuf>,
    /// Frame interval in milliseconds
    pub frame_ms: f64,
    /// Screen size used for calibration targets and feedback grids
    pub screen: (f64, f64),
    /// Run a synthetic calibration whose raw samples are offset by this amount
    pub calibrate_offset: Option<(f64, f64)>,
    /// Seed for beep jitter and synthetic calibration noise
    pub seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            trace: None,
            frame_ms: 1000.0 / 60.0,
            screen: (1280.0, 720.0),
            calibrate_offset: None,
            seed: 0,
        }
    }
}

/// One line of a sample trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceEntry {
    /// Arrival time in milliseconds
    pub t_ms: f64,
    /// Sample, or `None` for a tick without prediction
    pub sample: Option<RawSample>,
}

/// Parse a trace: `x y t_ms` per line, `- t_ms` for an empty tick, `#` comments
///
/// A bare `-` reuses the previous line's timestamp. Timestamps must not go
/// backwards.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>> {
    let mut entries: Vec<TraceEntry> = Vec::new();

    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw_line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let number = |field: &str, what: &str| {
            field.parse::<f64>().map_err(|_| Error::TraceParse {
                line: line_no,
                msg: format!("invalid {what} '{field}'"),
            })
        };
        let previous_t = entries.last().map_or(0.0, |e| e.t_ms);

        let fields: Vec<&str> = line.split_whitespace().collect();
        let entry = match fields.as_slice() {
            ["-"] => TraceEntry {
                t_ms: previous_t,
                sample: None,
            },
            ["-", t] => TraceEntry {
                t_ms: number(t, "timestamp")?,
                sample: None,
            },
            [x, y, t] => {
                let t_ms = number(t, "timestamp")?;
                TraceEntry {
                    t_ms,
                    sample: Some(RawSample::new(number(x, "x")?, number(y, "y")?, t_ms)),
                }
            }
            _ => {
                return Err(Error::TraceParse {
                    line: line_no,
                    msg: format!("expected 'x y t_ms' or '- t_ms', got '{line}'"),
                })
            }
        };

        if !entry.t_ms.is_finite() {
            return Err(Error::TraceParse {
                line: line_no,
                msg: "timestamp must be finite".to_string(),
            });
        }
        if entry.t_ms < previous_t {
            return Err(Error::TraceParse {
                line: line_no,
                msg: format!("timestamp {} goes backwards (previous {})", entry.t_ms, previous_t),
            });
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Read and parse a trace file
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceEntry>> {
    let text = std::fs::read_to_string(path)?;
    parse_trace(&text)
}

/// Totals gathered over a replay
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplaySummary {
    /// Frames produced
    pub frames: usize,
    /// Frames with signal
    pub frames_with_signal: usize,
    /// Samples dropped by the jump gate
    pub rejected: u64,
    /// Ticks dropped because the feed was full
    pub feed_dropped: u64,
    /// Highest intensity seen
    pub peak_intensity: f64,
    /// Highest level reached
    pub peak_level: DwellLevel,
    /// Beeps scheduled, including level-up blips
    pub beeps: usize,
    /// Last frame produced
    pub last_frame: Option<FrameOutput>,
}

/// Trace replay application
pub struct DwellApp {
    config: AppConfig,
    settings: Config,
    conditioner: GazeConditioner,
    levels: LevelGrid,
    heat: HeatField,
    brush: HeatBrush,
    beeps: BeepScheduler,
    rng: StdRng,
}

impl DwellApp {
    /// Create a new replay application
    pub fn new(config: AppConfig, settings: Config) -> Result<Self> {
        info!("Initializing gaze dwell replay");
        settings.validate()?;
        if !(config.frame_ms > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Frame interval must be positive, got {}",
                config.frame_ms
            )));
        }
        let (width, height) = config.screen;
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::InvalidInput(format!("Invalid screen size {width}x{height}")));
        }

        let conditioner = settings.build_conditioner()?;
        let cell = settings.feedback.cell_size;
        #[allow(clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let (cols, rows) = (
            (width / cell).ceil().max(1.0) as usize,
            (height / cell).ceil().max(1.0) as usize,
        );
        let levels = LevelGrid::new(cols, rows, cell, settings.level_timing());
        let heat = HeatField::covering(width, height, 4.0);
        let brush = settings.heat_brush();
        info!("Level grid {}x{} cells of {} px", cols, rows, cell);

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            conditioner,
            levels,
            heat,
            brush,
            beeps: BeepScheduler::new(),
            settings,
        })
    }

    /// Run whatever the configuration asks for
    pub fn run(&mut self) -> Result<Option<ReplaySummary>> {
        if let Some((dx, dy)) = self.config.calibrate_offset {
            let outcome = self.calibrate_synthetic(dx, dy)?;
            self.conditioner.set_transform(outcome.transform());
        }

        let Some(path) = self.config.trace.clone() else {
            return Ok(None);
        };
        info!("Loading trace from: {}", path.display());
        let entries = load_trace(&path)?;
        info!("Replaying {} trace entries", entries.len());
        let summary = self.replay(&entries);
        info!(
            "Replay finished: {} frames ({} with signal), {} rejected, peak intensity {:.2}, peak level {}",
            summary.frames,
            summary.frames_with_signal,
            summary.rejected,
            summary.peak_intensity,
            summary.peak_level.value()
        );
        Ok(Some(summary))
    }

    /// Replay trace entries through the feed at the configured frame interval
    ///
    /// Frames run from the first entry until one frame past the hold window
    /// that follows the last, so the replay always ends without signal.
    pub fn replay(&mut self, entries: &[TraceEntry]) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            warn!("Empty trace, nothing to replay");
            return summary;
        };

        let (tx, rx) = feed::channel(FEED_CAPACITY);
        let end_ms = last.t_ms + self.settings.conditioner.hold_ms + self.config.frame_ms;
        let mut now = first.t_ms;
        let mut next = 0;
        let mut previous_level = DwellLevel::default();

        while now <= end_ms {
            while let Some(entry) = entries.get(next).filter(|e| e.t_ms <= now) {
                tx.offer(entry.sample);
                next += 1;
            }

            let frame = self.step(&rx, now);
            summary.frames += 1;
            if frame.has_signal {
                summary.frames_with_signal += 1;
            }
            summary.peak_intensity = summary.peak_intensity.max(frame.dwell_intensity);
            summary.peak_level = summary.peak_level.max(frame.level);

            if frame.level > previous_level {
                let blip = level_blip(frame.level, now);
                debug!("Level up to {} at {:.0} ms ({} Hz blip)", frame.level.value(), now, blip.freq_hz);
                summary.beeps += 1;
            }
            previous_level = frame.level;
            summary.beeps += self.beeps.poll(now, frame.level, &mut self.rng).len();

            summary.last_frame = Some(frame);
            now += self.config.frame_ms;
        }

        summary.rejected = self.conditioner.rejected_count();
        summary.feed_dropped = rx.dropped();
        if summary.feed_dropped > 0 {
            warn!("{} trace ticks dropped by a full feed", summary.feed_dropped);
        }
        summary
    }

    /// Drain the feed and produce one frame, updating the feedback state
    fn step(&mut self, rx: &SampleReceiver, now: f64) -> FrameOutput {
        let consumed = rx.drain_into(&mut self.conditioner);
        let frame = self.conditioner.frame(now);
        trace!(
            "t={:.0} consumed={} display=({:.1}, {:.1}) intensity={:.2} signal={}",
            now,
            consumed,
            frame.display_x,
            frame.display_y,
            frame.dwell_intensity,
            frame.has_signal
        );

        let point = frame.has_signal.then(|| frame.display());
        self.levels.observe(point, now);
        self.levels.decay(now);
        let dwell = frame.dwell.map_or(0.0, |d| d.dwell_seconds);
        self.brush.apply(&mut self.heat, point, dwell);
        frame
    }

    /// Calibrate against simulated samples offset from each target
    ///
    /// The fitted transform is returned in the outcome; applying it is up to
    /// the caller.
    pub fn calibrate_synthetic(&mut self, dx: f64, dy: f64) -> Result<CalibrationOutcome> {
        let (width, height) = self.config.screen;
        let mut session = self.settings.calibration_session(width, height)?;
        info!("Running synthetic calibration with offset ({}, {})", dx, dy);

        let mut now = 0.0;
        session.start(now);
        loop {
            if let Some((_, target)) = session.current_target() {
                let jitter = Point::new(self.rng.gen_range(-1.0..1.0), self.rng.gen_range(-1.0..1.0));
                session.observe(Some(RawSample::new(target.x + dx + jitter.x, target.y + dy + jitter.y, now)));
            }
            match session.tick(now) {
                SessionEvent::Finished(outcome) => {
                    log_outcome(&outcome);
                    return Ok(outcome);
                }
                SessionEvent::Idle => {
                    return Err(Error::InvalidInput("Calibration session stopped unexpectedly".to_string()));
                }
                SessionEvent::Collecting { .. } | SessionEvent::TargetAdvanced { .. } => {}
            }
            now += self.config.frame_ms;
        }
    }

    /// Level grid state
    #[must_use]
    pub const fn levels(&self) -> &LevelGrid {
        &self.levels
    }

    /// Heat field state
    #[must_use]
    pub const fn heat(&self) -> &HeatField {
        &self.heat
    }

    /// Transform currently applied by the conditioner
    #[must_use]
    pub const fn transform(&self) -> &AffineTransform {
        self.conditioner.transform()
    }
}

fn log_outcome(outcome: &CalibrationOutcome) {
    let [rx, ry] = outcome.transform().rows;
    match outcome {
        CalibrationOutcome::Calibrated {
            rms_error,
            kept,
            discarded,
            ..
        } => info!(
            "Calibrated: x' = {:.4}x + {:.4}y + {:.2}, y' = {:.4}x + {:.4}y + {:.2} (rms {:.2} px, {} kept, {} discarded)",
            rx[0], rx[1], rx[2], ry[0], ry[1], ry[2], rms_error, kept, discarded
        ),
        CalibrationOutcome::InsufficientData { reason, .. } => {
            warn!("Calibration incomplete: {:?}", reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let text = "# header\n100 200 0\n\n- 16\n101 201 33 # trailing\n-\n";
        let entries = parse_trace(text).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].sample, Some(RawSample::new(100.0, 200.0, 0.0)));
        assert_eq!(entries[1], TraceEntry { t_ms: 16.0, sample: None });
        assert_eq!(entries[3], TraceEntry { t_ms: 33.0, sample: None });
    }

    #[test]
    fn test_parse_trace_errors() {
        match parse_trace("1 2 0\n1 2\n") {
            Err(Error::TraceParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_trace("a 2 0"), Err(Error::TraceParse { line: 1, .. })));
        assert!(matches!(parse_trace("1 2 10\n1 2 5"), Err(Error::TraceParse { line: 2, .. })));
        assert!(matches!(parse_trace("1 2 inf"), Err(Error::TraceParse { line: 1, .. })));
    }

    #[test]
    fn test_replay_steady_gaze_reaches_max_level() {
        let mut app = DwellApp::new(AppConfig::default(), Config::default()).unwrap();
        let entries: Vec<TraceEntry> = (0..200)
            .map(|i| {
                let t = f64::from(i) * 16.0;
                TraceEntry {
                    t_ms: t,
                    sample: Some(RawSample::new(400.0, 300.0, t)),
                }
            })
            .collect();

        let summary = app.replay(&entries);
        assert!(summary.frames > 190);
        assert_eq!(summary.peak_level, DwellLevel::new(3));
        assert!((summary.peak_intensity - 1.0).abs() < 1e-9);
        assert!(summary.beeps > 0);
        assert_eq!(summary.rejected, 0);

        // Signal is gone by the end of the hold tail
        let last = summary.last_frame.unwrap();
        assert!(!last.has_signal);
        assert_eq!(last.dwell_intensity, 0.0);
    }

    #[test]
    fn test_levels_cool_down_after_signal_ends() {
        let mut app = DwellApp::new(AppConfig::default(), Config::default()).unwrap();
        let steady: Vec<TraceEntry> = (0..200)
            .map(|i| {
                let t = f64::from(i) * 16.0;
                TraceEntry {
                    t_ms: t,
                    sample: Some(RawSample::new(400.0, 300.0, t)),
                }
            })
            .collect();
        app.replay(&steady);
        assert_eq!(app.levels().levels().iter().max(), Some(&3));

        // Twenty seconds of empty ticks after the first replay's hold tail
        let silent: Vec<TraceEntry> = (240..1490)
            .map(|i| TraceEntry {
                t_ms: f64::from(i) * 16.0,
                sample: None,
            })
            .collect();
        let summary = app.replay(&silent);
        assert_eq!(summary.frames_with_signal, 0);
        assert!(app.levels().levels().iter().all(|&level| level == 0));
    }

    #[test]
    fn test_replay_empty_trace() {
        let mut app = DwellApp::new(AppConfig::default(), Config::default()).unwrap();
        assert_eq!(app.replay(&[]), ReplaySummary::default());
    }

    #[test]
    fn test_synthetic_calibration_recovers_offset() {
        let mut app = DwellApp::new(AppConfig::default(), Config::default()).unwrap();
        let outcome = app.calibrate_synthetic(50.0, -30.0).unwrap();
        assert!(outcome.is_calibrated());
        let corrected = outcome.transform().apply(Point::new(690.0, 330.0));
        assert!((corrected.x - 640.0).abs() < 1.0);
        assert!((corrected.y - 360.0).abs() < 1.0);
    }

    #[test]
    fn test_invalid_frame_interval() {
        let config = AppConfig {
            frame_ms: 0.0,
            ..AppConfig::default()
        };
        assert!(matches!(
            DwellApp::new(config, Config::default()),
            Err(Error::InvalidInput(_))
        ));
    }
}
