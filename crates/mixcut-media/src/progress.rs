//! Engine progress reporting.

/// Snapshot of the engine's `-progress` output.
#[derive(Debug, Clone, Default)]
pub struct EngineProgress {
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Frames written so far
    pub frame: u64,
    /// Current encode rate in frames per second
    pub fps: f64,
    /// Encode speed relative to realtime (1.0 = realtime)
    pub speed: f64,
    /// Whether the engine reported the final progress block
    pub is_complete: bool,
}

impl EngineProgress {
    /// Percentage of a run of known duration, clamped to [0, 100].
    pub fn percent(&self, duration_secs: f64) -> f32 {
        if duration_secs <= 0.0 {
            return 0.0;
        }
        let pct = (self.out_time_ms as f64 / 1000.0) / duration_secs * 100.0;
        pct.clamp(0.0, 100.0) as f32
    }
}

/// Parse one line of the engine's `-progress` key=value output.
///
/// Fields accumulate into `current`; the terminating `progress=` key flushes
/// a snapshot.
pub fn parse_progress_line(line: &str, current: &mut EngineProgress) -> Option<EngineProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            "out_time_ms" | "out_time_us" => {
                // Both keys report microseconds in modern builds.
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    current.fps = fps;
                }
            }
            "speed" => {
                if value != "N/A" {
                    if let Some(speed_str) = value.strip_suffix('x') {
                        if let Ok(speed) = speed_str.parse() {
                            current.speed = speed;
                        }
                    }
                }
            }
            "progress" => {
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parsing() {
        let mut progress = EngineProgress::default();

        assert!(parse_progress_line("out_time_ms=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=continue", &mut progress);
        assert!(snapshot.is_some());
        assert!(!snapshot.unwrap().is_complete);

        let done = parse_progress_line("progress=end", &mut progress).unwrap();
        assert!(done.is_complete);
    }

    #[test]
    fn test_percent() {
        let progress = EngineProgress {
            out_time_ms: 5_000,
            ..Default::default()
        };
        assert!((progress.percent(10.0) - 50.0).abs() < 0.01);
        assert_eq!(progress.percent(0.0), 0.0);

        let over = EngineProgress {
            out_time_ms: 20_000,
            ..Default::default()
        };
        assert_eq!(over.percent(10.0), 100.0);
    }
}
