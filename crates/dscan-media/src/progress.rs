//! FFmpeg `-progress` output parsing.

use serde::{Deserialize, Serialize};

/// Progress snapshot reported by FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

/// Feed one line of `-progress` output into `current`.
///
/// Returns a snapshot at the end of each progress block, and `None` for
/// lines that are not progress keys (FFmpeg diagnostics).
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub fn is_progress_line(line: &str) -> bool {
    const KEYS: &[&str] = &[
        "frame", "fps", "stream_", "bitrate", "total_size", "out_time", "dup_frames",
        "drop_frames", "speed", "progress",
    ];
    match line.split_once('=') {
        Some((key, _)) => KEYS.iter().any(|k| key.starts_with(k)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("frame=120", &mut progress).is_none());
        parse_progress_line("out_time_us=4000000", &mut progress);
        parse_progress_line("speed=2.5x", &mut progress);
        let snapshot = parse_progress_line("progress=continue", &mut progress).unwrap();

        assert_eq!(snapshot.frame, 120);
        assert_eq!(snapshot.out_time_ms, 4000);
        assert!((snapshot.speed - 2.5).abs() < 0.01);
        assert!(!snapshot.is_complete);

        let end = parse_progress_line("progress=end", &mut progress).unwrap();
        assert!(end.is_complete);
    }

    #[test]
    fn test_speed_not_available() {
        let mut progress = FfmpegProgress::default();
        parse_progress_line("speed=N/A", &mut progress);
        assert_eq!(progress.speed, 0.0);
    }

    #[test]
    fn test_diagnostics_are_not_progress() {
        assert!(is_progress_line("out_time_ms=100"));
        assert!(!is_progress_line("[mov,mp4] moov atom not found"));
        assert!(!is_progress_line("Invalid data found when processing input"));
    }
}
