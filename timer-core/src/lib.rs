//! Pure focus-timer logic with no platform dependencies.
//! Every operation takes the current wall-clock reading as an argument.

mod engine;
mod preset;
mod state;

pub use engine::{Effect, Effects, TimerEngine};
pub use preset::{
    AlarmSound, FocusPreset, PresetError, MAX_PHASE_MINUTES, MAX_SESSIONS_BEFORE_LONG_BREAK,
};
pub use state::{Phase, TimerMode, TimerState};

/// Longest single wait the background scheduler arms before re-checking
/// the wall clock.
pub const MAX_CHUNK_MS: u64 = 60_000;

/// Length of the next wait toward `end_ms`. Zero means the target is due.
pub fn next_chunk_ms(end_ms: u64, now_ms: u64) -> u64 {
    end_ms.saturating_sub(now_ms).min(MAX_CHUNK_MS)
}

/// Format milliseconds as "MM:SS", rounding partial seconds up.
/// Minutes are not wrapped, so a 90 minute phase reads "90:00".
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms.div_ceil(1000);
    let m = total_secs / 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}", m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_bounded() {
        let now = 1_000_000;
        assert_eq!(next_chunk_ms(now + 150_000, now), 60_000);
        assert_eq!(next_chunk_ms(now + 30_000, now), 30_000);
        assert_eq!(next_chunk_ms(now, now), 0);
        assert_eq!(next_chunk_ms(now - 5_000, now), 0);
    }

    #[test]
    fn chunk_sequence_for_two_and_a_half_minutes() {
        let end = 150_000;
        let mut now = 0;
        let mut arms = Vec::new();
        loop {
            let chunk = next_chunk_ms(end, now);
            if chunk == 0 {
                break;
            }
            arms.push(chunk);
            now += chunk;
        }
        assert_eq!(arms, vec![60_000, 60_000, 30_000]);
    }

    #[test]
    fn format_ms_rounds_partial_seconds_up() {
        assert_eq!(format_ms(0), "00:00");
        assert_eq!(format_ms(1_500_000), "25:00");
        assert_eq!(format_ms(300_000), "05:00");
        assert_eq!(format_ms(1), "00:01");
        assert_eq!(format_ms(5_400_000), "90:00");
    }
}
