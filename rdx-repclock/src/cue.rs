//! The cue table: which cues are due at each second of a run.
//!
//! Everything here is a pure function of the elapsed-second counter. The
//! scheduler owns timing; this module owns *what* happens at each second.

use crate::common::format_clock;
use serde::Serialize;

/// Length of one repetition cycle in seconds.
pub const REPETITION_DURATION_SECS: u32 = 6;

/// Display text shown while idle and during the lead-in cycle.
pub const IDLE_DISPLAY: &str = "00:00";

/// Display text shown once a run has completed.
pub const FINISH_DISPLAY: &str = "Finish!";

/// Spoken during the lead-in cycle.
pub const READY_SPEECH: &str = "Ready";

/// Spoken once a run has completed.
pub const FINISH_SPEECH: &str = "Finish";

/// The beat pattern of one repetition cycle: two intervals then a count,
/// twice over (eccentric, hold, concentric, pause).
const BEAT_PATTERN: [Sound; REPETITION_DURATION_SECS as usize] = [
    Sound::Interval,
    Sound::Interval,
    Sound::Count,
    Sound::Interval,
    Sound::Interval,
    Sound::Count,
];

/// A short sound effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sound {
    /// The filler beat, rendered as `.`.
    Interval,
    /// The accented beat, rendered as `*`.
    Count,
}

/// A discrete event due at a given second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cue {
    /// The rep counter advances to this number.
    RepUpdate(u32),
    /// Text to speak. A newer request interrupts an unfinished one.
    Speak(String),
    /// A sound effect to play.
    Sound(Sound),
}

/// The sound due at `second_in_cycle`. Repeats with the cycle length.
pub fn sound_for(second_in_cycle: u32) -> Sound {
    BEAT_PATTERN[(second_in_cycle % REPETITION_DURATION_SECS) as usize]
}

/// Total run length in seconds for `total_reps` reps after `lead_in_cycles`
/// lead-in cycles, or `None` if it does not fit in a `u32`.
pub fn total_duration_secs(total_reps: u32, lead_in_cycles: u32) -> Option<u32> {
    total_reps
        .checked_add(lead_in_cycles)?
        .checked_mul(REPETITION_DURATION_SECS)
}

/// All cues due at `elapsed_secs`, in emission order.
///
/// Rep updates and speech come before the sound so the display already shows
/// the new rep when the beat plays.
pub fn cues_for_tick(elapsed_secs: u32, lead_in_cycles: u32) -> Vec<Cue> {
    let second_in_cycle = elapsed_secs % REPETITION_DURATION_SECS;
    let mut cues = Vec::with_capacity(3);

    if second_in_cycle == 0 {
        let cycle_index = elapsed_secs / REPETITION_DURATION_SECS;
        if cycle_index < lead_in_cycles {
            cues.push(Cue::Speak(READY_SPEECH.to_string()));
        } else {
            let rep = cycle_index - lead_in_cycles + 1;
            cues.push(Cue::RepUpdate(rep));
            cues.push(Cue::Speak(rep.to_string()));
        }
    }

    cues.push(Cue::Sound(sound_for(second_in_cycle)));
    cues
}

/// The clock text shown at `elapsed_secs`.
///
/// Stays at `00:00` through the lead-in; afterwards counts up from `00:01`.
pub fn display_text(elapsed_secs: u32, lead_in_cycles: u32) -> String {
    let lead_in_secs = lead_in_cycles * REPETITION_DURATION_SECS;
    if elapsed_secs < lead_in_secs {
        IDLE_DISPLAY.to_string()
    } else {
        format_clock(elapsed_secs - lead_in_secs + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_pattern_repeats_every_cycle() {
        let expected = [
            Sound::Interval,
            Sound::Interval,
            Sound::Count,
            Sound::Interval,
            Sound::Interval,
            Sound::Count,
        ];
        for second in 0..36 {
            assert_eq!(sound_for(second), expected[(second % 6) as usize]);
        }
    }

    #[test]
    fn lead_in_cycle_speaks_ready_without_rep_update() {
        assert_eq!(
            cues_for_tick(0, 1),
            vec![Cue::Speak("Ready".into()), Cue::Sound(Sound::Interval)]
        );
        assert_eq!(cues_for_tick(2, 1), vec![Cue::Sound(Sound::Count)]);
    }

    #[test]
    fn cycle_start_updates_rep_before_speaking_and_sound() {
        assert_eq!(
            cues_for_tick(12, 1),
            vec![
                Cue::RepUpdate(2),
                Cue::Speak("2".into()),
                Cue::Sound(Sound::Interval)
            ]
        );
    }

    #[test]
    fn without_lead_in_first_second_announces_rep_one() {
        assert_eq!(
            cues_for_tick(0, 0),
            vec![
                Cue::RepUpdate(1),
                Cue::Speak("1".into()),
                Cue::Sound(Sound::Interval)
            ]
        );
        assert_eq!(cues_for_tick(6, 0)[0], Cue::RepUpdate(2));
    }

    #[test]
    fn display_holds_during_lead_in_then_counts_from_one() {
        for elapsed in 0..6 {
            assert_eq!(display_text(elapsed, 1), "00:00");
        }
        assert_eq!(display_text(6, 1), "00:01");
        assert_eq!(display_text(23, 1), "00:18");
        assert_eq!(display_text(0, 0), "00:01");
        assert_eq!(display_text(65, 1), "01:00");
    }

    #[test]
    fn total_duration_includes_lead_in() {
        assert_eq!(total_duration_secs(3, 1), Some(24));
        assert_eq!(total_duration_secs(3, 0), Some(18));
        assert_eq!(total_duration_secs(0, 1), Some(6));
    }

    #[test]
    fn oversized_run_has_no_duration() {
        assert_eq!(total_duration_secs(u32::MAX / 6, 1), None);
        assert_eq!(total_duration_secs(u32::MAX, 0), None);
        assert_eq!(total_duration_secs(u32::MAX / 6, 0), Some(u32::MAX / 6 * 6));
    }
}
