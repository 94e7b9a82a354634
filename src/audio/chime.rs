use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const CHIME_SECS: f32 = 0.9;

/// Two-note completion chime: a decaying sine that steps up a fourth
/// halfway through. Finite, mono.
pub struct CompletionChime {
    num_sample: usize,
    total_samples: usize,
}

impl CompletionChime {
    pub fn new() -> Self {
        Self {
            num_sample: 0,
            total_samples: (SAMPLE_RATE as f32 * CHIME_SECS) as usize,
        }
    }
}

impl Default for CompletionChime {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for CompletionChime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample += 1;

        let half = CHIME_SECS / 2.0;
        let (freq, note_t) = if t < half {
            (880.0, t)
        } else {
            (1174.66, t - half)
        };

        // Each note decays exponentially from its own onset.
        let amp = 0.2 * (-note_t * 6.0).exp();
        Some((2.0 * PI * freq * t).sin() * amp)
    }
}

impl Source for CompletionChime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(CHIME_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_is_finite_and_bounded() {
        let samples: Vec<f32> = CompletionChime::new().collect();
        assert_eq!(samples.len(), (SAMPLE_RATE as f32 * CHIME_SECS) as usize);
        assert!(samples.iter().all(|s| s.abs() <= 0.2));
    }
}
