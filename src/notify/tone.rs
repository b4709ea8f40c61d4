use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

/// Short sine tone with a linear fade-out
/// Replaces the bundled cue sound files with a generated source
pub struct Tone {
    freq: f32,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl Tone {
    pub fn new(freq: f32, duration: Duration) -> Self {
        let sample_rate = 44100;
        Self {
            freq,
            sample_rate,
            num_sample: 0,
            total_samples: (duration.as_secs_f32() * sample_rate as f32) as usize,
        }
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        self.num_sample += 1;

        let t = self.num_sample as f32 / self.sample_rate as f32;
        let sample = (2.0 * PI * self.freq * t).sin();

        // Fade toward zero so the tone ends without a click
        let remaining = (self.total_samples - self.num_sample) as f32;
        let envelope = (remaining / self.total_samples as f32).min(1.0);

        Some(sample * envelope * 0.2) // Lower amplitude to prevent clipping
    }
}

impl Source for Tone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}
