// Frame assembly for captured audio
//
// Device callbacks deliver interleaved buffers of whatever size, channel count and
// rate the host picked. The assembler downmixes to mono, resamples to the target
// rate and cuts fixed-length frames. Only the partial tail of the current frame is
// carried between callbacks.

use super::backend::{AudioFrame, CaptureConfig};

/// Converts device buffers into fixed-length mono frames
#[derive(Debug)]
pub struct FrameAssembler {
    input_rate: u32,
    input_channels: u16,
    target_rate: u32,
    frame_length: usize,
    resampler: Option<LinearResampler>,
    pending: Vec<f32>,
    next_sequence: u64,
    emitted_samples: u64,
}

impl FrameAssembler {
    pub fn new(input_rate: u32, input_channels: u16, config: &CaptureConfig) -> Self {
        let resampler = if input_rate != config.sample_rate {
            Some(LinearResampler::new(input_rate, config.sample_rate))
        } else {
            None
        };

        Self {
            input_rate,
            input_channels: input_channels.max(1),
            target_rate: config.sample_rate,
            frame_length: config.frame_length,
            resampler,
            pending: Vec::with_capacity(config.frame_length),
            next_sequence: 0,
            emitted_samples: 0,
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn input_channels(&self) -> u16 {
        self.input_channels
    }

    /// Feed one interleaved device buffer, returning every frame it completed
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioFrame> {
        let mono = downmix(interleaved, self.input_channels);
        let mono = match &mut self.resampler {
            Some(resampler) => resampler.process(&mono),
            None => mono,
        };

        let mut frames = Vec::new();
        for sample in mono {
            self.pending.push(sample);
            if self.pending.len() == self.frame_length {
                frames.push(self.take_frame());
            }
        }
        frames
    }

    /// Samples waiting for the next frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_frame(&mut self) -> AudioFrame {
        let samples = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_length));
        let timestamp_ms = self.emitted_samples * 1000 / self.target_rate.max(1) as u64;
        let frame = AudioFrame {
            samples,
            sample_rate: self.target_rate,
            sequence: self.next_sequence,
            timestamp_ms,
        };
        self.next_sequence += 1;
        self.emitted_samples += self.frame_length as u64;
        frame
    }
}

/// Average interleaved channels into mono
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Streaming linear-interpolation resampler for mono audio
#[derive(Debug)]
pub struct LinearResampler {
    step: f64,
    phase: f64,
    previous: Option<f32>,
}

impl LinearResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            step: input_rate as f64 / output_rate.max(1) as f64,
            phase: 0.0,
            previous: None,
        }
    }

    /// Resample one block; interpolation state carries over to the next call
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let mut output = Vec::with_capacity((input.len() as f64 / self.step) as usize + 1);

        for &current in input {
            let previous = match self.previous {
                Some(p) => p,
                None => {
                    self.previous = Some(current);
                    continue;
                }
            };

            // Emit every output position that falls between previous (0.0) and current (1.0)
            while self.phase < 1.0 {
                let t = self.phase as f32;
                output.push(previous + (current - previous) * t);
                self.phase += self.step;
            }
            self.phase -= 1.0;
            self.previous = Some(current);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo_averages() {
        let mono = downmix(&[0.5, -0.5, 1.0, 0.0], 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_resampler_ratio() {
        let mut resampler = LinearResampler::new(48000, 16000);
        let out = resampler.process(&vec![0.0; 4800]);
        // 4800 input samples at 3:1, minus the priming sample
        assert!((1599..=1601).contains(&out.len()), "got {}", out.len());
    }

    #[test]
    fn test_resampler_interpolates() {
        let mut resampler = LinearResampler::new(8000, 16000);
        let out = resampler.process(&[0.0, 1.0]);
        assert_eq!(out, vec![0.0, 0.5]);
    }
}
