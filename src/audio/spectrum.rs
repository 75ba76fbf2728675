use anyhow::Result;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::ops::Range;
use std::sync::Arc;

use super::decode::AudioData;
use crate::meter::weighting::validate_transform;

/// Seconds of frames computed per parallel chunk.
const CHUNK_SECONDS: usize = 10;

/// One frame of the dB magnitude spectrum fed to the meter.
#[derive(Clone, Debug)]
pub struct SpectrumFrame {
    /// Time of the frame centre in seconds
    pub time: f32,
    /// `fft_size / 2` magnitudes in dBFS
    pub bins: Vec<f32>,
}

/// Turns mono samples into per-frame dB spectra at a fixed frame rate.
pub struct SpectrumSource {
    fft_size: usize,
    fps: u32,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrumSource {
    pub fn new(sample_rate: u32, fft_size: usize, fps: u32) -> Result<Self> {
        validate_transform(sample_rate, fft_size)?;
        if fps == 0 {
            anyhow::bail!("Frame rate must be positive");
        }
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        Ok(Self {
            fft_size,
            fps,
            window: blackman_window(fft_size),
            fft,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn frame_count(&self, audio: &AudioData) -> usize {
        (audio.duration() * self.fps as f32).ceil() as usize
    }

    /// Frames of `audio` in time order, computed in parallel one chunk at a
    /// time. Only the chunk being consumed is held in memory.
    pub fn chunks<'a>(
        &'a self,
        audio: &'a AudioData,
    ) -> impl Iterator<Item = Vec<SpectrumFrame>> + 'a {
        let total_frames = self.frame_count(audio);
        let chunk_len = self.fps as usize * CHUNK_SECONDS;

        log::info!(
            "Computing {} spectrum frames (fft_size={}, {} fps)...",
            total_frames,
            self.fft_size,
            self.fps
        );

        (0..total_frames)
            .step_by(chunk_len)
            .map(move |first| self.compute(audio, first..(first + chunk_len).min(total_frames)))
    }

    fn compute(&self, audio: &AudioData, frames: Range<usize>) -> Vec<SpectrumFrame> {
        let samples_per_frame = audio.sample_rate as f32 / self.fps as f32;
        frames
            .into_par_iter()
            .map(|frame_idx| {
                let center = (frame_idx as f32 * samples_per_frame) as usize;
                let start = center.saturating_sub(self.fft_size / 2);
                SpectrumFrame {
                    time: frame_idx as f32 / self.fps as f32,
                    bins: self.analyze(&audio.samples, start),
                }
            })
            .collect()
    }

    /// dB magnitudes of the window starting at `start`, zero-padded past the end.
    fn analyze(&self, samples: &[f32], start: usize) -> Vec<f32> {
        let end = (start + self.fft_size).min(samples.len());

        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.fft_size];
        if start < end {
            for (i, &s) in samples[start..end].iter().enumerate() {
                buffer[i] = Complex::new(s * self.window[i], 0.0);
            }
        }
        self.fft.process(&mut buffer);

        let scale = 1.0 / self.fft_size as f32;
        buffer[..self.bin_count()]
            .iter()
            .map(|c| 20.0 * (c.norm() * scale).log10())
            .collect()
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> AudioData {
        let len = (sample_rate as f32 * seconds) as usize;
        let samples = (0..len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        AudioData {
            samples,
            sample_rate,
        }
    }

    fn all_frames(source: &SpectrumSource, audio: &AudioData) -> Vec<SpectrumFrame> {
        source.chunks(audio).flatten().collect()
    }

    #[test]
    fn frame_layout() {
        let audio = tone(1000.0, 48000, 1.0, 0.5);
        let source = SpectrumSource::new(48000, 1024, 30).unwrap();
        let frames = all_frames(&source, &audio);
        assert_eq!(frames.len(), 30);
        assert!(frames.iter().all(|f| f.bins.len() == 512));
        assert!(frames.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let audio = tone(1500.0, 48000, 0.5, 0.5);
        let source = SpectrumSource::new(48000, 2048, 10).unwrap();
        let frames = all_frames(&source, &audio);
        let mid = &frames[frames.len() / 2];
        let (loudest, _) = mid
            .bins
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        // 1500 Hz / (48000 / 2048) = bin 64
        assert!((63..=65).contains(&loudest), "peak at bin {}", loudest);
    }

    #[test]
    fn chunks_are_bounded_and_ordered() {
        // 25s at 4 fps: chunks of 40, 40 and 20 frames
        let audio = tone(440.0, 8000, 25.0, 0.25);
        let source = SpectrumSource::new(8000, 256, 4).unwrap();
        let sizes: Vec<usize> = source.chunks(&audio).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![40, 40, 20]);

        let times: Vec<f32> = all_frames(&source, &audio).iter().map(|f| f.time).collect();
        assert_eq!(times.len(), source.frame_count(&audio));
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_audio_has_no_chunks() {
        let audio = AudioData {
            samples: Vec::new(),
            sample_rate: 48000,
        };
        let source = SpectrumSource::new(48000, 1024, 60).unwrap();
        assert_eq!(source.chunks(&audio).count(), 0);
    }

    #[test]
    fn silence_yields_negative_infinity() {
        let audio = AudioData {
            samples: vec![0.0; 4800],
            sample_rate: 48000,
        };
        let source = SpectrumSource::new(48000, 256, 20).unwrap();
        let frames = all_frames(&source, &audio);
        assert!(frames[0].bins.iter().all(|&v| v == f32::NEG_INFINITY));
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(SpectrumSource::new(48000, 1000, 30).is_err());
        assert!(SpectrumSource::new(0, 1024, 30).is_err());
        assert!(SpectrumSource::new(48000, 1024, 0).is_err());
    }
}
