use std::path::{Path, PathBuf};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use hound::WavReader;
use log::{error, info};

use crate::error::MonitorError;
use crate::Result;

pub const START_SOUND: &str = "start.wav";
pub const ALARM_EFFECT: &str = "obeya_se.wav";
pub const ALARM_BGM: &str = "obeya_bgm.wav";
pub const CLEAR_EFFECT: &str = "clear.wav";

pub trait SoundPlayer {
    /// Plays a clip once, replacing any effect still playing.
    fn play_effect(&mut self, name: &str) -> Result<()>;
    /// Loops a clip until [`SoundPlayer::stop_bgm`].
    fn play_bgm(&mut self, name: &str) -> Result<()>;
    fn stop_bgm(&mut self);
}

/// Mono samples at the output device rate.
struct Clip {
    samples: Arc<[f32]>,
}

struct ClipCursor {
    samples: Arc<[f32]>,
    pos: usize,
    looping: bool,
}

impl ClipCursor {
    fn new(samples: Arc<[f32]>, looping: bool) -> Self {
        Self {
            samples,
            pos: 0,
            looping,
        }
    }

    fn next_sample(&mut self) -> f32 {
        if self.pos >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return 0.0;
            }
            self.pos = 0;
        }
        let sample = self.samples[self.pos];
        self.pos += 1;
        sample
    }
}

pub struct CpalPlayer {
    sound_dir: PathBuf,
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    effect: Option<Stream>,
    bgm: Option<Stream>,
}

impl CpalPlayer {
    pub fn new(sound_dir: &Path) -> Result<Self> {
        if !sound_dir.is_dir() {
            return Err(MonitorError::MissingSoundAssets(sound_dir.to_path_buf()).into());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No output device available"))?;
        info!("Using output device: {}", device.name()?);

        let config = device.default_output_config()?;
        let sample_format = config.sample_format();

        Ok(Self {
            sound_dir: sound_dir.to_path_buf(),
            device,
            config: config.into(),
            sample_format,
            effect: None,
            bgm: None,
        })
    }

    fn load_clip(&self, name: &str) -> Result<Clip> {
        let path = self.sound_dir.join(name);
        let (samples, channels, rate) = read_wav(&path)?;
        let mono = downmix(&samples, channels);
        let resampled = if rate != self.config.sample_rate.0 {
            simple_resample(&mono, rate, self.config.sample_rate.0)
        } else {
            mono
        };
        Ok(Clip {
            samples: resampled.into(),
        })
    }

    fn start(&self, clip: Clip, looping: bool) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let mut cursor = ClipCursor::new(clip.samples, looping);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.device.build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let s = cursor.next_sample();
                        frame.iter_mut().for_each(|out| *out = s);
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )?,
            SampleFormat::I16 => self.device.build_output_stream(
                &self.config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let s = (cursor.next_sample().clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        frame.iter_mut().for_each(|out| *out = s);
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )?,
            SampleFormat::U16 => self.device.build_output_stream(
                &self.config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let s = ((cursor.next_sample().clamp(-1.0, 1.0) + 1.0) * 32767.5) as u16;
                        frame.iter_mut().for_each(|out| *out = s);
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )?,
            other => return Err(anyhow::anyhow!("Unsupported sample format: {:?}", other)),
        };
        stream.play()?;
        Ok(stream)
    }
}

impl SoundPlayer for CpalPlayer {
    fn play_effect(&mut self, name: &str) -> Result<()> {
        let clip = self.load_clip(name)?;
        self.effect = Some(self.start(clip, false)?);
        Ok(())
    }

    fn play_bgm(&mut self, name: &str) -> Result<()> {
        let clip = self.load_clip(name)?;
        self.bgm = Some(self.start(clip, true)?);
        Ok(())
    }

    fn stop_bgm(&mut self) {
        // Dropping the stream stops playback.
        self.bgm = None;
    }
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
    let mut reader = WavReader::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read float samples: {}", e))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| anyhow::anyhow!("Failed to read int samples: {}", e))?
        }
    };

    Ok((samples, spec.channels.max(1) as usize, spec.sample_rate))
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn simple_resample(data: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = to_rate as f32 / from_rate as f32;
    let new_length = (data.len() as f32 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_length);

    for i in 0..new_length {
        let src_index = (i as f32 / ratio).floor() as usize;
        if src_index < data.len() {
            resampled.push(data[src_index]);
        }
    }

    resampled
}
