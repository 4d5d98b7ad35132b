use cpal::traits::*;
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use hound::{SampleFormat as HoundSampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use super::VoiceError;

/// Microphone capture producing transcription-ready WAV bytes.
pub struct VoiceRecorder {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    audio_buffer: Arc<Mutex<Vec<f32>>>,
}

impl VoiceRecorder {
    pub fn new() -> Result<Self, VoiceError> {
        let host = cpal::default_host();
        log::info!("Audio host: {}", host.id().name());

        let input_device = host.default_input_device().ok_or(VoiceError::NoDevice)?;
        log::info!("Using device: {}", input_device.name().unwrap_or_default());

        // Prefer 16 kHz mono; fallback to device default
        let mut config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(16_000),
            buffer_size: cpal::BufferSize::Default,
        };

        let supports_16k = input_device
            .supported_input_configs()
            .map(|mut it| {
                it.any(|c| {
                    c.channels() == 1
                        && c.min_sample_rate() <= SampleRate(16_000)
                        && c.max_sample_rate() >= SampleRate(16_000)
                })
            })
            .unwrap_or(false);

        if !supports_16k {
            log::warn!("16 kHz not supported - using device default rate");
            let def_cfg = input_device
                .default_input_config()
                .map_err(|e| VoiceError::Device(e.to_string()))?;
            config = def_cfg.into();
            config.channels = 1;
        }

        log::info!(
            "Input config: {} Hz, {} channel(s)",
            config.sample_rate.0,
            config.channels
        );

        Ok(Self {
            device: input_device,
            config,
            stream: None,
            audio_buffer: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn start(&mut self) -> Result<(), VoiceError> {
        if self.stream.is_some() {
            return Err(VoiceError::AlreadyCapturing);
        }

        log::info!("Starting capture");
        self.audio_buffer.lock().unwrap().clear();

        let audio_buf = self.audio_buffer.clone();

        let sample_format = self
            .device
            .default_input_config()
            .map_err(|e| VoiceError::Device(e.to_string()))?
            .sample_format();

        let err_fn = |err| log::error!("Stream error: {err}");

        self.stream = Some(match sample_format {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &self.config,
                    move |data: &[f32], _| {
                        audio_buf.lock().unwrap().extend_from_slice(data);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| VoiceError::Device(e.to_string()))?,
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &self.config,
                    move |data: &[i16], _| {
                        let mut buf = audio_buf.lock().unwrap();
                        buf.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| VoiceError::Device(e.to_string()))?,
            SampleFormat::U16 => self
                .device
                .build_input_stream(
                    &self.config,
                    move |data: &[u16], _| {
                        let mut buf = audio_buf.lock().unwrap();
                        buf.extend(
                            data.iter()
                                .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0),
                        );
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| VoiceError::Device(e.to_string()))?,
            _ => return Err(VoiceError::Device("unsupported sample format".into())),
        });

        self.stream
            .as_ref()
            .unwrap()
            .play()
            .map_err(|e| VoiceError::Device(e.to_string()))?;

        log::info!("Capture started");
        Ok(())
    }

    /// Stop capture and encode what was heard as 16-bit WAV.
    pub fn stop(&mut self) -> Result<Vec<u8>, VoiceError> {
        if self.stream.is_none() {
            return Err(VoiceError::NotCapturing);
        }
        self.stream.take(); // drop = stop

        let samples = std::mem::take(&mut *self.audio_buffer.lock().unwrap());
        if samples.is_empty() {
            return Err(VoiceError::Empty);
        }

        let mut wav_bytes = Vec::<u8>::new();
        {
            let spec = WavSpec {
                channels: 1,
                sample_rate: self.config.sample_rate.0,
                bits_per_sample: 16,
                sample_format: HoundSampleFormat::Int,
            };
            let mut writer = WavWriter::new(Cursor::new(&mut wav_bytes), spec)
                .map_err(|e| VoiceError::Device(e.to_string()))?;

            for &s in &samples {
                let s16 = (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer
                    .write_sample(s16)
                    .map_err(|e| VoiceError::Device(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| VoiceError::Device(e.to_string()))?;
        }

        log::info!(
            "Captured {:.1} KB WAV ({} samples @ {} Hz)",
            wav_bytes.len() as f32 / 1024.0,
            samples.len(),
            self.config.sample_rate.0
        );
        Ok(wav_bytes)
    }

    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }
}
