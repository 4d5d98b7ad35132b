pub mod recorder;
pub mod speaker;

use std::sync::Arc;

use thiserror::Error;

use crate::api::TranscribeClient;
use crate::config::Config;
use recorder::VoiceRecorder;
use speaker::Speaker;

/// Voice failures are degraded-mode signals, never fatal: a missing device
/// or key just leaves the mic inert.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("no input device available")]
    NoDevice,
    #[error("audio device error: {0}")]
    Device(String),
    #[error("already capturing")]
    AlreadyCapturing,
    #[error("not capturing")]
    NotCapturing,
    #[error("no audio captured")]
    Empty,
}

/// Delivered once per finished capture: `Some(transcript)` when speech was
/// recognized, `None` when the capture produced nothing usable.
pub type TranscriptCallback = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Optional host speech capability. The controller depends only on this
/// trait; capability detection happens once, at construction.
pub trait VoiceIo {
    /// Whether capture can be offered at all.
    fn capture_available(&self) -> bool;

    fn is_capturing(&self) -> bool;

    /// Begin listening. Returns whether capture actually started; failures
    /// are logged and swallowed.
    fn start_capture(&mut self) -> bool;

    /// Stop listening and transcribe what was heard. The callback receives
    /// the outcome exactly once.
    fn finish_capture(&mut self, on_transcript: TranscriptCallback);

    /// Force-end an in-progress capture, discarding any partial audio.
    fn cancel_capture(&mut self);

    /// Queue spoken playback of a reply. No-op without a synthesizer.
    fn speak(&self, text: &str);
}

/// Stub for hosts with no usable audio at all. Keeps every call site free
/// of capability branching.
pub struct NoopVoice;

impl VoiceIo for NoopVoice {
    fn capture_available(&self) -> bool {
        false
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn start_capture(&mut self) -> bool {
        false
    }

    fn finish_capture(&mut self, _on_transcript: TranscriptCallback) {}

    fn cancel_capture(&mut self) {}

    fn speak(&self, _text: &str) {}
}

/// The real adapter: cpal capture transcribed remotely, replies spoken via
/// the host synthesizer. Each half degrades independently.
pub struct HostVoice {
    recorder: Option<VoiceRecorder>,
    transcriber: TranscribeClient,
    speaker: Option<Speaker>,
}

impl VoiceIo for HostVoice {
    fn capture_available(&self) -> bool {
        self.recorder.is_some() && self.transcriber.has_api_key()
    }

    fn is_capturing(&self) -> bool {
        self.recorder.as_ref().is_some_and(|r| r.is_recording())
    }

    fn start_capture(&mut self) -> bool {
        if !self.transcriber.has_api_key() {
            return false;
        }
        let Some(recorder) = self.recorder.as_mut() else {
            return false;
        };
        match recorder.start() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Voice capture failed to start: {}", e);
                false
            }
        }
    }

    fn finish_capture(&mut self, on_transcript: TranscriptCallback) {
        let recorder = match self.recorder.as_mut() {
            Some(r) if r.is_recording() => r,
            _ => {
                on_transcript(None);
                return;
            }
        };

        let wav_data = match recorder.stop() {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Capture ended without usable audio: {}", e);
                on_transcript(None);
                return;
            }
        };

        let client = self.transcriber.clone();
        tokio::spawn(async move {
            match client.transcribe(wav_data).await {
                Ok(text) if !text.trim().is_empty() => on_transcript(Some(text)),
                Ok(_) => {
                    log::info!("Transcription came back empty");
                    on_transcript(None);
                }
                Err(e) => {
                    log::warn!("Transcription failed: {}", e);
                    on_transcript(None);
                }
            }
        });
    }

    fn cancel_capture(&mut self) {
        if let Some(recorder) = self.recorder.as_mut() {
            if recorder.is_recording() {
                let _ = recorder.stop();
                log::info!("Capture cancelled, audio discarded");
            }
        }
    }

    fn speak(&self, text: &str) {
        if let Some(ref speaker) = self.speaker {
            speaker.say(text);
        }
    }
}

/// Build the best adapter the host supports. Needs a tokio runtime (the
/// speaker runs its playback queue on one).
pub fn detect(config: &Config) -> Box<dyn VoiceIo> {
    let transcriber = TranscribeClient::new(
        config.stt_api_url.clone(),
        config.stt_api_key.clone(),
        config.stt_model.clone(),
    );

    let recorder = match VoiceRecorder::new() {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn!("Voice capture unavailable: {}", e);
            None
        }
    };

    if recorder.is_some() && !transcriber.has_api_key() {
        log::warn!("No transcription key (set GROQ_API_KEY or stt_api_key) — mic disabled");
    }

    let speaker = Speaker::detect(&config.tts_command, &config.preferred_voice);

    if recorder.is_none() && speaker.is_none() {
        log::info!("No voice capability on this host — text only");
        return Box::new(NoopVoice);
    }

    Box::new(HostVoice {
        recorder,
        transcriber,
        speaker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_voice_is_inert() {
        let mut voice = NoopVoice;
        assert!(!voice.capture_available());
        assert!(!voice.start_capture());
        assert!(!voice.is_capturing());
        voice.speak("nothing happens");
        voice.cancel_capture();
    }

    #[test]
    fn test_noop_finish_capture_never_calls_back() {
        let mut voice = NoopVoice;
        voice.finish_capture(Arc::new(|_| panic!("no capture to finish")));
    }
}
