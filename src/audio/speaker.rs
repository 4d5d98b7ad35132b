use std::process::Command;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

/// Spoken-reply playback through a host synthesizer (espeak-ng compatible).
/// Utterances go through a queue so replies never talk over each other.
pub struct Speaker {
    queue: UnboundedSender<String>,
}

impl Speaker {
    /// Probe the synthesizer and pick a voice. Returns `None` when the
    /// command isn't usable — speech output then silently disappears.
    pub fn detect(command: &str, preferred_voice: &str) -> Option<Self> {
        let output = Command::new(command).arg("--voices").output();
        let listing = match output {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
            _ => {
                log::info!("Speech output unavailable ({} not usable)", command);
                return None;
            }
        };

        let voice = pick_voice(&listing, preferred_voice);
        match voice {
            Some(ref v) => log::info!("Speech output via {} (voice {})", command, v),
            None => log::info!("Speech output via {} (default voice)", command),
        }

        let (tx, mut rx) = unbounded_channel::<String>();
        let command = command.to_string();
        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                let mut cmd = tokio::process::Command::new(&command);
                if let Some(ref v) = voice {
                    cmd.arg("-v").arg(v);
                }
                cmd.arg(&text);
                match cmd.status().await {
                    Ok(status) if !status.success() => {
                        log::warn!("Synthesizer exited with {}", status)
                    }
                    Err(e) => log::warn!("Speech playback failed: {}", e),
                    _ => {}
                }
            }
        });

        Some(Self { queue: tx })
    }

    /// Queue one utterance. Failures are logged by the playback task.
    pub fn say(&self, text: &str) {
        let _ = self.queue.send(text.to_string());
    }
}

/// First listed voice whose name matches the preferred pattern,
/// case-insensitively; `None` means the platform default. Listing lines look
/// like "Pty Language Age/Gender VoiceName File Other Languages".
fn pick_voice(listing: &str, preferred: &str) -> Option<String> {
    if preferred.is_empty() {
        return None;
    }
    let needle = preferred.to_lowercase();
    listing
        .lines()
        .skip(1) // header
        .filter_map(|line| line.split_whitespace().nth(3))
        .find(|name| name.to_lowercase().contains(&needle))
        .map(|name| name.to_string())
}
