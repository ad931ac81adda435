//! Sound stand-in: tracks the ambient loop and rings the terminal bell for cues.

use crate::game::{Audio, Cue};

#[derive(Debug, Default)]
pub struct TerminalAudio {
    bell: bool,
    ambient: bool,
    pending_bells: u32,
}

impl TerminalAudio {
    pub fn new(bell: bool) -> Self {
        Self {
            bell,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn ambient_playing(&self) -> bool {
        self.ambient
    }

    /// Bells queued since the last call; the app writes them out once per frame.
    pub fn take_bells(&mut self) -> u32 {
        std::mem::take(&mut self.pending_bells)
    }
}

impl Audio for TerminalAudio {
    fn play_ambient(&mut self) {
        if !std::mem::replace(&mut self.ambient, true) {
            tracing::debug!("ambient started");
        }
    }

    fn stop_ambient(&mut self) {
        if std::mem::take(&mut self.ambient) {
            tracing::debug!("ambient stopped");
        }
    }

    fn play(&mut self, cue: Cue, pitch: f32) {
        tracing::trace!(?cue, pitch, "cue");
        if self.bell && cue == Cue::Perfect {
            self.pending_bells += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_only_for_perfect_when_enabled() {
        let mut quiet = TerminalAudio::new(false);
        quiet.play(Cue::Perfect, 1.0);
        assert_eq!(quiet.take_bells(), 0);

        let mut loud = TerminalAudio::new(true);
        loud.play(Cue::Place, 1.0);
        loud.play(Cue::Perfect, 1.05);
        loud.play(Cue::Perfect, 0.95);
        assert_eq!(loud.take_bells(), 2);
        assert_eq!(loud.take_bells(), 0);
    }

    #[test]
    fn test_ambient_toggles() {
        let mut audio = TerminalAudio::new(false);
        audio.play_ambient();
        assert!(audio.ambient_playing());
        audio.stop_ambient();
        assert!(!audio.ambient_playing());
    }
}
