//! Score labels and the wipe-style fade overlay.

use crate::game::Hud;
use rand::Rng;

/// Side the overlay grows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wipe {
    FromLeft,
    FromRight,
    FromTop,
    FromBottom,
}

impl Wipe {
    pub const ALL: [Self; 4] = [Self::FromLeft, Self::FromRight, Self::FromTop, Self::FromBottom];

    fn random() -> Self {
        Self::ALL[rand::thread_rng().gen_range(0..Self::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FadeAnim {
    target: f32,
    speed: f32,
    elapsed: f32,
}

#[derive(Debug, Clone)]
pub struct ScoreHud {
    score: i64,
    best: i64,
    /// Flipped by every fade; starts hidden.
    score_visible: bool,
    /// Overlay coverage, 0 (clear) to 1 (opaque).
    fill: f32,
    wipe: Wipe,
    anim: Option<FadeAnim>,
}

impl Default for ScoreHud {
    fn default() -> Self {
        Self {
            score: 0,
            best: 0,
            score_visible: false,
            fill: 1.0,
            wipe: Wipe::FromTop,
            anim: None,
        }
    }
}

impl ScoreHud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the fade.
    pub fn update(&mut self, dt: f32) {
        let Some(mut anim) = self.anim else {
            return;
        };
        anim.elapsed += dt;
        let gap = (self.fill - anim.target).abs();
        let fraction = if gap > 0.0 {
            anim.elapsed * anim.speed / gap
        } else {
            1.0
        };
        if fraction >= 1.0 {
            self.fill = anim.target;
            self.anim = None;
        } else {
            self.fill += (anim.target - self.fill) * fraction;
            self.anim = Some(anim);
        }
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn best(&self) -> i64 {
        self.best
    }

    pub fn score_visible(&self) -> bool {
        self.score_visible
    }

    pub fn fill(&self) -> f32 {
        self.fill
    }

    #[cfg(test)]
    pub fn wipe(&self) -> Wipe {
        self.wipe
    }

    #[cfg(test)]
    pub fn is_fading(&self) -> bool {
        self.anim.is_some()
    }

    /// Whether the overlay covers cell (`col`, `row`) of a `width` x `height` area.
    pub fn covers(&self, col: u16, row: u16, width: u16, height: u16) -> bool {
        let (pos, len, reversed) = match self.wipe {
            Wipe::FromLeft => (col, width, false),
            Wipe::FromRight => (col, width, true),
            Wipe::FromTop => (row, height, false),
            Wipe::FromBottom => (row, height, true),
        };
        if len == 0 {
            return false;
        }
        let pos = if reversed { len - 1 - pos.min(len - 1) } else { pos };
        (f32::from(pos) + 0.5) < self.fill * f32::from(len)
    }
}

impl Hud for ScoreHud {
    fn update_score(&mut self, score: i64) {
        self.score = score;
    }

    fn update_best_score(&mut self, best: i64) {
        self.best = best;
    }

    fn fade(&mut self, to_opaque: bool, target_fill: f32, speed: f32) {
        self.score_visible = !self.score_visible;
        self.fill = if to_opaque { 0.0 } else { 1.0 };
        self.wipe = Wipe::random();
        self.anim = Some(FadeAnim {
            target: target_fill.clamp(0.0, 1.0),
            speed,
            elapsed: 0.0,
        });
        tracing::debug!(to_opaque, target_fill, speed, wipe = ?self.wipe, "fade started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(hud: &mut ScoreHud, secs: f32) {
        let steps = (secs * 60.0) as usize;
        for _ in 0..steps {
            hud.update(1.0 / 60.0);
        }
    }

    #[test]
    fn test_fade_toggles_score_visibility() {
        let mut hud = ScoreHud::new();
        assert!(!hud.score_visible());
        hud.fade(false, 0.0, 0.12);
        assert!(hud.score_visible());
        hud.fade(true, 1.0, 2.0);
        assert!(!hud.score_visible());
    }

    #[test]
    fn test_fade_in_clears_overlay() {
        let mut hud = ScoreHud::new();
        hud.fade(false, 0.0, 0.12);
        assert_eq!(hud.fill(), 1.0);
        run(&mut hud, 0.5);
        assert!(hud.fill() < 1.0);
        run(&mut hud, 10.0);
        assert_eq!(hud.fill(), 0.0);
        assert!(!hud.is_fading());
    }

    #[test]
    fn test_fade_out_reaches_opaque() {
        let mut hud = ScoreHud::new();
        hud.fade(true, 1.0, 2.0);
        assert_eq!(hud.fill(), 0.0);
        run(&mut hud, 2.0);
        assert_eq!(hud.fill(), 1.0);
    }

    #[test]
    fn test_covers_follows_wipe_and_fill() {
        let mut hud = ScoreHud::new();
        hud.fill = 0.5;
        hud.wipe = Wipe::FromLeft;
        assert!(hud.covers(0, 0, 10, 4));
        assert!(!hud.covers(9, 0, 10, 4));
        hud.wipe = Wipe::FromRight;
        assert!(!hud.covers(0, 0, 10, 4));
        assert!(hud.covers(9, 0, 10, 4));
        hud.wipe = Wipe::FromBottom;
        assert!(hud.covers(0, 3, 10, 4));
        assert!(!hud.covers(0, 0, 10, 4));
        hud.fill = 0.0;
        assert!(!hud.covers(0, 3, 10, 4));
        assert!(!hud.covers(0, 0, 0, 0));
    }

    #[test]
    fn test_scores_are_display_values() {
        let mut hud = ScoreHud::new();
        hud.update_score(-1);
        hud.update_best_score(30);
        assert_eq!(hud.score(), -1);
        assert_eq!(hud.best(), 30);
    }
}
