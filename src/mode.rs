use crate::types::Mode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeTransition {
    EnteredScatter,
    EnteredChase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactOutcome {
    ResetGhost,
    GameOver,
}

/// Global chase/scatter switch. Scatter starts when a trigger is eaten and
/// runs out after a fixed duration.
#[derive(Clone, Debug)]
pub struct ModeMachine {
    mode: Mode,
    scatter_started_at_ms: u64,
    scatter_duration_ms: u64,
}

impl ModeMachine {
    pub fn new(scatter_duration_ms: u64) -> Self {
        Self {
            mode: Mode::Chase,
            scatter_started_at_ms: 0,
            scatter_duration_ms,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Eating a trigger while already scattering only restarts the timer.
    pub fn on_scatter_trigger(&mut self, now_ms: u64) -> Option<ModeTransition> {
        self.scatter_started_at_ms = now_ms;
        if self.mode == Mode::Scatter {
            return None;
        }
        self.mode = Mode::Scatter;
        Some(ModeTransition::EnteredScatter)
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<ModeTransition> {
        if self.mode != Mode::Scatter {
            return None;
        }
        if now_ms.saturating_sub(self.scatter_started_at_ms) <= self.scatter_duration_ms {
            return None;
        }
        self.mode = Mode::Chase;
        Some(ModeTransition::EnteredChase)
    }

    pub fn contact(&self) -> ContactOutcome {
        match self.mode {
            Mode::Scatter => ContactOutcome::ResetGhost,
            Mode::Chase => ContactOutcome::GameOver,
        }
    }

    /// Fraction of the scatter window used up; 0 while chasing.
    pub fn scatter_progress(&self, now_ms: u64) -> f32 {
        if self.mode != Mode::Scatter || self.scatter_duration_ms == 0 {
            return 0.0;
        }
        let elapsed = now_ms.saturating_sub(self.scatter_started_at_ms);
        (elapsed as f32 / self.scatter_duration_ms as f32).clamp(0.0, 1.0)
    }
}
