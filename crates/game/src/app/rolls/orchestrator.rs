#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CutscenePhase {
    Idle,
    Playing,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CutsceneSignal {
    Visual { state: String },
    StartAudio { sound_id: String },
    Completed { stalled: bool },
}

#[derive(Debug, Clone)]
struct ScheduledStep {
    remaining_seconds: f32,
    visual_state: String,
}

#[derive(Debug, Clone)]
struct ScheduledAudio {
    remaining_seconds: f32,
    sound_id: String,
}

/// `Idle -> Playing -> Idle` and nothing else. The normal completion and
/// the failsafe share one finalize path; `finalized` guarantees exactly one
/// `Completed` signal per session no matter which fires first.
#[derive(Debug)]
pub(crate) struct CutsceneOrchestrator {
    phase: CutscenePhase,
    finalized: bool,
    failsafe_remaining: f32,
    scheduled_steps: Vec<ScheduledStep>,
    scheduled_audio: Option<ScheduledAudio>,
    completion_remaining: Option<f32>,
    display_restore_on_exit: bool,
    outcome: Option<RollOutcome>,
    context: Option<RollContext>,
}

impl CutsceneOrchestrator {
    pub(crate) fn new() -> Self {
        Self {
            phase: CutscenePhase::Idle,
            finalized: true,
            failsafe_remaining: 0.0,
            scheduled_steps: Vec::new(),
            scheduled_audio: None,
            completion_remaining: None,
            display_restore_on_exit: false,
            outcome: None,
            context: None,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.phase == CutscenePhase::Playing
    }

    /// Enter `Playing`. The caller has already disabled the roll trigger
    /// and hidden the result display; `display_visible` records whether the
    /// display should come back on exit.
    pub(crate) fn enter(
        &mut self,
        outcome: RollOutcome,
        context: RollContext,
        display_visible: bool,
    ) {
        self.phase = CutscenePhase::Playing;
        self.finalized = false;
        self.failsafe_remaining = CUTSCENE_FAILSAFE_SECONDS;
        self.scheduled_steps = outcome
            .def
            .effect
            .steps
            .iter()
            .map(|step| ScheduledStep {
                remaining_seconds: step.delay_seconds,
                visual_state: step.visual_state.clone(),
            })
            .collect();
        self.scheduled_audio = outcome.def.effect.audio.as_ref().map(|cue| ScheduledAudio {
            remaining_seconds: cue.delay_seconds,
            sound_id: cue.sound_id.clone(),
        });
        self.completion_remaining = outcome
            .def
            .effect
            .completion_delay_seconds(CUTSCENE_TAIL_SECONDS);
        self.display_restore_on_exit = display_visible;
        self.outcome = Some(outcome);
        self.context = Some(context);
    }

    pub(crate) fn note_display_hidden_by_user(&mut self) {
        self.display_restore_on_exit = false;
    }

    pub(crate) fn note_display_requested_by_user(&mut self) {
        self.display_restore_on_exit = true;
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) -> Vec<CutsceneSignal> {
        if self.phase != CutscenePhase::Playing || self.finalized {
            return Vec::new();
        }

        let mut signals = Vec::new();

        let mut still_pending = Vec::with_capacity(self.scheduled_steps.len());
        for mut step in self.scheduled_steps.drain(..) {
            step.remaining_seconds -= fixed_dt_seconds;
            if step.remaining_seconds <= 0.0 {
                signals.push(CutsceneSignal::Visual {
                    state: step.visual_state,
                });
            } else {
                still_pending.push(step);
            }
        }
        self.scheduled_steps = still_pending;

        if let Some(mut audio) = self.scheduled_audio.take() {
            audio.remaining_seconds -= fixed_dt_seconds;
            if audio.remaining_seconds <= 0.0 {
                signals.push(CutsceneSignal::StartAudio {
                    sound_id: audio.sound_id,
                });
            } else {
                self.scheduled_audio = Some(audio);
            }
        }

        if let Some(remaining) = self.completion_remaining {
            let next = remaining - fixed_dt_seconds;
            if next <= 0.0 {
                self.finalize();
                signals.push(CutsceneSignal::Completed { stalled: false });
                return signals;
            }
            self.completion_remaining = Some(next);
        }

        self.failsafe_remaining -= fixed_dt_seconds;
        if self.failsafe_remaining <= 0.0 {
            self.finalize();
            signals.push(CutsceneSignal::Completed { stalled: true });
        }

        signals
    }

    fn finalize(&mut self) {
        self.finalized = true;
        self.phase = CutscenePhase::Idle;
        self.failsafe_remaining = 0.0;
        self.scheduled_steps.clear();
        self.scheduled_audio = None;
        self.completion_remaining = None;
    }

    /// Hands the finished roll back to the controller for commit. One-shot.
    pub(crate) fn take_finished(&mut self) -> Option<(RollOutcome, RollContext, bool)> {
        let outcome = self.outcome.take()?;
        let context = self.context.take()?;
        Some((outcome, context, self.display_restore_on_exit))
    }
}
