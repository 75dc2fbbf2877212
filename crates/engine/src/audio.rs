use std::collections::HashSet;

use tracing::{debug, warn};

/// A playable audio resource. Implementations are collaborators; the
/// arbiter only tracks ownership and pause/resume state through this
/// surface.
pub trait AudioHandle {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn position_seconds(&self) -> f32;
    fn set_position_seconds(&mut self, seconds: f32);
    fn set_volume(&mut self, volume: f32);
}

/// Resolves stable string ids to handles. An id the provider does not know
/// resolves to `None` and every arbiter operation treats that as a no-op.
pub trait AudioHandleProvider {
    fn handle_ids(&self) -> Vec<String>;
    fn handle_mut(&mut self, id: &str) -> Option<&mut dyn AudioHandle>;
}

/// Provider with no handles at all. Every id is unknown, so the arbiter
/// runs pure state arbitration without producing sound.
pub struct NullAudioProvider;

impl AudioHandleProvider for NullAudioProvider {
    fn handle_ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn handle_mut(&mut self, _id: &str) -> Option<&mut dyn AudioHandle> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PausedEquipped {
    pub handle_id: String,
    pub position_seconds: f32,
    pub was_playing: bool,
}

/// Owns the single "currently playing" slot. At most one handle is current
/// at a time; a pinned handle survives `stop_all` sweeps; the paused
/// equipped capture is one-shot and only restored while the same handle is
/// still the equipped ambient.
#[derive(Debug, Default)]
pub struct AudioArbiter {
    current_owner: Option<String>,
    pinned: Option<String>,
    equipped_ambient: Option<String>,
    paused_equipped: Option<PausedEquipped>,
    resume_equipped_after_cutscene: bool,
    last_roll_persisted: bool,
}

impl AudioArbiter {
    pub fn new() -> Self {
        Self {
            current_owner: None,
            pinned: None,
            equipped_ambient: None,
            paused_equipped: None,
            resume_equipped_after_cutscene: false,
            last_roll_persisted: true,
        }
    }

    pub fn current_owner(&self) -> Option<&str> {
        self.current_owner.as_deref()
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    pub fn equipped_ambient(&self) -> Option<&str> {
        self.equipped_ambient.as_deref()
    }

    pub fn paused_equipped(&self) -> Option<&PausedEquipped> {
        self.paused_equipped.as_ref()
    }

    pub fn resume_equipped_after_cutscene(&self) -> bool {
        self.resume_equipped_after_cutscene
    }

    pub fn set_equipped_ambient(&mut self, handle_id: Option<String>) {
        self.equipped_ambient = handle_id;
    }

    /// Records the persistence decision of the roll currently in flight.
    /// While the last roll was discarded, non-forced playback is suppressed
    /// so a doomed roll cannot leave a ghost sound behind.
    pub fn note_roll_persisted(&mut self, persisted: bool) {
        self.last_roll_persisted = persisted;
    }

    pub fn pin(&mut self, handle_id: &str) {
        self.pinned = Some(handle_id.to_string());
    }

    pub fn unpin(&mut self) {
        self.pinned = None;
    }

    /// Pause and reset every managed handle except the preserved set and
    /// the pinned handle. Clears ownership if the current handle was swept.
    pub fn stop_all(&mut self, provider: &mut dyn AudioHandleProvider, preserve: &HashSet<String>) {
        for handle_id in provider.handle_ids() {
            if preserve.contains(&handle_id) {
                continue;
            }
            if self.pinned.as_deref() == Some(handle_id.as_str()) {
                continue;
            }
            if let Some(handle) = provider.handle_mut(&handle_id) {
                handle.pause();
                handle.set_position_seconds(0.0);
            }
            if self.current_owner.as_deref() == Some(handle_id.as_str()) {
                self.current_owner = None;
            }
        }
    }

    /// Capture and pause the equipped ambient handle ahead of a roll.
    /// Whether it resumes after the cutscene depends on the incoming
    /// outcome: an outcome carrying its own background replaces the
    /// ambient instead of restoring it.
    pub fn pause_equipped_for_outcome(
        &mut self,
        provider: &mut dyn AudioHandleProvider,
        outcome_background: Option<&str>,
    ) {
        self.paused_equipped = None;
        self.resume_equipped_after_cutscene = false;

        let Some(equipped_id) = self.equipped_ambient.clone() else {
            return;
        };
        let Some(handle) = provider.handle_mut(&equipped_id) else {
            debug!(handle_id = %equipped_id, "equipped_ambient_handle_missing");
            return;
        };

        self.paused_equipped = Some(PausedEquipped {
            handle_id: equipped_id,
            position_seconds: handle.position_seconds(),
            was_playing: handle.is_playing(),
        });
        handle.pause();
        self.resume_equipped_after_cutscene = outcome_background.is_none();
    }

    /// Force the resume flag on; used when a roll is auto-deleted and the
    /// paused ambient should come back regardless of the outcome's own
    /// background.
    pub fn request_resume_after_cutscene(&mut self) {
        self.resume_equipped_after_cutscene = true;
    }

    /// One-shot restore of the captured equipped audio. A capture whose
    /// handle is no longer the equipped ambient is dropped, not restored;
    /// calling twice in a row is a no-op the second time.
    pub fn resume_paused_equipped(&mut self, provider: &mut dyn AudioHandleProvider) {
        let captured = self.paused_equipped.take();
        let should_resume = self.resume_equipped_after_cutscene;
        self.resume_equipped_after_cutscene = false;

        let Some(captured) = captured else {
            return;
        };
        if !should_resume {
            return;
        }
        if self.equipped_ambient.as_deref() != Some(captured.handle_id.as_str()) {
            debug!(
                handle_id = %captured.handle_id,
                "paused_equipped_superseded_skipping_resume"
            );
            return;
        }
        let Some(handle) = provider.handle_mut(&captured.handle_id) else {
            return;
        };

        handle.set_position_seconds(captured.position_seconds);
        if captured.was_playing {
            handle.play();
            self.current_owner = Some(captured.handle_id);
        }
    }

    /// Stop the previous current handle and start the new one. Returns
    /// whether playback actually started. Non-forced starts are suppressed
    /// while the last roll was discarded (unless the handle is pinned).
    pub fn set_current(
        &mut self,
        provider: &mut dyn AudioHandleProvider,
        handle_id: &str,
        volume: f32,
        forced: bool,
    ) -> bool {
        let pinned_override = self.pinned.as_deref() == Some(handle_id);
        if !forced && !pinned_override && !self.last_roll_persisted {
            debug!(handle_id, "playback_suppressed_for_discarded_roll");
            return false;
        }

        if let Some(previous) = self.current_owner.take() {
            if previous != handle_id {
                if let Some(handle) = provider.handle_mut(&previous) {
                    handle.pause();
                    handle.set_position_seconds(0.0);
                }
            }
        }

        let Some(handle) = provider.handle_mut(handle_id) else {
            warn!(handle_id, "audio_handle_missing_playback_skipped");
            return false;
        };

        handle.set_volume(volume);
        handle.set_position_seconds(0.0);
        handle.play();
        self.current_owner = Some(handle_id.to_string());
        true
    }

    /// Pause and reset the current handle, clearing ownership.
    pub fn clear_current(&mut self, provider: &mut dyn AudioHandleProvider) {
        if let Some(current) = self.current_owner.take() {
            if let Some(handle) = provider.handle_mut(&current) {
                handle.pause();
                handle.set_position_seconds(0.0);
            }
        }
    }
}
