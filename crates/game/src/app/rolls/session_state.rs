/// The root of the roll pipeline: owns the resolver, the audio arbiter, the
/// cutscene orchestrator, achievements, timers, and the persisted profile
/// state. Exactly one roll is in flight at a time; the trigger gate and the
/// cutscene phase enforce that structurally.
pub(crate) struct RollSession {
    store: Option<ProfileStore>,
    resolver: Option<RarityResolver>,
    audio: Box<dyn AudioHandleProvider>,
    arbiter: AudioArbiter,
    orchestrator: CutsceneOrchestrator,
    achievements: AchievementTracker,
    timers: TickTimers<SessionTimer>,
    events: SessionEventBus,
    rng: ChaCha8Rng,
    roll_count: u64,
    play_time_seconds: u64,
    play_time_accum_seconds: f32,
    inventory: Vec<InventoryItem>,
    equipped: Option<EquippedItem>,
    discovered_buckets: BTreeSet<RarityBucket>,
    excluded_buckets: BTreeSet<RarityBucket>,
    skip_cutscenes: bool,
    trigger_enabled: bool,
    cooldown_timer: Option<TimerId>,
    bonus_window_open: bool,
    result_display_visible: bool,
    last_result_line: Option<String>,
    quit_requested: bool,
}

impl RollSession {
    pub(crate) fn new(audio: Box<dyn AudioHandleProvider>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            store: None,
            resolver: None,
            audio,
            arbiter: AudioArbiter::new(),
            orchestrator: CutsceneOrchestrator::new(),
            achievements: AchievementTracker::from_unlocked(BTreeSet::new()),
            timers: TickTimers::default(),
            events: SessionEventBus::default(),
            rng,
            roll_count: 0,
            play_time_seconds: 0,
            play_time_accum_seconds: 0.0,
            inventory: Vec::new(),
            equipped: None,
            discovered_buckets: BTreeSet::new(),
            excluded_buckets: BTreeSet::new(),
            skip_cutscenes: false,
            trigger_enabled: true,
            cooldown_timer: None,
            bonus_window_open: false,
            result_display_visible: true,
            last_result_line: None,
            quit_requested: false,
        }
    }

    fn apply_profile(&mut self, profile: SavedProfile) {
        self.roll_count = profile.roll_count;
        self.play_time_seconds = profile.play_time_seconds;
        self.inventory = profile
            .inventory
            .into_iter()
            .map(|item| InventoryItem {
                title: item.title,
                rarity_class: item.rarity_class,
                rolled_at_index: item.rolled_at_index,
            })
            .collect();
        self.equipped = profile.equipped.map(|item| EquippedItem {
            title: item.title,
            rarity_class: item.rarity_class,
            rolled_at_index: item.rolled_at_index,
        });
        self.discovered_buckets = profile
            .discovered_buckets
            .iter()
            .filter_map(|token| RarityBucket::from_token(token))
            .collect();
        self.excluded_buckets = profile
            .excluded_buckets
            .iter()
            .filter_map(|token| RarityBucket::from_token(token))
            .collect();
        self.achievements =
            AchievementTracker::from_unlocked(profile.unlocked_achievements.into_iter().collect());
        self.skip_cutscenes = profile.skip_cutscenes;
    }

    fn snapshot_profile(&self) -> SavedProfile {
        SavedProfile {
            save_version: PROFILE_SAVE_VERSION,
            roll_count: self.roll_count,
            play_time_seconds: self.play_time_seconds,
            inventory: self
                .inventory
                .iter()
                .map(|item| SavedInventoryItem {
                    title: item.title.clone(),
                    rarity_class: item.rarity_class.clone(),
                    rolled_at_index: item.rolled_at_index,
                })
                .collect(),
            equipped: self.equipped.as_ref().map(|item| SavedEquippedItem {
                title: item.title.clone(),
                rarity_class: item.rarity_class.clone(),
                rolled_at_index: item.rolled_at_index,
            }),
            discovered_buckets: self
                .discovered_buckets
                .iter()
                .map(|bucket| bucket.as_token().to_string())
                .collect(),
            excluded_buckets: self
                .excluded_buckets
                .iter()
                .map(|bucket| bucket.as_token().to_string())
                .collect(),
            unlocked_achievements: self.achievements.unlocked_ids().iter().cloned().collect(),
            skip_cutscenes: self.skip_cutscenes,
        }
    }

    fn save_profile(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(error) = store.save(&self.snapshot_profile()) {
            warn!(error = %error, "profile_save_failed");
        }
    }

    fn ambient_handle_id(rarity_class: &str) -> String {
        format!("bg.{rarity_class}")
    }

    fn trigger_enabled(&self) -> bool {
        self.trigger_enabled && !self.orchestrator.is_active()
    }

    fn effective_cooldown_seconds(&self) -> f32 {
        if self.bonus_window_open {
            BONUS_ROLL_COOLDOWN_SECONDS
        } else {
            BASE_ROLL_COOLDOWN_SECONDS
        }
    }

    fn begin_cooldown(&mut self) {
        self.trigger_enabled = false;
        if let Some(id) = self.cooldown_timer.take() {
            self.timers.cancel(id);
        }
        let delay = self.effective_cooldown_seconds();
        self.cooldown_timer = Some(self.timers.push(delay, SessionTimer::CooldownElapsed));
    }

    fn submit_roll(&mut self, console: &mut ConsoleState) {
        if !self.trigger_enabled() {
            console.append_output_line("error: roll unavailable while busy");
            return;
        }

        let Some(resolver) = self.resolver.as_ref() else {
            console.append_output_line("error: session not loaded");
            return;
        };
        self.roll_count = self.roll_count.saturating_add(1);
        let roll_index = self.roll_count;
        let draw = self.rng.gen::<f64>();
        let def = resolver.resolve(roll_index, draw).clone();
        info!(
            roll_index,
            def_name = %def.def_name,
            class = %def.class,
            "roll_resolved"
        );

        self.arbiter
            .pause_equipped_for_outcome(self.audio.as_mut(), def.background_id.as_deref());
        let mut preserve = HashSet::new();
        if let Some(pinned) = self.arbiter.pinned() {
            preserve.insert(pinned.to_string());
        }
        if let Some(captured) = self.arbiter.paused_equipped() {
            preserve.insert(captured.handle_id.clone());
        }
        self.arbiter.stop_all(self.audio.as_mut(), &preserve);

        let title_index = self.rng.gen_range(0..def.titles.len());
        let title = def.titles[title_index].clone();
        let outcome = RollOutcome { def, title };

        let context = PersistenceGate::apply(
            &outcome,
            roll_index,
            &self.excluded_buckets,
            &mut self.discovered_buckets,
            &mut self.arbiter,
            &mut self.achievements,
            &mut self.events,
        );
        self.arbiter.note_roll_persisted(context.persisted);
        self.events.emit(SessionEvent::RollResolved {
            persisted: context.persisted,
        });

        for _unlock in self.achievements.on_roll_count_changed(self.roll_count) {
            self.events.emit(SessionEvent::AchievementUnlocked);
        }

        let quick_path = outcome.def.quick || self.skip_cutscenes;
        if quick_path {
            self.commit_outcome(outcome, context, false, console);
            self.begin_cooldown();
            // No Playing phase, so the paused ambient comes back right away.
            self.arbiter.resume_paused_equipped(self.audio.as_mut());
        } else {
            self.events.emit(SessionEvent::CutsceneEntered);
            self.trigger_enabled = false;
            if let Some(id) = self.cooldown_timer.take() {
                self.timers.cancel(id);
            }
            let display_was_visible = self.result_display_visible;
            self.result_display_visible = false;
            info!(def_name = %outcome.def.def_name, "cutscene_entered");
            self.orchestrator.enter(outcome, context, display_was_visible);
        }

        self.maybe_show_next_toast(console);
        // Counters persist after the synchronous portion no matter how the
        // cutscene ends.
        self.save_profile();
    }

    fn commit_outcome(
        &mut self,
        outcome: RollOutcome,
        context: RollContext,
        stalled: bool,
        console: &mut ConsoleState,
    ) {
        if stalled {
            warn!(
                def_name = %outcome.def.def_name,
                roll_index = context.roll_index,
                "cutscene_failsafe_recovered_stall"
            );
        }

        let result_line = if context.persisted {
            let item = InventoryItem {
                title: outcome.title.clone(),
                rarity_class: outcome.def.class.clone(),
                rolled_at_index: context.roll_index,
            };
            self.inventory.push(item);
            self.events.emit(SessionEvent::ItemPersisted);
            format!(
                "ok: rolled {} \"{}\" (slot {})",
                outcome.def.def_name,
                outcome.title,
                self.inventory.len() - 1
            )
        } else {
            debug!(
                roll_index = context.roll_index,
                auto_deleted = context.auto_deleted,
                "outcome_not_persisted"
            );
            format!(
                "ok: rolled {} \"{}\" (auto-deleted)",
                outcome.def.def_name, outcome.title
            )
        };
        console.append_output_line(result_line.clone());
        self.last_result_line = Some(result_line);

        self.maybe_show_next_toast(console);
        self.save_profile();
    }

    fn handle_cutscene_signal(&mut self, signal: CutsceneSignal, console: &mut ConsoleState) {
        match signal {
            CutsceneSignal::Visual { state } => {
                self.events.emit(SessionEvent::CutsceneVisual);
                debug!(state = %state, "cutscene_visual");
            }
            CutsceneSignal::StartAudio { sound_id } => {
                self.arbiter
                    .set_current(self.audio.as_mut(), &sound_id, CUTSCENE_AUDIO_VOLUME, false);
            }
            CutsceneSignal::Completed { stalled } => {
                let Some((outcome, context, restore_display)) = self.orchestrator.take_finished()
                else {
                    return;
                };
                self.events.emit(SessionEvent::CutsceneFinished { stalled });
                if restore_display {
                    self.result_display_visible = true;
                }
                self.commit_outcome(outcome, context, stalled, console);
                self.trigger_enabled = true;
                self.arbiter.resume_paused_equipped(self.audio.as_mut());
            }
        }
    }

    fn handle_timer(&mut self, timer: SessionTimer, console: &mut ConsoleState) {
        match timer {
            SessionTimer::CooldownElapsed => {
                self.cooldown_timer = None;
                if !self.orchestrator.is_active() {
                    self.trigger_enabled = true;
                }
            }
            SessionTimer::ToastElapsed => {
                self.achievements.finish_active_toast();
                self.maybe_show_next_toast(console);
            }
            SessionTimer::BonusWindowOpen => {
                self.bonus_window_open = true;
                self.timers.push(
                    BONUS_WINDOW_DURATION_SECONDS,
                    SessionTimer::BonusWindowClose,
                );
                console.append_output_line("ok: bonus window open (reduced cooldown)");
                info!("bonus_window_opened");
            }
            SessionTimer::BonusWindowClose => {
                self.bonus_window_open = false;
                self.timers
                    .push(BONUS_WINDOW_INTERVAL_SECONDS, SessionTimer::BonusWindowOpen);
                info!("bonus_window_closed");
            }
        }
    }

    fn maybe_show_next_toast(&mut self, console: &mut ConsoleState) {
        if let Some(def) = self.achievements.take_next_toast() {
            console.append_output_line(format!("achievement: {}", def.label));
            info!(achievement = def.id, "achievement_toast_shown");
            self.timers
                .push(ACHIEVEMENT_TOAST_SECONDS, SessionTimer::ToastElapsed);
        }
    }

    fn advance_play_time(&mut self, fixed_dt_seconds: f32, console: &mut ConsoleState) {
        self.play_time_accum_seconds += fixed_dt_seconds;
        while self.play_time_accum_seconds >= PLAY_TIME_TICK_SECONDS {
            self.play_time_accum_seconds -= PLAY_TIME_TICK_SECONDS;
            self.play_time_seconds = self.play_time_seconds.saturating_add(1);
            for _unlock in self
                .achievements
                .on_elapsed_time_changed(self.play_time_seconds)
            {
                self.events.emit(SessionEvent::AchievementUnlocked);
            }
        }
        self.maybe_show_next_toast(console);
    }

    fn handle_command(&mut self, command: &ControlCommand, console: &mut ConsoleState) {
        match command {
            ControlCommand::Roll => self.submit_roll(console),
            ControlCommand::Equip { slot } => self.equip_slot(*slot, console),
            ControlCommand::Unequip => self.unequip(console),
            ControlCommand::Delete { slot } => self.delete_slot(*slot, console),
            ControlCommand::Exclude { bucket, enabled } => {
                self.set_excluded(bucket, *enabled, console)
            }
            ControlCommand::Skip { enabled } => {
                self.skip_cutscenes = *enabled;
                console.append_output_line(format!(
                    "ok: skip cutscenes {}",
                    if *enabled { "on" } else { "off" }
                ));
                self.save_profile();
            }
            ControlCommand::Display { enabled } => self.set_display_visible(*enabled, console),
            ControlCommand::Inventory => self.list_inventory(console),
            ControlCommand::Status => self.print_status(console),
            ControlCommand::Quit => {
                self.quit_requested = true;
            }
        }
    }

    fn equip_slot(&mut self, slot: u32, console: &mut ConsoleState) {
        if self.orchestrator.is_active() {
            console.append_output_line("error: cannot change equipment during a cutscene");
            return;
        }
        let Some(item) = self.inventory.get(slot as usize) else {
            console.append_output_line(format!("error: no inventory item in slot {slot}"));
            return;
        };
        let equipped = EquippedItem {
            title: item.title.clone(),
            rarity_class: item.rarity_class.clone(),
            rolled_at_index: Some(item.rolled_at_index),
        };
        let ambient_id = Self::ambient_handle_id(&equipped.rarity_class);
        self.arbiter.set_equipped_ambient(Some(ambient_id.clone()));
        self.arbiter
            .set_current(self.audio.as_mut(), &ambient_id, EQUIPPED_AUDIO_VOLUME, true);
        console.append_output_line(format!(
            "ok: equipped \"{}\" ({})",
            equipped.title, equipped.rarity_class
        ));
        self.equipped = Some(equipped);
        self.save_profile();
    }

    fn unequip(&mut self, console: &mut ConsoleState) {
        if self.orchestrator.is_active() {
            console.append_output_line("error: cannot change equipment during a cutscene");
            return;
        }
        if self.equipped.take().is_none() {
            console.append_output_line("ok: nothing equipped");
            return;
        }
        self.arbiter.set_equipped_ambient(None);
        self.arbiter.clear_current(self.audio.as_mut());
        console.append_output_line("ok: unequipped");
        self.save_profile();
    }

    fn delete_slot(&mut self, slot: u32, console: &mut ConsoleState) {
        let index = slot as usize;
        if index >= self.inventory.len() {
            console.append_output_line(format!("error: no inventory item in slot {slot}"));
            return;
        }
        let removed = self.inventory.remove(index);
        self.events.emit(SessionEvent::ItemRemoved);

        let equipped_matches = self.equipped.as_ref().is_some_and(|equipped| {
            equipped.title == removed.title && equipped.rarity_class == removed.rarity_class
        });
        if equipped_matches {
            self.equipped = None;
            self.arbiter.set_equipped_ambient(None);
            self.arbiter.clear_current(self.audio.as_mut());
        }

        console.append_output_line(format!(
            "ok: deleted \"{}\" from slot {slot}",
            removed.title
        ));
        self.save_profile();
    }

    fn set_excluded(&mut self, bucket_token: &str, enabled: bool, console: &mut ConsoleState) {
        let Some(bucket) = RarityBucket::from_token(bucket_token) else {
            console.append_output_line(format!(
                "error: unknown bucket '{bucket_token}' (expected under1k|under10k|under100k|over100k)"
            ));
            return;
        };
        if enabled {
            self.excluded_buckets.insert(bucket);
        } else {
            self.excluded_buckets.remove(&bucket);
        }
        console.append_output_line(format!(
            "ok: auto-delete {} for {}",
            if enabled { "on" } else { "off" },
            bucket.as_token()
        ));
        self.save_profile();
    }

    fn set_display_visible(&mut self, enabled: bool, console: &mut ConsoleState) {
        if self.orchestrator.is_active() {
            // The display stays hidden for the cutscene either way; this
            // only decides whether it comes back on exit.
            if enabled {
                self.orchestrator.note_display_requested_by_user();
            } else {
                self.orchestrator.note_display_hidden_by_user();
            }
        } else {
            self.result_display_visible = enabled;
        }
        console.append_output_line(format!(
            "ok: result display {}",
            if enabled { "on" } else { "off" }
        ));
    }

    fn list_inventory(&mut self, console: &mut ConsoleState) {
        if self.inventory.is_empty() {
            console.append_output_line("ok: inventory empty");
            return;
        }
        for (index, item) in self.inventory.iter().enumerate() {
            console.append_output_line(format!(
                "slot {index}: \"{}\" {} (roll {})",
                item.title, item.rarity_class, item.rolled_at_index
            ));
        }
    }

    fn print_status(&mut self, console: &mut ConsoleState) {
        let equipped = match &self.equipped {
            Some(item) => format!("\"{}\"", item.title),
            None => "none".to_string(),
        };
        console.append_output_line(format!(
            "status v1 rolls:{} inv:{} equipped:{} cutscene:{} trigger:{} bonus:{} skip:{} discovered:{} excluded:{}",
            self.roll_count,
            self.inventory.len(),
            equipped,
            if self.orchestrator.is_active() { 1 } else { 0 },
            if self.trigger_enabled() { 1 } else { 0 },
            if self.bonus_window_open { 1 } else { 0 },
            if self.skip_cutscenes { 1 } else { 0 },
            self.discovered_buckets.len(),
            self.excluded_buckets.len(),
        ));
        if self.result_display_visible {
            if let Some(line) = &self.last_result_line {
                console.append_output_line(format!("result: {line}"));
            }
        }
        if let Some(toast) = self.achievements.active_toast() {
            console.append_output_line(format!("toast: {}", toast.label));
        }
    }
}
