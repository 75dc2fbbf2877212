impl Session for RollSession {
    fn load(&mut self, app_paths: &AppPaths, table: RarityTable) {
        let store = ProfileStore::new(app_paths);
        let profile = store.load();
        self.store = Some(store);
        self.apply_profile(profile);
        self.resolver = Some(RarityResolver::new(table));

        if let Some(equipped) = &self.equipped {
            let ambient_id = Self::ambient_handle_id(&equipped.rarity_class);
            self.arbiter.set_equipped_ambient(Some(ambient_id.clone()));
            self.arbiter
                .set_current(self.audio.as_mut(), &ambient_id, EQUIPPED_AUDIO_VOLUME, true);
        }

        self.trigger_enabled = true;
        self.timers
            .push(BONUS_WINDOW_INTERVAL_SECONDS, SessionTimer::BonusWindowOpen);

        info!(
            roll_count = self.roll_count,
            inventory_len = self.inventory.len(),
            discovered = self.discovered_buckets.len(),
            excluded = self.excluded_buckets.len(),
            skip_cutscenes = self.skip_cutscenes,
            "session_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        commands: &[ControlCommand],
        console: &mut ConsoleState,
    ) -> SessionCommand {
        for timer in self.timers.tick(fixed_dt_seconds) {
            self.handle_timer(timer, console);
        }
        self.advance_play_time(fixed_dt_seconds, console);

        for signal in self.orchestrator.tick(fixed_dt_seconds) {
            self.handle_cutscene_signal(signal, console);
        }

        for command in commands {
            self.handle_command(command, console);
        }

        self.events.finish_tick_rollover();

        if self.quit_requested {
            SessionCommand::Quit
        } else {
            SessionCommand::None
        }
    }

    fn unload(&mut self) {
        self.save_profile();
        self.timers.clear();
        info!(
            roll_count = self.roll_count,
            play_time_seconds = self.play_time_seconds,
            "session_unloaded"
        );
    }

    fn telemetry_frame(&self, tick_index: u64) -> Option<String> {
        let counts = self.events.last_tick_counts();
        Some(format!(
            "rollmill.frame v1 tick:{} rolls:{} cutscene:{} trigger:{} inv:{} ev:{}",
            tick_index,
            self.roll_count,
            if self.orchestrator.is_active() { 1 } else { 0 },
            if self.trigger_enabled() { 1 } else { 0 },
            self.inventory.len(),
            counts.total,
        ))
    }
}
