pub(crate) fn classify_bucket(class: &str) -> Option<RarityBucket> {
    CLASS_BUCKET_PREFIXES
        .iter()
        .find_map(|(prefix, bucket)| class.starts_with(prefix).then_some(*bucket))
}

pub(crate) struct PersistenceGate;

impl PersistenceGate {
    /// Decides persist-vs-discard and records bucket discovery. Runs before
    /// the cutscene/audio step: the arbiter's resume decision and the
    /// playback suppression both depend on the result.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn apply(
        outcome: &RollOutcome,
        roll_index: u64,
        excluded: &BTreeSet<RarityBucket>,
        discovered: &mut BTreeSet<RarityBucket>,
        arbiter: &mut AudioArbiter,
        achievements: &mut AchievementTracker,
        events: &mut SessionEventBus,
    ) -> RollContext {
        let rarity_bucket = classify_bucket(&outcome.def.class);

        if let Some(bucket) = rarity_bucket {
            if discovered.insert(bucket) {
                events.emit(SessionEvent::BucketDiscovered { bucket });
                for _unlock in achievements.on_bucket_discovered(bucket) {
                    events.emit(SessionEvent::AchievementUnlocked);
                }
                info!(bucket = bucket.as_token(), "bucket_discovered");
            }
        }

        let auto_deleted = rarity_bucket.is_some_and(|bucket| excluded.contains(&bucket));
        if auto_deleted {
            // Nothing new was kept, so the paused ambient comes back after
            // the cutscene even if the outcome carried its own background.
            arbiter.request_resume_after_cutscene();
            events.emit(SessionEvent::OutcomeAutoDeleted);
            debug!(
                def_name = %outcome.def.def_name,
                bucket = ?rarity_bucket.map(RarityBucket::as_token),
                "outcome_auto_deleted"
            );
        }

        RollContext {
            roll_index,
            persisted: !auto_deleted,
            auto_deleted,
            rarity_bucket,
        }
    }
}
