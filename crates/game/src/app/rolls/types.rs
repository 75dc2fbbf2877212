#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum RarityBucket {
    Under1k,
    Under10k,
    Under100k,
    Over100k,
}

impl RarityBucket {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Under1k => "under1k",
            Self::Under10k => "under10k",
            Self::Under100k => "under100k",
            Self::Over100k => "over100k",
        }
    }

    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "under1k" => Some(Self::Under1k),
            "under10k" => Some(Self::Under10k),
            "under100k" => Some(Self::Under100k),
            "over100k" => Some(Self::Over100k),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RollOutcome {
    pub def: RarityDef,
    pub title: String,
}

/// Per-roll transient state; fully determined once the persistence gate has
/// run. Never outlives the roll that created it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RollContext {
    pub roll_index: u64,
    pub persisted: bool,
    pub auto_deleted: bool,
    pub rarity_bucket: Option<RarityBucket>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InventoryItem {
    pub title: String,
    pub rarity_class: String,
    pub rolled_at_index: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EquippedItem {
    pub title: String,
    pub rarity_class: String,
    pub rolled_at_index: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SessionTimer {
    CooldownElapsed,
    ToastElapsed,
    BonusWindowOpen,
    BonusWindowClose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SessionEvent {
    RollResolved { persisted: bool },
    BucketDiscovered { bucket: RarityBucket },
    ItemPersisted,
    ItemRemoved,
    OutcomeAutoDeleted,
    CutsceneEntered,
    CutsceneVisual,
    CutsceneFinished { stalled: bool },
    AchievementUnlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEventKind {
    RollResolved,
    BucketDiscovered,
    ItemPersisted,
    ItemRemoved,
    OutcomeAutoDeleted,
    CutsceneEntered,
    CutsceneVisual,
    CutsceneFinished,
    AchievementUnlocked,
}

impl SessionEvent {
    fn kind(self) -> SessionEventKind {
        match self {
            Self::RollResolved { .. } => SessionEventKind::RollResolved,
            Self::BucketDiscovered { .. } => SessionEventKind::BucketDiscovered,
            Self::ItemPersisted => SessionEventKind::ItemPersisted,
            Self::ItemRemoved => SessionEventKind::ItemRemoved,
            Self::OutcomeAutoDeleted => SessionEventKind::OutcomeAutoDeleted,
            Self::CutsceneEntered => SessionEventKind::CutsceneEntered,
            Self::CutsceneVisual => SessionEventKind::CutsceneVisual,
            Self::CutsceneFinished { .. } => SessionEventKind::CutsceneFinished,
            Self::AchievementUnlocked => SessionEventKind::AchievementUnlocked,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionEventCounts {
    pub total: u32,
    pub roll_resolved: u32,
    pub bucket_discovered: u32,
    pub item_persisted: u32,
    pub item_removed: u32,
    pub outcome_auto_deleted: u32,
    pub cutscene_entered: u32,
    pub cutscene_visual: u32,
    pub cutscene_finished: u32,
    pub achievement_unlocked: u32,
}

impl SessionEventCounts {
    fn record(&mut self, kind: SessionEventKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            SessionEventKind::RollResolved => {
                self.roll_resolved = self.roll_resolved.saturating_add(1)
            }
            SessionEventKind::BucketDiscovered => {
                self.bucket_discovered = self.bucket_discovered.saturating_add(1)
            }
            SessionEventKind::ItemPersisted => {
                self.item_persisted = self.item_persisted.saturating_add(1)
            }
            SessionEventKind::ItemRemoved => {
                self.item_removed = self.item_removed.saturating_add(1)
            }
            SessionEventKind::OutcomeAutoDeleted => {
                self.outcome_auto_deleted = self.outcome_auto_deleted.saturating_add(1)
            }
            SessionEventKind::CutsceneEntered => {
                self.cutscene_entered = self.cutscene_entered.saturating_add(1)
            }
            SessionEventKind::CutsceneVisual => {
                self.cutscene_visual = self.cutscene_visual.saturating_add(1)
            }
            SessionEventKind::CutsceneFinished => {
                self.cutscene_finished = self.cutscene_finished.saturating_add(1)
            }
            SessionEventKind::AchievementUnlocked => {
                self.achievement_unlocked = self.achievement_unlocked.saturating_add(1)
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct SessionEventBus {
    current_tick_events: Vec<SessionEvent>,
    last_tick_counts: SessionEventCounts,
}

impl SessionEventBus {
    pub(crate) fn emit(&mut self, event: SessionEvent) {
        self.current_tick_events.push(event);
    }

    pub(crate) fn iter_emitted_so_far(&self) -> impl Iterator<Item = &SessionEvent> {
        self.current_tick_events.iter()
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        let mut counts = SessionEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        self.current_tick_events.clear();
    }

    pub(crate) fn last_tick_counts(&self) -> SessionEventCounts {
        self.last_tick_counts
    }
}
