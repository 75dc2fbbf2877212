#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AchievementDef {
    pub id: &'static str,
    pub label: &'static str,
}

const BUCKET_ACHIEVEMENTS: &[(RarityBucket, AchievementDef)] = &[
    (
        RarityBucket::Under1k,
        AchievementDef {
            id: "bucket.under1k",
            label: "Common Ground",
        },
    ),
    (
        RarityBucket::Under10k,
        AchievementDef {
            id: "bucket.under10k",
            label: "Fine Print",
        },
    ),
    (
        RarityBucket::Under100k,
        AchievementDef {
            id: "bucket.under100k",
            label: "Grand Entrance",
        },
    ),
    (
        RarityBucket::Over100k,
        AchievementDef {
            id: "bucket.over100k",
            label: "Beyond the Veil",
        },
    ),
];

const ROLL_COUNT_ACHIEVEMENTS: &[(u64, AchievementDef)] = &[
    (
        10,
        AchievementDef {
            id: "rolls.10",
            label: "Warming Up",
        },
    ),
    (
        100,
        AchievementDef {
            id: "rolls.100",
            label: "Habit Forming",
        },
    ),
    (
        1000,
        AchievementDef {
            id: "rolls.1000",
            label: "Thousand Hands",
        },
    ),
];

const PLAY_TIME_ACHIEVEMENTS: &[(u64, AchievementDef)] = &[
    (
        600,
        AchievementDef {
            id: "time.600",
            label: "Ten Minutes In",
        },
    ),
    (
        3600,
        AchievementDef {
            id: "time.3600",
            label: "A Full Hour",
        },
    ),
];

/// Fixed-table achievement bookkeeping. Unlocks are idempotent; each unlock
/// enqueues one toast and toasts display strictly one at a time.
pub(crate) struct AchievementTracker {
    unlocked: BTreeSet<String>,
    pending_toasts: VecDeque<AchievementDef>,
    active_toast: Option<AchievementDef>,
}

impl AchievementTracker {
    pub(crate) fn from_unlocked(unlocked: BTreeSet<String>) -> Self {
        Self {
            unlocked,
            pending_toasts: VecDeque::new(),
            active_toast: None,
        }
    }

    pub(crate) fn unlocked_ids(&self) -> &BTreeSet<String> {
        &self.unlocked
    }

    pub(crate) fn on_bucket_discovered(&mut self, bucket: RarityBucket) -> Vec<AchievementDef> {
        let mut newly = Vec::new();
        for (candidate_bucket, def) in BUCKET_ACHIEVEMENTS {
            if *candidate_bucket == bucket && self.unlock(*def) {
                newly.push(*def);
            }
        }
        newly
    }

    pub(crate) fn on_roll_count_changed(&mut self, count: u64) -> Vec<AchievementDef> {
        let mut newly = Vec::new();
        for (threshold, def) in ROLL_COUNT_ACHIEVEMENTS {
            if count >= *threshold && self.unlock(*def) {
                newly.push(*def);
            }
        }
        newly
    }

    pub(crate) fn on_elapsed_time_changed(&mut self, seconds: u64) -> Vec<AchievementDef> {
        let mut newly = Vec::new();
        for (threshold, def) in PLAY_TIME_ACHIEVEMENTS {
            if seconds >= *threshold && self.unlock(*def) {
                newly.push(*def);
            }
        }
        newly
    }

    fn unlock(&mut self, def: AchievementDef) -> bool {
        if !self.unlocked.insert(def.id.to_string()) {
            return false;
        }
        self.pending_toasts.push_back(def);
        true
    }

    /// Promote the next queued toast if no toast is currently showing.
    pub(crate) fn take_next_toast(&mut self) -> Option<AchievementDef> {
        if self.active_toast.is_some() {
            return None;
        }
        let next = self.pending_toasts.pop_front()?;
        self.active_toast = Some(next);
        Some(next)
    }

    pub(crate) fn finish_active_toast(&mut self) {
        self.active_toast = None;
    }

    pub(crate) fn active_toast(&self) -> Option<AchievementDef> {
        self.active_toast
    }
}
