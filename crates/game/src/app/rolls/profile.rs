#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SavedInventoryItem {
    pub title: String,
    pub rarity_class: String,
    pub rolled_at_index: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SavedEquippedItem {
    pub title: String,
    pub rarity_class: String,
    #[serde(default)]
    pub rolled_at_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SavedProfile {
    pub save_version: u32,
    pub roll_count: u64,
    pub play_time_seconds: u64,
    pub inventory: Vec<SavedInventoryItem>,
    pub equipped: Option<SavedEquippedItem>,
    pub discovered_buckets: Vec<String>,
    pub excluded_buckets: Vec<String>,
    pub unlocked_achievements: Vec<String>,
    pub skip_cutscenes: bool,
}

impl Default for SavedProfile {
    fn default() -> Self {
        Self {
            save_version: PROFILE_SAVE_VERSION,
            roll_count: 0,
            play_time_seconds: 0,
            inventory: Vec::new(),
            equipped: None,
            discovered_buckets: Vec::new(),
            excluded_buckets: Vec::new(),
            unlocked_achievements: Vec::new(),
            skip_cutscenes: false,
        }
    }
}

/// Versioned profile document on disk. Loading never fails: corrupt,
/// missing, or out-of-version content falls back to defaults, and an
/// equipped item that no longer exists in the inventory is cleared.
pub(crate) struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub(crate) fn new(app_paths: &AppPaths) -> Self {
        Self {
            path: app_paths.cache_dir.join("saves").join(PROFILE_FILE),
        }
    }

    #[cfg(test)]
    pub(crate) fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn load(&self) -> SavedProfile {
        if !self.path.exists() {
            info!(path = %self.path.display(), "profile_missing_starting_fresh");
            return SavedProfile::default();
        }

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "profile_read_failed_starting_fresh"
                );
                return SavedProfile::default();
            }
        };

        let parsed = match Self::parse_profile_json(&raw) {
            Ok(profile) => profile,
            Err(reason) => {
                warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    "profile_parse_failed_starting_fresh"
                );
                return SavedProfile::default();
            }
        };

        if parsed.save_version != PROFILE_SAVE_VERSION {
            warn!(
                expected = PROFILE_SAVE_VERSION,
                actual = parsed.save_version,
                "profile_version_mismatch_starting_fresh"
            );
            return SavedProfile::default();
        }

        Self::heal_profile(parsed)
    }

    fn parse_profile_json(raw: &str) -> Result<SavedProfile, String> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        match serde_path_to_error::deserialize::<_, SavedProfile>(&mut deserializer) {
            Ok(profile) => Ok(profile),
            Err(error) => {
                let field_path = error.path().to_string();
                let source = error.into_inner();
                if field_path.is_empty() || field_path == "." {
                    Err(format!("parse profile json: {source}"))
                } else {
                    Err(format!("parse profile json at {field_path}: {source}"))
                }
            }
        }
    }

    /// Self-healing pass over a structurally valid profile: drop unknown
    /// bucket tokens and clear an equipped slot that references nothing.
    fn heal_profile(mut profile: SavedProfile) -> SavedProfile {
        profile.discovered_buckets.retain(|token| {
            let known = RarityBucket::from_token(token).is_some();
            if !known {
                warn!(token = token.as_str(), "unknown_discovered_bucket_dropped");
            }
            known
        });
        profile.excluded_buckets.retain(|token| {
            let known = RarityBucket::from_token(token).is_some();
            if !known {
                warn!(token = token.as_str(), "unknown_excluded_bucket_dropped");
            }
            known
        });

        if let Some(equipped) = &profile.equipped {
            let exists = profile.inventory.iter().any(|item| {
                item.title == equipped.title && item.rarity_class == equipped.rarity_class
            });
            if !exists {
                warn!(
                    title = %equipped.title,
                    rarity_class = %equipped.rarity_class,
                    "equipped_item_missing_from_inventory_cleared"
                );
                profile.equipped = None;
            }
        }

        profile
    }

    pub(crate) fn save(&self, profile: &SavedProfile) -> Result<(), String> {
        let json = serde_json::to_string_pretty(profile)
            .map_err(|error| format!("encode profile json: {error}"))?;
        engine::write_text_atomic(&self.path, &json)
            .map_err(|error| format!("write profile '{}': {error}", self.path.display()))
    }
}
