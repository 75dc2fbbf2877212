use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;

use engine::{
    AppPaths, AudioArbiter, AudioHandleProvider, ConsoleState, ControlCommand, NullAudioProvider,
    RarityDef, RarityTable, Session, SessionCommand, TickTimers, TimerId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// Override pool priority. 10 is checked before 15 on purpose: the shipped
// balance depends on this exact order, so it stays verbatim.
const OVERRIDE_MODULUS_PRIORITY: [u64; 9] = [333, 69, 50, 30, 20, 10, 15, 7, 5];
const OVERRIDE_FLOOR_WEIGHT: f64 = 0.5;
const CUTSCENE_FAILSAFE_SECONDS: f32 = 30.0;
const CUTSCENE_TAIL_SECONDS: f32 = 0.5;
const BASE_ROLL_COOLDOWN_SECONDS: f32 = 2.0;
const BONUS_ROLL_COOLDOWN_SECONDS: f32 = 0.75;
const BONUS_WINDOW_INTERVAL_SECONDS: f32 = 90.0;
const BONUS_WINDOW_DURATION_SECONDS: f32 = 10.0;
const ACHIEVEMENT_TOAST_SECONDS: f32 = 3.0;
const PLAY_TIME_TICK_SECONDS: f32 = 1.0;
const CUTSCENE_AUDIO_VOLUME: f32 = 0.9;
const EQUIPPED_AUDIO_VOLUME: f32 = 0.6;
const PROFILE_SAVE_VERSION: u32 = 1;
const PROFILE_FILE: &str = "profile.save.json";

const CLASS_BUCKET_PREFIXES: &[(&str, RarityBucket)] = &[
    ("basic", RarityBucket::Under1k),
    ("fine", RarityBucket::Under10k),
    ("grand", RarityBucket::Under100k),
    ("exalted", RarityBucket::Over100k),
    ("mythic", RarityBucket::Over100k),
];

include!("types.rs");
include!("resolver.rs");
include!("gate.rs");
include!("orchestrator.rs");
include!("achievements.rs");
include!("profile.rs");
include!("session_state.rs");
include!("session_impl.rs");

pub(crate) fn build_session(seed: Option<u64>) -> Box<dyn Session> {
    Box::new(RollSession::new(Box::new(NullAudioProvider), seed))
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
