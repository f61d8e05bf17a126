//! Wire codec for session messages.
//!
//! Inbound frames are decoded once at the transport boundary into
//! [`ServerMessage`]; any `type` we do not handle becomes
//! [`ServerMessage::Ignored`]. Outbound commands are [`ClientCommand`]
//! values serialized with the `cmd` tag.

use rand::Rng;
use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::SessionError;

/// Fingerprint length in characters.
pub const FINGERPRINT_LEN: usize = 64;
const HEX_ALPHABET: &[u8] = b"0123456789abcdef";

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "initGame")]
    InitGame {
        #[serde(default)]
        data: InitData,
    },
    #[serde(rename = "gameState")]
    GameState {
        #[serde(default, deserialize_with = "optional_whole_number")]
        frame: Option<i64>,
        #[serde(default, deserialize_with = "whole_number")]
        dir: i64,
    },
    #[serde(rename = "gameOver")]
    GameOver {
        #[serde(default)]
        success: bool,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Ignored,
}

/// Accepts `1` and `1.0` alike, rounding floats to the nearest integer.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let n = Number::deserialize(deserializer)?;
    n.as_i64()
        .or_else(|| n.as_f64().map(|f| f.round() as i64))
        .ok_or_else(|| D::Error::custom(format!("number out of range: {n}")))
}

fn optional_whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(None),
        Some(n) => whole_number(n).map(Some).map_err(D::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitData {
    /// Echoed back verbatim in the `end` command.
    #[serde(default)]
    pub transaction_id: Value,
    #[serde(default)]
    pub random_fish: FishData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishData {
    pub fish_name: Option<String>,
    pub fill_rate: Option<f64>,
    pub drain_rate: Option<f64>,
    pub difficulty_rate: Option<f64>,
}

pub fn decode(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ClientCommand {
    Prepare {
        range: String,
        #[serde(rename = "themeId")]
        theme_id: String,
        #[serde(rename = "fishingMultiplier")]
        fishing_multiplier: u32,
        #[serde(rename = "isMonsterFight")]
        is_monster_fight: bool,
        #[serde(rename = "xDeviceFingerprint")]
        fingerprint: String,
    },
    Start,
    End {
        #[serde(rename = "transactionId")]
        transaction_id: Value,
        rep: Replay,
        en: u8,
    },
}

impl ClientCommand {
    pub fn prepare(range: &str, theme_id: &str, fingerprint: String) -> Self {
        ClientCommand::Prepare {
            range: range.to_string(),
            theme_id: theme_id.to_string(),
            fishing_multiplier: 1,
            is_monster_fight: false,
            fingerprint,
        }
    }

    pub fn encode(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Replay block of the `end` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replay {
    pub fs: u32,
    pub ns: u32,
    pub fps: u32,
    pub frs: Vec<Frame>,
}

/// One recorded frame: `[tracker, target]`, optionally extended with the
/// service-reported `[frame, dir]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub tracker: i64,
    pub target: i64,
    pub report: Option<FrameReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: Option<i64>,
    pub dir: i64,
}

impl Frame {
    pub fn new(tracker: i64, target: i64) -> Self {
        Self { tracker, target, report: None }
    }

    /// Number of fields this frame serializes to (2 or 4).
    pub fn width(&self) -> usize {
        if self.report.is_some() {
            4
        } else {
            2
        }
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.width()))?;
        seq.serialize_element(&self.tracker)?;
        seq.serialize_element(&self.target)?;
        if let Some(report) = &self.report {
            seq.serialize_element(&report.frame)?;
            seq.serialize_element(&report.dir)?;
        }
        seq.end()
    }
}

/// Random per-session device fingerprint (lowercase hex).
pub fn fingerprint<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..FINGERPRINT_LEN)
        .map(|_| HEX_ALPHABET[rng.gen_range(0..HEX_ALPHABET.len())] as char)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
