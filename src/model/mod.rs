//! Threat model documents and the records the game produces.
//!
//! The design artifact is kept as an opaque [`serde_json::Value`] so unknown
//! fields survive the export untouched; [`ThreatModel`] only reaches into the
//! handful of paths the merge needs. Game output (identified threats and
//! player metadata) is decoded into typed, insertion-ordered maps.

pub mod merge;
pub mod threat_type;

pub use merge::{MergeReport, merge_identified_threats};
pub use threat_type::{StrideCategory, UNKNOWN_THREAT_TYPE, decode_threat_type};

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Identified threats
// ============================================================================

/// Threat records keyed by threat index, in insertion order.
pub type ThreatRecords = IndexMap<String, IdentifiedThreat>;

/// Threats keyed by component (cell) id.
pub type ComponentThreats = IndexMap<String, ThreatRecords>;

/// Threats keyed by diagram index, then component id, then threat index.
pub type IdentifiedThreats = IndexMap<String, ComponentThreats>;

/// Coded STRIDE type as emitted by the game: a numeric index or a string code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreatCode {
    /// Numeric category index.
    Index(u64),
    /// Letter code or label.
    Code(String),
    /// Anything else the game sent.
    Other(Value),
}

/// Reference to a player, as a number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerRef {
    /// Numeric player index.
    Index(u64),
    /// Player index as a string.
    Key(String),
    /// Anything else the game sent.
    Other(Value),
}

impl PlayerRef {
    /// Returns the player index if this reference is numeric.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => usize::try_from(*i).ok(),
            Self::Key(k) => k.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

impl std::fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

/// A threat recorded during play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedThreat {
    /// Threat identifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    /// Severity label, e.g. `High`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub severity: Option<String>,
    /// Coded STRIDE category.
    #[serde(default, rename = "type")]
    pub threat_type: Option<ThreatCode>,
    /// Short title.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    /// Free-form description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    /// Proposed mitigation.
    #[serde(default, deserialize_with = "lenient_string")]
    pub mitigation: Option<String>,
    /// Player who identified the threat.
    #[serde(default)]
    pub owner: Option<PlayerRef>,
}

/// Reads a text field that the game may also emit as a number or boolean.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// The game's own state (`G`).
///
/// Decoding is lenient per level: a diagram, component or record that is
/// `null` or not an object is skipped and counted in `skipped_entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Threats identified so far.
    pub identified_threats: IdentifiedThreats,
    /// Entries of `identifiedThreats` dropped while decoding.
    #[serde(skip)]
    pub skipped_entries: usize,
}

impl<'de> Deserialize<'de> for GameState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RawGameState {
            #[serde(default)]
            identified_threats: Value,
        }

        let raw = RawGameState::deserialize(deserializer)?;
        let mut state = Self::default();
        let diagrams = match raw.identified_threats {
            Value::Object(diagrams) => diagrams,
            Value::Null => return Ok(state),
            _ => {
                state.skipped_entries = 1;
                return Ok(state);
            }
        };

        for (diagram, components) in diagrams {
            let Value::Object(components) = components else {
                state.skipped_entries += 1;
                continue;
            };
            let by_component = state.identified_threats.entry(diagram).or_default();
            for (component, records) in components {
                let Value::Object(records) = records else {
                    state.skipped_entries += 1;
                    continue;
                };
                let by_index = by_component.entry(component).or_default();
                for (index, record) in records {
                    match record {
                        Value::Object(_) => match serde_json::from_value(record) {
                            Ok(threat) => {
                                by_index.insert(index, threat);
                            }
                            Err(_) => state.skipped_entries += 1,
                        },
                        _ => state.skipped_entries += 1,
                    }
                }
            }
        }
        Ok(state)
    }
}

/// Engine state document as persisted by the game server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoredState {
    /// Game state proper.
    #[serde(default, rename = "G", alias = "state")]
    pub game: GameState,
}

// ============================================================================
// Session metadata
// ============================================================================

/// Per-player entry of the session metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetadata {
    /// Player index.
    #[serde(default)]
    pub id: Option<u64>,
    /// Display name, set at enrollment.
    #[serde(default)]
    pub name: Option<String>,
}

/// Session metadata: the enrolled players.
///
/// The game server stores players as an object keyed by the decimal index;
/// a plain list (index = position) is accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    /// Players by index.
    pub players: BTreeMap<usize, PlayerMetadata>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlayers {
    List(Vec<PlayerMetadata>),
    Map(IndexMap<String, PlayerMetadata>),
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    players: Option<RawPlayers>,
}

impl<'de> Deserialize<'de> for SessionMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawMetadata::deserialize(deserializer)?;
        let players = match raw.players {
            None => BTreeMap::new(),
            Some(RawPlayers::List(list)) => list.into_iter().enumerate().collect(),
            Some(RawPlayers::Map(map)) => map
                .into_iter()
                .filter_map(|(key, player)| key.trim().parse().ok().map(|idx| (idx, player)))
                .collect(),
        };
        Ok(Self { players })
    }
}

impl SessionMetadata {
    /// Display name of the player at `index`, if known.
    #[must_use]
    pub fn player_name(&self, index: usize) -> Option<&str> {
        self.players
            .get(&index)
            .and_then(|p| p.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Resolves an owner reference to a display name.
    ///
    /// Falls back to the raw reference when no named player matches.
    #[must_use]
    pub fn resolve_owner(&self, owner: &PlayerRef) -> String {
        owner
            .index()
            .and_then(|idx| self.player_name(idx))
            .map_or_else(|| owner.to_string(), str::to_owned)
    }
}

// ============================================================================
// Threat model document
// ============================================================================

/// A design artifact ("model") being exported.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatModel(Value);

impl ThreatModel {
    /// Wraps a document.
    #[must_use]
    pub const fn new(document: Value) -> Self {
        Self(document)
    }

    /// `summary.title`, if present and a string.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.0.pointer("/summary/title").and_then(Value::as_str)
    }

    /// Download filename: the title plus `.json`.
    ///
    /// Characters that would break a `Content-Disposition` value are replaced
    /// with `_`. An absent or blank title falls back to `"{fallback}.json"`.
    #[must_use]
    pub fn export_filename(&self, fallback: &str) -> String {
        let stem = self
            .title()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback);
        let safe: String = stem
            .chars()
            .map(|c| {
                if c == '"' || c == '/' || c == '\\' || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        format!("{safe}.json")
    }

    /// Mutable access to the cells of `detail.diagrams[index].diagramJson`.
    ///
    /// Returns `None` if the index is not decimal, out of range, or the
    /// diagram has no `cells` array.
    pub fn cells_mut(&mut self, diagram_index: &str) -> Option<&mut Vec<Value>> {
        let index: usize = diagram_index.trim().parse().ok()?;
        self.0
            .pointer_mut("/detail/diagrams")?
            .as_array_mut()?
            .get_mut(index)?
            .pointer_mut("/diagramJson/cells")?
            .as_array_mut()
    }

    /// Borrows the underlying document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the underlying document.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}
