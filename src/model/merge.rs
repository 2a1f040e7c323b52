//! Merges threats identified during play back into the threat model.
//!
//! The merge walks `diagram index -> component id -> threat index` and
//! appends one normalized entry per identified threat to the `threats` list
//! of the matching cell. It is append-only and never fails: references that
//! do not resolve are counted in the [`MergeReport`] and skipped.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{IdentifiedThreat, IdentifiedThreats, SessionMetadata, ThreatModel, decode_threat_type};

/// Initial status of every merged threat.
pub const OPEN_STATUS: &str = "Open";

/// Methodology recorded on every merged threat.
pub const STRIDE_METHODOLOGY: &str = "STRIDE";

/// Outcome counters of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Entries appended to cells.
    pub appended: usize,
    /// Threats dropped because their component id matched no cell.
    pub unresolved_components: usize,
    /// Threats dropped because their diagram index did not resolve.
    pub skipped_diagrams: usize,
    /// Cells whose `threats` field existed but was not a list.
    pub reset_threat_lists: usize,
    /// Null or non-object entries of the identified threats, skipped at decode.
    pub skipped_entries: usize,
}

impl MergeReport {
    /// Total number of threats that were not merged.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.unresolved_components + self.skipped_diagrams
    }
}

/// Builds the entry appended to a cell for one identified threat.
///
/// Absent optional fields are left out of the entry.
fn threat_entry(threat: &IdentifiedThreat, metadata: &SessionMetadata, session_id: &str) -> Value {
    let mut entry = Map::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(v) = value {
            entry.insert(key.to_owned(), Value::String(v));
        }
    };

    put("status", Some(OPEN_STATUS.to_owned()));
    put("severity", threat.severity.clone());
    put("id", threat.id.clone());
    put("methodology", Some(STRIDE_METHODOLOGY.to_owned()));
    put(
        "type",
        Some(decode_threat_type(threat.threat_type.as_ref()).to_owned()),
    );
    put("title", threat.title.clone());
    put("description", threat.description.clone());
    put("mitigation", threat.mitigation.clone());
    put(
        "owner",
        threat.owner.as_ref().map(|o| metadata.resolve_owner(o)),
    );
    put("game", Some(session_id.to_owned()));

    Value::Object(entry)
}

/// Returns the cell's `threats` list, creating it when absent or not a list.
fn threat_list<'a>(
    cell: &'a mut Map<String, Value>,
    report: &mut MergeReport,
) -> Option<&'a mut Vec<Value>> {
    let slot = cell
        .entry("threats")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        report.reset_threat_lists += 1;
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
}

/// Appends every identified threat to the matching cell of `model`.
///
/// For each component the first cell whose `id` equals the component id
/// receives the entries, in record order. Existing entries are kept and
/// repeated merges append again. Unresolved diagram indices and component
/// ids are skipped; nothing else in the model is touched.
pub fn merge_identified_threats(
    identified: &IdentifiedThreats,
    metadata: &SessionMetadata,
    session_id: &str,
    model: &mut ThreatModel,
) -> MergeReport {
    let mut report = MergeReport::default();

    for (diagram_index, components) in identified {
        let Some(cells) = model.cells_mut(diagram_index) else {
            let count: usize = components.values().map(|records| records.len()).sum();
            if count > 0 {
                warn!(diagram = %diagram_index, threats = count, "diagram not found in model, skipping");
            }
            report.skipped_diagrams += count;
            continue;
        };

        for (component_id, records) in components {
            let cell = cells
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .find(|c| c.get("id").and_then(Value::as_str) == Some(component_id.as_str()));

            let Some(cell) = cell else {
                if !records.is_empty() {
                    warn!(
                        diagram = %diagram_index,
                        component = %component_id,
                        threats = records.len(),
                        "component not found in diagram, skipping"
                    );
                }
                report.unresolved_components += records.len();
                continue;
            };

            let Some(threats) = threat_list(cell, &mut report) else {
                continue;
            };
            for threat in records.values() {
                threats.push(threat_entry(threat, metadata, session_id));
                report.appended += 1;
            }
            debug!(
                diagram = %diagram_index,
                component = %component_id,
                appended = records.len(),
                "threats merged into cell"
            );
        }
    }

    report
}
