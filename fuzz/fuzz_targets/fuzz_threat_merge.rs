#![no_main]

use eop_api::model::{SessionMetadata, StoredState, ThreatModel, merge_identified_threats};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

// Input: state JSON, metadata JSON and model JSON separated by NUL bytes.
fuzz_target!(|data: &[u8]| {
    let mut parts = data.splitn(3, |b| *b == 0);
    let (Some(state), Some(metadata), Some(model)) = (parts.next(), parts.next(), parts.next())
    else {
        return;
    };
    let Ok(state) = serde_json::from_slice::<StoredState>(state) else {
        return;
    };
    let metadata = serde_json::from_slice::<SessionMetadata>(metadata).unwrap_or_default();
    let Ok(model) = serde_json::from_slice::<Value>(model) else {
        return;
    };

    let mut model = ThreatModel::new(model);
    let report = merge_identified_threats(
        &state.game.identified_threats,
        &metadata,
        "fuzz",
        &mut model,
    );
    let _ = model.export_filename("fuzz");
    let recorded: usize = state
        .game
        .identified_threats
        .values()
        .flat_map(|components| components.values())
        .map(|records| records.len())
        .sum();
    assert!(report.appended <= recorded);
});
