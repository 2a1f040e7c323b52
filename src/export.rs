//! Export of a session's threat model with the identified threats merged in.
//!
//! State, metadata and model are independent reads and are fetched
//! concurrently. The merge happens in memory on the fetched copy; the stored
//! model is never written back.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ExportError;
use crate::model::{
    MergeReport, SessionMetadata, StoredState, ThreatModel, merge_identified_threats,
};
use crate::observability::metrics;
use crate::store::{ArtifactStore, DocumentKind, StoreKey};

/// A downloadable export.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    /// Suggested download filename.
    pub filename: String,
    /// Model document with the identified threats merged in.
    pub document: Value,
    /// What the merge did.
    pub report: MergeReport,
}

/// Assembles exports from the artifact store.
#[derive(Clone)]
pub struct ExportAssembler {
    store: Arc<dyn ArtifactStore>,
}

impl ExportAssembler {
    /// Creates an assembler reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    async fn fetch(
        &self,
        game: &str,
        session: &str,
        kind: DocumentKind,
    ) -> Result<Value, ExportError> {
        self.store
            .get(&StoreKey::new(game, session, kind))
            .await?
            .ok_or_else(|| ExportError::NotFound {
                kind,
                session: session.to_owned(),
            })
    }

    /// Builds the export for `session`.
    ///
    /// # Errors
    ///
    /// - [`ExportError::NotFound`] if the state, metadata or model is absent.
    /// - [`ExportError::Malformed`] if the state or metadata cannot be decoded.
    /// - [`ExportError::Store`] on store failures.
    pub async fn assemble(&self, game: &str, session: &str) -> Result<Export, ExportError> {
        let (state, metadata, model) = tokio::try_join!(
            self.fetch(game, session, DocumentKind::State),
            self.fetch(game, session, DocumentKind::Metadata),
            self.fetch(game, session, DocumentKind::Model),
        )?;

        let state: StoredState = decode(state, DocumentKind::State, session)?;
        let metadata: SessionMetadata = decode(metadata, DocumentKind::Metadata, session)?;

        let mut model = ThreatModel::new(model);
        let mut report =
            merge_identified_threats(&state.game.identified_threats, &metadata, session, &mut model);
        report.skipped_entries = state.game.skipped_entries;
        let filename = model.export_filename(session);

        metrics::record_export(&report);
        if report.dropped() > 0 || report.skipped_entries > 0 {
            warn!(
                session,
                dropped = report.dropped(),
                malformed = report.skipped_entries,
                "some identified threats were not merged"
            );
        }
        info!(
            session,
            %filename,
            merged = report.appended,
            "export assembled"
        );

        Ok(Export {
            filename,
            document: model.into_inner(),
            report,
        })
    }
}

fn decode<T: DeserializeOwned>(
    document: Value,
    kind: DocumentKind,
    session: &str,
) -> Result<T, ExportError> {
    serde_json::from_value(document).map_err(|e| ExportError::Malformed {
        kind,
        session: session.to_owned(),
        message: e.to_string(),
    })
}

impl std::fmt::Debug for ExportAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportAssembler").finish_non_exhaustive()
    }
}
