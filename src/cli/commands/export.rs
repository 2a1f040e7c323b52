//! `export` command handler.
//!
//! Offline counterpart of `GET /download/{id}`: reads a file store directly
//! and writes the merged model to disk.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cli::args::ExportArgs;
use crate::error::EopError;
use crate::export::ExportAssembler;
use crate::store::FileStore;

/// Export a session and print the written path.
///
/// # Errors
///
/// Returns a usage error if the data directory does not exist, an export
/// error if the session cannot be assembled, or an I/O error if the file
/// cannot be written.
pub async fn run(args: &ExportArgs) -> Result<(), EopError> {
    let path = write_export(args).await?;
    println!("{}", path.display());
    Ok(())
}

async fn write_export(args: &ExportArgs) -> Result<PathBuf, EopError> {
    if !args.data_dir.is_dir() {
        return Err(EopError::Usage(format!(
            "data directory not found: {}",
            args.data_dir.display()
        )));
    }

    let store = Arc::new(FileStore::new(&args.data_dir));
    let export = ExportAssembler::new(store)
        .assemble(&args.game, &args.session)
        .await?;

    tokio::fs::create_dir_all(&args.output).await?;
    let path = args.output.join(&export.filename);
    let body = serde_json::to_vec_pretty(&export.document)?;
    tokio::fs::write(&path, body).await?;

    info!(
        session = %args.session,
        path = %path.display(),
        merged = export.report.appended,
        "export written"
    );
    Ok(path)
}
