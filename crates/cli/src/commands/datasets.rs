//! `mlstudio datasets` — List, upload and delete datasets.

use clap::Subcommand;
use mlstudio_client::UploadCandidate;
use mlstudio_core::resource::{Dataset, ResourceKey};
use std::path::PathBuf;

use super::{CmdResult, fail, format_file_size, open_authenticated, read_interruptible};

#[derive(Subcommand)]
pub enum DatasetAction {
    /// List your datasets
    List,

    /// Upload a CSV, JSON, Excel or Parquet file
    Upload {
        path: PathBuf,

        /// Dataset name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Delete a dataset
    Delete { id: i64 },
}

pub async fn run(api_url: Option<String>, action: DatasetAction) -> CmdResult {
    let workbench = open_authenticated(api_url).await?;

    match action {
        DatasetAction::List => {
            let datasets: Vec<Dataset> = read_interruptible(&workbench, &ResourceKey::DATASETS).await?;
            if datasets.is_empty() {
                println!("  No datasets yet — upload one with `mlstudio datasets upload <file>`");
                return Ok(());
            }
            println!("  {:<6} {:<28} {:<8} {:>10} {:>8}", "ID", "NAME", "FORMAT", "SIZE", "ROWS");
            for d in &datasets {
                let rows = d.row_count.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "  {:<6} {:<28} {:<8} {:>10} {:>8}",
                    d.id,
                    d.name,
                    d.file_format.to_uppercase(),
                    format_file_size(d.file_size),
                    rows
                );
            }
        }
        DatasetAction::Upload { path, name } => {
            let candidate = UploadCandidate::from_path(&path)
                .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;

            // Check before reading the whole file into memory.
            workbench
                .uploads()
                .validate(&candidate)
                .map_err(|e| e.user_message())?;

            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
            let name = name.unwrap_or_else(|| candidate.file_name.clone());

            eprint!("  Uploading {} ({})...", candidate.file_name, format_file_size(candidate.declared_size));
            let result = workbench.upload_dataset(&candidate, name, bytes).await;
            eprint!("\r\x1b[2K");
            let dataset = result.map_err(fail)?;

            println!("✅ Uploaded dataset '{}' (id {})", dataset.name, dataset.id);
            if let (Some(rows), Some(cols)) = (dataset.row_count, dataset.column_count) {
                println!("   {rows} rows × {cols} columns");
            }
        }
        DatasetAction::Delete { id } => {
            workbench.delete_dataset(id).await.map_err(fail)?;
            println!("🗑️  Deleted dataset {id}");
        }
    }
    Ok(())
}
