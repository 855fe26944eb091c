use super::StatusArgs;
use anyhow::{Context, Result};
use repodex_pack::{plan_update, ChunkManifest, UpdatePlan};
use repodex_store::StoreReader;

pub fn handle_status(args: StatusArgs) -> Result<()> {
    let reader = StoreReader::open(&args.index)
        .with_context(|| format!("failed to open index {}", args.index.display()))?;
    let snapshot = reader.snapshot()?;

    println!("Index: {}", args.index.display());
    println!("Repository: {}", snapshot.repository_id());
    println!("Artifacts: {}", snapshot.len()?);
    println!("Version: {}", snapshot.high_water());
    match snapshot.last_chunk_id() {
        Some(id) => println!("Last applied chunk: {id}"),
        None => println!("Last applied chunk: none"),
    }

    if let Some(target) = &args.target {
        match ChunkManifest::load(target)? {
            Some(manifest) => {
                println!(
                    "Published: version {} with {} chunks (next id {})",
                    manifest.high_water(),
                    manifest.chunks.len(),
                    manifest.next_chunk_id
                );
                match plan_update(&manifest, snapshot.high_water()) {
                    UpdatePlan::UpToDate => println!(" - up to date"),
                    UpdatePlan::Chunks(chunks) => println!(" - {} chunks behind", chunks.len()),
                    UpdatePlan::NeedsBaseline => println!(" - needs the baseline"),
                }
            }
            None => println!("Published: nothing in {}", target.display()),
        }
    }

    match reader.recent_commits(args.history)? {
        Some(entries) if !entries.is_empty() => {
            println!("Recent index commits:");
            for entry in entries {
                println!(
                    " - {} @ {} v{} {}",
                    entry.id, entry.timestamp, entry.high_water, entry.note
                );
            }
        }
        Some(_) => {}
        None => println!("Recent index commits: unavailable while the index is being written"),
    }

    snapshot.release();
    Ok(())
}
