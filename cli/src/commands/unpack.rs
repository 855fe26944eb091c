use super::{Output, UnpackArgs};
use anyhow::{Context, Result};
use repodex_pack::{unpack_published, update_from_published, UpdatePlan};
use repodex_store::{IndexStore, StoreError};
use std::time::Instant;

pub fn handle_unpack(args: UnpackArgs, output: &Output) -> Result<()> {
    output.field("Index Folder", args.source.display());
    output.field("Output Folder", args.index.display());
    let started = Instant::now();

    let spinner = output.spinner("Unpacking baseline...")?;
    let store = unpack_published(&args.source, &args.index);
    spinner.finish_and_clear();
    let store = store.with_context(|| format!("failed to unpack {}", args.source.display()))?;

    report(&store, output)?;
    store.close()?;
    output.total_time(started);
    Ok(())
}

pub fn handle_update(args: UnpackArgs, output: &Output) -> Result<()> {
    output.field("Index Folder", args.source.display());
    output.field("Output Folder", args.index.display());
    let started = Instant::now();

    let store = match IndexStore::open_existing(&args.index) {
        Ok(store) => store,
        Err(StoreError::NotFound { .. }) => {
            output.note("No local index yet, unpacking the baseline.");
            return handle_unpack(args, output);
        }
        Err(e) => return Err(e).context("failed to open the local index"),
    };

    let plan = update_from_published(&store, &args.source)
        .with_context(|| format!("failed to update from {}", args.source.display()))?;
    match plan {
        UpdatePlan::UpToDate => output.note("Index is up to date."),
        UpdatePlan::Chunks(chunks) => output.field("Chunks applied", chunks.len()),
        UpdatePlan::NeedsBaseline => {
            output.note("Published chunks no longer reach this index, unpacking the baseline.");
            store.close()?;
            return handle_unpack(args, output);
        }
    }

    report(&store, output)?;
    store.close()?;
    output.total_time(started);
    Ok(())
}

fn report(store: &IndexStore, output: &Output) -> Result<()> {
    let snapshot = store.snapshot()?;
    output.field("Repository name", snapshot.repository_id());
    output.field("Artifacts", snapshot.len()?);
    output.field("Index version", snapshot.high_water());
    Ok(())
}
