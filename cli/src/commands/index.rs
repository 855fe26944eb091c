use super::{IndexArgs, Output};
use anyhow::{Context, Result};
use repodex_config::loader::DEFAULT_CONFIG_FILES;
use repodex_config::{Config, ConfigBuilder, PackagingConfig, RepositoryConfig, ScanConfig};
use repodex_core::{CancellationToken, ExtractorRegistry};
use repodex_pack::{pack_directory, PackagingRequest};
use repodex_pipeline::{index_repository, ContextSpec, IndexingContext};
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub fn handle_index(args: IndexArgs, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config = resolve_config(args, config_path)?;
    let spec = ContextSpec::from_config(&config)?;
    let request = PackagingRequest::from_config(&config.packaging);

    output.field("Repository Folder", spec.repository_root.display());
    output.field("Index Folder", spec.index_dir.display());
    if let Some(request) = &request {
        output.field("Output Folder", request.output_dir.display());
    }
    output.field("Repository name", &spec.repository_id);

    let started = Instant::now();
    let registry = ExtractorRegistry::with_builtins();
    let context = IndexingContext::open(spec, &registry)
        .context("failed to open the indexing context")?;
    output.field("Indexers", context.extractor_names().join(", "));

    match &request {
        Some(request) => {
            output.note(if request.create_checksums {
                "Will create checksum files for all published files (sha1, md5)."
            } else {
                "Will not create checksum files."
            });
            output.note(if request.create_incremental_chunks {
                "Will create incremental chunks for changes, along with baseline file."
            } else {
                "Will create baseline file."
            });
        }
        None => output.note("No output folder configured, the index will not be published."),
    }

    let mut listener = output.scan_listener()?;
    index_repository(&context, &mut listener, &CancellationToken::new())
        .context("indexing failed")?;

    if let Some(request) = &request {
        let spinner = output.spinner("Publishing index...")?;
        let outcome = pack_directory(context.store(), request);
        spinner.finish_and_clear();
        let outcome = outcome.context("publishing failed")?;

        output.field("Baseline", outcome.baseline.display());
        if let Some(chunk) = &outcome.new_chunk {
            output.field("New chunk", chunk.display());
        }
        if !outcome.pruned.is_empty() {
            output.field("Pruned chunks", outcome.pruned.len());
        }
        info!(
            "manifest at version {} with {} chunks",
            outcome.manifest.high_water(),
            outcome.manifest.chunks.len()
        );
    }

    context.close()?;
    output.total_time(started);
    Ok(())
}

/// Defaults, then the configuration file, then `REPODEX_*`, then flags.
fn resolve_config(args: IndexArgs, config_path: Option<&Path>) -> Result<Config> {
    let mut builder = ConfigBuilder::new();
    match config_path {
        Some(path) => builder = builder.with_file(path),
        None => {
            if let Some(path) = DEFAULT_CONFIG_FILES.iter().find(|p| Path::new(p).exists()) {
                builder = builder.with_file(path);
            }
        }
    }
    builder
        .with_env()
        .with_config(flags_overlay(args))
        .build()
        .context("invalid configuration")
}

fn flags_overlay(args: IndexArgs) -> Config {
    Config {
        repository: RepositoryConfig {
            id: args.name,
            root: args.repository,
            index_dir: args.index,
        },
        scan: ScanConfig {
            extractors: args
                .extractors
                .unwrap_or_else(|| ScanConfig::default().extractors),
            ..ScanConfig::default()
        },
        packaging: PackagingConfig {
            output_dir: args.target,
            create_checksums: args.checksums,
            create_incremental_chunks: args.chunks,
            max_chunks: args.keep,
        },
    }
}
