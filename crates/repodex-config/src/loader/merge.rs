//! Configuration merging logic
//!
//! Merges configurations from multiple sources with proper precedence.

use crate::{types::*, Config};

/// Merge two configurations, with `overlay` taking precedence
///
/// Values in `overlay` that differ from the defaults (or are set, for
/// optional values) override values in `base`.
pub fn merge(mut base: Config, overlay: Config) -> Config {
    base.repository = merge_repository(base.repository, overlay.repository);
    base.scan = merge_scan(base.scan, overlay.scan);
    base.packaging = merge_packaging(base.packaging, overlay.packaging);
    base
}

fn merge_repository(base: RepositoryConfig, overlay: RepositoryConfig) -> RepositoryConfig {
    RepositoryConfig {
        id: overlay.id.or(base.id),
        root: overlay.root.or(base.root),
        index_dir: overlay.index_dir.or(base.index_dir),
    }
}

fn merge_scan(base: ScanConfig, overlay: ScanConfig) -> ScanConfig {
    let default = ScanConfig::default();
    ScanConfig {
        extractors: if overlay.extractors != default.extractors {
            overlay.extractors
        } else {
            base.extractors
        },
        include: if !overlay.include.is_empty() {
            overlay.include
        } else {
            base.include
        },
        exclude: if !overlay.exclude.is_empty() {
            overlay.exclude
        } else {
            base.exclude
        },
        threads: if overlay.threads != default.threads {
            overlay.threads
        } else {
            base.threads
        },
        batch_size: if overlay.batch_size != default.batch_size {
            overlay.batch_size
        } else {
            base.batch_size
        },
    }
}

fn merge_packaging(base: PackagingConfig, overlay: PackagingConfig) -> PackagingConfig {
    PackagingConfig {
        output_dir: overlay.output_dir.or(base.output_dir),
        create_checksums: overlay.create_checksums || base.create_checksums,
        create_incremental_chunks: overlay.create_incremental_chunks
            || base.create_incremental_chunks,
        max_chunks: overlay.max_chunks.or(base.max_chunks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_merge_defaults() {
        let merged = merge(Config::default(), Config::default());
        assert_eq!(merged, Config::default());
    }

    #[test]
    fn test_overlay_takes_precedence() {
        let mut base = Config::default();
        base.scan.batch_size = 32;
        base.repository.root = Some(PathBuf::from("/repo"));

        let mut overlay = Config::default();
        overlay.scan.batch_size = 8;
        overlay.scan.extractors = "min".to_string();

        let merged = merge(base, overlay);
        assert_eq!(merged.scan.batch_size, 8);
        assert_eq!(merged.scan.extractors, "min");
        assert_eq!(merged.repository.root, Some(PathBuf::from("/repo")));
    }

    #[test]
    fn test_default_overlay_keeps_base() {
        let mut base = Config::default();
        base.scan.threads = 4;
        base.packaging.max_chunks = Some(3);
        base.packaging.create_checksums = true;

        let merged = merge(base, Config::default());
        assert_eq!(merged.scan.threads, 4);
        assert_eq!(merged.packaging.max_chunks, Some(3));
        assert!(merged.packaging.create_checksums);
    }
}
