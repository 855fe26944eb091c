use anyhow::Result;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use repodex_core::{ArtifactRecord, ChangeKind, ScanResult};
use repodex_pipeline::ScanListener;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Human-readable reporting on stderr, silenced by `-q`.
pub struct Output {
    quiet: bool,
    debug: bool,
}

impl Output {
    pub fn new(quiet: bool, debug: bool) -> Self {
        Self { quiet, debug }
    }

    pub fn field(&self, label: &str, value: impl Display) {
        if !self.quiet {
            eprintln!("{:<19}{}", format!("{label}:"), value);
        }
    }

    pub fn note(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    pub fn spinner(&self, message: &str) -> Result<ProgressBar> {
        if self.quiet {
            return Ok(ProgressBar::hidden());
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.green} {msg}")?,
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Ok(spinner)
    }

    pub fn total_time(&self, started: Instant) {
        let secs = started.elapsed().as_secs();
        if secs >= 60 {
            self.field("Total time", format!("{} min {} sec", secs / 60, secs % 60));
        } else {
            self.field("Total time", format!("{secs} sec"));
        }
    }

    pub fn scan_listener(&self) -> Result<ProgressListener<'_>> {
        Ok(ProgressListener {
            output: self,
            bar: self.spinner("Scanning repository...")?,
            count: 0,
            last_line: Instant::now(),
        })
    }
}

/// Spinner plus a periodic line per discovered artifact (every one with
/// `-d`).
pub struct ProgressListener<'a> {
    output: &'a Output,
    bar: ProgressBar,
    count: usize,
    last_line: Instant,
}

const LINE_INTERVAL: Duration = Duration::from_secs(2);

impl ScanListener for ProgressListener<'_> {
    fn started(&mut self, _root: &std::path::Path) {
        self.bar.println("Scanning started");
    }

    fn discovered(
        &mut self,
        record: &ArtifactRecord,
        change: ChangeKind,
    ) -> repodex_pipeline::Result<()> {
        self.count += 1;
        let debug = self.output.debug;

        if debug && record.packaging == "maven-plugin" {
            self.bar.println(format!(
                "Plugin: {}:{}:{} - {}",
                record.coordinate.group_id,
                record.coordinate.artifact_id,
                record.coordinate.version,
                record.plugin_prefix.as_deref().unwrap_or("-")
            ));
        }
        if debug || self.last_line.elapsed() > LINE_INTERVAL {
            self.bar.println(format!("  {:6} {}", self.count, record.path));
            self.last_line = Instant::now();
        }
        if change != ChangeKind::Unchanged {
            self.bar.set_message(format!("{} artifacts, last {}", self.count, record.coordinate));
        }
        Ok(())
    }

    fn removed(&mut self, record: &ArtifactRecord) -> repodex_pipeline::Result<()> {
        if self.output.debug {
            self.bar.println(format!("  {:>6} {}", "-", record.path));
        }
        Ok(())
    }

    fn error(&mut self, path: &str, cause: &str) {
        let red = Style::new().red();
        self.bar.println(format!(
            "{} {:6} {} - {}",
            red.apply_to("!"),
            self.count,
            path,
            cause
        ));
        self.last_line = Instant::now();
    }

    fn finished(&mut self, result: &ScanResult) {
        self.bar.finish_and_clear();
        if !result.errors.is_empty() {
            self.output.field("Scanning errors", result.errors.len());
        }
        self.output.field("Artifacts added", result.added);
        self.output.field("Artifacts updated", result.updated);
        self.output.field("Artifacts deleted", result.deleted);
    }
}
