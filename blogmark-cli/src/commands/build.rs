//! Build command implementation.

use super::load_config;
use anyhow::{bail, Context, Result};
use blogmark_core::{BuildError, BuildReport, RenderedPage, SiteBuilder};
use blogmark_render::render_page;
use include_dir::{include_dir, Dir};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

// Embed static assets (CSS) at compile time so they're available after cargo install
static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Command-line overrides for the `build` section of the config.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildOptions {
    pub jobs: Option<usize>,
    pub fail_fast: bool,
}

type RenderResult = Result<RenderedPage, BuildError>;

/// Render every page, write the wrapped output, the stylesheet and `pages.json`.
///
/// Fails when any page failed to render; the pages that did render are
/// still written.
pub async fn build_site(config_path: &Path, opts: BuildOptions) -> Result<()> {
    let mut config = load_config(config_path)?;
    if opts.jobs.is_some() {
        config.build.jobs = opts.jobs;
    }
    config.build.fail_fast |= opts.fail_fast;

    tracing::info!("Building site: {}", config.site.title);

    let builder = SiteBuilder::new(config).context("Invalid configuration")?;
    let files = builder.discover().context("Failed to discover pages")?;
    let total = files.len();

    let report = render_all(&builder, files).await;

    let output_dir = builder.config().output_dir();
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    for page in &report.pages {
        write_page(&builder, &output_dir, page)?;
    }
    extract_embedded_static(&output_dir)?;

    let manifest = builder
        .write_manifest(&report.summaries())
        .context("Failed to write manifest")?;

    tracing::info!("✓ Built {} pages", report.pages.len());
    tracing::info!("✓ Manifest written to {:?}", manifest);

    if !report.is_success() {
        for failure in &report.failures {
            tracing::error!("  {}: {}", failure.path.display(), failure.error);
        }
        bail!("{} of {} pages failed to render", report.failures.len(), total);
    }
    Ok(())
}

/// Render pages on the blocking pool, at most `jobs` at a time.
async fn render_all(builder: &SiteBuilder, files: Vec<PathBuf>) -> BuildReport {
    let jobs = builder.config().jobs();
    let fail_fast = builder.config().build.fail_fast;
    tracing::debug!("Rendering {} pages with {} jobs", files.len(), jobs);

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut set: JoinSet<RenderResult> = JoinSet::new();
    let mut paths: HashMap<Id, PathBuf> = HashMap::new();
    let mut report = BuildReport::default();

    for path in files {
        while let Some(joined) = set.try_join_next_with_id() {
            collect(&mut report, &mut paths, joined);
        }
        if fail_fast && !report.is_success() {
            break;
        }

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let task_builder = builder.clone();
        let task_path = path.clone();
        let handle = set.spawn_blocking(move || {
            let _permit = permit;
            task_builder.render_file(&task_path)
        });
        paths.insert(handle.id(), path);
    }

    while let Some(joined) = set.join_next_with_id().await {
        if fail_fast && !report.is_success() {
            set.abort_all();
            continue;
        }
        collect(&mut report, &mut paths, joined);
    }

    if fail_fast && !report.is_success() {
        tracing::warn!("Stopped after first failure (fail_fast)");
    }
    report
}

fn collect(
    report: &mut BuildReport,
    paths: &mut HashMap<Id, PathBuf>,
    joined: Result<(Id, RenderResult), JoinError>,
) {
    match joined {
        Ok((id, result)) => {
            let path = paths.remove(&id).unwrap_or_default();
            report.record(&path, result);
        }
        Err(err) if err.is_cancelled() => {}
        Err(err) => {
            let path = paths.remove(&err.id()).unwrap_or_default();
            report.record_failure(&path, panic_message(err));
        }
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("render panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("render panicked: {message}")
    } else {
        "render panicked".to_string()
    }
}

/// Write one page wrapped in the configured component.
fn write_page(builder: &SiteBuilder, output_dir: &Path, page: &RenderedPage) -> Result<()> {
    let html = render_page(page, &builder.config().wrapper)
        .with_context(|| format!("Failed to wrap {:?}", page.source))?;

    let target = output_dir.join(&page.output);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(&target, html).with_context(|| format!("Failed to write {:?}", target))?;

    tracing::debug!("Wrote {:?}", target);
    Ok(())
}

fn extract_embedded_static(dest: &Path) -> Result<()> {
    for entry in STATIC_ASSETS.entries() {
        extract_entry(entry, dest)?;
    }
    Ok(())
}

fn extract_entry(entry: &include_dir::DirEntry, dest: &Path) -> Result<()> {
    match entry {
        include_dir::DirEntry::Dir(dir) => {
            for sub_entry in dir.entries() {
                extract_entry(sub_entry, dest)?;
            }
        }
        include_dir::DirEntry::File(file) => {
            let target = dest.join(file.path());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, file.contents())
                .with_context(|| format!("Failed to write embedded static file to {:?}", target))?;
        }
    }
    Ok(())
}
