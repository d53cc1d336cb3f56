//! One run: resolve → render → post-process (raster only) → clean up.

use crate::config::{OutputFormat, RenderConfig};
use crate::janitor::{CacheJanitor, CleanupReport, JanitorError};
use crate::location::{Coordinate, LocationResolver, ResolvedLocation};
use crate::postprocess::{ImagePostProcessor, LabelFont, LabelRenderer, LabelStyle, PostProcessError};
use crate::render::{MapRenderer, OverpassRenderer, RenderError};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub location: ResolvedLocation,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Final raster size; `None` for vector output.
    pub dimensions: Option<(u32, u32)>,
    /// `None` when no label was drawn.
    pub label_font: Option<String>,
    /// Skipped when the cache was kept.
    pub cleanup: Option<CleanupReport>,
    /// Every fallback taken during the run.
    pub warnings: Vec<String>,
}

pub struct Pipeline {
    resolver: LocationResolver,
    renderer: Box<dyn MapRenderer>,
}

impl Pipeline {
    /// Nominatim + Overpass, caching under `config.work_dir`.
    pub fn new(config: &RenderConfig) -> Self {
        let mut resolver = LocationResolver::new();
        resolver.set_offline(config.offline);
        Self {
            resolver,
            renderer: Box::new(OverpassRenderer::new(&config.work_dir)),
        }
    }

    pub fn with_parts(resolver: LocationResolver, renderer: Box<dyn MapRenderer>) -> Self {
        Self { resolver, renderer }
    }

    /// Execute every stage. `namer` is asked for a display name only when
    /// literal coordinates could not be reverse geocoded.
    pub fn run<F>(&mut self, config: &RenderConfig, namer: F) -> Result<PipelineReport, PipelineError>
    where
        F: FnOnce(Coordinate) -> Option<String>,
    {
        let mut warnings = config.spec.warnings.clone();

        // ── Resolve ─────────────────────────────────────────────
        let location = self.resolver.resolve(&config.query).name_with(namer);
        if let Some(reason) = &location.fallback_reason {
            warnings.push(format!("location fell back to {}: {}", location.display_name, reason));
        }
        log::info!("Location: {}", location.display_line());

        // ── Render ──────────────────────────────────────────────
        fs::create_dir_all(&config.work_dir)?;
        let output = config.output_path();
        self.renderer.render(&location, &config.spec, &output)?;

        // ── Post-process ────────────────────────────────────────
        let mut dimensions = None;
        let mut label_font = None;
        if config.spec.format.is_raster() {
            let mut processor = ImagePostProcessor::new(config.spec.aspect_ratio);
            if config.label.enabled {
                let label = LabelRenderer::load(&config.label.font_path, LabelStyle::default());
                label_font = Some(match label.font() {
                    LabelFont::Custom { family, .. } => family.clone(),
                    LabelFont::Fallback => {
                        warnings.push(format!(
                            "font {} unavailable, label uses system sans-serif",
                            config.label.font_path.display()
                        ));
                        "sans-serif".to_string()
                    }
                });
                processor = processor.with_label(label);
            }
            dimensions = Some(processor.process_file(&output, &location.display_name)?);
        }

        // ── Clean up ────────────────────────────────────────────
        let cleanup = if config.keep_cache {
            None
        } else {
            Some(CacheJanitor::new(&config.work_dir).sweep()?)
        };

        Ok(PipelineReport {
            location,
            output,
            format: config.spec.format,
            dimensions,
            label_font,
            cleanup,
            warnings,
        })
    }
}

/// Any stage failure that aborts a run.
#[derive(Debug)]
pub enum PipelineError {
    Render(RenderError),
    PostProcess(PostProcessError),
    Janitor(JanitorError),
    Io(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(e) => write!(f, "Render failed: {}", e),
            Self::PostProcess(e) => write!(f, "Post-processing failed: {}", e),
            Self::Janitor(e) => write!(f, "Cleanup failed: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<RenderError> for PipelineError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

impl From<PostProcessError> for PipelineError {
    fn from(e: PostProcessError) -> Self {
        Self::PostProcess(e)
    }
}

impl From<JanitorError> for PipelineError {
    fn from(e: JanitorError) -> Self {
        Self::Janitor(e)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
