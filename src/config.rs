//! Run configuration: every option the pipeline reads, with its default.
//!
//! User-facing strings are validated once, up front. Numeric inputs follow a
//! soft policy: anything unparseable or non-positive falls back to the default
//! and the substitution is recorded in `RenderSpec::warnings`.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Sentinel accepted for every option.
pub const DEFAULT_SENTINEL: &str = "default";

pub const DEFAULT_RADIUS_M: f64 = 18_000.0;
pub const DEFAULT_DPI: f64 = 750.0;
pub const DEFAULT_ASPECT_RATIO: f64 = 16.0 / 9.0;
pub const DEFAULT_FONT_PATH: &str = "fonts/label.ttf";

/// Output file format. Only raster output is post-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Png)
    }

    /// Strict parse.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Validated render parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSpec {
    pub radius_m: f64,
    pub dpi: f64,
    pub aspect_ratio: f64,
    pub format: OutputFormat,
    /// One entry per input that was replaced by its default.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            dpi: DEFAULT_DPI,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            format: OutputFormat::Png,
            warnings: Vec::new(),
        }
    }
}

impl RenderSpec {
    /// Strict constructor for library callers.
    pub fn new(radius_m: f64, dpi: f64, aspect_ratio: f64, format: OutputFormat) -> Result<Self, ConfigError> {
        check_positive("radius", radius_m)?;
        check_positive("dpi", dpi)?;
        check_positive("aspect ratio", aspect_ratio)?;
        Ok(Self { radius_m, dpi, aspect_ratio, format, warnings: Vec::new() })
    }

    /// Build from raw user strings. Never fails.
    ///
    /// `radius_km` is in kilometres; the stored radius is in metres.
    pub fn from_inputs(radius_km: &str, dpi: &str, aspect: &str, format: &str) -> Self {
        let mut warnings = Vec::new();

        let radius_km_parsed = parse_positive(radius_km).map(|r| r.map(|km| km * 1000.0));
        let radius_m = soft(radius_km_parsed, "radius", radius_km, DEFAULT_RADIUS_M, &mut warnings);
        let dpi = soft(parse_positive(dpi), "dpi", dpi, DEFAULT_DPI, &mut warnings);
        let aspect_ratio = soft(parse_aspect(aspect), "aspect ratio", aspect, DEFAULT_ASPECT_RATIO, &mut warnings);

        let format = if is_default(format) {
            OutputFormat::Png
        } else {
            OutputFormat::parse(format).unwrap_or_else(|| {
                let msg = format!("unknown output format '{}', using png", format.trim());
                log::warn!("{}", msg);
                warnings.push(msg);
                OutputFormat::Png
            })
        };

        Self { radius_m, dpi, aspect_ratio, format, warnings }
    }
}

/// Label overlay settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    pub enabled: bool,
    pub font_path: PathBuf,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
        }
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub query: String,
    pub spec: RenderSpec,
    pub label: LabelConfig,
    /// Output file and the transient `.cache/` directory live here.
    pub work_dir: PathBuf,
    pub offline: bool,
    pub keep_cache: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_SENTINEL.to_string(),
            spec: RenderSpec::default(),
            label: LabelConfig::default(),
            work_dir: PathBuf::from("."),
            offline: false,
            keep_cache: false,
        }
    }
}

impl RenderConfig {
    pub fn output_path(&self) -> PathBuf {
        output_path_in(&self.work_dir, self.spec.format)
    }
}

pub fn output_path_in(dir: &Path, format: OutputFormat) -> PathBuf {
    dir.join(format!("map.{}", format.extension()))
}

/// Configuration errors (strict constructors only).
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NotPositive { field: &'static str, value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "Invalid {}: {} (must be a positive number)", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn is_default(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty() || t.eq_ignore_ascii_case(DEFAULT_SENTINEL)
}

/// `parsed` is `None` for the sentinel and `Some(Err(()))` for bad input.
fn soft(
    parsed: Option<Result<f64, ()>>,
    field: &str,
    raw: &str,
    default: f64,
    warnings: &mut Vec<String>,
) -> f64 {
    match parsed {
        None => default,
        Some(Ok(v)) => v,
        Some(Err(())) => {
            let msg = format!("invalid {} '{}', using default {}", field, raw.trim(), default);
            log::warn!("{}", msg);
            warnings.push(msg);
            default
        }
    }
}

fn parse_positive(raw: &str) -> Option<Result<f64, ()>> {
    if is_default(raw) {
        return None;
    }
    Some(raw.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0).ok_or(()))
}

/// Accepts `1.7778`, `16/9` or `16:9`.
fn parse_aspect(raw: &str) -> Option<Result<f64, ()>> {
    if is_default(raw) {
        return None;
    }
    let t = raw.trim();
    let value = match t.split_once(|c: char| c == '/' || c == ':') {
        Some((w, h)) => match (w.trim().parse::<f64>(), h.trim().parse::<f64>()) {
            (Ok(w), Ok(h)) if h != 0.0 => Some(w / h),
            _ => None,
        },
        None => t.parse::<f64>().ok(),
    };
    Some(value.filter(|v| v.is_finite() && *v > 0.0).ok_or(()))
}
