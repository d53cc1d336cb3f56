//! Raster post-processing: strip render padding, crop to the target aspect
//! ratio, resize to 1920x1080 and optionally burn in the location label.
//!
//! Every step works on one in-memory image; the file is written once at the end.

pub mod label;

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::fmt;
use std::path::Path;

pub use label::{LabelFont, LabelRenderer, LabelStyle};

/// Border removed from each side of the raw render.
pub const PADDING_PX: u32 = 150;
pub const OUTPUT_WIDTH: u32 = 1920;
pub const OUTPUT_HEIGHT: u32 = 1080;

/// Remove `pad` pixels from every side.
pub fn strip_padding(image: &DynamicImage, pad: u32) -> Result<DynamicImage, PostProcessError> {
    let (width, height) = image.dimensions();
    if width <= pad * 2 || height <= pad * 2 {
        return Err(PostProcessError::ImageTooSmall { width, height, pad });
    }
    Ok(image.crop_imm(pad, pad, width - pad * 2, height - pad * 2))
}

/// Centred crop to `aspect` (width / height).
///
/// Wider images lose equal columns on the left and right, taller images equal
/// rows top and bottom. Odd leftovers go to the right/bottom edge.
pub fn aspect_crop(image: &DynamicImage, aspect: f64) -> DynamicImage {
    let (width, height) = image.dimensions();
    let current = width as f64 / height as f64;

    if current > aspect {
        let new_width = ((height as f64 * aspect).round() as u32).clamp(1, width);
        let left = (width - new_width) / 2;
        image.crop_imm(left, 0, new_width, height)
    } else if current < aspect {
        let new_height = ((width as f64 / aspect).round() as u32).clamp(1, height);
        let top = (height - new_height) / 2;
        image.crop_imm(0, top, width, new_height)
    } else {
        image.clone()
    }
}

/// Resize to exactly `width` x `height` with a quality resample.
pub fn resize(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3)
}

/// The post-processing stage.
pub struct ImagePostProcessor {
    aspect_ratio: f64,
    padding: u32,
    label: Option<LabelRenderer>,
}

impl ImagePostProcessor {
    pub fn new(aspect_ratio: f64) -> Self {
        Self {
            aspect_ratio,
            padding: PADDING_PX,
            label: None,
        }
    }

    pub fn with_label(mut self, label: LabelRenderer) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Run every step on an in-memory image.
    pub fn process(&self, image: &DynamicImage, label_text: &str) -> Result<DynamicImage, PostProcessError> {
        let stripped = strip_padding(image, self.padding)?;
        let cropped = aspect_crop(&stripped, self.aspect_ratio);
        let resized = resize(&cropped, OUTPUT_WIDTH, OUTPUT_HEIGHT);

        match &self.label {
            Some(renderer) => {
                let mut canvas = resized.to_rgba8();
                renderer.draw(&mut canvas, label_text)?;
                Ok(DynamicImage::ImageRgba8(canvas))
            }
            None => Ok(resized),
        }
    }

    /// Load `path`, process it and overwrite it as PNG. Returns the final size.
    pub fn process_file(&self, path: &Path, label_text: &str) -> Result<(u32, u32), PostProcessError> {
        let image = image::open(path)?;
        let processed = self.process(&image, label_text)?;
        processed.save_with_format(path, ImageFormat::Png)?;
        log::info!(
            "Post-processed {} to {}x{}",
            path.display(),
            processed.width(),
            processed.height()
        );
        Ok(processed.dimensions())
    }
}

/// Post-processing errors.
#[derive(Debug)]
pub enum PostProcessError {
    ImageTooSmall { width: u32, height: u32, pad: u32 },
    Image(image::ImageError),
    Label(String),
}

impl fmt::Display for PostProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageTooSmall { width, height, pad } => write!(
                f,
                "Image {}x{} is too small to strip {}px of padding",
                width, height, pad
            ),
            Self::Image(e) => write!(f, "Image error: {}", e),
            Self::Label(msg) => write!(f, "Label error: {}", msg),
        }
    }
}

impl std::error::Error for PostProcessError {}

impl From<image::ImageError> for PostProcessError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}
