//! PDF rasterisation: load PDF bytes with pdfium and render every page.
//!
//! All functions here are blocking. pdfium keeps thread-local state and must
//! not run on a Tokio worker, so callers wrap them in
//! `tokio::task::spawn_blocking`.
//!
//! The library *location* is resolved once per process ([`PdfiumLibrary::locate`]);
//! each blocking job then binds to that location.

use crate::error::ExtractionError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where to load libpdfium from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumLibrary {
    /// An explicit library file.
    Path(PathBuf),
    /// Whatever the platform loader finds (`LD_LIBRARY_PATH`, system dirs).
    System,
}

impl PdfiumLibrary {
    /// Resolve the library location: `PDFIUM_LIB_PATH`, then `configured`,
    /// then the system library. A directory is expanded to the platform
    /// library file name inside it.
    pub fn locate(configured: Option<&Path>) -> Self {
        let candidate = std::env::var_os("PDFIUM_LIB_PATH")
            .map(PathBuf::from)
            .or_else(|| configured.map(Path::to_path_buf));

        match candidate {
            Some(path) if path.is_dir() => {
                Self::Path(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&path)))
            }
            Some(path) => Self::Path(path),
            None => Self::System,
        }
    }

    /// Bind to the library. Blocking.
    pub fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match self {
            Self::Path(path) => Pdfium::bind_to_library(path),
            Self::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{self:?}: {e}")))?;
        Ok(Pdfium::new(bindings))
    }
}

/// Render every page of an in-memory PDF, in page order.
///
/// The longest edge of each image is capped at `max_pixels`.
pub fn render_pdf_bytes(
    pdfium: &Pdfium,
    bytes: &[u8],
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, ExtractionError> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                ExtractionError::PasswordRequired
            } else {
                ExtractionError::CorruptPdf { detail: err_str }
            }
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total_pages);
    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| ExtractionError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractionError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}
