//! Layout-aware page text through a runtime-bound Pdfium library.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::config::PdfConfig;
use crate::error::{Error, Result};
use crate::html::paragraphs_to_html;

use super::{PageContent, page_bitmap_tag};

/// Bind Pdfium from the configured directory, then from the system paths.
fn bind(config: &PdfConfig) -> Result<Pdfium> {
    let bindings = match &config.library_path {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .or_else(|e| {
                debug!(error = ?e, dir = %dir.display(), "configured Pdfium not loadable");
                Pdfium::bind_to_system_library()
            }),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Error::PdfBackendUnavailable(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

pub fn extract_pages(data: &[u8], config: &PdfConfig) -> Result<Vec<PageContent>> {
    let pdfium = bind(config)?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| Error::InvalidPdf(format!("{e:?}")))?;

    let mut pages = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        let number = index + 1;
        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                warn!(page = number, error = ?e, "page text unavailable");
                String::new()
            }
        };
        let chars = text.chars().filter(|c| !c.is_whitespace()).count();

        let mut html = String::from("<div class=\"pdf-page\">\n");
        html.push_str(&paragraphs_to_html(text.lines()));

        let mut images = Vec::new();
        if chars < config.scanned_page_threshold && config.render_bitmaps {
            match render_page(&page, config.render_width) {
                Ok(uri) => {
                    html.push('\n');
                    html.push_str(&page_bitmap_tag(number));
                    images.push(uri);
                }
                Err(e) => warn!(page = number, error = %e, "page render failed"),
            }
        }
        html.push_str("\n</div>");

        pages.push(PageContent {
            html,
            images,
            chars,
        });
    }
    debug!(pages = pages.len(), "extracted pages with Pdfium");
    Ok(pages)
}

/// Render a page to a PNG `data:` URI.
fn render_page(page: &PdfPage<'_>, width: i32) -> Result<String> {
    let bitmap = page
        .render_with_config(&PdfRenderConfig::new().set_target_width(width))
        .map_err(|e| Error::PdfBackendUnavailable(format!("{e:?}")))?;

    let mut png = Vec::new();
    bitmap
        .as_image()
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::InvalidPdf(format!("PNG encoding failed: {e}")))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
}
