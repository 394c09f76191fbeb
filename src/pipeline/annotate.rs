//! Annotation: draw labeled bounding boxes onto a copy of the source PDF.
//!
//! All drawing primitives are pdfium's; the logic here is the normalized →
//! page coordinate conversion and the skip-on-missing-data policy. The source
//! document is opened read-only and never written back; the annotated copy is
//! saved to a separate path only after every item has been processed, so a
//! mid-loop failure leaves no output file behind.

use crate::error::ExtractError;
use crate::schema::{BoundingBox, LabeledBox};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Box outline and label color (red, fully opaque).
const ANNOTATION_COLOR: (u8, u8, u8, u8) = (220, 38, 38, 255);

/// Outline stroke width in PDF points.
const STROKE_WIDTH: f32 = 1.0;

/// Label font size in PDF points.
const LABEL_FONT_SIZE: f32 = 8.0;

/// Gap between the rectangle's top edge and the label baseline, in points.
const LABEL_GAP: f32 = 2.0;

// ── Geometry ─────────────────────────────────────────────────────────────

/// An absolute page rectangle in top-left-origin coordinates, PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Convert a normalized 0–1000 box into an absolute page rectangle.
///
/// Component order is `[y_min, x_min, y_max, x_max]`; the result is
/// `(x_min/1000·w, y_min/1000·h, x_max/1000·w, y_max/1000·h)` with the origin
/// at the page's top-left corner. The flip into pdfium's bottom-left-origin
/// space happens at the drawing boundary, not here.
pub fn page_rect(bounding_box: &BoundingBox, page_width: f32, page_height: f32) -> PageRect {
    PageRect {
        x0: bounding_box.x_min() as f32 / 1000.0 * page_width,
        y0: bounding_box.y_min() as f32 / 1000.0 * page_height,
        x1: bounding_box.x_max() as f32 / 1000.0 * page_width,
        y1: bounding_box.y_max() as f32 / 1000.0 * page_height,
    }
}

/// The skip-on-missing-data policy: an item is drawable only when it carries
/// a non-zero box and a page number.
pub(crate) fn is_drawable(item: &LabeledBox) -> bool {
    matches!(&item.bounding_box, Some(b) if !b.is_zero()) && item.page.is_some()
}

// ── The renderer seam ────────────────────────────────────────────────────

/// Draws labeled boxes onto a copy of a PDF.
///
/// Implementations are driven through `spawn_blocking`; tests substitute a
/// deterministic fake to exercise orchestration without pdfium.
pub trait Annotator: Send + Sync {
    /// Annotate `source` with `items` and persist the result to `output`,
    /// leaving `source` untouched.
    fn annotate(
        &self,
        source: &Path,
        output: &Path,
        items: &[LabeledBox],
    ) -> Result<(), ExtractError>;
}

/// Production [`Annotator`] backed by pdfium.
#[derive(Debug, Default)]
pub struct PdfiumAnnotator;

impl Annotator for PdfiumAnnotator {
    fn annotate(
        &self,
        source: &Path,
        output: &Path,
        items: &[LabeledBox],
    ) -> Result<(), ExtractError> {
        annotate_blocking(source, output, items)
    }
}

/// Run an annotator on the blocking pool.
///
/// pdfium is not async-safe; this mirrors how every other pdfium touchpoint
/// in the crate stays off the async worker threads.
pub async fn annotate_pdf(
    annotator: Arc<dyn Annotator>,
    source: PathBuf,
    output: PathBuf,
    items: Vec<LabeledBox>,
) -> Result<(), ExtractError> {
    tokio::task::spawn_blocking(move || annotator.annotate(&source, &output, &items))
        .await
        .map_err(|e| ExtractError::Internal(format!("annotation task panicked: {e}")))?
}

// ── pdfium implementation ────────────────────────────────────────────────

fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn annotate_blocking(
    source: &Path,
    output: &Path,
    items: &[LabeledBox],
) -> Result<(), ExtractError> {
    let pdfium = bind_pdfium()?;

    let mut document =
        pdfium
            .load_pdf_from_file(source, None)
            .map_err(|e| ExtractError::CorruptPdf {
                path: source.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    // Font tokens are Copy; grab one before the pages borrow starts.
    let label_font = document.fonts_mut().helvetica();

    let (r, g, b, a) = ANNOTATION_COLOR;
    let color = PdfColor::new(r, g, b, a);

    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let mut drawn = 0usize;
    for item in items {
        let (bounding_box, page_number) = match (&item.bounding_box, item.page) {
            (Some(bounding_box), Some(page)) if !bounding_box.is_zero() => {
                (bounding_box, page as usize)
            }
            _ => {
                debug!("Skipping '{}': not located", item.label);
                continue;
            }
        };

        if page_number == 0 || page_number > total_pages {
            return Err(ExtractError::PageOutOfRange {
                page: page_number,
                total: total_pages,
            });
        }

        let mut page = pages
            .get((page_number - 1) as u16)
            .map_err(|e| ExtractError::Internal(format!("page lookup failed: {e:?}")))?;

        let page_width = page.width().value;
        let page_height = page.height().value;
        let rect = page_rect(bounding_box, page_width, page_height);

        // Flip into pdfium's bottom-left-origin space.
        let outline = PdfRect::new(
            PdfPoints::new(page_height - rect.y1),
            PdfPoints::new(rect.x0),
            PdfPoints::new(page_height - rect.y0),
            PdfPoints::new(rect.x1),
        );

        let outline_object = PdfPagePathObject::new_rect(
            &document,
            outline,
            Some(color),
            Some(PdfPoints::new(STROKE_WIDTH)),
            None,
        )
        .map_err(|e| ExtractError::Internal(format!("rectangle object: {e:?}")))?;
        page.objects_mut()
            .add_path_object(outline_object)
            .map_err(|e| ExtractError::Internal(format!("adding rectangle: {e:?}")))?;

        let mut label_object = PdfPageTextObject::new(
            &document,
            &item.label,
            label_font,
            PdfPoints::new(LABEL_FONT_SIZE),
        )
        .map_err(|e| ExtractError::Internal(format!("label object: {e:?}")))?;
        label_object
            .set_fill_color(color)
            .map_err(|e| ExtractError::Internal(format!("label color: {e:?}")))?;
        label_object
            .translate(
                PdfPoints::new(rect.x0),
                PdfPoints::new(page_height - rect.y0 + LABEL_GAP),
            )
            .map_err(|e| ExtractError::Internal(format!("label placement: {e:?}")))?;
        page.objects_mut()
            .add_text_object(label_object)
            .map_err(|e| ExtractError::Internal(format!("adding label: {e:?}")))?;

        debug!(
            "Drew '{}' on page {} at ({:.1}, {:.1})–({:.1}, {:.1})",
            item.label, page_number, rect.x0, rect.y0, rect.x1, rect.y1
        );
        drawn += 1;
    }

    drop(pages);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::OutputWriteFailed {
                path: output.to_path_buf(),
                detail: e.to_string(),
            })?;
        }
    }

    document
        .save_to_file(output)
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: output.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    info!(
        "Annotated {}/{} items into {}",
        drawn,
        items.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_rect_matches_the_letter_page_example() {
        // Letter page, box [y_min=100, x_min=200, y_max=300, x_max=400].
        let rect = page_rect(&BoundingBox::new(100, 200, 300, 400), 612.0, 792.0);
        assert!((rect.x0 - 122.4).abs() < 1e-3, "x0 = {}", rect.x0);
        assert!((rect.y0 - 79.2).abs() < 1e-3, "y0 = {}", rect.y0);
        assert!((rect.x1 - 244.8).abs() < 1e-3, "x1 = {}", rect.x1);
        assert!((rect.y1 - 237.6).abs() < 1e-3, "y1 = {}", rect.y1);
    }

    #[test]
    fn page_rect_extremes_cover_the_full_page() {
        let rect = page_rect(&BoundingBox::new(0, 0, 1000, 1000), 612.0, 792.0);
        assert_eq!(rect.x0, 0.0);
        assert_eq!(rect.y0, 0.0);
        assert_eq!(rect.x1, 612.0);
        assert_eq!(rect.y1, 792.0);
    }

    #[test]
    fn skip_policy() {
        let drawable = LabeledBox {
            label: "total".into(),
            bounding_box: Some(BoundingBox::new(1, 2, 3, 4)),
            page: Some(1),
        };
        assert!(is_drawable(&drawable));

        let no_box = LabeledBox {
            bounding_box: None,
            ..drawable.clone()
        };
        assert!(!is_drawable(&no_box));

        let zero_box = LabeledBox {
            bounding_box: Some(BoundingBox::ZERO),
            ..drawable.clone()
        };
        assert!(!is_drawable(&zero_box));

        let no_page = LabeledBox {
            page: None,
            ..drawable
        };
        assert!(!is_drawable(&no_page));
    }
}
