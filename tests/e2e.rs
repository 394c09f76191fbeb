//! End-to-end tests for invoice2json.
//!
//! The live-service test makes a real Gemini API call and the annotation
//! tests load a real pdfium library, so everything here is gated behind the
//! `E2E_ENABLED` environment variable and does not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use invoice2json::{
    extract, Annotator, BoundingBox, ExtractError, ExtractionConfig, LabeledBox, PdfiumAnnotator,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// A minimal but structurally correct single-page PDF (US Letter), built with
/// computed xref offsets so pdfium accepts it.
fn minimal_letter_pdf() -> Vec<u8> {
    let objects = [
        "<</Type/Catalog/Pages 2 0 R>>",
        "<</Type/Pages/Kids[3 0 R]/Count 1>>",
        "<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>",
    ];

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_pos = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in &offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<</Size {}/Root 1 0 R>>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_pos
        )
        .as_bytes(),
    );
    out
}

fn item(label: &str, bounding_box: [i64; 4], page: u32) -> LabeledBox {
    LabeledBox {
        label: label.to_string(),
        bounding_box: Some(BoundingBox(bounding_box)),
        page: Some(page),
    }
}

// ── Annotation tests (pdfium, no network) ────────────────────────────────────

#[test]
fn annotate_draws_five_boxes_and_leaves_the_source_untouched() {
    e2e_skip_unless_enabled!();

    let source_bytes = minimal_letter_pdf();
    let source = output_dir().join("blank_letter.pdf");
    std::fs::write(&source, &source_bytes).unwrap();
    let output = output_dir().join("blank_letter_annotated.pdf");
    std::fs::remove_file(&output).ok();

    let items = vec![
        item("total", [100, 200, 300, 400], 1),
        item("recipient", [350, 100, 380, 300], 1),
        item("tax", [420, 100, 450, 300], 1),
        item("sender", [500, 100, 530, 300], 1),
        item("account_no", [600, 100, 630, 300], 1),
    ];

    PdfiumAnnotator
        .annotate(&source, &output, &items)
        .expect("annotation should succeed");

    assert!(output.exists(), "annotated file must be written");
    let annotated_bytes = std::fs::read(&output).unwrap();
    assert!(
        annotated_bytes.len() > source_bytes.len(),
        "annotated copy should contain the drawn objects"
    );

    // Original must be byte-identical.
    assert_eq!(std::fs::read(&source).unwrap(), source_bytes);
}

#[test]
fn annotate_skips_unlocated_items_silently() {
    e2e_skip_unless_enabled!();

    let source = output_dir().join("blank_letter_skip.pdf");
    std::fs::write(&source, minimal_letter_pdf()).unwrap();
    let output = output_dir().join("blank_letter_skip_annotated.pdf");

    let items = vec![
        LabeledBox {
            label: "total".into(),
            bounding_box: Some(BoundingBox::ZERO),
            page: Some(1),
        },
        LabeledBox {
            label: "tax".into(),
            bounding_box: None,
            page: None,
        },
    ];

    PdfiumAnnotator
        .annotate(&source, &output, &items)
        .expect("all-skip annotation must not raise");
    assert!(output.exists());
}

#[test]
fn annotate_rejects_out_of_range_pages_and_writes_nothing() {
    e2e_skip_unless_enabled!();

    let source = output_dir().join("blank_letter_oor.pdf");
    std::fs::write(&source, minimal_letter_pdf()).unwrap();
    let output = output_dir().join("blank_letter_oor_annotated.pdf");
    std::fs::remove_file(&output).ok();

    let err = PdfiumAnnotator
        .annotate(&source, &output, &[item("total", [100, 200, 300, 400], 7)])
        .unwrap_err();
    assert!(
        matches!(err, ExtractError::PageOutOfRange { page: 7, total: 1 }),
        "{err}"
    );
    assert!(!output.exists(), "output must be left unwritten");

    // Page 0 is out of range too, 1-based counting.
    let err = PdfiumAnnotator
        .annotate(&source, &output, &[item("total", [100, 200, 300, 400], 0)])
        .unwrap_err();
    assert!(matches!(err, ExtractError::PageOutOfRange { page: 0, .. }), "{err}");
    assert!(!output.exists(), "output must be left unwritten");
}

// ── Live extraction test (network + credential) ──────────────────────────────

#[tokio::test]
async fn live_extraction_end_to_end() {
    e2e_skip_unless_enabled!();

    let Ok(api_key) = std::env::var("GEMINI_API_KEY") else {
        println!("SKIP — set GEMINI_API_KEY to run the live extraction test");
        return;
    };
    let invoice = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/invoice.pdf");
    if !invoice.exists() {
        println!("SKIP — test file not found: {}", invoice.display());
        return;
    }

    let annotated = output_dir().join("invoice_annotated.pdf");
    let config = ExtractionConfig::builder()
        .api_key(api_key)
        .annotate_to(annotated.clone())
        .build()
        .unwrap();

    let output = extract(&invoice, &config).await.expect("live extraction");

    println!(
        "total={:.2} tax={:.2} recipient={:?} sender={:?} account_no={:?} ({} fields located)",
        output.invoice.total.value,
        output.invoice.tax.value,
        output.invoice.recipient.name,
        output.invoice.sender.name,
        output.invoice.account_no.account_no,
        output.stats.located_fields,
    );

    assert!(output.invoice.total.value > 0.0);
    assert!(!output.invoice.recipient.name.trim().is_empty());
    assert_eq!(output.annotated.as_deref(), Some(annotated.as_path()));
    assert!(annotated.exists());
}
