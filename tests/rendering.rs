use chrono::NaiveDate;
use image::GenericImageView;
use profile_pdf::document::ProfileDocument;
use profile_pdf::export::{DirectorySink, Exporter};
use profile_pdf::fonts;
use profile_pdf::pdf::{fit_to_page, GenpdfAssembler, PageAssembler};
use profile_pdf::raster::{CaptureOptions, GlyphRasterizer, Rasterizer};
use profile_pdf::record::{Field, ProfileRecord};
use sha2::{Digest, Sha256};

const SKIP_NOTE: &str =
    "bundled fonts missing. Set PROFILE_PDF_FONTS_DIR or copy assets/fonts next to the binary.";

fn sample_document() -> ProfileDocument {
    let record = ProfileRecord::new()
        .with(Field::Name, "Jane Doe")
        .with(Field::Email, "jane@x.com")
        .with(Field::Phone, "555-1234")
        .with(Field::Position, "Engineer")
        .with(
            Field::Description,
            "Builds tools.\n\nLikes long walks through very long sentences that have to wrap across more than one line of the card.",
        );
    ProfileDocument::from_record(&record, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap())
}

fn render_sample_pdf() -> Option<Vec<u8>> {
    if !fonts::default_fonts_available() {
        return None;
    }

    let raster = GlyphRasterizer::default()
        .capture(&sample_document(), &CaptureOptions::default())
        .expect("capture sample document");
    let assembler = GenpdfAssembler::default();
    let placement = fit_to_page(raster.width(), raster.height(), assembler.page_size())
        .expect("raster has pixels");
    Some(assembler.assemble(raster, placement).expect("assemble sample pdf"))
}

/// Values printpdf stamps with the clock or a random id, as `(open, close)`
/// delimiters around the volatile bytes.
const VOLATILE_METADATA: &[(&[u8], &[u8])] = &[
    (b"/CreationDate(", b")"),
    (b"/ModDate(", b")"),
    (b"/ID[", b"]"),
    (b"<xmp:CreateDate>", b"</xmp:CreateDate>"),
    (b"<xmp:ModifyDate>", b"</xmp:ModifyDate>"),
    (b"<xmp:MetadataDate>", b"</xmp:MetadataDate>"),
    (b"<xmpMM:DocumentID>", b"</xmpMM:DocumentID>"),
    (b"<xmpMM:InstanceID>", b"</xmpMM:InstanceID>"),
];

/// Overwrites every byte between `open` and the next `close` with `0`,
/// keeping the length of the document unchanged.
fn blank_between(data: &mut [u8], open: &[u8], close: &[u8]) {
    let find = |haystack: &[u8], needle: &[u8]| {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    };

    let mut offset = 0;
    while let Some(found) = find(&data[offset..], open) {
        let value_start = offset + found + open.len();
        let Some(value_len) = find(&data[value_start..], close) else {
            break;
        };
        data[value_start..value_start + value_len].fill(b'0');
        offset = value_start + value_len + close.len();
    }
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    let mut normalized = bytes.to_vec();
    for (open, close) in VOLATILE_METADATA {
        blank_between(&mut normalized, open, close);
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn scrubbing_blanks_only_volatile_values() {
    let scrubbed = scrub_pdf(
        b"/Producer(printpdf)/CreationDate(D:20250105)/ID[<ab><cd>] <xmpMM:DocumentID>xyz</xmpMM:DocumentID>",
    );
    assert_eq!(
        scrubbed,
        b"/Producer(printpdf)/CreationDate(0000000000)/ID[00000000] <xmpMM:DocumentID>000</xmpMM:DocumentID>"
    );
}

#[test]
fn capture_is_opaque_and_double_resolution() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping capture_is_opaque_and_double_resolution: {SKIP_NOTE}");
        return;
    }

    let rasterizer = GlyphRasterizer::default();
    let document = sample_document();
    let single = rasterizer
        .capture(
            &document,
            &CaptureOptions {
                scale: 1.0,
                ..CaptureOptions::default()
            },
        )
        .unwrap();
    let double = rasterizer
        .capture(&document, &CaptureOptions::default())
        .unwrap();

    assert_eq!(single.width(), 800);
    assert_eq!(double.width(), 1600);
    assert!(double.height() >= 2 * single.height() - 2);
    assert!(matches!(double, image::DynamicImage::ImageRgb8(_)));
    assert_eq!(double.get_pixel(0, 0), image::Rgba([255, 255, 255, 255]));
}

#[test]
fn explicit_capture_size_overrides_content_extent() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping explicit_capture_size_overrides_content_extent: {SKIP_NOTE}");
        return;
    }

    let raster = GlyphRasterizer::default()
        .capture(
            &sample_document(),
            &CaptureOptions {
                width: Some(300),
                height: Some(200),
                ..CaptureOptions::default()
            },
        )
        .unwrap();
    assert_eq!(raster.dimensions(), (600, 400));
}

#[test]
fn renders_non_empty_output() {
    let Some(bytes) = render_sample_pdf() else {
        eprintln!("Skipping renders_non_empty_output: {SKIP_NOTE}");
        return;
    };
    assert!(bytes.starts_with(b"%PDF"), "output should carry a PDF header");
}

#[test]
fn rendering_is_deterministic() {
    let (Some(bytes_a), Some(bytes_b)) = (render_sample_pdf(), render_sample_pdf()) else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_NOTE}");
        return;
    };

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn exporter_writes_named_file() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping exporter_writes_named_file: {SKIP_NOTE}");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let mut exporter = Exporter::new(
        GlyphRasterizer::default(),
        GenpdfAssembler::default(),
        DirectorySink::new(dir.path()),
    );
    let report = exporter
        .run(
            &sample_document(),
            "Jane Doe",
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
        )
        .unwrap();

    assert_eq!(report.file_name, "Jane_Doe_details_2025-01-05.pdf");
    let written = std::fs::read(dir.path().join(&report.file_name)).unwrap();
    assert_eq!(written.len(), report.size);
}
