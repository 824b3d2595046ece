//! A4 patient report rendered with `printpdf`.
//!
//! Layout, top to bottom: title, demographics, bordered prior-symptoms and
//! medical-report blocks, the two fundus photos side by side, then the
//! specialist signature lines. Text wraps and flows onto new pages.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use printpdf::*;
use regex::Regex;
use tracing::{debug, info, warn};

use patient_cell::PatientRecord;
use screening_cell::{Eye, GlaucomaAssessment};

use crate::error::ReportError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_RIGHT: f32 = 190.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LINE_HEIGHT: f32 = 6.0;
const BODY_SIZE: f32 = 11.0;
const WRAP_CHARS: usize = 85;

const IMAGE_WIDTH_MM: f32 = 90.0;
/// Keeps a tall photo, its label and caption within one page.
const MAX_IMAGE_HEIGHT_MM: f32 = 200.0;
const CAPTION_WRAP_CHARS: usize = 50;
const CAPTION_LINES: f32 = 3.0;
const CAPTION_LINE_HEIGHT: f32 = 4.5;

const FILE_PREFIX: &str = "Reporte_";
const FILE_SUFFIX: &str = ".pdf";
/// Below the 255-byte name limit of common filesystems.
const MAX_FILE_NAME_BYTES: usize = 240;

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub file_name: String,
    pub embedded_images: usize,
    pub pages: usize,
    pub pdf: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReportGenerator {
    reports_dir: PathBuf,
    unsafe_chars: Regex,
}

impl ReportGenerator {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let unsafe_chars = Regex::new(r#"[/\\:*?"<>|\p{Cc}]"#)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        Ok(Self {
            reports_dir: reports_dir.into(),
            unsafe_chars,
        })
    }

    /// `Reporte_{name}.pdf` with characters that are unsafe in file names
    /// replaced by `_`. Long names are cut on a character boundary so the
    /// whole file name stays within `MAX_FILE_NAME_BYTES`.
    pub fn file_name(&self, patient_name: &str) -> String {
        let stem = self.unsafe_chars.replace_all(patient_name.trim(), "_");
        let budget = MAX_FILE_NAME_BYTES - FILE_PREFIX.len() - FILE_SUFFIX.len();
        format!("{}{}{}", FILE_PREFIX, truncate_bytes(&stem, budget), FILE_SUFFIX)
    }

    /// Renders the report and writes it into the reports directory,
    /// replacing any earlier report for the same name. The file is written
    /// under a temporary name first so readers never see a partial PDF.
    pub fn generate(&self, patient: &PatientRecord) -> Result<GeneratedReport, ReportError> {
        let rendered = render(patient)?;
        let file_name = self.file_name(&patient.name);
        let path = self.reports_dir.join(&file_name);

        std::fs::create_dir_all(&self.reports_dir)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".report-")
            .suffix(".pdf.tmp")
            .tempfile_in(&self.reports_dir)?;
        tmp.write_all(&rendered.bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(
            "Generated report for patient {} at {} ({} pages, {} images)",
            patient.id,
            path.display(),
            rendered.pages,
            rendered.embedded_images
        );

        Ok(GeneratedReport {
            path,
            file_name,
            embedded_images: rendered.embedded_images,
            pages: rendered.pages,
            pdf: rendered.bytes,
        })
    }
}

struct Rendered {
    bytes: Vec<u8>,
    embedded_images: usize,
    pages: usize,
}

/// Cursor over the document. `y` is the baseline of the next line in mm from
/// the bottom of the page.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(format!("font error: {}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(format!("font error: {}", e)))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.pages += 1;
    }

    /// Starts a new page unless `height` mm still fit above the bottom margin.
    fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM {
            self.new_page();
        }
    }

    fn text(&mut self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(LINE_HEIGHT);
        self.text(text, size, MARGIN_LEFT, bold);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn rect(&self, top: f32, bottom: f32) {
        let corner = |x: f32, y: f32| (Point::new(Mm(x), Mm(y)), false);
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                corner(MARGIN_LEFT - 2.0, top),
                corner(MARGIN_RIGHT, top),
                corner(MARGIN_RIGHT, bottom),
                corner(MARGIN_LEFT - 2.0, bottom),
            ],
            is_closed: true,
        });
    }

    /// Titled, bordered block of wrapped text. When the body spills onto a
    /// new page each page gets its own border segment.
    fn bordered_block(&mut self, title: &str, body: &str) {
        self.ensure_space(LINE_HEIGHT * 3.0);

        let top = self.y + LINE_HEIGHT - 1.5;
        self.text(title, 12.0, MARGIN_LEFT, true);
        self.y -= LINE_HEIGHT;
        self.rect(top, self.y + LINE_HEIGHT - 1.5);

        let mut segment_top = self.y + LINE_HEIGHT - 1.5;
        for line in wrap_text(body, WRAP_CHARS) {
            if self.y - LINE_HEIGHT < BOTTOM {
                self.rect(segment_top, self.y + LINE_HEIGHT - 3.0);
                self.new_page();
                segment_top = self.y + LINE_HEIGHT - 1.5;
            }
            self.text(&line, BODY_SIZE, MARGIN_LEFT, false);
            self.y -= LINE_HEIGHT;
        }
        self.rect(segment_top, self.y + LINE_HEIGHT - 3.0);
        self.gap(LINE_HEIGHT);
    }

    /// "Eye images" section. Places up to two photos side by side, right eye
    /// at x=10mm and left eye at x=110mm, each 90mm wide (narrower when the
    /// photo is very tall) with a caption above and the assessment below.
    /// Returns how many were embedded.
    fn eye_images(&mut self, patient: &PatientRecord) -> usize {
        let mut photos = Vec::new();
        for eye in Eye::BOTH {
            let Some(scan) = patient.scan(eye) else {
                continue;
            };
            match scan.image() {
                Ok(image) => photos.push((eye, image, scan.prediction)),
                Err(e) => warn!("Skipping unreadable {} eye photo of {}: {}", eye, patient.id, e),
            }
        }

        if photos.is_empty() {
            self.ensure_space(LINE_HEIGHT * 2.0);
            self.line("Eye images", 12.0, true);
            self.line("No eye images on record.", BODY_SIZE, false);
            return 0;
        }

        let row_height = photos
            .iter()
            .map(|(_, image, _)| image_size_mm(image.width(), image.height()).1)
            .fold(0.0_f32, f32::max);
        let captions = 5.0 + CAPTION_LINES * CAPTION_LINE_HEIGHT;
        self.ensure_space(LINE_HEIGHT + 2.0 + row_height + captions);
        self.line("Eye images", 12.0, true);

        let image_top = self.y - 2.0;
        for (eye, image, prediction) in &photos {
            let x = match eye {
                Eye::Right => 10.0,
                Eye::Left => 110.0,
            };
            let (width, height) = image_size_mm(image.width(), image.height());

            self.layer.use_text(
                format!("{} eye", capitalize(&eye.to_string())),
                BODY_SIZE,
                Mm(x),
                Mm(self.y),
                &self.bold,
            );

            let rgb = image_crate::DynamicImage::ImageRgb8(image.to_rgb8());
            let dpi = rgb.width() as f32 * 25.4 / width;
            Image::from_dynamic_image(&rgb).add_to_layer(
                self.layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(x)),
                    translate_y: Some(Mm(image_top - height)),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );

            let assessment = GlaucomaAssessment::from_prediction(*eye, *prediction);
            let mut caption_y = image_top - row_height - 5.0;
            for line in wrap_text(&assessment.message, CAPTION_WRAP_CHARS) {
                self.layer
                    .use_text(line, 8.0, Mm(x), Mm(caption_y), &self.regular);
                caption_y -= CAPTION_LINE_HEIGHT;
            }
        }

        self.y = image_top - row_height - captions;
        photos.len()
    }

    fn finish(self) -> Result<(Vec<u8>, usize), ReportError> {
        let pages = self.pages;
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReportError::Render(format!("PDF save error: {}", e)))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| ReportError::Render(format!("PDF buffer error: {}", e)))?;
        Ok((bytes, pages))
    }
}

fn render(patient: &PatientRecord) -> Result<Rendered, ReportError> {
    debug!("Rendering report for patient {}", patient.id);
    let title = "Patient Medical Report";
    let mut page = PageWriter::new(title)?;

    page.text(title, 16.0, MARGIN_LEFT, true);
    page.gap(LINE_HEIGHT * 2.0);

    page.line("Patient details", 12.0, true);
    page.line(&format!("Name: {}", patient.name), BODY_SIZE, false);
    page.line(&format!("Age: {}", patient.age), BODY_SIZE, false);
    page.line(&format!("Sex: {}", patient.sex), BODY_SIZE, false);
    page.line(&format!("Address: {}", patient.address), BODY_SIZE, false);
    page.line(&format!("ID: {}", patient.national_id), BODY_SIZE, false);
    page.line(&format!("Phone: {}", patient.phone), BODY_SIZE, false);
    page.gap(LINE_HEIGHT);

    page.bordered_block(
        "Prior symptoms",
        patient.prior_symptoms.as_deref().unwrap_or("None recorded."),
    );
    page.bordered_block(
        "Medical report",
        patient.report.as_deref().unwrap_or("No report written yet."),
    );

    let embedded_images = page.eye_images(patient);

    page.ensure_space(LINE_HEIGHT * 5.0);
    page.gap(LINE_HEIGHT * 2.0);
    page.line("Specialist: ________", 12.0, true);
    page.line("Signature: ________", 12.0, true);

    let (bytes, pages) = page.finish()?;
    Ok(Rendered {
        bytes,
        embedded_images,
        pages,
    })
}

/// Printed size of a photo in mm: 90mm wide, scaled down as a whole when
/// that would make it taller than `MAX_IMAGE_HEIGHT_MM`.
fn image_size_mm(width_px: u32, height_px: u32) -> (f32, f32) {
    let height = IMAGE_WIDTH_MM * height_px as f32 / width_px.max(1) as f32;
    if height <= MAX_IMAGE_HEIGHT_MM {
        (IMAGE_WIDTH_MM, height)
    } else {
        (IMAGE_WIDTH_MM * MAX_IMAGE_HEIGHT_MM / height, MAX_IMAGE_HEIGHT_MM)
    }
}

fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Greedy word wrap on character count. Paragraph breaks are kept and words
/// longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars.max(1)) {
                let piece: String = chunk.iter().collect();
                if current_len + chunk.len() + 1 > max_chars && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if !current.is_empty() {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(&piece);
                current_len += chunk.len();
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width_and_paragraphs() {
        let text = "Cup to disc ratio increased in both eyes.\nRecommend visual field test.";
        let lines = wrap_text(text, 20);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(lines.last().unwrap(), "field test.");
        assert!(lines.contains(&"Cup to disc ratio".to_string()));
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap_text(&"x".repeat(45), 20);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].len(), 5);
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_file_name_sanitization() {
        let generator = ReportGenerator::new("reports").unwrap();
        assert_eq!(generator.file_name("Ana Gomez"), "Reporte_Ana Gomez.pdf");
        assert_eq!(generator.file_name("a/b\\c:d"), "Reporte_a_b_c_d.pdf");
        assert_eq!(generator.file_name("José Núñez"), "Reporte_José Núñez.pdf");
    }

    #[test]
    fn test_file_name_fits_byte_limit() {
        let generator = ReportGenerator::new("reports").unwrap();

        // 150 two-byte characters pass name validation but are 300 bytes.
        let name = generator.file_name(&"ñ".repeat(150));
        assert!(name.len() <= MAX_FILE_NAME_BYTES);
        assert!(name.starts_with("Reporte_ñ") && name.ends_with("ñ.pdf"));

        // The cut lands on a character boundary.
        let name = generator.file_name(&format!("a{}", "é".repeat(150)));
        assert_eq!(name.len(), "Reporte_".len() + 227 + ".pdf".len());

        let short = "x".repeat(200);
        assert_eq!(generator.file_name(&short), format!("Reporte_{}.pdf", short));
    }

    #[test]
    fn test_image_size_keeps_tall_photos_on_page() {
        assert_eq!(image_size_mm(64, 48), (90.0, 67.5));
        assert_eq!(image_size_mm(100, 100), (90.0, 90.0));

        let (width, height) = image_size_mm(100, 1000);
        assert_eq!(height, MAX_IMAGE_HEIGHT_MM);
        assert!((width / height - 0.1).abs() < 1e-6);
        assert!(LINE_HEIGHT + 2.0 + height + 5.0 + CAPTION_LINES * CAPTION_LINE_HEIGHT < TOP - BOTTOM);
    }
}
