use std::io::Cursor;

use chrono::Datelike;
use printpdf::lopdf::{self, Object, StringFormat};
use printpdf::{
    Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point,
    Pt, Rgb, TextMatrix,
};
use sha2::{Digest, Sha256};

use super::layout::{Element, FontFace, InvoiceLayout, Rgb8, TextAlign, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::DocumentError;
use crate::database::models::Payment;

const PT_TO_MM: f32 = 0.352_778;

// DejaVu Sans covers Latin and Arabic; see assets/fonts/LICENSE.
static SANS_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static SANS_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

// Horizontal shear for the italic face, drawn from the regular font.
const OBLIQUE_SKEW: f32 = 0.2;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn embed(doc: &PdfDocumentReference) -> Result<Self, DocumentError> {
        Ok(Self {
            regular: add_font(doc, SANS_REGULAR)?,
            bold: add_font(doc, SANS_BOLD)?,
        })
    }

    fn face(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular | FontFace::Italic => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }
}

/// Draws `layout` on a single A4 page. Both fonts are compiled into the
/// binary and embedded in the document, so rendering never touches the
/// network and non-Latin apartment labels or descriptions keep their glyphs.
///
/// The output depends only on `payment`: document id, dates and the trailer
/// `/ID` are all derived from the record, so the same payment always yields
/// the same bytes.
pub fn render_pdf(layout: &InvoiceLayout, payment: &Payment) -> Result<Vec<u8>, DocumentError> {
    let stamp = document_date(payment)?;

    let (doc, page, layer) = PdfDocument::new(
        layout.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Invoice",
    );
    let id = document_id(payment);
    let doc = doc
        .with_document_id(id.clone())
        .with_creation_date(stamp)
        .with_mod_date(stamp)
        .with_metadata_date(stamp);

    let fonts = Fonts::embed(&doc)?;
    let layer = doc.get_page(page).get_layer(layer);

    for element in &layout.elements {
        match element {
            Element::Text {
                text,
                x_mm,
                y_mm,
                align,
                style,
            } => {
                let width = approx_text_width_mm(text, style.size_pt, style.face);
                let x = match align {
                    TextAlign::Left => *x_mm,
                    TextAlign::Center => x_mm - width / 2.0,
                    TextAlign::Right => x_mm - width,
                };
                let baseline = PAGE_HEIGHT_MM - y_mm;

                layer.set_fill_color(color(style.color));
                draw_text(&layer, text, style.size_pt, x, baseline, style.face, &fonts);

                if style.underline {
                    let under = baseline - style.size_pt * PT_TO_MM * 0.15;
                    draw_rule(&layer, x, x + width, under, 0.8, style.color);
                }
            }
            Element::Rule {
                x1_mm,
                x2_mm,
                y_mm,
                thickness_pt,
                color,
            } => {
                draw_rule(&layer, *x1_mm, *x2_mm, PAGE_HEIGHT_MM - y_mm, *thickness_pt, *color);
            }
        }
    }

    let bytes = doc.save_to_bytes().map_err(render_error)?;
    pin_trailer_id(&bytes, &id)
}

fn add_font(doc: &PdfDocumentReference, ttf: &'static [u8]) -> Result<IndirectFontRef, DocumentError> {
    doc.add_external_font(Cursor::new(ttf)).map_err(render_error)
}

fn draw_text(
    layer: &PdfLayerReference,
    text: &str,
    size_pt: f32,
    x_mm: f32,
    y_mm: f32,
    face: FontFace,
    fonts: &Fonts,
) {
    let font = fonts.face(face);
    layer.begin_text_section();
    layer.set_font(font, size_pt);
    match face {
        FontFace::Italic => {
            let x: Pt = Mm(x_mm).into();
            let y: Pt = Mm(y_mm).into();
            layer.set_text_matrix(TextMatrix::Raw([1.0, 0.0, OBLIQUE_SKEW, 1.0, x.0, y.0]));
        }
        FontFace::Regular | FontFace::Bold => layer.set_text_cursor(Mm(x_mm), Mm(y_mm)),
    }
    layer.write_text(text, font);
    layer.end_text_section();
}

// printpdf fills the second trailer /ID entry with a fresh random string on
// every save. Both entries are replaced with the record-derived id.
fn pin_trailer_id(bytes: &[u8], id: &str) -> Result<Vec<u8>, DocumentError> {
    let mut doc = lopdf::Document::load_mem(bytes).map_err(render_error)?;
    let id = Object::String(id.as_bytes().to_vec(), StringFormat::Literal);
    doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out).map_err(render_error)?;
    Ok(out)
}

fn render_error(e: impl std::fmt::Display) -> DocumentError {
    DocumentError::Render(e.to_string())
}

fn draw_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32, thickness_pt: f32, rgb: Rgb8) {
    layer.set_outline_color(color(rgb));
    layer.set_outline_thickness(thickness_pt);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn color(Rgb8(r, g, b): Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

// DejaVu Sans averages a little over half an em per glyph; close enough to
// centre a heading or right-align a short value.
fn approx_text_width_mm(text: &str, size_pt: f32, face: FontFace) -> f32 {
    let em = match face {
        FontFace::Bold => 0.58,
        FontFace::Regular | FontFace::Italic => 0.53,
    };
    text.chars().count() as f32 * size_pt * em * PT_TO_MM
}

fn document_id(payment: &Payment) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payment.id.to_le_bytes());
    hasher.update(payment.apartment.as_bytes());
    hasher.update(payment.amount.to_string().as_bytes());
    hasher.update(payment.date.to_string().as_bytes());
    hasher.update(payment.description.as_bytes());
    hasher.update(payment.status.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

fn document_date(payment: &Payment) -> Result<time::OffsetDateTime, DocumentError> {
    let date = payment.date;
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| DocumentError::Date(e.to_string()))?;
    let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| DocumentError::Date(e.to_string()))?;
    Ok(day.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::RecordStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use std::collections::HashMap;

    fn payment() -> Payment {
        Payment {
            id: 1,
            apartment: "101".into(),
            amount: Decimal::from(100),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "January-2024".into(),
            status: RecordStatus::Unpaid,
        }
    }

    #[test]
    fn document_identity_is_derived_from_the_record() {
        let p = payment();
        assert_eq!(document_id(&p), document_id(&p.clone()));
        assert_eq!(document_id(&p).len(), 32);

        let mut other = p.clone();
        other.status = RecordStatus::Paid;
        assert_ne!(document_id(&p), document_id(&other));
    }

    #[test]
    fn document_date_is_the_payment_date() {
        let stamp = document_date(&payment()).unwrap();
        assert_eq!(stamp.year(), 2024);
        assert_eq!(u8::from(stamp.month()), 1);
        assert_eq!(stamp.day(), 1);
    }

    // Text runs on the first page, decoded back to Unicode through each
    // font's ToUnicode map.
    fn visible_text(pdf: &[u8]) -> Vec<String> {
        let doc = lopdf::Document::load_mem(pdf).unwrap();

        let mut maps: HashMap<Vec<u8>, HashMap<u16, char>> = HashMap::new();
        for object in doc.objects.values() {
            let Ok(dict) = object.as_dict() else { continue };
            let (Ok(name), Ok(to_unicode)) = (
                dict.get(b"BaseFont").and_then(Object::as_name),
                dict.get(b"ToUnicode").and_then(Object::as_reference),
            ) else {
                continue;
            };
            let stream = doc.get_object(to_unicode).and_then(Object::as_stream).unwrap();
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            maps.insert(name.to_vec(), parse_bfchar(&String::from_utf8_lossy(&content)));
        }

        let page = *doc.get_pages().values().next().unwrap();
        let mut font = Vec::new();
        let mut runs = Vec::new();
        for op in doc.get_and_decode_page_content(page).unwrap().operations {
            match op.operator.as_str() {
                "Tf" => font = op.operands[0].as_name().unwrap().to_vec(),
                "Tj" => {
                    let map = &maps[&font];
                    let glyphs = op.operands[0].as_str().unwrap();
                    runs.push(
                        glyphs
                            .chunks(2)
                            .map(|pair| {
                                let gid = u16::from_be_bytes([pair[0], pair[1]]);
                                map.get(&gid).copied().unwrap_or('\u{FFFD}')
                            })
                            .collect(),
                    );
                }
                _ => {}
            }
        }
        runs
    }

    fn parse_bfchar(cmap: &str) -> HashMap<u16, char> {
        cmap.lines()
            .filter_map(|line| {
                let (gid, unicode) = line.trim().split_once("> <")?;
                let gid = u16::from_str_radix(gid.trim_start_matches('<'), 16).ok()?;
                let unicode = u32::from_str_radix(unicode.trim_end_matches('>'), 16).ok()?;
                Some((gid, char::from_u32(unicode)?))
            })
            .collect()
    }

    #[test]
    fn same_payment_renders_identical_bytes() {
        let p = payment();
        let layout = InvoiceLayout::for_payment(&p);
        let first = render_pdf(&layout, &p).unwrap();
        let second = render_pdf(&layout, &p).unwrap();
        assert!(first == second, "two renders of one payment differ");

        let doc = lopdf::Document::load_mem(&first).unwrap();
        let ids = doc.trailer.get(b"ID").and_then(Object::as_array).unwrap();
        for entry in ids {
            assert_eq!(entry.as_str().unwrap(), document_id(&p).as_bytes());
        }
    }

    #[test]
    fn arabic_labels_keep_their_glyphs() {
        let mut p = payment();
        p.apartment = "أ-12".into();
        p.description = "يناير-2024".into();

        let pdf = render_pdf(&InvoiceLayout::for_payment(&p), &p).unwrap();
        let runs = visible_text(&pdf);
        assert!(runs.iter().any(|r| r == "Apartment Number: أ-12"), "{runs:?}");
        assert!(runs.iter().any(|r| r == "Payment for - يناير-2024"), "{runs:?}");
        assert!(runs.iter().any(|r| r == "Status: Not Paid"), "{runs:?}");
    }

    #[test]
    fn wider_text_measures_wider() {
        let short = approx_text_width_mm("Paid", 14.0, FontFace::Regular);
        let long = approx_text_width_mm("Not Paid", 14.0, FontFace::Regular);
        assert!(long > short);
    }
}
