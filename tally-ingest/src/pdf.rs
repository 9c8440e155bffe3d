//! PDF → plain text.
//!
//! Each page is read twice: once by walking the content stream ourselves and
//! placing every text fragment at its on-page position (so table rows come out
//! as one line, left to right), and once through lopdf's own font-aware
//! `extract_text`. Whichever yields more alphanumeric characters wins for
//! that page. Interactive form field values are appended after the page text.
//!
//! When the trimmed result is shorter than `min_text_chars`, the document is
//! treated as an image-only scan and handed to [`crate::ocr`].

use std::collections::BTreeSet;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::ocr::OcrEngine;
use crate::types::{ExtractedText, TextSource};

/// Fragments whose baselines differ by less than this (in points) share a line.
const LINE_TOLERANCE: f64 = 2.0;
/// A horizontal gap wider than this many font sizes becomes a column break ("  ").
const COLUMN_GAP_EMS: f64 = 1.5;
/// Rough advance width of one glyph, in font sizes.
const GLYPH_WIDTH_EMS: f64 = 0.5;
/// TJ kerning adjustments (thousandths of an em) at or below this insert a space.
const TJ_SPACE_THRESHOLD: f64 = -200.0;
const MAX_FIELD_DEPTH: usize = 16;

pub struct TextExtractor {
    config: ExtractionConfig,
}

impl TextExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Recover newline-delimited text from PDF bytes, falling back to OCR for
    /// scans. Fails only when there is no usable text layer and no OCR binary.
    pub fn extract(&self, pdf: &[u8]) -> Result<ExtractedText, ExtractError> {
        let doc = Document::load_mem(pdf)?;
        let pages = doc.get_pages().len();

        let mut text = text_layer(&doc);
        let fields = form_field_lines(&doc);
        if !fields.is_empty() {
            debug!(count = fields.len(), "merging form field values");
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&fields.join("\n"));
        }

        let usable = text.trim().chars().count();
        if usable >= self.config.min_text_chars {
            info!(pages, chars = usable, "using PDF text layer");
            return Ok(ExtractedText {
                text,
                source: TextSource::TextLayer,
                pages,
            });
        }

        info!(
            pages,
            chars = usable,
            min = self.config.min_text_chars,
            "text layer too short, treating as scanned document"
        );
        let engine = OcrEngine::discover(&self.config.ocr).ok_or(ExtractError::NoExtractableText)?;
        let ocr_text = engine.recognize(pdf, pages)?;
        if ocr_text.trim().is_empty() {
            warn!("OCR produced no text");
        }
        Ok(ExtractedText {
            text: ocr_text,
            source: TextSource::Ocr,
            pages,
        })
    }
}

/// Text layer of every page, in page order.
pub fn text_layer(doc: &Document) -> String {
    let mut out = String::new();
    for (page_num, page_id) in doc.get_pages() {
        let positioned = positioned_page_text(doc, page_id).unwrap_or_else(|e| {
            debug!(page = page_num, "content walk failed: {e}");
            String::new()
        });
        let builtin = doc.extract_text(&[page_num]).unwrap_or_default();

        let page_text = if alnum_count(&positioned) >= alnum_count(&builtin) {
            positioned
        } else {
            debug!(page = page_num, "lopdf text beats positioned text");
            builtin
        };

        let page_text = page_text.trim_end();
        if page_text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(page_text);
    }
    out
}

fn alnum_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphanumeric()).count()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Matrix {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// self × other (PDF row-vector convention)
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn from_operands(ops: &[Object]) -> Option<Matrix> {
        if ops.len() != 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(ops) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }
}

#[derive(Debug, Clone)]
struct Fragment {
    x: f64,
    y: f64,
    /// Effective font size in user space
    size: f64,
    text: String,
    seq: usize,
}

/// Walk one page's content stream, collecting text with positions.
fn page_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<Fragment>, lopdf::Error> {
    let bytes = doc.get_page_content(page_id)?;
    let content = Content::decode(&bytes)?;

    let mut frags = Vec::new();
    let mut ctm = Matrix::IDENTITY;
    let mut ctm_stack: Vec<Matrix> = Vec::new();
    let mut tm = Matrix::IDENTITY;
    let mut tlm = Matrix::IDENTITY;
    let mut leading = 0.0;
    let mut font_size = 10.0;

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => ctm = ctm_stack.pop().unwrap_or(Matrix::IDENTITY),
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    ctm = m.then(&ctm);
                }
            }
            "BT" => {
                tm = Matrix::IDENTITY;
                tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(number) {
                    leading = l;
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    tm = m;
                    tlm = m;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    leading = -ty;
                }
                tlm = Matrix::translate(tx, ty).then(&tlm);
                tm = tlm;
            }
            "T*" => {
                tlm = Matrix::translate(0.0, -leading).then(&tlm);
                tm = tlm;
            }
            "Tj" | "'" | "\"" | "TJ" => {
                if op.operator == "'" || op.operator == "\"" {
                    tlm = Matrix::translate(0.0, -leading).then(&tlm);
                    tm = tlm;
                }
                let text = match op.operator.as_str() {
                    "TJ" => operands.first().map(tj_text).unwrap_or_default(),
                    _ => operands.last().map(decode_string).unwrap_or_default(),
                };
                if text.trim().is_empty() {
                    continue;
                }
                let pos = tm.then(&ctm);
                let scale = (pos.0[0].powi(2) + pos.0[1].powi(2)).sqrt();
                let width = text.chars().count() as f64 * font_size * GLYPH_WIDTH_EMS;
                frags.push(Fragment {
                    x: pos.0[4],
                    y: pos.0[5],
                    size: font_size * if scale > 0.0 { scale } else { 1.0 },
                    text,
                    seq: frags.len(),
                });
                // Advance so consecutive shows without repositioning stay in order
                tm = Matrix::translate(width, 0.0).then(&tm);
            }
            _ => {}
        }
    }

    Ok(frags)
}

fn positioned_page_text(doc: &Document, page_id: ObjectId) -> Result<String, lopdf::Error> {
    let mut frags = page_fragments(doc, page_id)?;
    Ok(layout_lines(&mut frags))
}

/// Sort top-to-bottom then left-to-right and join into lines.
fn layout_lines(frags: &mut [Fragment]) -> String {
    frags.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.seq.cmp(&b.seq))
    });

    let mut lines: Vec<Vec<&Fragment>> = Vec::new();
    for frag in frags.iter() {
        match lines.last_mut() {
            Some(line) if (line[0].y - frag.y).abs() <= LINE_TOLERANCE => line.push(frag),
            _ => lines.push(vec![frag]),
        }
    }

    let mut out = Vec::with_capacity(lines.len());
    for line in &mut lines {
        line.sort_by(|a, b| {
            a.x.partial_cmp(&b.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        let mut s = String::new();
        let mut prev_end: Option<f64> = None;
        for frag in line.iter() {
            if let Some(end) = prev_end {
                let gap = frag.x - end;
                s.push_str(if gap > frag.size * COLUMN_GAP_EMS { "  " } else { " " });
            }
            s.push_str(frag.text.trim());
            prev_end = Some(frag.x + frag.text.chars().count() as f64 * frag.size * GLYPH_WIDTH_EMS);
        }
        out.push(s);
    }
    out.join("\n")
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn tj_text(obj: &Object) -> String {
    let Object::Array(items) = obj else {
        return decode_string(obj);
    };
    let mut s = String::new();
    for item in items {
        match item {
            Object::String(..) => s.push_str(&decode_string(item)),
            other => {
                if number(other).is_some_and(|n| n <= TJ_SPACE_THRESHOLD) && !s.ends_with(' ') {
                    s.push(' ');
                }
            }
        }
    }
    s
}

/// PDF string → Rust string. UTF-16BE with BOM, otherwise Latin-1.
fn decode_string(obj: &Object) -> String {
    match obj {
        Object::String(bytes, _) => decode_bytes(bytes),
        Object::Name(bytes) => decode_bytes(bytes),
        _ => String::new(),
    }
}

fn decode_bytes(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes
        .iter()
        .map(|&b| b as char)
        .filter(|c| !c.is_control())
        .collect()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

/// "name value" for every filled-in AcroForm field.
pub fn form_field_lines(doc: &Document) -> Vec<String> {
    let fields = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| resolve_dict(doc, root))
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|form| resolve_dict(doc, form))
        .and_then(|form| form.get(b"Fields").ok())
        .and_then(|fields| resolve(doc, fields))
        .and_then(|fields| fields.as_array().ok());

    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    if let Some(fields) = fields {
        for field in fields {
            collect_field(doc, field, None, 0, &mut seen, &mut out);
        }
    }
    out
}

fn collect_field(
    doc: &Document,
    obj: &Object,
    parent_name: Option<&str>,
    depth: usize,
    seen: &mut BTreeSet<ObjectId>,
    out: &mut Vec<String>,
) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    if let Object::Reference(id) = obj {
        if !seen.insert(*id) {
            return;
        }
    }
    let Some(dict) = resolve_dict(doc, obj) else {
        return;
    };

    let own_name = dict.get(b"T").ok().map(decode_string);
    let name = own_name.as_deref().or(parent_name).unwrap_or("").trim().to_string();

    if let Some(value) = dict
        .get(b"V")
        .ok()
        .and_then(|v| resolve(doc, v))
        .map(decode_string)
    {
        let value = value.trim();
        if !value.is_empty() && value != "Off" {
            out.push(if name.is_empty() {
                value.to_string()
            } else {
                format!("{name} {value}")
            });
        }
    }

    if let Some(kids) = dict
        .get(b"Kids")
        .ok()
        .and_then(|k| resolve(doc, k))
        .and_then(|k| k.as_array().ok())
    {
        for kid in kids {
            collect_field(doc, kid, Some(&name), depth + 1, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{Stream, dictionary};

    fn frag(x: f64, y: f64, text: &str, seq: usize) -> Fragment {
        Fragment {
            x,
            y,
            size: 10.0,
            text: text.to_string(),
            seq,
        }
    }

    #[test]
    fn test_layout_orders_by_position() {
        let mut frags = vec![
            frag(300.0, 700.0, "-40.00", 0),
            frag(50.0, 700.0, "02/12", 1),
            frag(50.0, 720.0, "ACCOUNT ACTIVITY", 2),
            frag(100.0, 700.5, "AUTOMATIC PAYMENT", 3),
        ];
        let text = layout_lines(&mut frags);
        assert_eq!(
            text,
            "ACCOUNT ACTIVITY\n02/12  AUTOMATIC PAYMENT  -40.00"
        );
    }

    #[test]
    fn test_layout_single_space_for_adjacent_words() {
        let mut frags = vec![frag(50.0, 700.0, "ABC", 0), frag(68.0, 700.0, "DEF", 1)];
        assert_eq!(layout_lines(&mut frags), "ABC DEF");
    }

    #[test]
    fn test_decode_utf16_and_latin1() {
        assert_eq!(decode_bytes(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(decode_bytes(b"Caf\xe9"), "Café");
    }

    #[test]
    fn test_tj_spacing() {
        let arr = Object::Array(vec![
            Object::string_literal("AMAZON"),
            Object::Integer(-300),
            Object::string_literal("MKTPL"),
            Object::Integer(-20),
            Object::string_literal("ACE"),
        ]);
        assert_eq!(tj_text(&arr), "AMAZON MKTPLACE");
    }

    fn one_page_pdf(ops: Vec<Operation>, with_form: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if with_form {
            let due = doc.add_object(dictionary! {
                "T" => Object::string_literal("Payment Due Date"),
                "V" => Object::string_literal("02/13/2026"),
            });
            let checkbox = doc.add_object(dictionary! {
                "T" => Object::string_literal("Paperless"),
                "V" => "Off",
            });
            catalog.set("AcroForm", dictionary! { "Fields" => vec![due.into(), checkbox.into()] });
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn show(x: i64, y: i64, s: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(s)]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn test_text_layer_and_form_fields() {
        let mut ops = show(50, 720, "Statement of account for the billing cycle ending");
        ops.extend(show(50, 700, "02/12"));
        ops.extend(show(120, 700, "AUTOMATIC PAYMENT - THANK YOU"));
        ops.extend(show(450, 700, "-40.00"));
        let pdf = one_page_pdf(ops, true);

        let out = TextExtractor::new(ExtractionConfig::default()).extract(&pdf).unwrap();
        assert_eq!(out.source, TextSource::TextLayer);
        assert_eq!(out.pages, 1);
        assert!(out.text.contains("billing cycle ending"));
        assert!(out.text.contains("Payment Due Date 02/13/2026"));
        assert!(!out.text.contains("Paperless"));

        let row = out.text.lines().find(|l| l.starts_with("02/12")).unwrap();
        assert!(row.contains("AUTOMATIC PAYMENT - THANK YOU"));
        assert!(row.trim_end().ends_with("-40.00"));
    }

    #[test]
    fn test_scan_without_ocr_binary_fails() {
        let pdf = one_page_pdf(show(50, 700, "x"), false);
        let mut config = ExtractionConfig::default();
        config.ocr.tesseract_candidates = vec!["/nonexistent/bin/tesseract".into()];

        let err = TextExtractor::new(config).extract(&pdf).unwrap_err();
        assert!(matches!(err, ExtractError::NoExtractableText));
        assert!(err.to_string().contains("no text layer"));
    }

    #[test]
    fn test_garbage_bytes_are_invalid_pdf() {
        let err = TextExtractor::new(ExtractionConfig::default())
            .extract(b"not a pdf")
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPdf(_)));
    }
}
