//! Fonts usable inside a PDF content stream.
//!
//! Two flavours exist. The standard Helvetica font needs no embedding but
//! only covers WinAnsi text. An embedded TrueType font is written as a
//! Type0 / Identity-H composite font, so any glyph the face has can be shown
//! by glyph id.

use crate::watermark::font::FontSource;
use crate::watermark::WatermarkError;
use ab_glyph::{Font, FontArc, FontVec, GlyphId};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Width used for the Latin-1 half of WinAnsi.
const HELVETICA_HIGH_WIDTH: u16 = 556;
const HELVETICA_ASCENT: f32 = 718.0;
const HELVETICA_DESCENT: f32 = -207.0;

const REPLACEMENT: u8 = b'?';

/// A string encoded for one particular [`PdfFont`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    bytes: Vec<u8>,
    hex: bool,
    /// Advance width in 1/1000 em
    width_units: f32,
    /// Distinct glyph ids used, embedded fonts only
    glyphs: BTreeMap<u16, (f32, Option<char>)>,
}

impl EncodedText {
    /// Advance width at `font_size` points.
    pub fn width(&self, font_size: f32) -> f32 {
        self.width_units * font_size / 1000.0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Operand for `Tj`.
    pub fn to_object(&self) -> Object {
        let format = if self.hex {
            StringFormat::Hexadecimal
        } else {
            StringFormat::Literal
        };
        Object::String(self.bytes.clone(), format)
    }
}

/// TrueType face embedded into the output document.
#[derive(Clone)]
pub struct EmbeddedFont {
    source: FontSource,
    face: FontArc,
    units_per_em: f32,
    base_name: String,
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("source", &self.source)
            .field("base_name", &self.base_name)
            .finish()
    }
}

impl EmbeddedFont {
    /// Parse a single-face TrueType font. Collections and CFF-flavoured
    /// OpenType are refused because they cannot be embedded as FontFile2.
    pub fn from_source(source: FontSource) -> Result<Self, WatermarkError> {
        if !source.is_embeddable() {
            return Err(WatermarkError::FontUnavailable(format!(
                "{} is not a single-face TrueType font",
                source.name
            )));
        }

        let face = FontVec::try_from_vec_and_index(source.data.as_ref().clone(), 0).map_err(|e| {
            WatermarkError::FontUnavailable(format!("{} is not a usable font: {}", source.name, e))
        })?;
        let units_per_em = face.units_per_em().unwrap_or(1000.0);
        let base_name = pdf_font_name(&source.name);

        Ok(Self {
            source,
            face: FontArc::new(face),
            units_per_em,
            base_name,
        })
    }

    fn to_thousandths(&self, units: f32) -> f32 {
        units * 1000.0 / self.units_per_em
    }

    fn vertical_metrics(&self) -> (f32, f32) {
        (
            self.to_thousandths(self.face.ascent_unscaled()),
            self.to_thousandths(self.face.descent_unscaled()),
        )
    }
}

/// Font selected for the watermark text of a document.
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// Non-embedded Helvetica with WinAnsi encoding
    Standard,
    Embedded(Box<EmbeddedFont>),
}

impl PdfFont {
    /// Prefer embedding `source`, falling back to Helvetica.
    pub fn select(source: Option<FontSource>) -> Self {
        let Some(source) = source else {
            tracing::info!("No PDF font configured, using Helvetica");
            return Self::Standard;
        };

        let name = source.name.clone();
        match EmbeddedFont::from_source(source) {
            Ok(font) => {
                tracing::info!(font = %name, "Embedding font for PDF watermarks");
                Self::Embedded(Box::new(font))
            }
            Err(err) => {
                tracing::warn!(font = %name, error = %err, "Cannot embed font, using Helvetica");
                Self::Standard
            }
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    /// Ascent and descent in 1/1000 em.
    pub fn vertical_metrics(&self) -> (f32, f32) {
        match self {
            Self::Standard => (HELVETICA_ASCENT, HELVETICA_DESCENT),
            Self::Embedded(font) => font.vertical_metrics(),
        }
    }

    pub fn encode(&self, text: &str) -> EncodedText {
        match self {
            Self::Standard => encode_win_ansi(text),
            Self::Embedded(font) => encode_glyph_ids(font, text),
        }
    }

    /// Write the font objects into `doc` and return the font dictionary id.
    pub fn add_to_document(
        &self,
        doc: &mut Document,
        encoded: &EncodedText,
    ) -> Result<ObjectId, WatermarkError> {
        match self {
            Self::Standard => Ok(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })),
            Self::Embedded(font) => add_composite_font(doc, font, encoded),
        }
    }
}

fn encode_win_ansi(text: &str) -> EncodedText {
    let mut bytes = Vec::with_capacity(text.len());
    let mut width_units = 0.0f32;

    for c in text.chars() {
        let code = match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => REPLACEMENT,
        };
        bytes.push(code);
        width_units += helvetica_width(code) as f32;
    }

    EncodedText {
        bytes,
        hex: false,
        width_units,
        glyphs: BTreeMap::new(),
    }
}

fn helvetica_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => HELVETICA_WIDTHS[(code - 0x20) as usize],
        _ => HELVETICA_HIGH_WIDTH,
    }
}

fn encode_glyph_ids(font: &EmbeddedFont, text: &str) -> EncodedText {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    let mut width_units = 0.0f32;
    let mut glyphs = BTreeMap::new();

    for c in text.chars() {
        let id = font.face.glyph_id(c);
        if id == GlyphId(0) {
            tracing::debug!(character = %c, font = %font.source.name, "Glyph missing from font");
        }
        let advance = font.to_thousandths(font.face.h_advance_unscaled(id));

        bytes.extend_from_slice(&id.0.to_be_bytes());
        width_units += advance;
        glyphs.entry(id.0).or_insert((advance, (id != GlyphId(0)).then_some(c)));
    }

    EncodedText {
        bytes,
        hex: true,
        width_units,
        glyphs,
    }
}

fn add_composite_font(
    doc: &mut Document,
    font: &EmbeddedFont,
    encoded: &EncodedText,
) -> Result<ObjectId, WatermarkError> {
    let program = font.source.data.as_ref().clone();
    let mut font_file = Stream::new(
        dictionary! { "Length1" => Object::Integer(program.len() as i64) },
        program,
    );
    font_file
        .compress()
        .map_err(|e| WatermarkError::render_failure(format!("cannot compress font program: {}", e)))?;
    let font_file_id = doc.add_object(font_file);

    let (ascent, descent) = font.vertical_metrics();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font.base_name.as_str(),
        "Flags" => Object::Integer(32),
        "FontBBox" => vec![
            Object::Integer(0),
            Object::Real(descent),
            Object::Integer(1000),
            Object::Real(ascent),
        ],
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => Object::Real(ascent),
        "Descent" => Object::Real(descent),
        "CapHeight" => Object::Real(ascent),
        "StemV" => Object::Integer(80),
        "FontFile2" => font_file_id,
    });

    let mut widths = Vec::with_capacity(encoded.glyphs.len() * 2);
    for (gid, (advance, _)) in &encoded.glyphs {
        widths.push(Object::Integer(*gid as i64));
        widths.push(Object::Array(vec![Object::Real(*advance)]));
    }

    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => font.base_name.as_str(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => descriptor_id,
        "CIDToGIDMap" => "Identity",
        "DW" => Object::Integer(1000),
        "W" => widths,
    });

    let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(encoded)));

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => font.base_name.as_str(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(descendant_id)],
        "ToUnicode" => to_unicode_id,
    }))
}

/// CMap mapping the used glyph ids back to Unicode for text extraction.
fn to_unicode_cmap(encoded: &EncodedText) -> Vec<u8> {
    let mappings: Vec<(u16, char)> = encoded
        .glyphs
        .iter()
        .filter_map(|(gid, (_, c))| c.map(|c| (*gid, c)))
        .collect();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    // bfchar blocks hold at most 100 entries
    for chunk in mappings.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CIDInit /ProcSet findresource /defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}

/// PostScript-safe font name derived from a file name.
fn pdf_font_name(name: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let cleaned: String = stem.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect();
    if cleaned.is_empty() {
        "WatermarkFont".to_string()
    } else {
        cleaned
    }
}
