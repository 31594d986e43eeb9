//! Font metrics and PDF font resources.

use crate::error::{Result, WatermarkError};
use ab_glyph::{Font, FontVec};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;
const COURIER_WIDTH: u16 = 600;

// Widths in 1/1000 em for codes 32..=255, WinAnsi order, from the Adobe AFMs.
// Codes the encoding leaves undefined are 0.

// Helvetica and Helvetica-Oblique
#[rustfmt::skip]
const HELVETICA: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

// Helvetica-Bold and Helvetica-BoldOblique
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 224] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 224] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, 0,
    500, 0, 333, 500, 444, 1000, 500, 500, 333, 1000, 556, 333, 889, 0, 611, 0,
    0, 333, 333, 444, 444, 350, 500, 1000, 333, 980, 389, 333, 722, 0, 444, 722,
    250, 333, 500, 500, 500, 500, 200, 500, 333, 760, 276, 500, 564, 333, 760, 333,
    400, 564, 300, 300, 333, 500, 453, 250, 333, 300, 310, 500, 750, 750, 750, 444,
    722, 722, 722, 722, 722, 722, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 722, 722, 722, 722, 722, 722, 564, 722, 722, 722, 722, 722, 722, 556, 500,
    444, 444, 444, 444, 444, 444, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 564, 500, 500, 500, 500, 500, 500, 500, 500,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 224] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520, 0,
    500, 0, 333, 500, 500, 1000, 500, 500, 333, 1000, 556, 333, 1000, 0, 667, 0,
    0, 333, 333, 500, 500, 350, 500, 1000, 333, 1000, 389, 333, 722, 0, 444, 722,
    250, 333, 500, 500, 500, 500, 220, 500, 333, 747, 300, 500, 570, 333, 747, 333,
    400, 570, 300, 300, 333, 556, 540, 250, 333, 300, 330, 500, 750, 750, 750, 500,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 389, 389, 389, 389,
    722, 722, 778, 778, 778, 778, 778, 570, 778, 722, 722, 722, 722, 722, 611, 556,
    500, 500, 500, 500, 500, 500, 722, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 556, 500, 500, 500, 500, 500, 570, 500, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const TIMES_ITALIC: [u16; 224] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541, 0,
    500, 0, 333, 500, 556, 889, 500, 500, 333, 1000, 500, 333, 944, 0, 556, 0,
    0, 333, 333, 556, 556, 350, 500, 889, 333, 980, 389, 333, 667, 0, 389, 556,
    250, 389, 500, 500, 500, 500, 275, 500, 333, 760, 276, 500, 675, 333, 760, 333,
    400, 675, 300, 300, 333, 500, 523, 250, 333, 300, 310, 500, 750, 750, 750, 500,
    611, 611, 611, 611, 611, 611, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 667, 722, 722, 722, 722, 722, 675, 722, 722, 722, 722, 722, 556, 611, 500,
    500, 500, 500, 500, 500, 500, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 675, 500, 500, 500, 500, 500, 444, 500, 444,
];

#[rustfmt::skip]
const TIMES_BOLD_ITALIC: [u16; 224] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    832, 667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
    611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333, 278, 333, 570, 500,
    333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500,
    500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570, 0,
    500, 0, 333, 500, 500, 1000, 500, 500, 333, 1000, 556, 333, 944, 0, 611, 0,
    0, 333, 333, 500, 500, 350, 500, 1000, 333, 1000, 389, 333, 667, 0, 389, 611,
    250, 389, 500, 500, 500, 500, 220, 500, 333, 747, 266, 500, 606, 333, 747, 333,
    400, 570, 300, 300, 333, 576, 500, 250, 333, 300, 300, 500, 750, 750, 750, 500,
    667, 667, 667, 667, 667, 667, 944, 667, 667, 667, 667, 667, 389, 389, 389, 389,
    722, 722, 722, 722, 722, 722, 722, 570, 722, 722, 722, 722, 722, 611, 611, 500,
    500, 500, 500, 500, 500, 500, 722, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 556, 500, 500, 500, 500, 500, 570, 500, 556, 556, 556, 556, 444, 500, 444,
];

// Symbol, in its built-in encoding
#[rustfmt::skip]
const SYMBOL: [u16; 224] = [
    250, 333, 713, 500, 549, 833, 778, 439, 333, 333, 500, 549, 250, 549, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 549, 549, 549, 444,
    549, 722, 667, 722, 612, 611, 763, 603, 722, 333, 631, 722, 686, 889, 722, 722,
    768, 741, 556, 592, 611, 690, 439, 768, 645, 795, 611, 333, 863, 333, 658, 500,
    500, 631, 549, 549, 494, 439, 521, 411, 603, 329, 603, 549, 549, 576, 521, 549,
    549, 521, 549, 603, 439, 576, 713, 686, 493, 686, 494, 480, 200, 480, 549, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    250, 620, 247, 549, 167, 713, 500, 753, 753, 753, 753, 1042, 987, 603, 987, 603,
    400, 549, 411, 549, 549, 713, 494, 460, 549, 549, 549, 549, 1000, 603, 1000, 658,
    823, 686, 795, 987, 768, 768, 823, 768, 768, 713, 713, 713, 713, 713, 713, 768,
    768, 713, 790, 790, 890, 823, 549, 250, 713, 603, 603, 1042, 987, 603, 987, 603,
    494, 329, 790, 790, 786, 713, 384, 384, 384, 384, 384, 384, 494, 494, 494, 494,
    0, 329, 274, 686, 686, 686, 384, 384, 384, 384, 384, 384, 494, 494, 494, 0,
];

#[rustfmt::skip]
const ZAPF_DINGBATS: [u16; 224] = [
    278, 974, 961, 974, 980, 719, 789, 790, 791, 690, 960, 939, 549, 855, 911, 933,
    911, 945, 974, 755, 846, 762, 761, 571, 677, 763, 760, 759, 754, 494, 552, 537,
    577, 692, 786, 788, 788, 790, 793, 794, 816, 823, 789, 841, 823, 833, 816, 831,
    923, 744, 723, 749, 790, 792, 695, 776, 768, 792, 759, 707, 708, 682, 701, 826,
    815, 789, 789, 707, 687, 696, 689, 786, 787, 713, 791, 785, 791, 873, 761, 762,
    762, 759, 759, 892, 892, 788, 784, 438, 138, 277, 415, 392, 392, 668, 668, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 732, 544, 544, 910, 667, 760, 760, 776, 595, 694, 626, 788, 788, 788, 788,
    788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788,
    788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788, 788,
    788, 788, 788, 788, 894, 838, 1016, 458, 748, 924, 748, 918, 927, 928, 928, 834,
    873, 828, 924, 924, 917, 930, 931, 463, 883, 836, 836, 867, 867, 696, 696, 874,
    0, 874, 760, 946, 771, 865, 771, 888, 967, 888, 831, 873, 927, 970, 918, 0,
];

/// The standard 14 Type1 fonts every PDF reader provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    const ALL: [StandardFont; 14] = [
        Self::Helvetica,
        Self::HelveticaBold,
        Self::HelveticaOblique,
        Self::HelveticaBoldOblique,
        Self::TimesRoman,
        Self::TimesBold,
        Self::TimesItalic,
        Self::TimesBoldItalic,
        Self::Courier,
        Self::CourierBold,
        Self::CourierOblique,
        Self::CourierBoldOblique,
        Self::Symbol,
        Self::ZapfDingbats,
    ];

    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::Symbol => "Symbol",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.base_font() == name)
    }

    /// Symbol and ZapfDingbats only work with their built-in encoding.
    fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbol | Self::ZapfDingbats)
    }

    fn widths(&self) -> Option<&'static [u16; 224]> {
        match self {
            Self::Helvetica | Self::HelveticaOblique => Some(&HELVETICA),
            Self::HelveticaBold | Self::HelveticaBoldOblique => Some(&HELVETICA_BOLD),
            Self::TimesRoman => Some(&TIMES_ROMAN),
            Self::TimesBold => Some(&TIMES_BOLD),
            Self::TimesItalic => Some(&TIMES_ITALIC),
            Self::TimesBoldItalic => Some(&TIMES_BOLD_ITALIC),
            Self::Symbol => Some(&SYMBOL),
            Self::ZapfDingbats => Some(&ZAPF_DINGBATS),
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique => {
                None
            }
        }
    }

    fn char_width(&self, code: u8) -> f64 {
        let width = match (self.widths(), code.checked_sub(FIRST_CHAR)) {
            (None, _) => COURIER_WIDTH,
            (Some(table), Some(i)) => table[i as usize],
            (Some(_), None) => 0,
        };
        width as f64
    }
}

/// A TrueType program embedded whole into the output.
pub struct TrueTypeFont {
    name: String,
    data: Vec<u8>,
    widths: Vec<f64>,
    ascent: f64,
    descent: f64,
}

impl TrueTypeFont {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect::<String>())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());
        Self::from_bytes(name, data)
    }

    pub fn from_bytes(name: String, data: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(data.clone())
            .map_err(|e| WatermarkError::Font(format!("{name}: {e}")))?;
        let scale = 1000.0 / font.units_per_em().unwrap_or(1000.0) as f64;

        let widths = (FIRST_CHAR..=LAST_CHAR)
            .map(|code| {
                let glyph = font.glyph_id(char::from(code));
                font.h_advance_unscaled(glyph) as f64 * scale
            })
            .collect();

        Ok(Self {
            name,
            widths,
            ascent: font.ascent_unscaled() as f64 * scale,
            descent: font.descent_unscaled() as f64 * scale,
            data,
        })
    }

    fn char_width(&self, code: u8) -> f64 {
        code.checked_sub(FIRST_CHAR)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

impl fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Font used for text watermarks.
#[derive(Debug, Clone)]
pub enum FontSpec {
    Standard(StandardFont),
    TrueType(Arc<TrueTypeFont>),
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::Standard(StandardFont::Helvetica)
    }
}

impl FontSpec {
    /// Resolve a standard font name or a `.ttf` path relative to the working
    /// directory.
    pub fn resolve(name: &str) -> Result<Self> {
        let is_ttf = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ttf"));

        if is_ttf {
            let path = std::env::current_dir()?.join(name);
            if !path.is_file() {
                return Err(WatermarkError::config(format!(
                    "font file '{}' does not exist",
                    path.display()
                )));
            }
            return Ok(Self::TrueType(Arc::new(TrueTypeFont::load(&path)?)));
        }

        StandardFont::from_name(name)
            .map(Self::Standard)
            .ok_or_else(|| {
                let known: Vec<_> = StandardFont::ALL.iter().map(|f| f.base_font()).collect();
                WatermarkError::config(format!(
                    "unknown font '{name}', expected a .ttf file or one of: {}",
                    known.join(", ")
                ))
            })
    }

    /// Single-byte WinAnsi codes for `text`. Only printable ASCII and the
    /// Latin-1 upper half map to themselves; everything else becomes `?`.
    pub fn encode(text: &str) -> Vec<u8> {
        text.chars()
            .map(|c| match u32::from(c) {
                code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
                _ => b'?',
            })
            .collect()
    }

    /// Width of `text` in points at `size`.
    pub fn string_width(&self, text: &str, size: f64) -> f64 {
        let units: f64 = Self::encode(text)
            .into_iter()
            .map(|code| match self {
                Self::Standard(font) => font.char_width(code),
                Self::TrueType(font) => font.char_width(code),
            })
            .sum();
        units * size / 1000.0
    }

    /// Add the font dictionary (and any embedded program) to `doc`.
    pub fn add_to_document(&self, doc: &mut Document) -> Result<ObjectId> {
        match self {
            Self::Standard(font) => {
                let mut dict = dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.base_font(),
                };
                if !font.is_symbolic() {
                    dict.set("Encoding", "WinAnsiEncoding");
                }
                Ok(doc.add_object(dict))
            }
            Self::TrueType(font) => add_truetype(doc, font),
        }
    }
}

fn add_truetype(doc: &mut Document, font: &TrueTypeFont) -> Result<ObjectId> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&font.data)?;
    let compressed = encoder.finish()?;

    let file_id = doc.add_object(Stream::new(
        dictionary! {
            "Length1" => font.data.len() as i64,
            "Filter" => "FlateDecode",
        },
        compressed,
    ));

    let descriptor: Dictionary = dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(font.name.clone().into_bytes()),
        "Flags" => 32_i64,
        "FontBBox" => vec![Object::Integer(0), font.descent.into(), Object::Integer(1000), font.ascent.into()],
        "ItalicAngle" => 0_i64,
        "Ascent" => font.ascent,
        "Descent" => font.descent,
        "CapHeight" => font.ascent,
        "StemV" => 80_i64,
        "FontFile2" => Object::Reference(file_id),
    };
    let descriptor_id = doc.add_object(descriptor);

    let widths: Vec<Object> = font.widths.iter().map(|w| Object::from(w.round() as i64)).collect();
    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => Object::Name(font.name.clone().into_bytes()),
        "FirstChar" => FIRST_CHAR as i64,
        "LastChar" => LAST_CHAR as i64,
        "Widths" => widths,
        "FontDescriptor" => Object::Reference(descriptor_id),
        "Encoding" => "WinAnsiEncoding",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_width() {
        let font = FontSpec::default();
        // "watermark": w a t e r m a r k
        let units = 722 + 556 + 278 + 556 + 333 + 833 + 556 + 333 + 500;
        let expected = units as f64 * 12.0 / 1000.0;
        assert!((font.string_width("watermark", 12.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_courier_is_monospace() {
        let font = FontSpec::resolve("Courier").unwrap();
        assert!((font.string_width("iiii", 10.0) - 24.0).abs() < 1e-9);
        assert!((font.string_width("WWWW", 10.0) - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_unknown_font() {
        let err = FontSpec::resolve("Comic Sans").unwrap_err();
        assert!(matches!(err, WatermarkError::Configuration(_)));
    }

    #[test]
    fn test_resolve_missing_ttf() {
        let err = FontSpec::resolve("fonts/does-not-exist.ttf").unwrap_err();
        assert!(matches!(err, WatermarkError::Configuration(_)));
    }

    #[test]
    fn test_invalid_ttf_bytes() {
        let err = TrueTypeFont::from_bytes("Broken".into(), b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, WatermarkError::Font(_)));
    }

    #[test]
    fn test_encode_replaces_wide_chars() {
        assert_eq!(FontSpec::encode("aé✓"), vec![b'a', 0xE9, b'?']);
    }

    #[test]
    fn test_encode_replaces_c1_controls() {
        // WinAnsi puts other glyphs at 0x80..=0x9F
        assert_eq!(FontSpec::encode("a\u{0085}\u{009F}b"), b"a??b".to_vec());
        assert_eq!(FontSpec::encode("\u{00A0}\u{00FF}"), vec![0xA0, 0xFF]);
    }

    #[test]
    fn test_accented_width_uses_afm_table() {
        let font = FontSpec::default();
        assert!((font.string_width("é", 1000.0) - 556.0).abs() < 1e-9);
        assert!((font.string_width("Æ", 1000.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_standard_fonts_resolve() {
        for name in [
            "Helvetica",
            "Helvetica-Bold",
            "Helvetica-Oblique",
            "Helvetica-BoldOblique",
            "Times-Roman",
            "Times-Bold",
            "Times-Italic",
            "Times-BoldItalic",
            "Courier",
            "Courier-Bold",
            "Courier-Oblique",
            "Courier-BoldOblique",
            "Symbol",
            "ZapfDingbats",
        ] {
            match FontSpec::resolve(name).unwrap() {
                FontSpec::Standard(font) => assert_eq!(font.base_font(), name),
                FontSpec::TrueType(_) => panic!("{name} is a standard font"),
            }
        }
    }

    #[test]
    fn test_times_and_bold_widths() {
        let times = FontSpec::resolve("Times-Roman").unwrap();
        // W a
        assert!((times.string_width("Wa", 1000.0) - (944.0 + 444.0)).abs() < 1e-9);

        let bold = FontSpec::resolve("Helvetica-BoldOblique").unwrap();
        assert!((bold.string_width("b", 1000.0) - 611.0).abs() < 1e-9);
    }

    #[test]
    fn test_symbolic_fonts_keep_builtin_encoding() {
        let mut doc = Document::with_version("1.5");
        let id = FontSpec::resolve("ZapfDingbats").unwrap().add_to_document(&mut doc).unwrap();
        let dict = doc.get_object(id).unwrap().as_dict().unwrap();
        assert!(!dict.has(b"Encoding"));

        let id = FontSpec::resolve("Times-Bold").unwrap().add_to_document(&mut doc).unwrap();
        let dict = doc.get_object(id).unwrap().as_dict().unwrap();
        assert_eq!(dict.get(b"Encoding").unwrap().as_name_str().unwrap(), "WinAnsiEncoding");
    }

    #[test]
    fn test_standard_font_dictionary() {
        let mut doc = Document::with_version("1.5");
        let id = FontSpec::default().add_to_document(&mut doc).unwrap();
        let dict = doc.get_object(id).unwrap().as_dict().unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name_str().unwrap(), "Helvetica");
    }
}
