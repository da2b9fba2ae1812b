//! Text measurement and line wrapping for the standard Helvetica faces

use crate::annotations::FontWeight;

/// Advance widths (1/1000 em) for WinAnsi 32..=126, Helvetica
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [\]^_`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {|}~
];

/// Advance widths (1/1000 em) for WinAnsi 32..=126, Helvetica-Bold
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :;<=>?@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [\]^_`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // {|}~
];

/// Width used for bytes outside the ASCII table (accented Latin letters and
/// punctuation are close to the lowercase average)
pub(crate) const FALLBACK_WIDTH: u16 = 556;

pub(crate) fn glyph_width(byte: u8, weight: FontWeight) -> u16 {
    let table = match weight {
        FontWeight::Normal => &HELVETICA_WIDTHS,
        FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    match byte {
        32..=126 => table[(byte - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` in points when set in Helvetica at `font_size`
pub fn text_width(text: &str, font_size: f64, weight: FontWeight) -> f64 {
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|b| glyph_width(b, weight) as u32)
        .sum();
    units as f64 * font_size / 1000.0
}

/// Encode text as single-byte WinAnsi, substituting `?` for anything the
/// encoding cannot represent
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Decode single-byte WinAnsi back to text
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80 => '€',
            0x82 => '‚',
            0x84 => '„',
            0x85 => '…',
            0x91 => '‘',
            0x92 => '’',
            0x93 => '“',
            0x94 => '”',
            0x95 => '•',
            0x96 => '–',
            0x97 => '—',
            0x99 => '™',
            0x80..=0x9f => '?',
            _ => b as char,
        })
        .collect()
}

/// Break `text` into lines.
///
/// Explicit newlines always start a new line. With a `wrap_width`, words
/// are packed greedily so no line exceeds the width, except that every line
/// holds at least one word: a word wider than the limit gets a line to
/// itself rather than being split or dropped.
pub fn wrap_lines(
    text: &str,
    font_size: f64,
    weight: FontWeight,
    wrap_width: Option<f64>,
) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let Some(max_width) = wrap_width.filter(|w| w.is_finite() && *w > 0.0) else {
            lines.push(paragraph.to_string());
            continue;
        };

        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if text_width(&candidate, font_size, weight) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    lines
}
