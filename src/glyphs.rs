//! A small single-stroke font for atom labels.
//!
//! Glyphs are polylines on a grid where capitals span `y = 0..12` with the
//! baseline at `y = 12`, lowercase letters have an x-height from `y = 4` and
//! descenders reach `y = 16`. Each stroke is written as space separated
//! `x,y` points; strokes are separated by `|`.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Height of a capital letter in grid units.
pub(crate) const CAP_HEIGHT: f64 = 12.0;
/// Space between glyphs in grid units.
const TRACKING: f64 = 2.5;

const GLYPH_SOURCE: &[(char, &str)] = &[
    ('A', "0,12 4,0 8,12|1.5,7.5 6.5,7.5"),
    ('B', "0,6 5,6 7,7 8,9 7,11 5,12 0,12 0,0 5,0 7,1 7,4 5,6"),
    ('C', "8,2 6,0 2,0 0,2 0,10 2,12 6,12 8,10"),
    ('D', "0,0 0,12 5,12 8,9 8,3 5,0 0,0"),
    ('E', "8,0 0,0 0,12 8,12|0,6 6,6"),
    ('F', "8,0 0,0 0,12|0,6 6,6"),
    ('G', "8,2 6,0 2,0 0,2 0,10 2,12 6,12 8,10 8,7 5,7"),
    ('H', "0,0 0,12|8,0 8,12|0,6 8,6"),
    ('I', "4,0 4,12|2,0 6,0|2,12 6,12"),
    ('J', "8,0 8,10 6,12 2,12 0,10"),
    ('K', "0,0 0,12|8,0 0,7|3,5 8,12"),
    ('L', "0,0 0,12 8,12"),
    ('M', "0,12 0,0 4,7 8,0 8,12"),
    ('N', "0,12 0,0 8,12 8,0"),
    ('O', "2,0 6,0 8,2 8,10 6,12 2,12 0,10 0,2 2,0"),
    ('P', "0,12 0,0 6,0 8,2 8,4 6,6 0,6"),
    ('Q', "2,0 6,0 8,2 8,10 6,12 2,12 0,10 0,2 2,0|5,9 8,12"),
    ('R', "0,12 0,0 6,0 8,2 8,4 6,6 0,6|4,6 8,12"),
    ('S', "8,2 6,0 2,0 0,2 0,4 2,6 6,6 8,8 8,10 6,12 2,12 0,10"),
    ('T', "0,0 8,0|4,0 4,12"),
    ('U', "0,0 0,10 2,12 6,12 8,10 8,0"),
    ('V', "0,0 4,12 8,0"),
    ('W', "0,0 2,12 4,5 6,12 8,0"),
    ('X', "0,0 8,12|8,0 0,12"),
    ('Y', "0,0 4,6 8,0|4,6 4,12"),
    ('Z', "0,0 8,0 0,12 8,12"),
    ('a', "6,4 6,12|6,6 4,4 2,4 0,6 0,10 2,12 4,12 6,10"),
    ('b', "0,0 0,12|0,6 2,4 4,4 6,6 6,10 4,12 2,12 0,10"),
    ('c', "6,5 5,4 1,4 0,5.5 0,10.5 1,12 5,12 6,11"),
    ('d', "6,0 6,12|6,6 4,4 2,4 0,6 0,10 2,12 4,12 6,10"),
    ('e', "0,8 6,8 6,6 4,4 2,4 0,6 0,10 2,12 5,12 6,11"),
    ('f', "5,0 3,0 2,1 2,12|0,5 5,5"),
    ('g', "6,4 6,14 4,16 1,16|6,6 4,4 2,4 0,6 0,10 2,12 4,12 6,10"),
    ('h', "0,0 0,12|0,6 2,4 4,4 6,6 6,12"),
    ('i', "1.5,4 1.5,12|1.5,1 1.5,2"),
    ('j', "4,4 4,14 2,16 0,16|4,1 4,2"),
    ('k', "0,0 0,12|6,4 0,9|2,8 6,12"),
    ('l', "1.5,0 1.5,12"),
    ('m', "0,12 0,4|0,6 1.5,4 3,6 3,12|3,6 4.5,4 6,6 6,12"),
    ('n', "0,12 0,4|0,6 2,4 4,4 6,6 6,12"),
    ('o', "2,4 4,4 6,6 6,10 4,12 2,12 0,10 0,6 2,4"),
    ('p', "0,4 0,16|0,6 2,4 4,4 6,6 6,10 4,12 2,12 0,10"),
    ('q', "6,4 6,16|6,6 4,4 2,4 0,6 0,10 2,12 4,12 6,10"),
    ('r', "0,4 0,12|0,7 3,4 6,4"),
    ('s', "6,5 5,4 1,4 0,5 0,7 1,8 5,8 6,9 6,11 5,12 1,12 0,11"),
    ('t', "2,1 2,11 3,12 5,12|0,4 5,4"),
    ('u', "0,4 0,10 2,12 4,12 6,10|6,4 6,12"),
    ('v', "0,4 3,12 6,4"),
    ('w', "0,4 1.5,12 3,6 4.5,12 6,4"),
    ('x', "0,4 6,12|6,4 0,12"),
    ('y', "0,4 3,12|6,4 2,16 0,16"),
    ('z', "0,4 6,4 0,12 6,12"),
    ('0', "1,0 5,0 6,2 6,10 5,12 1,12 0,10 0,2 1,0"),
    ('1', "1,2 3,0 3,12|1,12 5,12"),
    ('2', "0,2 2,0 4,0 6,2 6,4 0,12 6,12"),
    ('3', "0,1 1,0 5,0 6,1 6,5 5,6 2,6|5,6 6,7 6,11 5,12 1,12 0,11"),
    ('4', "5,12 5,0 0,8 6,8"),
    ('5', "6,0 0,0 0,5 4,5 6,7 6,10 4,12 0,12"),
    ('6', "5,0 2,0 0,3 0,10 2,12 4,12 6,10 6,8 4,6 0,6"),
    ('7', "0,0 6,0 2,12"),
    ('8', "1,0 5,0 6,1 6,5 5,6 1,6 0,5 0,1 1,0|1,6 0,7 0,11 1,12 5,12 6,11 6,7 5,6"),
    ('9', "6,6 2,6 0,4 0,2 2,0 4,0 6,2 6,9 4,12 1,12"),
    ('+', "0,6 6,6|3,3 3,9"),
    ('-', "0,6 6,6"),
    ('?', "0,2 2,0 5,0 7,2 7,4 3.5,7 3.5,9|3.5,11.5 3.5,12"),
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    /// Horizontal extent in grid units.
    pub width: f64,
    pub strokes: Vec<Vec<(f64, f64)>>,
}

impl Glyph {
    fn parse(source: &str) -> Option<Self> {
        let strokes = source
            .split('|')
            .map(|stroke| {
                stroke
                    .split_whitespace()
                    .map(|point| {
                        let (x, y) = point.split_once(',')?;
                        Some((x.parse().ok()?, y.parse().ok()?))
                    })
                    .collect::<Option<Vec<(f64, f64)>>>()
            })
            .collect::<Option<Vec<_>>>()?;
        let width = strokes
            .iter()
            .flatten()
            .map(|(x, _)| *x)
            .fold(0.0, f64::max);
        Some(Self { width, strokes })
    }
}

lazy_static! {
    static ref GLYPHS: HashMap<char, Glyph> = GLYPH_SOURCE
        .iter()
        .filter_map(|(c, source)| Glyph::parse(source).map(|g| (*c, g)))
        .collect();
}

/// The glyph for `c`, or a question mark for characters the font lacks.
pub(crate) fn glyph(c: char) -> Option<&'static Glyph> {
    GLYPHS.get(&c).or_else(|| GLYPHS.get(&'?'))
}

/// Width of `text` in pixels when capitals are `size` pixels tall.
pub(crate) fn text_width(text: &str, size: f64) -> f64 {
    let scale = size / CAP_HEIGHT;
    let units: f64 = text
        .chars()
        .filter_map(glyph)
        .map(|g| g.width + TRACKING)
        .sum();
    ((units - TRACKING) * scale).max(0.0)
}

/// Polylines in pixel space for `text` whose left edge is at `x` and
/// baseline at `baseline`.
pub(crate) fn text_strokes(text: &str, size: f64, x: f64, baseline: f64) -> Vec<Vec<(f64, f64)>> {
    let scale = size / CAP_HEIGHT;
    let top = baseline - size;
    let mut cursor = x;
    let mut strokes = Vec::new();
    for g in text.chars().filter_map(glyph) {
        for stroke in &g.strokes {
            strokes.push(
                stroke
                    .iter()
                    .map(|(gx, gy)| (cursor + gx * scale, top + gy * scale))
                    .collect(),
            );
        }
        cursor += (g.width + TRACKING) * scale;
    }
    strokes
}
