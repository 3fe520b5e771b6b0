// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Categorical palette and color helpers.

use peniko::Color;

use crate::accessor::SeriesAccessor;
use crate::record::Record;

const PALETTE_RGB: [[u8; 3]; 6] = [
    [0x4d, 0x8c, 0xfd],
    [0xff, 0x6b, 0x7e],
    [0xf4, 0xb8, 0x3e],
    [0xa6, 0xcc, 0x74],
    [0x00, 0xc1, 0x9a],
    [0x68, 0x59, 0xbe],
];

/// Number of distinct palette colors before they repeat.
pub const PALETTE_LEN: usize = PALETTE_RGB.len();

/// The categorical palette color for index `i` (wrapping).
pub fn palette_color(i: usize) -> Color {
    let [r, g, b] = PALETTE_RGB[i % PALETTE_LEN];
    Color::from_rgb8(r, g, b)
}

/// The full palette, in order.
pub fn palette() -> impl Iterator<Item = Color> {
    (0..PALETTE_LEN).map(palette_color)
}

/// Resolves a color accessor for series `group`.
///
/// With `fallback`, an absent accessor or an undefined result yields the series' palette
/// color; without it, `None`.
pub fn resolve_color<D: Record>(
    accessor: Option<&SeriesAccessor<D, Color>>,
    datum: &D,
    index: usize,
    group: usize,
    fallback: bool,
) -> Option<Color> {
    accessor
        .and_then(|a| a.resolve(datum, index, group))
        .or_else(|| fallback.then(|| palette_color(group)))
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(s: &str) -> Option<Color> {
    let hex = s.trim().strip_prefix('#')?;
    let digit = |i: usize| -> Option<u8> {
        let c = *hex.as_bytes().get(i)?;
        char::from(c)
            .to_digit(16)
            .and_then(|d| u8::try_from(d).ok())
    };
    let byte = |i: usize| -> Option<u8> { Some(digit(i)? * 16 + digit(i + 1)?) };
    match hex.len() {
        3 => Some(Color::from_rgb8(
            digit(0)? * 17,
            digit(1)? * 17,
            digit(2)? * 17,
        )),
        6 => Some(Color::from_rgb8(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// Mixes `color` towards white by `amount` (negative amounts mix towards black).
///
/// `amount` is clamped to `[-1, 1]`; alpha is preserved.
pub fn adjust_lightness(color: Color, amount: f64) -> Color {
    #[allow(clippy::cast_possible_truncation, reason = "clamped to [-1, 1]")]
    let t = amount.clamp(-1.0, 1.0) as f32;
    let [r, g, b, a] = color.components;
    let mix = |c: f32| {
        if t >= 0.0 {
            c + (1.0 - c) * t
        } else {
            c * (1.0 + t)
        }
    };
    Color::new([mix(r), mix(g), mix(b), a])
}

/// Returns `color` with its alpha multiplied by `opacity`.
pub fn with_opacity(color: Color, opacity: f64) -> Color {
    #[allow(clippy::cast_possible_truncation, reason = "clamped to [0, 1]")]
    let o = opacity.clamp(0.0, 1.0) as f32;
    color.multiply_alpha(o)
}
