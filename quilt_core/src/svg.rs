// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SVG serialization of an [`ElementTree`].

extern crate alloc;

use alloc::string::String;
use core::fmt::Write;

use kurbo::{BezPath, PathEl, Rect};
use peniko::Brush;

use crate::element::{Element, ElementTree};
use crate::mark::{MarkPayload, TextAnchor, TextBaseline};

impl ElementTree {
    /// Serializes the displayed state of every element, in paint order.
    pub fn to_svg_string(&self, view_box: Rect) -> String {
        svg_document(view_box, &[self])
    }
}

/// Serializes several trees into one document; later trees paint on top.
pub fn svg_document(view_box: Rect, trees: &[&ElementTree]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}" width="{}" height="{}">"#,
        view_box.x0,
        view_box.y0,
        view_box.width(),
        view_box.height(),
        view_box.width(),
        view_box.height()
    );
    out.push('\n');
    for tree in trees {
        for el in tree.paint_order() {
            write_element(&mut out, el);
        }
    }
    out.push_str("</svg>\n");
    out
}

fn write_element(out: &mut String, el: &Element) {
    match el.payload() {
        MarkPayload::Rect(r) => {
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}""#,
                r.rect.x0,
                r.rect.y0,
                r.rect.width(),
                r.rect.height(),
            );
            if r.corner_radius > 0.0 {
                let _ = write!(out, r#" rx="{}""#, r.corner_radius);
            }
            write_paint_attr(out, "fill", &r.fill);
            write_stroke(out, &r.stroke, r.stroke_width);
            write_common(out, el);
            out.push_str("/>\n");
        }
        MarkPayload::Path(p) => {
            let _ = write!(out, r#"<path d="{}""#, path_data(&p.path));
            write_paint_attr(out, "fill", &p.fill);
            write_stroke(out, &p.stroke, p.stroke_width);
            write_common(out, el);
            out.push_str("/>\n");
        }
        MarkPayload::Text(t) => {
            let baseline = match t.baseline {
                TextBaseline::Middle => "middle",
                TextBaseline::Alphabetic => "alphabetic",
                TextBaseline::Hanging => "hanging",
                TextBaseline::Ideographic => "ideographic",
            };
            let anchor = match t.anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" font-size="{}" dominant-baseline="{}" text-anchor="{}""#,
                t.pos.x, t.pos.y, t.font_size, baseline, anchor
            );
            write_paint_attr(out, "fill", &t.fill);
            write_common(out, el);
            out.push('>');
            escape_xml_into(out, &t.text);
            out.push_str("</text>\n");
        }
    }
}

fn write_common(out: &mut String, el: &Element) {
    out.push_str(r#" class=""#);
    escape_xml_into(out, el.selector());
    out.push('"');
    let opacity = el.effective_opacity();
    if opacity < 1.0 {
        let _ = write!(out, r#" opacity="{opacity}""#);
    }
    if let Some(cursor) = el.cursor() {
        out.push_str(r#" cursor=""#);
        escape_xml_into(out, cursor);
        out.push('"');
    }
    for attr in el.attributes() {
        out.push(' ');
        escape_xml_into(out, &attr.name);
        out.push_str(r#"=""#);
        escape_xml_into(out, &alloc::format!("{}", attr.value));
        out.push('"');
    }
}

fn write_stroke(out: &mut String, stroke: &Brush, width: f64) {
    if width > 0.0 {
        write_paint_attr(out, "stroke", stroke);
        let _ = write!(out, r#" stroke-width="{width}""#);
    }
}

fn write_paint_attr(out: &mut String, name: &str, brush: &Brush) {
    match brush {
        Brush::Solid(color) => {
            let rgba = color.to_rgba8();
            if rgba.a == 0 {
                let _ = write!(out, r#" {name}="none""#);
                return;
            }
            let _ = write!(
                out,
                r##" {name}="#{:02x}{:02x}{:02x}""##,
                rgba.r, rgba.g, rgba.b
            );
            if rgba.a != 255 {
                let _ = write!(out, r#" {name}-opacity="{}""#, f64::from(rgba.a) / 255.0);
            }
        }
        _ => {
            let _ = write!(out, r#" {name}="none""#);
        }
    }
}

fn path_data(path: &BezPath) -> String {
    let mut d = String::new();
    for (i, el) in path.elements().iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        let _ = match el {
            PathEl::MoveTo(p) => write!(d, "M{},{}", p.x, p.y),
            PathEl::LineTo(p) => write!(d, "L{},{}", p.x, p.y),
            PathEl::QuadTo(p1, p2) => write!(d, "Q{},{} {},{}", p1.x, p1.y, p2.x, p2.y),
            PathEl::CurveTo(p1, p2, p3) => write!(
                d,
                "C{},{} {},{} {},{}",
                p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
            ),
            PathEl::ClosePath => write!(d, "Z"),
        };
    }
    d
}

fn escape_xml_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Point;
    use peniko::Color;

    use super::*;
    use crate::attrs::AttributeValue;
    use crate::mark::{Mark, MarkId, RectPayload, TextPayload};
    use crate::scene::Scene;

    #[test]
    fn writes_elements_with_attributes_and_escaping() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        let rect = Mark::rect(
            MarkId::from_raw(1),
            "tile",
            RectPayload::new(Rect::new(0.0, 0.0, 4.0, 2.0), Color::from_rgba8(255, 0, 0, 255)),
        )
        .with_attribute("data-id", AttributeValue::Str("a&b".into()));
        let text = Mark::text(
            MarkId::from_raw(2),
            "tile-label",
            TextPayload {
                pos: Point::new(1.0, 1.0),
                text: "<x>".into(),
                font_size: 10.0,
                anchor: TextAnchor::Start,
                baseline: TextBaseline::Hanging,
                fill: Color::from_rgba8(0, 0, 0, 255).into(),
            },
        )
        .with_z_index(1);
        tree.apply(&scene.tick(vec![rect, text]), 0.0);

        let svg = tree.to_svg_string(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(svg.contains(r##"<rect x="0" y="0" width="4" height="2" fill="#ff0000" class="tile" data-id="a&amp;b"/>"##));
        assert!(svg.contains("&lt;x&gt;</text>"));
        assert!(svg.find("<rect").unwrap() < svg.find("<text").unwrap());
    }
}
