use std::fs;
use std::path::Path;

use crate::contour::{link_segments, Polyline};
use crate::error::MapperResult;
use crate::geometry::Point;

pub const SIMPLIFY_EPSILON: f64 = 1.0;
pub const ISOLINE_STROKE: &str = "#423b35";
const START_FILL: &str = "#FFD700";
const CITY_FILL: &str = "green";

/// Every isoline as one `<path>`. Segments are linked and simplified first,
/// coordinates scaled to `px` per cell.
pub fn isolines_svg(
    lines: impl IntoIterator<Item = Polyline>,
    grid_width: usize,
    grid_height: usize,
    px: u32,
    stroke_width: u32,
    stroke_color: &str,
) -> String {
    let (w, h) = (grid_width as u32 * px, grid_height as u32 * px);
    let scale = px as f32;

    let mut d = String::new();
    for line in link_segments(lines) {
        if line.points.len() < 2 {
            continue;
        }
        let simple = line.simplified(SIMPLIFY_EPSILON);
        for (i, (x, y)) in simple.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            d.push_str(&format!("{} {:.1},{:.1}", cmd, x * scale, y * scale));
        }
    }

    let mut out = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\">\n",
        w, h
    );
    out.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>\n",
        d, stroke_color, stroke_width
    ));
    out.push_str("</svg>\n");
    out
}

/// Settlements as labelled circles plus `links` as gold lines. The `start`
/// settlement is filled gold.
pub fn cities_svg(
    cities: &[Point],
    names: &[String],
    links: &[(usize, usize)],
    start: Option<usize>,
    px: u32,
) -> String {
    let cell = px as f64;
    let center = |p: &Point| (p.x as f64 * cell + cell * 0.5, p.y as f64 * cell + cell * 0.5);

    let mut out = String::from("<svg xmlns=\"http://www.w3.org/2000/svg\">\n");

    out.push_str("<g class=\"links\">\n");
    for &(from, to) in links {
        let (Some(a), Some(b)) = (cities.get(from), cities.get(to)) else {
            continue;
        };
        let ((x1, y1), (x2, y2)) = (center(a), center(b));
        out.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
            x1,
            y1,
            x2,
            y2,
            START_FILL,
            cell / 2.0
        ));
    }
    out.push_str("</g>\n");

    out.push_str("<g class=\"cities\" font-family=\"sans-serif\" font-size=\"6\">\n");
    for (i, p) in cities.iter().enumerate() {
        let (cx, cy) = center(p);
        let fill = if Some(i) == start { START_FILL } else { CITY_FILL };
        let name = names.get(i).map(String::as_str).unwrap_or("");
        out.push_str(&format!(
            "  <g class=\"city\" data-name=\"{}\" data-index=\"{}\">\n",
            name, i
        ));
        out.push_str(&format!(
            "    <circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"/>\n",
            cx,
            cy,
            cell / 2.0,
            fill
        ));
        out.push_str(&format!(
            "    <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" fill=\"black\">{}</text>\n",
            cx,
            cy + 7.0,
            name
        ));
        out.push_str("  </g>\n");
    }
    out.push_str("</g>\n</svg>\n");
    out
}

/// Faint cell grid.
pub fn grid_svg(columns: usize, rows: usize, px: u32) -> String {
    let (w, h) = (columns as u32 * px, rows as u32 * px);
    let style = "stroke=\"#555\" stroke-width=\"0.25\" stroke-opacity=\"0.1\"";
    let mut out = format!(
        "<svg width=\"{w}\" height=\"{h}\" xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {w} {h}\">\n"
    );
    for i in 0..=columns as u32 {
        let x = i * px;
        out.push_str(&format!("  <line x1=\"{x}\" y1=\"0\" x2=\"{x}\" y2=\"{h}\" {style}/>\n"));
    }
    for j in 0..=rows as u32 {
        let y = j * px;
        out.push_str(&format!("  <line x1=\"0\" y1=\"{y}\" x2=\"{w}\" y2=\"{y}\" {style}/>\n"));
    }
    out.push_str("</svg>\n");
    out
}

fn svg_body(svg: &str) -> &str {
    let trimmed = svg.trim_start();
    if !trimmed.starts_with("<svg") {
        return svg;
    }
    let start = trimmed.find('>').map_or(0, |i| i + 1);
    let end = trimmed.rfind("</svg>").unwrap_or(trimmed.len()).max(start);
    &trimmed[start..end]
}

/// Appends the body of `overlay` inside the root element of `base`.
/// `overlay` may also be a bare fragment.
pub fn merge_svgs(base: &str, overlay: &str) -> String {
    let trimmed = base.trim_start();
    let header_end = trimmed.find('>').map_or(0, |i| i + 1);
    format!(
        "{}\n{}\n{}\n</svg>\n",
        &trimmed[..header_end],
        svg_body(base).trim_end(),
        svg_body(overlay).trim()
    )
}

pub fn write_svg(svg: &str, path: impl AsRef<Path>) -> MapperResult<()> {
    fs::write(path, svg)?;
    Ok(())
}
