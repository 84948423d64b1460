//! Raster depiction of a molecule graph.
//!
//! The renderer draws straight into an `RgbImage`: bonds as thick line
//! segments, atom labels with the stroke font from `glyphs`. Nothing touches
//! the filesystem.

use crate::glyphs::{text_strokes, text_width};
use crate::layout::{centroid, compute_2d_coords, Point};
use crate::rings::{find_rings, Ring};
use crate::{hydrogen_count, parse_smiles, Bond, MoleculeGraph, RenderError};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_antialiased_line_segment_mut, draw_filled_circle_mut, draw_polygon_mut,
};
use imageproc::pixelops::interpolate;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::debug;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Cap height of atom labels relative to the bond length.
const LABEL_SCALE: f64 = 0.45;
/// Distance between the lines of a multiple bond relative to the bond length.
const MULTIPLE_BOND_GAP: f64 = 0.18;
/// Fraction cut from each end of the inner line of a ring double bond.
const INNER_LINE_INSET: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct DrawOptions {
    /// Width and height of the canvas in pixels.
    pub size: u32,
    /// Width of bond lines in pixels.
    pub bond_width: f32,
    /// Margin kept free around the drawing, in pixels.
    pub padding: f64,
    /// Upper bound on the length of one bond, in pixels.
    pub max_bond_length: f64,
    /// Colour heteroatoms and their bond halves.
    pub atom_colors: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self::with_size(256)
    }
}

impl DrawOptions {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            bond_width: 2.0,
            padding: size as f64 * 0.05,
            max_bond_length: size as f64 * 0.2,
            atom_colors: true,
        }
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.size == 0 {
            return Err(RenderError::InvalidOptions("canvas size must be positive".into()));
        }
        if !(self.bond_width.is_finite() && self.bond_width > 0.0) {
            return Err(RenderError::InvalidOptions(format!(
                "bond width {} must be positive",
                self.bond_width
            )));
        }
        if !(self.max_bond_length.is_finite() && self.max_bond_length > 0.0) {
            return Err(RenderError::InvalidOptions(format!(
                "maximum bond length {} must be positive",
                self.max_bond_length
            )));
        }
        if !(self.padding >= 0.0 && self.padding * 2.0 < self.size as f64) {
            return Err(RenderError::InvalidOptions(format!(
                "padding {} leaves no room on a {}px canvas",
                self.padding, self.size
            )));
        }
        Ok(())
    }
}

/// Parses `smiles` and renders it.
pub fn render_smiles(smiles: &str, options: &DrawOptions) -> Result<RgbImage, RenderError> {
    let graph = parse_smiles(smiles)?;
    render_molecule(&graph, options)
}

/// Renders a molecule onto a white `size x size` canvas.
pub fn render_molecule(graph: &MoleculeGraph, options: &DrawOptions) -> Result<RgbImage, RenderError> {
    options.validate()?;
    if graph.node_count() == 0 {
        return Err(RenderError::EmptyMolecule);
    }

    let coords = compute_2d_coords(graph);
    let rings = find_rings(graph);
    let labels: Vec<Option<Label>> = graph
        .node_indices()
        .map(|node| Label::for_atom(graph, node, &coords))
        .collect();

    let transform = Transform::fit(&coords, labels.iter().any(Option::is_some), options);
    debug!(
        atoms = graph.node_count(),
        bonds = graph.edge_count(),
        bond_length = transform.scale,
        "rendering molecule"
    );
    let canvas = Canvas {
        pixels: coords.iter().map(|p| transform.apply(*p)).collect(),
        bond_length: transform.scale,
        font_size: transform.scale * LABEL_SCALE,
        options,
    };

    let mut image = RgbImage::from_pixel(options.size, options.size, WHITE);
    for edge in graph.edge_references() {
        canvas.draw_bond(&mut image, graph, &rings, &labels, edge.source(), edge.target(), *edge.weight());
    }
    for node in graph.node_indices() {
        if let Some(label) = &labels[node.index()] {
            canvas.draw_label(&mut image, graph, node, label);
        }
    }
    Ok(image)
}

/// Maps layout coordinates onto the canvas.
struct Transform {
    scale: f64,
    center: Point,
    canvas_center: Point,
}

impl Transform {
    fn fit(coords: &[Point], has_labels: bool, options: &DrawOptions) -> Self {
        let min_x = coords.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = coords.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = coords.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = coords.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        // room for labels that stick out past the outermost atoms
        let margin = if has_labels { 1.0 } else { 0.25 };
        let available = options.size as f64 - 2.0 * options.padding;
        let width = max_x - min_x + 2.0 * margin;
        let height = max_y - min_y + 2.0 * margin;
        let scale = (available / width)
            .min(available / height)
            .min(options.max_bond_length)
            .max(1.0);

        let half = options.size as f64 / 2.0;
        Self {
            scale,
            center: Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            canvas_center: Point::new(half, half),
        }
    }

    fn apply(&self, p: Point) -> Point {
        self.canvas_center + (p - self.center) * self.scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum HydrogenSide {
    Left,
    Right,
}

/// Text drawn in place of an atom.
#[derive(Debug, Clone, PartialEq)]
struct Label {
    symbol: &'static str,
    hydrogens: u8,
    charge: i8,
    isotope: Option<u16>,
    side: HydrogenSide,
}

impl Label {
    fn for_atom(graph: &MoleculeGraph, node: NodeIndex, coords: &[Point]) -> Option<Self> {
        let atom = &graph[node];
        let degree = graph.neighbors(node).count();
        let shown = !atom.element.is_carbon()
            || degree == 0
            || atom.charge != 0
            || atom.isotope.is_some();
        if !shown {
            return None;
        }
        let here = coords[node.index()];
        let pull: f64 = graph
            .neighbors(node)
            .map(|nb| (coords[nb.index()] - here).normalized().x)
            .sum();
        let side = if pull > 0.1 {
            HydrogenSide::Left
        } else {
            HydrogenSide::Right
        };
        Some(Self {
            symbol: atom.element.symbol(),
            hydrogens: hydrogen_count(graph, node),
            charge: atom.charge,
            isotope: atom.isotope,
            side,
        })
    }

    fn charge_text(&self) -> Option<String> {
        let sign = if self.charge > 0 { "+" } else { "-" };
        match self.charge.unsigned_abs() {
            0 => None,
            1 => Some(sign.to_string()),
            n => Some(format!("{n}{sign}")),
        }
    }
}

struct Canvas<'a> {
    pixels: Vec<Point>,
    bond_length: f64,
    font_size: f64,
    options: &'a DrawOptions,
}

impl Canvas<'_> {
    fn color(&self, graph: &MoleculeGraph, node: NodeIndex) -> Rgb<u8> {
        if self.options.atom_colors {
            Rgb(graph[node].element.color())
        } else {
            BLACK
        }
    }

    /// How far a bond stops short of a labelled atom.
    fn label_clearance(&self, label: &Option<Label>) -> f64 {
        match label {
            Some(_) => self.font_size * 0.75,
            None => 0.0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_bond(
        &self,
        image: &mut RgbImage,
        graph: &MoleculeGraph,
        rings: &[Ring],
        labels: &[Option<Label>],
        a: NodeIndex,
        b: NodeIndex,
        bond: Bond,
    ) {
        let (pa, pb) = (self.pixels[a.index()], self.pixels[b.index()]);
        let length = pa.distance(pb);
        let trim_a = self.label_clearance(&labels[a.index()]);
        let trim_b = self.label_clearance(&labels[b.index()]);
        if length <= trim_a + trim_b + 1.0 {
            return;
        }
        let direction = (pb - pa).normalized();
        let start = pa + direction * trim_a;
        let end = pb - direction * trim_b;
        let (ca, cb) = (self.color(graph, a), self.color(graph, b));
        let width = self.options.bond_width;
        let gap = self.bond_length * MULTIPLE_BOND_GAP;
        let normal = direction.perp();

        // smallest ring through the bond decides which side inner lines go
        let inside = rings
            .iter()
            .find(|ring| ring.contains_bond(a, b))
            .map(|ring| {
                let center = centroid(ring.atoms.iter().map(|n| self.pixels[n.index()]));
                if (center - pa).dot(normal) >= 0.0 {
                    normal
                } else {
                    -normal
                }
            });

        match (bond, inside) {
            (Bond::Single, _) => split_line(image, start, end, width, ca, cb),
            (Bond::Double, Some(toward)) => {
                split_line(image, start, end, width, ca, cb);
                let (s, e) = inner_segment(pa, pb, start, end, trim_a, trim_b, toward * gap);
                split_line(image, s, e, width, ca, cb);
            }
            (Bond::Double, None) => {
                let offset = normal * (gap / 2.0);
                split_line(image, start + offset, end + offset, width, ca, cb);
                split_line(image, start - offset, end - offset, width, ca, cb);
            }
            (Bond::Triple, _) => {
                let offset = normal * gap;
                split_line(image, start, end, width, ca, cb);
                split_line(image, start + offset, end + offset, width, ca, cb);
                split_line(image, start - offset, end - offset, width, ca, cb);
            }
            (Bond::Aromatic, toward) => {
                split_line(image, start, end, width, ca, cb);
                let toward = toward.unwrap_or(normal);
                let (s, e) = inner_segment(pa, pb, start, end, trim_a, trim_b, toward * gap);
                dashed_line(image, s, e, width, ca, cb, self.bond_length * 0.12);
            }
        }
    }

    fn draw_label(&self, image: &mut RgbImage, graph: &MoleculeGraph, node: NodeIndex, label: &Label) {
        let color = self.color(graph, node);
        let center = self.pixels[node.index()];
        let size = self.font_size;
        let small = size * 0.6;
        let space = size * 0.15;
        let stroke = (size / 8.0).max(1.0) as f32;
        let baseline = center.y + size / 2.0;

        let symbol_width = text_width(label.symbol, size);
        let symbol_left = center.x - symbol_width / 2.0;
        let mut strokes = text_strokes(label.symbol, size, symbol_left, baseline);
        let mut left_edge = symbol_left;
        let mut right_edge = symbol_left + symbol_width;

        if label.hydrogens > 0 {
            let count = (label.hydrogens > 1).then(|| label.hydrogens.to_string());
            let h_width = text_width("H", size);
            let count_width = count.as_deref().map_or(0.0, |c| space + text_width(c, small));
            let group = h_width + count_width;
            let h_left = match label.side {
                HydrogenSide::Right => right_edge + space,
                HydrogenSide::Left => left_edge - space - group,
            };
            strokes.extend(text_strokes("H", size, h_left, baseline));
            if let Some(count) = &count {
                strokes.extend(text_strokes(count, small, h_left + h_width + space, baseline + small * 0.4));
            }
            match label.side {
                HydrogenSide::Right => right_edge = h_left + group,
                HydrogenSide::Left => left_edge = h_left,
            }
        }

        if let Some(isotope) = label.isotope {
            let text = isotope.to_string();
            let x = left_edge - space - text_width(&text, small);
            strokes.extend(text_strokes(&text, small, x, baseline - size * 0.55));
        }
        if let Some(charge) = label.charge_text() {
            strokes.extend(text_strokes(&charge, small, right_edge + space * 0.5, baseline - size * 0.55));
        }

        for polyline in strokes {
            for pair in polyline.windows(2) {
                let (from, to) = (Point::new(pair[0].0, pair[0].1), Point::new(pair[1].0, pair[1].1));
                thick_line(image, from, to, stroke, color);
            }
        }
    }
}

/// The inner line of a ring bond: shifted by `offset` and shortened at ends
/// that are not already trimmed around a label.
fn inner_segment(
    pa: Point,
    pb: Point,
    start: Point,
    end: Point,
    trim_a: f64,
    trim_b: f64,
    offset: Point,
) -> (Point, Point) {
    let inset = pa.distance(pb) * INNER_LINE_INSET;
    let direction = (pb - pa).normalized();
    let s = if trim_a > 0.0 { start } else { start + direction * inset };
    let e = if trim_b > 0.0 { end } else { end - direction * inset };
    (s + offset, e + offset)
}

/// A line whose first half takes `first` and second half `second`.
fn split_line(image: &mut RgbImage, a: Point, b: Point, width: f32, first: Rgb<u8>, second: Rgb<u8>) {
    if first == second {
        thick_line(image, a, b, width, first);
        return;
    }
    let mid = (a + b) * 0.5;
    thick_line(image, a, mid, width, first);
    thick_line(image, mid, b, width, second);
}

fn dashed_line(
    image: &mut RgbImage,
    a: Point,
    b: Point,
    width: f32,
    first: Rgb<u8>,
    second: Rgb<u8>,
    dash: f64,
) {
    let length = a.distance(b);
    if length < 1.0 || dash <= 0.0 {
        return;
    }
    let direction = (b - a).normalized();
    let mut t = 0.0;
    while t < length {
        let stop = (t + dash).min(length);
        let color = if (t + stop) / 2.0 < length / 2.0 { first } else { second };
        thick_line(image, a + direction * t, a + direction * stop, width, color);
        t += dash * 2.0;
    }
}

fn to_pixel(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

/// Draws a line segment of the given width with round caps.
pub(crate) fn thick_line(image: &mut RgbImage, a: Point, b: Point, width: f32, color: Rgb<u8>) {
    if width <= 1.5 {
        draw_antialiased_line_segment_mut(image, to_pixel(a), to_pixel(b), color, interpolate);
        return;
    }
    let half = width as f64 / 2.0;
    let radius = half.round() as i32;
    if a.distance(b) >= 0.5 {
        let n = (b - a).normalized().perp() * half;
        let mut corners: Vec<imageproc::point::Point<i32>> = [a + n, b + n, b - n, a - n]
            .into_iter()
            .map(|p| {
                let (x, y) = to_pixel(p);
                imageproc::point::Point::new(x, y)
            })
            .collect();
        corners.dedup();
        while corners.len() > 1 && corners.first() == corners.last() {
            corners.pop();
        }
        if corners.len() >= 3 {
            draw_polygon_mut(image, &corners, color);
        } else {
            draw_antialiased_line_segment_mut(image, to_pixel(a), to_pixel(b), color, interpolate);
        }
    }
    draw_filled_circle_mut(image, to_pixel(a), radius, color);
    draw_filled_circle_mut(image, to_pixel(b), radius, color);
}
