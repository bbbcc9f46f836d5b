use std::f32::consts::TAU;

use egui::{
    epaint::{CircleShape, CornerRadius, RectShape, StrokeKind, TextShape},
    Color32, Context, FontId, Pos2, Rect, Shape, Stroke, Vec2, Visuals,
};

use crate::{
    layout::{ClusterGeometry, EdgeGeometry, Geometry, NodeGeometry, NodeShape},
    viewport::ViewportState,
};

const ELLIPSE_SEGMENTS: usize = 48;
const STROKE_WIDTH: f32 = 1.;
const TIP_SIZE: f32 = 8.;
const TIP_ANGLE: f32 = std::f32::consts::PI / 8.;
const DASH: f32 = 6.;
const GAP: f32 = 4.;
const CLUSTER_LABEL_INSET: f32 = 6.;

/// Labels smaller than this many pixels are not drawn.
const MIN_FONT_PX: f32 = 4.;

/// Everything needed to turn canvas geometry into screen shapes.
pub struct DrawContext<'a> {
    pub ctx: &'a Context,
    pub visuals: &'a Visuals,
    pub state: &'a ViewportState,
    /// Screen position of the surface's top left corner
    pub origin: Vec2,
    /// Label font size in canvas units
    pub font_size: f32,
}

impl DrawContext<'_> {
    fn pos(&self, p: Pos2) -> Pos2 {
        self.state.canvas_to_screen_pos(p) + self.origin
    }

    fn rect(&self, r: Rect) -> Rect {
        Rect::from_min_max(self.pos(r.min), self.pos(r.max))
    }

    fn size(&self, s: f32) -> f32 {
        self.state.canvas_to_screen_size(s)
    }

    fn stroke(&self, color: Option<Color32>) -> Stroke {
        Stroke::new(
            self.size(STROKE_WIDTH).clamp(0.5, 3.),
            color.unwrap_or(self.visuals.text_color()),
        )
    }

    fn label(&self, text: &str, canvas_size: f32, color: Color32) -> Option<std::sync::Arc<egui::Galley>> {
        let px = self.size(canvas_size);
        if text.is_empty() || px < MIN_FONT_PX {
            return None;
        }
        Some(self.ctx.fonts(|f| f.layout_no_wrap(text.to_string(), FontId::monospace(px), color)))
    }
}

/// Shapes of the whole graph, back to front: clusters, edges, nodes.
pub fn graph_shapes(dc: &DrawContext, g: &Geometry) -> Vec<Shape> {
    let mut res = Vec::with_capacity(g.clusters.len() * 2 + g.edges.len() * 2 + g.nodes.len() * 2);
    for c in &g.clusters {
        cluster_shapes(dc, c, &mut res);
    }
    for e in &g.edges {
        edge_shapes(dc, e, g.directed, &mut res);
    }
    for n in &g.nodes {
        node_shapes(dc, n, &mut res);
    }
    res
}

fn cluster_shapes(dc: &DrawContext, c: &ClusterGeometry, res: &mut Vec<Shape>) {
    if c.style.invisible {
        return;
    }
    let rect = dc.rect(c.rect);
    let fill = c.fill.unwrap_or(Color32::TRANSPARENT);
    let stroke = dc.stroke(c.stroke);

    if c.style.dashed {
        res.push(RectShape::filled(rect, CornerRadius::ZERO, fill).into());
        let outline = [
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
            rect.left_top(),
        ];
        res.extend(Shape::dashed_line(&outline, stroke, dc.size(DASH), dc.size(GAP)));
    } else {
        res.push(RectShape::new(rect, CornerRadius::ZERO, fill, stroke, StrokeKind::Inside).into());
    }

    if let Some(label) = &c.label {
        let color = text_color(dc.visuals, c.fill);
        if let Some(galley) = dc.label(label, dc.font_size, color) {
            let pos = rect.left_top() + Vec2::splat(dc.size(CLUSTER_LABEL_INSET) / 2.);
            res.push(TextShape::new(pos, galley, color).into());
        }
    }
}

fn edge_shapes(dc: &DrawContext, e: &EdgeGeometry, directed: bool, res: &mut Vec<Shape>) {
    if e.style.invisible || e.points.len() < 2 {
        return;
    }
    let stroke = dc.stroke(e.color);
    let mut points: Vec<Pos2> = e.points.iter().map(|p| dc.pos(*p)).collect();

    if directed {
        let end = points[points.len() - 1];
        let before = points[points.len() - 2];
        let tip_size = dc.size(TIP_SIZE);
        if let Some(tip) = arrow_tip(before, end, tip_size) {
            // line stops where the tip begins
            let last = points.len() - 1;
            points[last] = end - (end - before).normalized() * tip_size * TIP_ANGLE.cos();
            res.push(Shape::convex_polygon(tip.to_vec(), stroke.color, Stroke::NONE));
        }
    }

    if e.style.dashed {
        res.extend(Shape::dashed_line(&points, stroke, dc.size(DASH), dc.size(GAP)));
    } else {
        res.push(Shape::line(points, stroke));
    }

    if let Some(label) = &e.label {
        let color = dc.visuals.text_color();
        if let Some(galley) = dc.label(label, dc.font_size * 0.85, color) {
            let pos = dc.pos(e.label_pos) + Vec2::new(dc.size(2.), -galley.size().y / 2.);
            res.push(TextShape::new(pos, galley, color).into());
        }
    }
}

fn node_shapes(dc: &DrawContext, n: &NodeGeometry, res: &mut Vec<Shape>) {
    if n.style.invisible {
        return;
    }
    let rect = dc.rect(n.rect);
    let fill = n.fill.unwrap_or(Color32::TRANSPARENT);
    let stroke = dc.stroke(n.stroke);

    match n.shape {
        NodeShape::Box => {
            res.push(RectShape::new(rect, CornerRadius::ZERO, fill, stroke, StrokeKind::Inside).into());
        }
        NodeShape::Ellipse => {
            res.push(Shape::convex_polygon(ellipse_points(rect, ELLIPSE_SEGMENTS), fill, stroke));
        }
        NodeShape::Circle => {
            res.push(
                CircleShape {
                    center: rect.center(),
                    radius: rect.width().min(rect.height()) / 2.,
                    fill,
                    stroke,
                }
                .into(),
            );
        }
        NodeShape::Point => {
            res.push(CircleShape::filled(rect.center(), rect.width() / 2., stroke.color).into());
            return;
        }
        NodeShape::Plain => {}
    }

    let color = text_color(dc.visuals, n.fill);
    if let Some(galley) = dc.label(&n.label, dc.font_size, color) {
        let pos = rect.center() - galley.size() / 2.;
        res.push(TextShape::new(pos, galley, color).into());
    }
}

/// Tip triangle pointing at `end`, or `None` for a degenerate segment.
fn arrow_tip(start: Pos2, end: Pos2, size: f32) -> Option<[Pos2; 3]> {
    let dir = end - start;
    if dir.length_sq() <= f32::EPSILON || size <= 0. {
        return None;
    }
    let dir = dir.normalized();
    Some([
        end,
        end - rotate_vector(dir, TIP_ANGLE) * size,
        end - rotate_vector(dir, -TIP_ANGLE) * size,
    ])
}

fn rotate_vector(vec: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos * vec.x - sin * vec.y, sin * vec.x + cos * vec.y)
}

fn ellipse_points(rect: Rect, segments: usize) -> Vec<Pos2> {
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2., rect.height() / 2.);
    (0..segments)
        .map(|i| {
            let a = TAU * i as f32 / segments as f32;
            Pos2::new(c.x + rx * a.cos(), c.y + ry * a.sin())
        })
        .collect()
}

/// Dark text on light fills, the theme's text color otherwise.
fn text_color(visuals: &Visuals, fill: Option<Color32>) -> Color32 {
    match fill {
        Some(f) if f.a() > 0 => {
            let luma = 0.299 * f32::from(f.r()) + 0.587 * f32::from(f.g()) + 0.114 * f32::from(f.b());
            if luma > 140. {
                Color32::BLACK
            } else {
                Color32::WHITE
            }
        }
        _ => visuals.text_color(),
    }
}
