use egui::{Color32, Pos2, Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeShape {
    #[default]
    Box,
    Ellipse,
    Circle,
    Point,
    /// Label only, no outline.
    Plain,
}

impl NodeShape {
    pub fn from_dot(shape: &str) -> Self {
        match shape.to_ascii_lowercase().as_str() {
            "ellipse" | "oval" => Self::Ellipse,
            "circle" | "doublecircle" => Self::Circle,
            "point" => Self::Point,
            "plaintext" | "plain" | "none" => Self::Plain,
            _ => Self::Box,
        }
    }
}

/// Line style parsed from the DOT `style` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub filled: bool,
    pub dashed: bool,
    pub invisible: bool,
}

impl Style {
    pub fn from_dot(style: Option<&str>) -> Self {
        let mut s = Self::default();
        for part in style.unwrap_or_default().split(',') {
            match part.trim().to_ascii_lowercase().as_str() {
                "filled" => s.filled = true,
                "dashed" | "dotted" => s.dashed = true,
                "invis" | "invisible" => s.invisible = true,
                _ => {}
            }
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeGeometry {
    pub id: String,
    pub label: String,
    pub rect: Rect,
    pub shape: NodeShape,
    pub style: Style,
    pub fill: Option<Color32>,
    pub stroke: Option<Color32>,
}

impl NodeGeometry {
    /// Point on the node outline in the direction of `toward`.
    pub fn boundary_point(&self, toward: Pos2) -> Pos2 {
        let c = self.rect.center();
        let dir = toward - c;
        if dir.length_sq() <= f32::EPSILON {
            return c;
        }
        let half = self.rect.size() / 2.;
        let t = match self.shape {
            NodeShape::Ellipse | NodeShape::Circle | NodeShape::Point => {
                1. / ((dir.x / half.x).powi(2) + (dir.y / half.y).powi(2)).sqrt()
            }
            NodeShape::Box | NodeShape::Plain => {
                let tx = if dir.x == 0. { f32::INFINITY } else { half.x / dir.x.abs() };
                let ty = if dir.y == 0. { f32::INFINITY } else { half.y / dir.y.abs() };
                tx.min(ty)
            }
        };
        c + dir * t
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    /// Polyline in canvas coordinates; the arrow head sits at the last point.
    pub points: Vec<Pos2>,
    pub label: Option<String>,
    pub label_pos: Pos2,
    pub style: Style,
    pub color: Option<Color32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGeometry {
    pub label: Option<String>,
    pub rect: Rect,
    pub style: Style,
    pub fill: Option<Color32>,
    pub stroke: Option<Color32>,
    /// Nesting level, 0 for top level clusters.
    pub depth: usize,
}

/// Laid-out, renderable graph in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub directed: bool,
    pub nodes: Vec<NodeGeometry>,
    pub edges: Vec<EdgeGeometry>,
    /// Sorted so that outer clusters come before the clusters nested in them.
    pub clusters: Vec<ClusterGeometry>,
    bounds: Rect,
}

impl Geometry {
    pub fn new(
        directed: bool,
        nodes: Vec<NodeGeometry>,
        edges: Vec<EdgeGeometry>,
        clusters: Vec<ClusterGeometry>,
    ) -> Self {
        let mut bounds = Rect::NOTHING;
        for n in &nodes {
            bounds = bounds.union(n.rect);
        }
        for c in &clusters {
            bounds = bounds.union(c.rect);
        }
        for e in &edges {
            for p in &e.points {
                bounds.extend_with(*p);
            }
        }
        Self {
            directed,
            nodes,
            edges,
            clusters,
            bounds,
        }
    }

    /// Bounding rect of everything drawn. Not positive for an empty graph.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn size(&self) -> Vec2 {
        if self.bounds.is_positive() {
            self.bounds.size()
        } else {
            Vec2::ZERO
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeGeometry> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
