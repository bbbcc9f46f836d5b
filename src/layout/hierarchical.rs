use std::collections::{HashMap, HashSet};

use egui::{Color32, Pos2, Rect, Vec2};
use petgraph::{
    stable_graph::{NodeIndex, StableGraph},
    visit::EdgeRef,
    Direction::{Incoming, Outgoing},
};

use super::{
    color::parse_color,
    dot::{DotEdge, DotGraph, DotNode},
    geometry::{ClusterGeometry, EdgeGeometry, Geometry, NodeGeometry, NodeShape, Style},
};
use crate::settings::SettingsLayout;

/// DOT distances are in inches.
const POINTS_PER_INCH: f32 = 72.;
const POINT_SIZE: f32 = 6.;
const ELLIPSE_GROW: f32 = 1.3;
const SELF_LOOP: f32 = 16.;
const DEFAULT_FILL: Color32 = Color32::LIGHT_GRAY;

/// Orientation of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Levels grow downward. Rows are vertical steps.
    #[default]
    TopDown,
    /// Levels grow to the right. Rows are horizontal steps.
    LeftRight,
}

impl Orientation {
    pub fn from_rankdir(rankdir: Option<&str>) -> Self {
        match rankdir.map(str::to_ascii_uppercase).as_deref() {
            Some("LR" | "RL") => Self::LeftRight,
            _ => Self::TopDown,
        }
    }

    /// Splits a size into the extent along levels and the extent across siblings.
    fn split(self, v: Vec2) -> (f32, f32) {
        match self {
            Self::TopDown => (v.y, v.x),
            Self::LeftRight => (v.x, v.y),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    row: usize,
    col: f32,
}

/// Lays the graph out as a forest: roots in declaration order, every node one level
/// below the parent that reached it first, parents centered over the span of their children.
pub fn layout(dot: &DotGraph, settings: &SettingsLayout) -> Geometry {
    let orientation = Orientation::from_rankdir(dot.attrs.get("rankdir").map(String::as_str));
    let rank_sep = inches(dot.attrs.get("ranksep")).unwrap_or(settings.rank_sep);
    let node_sep = inches(dot.attrs.get("nodesep")).unwrap_or(settings.node_sep);

    let g = &dot.g;
    let slots = assign_slots(g);
    let sizes: HashMap<NodeIndex, Vec2> = g
        .node_indices()
        .map(|idx| (idx, node_size(&g[idx], settings)))
        .collect();

    let rows = slots.values().map(|s| s.row + 1).max().unwrap_or(0);
    let mut row_extent = vec![0f32; rows];
    let mut col_extent = 0f32;
    for (idx, slot) in &slots {
        let (along, across) = orientation.split(sizes[idx]);
        row_extent[slot.row] = row_extent[slot.row].max(along);
        col_extent = col_extent.max(across);
    }
    let mut row_offset = Vec::with_capacity(rows);
    let mut acc = 0.;
    for extent in &row_extent {
        row_offset.push(acc);
        acc += extent + rank_sep;
    }

    let mut nodes = Vec::with_capacity(g.node_count());
    let mut node_pos = HashMap::with_capacity(g.node_count());
    for idx in g.node_indices() {
        let slot = slots[&idx];
        let along = row_offset[slot.row] + row_extent[slot.row] / 2.;
        let across = slot.col * (col_extent + node_sep) + col_extent / 2.;
        let center = match orientation {
            Orientation::TopDown => Pos2::new(across, along),
            Orientation::LeftRight => Pos2::new(along, across),
        };
        node_pos.insert(idx, nodes.len());
        nodes.push(node_geometry(&g[idx], Rect::from_center_size(center, sizes[&idx])));
    }

    let edges = g
        .edge_indices()
        .filter_map(|e| {
            let (a, b) = g.edge_endpoints(e)?;
            Some(edge_geometry(
                &g[e],
                &nodes[node_pos[&a]],
                &nodes[node_pos[&b]],
            ))
        })
        .collect();

    let clusters = cluster_geometry(dot, &nodes, &node_pos, settings);

    Geometry::new(dot.directed, nodes, edges, clusters)
}

fn assign_slots(g: &StableGraph<DotNode, DotEdge>) -> HashMap<NodeIndex, Slot> {
    let mut visited = HashSet::new();
    let mut slots = HashMap::with_capacity(g.node_count());

    // Place forests starting from all roots (no incoming edges), packing them
    // left-to-right by advancing the next starting column by each subtree's width.
    let mut next_col = 0usize;
    let roots: Vec<NodeIndex> = g.externals(Incoming).collect();
    // Remaining components (cycles, self loops) start from declaration order.
    let rest: Vec<NodeIndex> = g.node_indices().collect();
    for root in roots.iter().chain(rest.iter()) {
        if visited.contains(root) {
            continue;
        }
        let max_col = build_tree(g, &mut visited, &mut slots, *root, next_col);
        next_col = max_col.saturating_add(1);
    }

    slots
}

/// Subtree being placed: children are walked first to find the span the parent is
/// centered over.
struct Frame {
    idx: NodeIndex,
    row: usize,
    start_col: usize,
    children: Vec<NodeIndex>,
    next: usize,
    had_child: bool,
    max_col: usize,
    child_col: usize,
}

impl Frame {
    fn new(g: &StableGraph<DotNode, DotEdge>, idx: NodeIndex, row: usize, start_col: usize) -> Self {
        Self {
            idx,
            row,
            start_col,
            children: children(g, idx),
            next: 0,
            had_child: false,
            max_col: start_col,
            child_col: start_col,
        }
    }
}

/// Places the tree reached from `root` and returns the last column it occupies.
///
/// Runs on an explicit stack, long chains must not exhaust the thread stack.
fn build_tree(
    g: &StableGraph<DotNode, DotEdge>,
    visited: &mut HashSet<NodeIndex>,
    slots: &mut HashMap<NodeIndex, Slot>,
    root: NodeIndex,
    start_col: usize,
) -> usize {
    visited.insert(root);
    let mut stack = vec![Frame::new(g, root, 0, start_col)];

    while let Some(top) = stack.last_mut() {
        let mut descend = None;
        while let Some(&child) = top.children.get(top.next) {
            top.next += 1;
            if visited.insert(child) {
                descend = Some((child, top.row + 1, top.child_col));
                break;
            }
        }
        if let Some((child, row, col)) = descend {
            stack.push(Frame::new(g, child, row, col));
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let col = if done.had_child {
            (done.start_col + done.max_col) as f32 / 2.
        } else {
            done.start_col as f32
        };
        slots.insert(done.idx, Slot { row: done.row, col });

        match stack.last_mut() {
            Some(parent) => {
                parent.had_child = true;
                parent.max_col = parent.max_col.max(done.max_col);
                parent.child_col = done.max_col.saturating_add(1);
            }
            None => return done.max_col,
        }
    }

    start_col
}

/// Successors in edge declaration order.
fn children(g: &StableGraph<DotNode, DotEdge>, idx: NodeIndex) -> Vec<NodeIndex> {
    let mut out: Vec<_> = g
        .edges_directed(idx, Outgoing)
        .map(|e| (e.id(), e.target()))
        .collect();
    out.sort_by_key(|(id, _)| *id);
    out.into_iter().map(|(_, target)| target).collect()
}

fn inches(value: Option<&String>) -> Option<f32> {
    value?
        .split_whitespace()
        .next()?
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.)
        .map(|v| v * POINTS_PER_INCH)
}

fn node_size(node: &DotNode, settings: &SettingsLayout) -> Vec2 {
    let shape = NodeShape::from_dot(node.attrs.get("shape").map_or("box", String::as_str));
    if shape == NodeShape::Point {
        return Vec2::splat(POINT_SIZE);
    }

    let label = node.label();
    let lines = label.lines().count().max(1);
    let longest = label.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut size = Vec2::new(
        longest as f32 * settings.char_width + 2. * settings.node_padding,
        lines as f32 * settings.line_height + 2. * settings.node_padding,
    );

    if let Some(w) = inches(node.attrs.get("width")) {
        size.x = size.x.max(w);
    }
    if let Some(h) = inches(node.attrs.get("height")) {
        size.y = size.y.max(h);
    }

    match shape {
        NodeShape::Circle => Vec2::splat(size.max_elem()),
        NodeShape::Ellipse => size * ELLIPSE_GROW,
        _ => size,
    }
}

fn node_geometry(node: &DotNode, rect: Rect) -> NodeGeometry {
    let style = Style::from_dot(node.attrs.get("style").map(String::as_str));
    let stroke = node.attrs.get("color").and_then(|c| parse_color(c));
    let fill = style.filled.then(|| {
        node.attrs
            .get("fillcolor")
            .and_then(|c| parse_color(c))
            .or(stroke)
            .unwrap_or(DEFAULT_FILL)
    });
    NodeGeometry {
        id: node.id.clone(),
        label: node.label(),
        rect,
        shape: NodeShape::from_dot(node.attrs.get("shape").map_or("box", String::as_str)),
        style,
        fill,
        stroke,
    }
}

fn edge_geometry(edge: &DotEdge, from: &NodeGeometry, to: &NodeGeometry) -> EdgeGeometry {
    let label = edge
        .attrs
        .get("label")
        .filter(|l| !l.trim().is_empty())
        .cloned();
    let style = Style::from_dot(edge.attrs.get("style").map(String::as_str));
    let color = edge.attrs.get("color").and_then(|c| parse_color(c));

    if from.id == to.id {
        let r = from.rect;
        let (x, y) = (r.right(), r.center().y);
        let points = vec![
            Pos2::new(x, y - SELF_LOOP / 4.),
            Pos2::new(x + SELF_LOOP, y - SELF_LOOP / 2.),
            Pos2::new(x + SELF_LOOP, y + SELF_LOOP / 2.),
            Pos2::new(x, y + SELF_LOOP / 4.),
        ];
        return EdgeGeometry {
            points,
            label,
            label_pos: Pos2::new(x + SELF_LOOP * 1.5, y),
            style,
            color,
        };
    }

    let start = from.boundary_point(to.rect.center());
    let end = to.boundary_point(from.rect.center());
    EdgeGeometry {
        points: vec![start, end],
        label,
        label_pos: start + (end - start) / 2.,
        style,
        color,
    }
}

fn cluster_geometry(
    dot: &DotGraph,
    nodes: &[NodeGeometry],
    node_pos: &HashMap<NodeIndex, usize>,
    settings: &SettingsLayout,
) -> Vec<ClusterGeometry> {
    let count = dot.subgraphs.len();
    let mut rects: Vec<Option<Rect>> = vec![None; count];

    // children always come after their parent, so walking backwards sees them first
    for i in (0..count).rev() {
        let sg = &dot.subgraphs[i];
        let mut rect = Rect::NOTHING;
        for m in &sg.members {
            if let Some(&pos) = node_pos.get(m) {
                rect = rect.union(nodes[pos].rect);
            }
        }
        for (j, child) in dot.subgraphs.iter().enumerate().skip(i + 1) {
            if child.parent == Some(i) {
                if let Some(r) = rects[j] {
                    rect = rect.union(r);
                }
            }
        }
        if !rect.is_positive() {
            continue;
        }
        if sg.is_cluster() {
            rect = rect.expand(settings.cluster_padding);
            let label_lines = cluster_label(sg.attrs.get("label")).map_or(0, |l| l.lines().count());
            rect.min.y -= label_lines as f32 * settings.line_height;
        }
        rects[i] = Some(rect);
    }

    let mut out = Vec::new();
    for (i, sg) in dot.subgraphs.iter().enumerate() {
        let Some(rect) = rects[i] else { continue };
        if !sg.is_cluster() {
            continue;
        }
        let style = Style::from_dot(sg.attrs.get("style").map(String::as_str));
        let stroke = sg
            .attrs
            .get("pencolor")
            .or_else(|| sg.attrs.get("color"))
            .and_then(|c| parse_color(c));
        let bg = sg.attrs.get("bgcolor").and_then(|c| parse_color(c));
        let fill = if style.filled {
            sg.attrs
                .get("fillcolor")
                .and_then(|c| parse_color(c))
                .or(bg)
                .or(stroke)
                .or(Some(DEFAULT_FILL))
        } else {
            bg
        };

        let mut depth = 0;
        let mut parent = sg.parent;
        while let Some(p) = parent {
            if dot.subgraphs[p].is_cluster() {
                depth += 1;
            }
            parent = dot.subgraphs[p].parent;
        }

        out.push(ClusterGeometry {
            label: cluster_label(sg.attrs.get("label")),
            rect,
            style,
            fill,
            stroke,
            depth,
        });
    }
    out
}

fn cluster_label(label: Option<&String>) -> Option<String> {
    label.filter(|l| !l.trim().is_empty()).cloned()
}
