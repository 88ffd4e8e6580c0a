//! Deterministic placement of habitat modules in space.
//!
//! The root sits at the origin. Children fan out around their parent on the
//! x/z plane at a fixed radius, each parent stepping its own angular cursor by
//! a fixed amount per placed child. The cursor's starting angle is derived
//! from the parent's id, so the same graph always yields the same layout.

use super::{HabitatGraph, HabitatKind, HabitatModule};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Distance between a module and its parent.
pub const PLACEMENT_RADIUS: f32 = 4.0;

/// Angular step between consecutive children of one parent.
pub const ANGLE_STEP_DEGREES: f32 = 60.0;

/// A point in habitat space. `y` is height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn distance(&self, other: &Position) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn around(&self, degrees: f32, radius: f32) -> Position {
        let radians = degrees.to_radians();
        Position {
            x: self.x + radius * radians.cos(),
            y: self.y,
            z: self.z + radius * radians.sin(),
        }
    }
}

/// Where one module was placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: String,
    pub kind: HabitatKind,
    pub parent_id: Option<String>,
    pub position: Position,
}

/// Positions for every module reachable from the root, in placement order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    placements: Vec<Placement>,
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.index.get(id).map(|&i| self.placements[i].position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Placements in breadth-first order, root first.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Position)> {
        self.placements.iter().map(|p| (p.id.as_str(), p.position))
    }

    fn place(&mut self, module: &HabitatModule, position: Position) {
        self.index.insert(module.id.clone(), self.placements.len());
        self.placements.push(Placement {
            id: module.id.clone(),
            kind: module.kind,
            parent_id: module.parent_id.clone(),
            position,
        });
    }
}

/// Lay out `graph` starting from its root.
///
/// A graph without a root falls back to its first module. Modules that
/// cannot be reached from the starting module are left out.
pub fn layout(graph: &HabitatGraph) -> Layout {
    let mut layout = Layout::default();

    let start = match graph.root() {
        Some(root) => root,
        None => match graph.modules().first() {
            Some(first) => {
                warn!(module = %first.id, "habitat has no root, laying out from first module");
                first
            }
            None => return layout,
        },
    };

    layout.place(start, Position::ORIGIN);
    let mut queue = VecDeque::from([(start, Position::ORIGIN)]);

    while let Some((node, origin)) = queue.pop_front() {
        let mut angle = start_angle(&node.id);
        for child in graph.children_of(&node.id) {
            if layout.contains(&child.id) {
                continue;
            }
            let position = origin.around(angle, PLACEMENT_RADIUS);
            layout.place(child, position);
            queue.push_back((child, position));
            angle = (angle + ANGLE_STEP_DEGREES) % 360.0;
        }
    }

    layout
}

/// Starting cursor angle for a node's children, in degrees.
fn start_angle(id: &str) -> f32 {
    (fnv1a64(id.as_bytes()) % 360) as f32
}

// FNV-1a 64-bit; stable across platforms and runs, unlike `DefaultHasher`.
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut h = OFFSET;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(PRIME);
    }
    h
}
