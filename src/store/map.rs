//! World geometry: map bounds and wall collision resolution
//!
//! The server owns the map; the client only needs enough geometry to keep the
//! predicted player inside bounds and out of walls between snapshots.

use serde::{Deserialize, Serialize};

/// Outer boundary of the playable area
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapShape {
    /// Circular arena of the given radius
    Circle { radius: f32 },
    /// Axis-aligned square arena of the given half-extent
    Square { half: f32 },
}

/// A wall obstacle inside the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Wall {
    /// Axis-aligned rectangle (x,y is the top-left corner)
    Rect { x: f32, y: f32, w: f32, h: f32 },
    /// Arbitrary simple polygon
    Polygon { points: Vec<[f32; 2]> },
}

/// Client-side map geometry, replaced wholesale on welcome/match_start
#[derive(Debug, Clone)]
pub struct GameMap {
    pub shape: MapShape,
    pub center_x: f32,
    pub center_y: f32,
    pub walls: Vec<Wall>,
}

impl GameMap {
    pub fn new(shape: MapShape, center_x: f32, center_y: f32) -> Self {
        Self {
            shape,
            center_x,
            center_y,
            walls: Vec::new(),
        }
    }

    /// Swap in a new wall set (snapshots may carry incremental wall updates)
    pub fn set_walls(&mut self, walls: Vec<Wall>) {
        self.walls = walls;
    }

    /// Clamp a circle of the given radius to the map boundary.
    /// Returns the corrected position.
    pub fn clamp_to_bounds(&self, x: f32, y: f32, radius: f32) -> (f32, f32) {
        match self.shape {
            MapShape::Circle { radius: map_r } => {
                let max_dist = (map_r - radius).max(0.0);
                let dx = x - self.center_x;
                let dy = y - self.center_y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > max_dist && dist > f32::EPSILON {
                    let scale = max_dist / dist;
                    (self.center_x + dx * scale, self.center_y + dy * scale)
                } else {
                    (x, y)
                }
            }
            MapShape::Square { half } => {
                let extent = (half - radius).max(0.0);
                (
                    x.clamp(self.center_x - extent, self.center_x + extent),
                    y.clamp(self.center_y - extent, self.center_y + extent),
                )
            }
        }
    }

    /// Resolve overlap between a circle and every wall, pushing the circle out
    /// along the minimum-penetration normal. Returns the corrected position and
    /// the outward normal of the last wall touched (for velocity cancellation),
    /// or None if nothing overlapped.
    pub fn resolve_walls(&self, x: f32, y: f32, radius: f32) -> Option<((f32, f32), (f32, f32))> {
        let mut pos = (x, y);
        let mut hit_normal = None;
        for wall in &self.walls {
            if let Some((push, normal)) = wall.penetration(pos.0, pos.1, radius) {
                pos.0 += push.0;
                pos.1 += push.1;
                hit_normal = Some(normal);
            }
        }
        hit_normal.map(|n| (pos, n))
    }
}

impl Wall {
    /// Overlap test for a circle against this wall.
    /// Returns (push vector, unit outward normal) when the circle penetrates.
    pub fn penetration(&self, cx: f32, cy: f32, radius: f32) -> Option<((f32, f32), (f32, f32))> {
        match self {
            Wall::Rect { x, y, w, h } => rect_penetration(cx, cy, radius, *x, *y, *w, *h),
            Wall::Polygon { points } => polygon_penetration(cx, cy, radius, points),
        }
    }
}

fn rect_penetration(
    cx: f32,
    cy: f32,
    radius: f32,
    rx: f32,
    ry: f32,
    rw: f32,
    rh: f32,
) -> Option<((f32, f32), (f32, f32))> {
    let closest_x = cx.clamp(rx, rx + rw);
    let closest_y = cy.clamp(ry, ry + rh);
    let dx = cx - closest_x;
    let dy = cy - closest_y;
    let dist_sq = dx * dx + dy * dy;

    if dist_sq > radius * radius {
        return None;
    }

    if dist_sq > 1e-8 {
        // Center outside the rect: push away from the closest boundary point
        let dist = dist_sq.sqrt();
        let nx = dx / dist;
        let ny = dy / dist;
        let depth = radius - dist;
        Some(((nx * depth, ny * depth), (nx, ny)))
    } else {
        // Center inside the rect: push out along the axis of least penetration
        let left = cx - rx;
        let right = rx + rw - cx;
        let top = cy - ry;
        let bottom = ry + rh - cy;
        let min = left.min(right).min(top).min(bottom);
        let (nx, ny) = if min == left {
            (-1.0, 0.0)
        } else if min == right {
            (1.0, 0.0)
        } else if min == top {
            (0.0, -1.0)
        } else {
            (0.0, 1.0)
        };
        let depth = min + radius;
        Some(((nx * depth, ny * depth), (nx, ny)))
    }
}

fn polygon_penetration(
    cx: f32,
    cy: f32,
    radius: f32,
    points: &[[f32; 2]],
) -> Option<((f32, f32), (f32, f32))> {
    if points.len() < 3 {
        return None;
    }

    // Closest point on the polygon boundary
    let mut best_dist_sq = f32::MAX;
    let mut best = (0.0f32, 0.0f32);
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let (px, py) = closest_on_segment(cx, cy, a[0], a[1], b[0], b[1]);
        let dx = cx - px;
        let dy = cy - py;
        let d = dx * dx + dy * dy;
        if d < best_dist_sq {
            best_dist_sq = d;
            best = (px, py);
        }
    }

    let inside = point_in_polygon(cx, cy, points);
    let dist = best_dist_sq.sqrt();

    if inside {
        // Push through the nearest edge plus the full radius
        let (nx, ny) = if dist > 1e-4 {
            ((best.0 - cx) / dist, (best.1 - cy) / dist)
        } else {
            (1.0, 0.0)
        };
        let depth = dist + radius;
        Some(((nx * depth, ny * depth), (nx, ny)))
    } else if dist < radius {
        let (nx, ny) = if dist > 1e-4 {
            ((cx - best.0) / dist, (cy - best.1) / dist)
        } else {
            (1.0, 0.0)
        };
        let depth = radius - dist;
        Some(((nx * depth, ny * depth), (nx, ny)))
    } else {
        None
    }
}

fn closest_on_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> (f32, f32) {
    let abx = bx - ax;
    let aby = by - ay;
    let len_sq = abx * abx + aby * aby;
    if len_sq < 1e-10 {
        return (ax, ay);
    }
    let t = (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0);
    (ax + abx * t, ay + aby * t)
}

/// Ray-casting point-in-polygon test
fn point_in_polygon(px: f32, py: f32, points: &[[f32; 2]]) -> bool {
    let mut inside = false;
    let n = points.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i][0], points[i][1]);
        let (xj, yj) = (points[j][0], points[j][1]);
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_map_clamps_radially() {
        let map = GameMap::new(MapShape::Circle { radius: 100.0 }, 0.0, 0.0);
        let (x, y) = map.clamp_to_bounds(200.0, 0.0, 10.0);
        assert!((x - 90.0).abs() < 1e-3);
        assert_eq!(y, 0.0);

        // Inside stays put
        let (x, y) = map.clamp_to_bounds(30.0, 40.0, 10.0);
        assert_eq!((x, y), (30.0, 40.0));
    }

    #[test]
    fn square_map_clamps_per_axis() {
        let map = GameMap::new(MapShape::Square { half: 50.0 }, 0.0, 0.0);
        let (x, y) = map.clamp_to_bounds(80.0, -80.0, 5.0);
        assert_eq!((x, y), (45.0, -45.0));
    }

    #[test]
    fn rect_wall_pushes_circle_out() {
        let wall = Wall::Rect {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
        };
        // Circle overlapping the right edge
        let ((px, py), (nx, ny)) = wall.penetration(12.0, 5.0, 4.0).unwrap();
        assert!(nx > 0.99 && ny.abs() < 1e-4);
        assert!((px - 2.0).abs() < 1e-3);
        assert!(py.abs() < 1e-3);

        // Clear of the wall: no push
        assert!(wall.penetration(20.0, 5.0, 4.0).is_none());
    }

    #[test]
    fn rect_wall_ejects_contained_center() {
        let wall = Wall::Rect {
            x: 0.0,
            y: 0.0,
            w: 20.0,
            h: 20.0,
        };
        let ((px, _), (nx, _)) = wall.penetration(2.0, 10.0, 3.0).unwrap();
        // Nearest face is the left one
        assert_eq!(nx, -1.0);
        assert!((px - -5.0).abs() < 1e-3);
    }

    #[test]
    fn polygon_wall_pushes_circle_out() {
        let wall = Wall::Polygon {
            points: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
        };
        let ((px, py), _) = wall.penetration(5.0, -2.0, 4.0).unwrap();
        // Pushed straight down, clearing the bottom edge
        assert!(px.abs() < 1e-3);
        assert!((py - -2.0).abs() < 1e-3);

        let inside = wall.penetration(5.0, 5.0, 2.0);
        assert!(inside.is_some());
    }

    #[test]
    fn resolve_walls_leaves_no_overlap() {
        let mut map = GameMap::new(MapShape::Circle { radius: 500.0 }, 0.0, 0.0);
        map.set_walls(vec![
            Wall::Rect {
                x: 10.0,
                y: 10.0,
                w: 30.0,
                h: 30.0,
            },
            Wall::Polygon {
                points: vec![[-50.0, -50.0], [-20.0, -50.0], [-20.0, -20.0], [-50.0, -20.0]],
            },
        ]);

        let ((x, y), _) = map.resolve_walls(12.0, 12.0, 5.0).unwrap();
        for wall in &map.walls {
            assert!(
                wall.penetration(x, y, 5.0 - 1e-3).is_none(),
                "still overlapping after resolve at ({x}, {y})"
            );
        }
    }

    #[test]
    fn wall_wire_format_round_trips() {
        let json = r#"[{"x":1.0,"y":2.0,"w":3.0,"h":4.0},{"points":[[0.0,0.0],[1.0,0.0],[0.0,1.0]]}]"#;
        let walls: Vec<Wall> = serde_json::from_str(json).unwrap();
        assert!(matches!(walls[0], Wall::Rect { .. }));
        assert!(matches!(walls[1], Wall::Polygon { .. }));
    }
}
