//! 2D k-d tree over sample points
//!
//! Median-split construction, O(n log n). The density estimator only
//! needs fixed-radius queries, answered by visiting every point within
//! the radius without allocating.
//!
//! Bentley, J.L. (1975). Multidimensional binary search trees used for
//! associative searching. CACM, 18(9).

use super::SamplePoint;

#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<SamplePoint>,
}

#[derive(Debug)]
struct KdNode {
    point_idx: usize,
    /// 0 splits on x, 1 on y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    pub fn build(points: &[SamplePoint]) -> Self {
        let points = points.to_vec();
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(&points, &mut indices, 0, &mut nodes);
        }
        Self { nodes, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Call `visit(point, distance_sq)` for every point with
    /// distance `<= radius` from (qx, qy)
    pub fn for_each_within<F>(&self, qx: f64, qy: f64, radius: f64, mut visit: F)
    where
        F: FnMut(&SamplePoint, f64),
    {
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return;
        }
        self.visit_recursive(0, qx, qy, radius * radius, &mut visit);
    }

    /// Points within `radius` of (qx, qy), in no particular order
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<SamplePoint> {
        let mut found = Vec::new();
        self.for_each_within(qx, qy, radius, |p, _| found.push(*p));
        found
    }

    fn visit_recursive<F>(&self, node_idx: usize, qx: f64, qy: f64, radius_sq: f64, visit: &mut F)
    where
        F: FnMut(&SamplePoint, f64),
    {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dist_sq = p.dist_sq(qx, qy);
        if dist_sq <= radius_sq {
            visit(p, dist_sq);
        }

        // Signed offset of the query from the splitting plane
        let diff = if node.split_dim == 0 { qx - p.x } else { qy - p.y };
        let plane_in_range = diff * diff <= radius_sq;

        if let Some(left) = node.left {
            if diff < 0.0 || plane_in_range {
                self.visit_recursive(left, qx, qy, radius_sq, visit);
            }
        }
        if let Some(right) = node.right {
            if diff >= 0.0 || plane_in_range {
                self.visit_recursive(right, qx, qy, radius_sq, visit);
            }
        }
    }
}

fn build_recursive(points: &[SamplePoint], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> usize {
    let split_dim = (depth % 2) as u8;
    let key = |i: usize| if split_dim == 0 { points[i].x } else { points[i].y };

    let median = indices.len() / 2;
    indices.select_nth_unstable_by(median, |&a, &b| {
        key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
    });

    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (lower, upper) = indices.split_at_mut(median);
    if !lower.is_empty() {
        let left = build_recursive(points, lower, depth + 1, nodes);
        nodes[node_idx].left = Some(left);
    }
    let upper = &mut upper[1..];
    if !upper.is_empty() {
        let right = build_recursive(points, upper, depth + 1, nodes);
        nodes[node_idx].right = Some(right);
    }

    node_idx
}
