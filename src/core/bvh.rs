use crate::math::{intersect_aabb, safe_inverse, AABB};
use glam::Vec3;

/// Nodes with this many primitives or fewer become leaves
const MAX_LEAF_SIZE: usize = 4;

/// Bounding volume hierarchy over primitive indices
#[derive(Clone, Debug)]
pub enum BVHNode {
    Leaf {
        bounds: AABB,
        primitive_indices: Vec<u32>,
    },
    Internal {
        bounds: AABB,
        left: Box<BVHNode>,
        right: Box<BVHNode>,
    },
}

/// Anything with a bounding box can be indexed by a BVH
pub trait BVHPrimitive {
    fn bounds(&self) -> AABB;
    fn centroid(&self) -> Vec3 {
        self.bounds().center()
    }
}

/// A primitive's index with its bounds and centroid, cached for the build
#[derive(Clone, Copy)]
struct BuildEntry {
    index: u32,
    bounds: AABB,
    centroid: Vec3,
}

fn enclose(entries: &[BuildEntry]) -> AABB {
    entries[1..]
        .iter()
        .fold(entries[0].bounds, |acc, e| acc.union(&e.bounds))
}

impl BVHNode {
    /// `None` when there is nothing to bound
    pub fn build<P: BVHPrimitive>(primitives: &[P]) -> Option<Self> {
        if primitives.is_empty() {
            return None;
        }
        let mut entries: Vec<BuildEntry> = primitives
            .iter()
            .enumerate()
            .map(|(i, p)| BuildEntry {
                index: i as u32,
                bounds: p.bounds(),
                centroid: p.centroid(),
            })
            .collect();
        Some(Self::subdivide(&mut entries))
    }

    /// Order the entries along the axis their centroids spread widest on, then
    /// cut where the surface area heuristic is cheapest.
    fn subdivide(entries: &mut [BuildEntry]) -> Self {
        let bounds = enclose(entries);
        let leaf = |entries: &[BuildEntry]| BVHNode::Leaf {
            bounds,
            primitive_indices: entries.iter().map(|e| e.index).collect(),
        };
        if entries.len() <= MAX_LEAF_SIZE {
            return leaf(entries);
        }

        let spread = entries[1..]
            .iter()
            .fold(AABB::new(entries[0].centroid, entries[0].centroid), |acc, e| {
                acc.grow(e.centroid)
            });
        let size = spread.max - spread.min;
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        // Coincident centroids cannot be separated
        if size[axis] <= f32::EPSILON {
            return leaf(entries);
        }

        entries.sort_unstable_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
        let cut = cheapest_cut(entries);
        let (left, right) = entries.split_at_mut(cut);

        BVHNode::Internal {
            bounds,
            left: Box::new(Self::subdivide(left)),
            right: Box::new(Self::subdivide(right)),
        }
    }

    pub fn bounds(&self) -> &AABB {
        match self {
            BVHNode::Leaf { bounds, .. } | BVHNode::Internal { bounds, .. } => bounds,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            BVHNode::Leaf { .. } => 1,
            BVHNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Nearest primitive hit along a ray.
    ///
    /// `test` is called with the index of every primitive in a leaf the ray
    /// reaches and returns the hit distance plus any payload. Subtrees whose
    /// bounds start beyond the current nearest hit are skipped.
    pub fn closest_hit<H>(
        &self,
        origin: Vec3,
        direction: Vec3,
        mut test: impl FnMut(u32) -> Option<(f32, H)>,
    ) -> Option<(f32, H)> {
        let inv_dir = safe_inverse(direction);
        let mut best: Option<(f32, H)> = None;
        let mut stack: Vec<&BVHNode> = vec![self];

        while let Some(node) = stack.pop() {
            let limit = best.as_ref().map_or(f32::INFINITY, |(t, _)| *t);
            let bounds = node.bounds();
            match intersect_aabb(origin, inv_dir, bounds.min, bounds.max) {
                Some(t) if t <= limit => {}
                _ => continue,
            }

            match node {
                BVHNode::Leaf {
                    primitive_indices, ..
                } => {
                    for &idx in primitive_indices {
                        if let Some((t, payload)) = test(idx) {
                            if best.as_ref().map_or(true, |(best_t, _)| t < *best_t) {
                                best = Some((t, payload));
                            }
                        }
                    }
                }
                BVHNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        best
    }
}

/// Split point in `1..len` minimising `area(left) * |left| + area(right) * |right|`
fn cheapest_cut(sorted: &[BuildEntry]) -> usize {
    let n = sorted.len();
    let mut right_area = vec![0.0; n];
    let mut right = sorted[n - 1].bounds;
    for i in (1..n).rev() {
        right = right.union(&sorted[i].bounds);
        right_area[i] = right.surface_area();
    }

    let mut best = (f32::INFINITY, n / 2);
    let mut left = sorted[0].bounds;
    for cut in 1..n {
        left = left.union(&sorted[cut - 1].bounds);
        let cost = left.surface_area() * cut as f32 + right_area[cut] * (n - cut) as f32;
        if cost < best.0 {
            best = (cost, cut);
        }
    }
    best.1
}
