use glam::Vec3;

use crate::core::BVHNode;
use crate::math::AABB;

/// Neutral grey used when an asset carries no material.
pub const DEFAULT_BASE_COLOR: [f32; 3] = [0.7, 0.7, 0.7];

/// Flat-colored surface material
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub base_color: [f32; 3],
}

impl Material {
    pub const fn new_color(base_color: [f32; 3]) -> Self {
        Self { base_color }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new_color(DEFAULT_BASE_COLOR)
    }
}

/// Triangle primitive with a material index into its mesh
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub material_id: u32,
}

impl Triangle {
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3, material_id: u32) -> Self {
        Self {
            v0,
            v1,
            v2,
            material_id,
        }
    }

    pub fn bounds(&self) -> AABB {
        AABB::new(self.v0, self.v0).grow(self.v1).grow(self.v2)
    }

    /// Zero-area triangles can never be hit and are dropped on load
    pub fn is_degenerate(&self) -> bool {
        (self.v1 - self.v0).cross(self.v2 - self.v0).length_squared() <= f32::EPSILON * f32::EPSILON
    }
}

/// Triangle soup with materials, in the asset's local space.
///
/// The BVH is built once here, in mesh space, and reused for every pose the
/// mesh is rendered at. The triangles are read-only so it never goes stale.
#[derive(Clone, Debug)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
    bvh: Option<BVHNode>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>, materials: Vec<Material>) -> Self {
        let bvh = BVHNode::build(&triangles);
        Self {
            triangles,
            materials,
            bvh,
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// `None` for an empty mesh
    pub fn bvh(&self) -> Option<&BVHNode> {
        self.bvh.as_ref()
    }

    /// Axis-aligned cube centered on the origin, 12 triangles, one material
    pub fn cube(size: f32, base_color: [f32; 3]) -> Self {
        let h = size * 0.5;
        let corners = [
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        const FACES: [[usize; 4]; 6] = [
            [4, 5, 6, 7], // +z
            [1, 0, 3, 2], // -z
            [5, 1, 2, 6], // +x
            [0, 4, 7, 3], // -x
            [7, 6, 2, 3], // +y
            [0, 1, 5, 4], // -y
        ];

        let triangles = FACES
            .iter()
            .flat_map(|&[a, b, c, d]| {
                [
                    Triangle::new(corners[a], corners[b], corners[c], 0),
                    Triangle::new(corners[a], corners[c], corners[d], 0),
                ]
            })
            .collect();

        Self::new(triangles, vec![Material::new_color(base_color)])
    }

    pub fn material(&self, id: u32) -> Material {
        self.materials
            .get(id as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(
            self.triangles
                .iter()
                .flat_map(|t| [t.v0, t.v1, t.v2]),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
