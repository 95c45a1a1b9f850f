use glam::Vec3;

/// Slab test. Returns the entry distance, or the exit distance when the origin
/// is inside the box, `None` on a miss.
pub fn intersect_aabb(ray_origin: Vec3, inv_dir: Vec3, box_min: Vec3, box_max: Vec3) -> Option<f32> {
    let t_min = (box_min - ray_origin) * inv_dir;
    let t_max = (box_max - ray_origin) * inv_dir;

    let t1 = t_min.min(t_max);
    let t2 = t_min.max(t_max);

    let t_near = t1.x.max(t1.y).max(t1.z);
    let t_far = t2.x.min(t2.y).min(t2.z);

    if t_near > t_far || t_far < 0.0 {
        return None;
    }

    Some(t_near.max(0.0))
}

/// Component-wise reciprocal with near-zero components clamped to a large value
pub fn safe_inverse(dir: Vec3) -> Vec3 {
    const EPSILON: f32 = 1e-8;
    let inv = |d: f32| {
        if d.abs() < EPSILON {
            1.0 / EPSILON.copysign(d)
        } else {
            1.0 / d
        }
    };
    Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z))
}
