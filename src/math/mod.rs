mod aabb;
mod color;
mod ray;

pub use aabb::AABB;
pub use color::{hsv_to_rgb, rgb_to_hsv};
pub use ray::{intersect_aabb, safe_inverse};
