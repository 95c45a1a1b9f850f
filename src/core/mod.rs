pub mod bvh;
pub mod input;
pub mod offscreen;
pub mod surface;
pub mod triangle_intersection;

pub use bvh::*;
pub use offscreen::OffscreenRenderer;
pub use surface::PixelSurface;
pub use triangle_intersection::*;
