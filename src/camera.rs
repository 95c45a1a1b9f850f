use glam::{Mat4, Vec3};

use crate::core::input::{Button, Controller};
use crate::math::AABB;

/// Orbit speed in radians per second
pub const ORBIT_SPEED: f32 = 1.5;
/// Fraction of the orbit distance covered per second when zooming
pub const ZOOM_SPEED: f32 = 1.0;
/// Radians of orbit per pixel of mouse drag
pub const DRAG_SENSITIVITY: f32 = 0.005;

const MIN_DISTANCE: f32 = 1e-3;
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct MovementState {
    pub orbit_up: bool,
    pub orbit_down: bool,
    pub orbit_left: bool,
    pub orbit_right: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub raise: bool,
    pub lower: bool,
}

impl MovementState {
    /// W/S pitch, A/D yaw, Q/E zoom, Space/Shift move the target
    pub fn from_controller(controller: &dyn Controller) -> Self {
        Self {
            orbit_up: controller.is_down(Button::KeyW),
            orbit_down: controller.is_down(Button::KeyS),
            orbit_left: controller.is_down(Button::KeyA),
            orbit_right: controller.is_down(Button::KeyD),
            zoom_in: controller.is_down(Button::KeyQ),
            zoom_out: controller.is_down(Button::KeyE),
            raise: controller.is_down(Button::Space),
            lower: controller.is_down(Button::Shift),
        }
    }

    const fn to_direction(positive: bool, negative: bool) -> f32 {
        match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }

    /// (yaw, pitch, zoom, raise) in [-1, 1]
    const fn velocity(&self) -> (f32, f32, f32, f32) {
        (
            Self::to_direction(self.orbit_right, self.orbit_left),
            Self::to_direction(self.orbit_up, self.orbit_down),
            Self::to_direction(self.zoom_in, self.zoom_out),
            Self::to_direction(self.raise, self.lower),
        )
    }

    pub fn is_idle(&self) -> bool {
        self.velocity() == (0.0, 0.0, 0.0, 0.0)
    }
}

/// Camera orbiting a target point, always looking at it with +Y up
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitCamera {
    /// Place the camera on +Z so the whole box fits a vertical field of view
    pub fn framing(bounds: &AABB, yfov: f32) -> Self {
        let distance = bounds.extent() / (2.0 * (yfov * 0.5).tan());
        Self {
            target: bounds.center(),
            distance: distance.max(MIN_DISTANCE) + bounds.extent() * 0.5,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Recover orbit parameters from a camera-to-world pose, orbiting around
    /// the point on the view axis closest to `pivot`
    pub fn from_pose(pose: &Mat4, pivot: Vec3) -> Self {
        let eye = pose.w_axis.truncate();
        let forward = pose.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        let distance = (pivot - eye).dot(forward).max(MIN_DISTANCE);
        let offset = -forward;

        Self {
            target: eye + forward * distance,
            distance,
            yaw: offset.x.atan2(offset.z),
            pitch: offset.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    /// Camera-to-world pose
    pub fn pose(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y).inverse()
    }

    /// Apply held keys over `delta` seconds, returns whether the camera moved
    pub fn update(&mut self, movement: &MovementState, delta: f32) -> bool {
        if movement.is_idle() {
            return false;
        }
        let (yaw, pitch, zoom, raise) = movement.velocity();

        self.yaw += yaw * ORBIT_SPEED * delta;
        self.pitch = (self.pitch + pitch * ORBIT_SPEED * delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.distance = (self.distance * (1.0 - zoom * ZOOM_SPEED * delta)).max(MIN_DISTANCE);
        self.target.y += raise * self.distance * delta;
        true
    }

    /// Orbit by a mouse drag measured in pixels
    pub fn drag(&mut self, dx: f32, dy: f32) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        self.yaw -= dx * DRAG_SENSITIVITY;
        self.pitch = (self.pitch + dy * DRAG_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Held(Vec<Button>);

    impl Controller for Held {
        fn is_down(&self, button: Button) -> bool {
            self.0.contains(&button)
        }
    }

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{:?} != {:?}", a, b);
    }

    #[test]
    fn framing_looks_at_center_from_positive_z() {
        let bounds = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let camera = OrbitCamera::framing(&bounds, std::f32::consts::FRAC_PI_3);
        let eye = camera.eye();
        assert!(eye.z > bounds.max.z);
        assert_vec_close(Vec3::new(eye.x, eye.y, 0.0), Vec3::ZERO);
    }

    #[test]
    fn pose_looks_down_negative_z_at_target() {
        let camera = OrbitCamera {
            target: Vec3::ZERO,
            distance: 4.0,
            yaw: 0.0,
            pitch: 0.0,
        };
        let pose = camera.pose();
        assert_vec_close(pose.w_axis.truncate(), Vec3::new(0.0, 0.0, 4.0));
        assert_vec_close(pose.transform_vector3(Vec3::NEG_Z), Vec3::NEG_Z);
    }

    #[test]
    fn from_pose_round_trips_orbit() {
        let camera = OrbitCamera {
            target: Vec3::new(0.5, 0.2, -0.3),
            distance: 3.0,
            yaw: 0.7,
            pitch: -0.4,
        };
        let recovered = OrbitCamera::from_pose(&camera.pose(), camera.target);
        assert_vec_close(recovered.eye(), camera.eye());
        assert_vec_close(recovered.target, camera.target);
        assert!((recovered.yaw - camera.yaw).abs() < 1e-4);
        assert!((recovered.pitch - camera.pitch).abs() < 1e-4);
    }

    #[test]
    fn movement_maps_buttons() {
        let movement = MovementState::from_controller(&Held(vec![Button::KeyW, Button::KeyE]));
        assert!(movement.orbit_up);
        assert!(movement.zoom_out);
        assert!(!movement.zoom_in);
        assert!(!movement.is_idle());
    }

    #[test]
    fn opposing_keys_cancel() {
        let movement =
            MovementState::from_controller(&Held(vec![Button::KeyA, Button::KeyD]));
        assert!(movement.is_idle());
    }

    #[test]
    fn idle_update_does_not_move() {
        let mut camera = OrbitCamera::framing(&AABB::new(Vec3::ZERO, Vec3::ONE), 1.0);
        let before = camera;
        assert!(!camera.update(&MovementState::default(), 0.5));
        assert_eq!(camera, before);
    }

    #[test]
    fn zoom_in_shrinks_distance() {
        let mut camera = OrbitCamera::framing(&AABB::new(Vec3::ZERO, Vec3::ONE), 1.0);
        let before = camera.distance;
        let movement = MovementState {
            zoom_in: true,
            ..Default::default()
        };
        assert!(camera.update(&movement, 0.1));
        assert!(camera.distance < before);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = OrbitCamera::framing(&AABB::new(Vec3::ZERO, Vec3::ONE), 1.0);
        camera.drag(0.0, 1.0e6);
        assert!(camera.pitch <= PITCH_LIMIT);
        assert!(camera.pose().is_finite());
    }
}
