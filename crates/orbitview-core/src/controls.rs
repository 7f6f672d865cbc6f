//! Orbit camera controls
//!
//! The camera orbits a target point on a sphere. Pointer input is turned
//! into pending rotate, pan and dolly deltas; [`Controls::update`] folds
//! them into the camera once per frame. With damping enabled only a
//! fraction of each pending delta is applied per update and the rest decays,
//! which gives the camera inertia after a drag ends.

use bevy_math::Vec3;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};
use std::rc::Rc;

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;

const EPS: f32 = 1e-6;

/// Capabilities the viewport needs from a camera controller
pub trait Controls {
    /// Apply pending input to the camera. Returns true if the camera moved.
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool;

    fn enable_damping(&self) -> bool;

    fn set_enable_damping(&mut self, enabled: bool);

    fn damping_factor(&self) -> f32;

    fn set_damping_factor(&mut self, factor: f32);

    fn enable_zoom(&self) -> bool;

    fn set_enable_zoom(&mut self, enabled: bool);

    fn enable_pan(&self) -> bool;

    fn set_enable_pan(&mut self, enabled: bool);

    /// Stop listening for input
    fn dispose(&mut self) {}
}

/// A pointer gesture, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    Rotate { dx: f32, dy: f32, viewport_height: f32 },
    Pan { dx: f32, dy: f32, viewport_height: f32 },
    /// Vertical drag that moves the camera toward or away from the target
    Dolly { dy: f32 },
    Wheel { delta_y: f32 },
}

/// Input shared between event listeners and the controls
#[derive(Debug, Clone, Default)]
pub struct InputQueue(Rc<RefCell<VecDeque<ControlInput>>>);

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, input: ControlInput) {
        self.0.borrow_mut().push_back(input);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    fn drain(&self) -> Vec<ControlInput> {
        self.0.borrow_mut().drain(..).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    enable_damping: bool,
    damping_factor: f32,
    enable_zoom: bool,
    enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: SphericalDelta,
    pan_offset: Vec3,
    scale: f32,
    input: InputQueue,
}

impl OrbitControls {
    /// Orbit around the camera's current target
    pub fn new(camera: &PerspectiveCamera, config: &ControlsConfig) -> Self {
        Self {
            target: camera.target,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            enable_zoom: config.enable_zoom,
            enable_pan: config.enable_pan,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            spherical_delta: SphericalDelta::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            input: InputQueue::new(),
        }
    }

    /// Read gestures from a queue fed by the host
    pub fn with_input(mut self, input: InputQueue) -> Self {
        self.input = input;
        self
    }

    pub fn input(&self) -> &InputQueue {
        &self.input
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    pub fn dolly_in(&mut self, scale: f32) {
        if self.enable_zoom {
            self.scale *= scale;
        }
    }

    pub fn dolly_out(&mut self, scale: f32) {
        if self.enable_zoom {
            self.scale /= scale;
        }
    }

    /// Move the target in the camera's screen plane by a pixel delta
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32, camera: &PerspectiveCamera) {
        if !self.enable_pan || viewport_height <= 0.0 {
            return;
        }
        let offset = camera.position - self.target;
        // Half the visible height at the target's depth
        let target_distance = offset.length() * (camera.fov.to_radians() / 2.0).tan();

        let forward = (camera.target - camera.position).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);

        let scale = 2.0 * target_distance / viewport_height * self.pan_speed;
        self.pan_offset -= right * dx * scale;
        self.pan_offset += up * dy * scale;
    }

    fn zoom_scale(&self) -> f32 {
        0.95_f32.powf(self.zoom_speed)
    }

    pub fn apply(&mut self, input: ControlInput, camera: &PerspectiveCamera) {
        match input {
            ControlInput::Rotate {
                dx,
                dy,
                viewport_height,
            } => {
                if viewport_height <= 0.0 {
                    return;
                }
                self.rotate_left(TAU * dx / viewport_height * self.rotate_speed);
                self.rotate_up(TAU * dy / viewport_height * self.rotate_speed);
            }
            ControlInput::Pan {
                dx,
                dy,
                viewport_height,
            } => self.pan(dx, dy, viewport_height, camera),
            ControlInput::Dolly { dy } | ControlInput::Wheel { delta_y: dy } => {
                let scale = self.zoom_scale();
                if dy > 0.0 {
                    self.dolly_out(scale);
                } else if dy < 0.0 {
                    self.dolly_in(scale);
                }
            }
        }
    }
}

impl Controls for OrbitControls {
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        for input in self.input.drain() {
            self.apply(input, camera);
        }

        let offset = camera.position - self.target;
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.spherical_delta.theta * step;
        phi += self.spherical_delta.phi * step;
        phi = phi.clamp(EPS, PI - EPS);

        // Not f32::clamp: config may hold an inverted or NaN range
        radius = (radius * self.scale)
            .min(self.max_distance)
            .max(self.min_distance);
        self.target += self.pan_offset * step;

        let offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        let previous_position = camera.position;
        let previous_target = camera.target;
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = SphericalDelta::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        previous_position.distance_squared(camera.position) > EPS
            || previous_target.distance_squared(camera.target) > EPS
    }

    fn enable_damping(&self) -> bool {
        self.enable_damping
    }

    fn set_enable_damping(&mut self, enabled: bool) {
        self.enable_damping = enabled;
    }

    fn damping_factor(&self) -> f32 {
        self.damping_factor
    }

    fn set_damping_factor(&mut self, factor: f32) {
        self.damping_factor = factor;
    }

    fn enable_zoom(&self) -> bool {
        self.enable_zoom
    }

    fn set_enable_zoom(&mut self, enabled: bool) {
        self.enable_zoom = enabled;
    }

    fn enable_pan(&self) -> bool {
        self.enable_pan
    }

    fn set_enable_pan(&mut self, enabled: bool) {
        self.enable_pan = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 1.0, 1000.0);
        camera.position = Vec3::new(0.0, 10.0, 20.0);
        camera.look_at(Vec3::ZERO);
        camera
    }

    fn undamped() -> ControlsConfig {
        ControlsConfig {
            enable_damping: false,
            ..ControlsConfig::default()
        }
    }

    #[test]
    fn test_idle_update_keeps_camera() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &ControlsConfig::default());
        assert!(!controls.update(&mut camera));
        assert!(camera.position.distance(Vec3::new(0.0, 10.0, 20.0)) < 1e-3);
    }

    #[test]
    fn test_rotation_preserves_distance() {
        let mut camera = camera();
        let radius = camera.position.length();
        let mut controls = OrbitControls::new(&camera, &undamped());

        controls.rotate_left(PI / 2.0);
        assert!(controls.update(&mut camera));
        assert!((camera.position.length() - radius).abs() < 1e-3);
        // Quarter turn to the left lands on -X
        assert!(camera.position.x < -19.0);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn test_damping_spreads_rotation_over_frames() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &ControlsConfig::default());
        controls.rotate_left(1.0);

        let start = camera.position;
        controls.update(&mut camera);
        let first_step = start.distance(camera.position);
        let after_first = camera.position;
        controls.update(&mut camera);
        let second_step = after_first.distance(camera.position);

        assert!(first_step > 0.0);
        assert!(second_step > 0.0);
        assert!(second_step < first_step);
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &undamped());
        controls.rotate_up(10.0);
        controls.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!(camera.position.y > 0.0);
    }

    #[test]
    fn test_wheel_zooms_and_respects_toggle() {
        let mut camera = camera();
        let radius = camera.position.length();
        let mut controls = OrbitControls::new(&camera, &undamped());

        controls.apply(ControlInput::Wheel { delta_y: -100.0 }, &camera);
        controls.update(&mut camera);
        let zoomed = camera.position.length();
        assert!((zoomed - radius * 0.95).abs() < 1e-3);

        controls.set_enable_zoom(false);
        controls.apply(ControlInput::Wheel { delta_y: -100.0 }, &camera);
        controls.update(&mut camera);
        assert!((camera.position.length() - zoomed).abs() < 1e-3);
    }

    #[test]
    fn test_pan_moves_target_and_respects_toggle() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &undamped());

        controls.pan(100.0, 0.0, 600.0, &camera);
        controls.update(&mut camera);
        // Dragging right moves the target left
        assert!(controls.target.x < 0.0);
        assert_eq!(camera.target, controls.target);

        let target = controls.target;
        controls.set_enable_pan(false);
        controls.pan(100.0, 0.0, 600.0, &camera);
        controls.update(&mut camera);
        assert_eq!(controls.target, target);
    }

    #[test]
    fn test_distance_limits() {
        let mut camera = camera();
        let config = ControlsConfig {
            enable_damping: false,
            min_distance: 5.0,
            max_distance: 30.0,
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&camera, &config);

        controls.dolly_out(0.01);
        controls.update(&mut camera);
        assert!((camera.position.length() - 30.0).abs() < 1e-3);

        controls.dolly_in(0.01);
        controls.update(&mut camera);
        assert!((camera.position.length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_inverted_distance_range_settles_on_minimum() {
        let mut camera = camera();
        let config = crate::config::ViewportConfig::from_toml_str(
            "[controls]\nenable_damping = false\nmin_distance = 50.0\nmax_distance = 10.0",
        )
        .unwrap();
        let mut controls = OrbitControls::new(&camera, &config.controls);

        assert!(controls.update(&mut camera));
        assert!((camera.position.length() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_nan_distance_bound_is_ignored() {
        let mut camera = camera();
        let radius = camera.position.length();
        let config =
            crate::config::ViewportConfig::from_toml_str("[controls]\nmax_distance = nan").unwrap();
        assert!(config.controls.max_distance.is_nan());
        let mut controls = OrbitControls::new(&camera, &config.controls);

        controls.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!((camera.position.length() - radius).abs() < 1e-3);
    }

    #[test]
    fn test_queued_input_is_drained_on_update() {
        let mut camera = camera();
        let queue = InputQueue::new();
        let mut controls = OrbitControls::new(&camera, &undamped()).with_input(queue.clone());

        queue.push(ControlInput::Rotate {
            dx: 150.0,
            dy: 0.0,
            viewport_height: 600.0,
        });
        assert_eq!(queue.len(), 1);
        assert!(controls.update(&mut camera));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capability_setters() {
        let camera = camera();
        let mut controls: Box<dyn Controls> =
            Box::new(OrbitControls::new(&camera, &ControlsConfig::default()));
        assert!(controls.enable_damping());
        assert_eq!(controls.damping_factor(), 0.05);
        controls.set_enable_damping(false);
        controls.set_damping_factor(0.2);
        assert!(!controls.enable_damping());
        assert_eq!(controls.damping_factor(), 0.2);
    }
}
