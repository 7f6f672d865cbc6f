//! Perspective camera

use bevy_math::{Mat4, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Recompute the cached projection after changing fov, aspect or planes
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_tracks_aspect() {
        let mut camera = PerspectiveCamera::new(75.0, 800.0 / 600.0, 1.0, 1000.0);
        let before = camera.projection_matrix();

        camera.aspect = 1.0;
        assert_eq!(camera.projection_matrix(), before);
        camera.update_projection_matrix();
        assert_ne!(camera.projection_matrix(), before);

        // x scale is focal / aspect
        let focal = 1.0 / (75.0_f32.to_radians() / 2.0).tan();
        assert!((camera.projection_matrix().x_axis.x - focal).abs() < 1e-5);
    }

    #[test]
    fn test_view_projection_maps_target_to_center() {
        let mut camera = PerspectiveCamera::new(75.0, 4.0 / 3.0, 1.0, 1000.0);
        camera.position = Vec3::new(0.0, 10.0, 20.0);
        camera.look_at(Vec3::ZERO);

        let clip = camera.view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_zero_height_is_degenerate_not_panicking() {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 1.0, 1000.0);
        camera.aspect = f32::NAN;
        camera.update_projection_matrix();
        assert!(!camera.projection_matrix().is_finite());
    }
}
