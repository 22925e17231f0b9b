use glam::{Mat4, Vec3};

pub const DEFAULT_FOV_Y_DEGREES: f32 = 75.0;
pub const DEFAULT_NEAR: f32 = 0.001;
pub const DEFAULT_FAR: f32 = 5000.0;

/// Perspective camera with a cached projection matrix
///
/// Like most scene-graph cameras, changing `aspect` or the clip planes has no
/// effect until `update_projection_matrix` is called.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_y,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Camera with the scene defaults (75°, 0.001..5000)
    pub fn with_aspect(aspect: f32) -> Self {
        Self::new(DEFAULT_FOV_Y_DEGREES, aspect, DEFAULT_NEAR, DEFAULT_FAR)
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_is_stale_until_updated() {
        let mut camera = PerspectiveCamera::with_aspect(1.0);
        let before = camera.projection_matrix();

        camera.aspect = 2.0;
        assert_eq!(camera.projection_matrix(), before);

        camera.update_projection_matrix();
        assert_ne!(camera.projection_matrix(), before);
    }

    #[test]
    fn projection_encodes_aspect() {
        let camera = PerspectiveCamera::with_aspect(16.0 / 9.0);
        let p = camera.projection_matrix();

        // x scale = y scale / aspect
        let ratio = p.y_axis.y / p.x_axis.x;
        assert!((ratio - 16.0 / 9.0).abs() < 1e-5);
    }

    #[test]
    fn view_looks_at_target() {
        let mut camera = PerspectiveCamera::with_aspect(1.0);
        camera.position = Vec3::new(5.0, 0.0, 0.0);
        camera.look_at(Vec3::ZERO);

        // Target lands on the negative view axis
        let in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(in_view.x.abs() < 1e-5);
        assert!(in_view.y.abs() < 1e-5);
        assert!((in_view.z + 5.0).abs() < 1e-5);
    }
}
