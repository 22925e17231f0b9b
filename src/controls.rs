//! Orbit camera controls
//!
//! Rotates the camera around a target on a sphere, with inertial damping,
//! auto-rotation and a clamped zoom distance. Input arrives as [`Gesture`]s
//! produced by the window input adapter. Panning is not supported: the
//! target stays where it was placed, and the secondary button does nothing.

use glam::Vec3;
use std::f32::consts::PI;

use crate::camera::PerspectiveCamera;

/// Keeps the polar angle away from the poles
const POLAR_EPSILON: f32 = 1e-4;

/// What a touch count does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Rotate,
    /// Pinch to dolly; the pan half of the gesture is dropped
    DollyPan,
}

/// One- and two-finger touch bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchMapping {
    pub one: TouchAction,
    pub two: TouchAction,
}

impl Default for TouchMapping {
    fn default() -> Self {
        Self {
            one: TouchAction::Rotate,
            two: TouchAction::DollyPan,
        }
    }
}

/// Mouse button as seen by the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Device-independent input for the controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    MouseDown(PointerButton),
    /// Active finger count changed
    TouchCount(usize),
    /// Pointer (or single-finger) movement in pixels
    Move { dx: f32, dy: f32 },
    /// Two-finger movement: spread ratio and centroid delta in pixels
    Pinch { ratio: f32, dx: f32, dy: f32 },
    /// Wheel movement in lines, positive away from the user
    Wheel { lines: f32 },
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    None,
    Rotate,
    Dolly,
    TouchRotate,
    TouchDolly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y
    phi: f32,
    /// Azimuth around +Y, measured from +Z towards +X
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Orbit controls with damping and auto-rotate
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,

    pub enable_damping: bool,
    /// Fraction of the pending rotation applied per update
    pub damping_factor: f32,
    pub auto_rotate: bool,
    /// 2.0 is one turn every 30 seconds at 60 updates per second
    pub auto_rotate_speed: f32,

    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,

    pub min_distance: f32,
    pub max_distance: f32,

    pub touches: TouchMapping,

    interaction: Interaction,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            enable_rotate: true,
            enable_zoom: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            touches: TouchMapping::default(),
            interaction: Interaction::None,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    pub fn is_interacting(&self) -> bool {
        self.interaction != Interaction::None
    }

    /// Angle added by auto-rotate on every update
    pub fn auto_rotation_angle(&self) -> f32 {
        2.0 * PI / 60.0 / 60.0 * self.auto_rotate_speed
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Move towards the target by `factor` (< 1 gets closer)
    pub fn dolly_in(&mut self, factor: f32) {
        self.scale *= factor.max(f32::MIN_POSITIVE);
    }

    /// Move away from the target by `factor` (< 1 gets further)
    pub fn dolly_out(&mut self, factor: f32) {
        self.scale /= factor.max(f32::MIN_POSITIVE);
    }

    /// Place the camera at `distance` from the target, clamped to the zoom range
    pub fn set_distance(&mut self, camera: &mut PerspectiveCamera, distance: f32) {
        let direction = (camera.position - self.target)
            .try_normalize()
            .unwrap_or(Vec3::Z);
        let distance = self.clamp_distance(distance, camera.position.distance(self.target));
        camera.position = self.target + direction * distance;
    }

    pub fn distance(&self, camera: &PerspectiveCamera) -> f32 {
        camera.position.distance(self.target)
    }

    fn clamp_distance(&self, distance: f32, fallback: f32) -> f32 {
        let distance = if distance.is_nan() { fallback } else { distance };
        distance.clamp(self.min_distance, self.max_distance)
    }

    /// Feed one gesture. `viewport_height` is the logical height in pixels.
    pub fn handle(&mut self, gesture: Gesture, viewport_height: f32) {
        let height = viewport_height.max(1.0);

        match gesture {
            Gesture::MouseDown(button) => {
                self.interaction = match button {
                    PointerButton::Primary if self.enable_rotate => Interaction::Rotate,
                    PointerButton::Middle if self.enable_zoom => Interaction::Dolly,
                    _ => Interaction::None,
                };
            }
            Gesture::TouchCount(count) => {
                let action = match count {
                    1 => Some(self.touches.one),
                    2 => Some(self.touches.two),
                    _ => None,
                };
                self.interaction = match action {
                    Some(TouchAction::Rotate) if self.enable_rotate => Interaction::TouchRotate,
                    Some(TouchAction::DollyPan) if self.enable_zoom => Interaction::TouchDolly,
                    _ => Interaction::None,
                };
            }
            Gesture::Move { dx, dy } => match self.interaction {
                Interaction::Rotate | Interaction::TouchRotate => self.rotate_by(dx, dy, height),
                Interaction::Dolly => {
                    let factor = self.zoom_scale(1.0);
                    if dy > 0.0 {
                        self.dolly_out(factor);
                    } else if dy < 0.0 {
                        self.dolly_in(factor);
                    }
                }
                _ => {}
            },
            Gesture::Pinch { ratio, .. } => {
                if self.interaction == Interaction::TouchDolly {
                    self.dolly_out(ratio.powf(self.zoom_speed));
                }
            }
            Gesture::Wheel { lines } => {
                if !self.enable_zoom || self.is_interacting() || lines == 0.0 {
                    return;
                }
                let factor = self.zoom_scale(lines.abs());
                if lines > 0.0 {
                    self.dolly_in(factor);
                } else {
                    self.dolly_out(factor);
                }
            }
            Gesture::Release => self.interaction = Interaction::None,
        }
    }

    fn zoom_scale(&self, steps: f32) -> f32 {
        0.95f32.powf(self.zoom_speed * steps)
    }

    fn rotate_by(&mut self, dx: f32, dy: f32, height: f32) {
        self.rotate_left(2.0 * PI * dx / height * self.rotate_speed);
        self.rotate_up(2.0 * PI * dy / height * self.rotate_speed);
    }

    /// Advance one step and move the camera. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let previous = camera.position;
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.auto_rotate && self.interaction == Interaction::None {
            self.rotate_left(self.auto_rotation_angle());
        }

        if self.enable_damping {
            spherical.theta += self.delta_theta * self.damping_factor;
            spherical.phi += self.delta_phi * self.damping_factor;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }

        spherical.phi = spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = self.clamp_distance(spherical.radius * self.scale, spherical.radius);

        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        camera.position.distance_squared(previous) > f32::EPSILON
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}
