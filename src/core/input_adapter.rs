use std::collections::BTreeMap;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

use crate::controls::{Gesture, PointerButton};

/// Pixels per wheel "line" for touchpads that report pixel deltas
const PIXELS_PER_LINE: f32 = 100.0;

/// Adapter that turns Winit pointer and touch events into orbit gestures
///
/// All positions are physical pixels; callers pass the physical viewport
/// height to the controls so the ratio stays consistent.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    /// Mouse button currently held (only the first one counts)
    held: Option<MouseButton>,
    cursor: Option<(f32, f32)>,
    /// Active touches by id, ordered so the first two are stable
    touches: BTreeMap<u64, (f32, f32)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a Winit WindowEvent and return the gestures it produced
    pub fn process_event(&mut self, event: &WindowEvent) -> Vec<Gesture> {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_input(*button, *state == ElementState::Pressed)
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as f32, position.y as f32)
            }
            WindowEvent::CursorLeft { .. } => self.mouse_input_release_all(),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.wheel(lines)
            }
            WindowEvent::Touch(touch) => self.touch(
                touch.id,
                touch.phase,
                touch.location.x as f32,
                touch.location.y as f32,
            ),
            _ => Vec::new(),
        }
    }

    pub fn mouse_input(&mut self, button: MouseButton, pressed: bool) -> Vec<Gesture> {
        if pressed {
            if self.held.is_some() || !self.touches.is_empty() {
                return Vec::new();
            }
            let Some(pointer) = Self::map_button(button) else {
                return Vec::new();
            };
            self.held = Some(button);
            vec![Gesture::MouseDown(pointer)]
        } else if self.held == Some(button) {
            self.held = None;
            vec![Gesture::Release]
        } else {
            Vec::new()
        }
    }

    fn mouse_input_release_all(&mut self) -> Vec<Gesture> {
        self.cursor = None;
        match self.held.take() {
            Some(_) => vec![Gesture::Release],
            None => Vec::new(),
        }
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) -> Vec<Gesture> {
        let previous = self.cursor.replace((x, y));
        match (self.held, previous) {
            (Some(_), Some((px, py))) => vec![Gesture::Move {
                dx: x - px,
                dy: y - py,
            }],
            _ => Vec::new(),
        }
    }

    pub fn wheel(&mut self, lines: f32) -> Vec<Gesture> {
        if lines == 0.0 {
            Vec::new()
        } else {
            vec![Gesture::Wheel { lines }]
        }
    }

    pub fn touch(&mut self, id: u64, phase: TouchPhase, x: f32, y: f32) -> Vec<Gesture> {
        match phase {
            TouchPhase::Started => {
                self.touches.insert(id, (x, y));
                vec![Gesture::TouchCount(self.touches.len())]
            }
            TouchPhase::Moved => {
                let before = self.touch_frame();
                if let Some(position) = self.touches.get_mut(&id) {
                    *position = (x, y);
                } else {
                    return Vec::new();
                }
                let after = self.touch_frame();

                match (before, after) {
                    (TouchFrame::One(a), TouchFrame::One(b)) => vec![Gesture::Move {
                        dx: b.0 - a.0,
                        dy: b.1 - a.1,
                    }],
                    (
                        TouchFrame::Two {
                            centroid: c0,
                            spread: s0,
                        },
                        TouchFrame::Two {
                            centroid: c1,
                            spread: s1,
                        },
                    ) if s0 > 0.0 && s1 > 0.0 => vec![Gesture::Pinch {
                        ratio: s1 / s0,
                        dx: c1.0 - c0.0,
                        dy: c1.1 - c0.1,
                    }],
                    _ => Vec::new(),
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                if self.touches.remove(&id).is_none() {
                    return Vec::new();
                }
                if self.touches.is_empty() {
                    vec![Gesture::Release]
                } else {
                    vec![Gesture::TouchCount(self.touches.len())]
                }
            }
        }
    }

    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    fn touch_frame(&self) -> TouchFrame {
        let mut points = self.touches.values();
        match (points.next(), points.next()) {
            (Some(&a), None) => TouchFrame::One(a),
            (Some(&a), Some(&b)) => TouchFrame::Two {
                centroid: ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5),
                spread: ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt(),
            },
            _ => TouchFrame::None,
        }
    }

    fn map_button(button: MouseButton) -> Option<PointerButton> {
        match button {
            MouseButton::Left => Some(PointerButton::Primary),
            MouseButton::Right => Some(PointerButton::Secondary),
            MouseButton::Middle => Some(PointerButton::Middle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TouchFrame {
    None,
    One((f32, f32)),
    Two { centroid: (f32, f32), spread: f32 },
}
