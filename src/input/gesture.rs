// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer gesture tracking.
//!
//! One finger pans the target layer; two or more fingers pan, zoom and
//! rotate it using the first two pointers. Every gesture is computed
//! relative to a context captured when the pointer set last changed, so
//! adding or lifting a finger re-anchors the gesture instead of jumping.

use crate::models::layer::{LayerKind, Layers, MAX_SCALE};
use crate::models::scene::Viewport;
use crate::util::geometry::{angle_between, angle_delta, clamp, distance, midpoint, Point};

pub type PointerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Pan,
    Transform,
}

/// Starting conditions of the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureContext {
    Pan {
        layer: LayerKind,
        start: Point,
        initial_x: f64,
        initial_y: f64,
    },
    Transform {
        layer: LayerKind,
        start_center: Point,
        start_distance: f64,
        start_angle: f64,
        initial_x: f64,
        initial_y: f64,
        initial_scale: f64,
        initial_rotation: f64,
    },
}

impl GestureContext {
    fn layer(&self) -> LayerKind {
        match *self {
            GestureContext::Pan { layer, .. } | GestureContext::Transform { layer, .. } => layer,
        }
    }

    fn mode(&self) -> GestureMode {
        match self {
            GestureContext::Pan { .. } => GestureMode::Pan,
            GestureContext::Transform { .. } => GestureMode::Transform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActivePointer {
    id: PointerId,
    position: Point,
}

/// Tracks active pointers and turns their motion into layer transforms.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    /// In press order; the first two drive multi-finger gestures.
    pointers: Vec<ActivePointer>,
    gesture: Option<GestureContext>,
}

impl GestureTracker {
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn mode(&self) -> Option<GestureMode> {
        self.gesture.as_ref().map(GestureContext::mode)
    }

    pub fn target(&self) -> Option<LayerKind> {
        self.gesture.as_ref().map(GestureContext::layer)
    }

    pub fn is_tracking(&self, id: PointerId) -> bool {
        self.pointers.iter().any(|p| p.id == id)
    }

    /// Register a pointer on `target`. Returns false when the press is
    /// ignored because the layer is locked or has nothing to draw.
    pub fn pointer_down(
        &mut self,
        id: PointerId,
        position: Point,
        target: LayerKind,
        layers: &Layers,
        drawable: bool,
    ) -> bool {
        if !drawable || layers.get(target).is_locked() {
            return false;
        }
        self.set_position(id, position);
        self.rebuild(target, layers);
        true
    }

    /// Move a tracked pointer. Returns the layer that changed, if any.
    pub fn pointer_move(
        &mut self,
        id: PointerId,
        position: Point,
        layers: &mut Layers,
        viewport: Viewport,
    ) -> Option<LayerKind> {
        if !self.is_tracking(id) {
            return None;
        }
        self.set_position(id, position);
        self.apply(layers, viewport)
    }

    /// Release (or cancel) a pointer. The gesture continues re-anchored on
    /// the remaining pointers, or ends when none are left.
    pub fn pointer_up(&mut self, id: PointerId, layers: &Layers) -> bool {
        let before = self.pointers.len();
        self.pointers.retain(|p| p.id != id);
        if self.pointers.len() == before {
            return false;
        }
        if self.pointers.is_empty() {
            self.gesture = None;
        } else if let Some(layer) = self.target() {
            self.rebuild(layer, layers);
        }
        true
    }

    /// Drop every pointer, e.g. when the canvas loses focus.
    pub fn cancel(&mut self) {
        self.pointers.clear();
        self.gesture = None;
    }

    fn set_position(&mut self, id: PointerId, position: Point) {
        match self.pointers.iter_mut().find(|p| p.id == id) {
            Some(pointer) => pointer.position = position,
            None => self.pointers.push(ActivePointer { id, position }),
        }
    }

    fn rebuild(&mut self, layer: LayerKind, layers: &Layers) {
        let state = layers.get(layer);
        self.gesture = match self.pointers.as_slice() {
            [] => None,
            [only] => Some(GestureContext::Pan {
                layer,
                start: only.position,
                initial_x: state.x(),
                initial_y: state.y(),
            }),
            [a, b, ..] => Some(GestureContext::Transform {
                layer,
                start_center: midpoint(a.position, b.position),
                start_distance: distance(a.position, b.position),
                start_angle: angle_between(a.position, b.position),
                initial_x: state.x(),
                initial_y: state.y(),
                initial_scale: state.scale(),
                initial_rotation: state.rotation(),
            }),
        };
    }

    fn apply(&mut self, layers: &mut Layers, viewport: Viewport) -> Option<LayerKind> {
        let context = self.gesture?;
        let kind = context.layer();
        if layers.get(kind).is_locked() || self.pointers.is_empty() {
            return None;
        }

        // Pointer count crossed the one/two boundary without a down/up
        // rebuilding the context.
        let wants_transform = self.pointers.len() >= 2;
        if wants_transform != (context.mode() == GestureMode::Transform) {
            self.rebuild(kind, layers);
        }

        let context = self.gesture?;
        let percent = |delta: f64, extent: f64| delta / extent * 100.0;
        let layer = layers.get_mut(kind);
        match context {
            GestureContext::Pan {
                start,
                initial_x,
                initial_y,
                ..
            } => {
                let point = self.pointers[0].position;
                layer.set_offset(
                    initial_x + percent(point.x - start.x, viewport.width),
                    initial_y + percent(point.y - start.y, viewport.height),
                );
            }
            GestureContext::Transform {
                start_center,
                start_distance,
                start_angle,
                initial_x,
                initial_y,
                initial_scale,
                initial_rotation,
                ..
            } => {
                let (a, b) = (self.pointers[0].position, self.pointers[1].position);
                let center = midpoint(a, b);
                let scale_ratio = distance(a, b) / start_distance.max(1.0);
                let rotation = angle_delta(angle_between(a, b), start_angle);

                layer.set_offset(
                    initial_x + percent(center.x - start_center.x, viewport.width),
                    initial_y + percent(center.y - start_center.y, viewport.height),
                );
                layer.set_scale(clamp(
                    initial_scale * scale_ratio,
                    kind.min_scale(),
                    MAX_SCALE,
                ));
                layer.set_rotation(initial_rotation + rotation);
            }
        }
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn viewport() -> Viewport {
        Viewport::new(400.0, 200.0)
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_single_pointer_pans_in_viewport_percent() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();

        assert!(tracker.pointer_down(1, p(100.0, 100.0), LayerKind::Image, &layers, true));
        assert_eq!(tracker.mode(), Some(GestureMode::Pan));

        let moved = tracker.pointer_move(1, p(140.0, 90.0), &mut layers, viewport());
        assert_eq!(moved, Some(LayerKind::Image));
        assert_eq!(layers.image.x(), 10.0);
        assert_eq!(layers.image.y(), -5.0);
        assert_eq!(layers.camera.x(), 0.0);
    }

    #[test]
    fn test_pan_is_clamped() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(0.0, 0.0), LayerKind::Image, &layers, true);
        tracker.pointer_move(1, p(4000.0, -4000.0), &mut layers, viewport());
        assert_eq!((layers.image.x(), layers.image.y()), (300.0, -300.0));
    }

    #[test]
    fn test_locked_or_undrawable_layer_ignores_press() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();

        assert!(!tracker.pointer_down(1, p(0.0, 0.0), LayerKind::Camera, &layers, false));
        layers.image.set_locked(true);
        assert!(!tracker.pointer_down(1, p(0.0, 0.0), LayerKind::Image, &layers, true));
        assert_eq!(tracker.pointer_count(), 0);
        assert!(tracker.pointer_move(1, p(50.0, 50.0), &mut layers, viewport()).is_none());
    }

    #[test]
    fn test_lock_mid_gesture_freezes_layer() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(0.0, 0.0), LayerKind::Image, &layers, true);
        layers.image.set_locked(true);

        assert!(tracker.pointer_move(1, p(80.0, 0.0), &mut layers, viewport()).is_none());
        assert_eq!(layers.image.x(), 0.0);

        layers.image.set_locked(false);
        tracker.pointer_move(1, p(80.0, 0.0), &mut layers, viewport());
        assert_eq!(layers.image.x(), 20.0);
    }

    #[test]
    fn test_two_pointers_zoom_and_rotate() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(100.0, 100.0), LayerKind::Image, &layers, true);
        tracker.pointer_down(2, p(200.0, 100.0), LayerKind::Image, &layers, true);
        assert_eq!(tracker.mode(), Some(GestureMode::Transform));

        // Second finger swings a quarter turn around the first and doubles
        // the spread.
        tracker.pointer_move(2, p(100.0, 300.0), &mut layers, viewport());

        assert!((layers.image.scale() - 2.0).abs() < 1e-9);
        assert!((layers.image.rotation() - FRAC_PI_2).abs() < 1e-9);
        // Center moved from (150,100) to (100,200).
        assert!((layers.image.x() + 12.5).abs() < 1e-9);
        assert!((layers.image.y() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_camera_zoom_floor() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(0.0, 0.0), LayerKind::Camera, &layers, true);
        tracker.pointer_down(2, p(100.0, 0.0), LayerKind::Camera, &layers, true);
        tracker.pointer_move(2, p(10.0, 0.0), &mut layers, viewport());
        assert_eq!(layers.camera.scale(), 1.0);

        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(0.0, 0.0), LayerKind::Image, &layers, true);
        tracker.pointer_down(2, p(100.0, 0.0), LayerKind::Image, &layers, true);
        tracker.pointer_move(2, p(1.0, 0.0), &mut layers, viewport());
        assert_eq!(layers.image.scale(), 0.1);
    }

    #[test]
    fn test_coincident_start_pointers_do_not_blow_up() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(50.0, 50.0), LayerKind::Image, &layers, true);
        tracker.pointer_down(2, p(50.0, 50.0), LayerKind::Image, &layers, true);
        tracker.pointer_move(2, p(53.0, 50.0), &mut layers, viewport());
        assert!((layers.image.scale() - 3.0).abs() < 1e-9);
        assert!(layers.image.scale().is_finite());
    }

    #[test]
    fn test_lifting_a_finger_reanchors_without_jump() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(1, p(100.0, 100.0), LayerKind::Image, &layers, true);
        tracker.pointer_down(2, p(200.0, 100.0), LayerKind::Image, &layers, true);
        tracker.pointer_move(2, p(250.0, 160.0), &mut layers, viewport());
        tracker.pointer_move(1, p(90.0, 80.0), &mut layers, viewport());

        let before = layers.image;
        assert!(tracker.pointer_up(2, &layers));
        assert_eq!(tracker.mode(), Some(GestureMode::Pan));
        assert_eq!(layers.image, before);

        // A zero-distance move on the remaining finger changes nothing.
        tracker.pointer_move(1, p(90.0, 80.0), &mut layers, viewport());
        assert_eq!(layers.image, before);

        // Further motion pans from the re-anchored position.
        tracker.pointer_move(1, p(130.0, 80.0), &mut layers, viewport());
        assert!((layers.image.x() - (before.x() + 10.0)).abs() < 1e-9);
        assert_eq!(layers.image.scale(), before.scale());
    }

    #[test]
    fn test_last_pointer_up_ends_gesture() {
        let layers = Layers::default();
        let mut tracker = GestureTracker::default();
        tracker.pointer_down(7, p(1.0, 1.0), LayerKind::Image, &layers, true);
        assert!(!tracker.pointer_up(8, &layers));
        assert!(tracker.pointer_up(7, &layers));
        assert_eq!(tracker.mode(), None);
        assert_eq!(tracker.pointer_count(), 0);
    }

    #[test]
    fn test_invariants_hold_for_long_pointer_sequences() {
        let mut layers = Layers::default();
        let mut tracker = GestureTracker::default();
        let kinds = [LayerKind::Image, LayerKind::Camera];

        // Deterministic pseudo-random walk.
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 10_000) as f64 / 10.0 - 300.0
        };

        for step in 0..2_000u64 {
            let kind = kinds[(step / 250) as usize % 2];
            let id = step % 3;
            match step % 7 {
                0 | 1 => {
                    tracker.pointer_down(id, p(next(), next()), kind, &layers, true);
                }
                6 => {
                    tracker.pointer_up(id, &layers);
                }
                _ => {
                    tracker.pointer_move(id, p(next() * 4.0, next() * 4.0), &mut layers, viewport());
                }
            }

            for layer in [&layers.image, &layers.camera] {
                assert!(layer.scale() >= layer.kind().min_scale() && layer.scale() <= 8.0);
                assert!(layer.rotation() > -PI && layer.rotation() <= PI);
                assert!((-300.0..=300.0).contains(&layer.x()));
                assert!((-300.0..=300.0).contains(&layer.y()));
            }
        }
    }
}
