//! Gesture handling for the drawing surface and the color-picker handle.
//!
//! Pointer events and legacy touch events both reduce to `press`, `motion`,
//! `release` and `cancel` on [`InputState`]. Positions are CSS pixels in
//! viewport space.

use crate::{Point, Vector};

/// Pointer id, or touch identifier when the browser lacks pointer events.
pub type PointerId = i32;

/// Movement below this many CSS pixels keeps a handle drag a tap.
pub const DRAG_THRESHOLD: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    None,
    /// Tap on the drawing surface at this viewport position.
    Spawn(Point),
    /// Handle moved; new top-left corner.
    MoveHandle(Point),
    /// Short tap on the handle; open the native color selector.
    OpenPicker,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    id: PointerId,
    start: Point,
    /// Pointer position relative to the handle's top-left corner.
    grab: Vector,
    travelled: bool,
}

pub struct InputState {
    handle: Point,
    handle_size: f32,
    viewport: Vector,
    drag: Option<Drag>,
}

impl InputState {
    pub fn new(handle: Point, handle_size: f32, viewport: Vector) -> Self {
        let mut state = Self {
            handle,
            handle_size,
            viewport,
            drag: None,
        };
        state.handle = state.clamp_handle(handle);
        state
    }

    pub fn handle(&self) -> Point {
        self.handle
    }

    pub fn hits_handle(&self, pos: Point) -> bool {
        let d = pos - self.handle;
        (0.0..=self.handle_size).contains(&d.x) && (0.0..=self.handle_size).contains(&d.y)
    }

    /// Keeps the handle on screen after the viewport changes.
    pub fn resize(&mut self, viewport: Vector) -> Point {
        self.viewport = viewport;
        self.handle = self.clamp_handle(self.handle);
        self.handle
    }

    pub fn press(&mut self, id: PointerId, pos: Point) -> Action {
        if !self.hits_handle(pos) {
            return Action::Spawn(pos);
        }
        if self.drag.is_some() {
            return Action::None;
        }
        self.drag = Some(Drag {
            id,
            start: pos,
            grab: pos - self.handle,
            travelled: false,
        });
        Action::None
    }

    pub fn motion(&mut self, id: PointerId, pos: Point) -> Action {
        let Some(drag) = self.drag.as_mut().filter(|d| d.id == id) else {
            return Action::None;
        };
        if !drag.travelled && (pos - drag.start).norm() >= DRAG_THRESHOLD {
            drag.travelled = true;
        }
        if !drag.travelled {
            return Action::None;
        }
        let target = pos - drag.grab;
        self.handle = self.clamp_handle(target);
        Action::MoveHandle(self.handle)
    }

    pub fn release(&mut self, id: PointerId, pos: Point) -> Action {
        if !self.drag.is_some_and(|d| d.id == id) {
            return Action::None;
        }
        let action = self.motion(id, pos);
        match self.drag.take() {
            Some(drag) if !drag.travelled => Action::OpenPicker,
            _ => action,
        }
    }

    pub fn cancel(&mut self, id: PointerId) {
        if self.drag.is_some_and(|d| d.id == id) {
            self.drag = None;
        }
    }

    fn clamp_handle(&self, p: Point) -> Point {
        let max_x = (self.viewport.x - self.handle_size).max(0.0);
        let max_y = (self.viewport.y - self.handle_size).max(0.0);
        Point::new(p.x.clamp(0.0, max_x), p.y.clamp(0.0, max_y))
    }
}
