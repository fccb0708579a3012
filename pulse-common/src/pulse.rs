//! Pulse animation model: expanding rings that fade in and out.
//!
//! Origins are normalized to the unit square so the same event lands at the
//! same relative spot on every screen. Radii are in CSS pixels.

use crate::{Color, Point, PulseEvent, Vector};
use anyhow::Result;
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseConfig {
    /// Seconds from birth to removal.
    pub lifetime: f32,
    pub start_radius: f32,
    /// Radius growth in CSS px per second.
    pub growth_rate: f32,
    /// Peak opacity, reached at half the lifetime.
    pub max_alpha: f32,
    /// Upper bound for a single frame step, in seconds.
    pub max_step: f32,
    /// Opacity of the dark overlay drawn every frame to leave trails.
    pub trail_alpha: f32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            lifetime: 2.4,
            start_radius: 4.0,
            growth_rate: 140.0,
            max_alpha: 0.85,
            max_step: 0.05,
            trail_alpha: 0.08,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    pub origin: Point,
    pub color: Color,
    pub radius: f32,
    pub age: f32,
}

impl Pulse {
    pub fn new(origin: Point, color: Color, config: &PulseConfig) -> Self {
        Self {
            origin: clamp_unit(origin),
            color,
            radius: config.start_radius,
            age: 0.0,
        }
    }

    pub fn progress(&self, lifetime: f32) -> f32 {
        self.age / lifetime
    }

    /// Bell-shaped envelope: zero at birth and death, `max_alpha` at midlife.
    pub fn alpha(&self, config: &PulseConfig) -> f32 {
        let t = self.progress(config.lifetime).clamp(0.0, 1.0);
        (config.max_alpha * (PI * t).sin()).max(0.0)
    }
}

fn clamp_unit(p: Point) -> Point {
    Point::new(p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0))
}

/// Maps a normalized origin onto a surface of `size` CSS pixels.
pub fn to_pixels(origin: Point, size: Vector) -> Point {
    let p = clamp_unit(origin);
    Point::new(p.x * size.x, p.y * size.y)
}

/// Maps a CSS pixel position onto the unit square, clamped.
pub fn to_normalized(pos: Point, size: Vector) -> Point {
    if size.x <= 0.0 || size.y <= 0.0 {
        return Point::origin();
    }
    clamp_unit(Point::new(pos.x / size.x, pos.y / size.y))
}

/// The active pulses of one client.
pub struct PulseField {
    config: PulseConfig,
    pulses: Vec<Pulse>,
}

impl PulseField {
    pub fn new(config: PulseConfig) -> Self {
        Self {
            config,
            pulses: Vec::with_capacity(64),
        }
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn spawn(&mut self, origin: Point, color: Color) {
        self.pulses.push(Pulse::new(origin, color, &self.config));
    }

    /// Spawns a pulse from a peer's event. The event is rejected when its
    /// color is not `#rrggbb`.
    pub fn spawn_event(&mut self, event: &PulseEvent) -> Result<()> {
        let color: Color = event.color.parse()?;
        self.spawn(event.origin(), color);
        Ok(())
    }

    pub fn advance(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, self.config.max_step);
        let PulseConfig {
            lifetime,
            growth_rate,
            ..
        } = self.config;
        let before = self.pulses.len();
        self.pulses.retain_mut(|p| {
            p.age += dt;
            p.radius += growth_rate * dt;
            p.progress(lifetime) < 1.0
        });
        let expired = before - self.pulses.len();
        if expired > 0 {
            log::trace!("{expired} pulses expired, {} active", self.pulses.len());
        }
    }
}

impl Default for PulseField {
    fn default() -> Self {
        Self::new(PulseConfig::default())
    }
}

/// Turns `requestAnimationFrame` timestamps into bounded frame steps.
pub struct FrameClock {
    last: Option<f64>,
    max_step: f32,
}

impl FrameClock {
    pub fn new(max_step: f32) -> Self {
        Self {
            last: None,
            max_step,
        }
    }

    /// Seconds since the previous tick; 0 on the first one.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last.replace(now_ms) {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        dt.clamp(0.0, self.max_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> Color {
        Color::new(1., 1., 1., 1.)
    }

    #[test]
    fn test_alpha_envelope() {
        let config = PulseConfig::default();
        let mut pulse = Pulse::new(Point::new(0.5, 0.5), white(), &config);
        assert_eq!(pulse.alpha(&config), 0.0);

        pulse.age = config.lifetime / 2.0;
        assert!((pulse.alpha(&config) - config.max_alpha).abs() < 1e-5);

        pulse.age = config.lifetime * 0.999;
        assert!(pulse.alpha(&config) < 0.01);

        pulse.age = config.lifetime * 0.25;
        let quarter = pulse.alpha(&config);
        pulse.age = config.lifetime * 0.75;
        assert!((pulse.alpha(&config) - quarter).abs() < 1e-5);
    }

    #[test]
    fn test_radius_grows_linearly() {
        let config = PulseConfig::default();
        let mut field = PulseField::new(config);
        field.spawn(Point::new(0.2, 0.8), white());
        for _ in 0..10 {
            field.advance(0.02);
        }
        let p = &field.pulses()[0];
        assert!((p.radius - (config.start_radius + config.growth_rate * 0.2)).abs() < 1e-3);
        assert!((p.age - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_removed_at_end_of_life() {
        let config = PulseConfig {
            lifetime: 1.0,
            max_step: 0.25,
            ..Default::default()
        };
        let mut field = PulseField::new(config);
        field.spawn(Point::new(0.5, 0.5), white());

        for _ in 0..3 {
            field.advance(0.25);
            assert_eq!(field.pulses().len(), 1);
        }
        field.advance(0.25);
        assert!(field.pulses().is_empty());
    }

    #[test]
    fn test_step_is_clamped() {
        let config = PulseConfig::default();
        let mut field = PulseField::new(config);
        field.spawn(Point::new(0.5, 0.5), white());
        // A backgrounded tab returns with a huge delta.
        field.advance(30.0);
        assert_eq!(field.pulses().len(), 1);
        assert!((field.pulses()[0].age - config.max_step).abs() < 1e-6);

        field.advance(-1.0);
        assert!((field.pulses()[0].age - config.max_step).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_origin_clamped() {
        let mut field = PulseField::default();
        let event = PulseEvent {
            x_norm: 1.7,
            y_norm: -0.4,
            color: "#123456".into(),
        };
        field.spawn_event(&event).unwrap();
        let origin = field.pulses()[0].origin;
        assert_eq!(origin, Point::new(1.0, 0.0));

        let size = Vector::new(800.0, 600.0);
        assert_eq!(to_pixels(origin, size), Point::new(800.0, 0.0));
        assert_eq!(
            to_pixels(Point::new(-2.0, 9.0), size),
            Point::new(0.0, 600.0)
        );
    }

    #[test]
    fn test_bad_color_rejected() {
        let mut field = PulseField::default();
        let event = PulseEvent {
            x_norm: 0.5,
            y_norm: 0.5,
            color: "blue".into(),
        };
        assert!(field.spawn_event(&event).is_err());
        assert!(field.pulses().is_empty());
    }

    #[test]
    fn test_to_normalized() {
        let size = Vector::new(400.0, 200.0);
        assert_eq!(to_normalized(Point::new(100.0, 150.0), size), Point::new(0.25, 0.75));
        assert_eq!(to_normalized(Point::new(-5.0, 500.0), size), Point::new(0.0, 1.0));
        assert_eq!(to_normalized(Point::new(5.0, 5.0), Vector::zeros()), Point::origin());
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::new(0.05);
        assert_eq!(clock.tick(1000.0), 0.0);
        assert!((clock.tick(1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(clock.tick(9000.0), 0.05);
        assert_eq!(clock.tick(8000.0), 0.0);
    }
}
