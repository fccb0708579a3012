use pulse_common::{
    Vector,
    pulse::{PulseField, to_pixels},
};
use std::f64::consts::TAU;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

/// Full-window 2D canvas. Drawing happens in CSS pixels; the transform maps
/// them onto the device-pixel backing store.
pub struct Surface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// Size in CSS pixels.
    pub size: Vector,
}

impl Surface {
    pub fn new(canvas_id: &str) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = crate::element_by_id(canvas_id)?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or("2D canvas not supported")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let mut surface = Self {
            canvas,
            ctx,
            size: Vector::zeros(),
        };
        surface.resize()?;
        Ok(surface)
    }

    /// Re-derives the backing store from the viewport and device pixel ratio.
    pub fn resize(&mut self) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no global `window` exists")?;
        let width = window.inner_width()?.as_f64().unwrap_or(0.0);
        let height = window.inner_height()?.as_f64().unwrap_or(0.0);
        let ratio = window.device_pixel_ratio().max(1.0);

        self.canvas.set_width((width * ratio).round() as u32);
        self.canvas.set_height((height * ratio).round() as u32);
        let style = self.canvas.style();
        style.set_property("width", &format!("{width}px"))?;
        style.set_property("height", &format!("{height}px"))?;

        // Resetting the size also resets the context state.
        self.ctx.set_transform(ratio, 0.0, 0.0, ratio, 0.0, 0.0)?;
        self.ctx.set_fill_style_str("#000");
        self.ctx.fill_rect(0.0, 0.0, width, height);

        self.size = Vector::new(width as f32, height as f32);
        log::debug!("Surface resized to {width}x{height} @{ratio}");
        Ok(())
    }

    pub fn draw(&self, field: &PulseField) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        let config = field.config();
        ctx.set_global_composite_operation("source-over")?;

        // Trails
        ctx.set_fill_style_str(&format!("rgba(0, 0, 0, {})", config.trail_alpha));
        ctx.fill_rect(0.0, 0.0, self.size.x as f64, self.size.y as f64);

        for pulse in field.pulses() {
            let alpha = pulse.alpha(config);
            if alpha <= 0.0 {
                continue;
            }
            let center = to_pixels(pulse.origin, self.size);
            let (x, y) = (center.x as f64, center.y as f64);
            let r = pulse.radius.max(0.0) as f64;

            let gradient = ctx.create_radial_gradient(x, y, 0.0, x, y, r)?;
            gradient.add_color_stop(0.0, &pulse.color.css_rgba(alpha))?;
            gradient.add_color_stop(1.0, &pulse.color.css_rgba(0.0))?;
            ctx.set_fill_style_canvas_gradient(&gradient);

            ctx.begin_path();
            ctx.arc(x, y, r, 0.0, TAU)?;
            ctx.fill();
        }
        Ok(())
    }
}
