use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};
use pulse_common::{
    Color, Point, Vector,
    color::DEFAULT_COLOR,
    input::InputState,
    link::socket_url,
    pulse::{FrameClock, PulseConfig, PulseField},
};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, HtmlInputElement};

mod input;
mod surface;
mod sync;

/// Where the color handle starts, in CSS pixels from the top-left corner.
const HANDLE_MARGIN: f32 = 16.0;
const HANDLE_FALLBACK_SIZE: f32 = 44.0;

/// State shared by the frame loop and the input listeners.
pub(crate) struct Scene {
    pub field: PulseField,
    pub input: InputState,
    pub color: Color,
    /// Surface size in CSS pixels.
    pub size: Vector,
}

pub(crate) fn element_by_id<T: JsCast>(id: &str) -> Result<T, JsValue> {
    let document = web_sys::window()
        .ok_or("no global `window` exists")?
        .document()
        .ok_or("should have a document on window")?;
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("element '{id}' not found")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element '{id}' has the wrong type")))
}

#[wasm_bindgen]
pub struct PulseApp {
    surface: surface::Surface,
    scene: Rc<RefCell<Scene>>,
    connection: sync::Connection,
    controls: input::Controls,
    clock: FrameClock,
}

#[wasm_bindgen]
impl PulseApp {
    /// Binds to the page's canvas, color handle and hidden `<input type="color">`,
    /// and connects to the relay serving this page.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, handle_id: &str, picker_id: &str) -> Result<PulseApp, JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        let surface = surface::Surface::new(canvas_id)?;
        let handle: HtmlElement = element_by_id(handle_id)?;
        let picker: HtmlInputElement = element_by_id(picker_id)?;

        let handle_size = match handle.offset_width() {
            w if w > 0 => w as f32,
            _ => HANDLE_FALLBACK_SIZE,
        };
        let config = PulseConfig::default();
        let scene = Rc::new(RefCell::new(Scene {
            field: PulseField::new(config),
            input: InputState::new(
                Point::new(HANDLE_MARGIN, HANDLE_MARGIN),
                handle_size,
                surface.size,
            ),
            color: DEFAULT_COLOR,
            size: surface.size,
        }));

        let location = web_sys::window()
            .ok_or("no global `window` exists")?
            .location();
        let url = socket_url(&location.protocol()?, &location.host()?);
        let connection = sync::Connection::open(url);

        let controls =
            input::Controls::attach(Rc::clone(&scene), connection.clone(), handle, picker)?;

        info!("Pulse client initialized");
        Ok(PulseApp {
            surface,
            scene,
            connection,
            controls,
            clock: FrameClock::new(config.max_step),
        })
    }

    /// One display frame; `timestamp` is the `requestAnimationFrame` time in ms.
    pub fn frame(&mut self, timestamp: f64) -> Result<(), JsValue> {
        let dt = self.clock.tick(timestamp);
        let mut scene = self.scene.borrow_mut();
        for event in self.connection.drain() {
            if let Err(e) = scene.field.spawn_event(&event) {
                debug!("Discarding peer pulse: {e}");
            }
        }
        scene.field.advance(dt);
        self.surface.draw(&scene.field)
    }

    pub fn resize(&mut self) -> Result<(), JsValue> {
        self.surface.resize()?;
        let top_left = {
            let mut scene = self.scene.borrow_mut();
            scene.size = self.surface.size;
            scene.input.resize(self.surface.size)
        };
        self.controls.place_handle(top_left)
    }
}
