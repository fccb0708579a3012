//! DOM wiring for taps, the draggable color handle and the native picker.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};
use pulse_common::{
    Color, Point, PulseEvent,
    input::{Action, PointerId},
    pulse::to_normalized,
};
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Event, EventTarget, HtmlElement, HtmlInputElement, PointerEvent,
    TouchEvent,
};

use crate::{Scene, sync::Connection};

struct Context {
    scene: Rc<RefCell<Scene>>,
    connection: Connection,
    handle: HtmlElement,
    picker: HtmlInputElement,
}

impl Context {
    fn apply(&self, action: Action) {
        match action {
            Action::None => {}
            Action::Spawn(pos) => {
                let (origin, color) = {
                    let mut scene = self.scene.borrow_mut();
                    let origin = to_normalized(pos, scene.size);
                    let color = scene.color;
                    // Local feedback first, then best-effort upstream.
                    scene.field.spawn(origin, color);
                    (origin, color)
                };
                self.connection.send(PulseEvent::new(origin, color));
            }
            Action::MoveHandle(top_left) => {
                if let Err(e) = place(&self.handle, top_left) {
                    debug!("Failed to move handle: {e:?}");
                }
            }
            Action::OpenPicker => self.picker.click(),
        }
    }

    fn pick(&self) {
        let value = self.picker.value();
        match value.parse::<Color>() {
            Ok(color) => {
                self.scene.borrow_mut().color = color;
                paint(&self.handle, color);
                info!("Color selected: {color}");
            }
            Err(e) => debug!("Ignoring picker value: {e}"),
        }
    }
}

fn place(handle: &HtmlElement, top_left: Point) -> Result<(), JsValue> {
    let style = handle.style();
    style.set_property("left", &format!("{}px", top_left.x))?;
    style.set_property("top", &format!("{}px", top_left.y))
}

fn paint(handle: &HtmlElement, color: Color) {
    let _ = handle.style().set_property("background-color", &color.to_hex());
}

fn client_point(x: i32, y: i32) -> Point {
    Point::new(x as f32, y as f32)
}

/// Keeps the listener closures alive for the lifetime of the app.
pub struct Controls {
    ctx: Rc<Context>,
    listeners: Vec<Closure<dyn FnMut(Event)>>,
}

impl Controls {
    pub fn attach(
        scene: Rc<RefCell<Scene>>,
        connection: Connection,
        handle: HtmlElement,
        picker: HtmlInputElement,
    ) -> Result<Self, JsValue> {
        let color = scene.borrow().color;
        picker.set_value(&color.to_hex());
        paint(&handle, color);
        place(&handle, scene.borrow().input.handle())?;

        let mut controls = Self {
            ctx: Rc::new(Context {
                scene,
                connection,
                handle,
                picker,
            }),
            listeners: Vec::new(),
        };

        let window: EventTarget = web_sys::window().ok_or("no global `window` exists")?.into();
        let has_pointer_events = js_sys::Reflect::has(&window, &JsValue::from_str("PointerEvent"))
            .unwrap_or(false);
        if has_pointer_events {
            controls.attach_pointer(&window)?;
        } else {
            info!("Pointer events unavailable, using touch events");
            controls.attach_touch(&window)?;
        }

        let picker: EventTarget = controls.ctx.picker.clone().into();
        for kind in ["input", "change"] {
            let ctx = Rc::clone(&controls.ctx);
            controls.listen(&picker, kind, true, move |_| ctx.pick())?;
        }
        Ok(controls)
    }

    pub fn place_handle(&self, top_left: Point) -> Result<(), JsValue> {
        place(&self.ctx.handle, top_left)
    }

    fn attach_pointer(&mut self, window: &EventTarget) -> Result<(), JsValue> {
        let ctx = Rc::clone(&self.ctx);
        self.listen(window, "pointerdown", true, move |e| {
            let Some(e) = e.dyn_ref::<PointerEvent>() else {
                return;
            };
            let pos = client_point(e.client_x(), e.client_y());
            let action = ctx.scene.borrow_mut().input.press(e.pointer_id(), pos);
            ctx.apply(action);
        })?;

        let ctx = Rc::clone(&self.ctx);
        self.listen(window, "pointermove", true, move |e| {
            let Some(e) = e.dyn_ref::<PointerEvent>() else {
                return;
            };
            let pos = client_point(e.client_x(), e.client_y());
            let action = ctx.scene.borrow_mut().input.motion(e.pointer_id(), pos);
            ctx.apply(action);
        })?;

        let ctx = Rc::clone(&self.ctx);
        self.listen(window, "pointerup", true, move |e| {
            let Some(e) = e.dyn_ref::<PointerEvent>() else {
                return;
            };
            let pos = client_point(e.client_x(), e.client_y());
            let action = ctx.scene.borrow_mut().input.release(e.pointer_id(), pos);
            ctx.apply(action);
        })?;

        let ctx = Rc::clone(&self.ctx);
        self.listen(window, "pointercancel", true, move |e| {
            if let Some(e) = e.dyn_ref::<PointerEvent>() {
                ctx.scene.borrow_mut().input.cancel(e.pointer_id());
            }
        })
    }

    fn attach_touch(&mut self, window: &EventTarget) -> Result<(), JsValue> {
        type Handler = fn(&Context, PointerId, Point) -> Action;
        let handlers: [(&'static str, Handler); 4] = [
            ("touchstart", |ctx: &Context, id: PointerId, pos: Point| {
                ctx.scene.borrow_mut().input.press(id, pos)
            }),
            ("touchmove", |ctx: &Context, id: PointerId, pos: Point| {
                ctx.scene.borrow_mut().input.motion(id, pos)
            }),
            ("touchend", |ctx: &Context, id: PointerId, pos: Point| {
                ctx.scene.borrow_mut().input.release(id, pos)
            }),
            ("touchcancel", |ctx: &Context, id: PointerId, _: Point| {
                ctx.scene.borrow_mut().input.cancel(id);
                Action::None
            }),
        ];

        for (kind, handler) in handlers {
            let ctx = Rc::clone(&self.ctx);
            // Non-passive so the browser does not scroll or synthesize mouse events.
            self.listen(window, kind, false, move |e| {
                let Some(e) = e.dyn_ref::<TouchEvent>() else {
                    return;
                };
                e.prevent_default();
                let touches = e.changed_touches();
                for i in 0..touches.length() {
                    let Some(touch) = touches.get(i) else {
                        continue;
                    };
                    let pos = client_point(touch.client_x(), touch.client_y());
                    let action = handler(&ctx, touch.identifier(), pos);
                    ctx.apply(action);
                }
            })?;
        }
        Ok(())
    }

    fn listen(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        passive: bool,
        f: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(passive);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            kind,
            closure.as_ref().unchecked_ref(),
            &options,
        )?;
        self.listeners.push(closure);
        Ok(())
    }
}
