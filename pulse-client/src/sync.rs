//! Relay connection: sends local pulses, queues peer pulses for the render
//! loop, and redials after every disconnect.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::{debug, error, info, warn};
use pulse_common::{PulseEvent, WireMessage, link::Link};
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

#[derive(Clone)]
pub struct Connection {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    url: String,
    ws: Option<WebSocket>,
    link: Link,
    inbound: VecDeque<PulseEvent>,

    // prevent GC of closures
    _onopen: Option<Closure<dyn FnMut(Event)>>,
    _onmessage: Option<Closure<dyn FnMut(MessageEvent)>>,
    _onclose: Option<Closure<dyn FnMut(CloseEvent)>>,
    _onerror: Option<Closure<dyn FnMut(ErrorEvent)>>,
}

impl Connection {
    /// Starts connecting to `url`. Failures are retried, never returned.
    pub fn open(url: String) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            url,
            ws: None,
            link: Link::new(),
            inbound: VecDeque::new(),
            _onopen: None,
            _onmessage: None,
            _onclose: None,
            _onerror: None,
        }));
        connect(&inner);
        Self { inner }
    }

    /// Best effort: dropped silently unless the socket is open.
    pub fn send(&self, event: PulseEvent) {
        let inner = self.inner.borrow();
        if !inner.link.can_send() {
            return;
        }
        if let Some(ws) = &inner.ws {
            if let Err(e) = ws.send_with_str(&WireMessage::Pulse(event).encode()) {
                debug!("Pulse not sent: {e:?}");
            }
        }
    }

    /// Peer pulses received since the last call, in arrival order.
    pub fn drain(&self) -> Vec<PulseEvent> {
        self.inner.borrow_mut().inbound.drain(..).collect()
    }
}

fn connect(inner: &Rc<RefCell<Inner>>) {
    let weak = Rc::downgrade(inner);
    let mut state = inner.borrow_mut();
    state.link.connecting();

    if let Some(old) = state.ws.take() {
        old.set_onopen(None);
        old.set_onmessage(None);
        old.set_onclose(None);
        old.set_onerror(None);
    }

    let ws = match WebSocket::new(&state.url) {
        Ok(ws) => ws,
        Err(e) => {
            error!("Cannot open {}: {e:?}", state.url);
            let delay = state.link.closed();
            drop(state);
            schedule_reconnect(weak, delay);
            return;
        }
    };

    let onopen = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |_e: Event| {
            if let Some(inner) = weak.upgrade() {
                let mut state = inner.borrow_mut();
                state.link.opened();
                info!("Relay connected: {}", state.url);
            }
        }) as Box<dyn FnMut(Event)>)
    };
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

    // onmessage: decode text frames and queue them for the next frame
    let onmessage = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |e: MessageEvent| {
            let Some(text) = e.data().as_string() else {
                return;
            };
            match WireMessage::decode(&text) {
                Ok(WireMessage::Pulse(event)) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.borrow_mut().inbound.push_back(event);
                    }
                }
                Err(err) => debug!("Discarding malformed frame: {err}"),
            }
        }) as Box<dyn FnMut(MessageEvent)>)
    };
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

    let onclose = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |e: CloseEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let (delay, attempts) = {
                let mut state = inner.borrow_mut();
                (state.link.closed(), state.link.attempts())
            };
            warn!(
                "Relay closed: code={}, reason={}; retry #{} in {delay:?}",
                e.code(),
                e.reason(),
                attempts
            );
            schedule_reconnect(weak.clone(), delay);
        }) as Box<dyn FnMut(CloseEvent)>)
    };
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

    // Always followed by a close event.
    let onerror = Closure::wrap(Box::new(move |_e: ErrorEvent| {
        debug!("Relay socket error");
    }) as Box<dyn FnMut(ErrorEvent)>);
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

    debug!("Connecting to {} (attempt {})", state.url, state.link.attempts());
    state.ws = Some(ws);
    state._onopen = Some(onopen);
    state._onmessage = Some(onmessage);
    state._onclose = Some(onclose);
    state._onerror = Some(onerror);
}

fn schedule_reconnect(weak: Weak<RefCell<Inner>>, delay: Duration) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(move || {
        if let Some(inner) = weak.upgrade() {
            connect(&inner);
        }
    });
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay.as_millis() as i32,
    ) {
        error!("Failed to schedule reconnect: {e:?}");
    }
}
