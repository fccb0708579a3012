//! Pulse - Common Types & Logic
//!
//! Shared between the relay server and the wasm client: the wire format,
//! the pulse animation model, and the input/connection state machines.

pub type Point = nalgebra::Point2<f32>;
pub type Vector = nalgebra::Vector2<f32>;

pub mod color;
pub mod input;
pub mod link;
pub mod pulse;
pub mod wire;

pub use anyhow::{bail, Result};
pub use color::Color;
pub use wire::{PulseEvent, WireMessage};
