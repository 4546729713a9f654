#![forbid(unsafe_code)]

mod rendering;

pub use rendering::{double_gyre, init_tracing, Canvas, RenderConfig};
