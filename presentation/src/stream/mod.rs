//! Console rendering of a streaming council run.

mod observer;
mod renderer;

pub use observer::ConsoleStreamObserver;
pub use renderer::StreamRenderer;
