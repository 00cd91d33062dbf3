//! Rendering of the orchestrator's output stream.
mod format;
mod writers;

#[cfg(test)]
mod tests;

pub use format::{render_json, render_line, render_text};
pub use writers::run_sink;
