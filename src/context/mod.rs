//! Prompt composition and the generation step.

mod generator;
pub mod prompt;

pub use generator::{Generator, TEMPERATURE};
pub use prompt::{
    build_messages, join_context, render_history, CONTEXT_HEADING, CONTEXT_SEPARATOR,
    NO_SOLUTION_PHRASE,
};
