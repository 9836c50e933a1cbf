pub mod lexer;
pub mod parser;
pub mod evaluator;
pub mod pipeline;

pub use lexer::*;
pub use pipeline::*;
