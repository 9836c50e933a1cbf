use clap::ValueEnum;
use log::debug;
use miette::Diagnostic;
use thiserror::Error;
use crate::{
    evaluator::{self, EvalError},
    lexer::LexError,
    parser::{Expr, ParseError, Parser},
};

/// How a successfully parsed line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Evaluate to an integer.
    #[default]
    Numeric,
    /// Reverse Polish notation, e.g. `2 3 4 * +`.
    Postfix,
    /// Parenthesized prefix notation, e.g. `(+ 2 (* 3 4))`.
    Prefix,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                OutputMode::Numeric => "numeric",
                OutputMode::Postfix => "postfix",
                OutputMode::Prefix => "prefix",
            }
        )
    }
}

#[derive(Diagnostic, Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Lex(err) => PipelineError::Lex(err),
            err => PipelineError::Parse(err),
        }
    }
}

/// Lexes and parses one line into its syntax tree.
pub fn parse_line(text: &str) -> Result<Expr, PipelineError> {
    let mut parser = Parser::new(text)?;
    Ok(parser.parse()?)
}

/// Runs the whole pipeline over one line of input.
///
/// Every call gets its own lexer, parser and tree, so lines are fully
/// independent of each other.
pub fn evaluate_line(text: &str, mode: OutputMode) -> Result<String, PipelineError> {
    let expr = parse_line(text)?;
    debug!("rendering {expr} as {mode}");

    let output = match mode {
        OutputMode::Numeric => evaluator::evaluate(&expr)?.to_string(),
        OutputMode::Postfix => evaluator::to_postfix(&expr)?,
        OutputMode::Prefix => evaluator::to_prefix(&expr)?,
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    #[test]
    fn test_numeric() {
        assert_eq!(Ok("14".to_string()), evaluate_line("2+3*4", OutputMode::Numeric));
    }

    #[test]
    fn test_postfix() {
        assert_eq!(
            Ok("2 3 4 * +".to_string()),
            evaluate_line("2+3*4", OutputMode::Postfix)
        );
    }

    #[test]
    fn test_prefix() {
        assert_eq!(
            Ok("(+ 2 (* 3 4))".to_string()),
            evaluate_line("2+3*4", OutputMode::Prefix)
        );
    }

    #[test]
    fn test_lex_error_is_lifted() {
        assert!(matches!(
            evaluate_line("12abc", OutputMode::Numeric),
            Err(PipelineError::Lex(LexError::MalformedNumber { .. }))
        ));
        assert!(matches!(
            evaluate_line("2 + ?", OutputMode::Prefix),
            Err(PipelineError::Lex(LexError::InvalidCharacter { ch: '?', .. }))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            evaluate_line("", OutputMode::Numeric),
            Err(PipelineError::Parse(ParseError::ExpectedOperand {
                found: TokenKind::EndOfInput,
                ..
            }))
        ));
    }

    #[test]
    fn test_eval_error_only_in_numeric_mode() {
        assert_eq!(
            Err(PipelineError::Eval(EvalError::DivideByZero)),
            evaluate_line("5/(3-3)", OutputMode::Numeric)
        );
        assert_eq!(
            Ok("5 3 3 - /".to_string()),
            evaluate_line("5/(3-3)", OutputMode::Postfix)
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            OutputMode::from_str("Postfix", true),
            Ok(OutputMode::Postfix)
        );
        assert!(OutputMode::from_str("infix", true).is_err());
    }
}
