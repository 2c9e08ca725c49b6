use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unterminated tag at {pos}")]
    UnterminatedTag { pos: usize },

    #[error("Unterminated comment at {pos}")]
    UnterminatedComment { pos: usize },
}
