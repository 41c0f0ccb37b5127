use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Structural problems found in markup. The tolerant entry points recover
/// from all of these; only `parse_fragment_strict` reports them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unterminated comment starting at {pos}")]
    UnterminatedComment { pos: usize },

    #[error("Unterminated <{tag}> starting at {pos}")]
    UnterminatedRawText { pos: usize, tag: String },

    #[error("Unterminated tag <{tag}> starting at {pos}")]
    UnterminatedTag { pos: usize, tag: String },

    #[error("Unexpected </{tag}> at {pos}")]
    UnmatchedCloseTag { pos: usize, tag: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unterminated_comment(pos: usize) -> Self {
        Self::UnterminatedComment { pos }
    }

    pub fn unterminated_raw_text(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnterminatedRawText {
            pos,
            tag: tag.into(),
        }
    }

    pub fn unterminated_tag(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnterminatedTag {
            pos,
            tag: tag.into(),
        }
    }

    pub fn unmatched_close_tag(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnmatchedCloseTag {
            pos,
            tag: tag.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// Byte offset the problem was detected at
    pub fn pos(&self) -> usize {
        match self {
            Self::UnterminatedComment { pos }
            | Self::UnterminatedRawText { pos, .. }
            | Self::UnterminatedTag { pos, .. }
            | Self::UnmatchedCloseTag { pos, .. }
            | Self::LexerError { pos } => *pos,
        }
    }
}
