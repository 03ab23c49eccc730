use std::{ops::Range, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for weft-syntax operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting.
///
/// Carries the script content and filename so the lexer and parser can
/// build located errors without passing both around.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    /// Create a new source context.
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    /// Get the source content.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Get the filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Create a NamedSource for miette error reporting.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    /// Create a syntax error covering `span`.
    pub fn syntax_error(&self, message: impl Into<String>, span: Range<usize>) -> Box<Error> {
        let start = span.start.min(self.src.len());
        let len = span.end.saturating_sub(span.start).min(self.src.len() - start);
        Box::new(Error::Syntax {
            src: self.named_source(),
            span: SourceSpan::from((start, len)),
            message: message.into(),
        })
    }

    /// Create a syntax error at the end of the source.
    pub fn eof_error(&self, message: impl Into<String>) -> Box<Error> {
        let end = self.src.len();
        self.syntax_error(message, end..end)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not valid UTF-8")]
    #[diagnostic(code(weft::decode_error))]
    Decode { path: PathBuf },

    #[error("{message}")]
    #[diagnostic(
        code(weft::syntax_error),
        help("extension scripts are screened without being executed; fix the syntax to load them")
    )]
    Syntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },
}

impl Error {
    /// Check if this is a syntax error.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }
}
