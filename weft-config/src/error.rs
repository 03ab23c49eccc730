use std::{ops::Range, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The weft.toml text being validated, so errors can point into it.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        Box::new(Error::Parse {
            span: source.span().map(SourceSpan::from),
            src: self.source(),
            source,
        })
    }

    /// A rule that spans the whole document, such as a missing table.
    pub fn validation_error(&self, message: impl Into<String>) -> Box<Error> {
        self.invalid(message.into(), None)
    }

    pub fn validation_error_at(&self, message: impl Into<String>, span: Range<usize>) -> Box<Error> {
        self.invalid(message.into(), Some(span))
    }

    fn invalid(&self, message: String, span: Option<Range<usize>>) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.source(),
            span: span.map(SourceSpan::from),
            message,
        })
    }

    pub fn reserved_name_error(&self, name: impl Into<String>, span: Range<usize>) -> Box<Error> {
        Box::new(Error::ReservedName {
            src: self.source(),
            span: Some(span.into()),
            name: name.into(),
        })
    }

    /// `context` says which kind of name was rejected, e.g. "project".
    pub fn invalid_identifier_error(
        &self,
        name: impl Into<String>,
        context: impl Into<String>,
        reason: impl Into<String>,
        span: Range<usize>,
    ) -> Box<Error> {
        Box::new(Error::InvalidIdentifier {
            src: self.source(),
            span: Some(span.into()),
            name: name.into(),
            context: context.into(),
            reason: reason.into(),
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(help("create a weft.toml with a [project] table naming the project"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse weft.toml")]
    #[diagnostic(code(weft::parse_error))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(weft::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("'{name}' is a reserved project name")]
    #[diagnostic(
        code(weft::reserved_name),
        help("extensions are qualified by the project name; pick a name other than '{name}'")
    )]
    ReservedName {
        #[source_code]
        src: NamedSource<String>,
        #[label("reserved")]
        span: Option<SourceSpan>,
        name: String,
    },

    #[error("invalid {context} name '{name}'")]
    #[diagnostic(help(
        "{reason}. Use only letters, numbers, underscores and dashes, starting with a letter or underscore."
    ))]
    InvalidIdentifier {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a valid name")]
        span: Option<SourceSpan>,
        name: String,
        context: String,
        reason: String,
    },
}
