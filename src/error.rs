use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::panic::Location;

/// Coarse-grained failure category, kept alongside the free-form message so
/// callers can match on *kind* without parsing [`Display`] output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A bit or byte read ran past the end of the input.
    TruncatedInput,
    /// A Huffman table description was malformed or empty.
    InvalidTable,
    /// A back-reference length code was outside the defined range.
    InvalidLengthCode,
    /// A back-reference offset code was outside the defined range.
    InvalidOffsetCode,
    /// A back-reference pointed before the start of the output.
    BackReferenceOutOfRange,
    /// The DAT/MFT container header failed a structural check.
    BadArchiveHeader,
}

#[derive(Debug)]
pub struct DatError {
    pub kind: ErrorKind,
    pub message: Option<String>,
    pub context: Option<String>,
    pub source: Option<Box<dyn Error + Send + Sync>>,
    pub location: &'static Location<'static>,
}

pub type Res<T> = Result<T, DatError>;

impl Error for DatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.source {
            Some(ref err) => Some(err.deref()),
            None => None,
        }
    }
}

impl Display for DatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} at {}", self.kind, self.location)?;
        if let Some(context) = &self.context {
            write!(f, " ({})", context)?
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?
        }
        if let Some(cause) = &self.source {
            write!(f, "\ncaused by {}", cause)?
        }
        Ok(())
    }
}

impl From<DatError> for std::io::Error {
    fn from(value: DatError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value)
    }
}

#[derive(Default)]
pub(crate) struct ErrorBuilder {
    pub kind: Option<ErrorKind>,
    pub message: Option<String>,
    pub context: Option<String>,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl ErrorBuilder {
    pub fn kind(kind: ErrorKind) -> Self {
        ErrorBuilder {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Built with `#[track_caller]` so the reported [`Location`] points at the
/// call site that raised the error, not at this conversion.
impl From<ErrorBuilder> for DatError {
    #[track_caller]
    fn from(
        ErrorBuilder {
            kind,
            message,
            context,
            source,
        }: ErrorBuilder,
    ) -> Self {
        Self {
            kind: kind.unwrap_or(ErrorKind::TruncatedInput),
            message,
            context,
            source,
            location: Location::caller(),
        }
    }
}

pub(crate) trait WithContext<T, E: Error, C: ErrorContext> {
    fn at(self, context: &C) -> Result<T, ErrorBuilder>;
}

impl<T, E: Error + 'static + Send + Sync, C: ErrorContext> WithContext<T, E, C> for Result<T, E> {
    fn at(self, context: &C) -> Result<T, ErrorBuilder> {
        self.map_err(|e| ErrorBuilder {
            context: context.describe(),
            source: Some(Box::new(e)),
            ..Default::default()
        })
    }
}

pub(crate) trait ErrorContext {
    fn describe(&self) -> Option<String> {
        None
    }

    #[track_caller]
    fn raise<T>(&self, kind: ErrorKind, msg: impl Into<String>) -> Res<T> {
        Err(ErrorBuilder {
            kind: Some(kind),
            message: Some(msg.into()),
            context: self.describe(),
            ..Default::default()
        }
        .into())
    }

    #[track_caller]
    fn assert_le<T: PartialOrd + Display>(&self, kind: ErrorKind, l: T, r: T) -> Res<()> {
        if l <= r {
            Ok(())
        } else {
            self.raise(kind, format!("Expected {} <= {}", l, r))
        }
    }

    #[track_caller]
    fn assert_eq<T: PartialOrd + Display>(&self, kind: ErrorKind, l: T, r: T) -> Res<()> {
        if l == r {
            Ok(())
        } else {
            self.raise(kind, format!("Expected {} == {}", l, r))
        }
    }
}

/// A stateless [`ErrorContext`] for call sites with nothing useful to
/// describe beyond the error kind, message, and source location.
pub(crate) struct NullContext;
impl ErrorContext for NullContext {}
