//! Client error taxonomy and server diagnostics.
use std::io;

use bytes::Bytes;

use crate::{common::ByteStr, ext::BytesReadExt};

/// A specialized [`Result`] type for fallible protocol operations.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// All error conditions the client core can report.
///
/// The set is closed; richer context travels separately in a
/// [`Diagnostic`] when the server supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Ill-formed or wrong-length wire value.
    #[error("ill-formed or wrong-length wire value")]
    ProtocolValue,
    /// Trailing bytes after a complete parse.
    #[error("trailing bytes after a complete parse")]
    ExtraBytes,
    /// NULL arrived where the target field is non-nullable.
    #[error("unexpected NULL value")]
    UnexpectedNull,
    /// Column type OID is not admissible for the target field type.
    #[error("column type is incompatible with the target field type")]
    IncompatibleFieldType,
    /// A declared row field has no matching server column.
    #[error("declared row field not found in the row description")]
    FieldNotFound,
    /// The request shape does not match what the handler expects.
    #[error("request shape is incompatible with the response handler")]
    IncompatibleResponseType,
    /// An expected step was suppressed by an earlier server error.
    #[error("step skipped due to an earlier error")]
    StepSkipped,
    /// The server returned an ErrorResponse.
    #[error("server returned an error response")]
    ExecServerError,
    /// The server sent a message type this client does not know.
    #[error("unknown backend message type {0:#04x}")]
    UnknownMessage(u8),
    /// The transport failed.
    #[error("i/o failure: {0:?}")]
    Io(io::ErrorKind),
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind())
    }
}

/// Structured fields of a server `ErrorResponse` or `NoticeResponse`.
///
/// Field meanings are defined by the protocol error-fields table.
/// Unrecognized field codes are skipped, as the protocol requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    /// `ERROR`, `FATAL` or `PANIC`, or a notice severity.
    pub severity: Option<ByteStr>,
    /// SQLSTATE code, e.g. `42P01`.
    pub code: Option<ByteStr>,
    /// Primary human-readable message.
    pub message: Option<ByteStr>,
    /// Optional secondary message.
    pub detail: Option<ByteStr>,
    /// Optional suggestion for fixing the issue.
    pub hint: Option<ByteStr>,
    /// Error cursor position within the original query string.
    pub position: Option<ByteStr>,
    /// Cursor position within an internally generated command.
    pub internal_position: Option<ByteStr>,
    /// Text of a failed internally generated command.
    pub internal_query: Option<ByteStr>,
    /// Context in which the error occurred.
    pub where_context: Option<ByteStr>,
    /// Schema name associated with the error.
    pub schema: Option<ByteStr>,
    /// Table name associated with the error.
    pub table: Option<ByteStr>,
    /// Column name associated with the error.
    pub column: Option<ByteStr>,
    /// Data type name associated with the error.
    pub data_type: Option<ByteStr>,
    /// Constraint name associated with the error.
    pub constraint: Option<ByteStr>,
    /// Source file that reported the error.
    pub file: Option<ByteStr>,
    /// Source line that reported the error.
    pub line: Option<ByteStr>,
    /// Source routine that reported the error.
    pub routine: Option<ByteStr>,
}

impl Diagnostic {
    /// Parses the field list of an `ErrorResponse`/`NoticeResponse` body.
    pub(crate) fn parse(mut body: Bytes) -> Result<Self> {
        let mut diag = Diagnostic::default();
        loop {
            let field = body.read_u8()?;
            if field == 0 {
                break;
            }
            let value = body.read_nul_bytestr()?;
            match field {
                b'S' => diag.severity = Some(value),
                b'C' => diag.code = Some(value),
                b'M' => diag.message = Some(value),
                b'D' => diag.detail = Some(value),
                b'H' => diag.hint = Some(value),
                b'P' => diag.position = Some(value),
                b'p' => diag.internal_position = Some(value),
                b'q' => diag.internal_query = Some(value),
                b'W' => diag.where_context = Some(value),
                b's' => diag.schema = Some(value),
                b't' => diag.table = Some(value),
                b'c' => diag.column = Some(value),
                b'd' => diag.data_type = Some(value),
                b'n' => diag.constraint = Some(value),
                b'F' => diag.file = Some(value),
                b'L' => diag.line = Some(value),
                b'R' => diag.routine = Some(value),
                // Frontends must silently ignore fields of unrecognized type
                _ => {}
            }
        }
        body.finish()?;
        Ok(diag)
    }

    /// Returns `true` when no field was populated.
    pub fn is_empty(&self) -> bool {
        *self == Diagnostic::default()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.severity, &self.code, &self.message) {
            (Some(sev), Some(code), Some(msg)) => write!(f, "{sev} {code}: {msg}"),
            (_, _, Some(msg)) => f.write_str(msg),
            _ => f.write_str("<no diagnostic>"),
        }
    }
}

/// The outcome of an exec attempt: an error code plus, when the failure
/// originated server-side, the structured diagnostic.
///
/// A value with no code means success. Handlers accumulate the first
/// error they see; later errors are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedError {
    /// The error kind, or `None` on success.
    pub code: Option<ClientError>,
    /// Server-side context, empty unless the server supplied one.
    pub diag: Diagnostic,
}

impl ExtendedError {
    /// Builds a failed value with no diagnostic.
    pub fn from_code(code: ClientError) -> Self {
        Self { code: Some(code), diag: Diagnostic::default() }
    }

    /// Returns `true` when an error code is present.
    pub fn is_err(&self) -> bool {
        self.code.is_some()
    }

    /// Records `code` unless an earlier error is already stored.
    pub fn store(&mut self, code: ClientError) {
        if self.code.is_none() {
            self.code = Some(code);
            self.diag = Diagnostic::default();
        }
    }

    /// Records `code` with a server diagnostic, first error wins.
    pub fn store_with(&mut self, code: ClientError, diag: Diagnostic) {
        if self.code.is_none() {
            self.code = Some(code);
            self.diag = diag;
        }
    }

    /// Converts into a `Result`, keeping `self` as the error payload.
    pub fn into_result(self) -> Result<(), ExtendedError> {
        match self.code {
            Some(_) => Err(self),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ExtendedError {}

impl std::fmt::Display for ExtendedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) if !self.diag.is_empty() => write!(f, "{code}: {}", self.diag),
            Some(code) => code.fmt(f),
            None => f.write_str("ok"),
        }
    }
}

impl From<ClientError> for ExtendedError {
    fn from(code: ClientError) -> Self {
        Self::from_code(code)
    }
}
