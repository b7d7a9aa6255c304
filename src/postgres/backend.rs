//! Postgres backend messages.
//!
//! Parsers are strict: every decode consumes its whole body, short
//! frames fail with [`ClientError::ProtocolValue`] and trailing bytes
//! with [`ClientError::ExtraBytes`].
use bytes::Bytes;

use crate::{
    common::ByteStr,
    error::{ClientError, Diagnostic, Result},
    ext::BytesReadExt,
    postgres::{Oid, PgFormat},
};

/// A type that can be decoded from a postgres backend message body.
pub trait BackendDecode: Sized {
    /// Message type byte.
    const MSGTYPE: u8;

    /// Parses the message body, rejecting leftovers.
    fn decode(body: Bytes) -> Result<Self>;
}

/// Any backend message this client understands during exec traffic.
#[derive(Debug)]
pub enum BackendMessage {
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            /// Decodes a framed body by its message type byte.
            pub fn decode(msgtype: u8, body: Bytes) -> Result<Self> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name($name::decode(body)?),)*
                    _ => return Err(ClientError::UnknownMessage(msgtype)),
                };
                Ok(message)
            }

            /// Get the message name from a message type byte.
            ///
            /// Returns `"Unknown"` for unknown message types.
            pub fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }
    };
}

match_backend! {
    BindComplete,
    CloseComplete,
    CommandComplete,
    DataRow,
    EmptyQueryResponse,
    ErrorResponse,
    NoData,
    NoticeResponse,
    ParameterDescription,
    ParameterStatus,
    ParseComplete,
    PortalSuspended,
    ReadyForQuery,
    RowDescription,
}

/// One column of server-side row metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDescription {
    /// The field name.
    pub name: ByteStr,
    /// Table OID when the field is a table column, otherwise zero.
    pub table_oid: u32,
    /// Attribute number of the column, otherwise zero.
    pub column_attr: i16,
    /// The object ID of the field's data type.
    pub type_oid: Oid,
    /// The data type size; negative values denote variable width.
    pub type_len: i16,
    /// The type modifier, meaning is type-specific.
    pub type_modifier: i32,
    /// The format code being used for the field.
    ///
    /// In a RowDescription returned from the statement variant of
    /// Describe, the format code is not yet known and is always text.
    pub format: PgFormat,
}

impl FieldDescription {
    fn parse(body: &mut Bytes) -> Result<Self> {
        Ok(Self {
            name: body.read_nul_bytestr()?,
            table_oid: body.read_u32()?,
            column_attr: body.read_i16()?,
            type_oid: body.read_u32()?,
            type_len: body.read_i16()?,
            type_modifier: body.read_i32()?,
            format: PgFormat::from_code(body.read_u16()?)?,
        })
    }
}

/// Identifies the message as a row description.
#[derive(Debug, Clone, Default)]
pub struct RowDescription {
    /// The fields of the row, in server order.
    pub fields: Vec<FieldDescription>,
}

impl BackendDecode for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode(mut body: Bytes) -> Result<Self> {
        let len = body.read_u16()?;
        let mut fields = Vec::with_capacity(len as usize);
        for _ in 0..len {
            fields.push(FieldDescription::parse(&mut body)?);
        }
        body.finish()?;
        Ok(Self { fields })
    }
}

/// Identifies the message as a data row.
///
/// Absent column values represent SQL NULL.
#[derive(Debug, Clone, Default)]
pub struct DataRow {
    /// The column values, in server order.
    pub columns: Vec<Option<Bytes>>,
}

impl BackendDecode for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode(mut body: Bytes) -> Result<Self> {
        let len = body.read_u16()?;
        let mut columns = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let value_len = body.read_i32()?;
            let value = match value_len {
                -1 => None,
                n if n < 0 => return Err(ClientError::ProtocolValue),
                n => Some(body.read_bytes(n as usize)?),
            };
            columns.push(value);
        }
        body.finish()?;
        Ok(Self { columns })
    }
}

/// Identifies the message as a command-completed response.
#[derive(Debug, Clone, Default)]
pub struct CommandComplete {
    /// The command tag, e.g. `SELECT 3` or `INSERT 0 1`.
    pub tag: ByteStr,
}

impl CommandComplete {
    /// Number of rows the command touched, zero when the tag does not
    /// carry one.
    pub fn rows_affected(&self) -> u64 {
        let mut words = self.tag.split_whitespace();
        let Some(tag) = words.next() else {
            return 0;
        };
        let Some(rows) = words.next() else {
            return 0;
        };
        match tag {
            // INSERT tags are `INSERT <oid> <rows>`
            "INSERT" => words.next().unwrap_or_default(),
            "SELECT" | "UPDATE" | "DELETE" | "MERGE" | "FETCH" | "MOVE" | "COPY" => rows,
            _ => return 0,
        }
        .parse()
        .unwrap_or_default()
    }
}

impl BackendDecode for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode(mut body: Bytes) -> Result<Self> {
        let tag = body.read_nul_bytestr()?;
        body.finish()?;
        Ok(Self { tag })
    }
}

/// Identifies the message as a parameter description.
#[derive(Debug, Clone, Default)]
pub struct ParameterDescription {
    /// Data type OIDs of the statement's parameters.
    pub type_oids: Vec<Oid>,
}

impl BackendDecode for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode(mut body: Bytes) -> Result<Self> {
        let len = body.read_u16()?;
        let mut type_oids = Vec::with_capacity(len as usize);
        for _ in 0..len {
            type_oids.push(body.read_u32()?);
        }
        body.finish()?;
        Ok(Self { type_oids })
    }
}

/// Identifies the message as a run-time parameter status report.
#[derive(Debug, Clone)]
pub struct ParameterStatus {
    /// The name of the run-time parameter being reported.
    pub name: ByteStr,
    /// The current value of the parameter.
    pub value: ByteStr,
}

impl BackendDecode for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode(mut body: Bytes) -> Result<Self> {
        let status = Self {
            name: body.read_nul_bytestr()?,
            value: body.read_nul_bytestr()?,
        };
        body.finish()?;
        Ok(status)
    }
}

/// Identifies the message as an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorResponse {
    /// The structured diagnostic fields.
    pub diag: Diagnostic,
}

impl BackendDecode for ErrorResponse {
    const MSGTYPE: u8 = b'E';

    fn decode(body: Bytes) -> Result<Self> {
        Ok(Self { diag: Diagnostic::parse(body)? })
    }
}

/// A warning message; shares the field layout of [`ErrorResponse`].
#[derive(Debug, Clone, Default)]
pub struct NoticeResponse {
    /// The structured diagnostic fields.
    pub diag: Diagnostic,
}

impl BackendDecode for NoticeResponse {
    const MSGTYPE: u8 = b'N';

    fn decode(body: Bytes) -> Result<Self> {
        Ok(Self { diag: Diagnostic::parse(body)? })
    }
}

/// Backend transaction status, reported by [`ReadyForQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendStatus {
    /// Idle, not in a transaction block.
    #[default]
    Idle,
    /// In a transaction block.
    Transaction,
    /// In a failed transaction block; queries are rejected until the
    /// block ends.
    FailedTransaction,
}

/// ReadyForQuery is sent whenever the backend is ready for a new query
/// cycle.
#[derive(Debug, Clone, Copy)]
pub struct ReadyForQuery {
    /// Current backend transaction status.
    pub status: BackendStatus,
}

impl BackendDecode for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode(mut body: Bytes) -> Result<Self> {
        let status = match body.read_u8()? {
            b'I' => BackendStatus::Idle,
            b'T' => BackendStatus::Transaction,
            b'E' => BackendStatus::FailedTransaction,
            _ => return Err(ClientError::ProtocolValue),
        };
        body.finish()?;
        Ok(Self { status })
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl BackendDecode for $name {
            const MSGTYPE: u8 = $ty;

            fn decode(body: Bytes) -> Result<Self> {
                body.finish()?;
                Ok(Self)
            }
        }
    )*};
}

unit_msg! {
    /// Identifies the message as a Parse-complete indicator.
    struct ParseComplete, b'1';

    /// Identifies the message as a Bind-complete indicator.
    struct BindComplete, b'2';

    /// Identifies the message as a Close-complete indicator.
    struct CloseComplete, b'3';

    /// Identifies the message as a response to an empty query string.
    ///
    /// This substitutes for CommandComplete.
    struct EmptyQueryResponse, b'I';

    /// Identifies the message as a no-data indicator.
    struct NoData, b'n';

    /// Identifies the message as a portal-suspended indicator.
    ///
    /// Only appears when an Execute row-count limit was reached.
    struct PortalSuspended, b's';
}
