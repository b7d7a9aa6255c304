use crate::error::{ClientError, Result};

/// Postgres data transmission format.
///
/// As of PostgreSQL 7.4 the only supported formats are "text" and
/// "binary". Text has format code zero, binary has format code one.
///
/// Clients specify a format code for each transmitted parameter value
/// and for each column of a query result.
///
/// <https://www.postgresql.org/docs/current/protocol-overview.html#PROTOCOL-FORMAT-CODES>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PgFormat {
    /// Text has format code zero.
    ///
    /// In the text representation there is no trailing nul character,
    /// and embedded nuls are not allowed.
    #[default]
    Text,
    /// Binary has format code one.
    ///
    /// Binary representations for integers use network byte order.
    /// Binary representations for complex data types might change
    /// across server versions.
    Binary,
}

impl PgFormat {
    /// Returns the wire format code.
    pub fn format_code(self) -> u16 {
        match self {
            PgFormat::Text => 0,
            PgFormat::Binary => 1,
        }
    }

    /// Parses a wire format code.
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0 => Ok(PgFormat::Text),
            1 => Ok(PgFormat::Binary),
            _ => Err(ClientError::ProtocolValue),
        }
    }
}
