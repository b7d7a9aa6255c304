//! Postgres frontend messages.
//!
//! All struct fields here mirror the actual message sent to the server.
//! Serialization is two-phase: [`FrontendMessage::size_hint`] validates
//! the message and computes the body length, then
//! [`FrontendMessage::encode`] writes exactly that many bytes. Nothing
//! touches the output buffer until validation has passed, which is what
//! gives the request builder its strong guarantee.
use bytes::{BufMut, BytesMut};

use crate::{
    error::{ClientError, Result},
    ext::{BufMutExt, StrExt, UsizeExt},
    param::ParamRef,
    postgres::{Oid, PgFormat},
    request::MessageTag,
};

// Other frontend messages, out of scope for this client:
// CancelRequest, CopyData('d'), CopyDone('c'), CopyFail('f'),
// FunctionCall('F'), GSSENCRequest, SASLInitialResponse('p'),
// SASLResponse('p'), SSLRequest, StartupMessage

/// A type which can be encoded into a postgres frontend message.
pub trait FrontendMessage {
    /// Message type byte.
    const MSGTYPE: u8;

    /// The logical tag recorded in a request's tag vector, or `None`
    /// for messages that never travel inside a request.
    const TAG: Option<MessageTag>;

    /// Size of the main body.
    ///
    /// This is only the size of the body, excluding the type byte and
    /// the length field. This is also the validation point: interior
    /// nul bytes and oversized counts fail here, before any write.
    fn size_hint(&self) -> Result<i32>;

    /// Writes the main body of the message.
    ///
    /// `buf` receives exactly the length returned from `size_hint`.
    fn encode(&self, buf: &mut impl BufMut);
}

/// Writes a frontend message to `buf`, framed.
pub(crate) fn write<M: FrontendMessage>(msg: &M, buf: &mut BytesMut) -> Result<()> {
    // msgtype + length
    const PREFIX: usize = 1 + 4;

    let size = msg.size_hint()?;
    let framed = size.checked_add(4).ok_or(ClientError::ProtocolValue)?;
    buf.reserve(PREFIX + size as usize);

    let offset = buf.len();
    buf.put_u8(M::MSGTYPE);
    buf.put_i32(framed);
    msg.encode(&mut *buf);

    debug_assert_eq!(
        buf.len() - offset,
        PREFIX + size as usize,
        "frontend message body does not match its size hint"
    );
    Ok(())
}

/// Whether a Describe or Close names a prepared statement or a portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Statement,
    Portal,
}

impl Target {
    fn as_byte(self) -> u8 {
        match self {
            Target::Statement => b'S',
            Target::Portal => b'P',
        }
    }
}

/// Identifies the message as a simple query.
#[derive(Debug)]
pub struct Query<'a> {
    /// The query string itself.
    pub sql: &'a str,
}

impl FrontendMessage for Query<'_> {
    const MSGTYPE: u8 = b'Q';
    const TAG: Option<MessageTag> = Some(MessageTag::Query);

    fn size_hint(&self) -> Result<i32> {
        self.sql.nul_string_len()
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_nul_string(self.sql);
    }
}

/// Identifies the message as a Parse command.
#[derive(Debug)]
pub struct Parse<'a> {
    /// Destination prepared statement name; an empty string selects
    /// the unnamed prepared statement.
    pub statement_name: &'a str,
    /// The query string to be parsed.
    pub sql: &'a str,
    /// Parameter data type OIDs the frontend wants to prespecify.
    ///
    /// A zero OID leaves the type unspecified.
    pub param_type_oids: &'a [Oid],
}

impl FrontendMessage for Parse<'_> {
    const MSGTYPE: u8 = b'P';
    const TAG: Option<MessageTag> = Some(MessageTag::Parse);

    fn size_hint(&self) -> Result<i32> {
        let oids = self.param_type_oids.len().to_i16()? as i32;
        Ok(self.statement_name.nul_string_len()? + self.sql.nul_string_len()? + 2 + oids * 4)
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_nul_string(self.statement_name);
        buf.put_nul_string(self.sql);
        buf.put_i16(self.param_type_oids.len() as i16);
        for oid in self.param_type_oids {
            buf.put_u32(*oid);
        }
    }
}

/// Identifies the message as a Bind command.
#[derive(Debug)]
pub struct Bind<'a> {
    /// Destination portal name; empty selects the unnamed portal.
    pub portal_name: &'a str,
    /// Source prepared statement name; empty selects the unnamed one.
    pub statement_name: &'a str,
    /// Parameter format codes: empty means all-text, a single entry
    /// applies to every parameter, otherwise one entry per parameter.
    pub param_formats: &'a [PgFormat],
    /// The parameter values, length-prefixed on the wire; NULL is the
    /// special -1 length.
    pub params: &'a [ParamRef<'a>],
    /// The single format code applied to all result columns.
    pub result_format: PgFormat,
}

impl Bind<'_> {
    fn format_at(&self, index: usize) -> PgFormat {
        match self.param_formats {
            [] => PgFormat::Text,
            [single] => *single,
            many => many[index],
        }
    }
}

impl FrontendMessage for Bind<'_> {
    const MSGTYPE: u8 = b'B';
    const TAG: Option<MessageTag> = Some(MessageTag::Bind);

    fn size_hint(&self) -> Result<i32> {
        let fmts = self.param_formats.len().to_i16()? as i64;
        self.params.len().to_i16()?;
        if self.param_formats.len() > 1 && self.param_formats.len() != self.params.len() {
            return Err(ClientError::ProtocolValue);
        }

        let mut size = self.portal_name.nul_string_len()? as i64
            + self.statement_name.nul_string_len()? as i64
            + 2
            + fmts * 2
            + 2;
        for (i, param) in self.params.iter().enumerate() {
            size += 4 + param.payload_len(self.format_at(i))?.unwrap_or(0) as i64;
        }
        // result format count + the single entry
        size += 2 + 2;
        i32::try_from(size).map_err(|_| ClientError::ProtocolValue)
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_nul_string(self.statement_name);

        buf.put_i16(self.param_formats.len() as i16);
        for format in self.param_formats {
            buf.put_u16(format.format_code());
        }

        buf.put_i16(self.params.len() as i16);
        for (i, param) in self.params.iter().enumerate() {
            param.encode(self.format_at(i), &mut *buf);
        }

        buf.put_i16(1);
        buf.put_u16(self.result_format.format_code());
    }
}

/// Identifies the message as a Describe command.
#[derive(Debug)]
pub struct Describe<'a> {
    /// Statement or portal.
    pub target: Target,
    /// The name to describe; empty selects the unnamed one.
    pub name: &'a str,
}

impl FrontendMessage for Describe<'_> {
    const MSGTYPE: u8 = b'D';
    const TAG: Option<MessageTag> = Some(MessageTag::Describe);

    fn size_hint(&self) -> Result<i32> {
        Ok(1 + self.name.nul_string_len()?)
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.target.as_byte());
        buf.put_nul_string(self.name);
    }
}

/// Identifies the message as an Execute command.
#[derive(Debug)]
pub struct Execute<'a> {
    /// The portal to execute; empty selects the unnamed portal.
    pub portal_name: &'a str,
    /// Maximum number of rows to return, zero denotes "no limit".
    pub max_rows: i32,
}

impl FrontendMessage for Execute<'_> {
    const MSGTYPE: u8 = b'E';
    const TAG: Option<MessageTag> = Some(MessageTag::Execute);

    fn size_hint(&self) -> Result<i32> {
        Ok(self.portal_name.nul_string_len()? + 4)
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_i32(self.max_rows);
    }
}

/// Identifies the message as a Close command.
#[derive(Debug)]
pub struct Close<'a> {
    /// Statement or portal.
    pub target: Target,
    /// The name to close; empty selects the unnamed one.
    pub name: &'a str,
}

impl FrontendMessage for Close<'_> {
    const MSGTYPE: u8 = b'C';
    const TAG: Option<MessageTag> = Some(MessageTag::Close);

    fn size_hint(&self) -> Result<i32> {
        Ok(1 + self.name.nul_string_len()?)
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.target.as_byte());
        buf.put_nul_string(self.name);
    }
}

/// Identifies the message as a Sync command.
#[derive(Debug)]
pub struct Sync;

impl FrontendMessage for Sync {
    const MSGTYPE: u8 = b'S';
    const TAG: Option<MessageTag> = Some(MessageTag::Sync);

    fn size_hint(&self) -> Result<i32> {
        Ok(0)
    }

    fn encode(&self, _: &mut impl BufMut) {}
}

/// Identifies the message as a Flush command.
#[derive(Debug)]
pub struct Flush;

impl FrontendMessage for Flush {
    const MSGTYPE: u8 = b'H';
    const TAG: Option<MessageTag> = Some(MessageTag::Flush);

    fn size_hint(&self) -> Result<i32> {
        Ok(0)
    }

    fn encode(&self, _: &mut impl BufMut) {}
}

/// Identifies the message as a termination notice.
///
/// Sent when the connection is being closed gracefully; never part of
/// a request, so it carries no tag.
#[derive(Debug)]
pub struct Terminate;

impl FrontendMessage for Terminate {
    const MSGTYPE: u8 = b'X';
    const TAG: Option<MessageTag> = None;

    fn size_hint(&self) -> Result<i32> {
        Ok(0)
    }

    fn encode(&self, _: &mut impl BufMut) {}
}
