//! Driving requests over a byte-stream transport.
//!
//! The core owns no sockets. A [`Connection`] wraps any
//! [`ByteStream`], typically a TCP stream on which startup and
//! authentication have already been completed by the surrounding
//! layer, and drives the exec state machine over it: write the
//! request payload, then read and route frames until every request
//! step has been answered.
mod exec;

use std::io;

use bytes::BytesMut;

use crate::{
    common::ByteStr,
    error::{Diagnostic, ExtendedError},
    postgres::{BackendStatus, frontend},
    request::Request,
    response::ResponseHandler,
};

use exec::{ExecFsm, Step};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// The transport contract the core consumes.
///
/// No message boundary guarantees: `read_some` appends whatever is
/// available to the buffer and frames are extracted opportunistically.
/// With the `tokio` feature, every `AsyncRead + AsyncWrite` transport
/// implements this.
pub trait ByteStream {
    /// Writes the whole buffer.
    fn write_all<'a>(
        &'a mut self,
        buf: &'a [u8],
    ) -> impl Future<Output = io::Result<()>> + use<'a, Self>;

    /// Reads some bytes into `buf`, returning how many arrived; zero
    /// means the peer closed the stream.
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut BytesMut,
    ) -> impl Future<Output = io::Result<usize>> + use<'a, Self>;
}

#[cfg(feature = "tokio")]
impl<S> ByteStream for S
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    fn write_all<'a>(
        &'a mut self,
        buf: &'a [u8],
    ) -> impl Future<Output = io::Result<()>> + use<'a, S> {
        tokio::io::AsyncWriteExt::write_all(self, buf)
    }

    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut BytesMut,
    ) -> impl Future<Output = io::Result<usize>> + use<'a, S> {
        tokio::io::AsyncReadExt::read_buf(self, buf)
    }
}

/// Per-connection scratch state.
///
/// The exec machinery treats this as opaque beyond its fields: buffers
/// for the two directions, the last server notice, and the latest
/// backend status summary.
#[derive(Debug)]
pub struct ConnectionState {
    pub(crate) read_buf: BytesMut,
    pub(crate) write_buf: BytesMut,
    pub(crate) last_notice: Option<Diagnostic>,
    pub(crate) status: BackendStatus,
    params: Vec<(ByteStr, ByteStr)>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            last_notice: None,
            status: BackendStatus::Idle,
            params: Vec::new(),
        }
    }

    pub(crate) fn set_parameter(&mut self, name: ByteStr, value: ByteStr) {
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.params.push((name, value)),
        }
    }

    /// The latest reported value of a run-time parameter, such as
    /// `server_version` or `TimeZone`.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| *n == *name)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// A postgres connection over an established, authenticated stream.
pub struct Connection<S> {
    stream: S,
    state: ConnectionState,
}

impl<S: ByteStream> Connection<S> {
    /// Wraps a stream on which the startup sequence has already been
    /// completed.
    pub fn new(stream: S) -> Self {
        Self { stream, state: ConnectionState::new() }
    }

    /// Submits a request and routes the reply traffic into `handler`.
    ///
    /// On success, each handler holds its accumulated results. The
    /// returned error is either a transport/framing failure or the
    /// first handler error; rows decoded before the first error remain
    /// delivered. After a transport error the connection is unusable.
    pub async fn exec<H: ResponseHandler>(
        &mut self,
        req: &Request,
        handler: &mut H,
    ) -> Result<(), ExtendedError> {
        let mut fsm = ExecFsm::new(req, handler).map_err(ExtendedError::from_code)?;
        let mut io_result: io::Result<usize> = Ok(0);
        loop {
            match fsm.resume(&mut self.state, handler, io_result) {
                Step::Write(bytes) => {
                    io_result = self.stream.write_all(bytes).await.map(|()| 0);
                }
                Step::Read => {
                    io_result = self.stream.read_some(&mut self.state.read_buf).await;
                }
                Step::Done(Err(code)) => return Err(ExtendedError::from_code(code)),
                Step::Done(Ok(())) => return handler.result().clone().into_result(),
            }
        }
    }

    /// The backend status reported by the latest ReadyForQuery.
    pub fn status(&self) -> BackendStatus {
        self.state.status
    }

    /// The last NoticeResponse the server sent, if any.
    pub fn last_notice(&self) -> Option<&Diagnostic> {
        self.state.last_notice.as_ref()
    }

    /// Connection-level scratch state, including run-time parameters.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Sends the termination notice and drops the stream.
    pub async fn terminate(mut self) -> io::Result<()> {
        self.state.write_buf.clear();
        frontend::write(&frontend::Terminate, &mut self.state.write_buf)
            .expect("Terminate is statically valid");
        let buf = self.state.write_buf.split();
        self.stream.write_all(&buf).await
    }
}
