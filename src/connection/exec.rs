//! The exec and routing state machines.
//!
//! [`ExecFsm`] is a resume-style machine: each call to
//! [`resume`][ExecFsm::resume] digests the previous I/O result and
//! returns the next intent. The surrounding driver owns the actual
//! I/O; the machine suspends exactly before every read and write.
use std::io;

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    connection::ConnectionState,
    error::{ClientError, Result},
    postgres::backend::{self, BackendMessage},
    request::{MessageTag, Request},
    response::{ResponseHandler, ResponseMessage},
};

/// The next I/O the driver must perform on behalf of the machine.
#[derive(Debug)]
pub(crate) enum Step<'a> {
    /// Write these bytes fully, then resume.
    Write(&'a [u8]),
    /// Read some bytes into the connection's read buffer, then resume.
    Read,
    /// The operation finished; `Err` carries a transport or framing
    /// failure, handler-level outcomes live in the handlers.
    Done(Result<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecState {
    Initial,
    Writing,
    Reading,
}

pub(crate) struct ExecFsm<'a> {
    req: &'a Request,
    state: ExecState,
    started_reading: bool,
    route: RouteFsm,
}

impl<'a> ExecFsm<'a> {
    /// Allocates handler regions; a setup failure aborts the exec
    /// before anything is written.
    pub fn new<H: ResponseHandler>(req: &'a Request, handler: &mut H) -> Result<Self> {
        let end = handler.setup(req, 0)?;
        if end != req.tags().len() {
            return Err(ClientError::IncompatibleResponseType);
        }
        Ok(Self {
            req,
            state: ExecState::Initial,
            started_reading: false,
            route: RouteFsm::new(),
        })
    }

    pub fn resume<H: ResponseHandler>(
        &mut self,
        st: &mut ConnectionState,
        handler: &mut H,
        io_result: io::Result<usize>,
    ) -> Step<'a> {
        let transferred = match io_result {
            Ok(n) => n,
            Err(err) => return Step::Done(Err(err.into())),
        };

        loop {
            match self.state {
                ExecState::Initial => {
                    if self.req.tags().is_empty() {
                        return Step::Done(Ok(()));
                    }
                    self.state = ExecState::Writing;
                    return Step::Write(self.req.payload());
                }
                ExecState::Writing => {
                    self.state = ExecState::Reading;
                    self.started_reading = false;
                }
                ExecState::Reading => {
                    if self.started_reading && transferred == 0 {
                        return Step::Done(Err(ClientError::Io(io::ErrorKind::UnexpectedEof)));
                    }
                    loop {
                        match next_frame(&mut st.read_buf) {
                            Err(err) => return Step::Done(Err(err)),
                            Ok(None) => break,
                            Ok(Some((msgtype, body))) => {
                                match self.route.on_frame(msgtype, body, st, self.req, handler) {
                                    Err(err) => return Step::Done(Err(err)),
                                    Ok(RouteProgress::Complete) => return Step::Done(Ok(())),
                                    Ok(RouteProgress::Continue) => {}
                                }
                            }
                        }
                    }
                    self.started_reading = true;
                    return Step::Read;
                }
            }
        }
    }
}

/// Extracts one complete frame from the read buffer, if available.
fn next_frame(buf: &mut BytesMut) -> Result<Option<(u8, Bytes)>> {
    // msgtype + length
    const HEADER: usize = 1 + 4;

    if buf.len() < HEADER {
        return Ok(None);
    }
    let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
    if len < 4 {
        return Err(ClientError::ProtocolValue);
    }
    let total = 1 + len as usize;
    if buf.len() < total {
        buf.reserve(total - buf.len());
        return Ok(None);
    }

    let mut frame = buf.split_to(total).freeze();
    let msgtype = frame.get_u8();
    frame.advance(4);
    Ok(Some((msgtype, frame)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteProgress {
    Continue,
    Complete,
}

/// Walks the request tag vector, pairing each inbound message with
/// the request step it answers and forwarding it at that offset.
///
/// After a server error the remaining steps up to the next Sync are
/// suppressed server-side; this machine injects the synthetic
/// [`ResponseMessage::Skipped`] for each of them and then discards
/// traffic until the Sync's ReadyForQuery arrives.
struct RouteFsm {
    index: usize,
    awaiting_ready: bool,
}

impl RouteFsm {
    fn new() -> Self {
        Self { index: 0, awaiting_ready: false }
    }

    fn skip_flushes(&mut self, tags: &[MessageTag]) {
        while matches!(tags.get(self.index), Some(MessageTag::Flush)) {
            self.index += 1;
        }
    }

    fn progress(&mut self, tags: &[MessageTag]) -> RouteProgress {
        self.skip_flushes(tags);
        if self.index == tags.len() {
            RouteProgress::Complete
        } else {
            RouteProgress::Continue
        }
    }

    fn on_frame<H: ResponseHandler>(
        &mut self,
        msgtype: u8,
        body: Bytes,
        st: &mut ConnectionState,
        req: &Request,
        handler: &mut H,
    ) -> Result<RouteProgress> {
        tracing::trace!(kind = BackendMessage::message_name(msgtype), "frame received");
        let msg = BackendMessage::decode(msgtype, body)?;

        // asynchronous traffic, valid at any point
        let msg = match msg {
            BackendMessage::NoticeResponse(notice) => {
                tracing::debug!(notice = %notice.diag, "server notice");
                st.last_notice = Some(notice.diag);
                return Ok(self.progress(req.tags()));
            }
            BackendMessage::ParameterStatus(status) => {
                tracing::debug!(name = %status.name, value = %status.value, "parameter status");
                st.set_parameter(status.name, status.value);
                return Ok(self.progress(req.tags()));
            }
            other => other,
        };

        let tags = req.tags();
        self.skip_flushes(tags);
        if self.index == tags.len() {
            // traffic past the last claimed tag
            return Err(ClientError::ProtocolValue);
        }

        if self.awaiting_ready {
            // discard everything the server flushed before the Sync
            if let BackendMessage::ReadyForQuery(ready) = msg {
                st.status = ready.status;
                self.awaiting_ready = false;
                self.index += 1;
            }
            return Ok(self.progress(tags));
        }

        match (tags[self.index], msg) {
            (_, BackendMessage::ErrorResponse(err)) => {
                self.on_error(err, tags, handler);
            }

            (MessageTag::Parse, BackendMessage::ParseComplete(_)) => {
                self.forward(handler, ResponseMessage::ParseComplete, true);
            }
            (MessageTag::Bind, BackendMessage::BindComplete(_)) => {
                self.forward(handler, ResponseMessage::BindComplete, true);
            }
            (MessageTag::Close, BackendMessage::CloseComplete(_)) => {
                self.forward(handler, ResponseMessage::CloseComplete, true);
            }

            (MessageTag::Describe, BackendMessage::ParameterDescription(desc)) => {
                self.forward(handler, ResponseMessage::ParameterDescription(desc), false);
            }
            (MessageTag::Describe, BackendMessage::RowDescription(meta)) => {
                self.forward(handler, ResponseMessage::RowDescription(meta), true);
            }
            // the portal produces no rows; there is nothing to hand over
            (MessageTag::Describe, BackendMessage::NoData(_)) => {
                self.index += 1;
            }

            (MessageTag::Execute, BackendMessage::DataRow(row)) => {
                self.forward(handler, ResponseMessage::DataRow(row), false);
            }
            (MessageTag::Execute, BackendMessage::CommandComplete(cmd)) => {
                self.forward(handler, ResponseMessage::CommandComplete(cmd), true);
            }
            (MessageTag::Execute, BackendMessage::PortalSuspended(_)) => {
                self.forward(handler, ResponseMessage::PortalSuspended, true);
            }
            (MessageTag::Execute, BackendMessage::EmptyQueryResponse(_)) => {
                self.forward(handler, ResponseMessage::EmptyQueryResponse, true);
            }

            (MessageTag::Query, BackendMessage::RowDescription(meta)) => {
                self.forward(handler, ResponseMessage::RowDescription(meta), false);
            }
            (MessageTag::Query, BackendMessage::DataRow(row)) => {
                self.forward(handler, ResponseMessage::DataRow(row), false);
            }
            (MessageTag::Query, BackendMessage::CommandComplete(cmd)) => {
                self.forward(handler, ResponseMessage::CommandComplete(cmd), false);
            }
            (MessageTag::Query, BackendMessage::EmptyQueryResponse(_)) => {
                self.forward(handler, ResponseMessage::EmptyQueryResponse, false);
            }
            (MessageTag::Query, BackendMessage::ReadyForQuery(ready)) => {
                st.status = ready.status;
                self.index += 1;
            }

            (MessageTag::Sync, BackendMessage::ReadyForQuery(ready)) => {
                st.status = ready.status;
                self.index += 1;
            }

            // out-of-order or unexpected traffic
            _ => return Err(ClientError::ProtocolValue),
        }

        Ok(self.progress(tags))
    }

    fn forward<H: ResponseHandler>(&mut self, handler: &mut H, msg: ResponseMessage, advance: bool) {
        handler.on_message(&msg, self.index);
        if advance {
            self.index += 1;
        }
    }

    /// Forwards the error at the current step, then synthesizes
    /// Skipped for every suppressed step up to the next Sync.
    fn on_error<H: ResponseHandler>(
        &mut self,
        err: backend::ErrorResponse,
        tags: &[MessageTag],
        handler: &mut H,
    ) {
        handler.on_message(&ResponseMessage::Error(err), self.index);

        if tags[self.index] == MessageTag::Query {
            // a failed simple query is still terminated by its own
            // ReadyForQuery; nothing after it is suppressed
            self.awaiting_ready = true;
            return;
        }

        self.index += 1;
        while let Some(tag) = tags.get(self.index) {
            match tag {
                MessageTag::Sync => {
                    self.awaiting_ready = true;
                    return;
                }
                // flushes never expected a response
                MessageTag::Flush => self.index += 1,
                _ => {
                    handler.on_message(&ResponseMessage::Skipped, self.index);
                    self.index += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn next_frame_needs_a_full_header_and_body() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'Z', 0, 0, 0]);
        assert!(matches!(next_frame(&mut buf), Ok(None)));

        buf.extend_from_slice(&[5]); // length 5: one body byte
        assert!(matches!(next_frame(&mut buf), Ok(None)));

        buf.extend_from_slice(b"I");
        let (msgtype, body) = next_frame(&mut buf).unwrap().unwrap();
        assert_eq!(msgtype, b'Z');
        assert_eq!(&body[..], b"I");
        assert!(buf.is_empty());
    }

    #[test]
    fn next_frame_rejects_undersized_lengths() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'Z', 0, 0, 0, 3]);
        assert_eq!(next_frame(&mut buf).unwrap_err(), ClientError::ProtocolValue);
    }
}
