//! Response routing and result-set handling.
//!
//! A request's tag vector is split into per-handler regions before
//! submission: each handler's [`setup`][ResponseHandler::setup] claims
//! a prefix of the remaining tags and returns the exclusive end
//! offset. During exec, every inbound message carries the tag offset
//! it is answering; the [`Response`] router compares it against the
//! claimed regions and forwards to the owning handler.
use std::marker::PhantomData;

use crate::{
    error::{ClientError, ExtendedError, Result},
    postgres::{
        FieldDescription,
        backend::{CommandComplete, DataRow, ErrorResponse, ParameterDescription, RowDescription},
    },
    request::{MessageTag, Request},
    row::{FieldVisitor, RowSchema},
    types::FieldDecode,
};

/// Any inbound message a response handler can receive.
///
/// [`Skipped`][ResponseMessage::Skipped] is synthetic: it never
/// appears on the wire, and is injected when a prior server error
/// caused this step's expected message to be suppressed.
#[derive(Debug)]
pub enum ResponseMessage {
    ParseComplete,
    BindComplete,
    CloseComplete,
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    RowDescription(RowDescription),
    ParameterDescription(ParameterDescription),
    EmptyQueryResponse,
    PortalSuspended,
    Error(ErrorResponse),
    Skipped,
}

impl ResponseMessage {
    /// The variant name, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParseComplete => "ParseComplete",
            Self::BindComplete => "BindComplete",
            Self::CloseComplete => "CloseComplete",
            Self::CommandComplete(_) => "CommandComplete",
            Self::DataRow(_) => "DataRow",
            Self::RowDescription(_) => "RowDescription",
            Self::ParameterDescription(_) => "ParameterDescription",
            Self::EmptyQueryResponse => "EmptyQueryResponse",
            Self::PortalSuspended => "PortalSuspended",
            Self::Error(_) => "ErrorResponse",
            Self::Skipped => "Skipped",
        }
    }
}

/// A consumer of one region of the server's reply traffic.
pub trait ResponseHandler {
    /// Claims this handler's region of the request.
    ///
    /// `offset` is where the previous handler's region ended; the
    /// returned value is the exclusive end of this handler's region,
    /// in tag units. Setup errors abort the whole exec.
    fn setup(&mut self, req: &Request, offset: usize) -> Result<usize>;

    /// Receives one inbound message, with the tag offset it answers.
    fn on_message(&mut self, msg: &ResponseMessage, offset: usize);

    /// The accumulated outcome; empty means success.
    fn result(&self) -> &ExtendedError;
}

/// A compile-time heterogeneous list of response handlers.
///
/// Implemented for tuples of one up to eight handlers.
pub trait HandlerList {
    const LEN: usize;

    fn setup_nth(&mut self, index: usize, req: &Request, offset: usize) -> Result<usize>;
    fn on_message_nth(&mut self, index: usize, msg: &ResponseMessage, offset: usize);
    fn result_nth(&self, index: usize) -> &ExtendedError;
}

macro_rules! handler_tuple {
    ($n:literal; $($t:ident . $i:tt),*) => {
        impl<$($t: ResponseHandler),*> HandlerList for ($($t,)*) {
            const LEN: usize = $n;

            fn setup_nth(&mut self, index: usize, req: &Request, offset: usize) -> Result<usize> {
                match index {
                    $($i => self.$i.setup(req, offset),)*
                    _ => unreachable!("handler index out of range"),
                }
            }

            fn on_message_nth(&mut self, index: usize, msg: &ResponseMessage, offset: usize) {
                match index {
                    $($i => self.$i.on_message(msg, offset),)*
                    _ => unreachable!("handler index out of range"),
                }
            }

            fn result_nth(&self, index: usize) -> &ExtendedError {
                match index {
                    $($i => self.$i.result(),)*
                    _ => unreachable!("handler index out of range"),
                }
            }
        }
    };
}

handler_tuple!(1; H0.0);
handler_tuple!(2; H0.0, H1.1);
handler_tuple!(3; H0.0, H1.1, H2.2);
handler_tuple!(4; H0.0, H1.1, H2.2, H3.3);
handler_tuple!(5; H0.0, H1.1, H2.2, H3.3, H4.4);
handler_tuple!(6; H0.0, H1.1, H2.2, H3.3, H4.4, H5.5);
handler_tuple!(7; H0.0, H1.1, H2.2, H3.3, H4.4, H5.5, H6.6);
handler_tuple!(8; H0.0, H1.1, H2.2, H3.3, H4.4, H5.5, H6.6, H7.7);

/// Routes reply traffic across an ordered list of handlers.
///
/// Implements [`ResponseHandler`] itself, so a whole `Response` can be
/// submitted wherever a single handler is expected.
#[derive(Debug)]
pub struct Response<H> {
    handlers: H,
    offsets: Vec<usize>,
    current: usize,
}

impl<H: HandlerList> Response<H> {
    pub fn new(handlers: H) -> Self {
        Self { handlers, offsets: vec![0; H::LEN], current: 0 }
    }

    pub fn handlers(&self) -> &H {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut H {
        &mut self.handlers
    }

    pub fn into_handlers(self) -> H {
        self.handlers
    }
}

impl<H: HandlerList> ResponseHandler for Response<H> {
    fn setup(&mut self, req: &Request, mut offset: usize) -> Result<usize> {
        for i in 0..H::LEN {
            offset = self.handlers.setup_nth(i, req, offset)?;
            self.offsets[i] = offset;
        }
        Ok(offset)
    }

    fn on_message(&mut self, msg: &ResponseMessage, offset: usize) {
        // advance to the owning handler, if required
        while self.current + 1 < H::LEN && offset >= self.offsets[self.current] {
            self.current += 1;
        }
        debug_assert!(offset < self.offsets[self.current]);
        self.handlers.on_message_nth(self.current, msg, offset);
    }

    fn result(&self) -> &ExtendedError {
        const { assert!(H::LEN > 0) };
        for i in 0..H::LEN {
            let res = self.handlers.result_nth(i);
            if res.is_err() {
                return res;
            }
        }
        self.handlers.result_nth(0)
    }
}

/// A handler that claims the whole remaining request and stores
/// nothing. The right choice when the caller does not care about the
/// reply traffic at all.
#[derive(Debug, Default)]
pub struct Ignore {
    err: ExtendedError,
}

impl ResponseHandler for Ignore {
    fn setup(&mut self, req: &Request, _offset: usize) -> Result<usize> {
        Ok(req.tags().len())
    }

    fn on_message(&mut self, _msg: &ResponseMessage, _offset: usize) {}

    fn result(&self) -> &ExtendedError {
        &self.err
    }
}

/// Scan rule for a single result-set handler's region.
///
/// Skips leading Sync/Flush. A Query tag forms a region by itself.
/// Otherwise the region is an extended-query sub-sequence: optional
/// Parse, optional Bind, exactly one Describe, exactly one Execute,
/// with Flush free to appear anywhere. A Sync between Describe and
/// Execute would make error handling ambiguous and is rejected.
/// Trailing Sync/Flush are consumed into the region.
pub(crate) fn resultset_setup(req: &Request, offset: usize) -> Result<usize> {
    let tags = req.tags();
    let mut i = offset;

    while matches!(tags.get(i), Some(MessageTag::Sync | MessageTag::Flush)) {
        i += 1;
    }

    if let Some(MessageTag::Query) = tags.get(i) {
        return Ok(i + 1);
    }

    let mut describe_found = false;
    let mut execute_found = false;
    while let Some(tag) = tags.get(i) {
        match tag {
            MessageTag::Sync if describe_found => {
                return Err(ClientError::IncompatibleResponseType);
            }
            MessageTag::Sync | MessageTag::Flush | MessageTag::Parse | MessageTag::Bind => {}
            MessageTag::Describe => {
                if describe_found {
                    return Err(ClientError::IncompatibleResponseType);
                }
                describe_found = true;
            }
            MessageTag::Execute => {
                if !describe_found {
                    return Err(ClientError::IncompatibleResponseType);
                }
                execute_found = true;
            }
            MessageTag::Close | MessageTag::Query => {
                return Err(ClientError::IncompatibleResponseType);
            }
        }
        i += 1;
        if execute_found {
            break;
        }
    }

    if !execute_found {
        return Err(ClientError::IncompatibleResponseType);
    }

    while matches!(tags.get(i), Some(MessageTag::Sync | MessageTag::Flush)) {
        i += 1;
    }
    Ok(i)
}

pub(crate) const INVALID_POS: usize = usize::MAX;

/// One slot of the declared-field to server-column permutation.
#[derive(Debug, Clone, Default)]
pub(crate) struct PosMapEntry {
    /// Index within the fields sent by the server.
    pub db_index: usize,
    /// Metadata required to parse the field.
    pub descr: FieldDescription,
}

/// Maps every declared field name to the server column providing it.
///
/// Later duplicate server columns overwrite earlier ones. Any declared
/// name left unmapped is an error.
pub(crate) fn compute_pos_map(
    meta: &RowDescription,
    name_table: &[&str],
    output: &mut Vec<PosMapEntry>,
) -> Result<()> {
    output.clear();
    output.resize(name_table.len(), PosMapEntry { db_index: INVALID_POS, descr: FieldDescription::default() });

    for (db_index, field) in meta.fields.iter().enumerate() {
        if let Some(slot) = name_table.iter().position(|n| *n == field.name.as_str()) {
            output[slot] = PosMapEntry { db_index, descr: field.clone() };
        }
    }

    if output.iter().any(|entry| entry.db_index == INVALID_POS) {
        return Err(ClientError::FieldNotFound);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ParsingMeta,
    ParsingData,
    Done,
}

/// Handles one result set (RowDescription + DataRows + terminator) by
/// decoding each row into `T` and handing it to a callback.
///
/// The first error is stored and the remaining traffic of the region
/// is drained without further decoding, so the stream stays aligned.
pub struct ResultSet<T, F> {
    state: State,
    pos_map: Vec<PosMapEntry>,
    err: ExtendedError,
    callback: F,
    _row: PhantomData<fn() -> T>,
}

impl<T, F> ResultSet<T, F>
where
    T: RowSchema,
    F: FnMut(T),
{
    pub fn new(callback: F) -> Self {
        Self {
            state: State::ParsingMeta,
            pos_map: Vec::new(),
            err: ExtendedError::default(),
            callback,
            _row: PhantomData,
        }
    }

    fn on_row_description(&mut self, meta: &RowDescription) {
        if self.state != State::ParsingMeta {
            // a second result set in the same region, e.g. from a
            // multi-statement simple query
            self.err.store(ClientError::IncompatibleResponseType);
            return;
        }
        // rows and a terminator follow, even if the metadata is bad
        self.state = State::ParsingData;

        if let Err(err) = compute_pos_map(meta, T::NAMES, &mut self.pos_map) {
            self.err.store(err);
            return;
        }

        let mut check = CompatVisitor { pos_map: &self.pos_map, index: 0 };
        if let Err(err) = T::default().visit_fields(&mut check) {
            self.err.store(err);
        }
    }

    fn on_data_row(&mut self, row: &DataRow) {
        if self.state != State::ParsingData {
            self.err.store(ClientError::IncompatibleResponseType);
            return;
        }
        // after a failure the position map may not be usable; keep
        // draining so the terminator is still consumed
        if self.err.is_err() {
            return;
        }

        let mut decoded = T::default();
        let mut visitor = DecodeVisitor { pos_map: &self.pos_map, row, index: 0 };
        match decoded.visit_fields(&mut visitor) {
            Ok(()) => (self.callback)(decoded),
            Err(err) => self.err.store(err),
        }
    }

    fn on_done(&mut self) {
        if self.state != State::ParsingData {
            self.err.store(ClientError::IncompatibleResponseType);
        }
        self.state = State::Done;
    }
}

struct CompatVisitor<'a> {
    pos_map: &'a [PosMapEntry],
    index: usize,
}

impl FieldVisitor for CompatVisitor<'_> {
    fn visit<F: FieldDecode>(&mut self, _field: &mut F) -> Result<()> {
        let descr = &self.pos_map[self.index].descr;
        self.index += 1;
        F::is_compatible(descr)
    }
}

struct DecodeVisitor<'a> {
    pos_map: &'a [PosMapEntry],
    row: &'a DataRow,
    index: usize,
}

impl FieldVisitor for DecodeVisitor<'_> {
    fn visit<F: FieldDecode>(&mut self, field: &mut F) -> Result<()> {
        let entry = &self.pos_map[self.index];
        self.index += 1;
        let value = self
            .row
            .columns
            .get(entry.db_index)
            .ok_or(ClientError::ProtocolValue)?;
        *field = F::decode(value.as_deref(), &entry.descr)?;
        Ok(())
    }
}

impl<T, F> ResponseHandler for ResultSet<T, F>
where
    T: RowSchema,
    F: FnMut(T),
{
    fn setup(&mut self, req: &Request, offset: usize) -> Result<usize> {
        resultset_setup(req, offset)
    }

    fn on_message(&mut self, msg: &ResponseMessage, _offset: usize) {
        match msg {
            // may or may not appear, depending on the request shape
            ResponseMessage::ParseComplete | ResponseMessage::BindComplete => {}
            ResponseMessage::RowDescription(meta) => self.on_row_description(meta),
            ResponseMessage::DataRow(row) => self.on_data_row(row),
            ResponseMessage::CommandComplete(_) | ResponseMessage::PortalSuspended => {
                self.on_done()
            }
            // the server error is the last message of this region
            ResponseMessage::Error(err) => {
                self.err.store_with(ClientError::ExecServerError, err.diag.clone());
                self.state = State::Done;
            }
            ResponseMessage::Skipped => self.err.store(ClientError::StepSkipped),
            ResponseMessage::CloseComplete
            | ResponseMessage::ParameterDescription(_)
            | ResponseMessage::EmptyQueryResponse => {
                self.err.store(ClientError::IncompatibleResponseType)
            }
        }
    }

    fn result(&self) -> &ExtendedError {
        &self.err
    }
}

/// A result-set handler that appends decoded rows to a vector.
pub fn collect_into<T: RowSchema>(rows: &mut Vec<T>) -> ResultSet<T, impl FnMut(T) + '_> {
    ResultSet::new(|row| rows.push(row))
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::{
        common::ByteStr,
        param::ParamRef,
        postgres::{PgFormat, oid},
        request::ParamFormat,
        row_schema,
        types::descr,
    };

    #[derive(Debug, Default)]
    struct MockHandler<const N: usize> {
        msgs: Vec<(&'static str, usize)>,
        err: ExtendedError,
    }

    impl<const N: usize> ResponseHandler for MockHandler<N> {
        fn setup(&mut self, _req: &Request, offset: usize) -> Result<usize> {
            Ok(offset + N)
        }

        fn on_message(&mut self, msg: &ResponseMessage, offset: usize) {
            self.msgs.push((msg.name(), offset));
        }

        fn result(&self) -> &ExtendedError {
            &self.err
        }
    }

    fn query_request() -> Request {
        let mut req = Request::new();
        req.add_query("SELECT 1", &[], ParamFormat::Text, PgFormat::Text, 0).unwrap();
        req
    }

    // mixed arities also prove the list is heterogeneous
    #[test]
    fn two_handlers_split_the_traffic() {
        let req = query_request();
        let mut res = Response::new((MockHandler::<2>::default(), MockHandler::<3>::default()));

        assert_eq!(res.setup(&req, 0), Ok(5));

        res.on_message(&ResponseMessage::ParseComplete, 0);
        res.on_message(&ResponseMessage::BindComplete, 1);
        res.on_message(&ResponseMessage::RowDescription(RowDescription::default()), 2);
        res.on_message(&ResponseMessage::DataRow(DataRow::default()), 3);
        res.on_message(&ResponseMessage::CommandComplete(CommandComplete::default()), 3);

        assert!(!res.result().is_err());

        let (first, second) = res.handlers();
        assert_eq!(first.msgs, [("ParseComplete", 0), ("BindComplete", 1)]);
        assert_eq!(
            second.msgs,
            [("RowDescription", 2), ("DataRow", 3), ("CommandComplete", 3)],
        );
    }

    #[test]
    fn first_handler_error_wins() {
        let mut res = Response::new((
            MockHandler::<1>::default(),
            MockHandler::<1>::default(),
            MockHandler::<1>::default(),
            MockHandler::<1>::default(),
        ));
        res.handlers_mut().1.err.store(ClientError::FieldNotFound);
        res.handlers_mut().2.err.store(ClientError::IncompatibleFieldType);

        assert_eq!(res.result().code, Some(ClientError::FieldNotFound));
    }

    #[test]
    fn setup_error_propagates() {
        #[derive(Debug, Default)]
        struct Failing;
        impl ResponseHandler for Failing {
            fn setup(&mut self, _: &Request, _: usize) -> Result<usize> {
                Err(ClientError::IncompatibleResponseType)
            }
            fn on_message(&mut self, _: &ResponseMessage, _: usize) {}
            fn result(&self) -> &ExtendedError {
                unreachable!()
            }
        }

        let req = query_request();
        let mut res = Response::new((MockHandler::<2>::default(), Failing));
        assert_eq!(res.setup(&req, 0), Err(ClientError::IncompatibleResponseType));
    }

    // ===== resultset_setup =====

    fn tags_request(build: impl FnOnce(&mut Request)) -> Request {
        let mut req = Request::with_autosync(false);
        build(&mut req);
        req
    }

    #[test]
    fn setup_simple_query_is_a_single_tag_region() {
        let req = tags_request(|r| {
            r.add_simple_query("SELECT 1").unwrap();
        });
        assert_eq!(resultset_setup(&req, 0), Ok(1));
    }

    #[test]
    fn setup_skips_leading_syncs() {
        let req = tags_request(|r| {
            r.add(&crate::postgres::frontend::Sync).unwrap();
            r.add_simple_query("SELECT 1").unwrap();
        });
        assert_eq!(resultset_setup(&req, 0), Ok(2));
    }

    #[test]
    fn setup_extended_sequence_consumes_trailing_sync() {
        let mut req = Request::new();
        req.add_query("SELECT 1", &[], ParamFormat::Text, PgFormat::Text, 0).unwrap();
        // Parse Bind Describe Execute Sync
        assert_eq!(resultset_setup(&req, 0), Ok(5));
    }

    #[test]
    fn setup_execute_requires_describe() {
        let req = tags_request(|r| {
            r.add(&crate::postgres::frontend::Execute { portal_name: "", max_rows: 0 }).unwrap();
        });
        assert_eq!(resultset_setup(&req, 0), Err(ClientError::IncompatibleResponseType));
    }

    #[test]
    fn setup_rejects_sync_between_describe_and_execute() {
        let req = tags_request(|r| {
            r.add(&crate::postgres::frontend::Describe {
                target: crate::postgres::frontend::Target::Portal,
                name: "",
            })
            .unwrap();
            r.add(&crate::postgres::frontend::Sync).unwrap();
            r.add(&crate::postgres::frontend::Execute { portal_name: "", max_rows: 0 }).unwrap();
        });
        assert_eq!(resultset_setup(&req, 0), Err(ClientError::IncompatibleResponseType));
    }

    #[test]
    fn setup_rejects_prepare_only_requests() {
        let mut req = Request::new();
        req.add_prepare("SELECT 1", "s", &[]).unwrap();
        assert_eq!(resultset_setup(&req, 0), Err(ClientError::IncompatibleResponseType));
    }

    #[test]
    fn setup_rejects_empty_requests() {
        let req = Request::new();
        assert_eq!(resultset_setup(&req, 0), Err(ClientError::IncompatibleResponseType));
    }

    // ===== position map =====

    fn meta(names: &[&'static str]) -> RowDescription {
        RowDescription {
            fields: names
                .iter()
                .map(|n| FieldDescription {
                    name: ByteStr::from_static(n),
                    ..descr(oid::INT4, PgFormat::Text)
                })
                .collect(),
        }
    }

    #[test]
    fn pos_map_is_a_permutation() {
        let mut map = Vec::new();
        compute_pos_map(&meta(&["b", "a"]), &["a", "b"], &mut map).unwrap();
        assert_eq!(map[0].db_index, 1);
        assert_eq!(map[1].db_index, 0);
    }

    #[test]
    fn pos_map_missing_name() {
        let mut map = Vec::new();
        assert_eq!(
            compute_pos_map(&meta(&["a"]), &["a", "b"], &mut map),
            Err(ClientError::FieldNotFound),
        );
    }

    #[test]
    fn pos_map_later_duplicates_win() {
        let mut map = Vec::new();
        compute_pos_map(&meta(&["a", "a"]), &["a"], &mut map).unwrap();
        assert_eq!(map[0].db_index, 1);
    }

    #[test]
    fn pos_map_extra_server_columns_are_ignored() {
        let mut map = Vec::new();
        compute_pos_map(&meta(&["x", "a", "y"]), &["a"], &mut map).unwrap();
        assert_eq!(map[0].db_index, 1);
    }

    // ===== result set =====

    row_schema! {
        #[derive(Debug, PartialEq)]
        struct Numbered {
            id: i32,
            label: String,
        }
    }

    fn numbered_meta() -> RowDescription {
        RowDescription {
            fields: vec![
                FieldDescription {
                    name: ByteStr::from_static("label"),
                    ..descr(oid::TEXT, PgFormat::Text)
                },
                FieldDescription {
                    name: ByteStr::from_static("id"),
                    ..descr(oid::INT4, PgFormat::Text)
                },
            ],
        }
    }

    fn data_row(values: &[&str]) -> DataRow {
        DataRow {
            columns: values.iter().map(|v| Some(Bytes::copy_from_slice(v.as_bytes()))).collect(),
        }
    }

    #[test]
    fn resultset_decodes_rows_through_the_position_map() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);

        handler.on_message(&ResponseMessage::ParseComplete, 0);
        handler.on_message(&ResponseMessage::BindComplete, 1);
        handler.on_message(&ResponseMessage::RowDescription(numbered_meta()), 2);
        handler.on_message(&ResponseMessage::DataRow(data_row(&["seven", "7"])), 3);
        handler.on_message(&ResponseMessage::DataRow(data_row(&["eight", "8"])), 3);
        handler.on_message(
            &ResponseMessage::CommandComplete(CommandComplete::default()),
            3,
        );

        assert!(!handler.result().is_err());
        drop(handler);
        assert_eq!(
            rows,
            [
                Numbered { id: 7, label: "seven".into() },
                Numbered { id: 8, label: "eight".into() },
            ],
        );
    }

    #[test]
    fn resultset_stores_first_decode_error_and_keeps_draining() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);

        handler.on_message(&ResponseMessage::RowDescription(numbered_meta()), 0);
        handler.on_message(&ResponseMessage::DataRow(data_row(&["ok", "1"])), 1);
        handler.on_message(&ResponseMessage::DataRow(data_row(&["bad", "x"])), 1);
        handler.on_message(&ResponseMessage::DataRow(data_row(&["late", "3"])), 1);
        handler.on_message(
            &ResponseMessage::CommandComplete(CommandComplete::default()),
            1,
        );

        assert_eq!(handler.result().code, Some(ClientError::ProtocolValue));
        drop(handler);
        // rows decoded before the error remain delivered
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn resultset_records_server_errors_with_diagnostics() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);

        let mut err = ErrorResponse::default();
        err.diag.code = Some(ByteStr::from_static("42P01"));
        handler.on_message(&ResponseMessage::Error(err), 0);

        let result = handler.result();
        assert_eq!(result.code, Some(ClientError::ExecServerError));
        assert_eq!(result.diag.code.as_deref(), Some("42P01"));
    }

    #[test]
    fn resultset_records_skipped_steps() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);
        handler.on_message(&ResponseMessage::Skipped, 0);
        assert_eq!(handler.result().code, Some(ClientError::StepSkipped));
    }

    #[test]
    fn resultset_rejects_incompatible_columns() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);

        let mut meta = numbered_meta();
        meta.fields[1].type_oid = oid::INT8; // id: i32 cannot take int8
        handler.on_message(&ResponseMessage::RowDescription(meta), 0);
        handler.on_message(&ResponseMessage::DataRow(data_row(&["x", "1"])), 1);
        handler.on_message(
            &ResponseMessage::CommandComplete(CommandComplete::default()),
            1,
        );

        assert_eq!(handler.result().code, Some(ClientError::IncompatibleFieldType));
        drop(handler);
        assert!(rows.is_empty());
    }

    #[test]
    fn resultset_flags_second_result_sets() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);

        handler.on_message(&ResponseMessage::RowDescription(numbered_meta()), 0);
        handler.on_message(
            &ResponseMessage::CommandComplete(CommandComplete::default()),
            0,
        );
        // a multi-statement simple query produces another description
        handler.on_message(&ResponseMessage::RowDescription(numbered_meta()), 0);

        assert_eq!(handler.result().code, Some(ClientError::IncompatibleResponseType));
    }

    #[test]
    fn resultset_missing_column_is_field_not_found() {
        let mut rows: Vec<Numbered> = Vec::new();
        let mut handler = collect_into(&mut rows);

        let meta = RowDescription {
            fields: vec![FieldDescription {
                name: ByteStr::from_static("id"),
                ..descr(oid::INT4, PgFormat::Text)
            }],
        };
        handler.on_message(&ResponseMessage::RowDescription(meta), 0);
        assert_eq!(handler.result().code, Some(ClientError::FieldNotFound));
    }

    #[test]
    fn ignore_claims_everything_and_reports_nothing() {
        let req = query_request();
        let mut ignore = Ignore::default();
        assert_eq!(ignore.setup(&req, 0), Ok(5));
        ignore.on_message(&ResponseMessage::Skipped, 0);
        assert!(!ignore.result().is_err());
    }

    #[test]
    fn resultset_setup_works_with_unnamed_execute_params() {
        let mut req = Request::new();
        req.add_execute("stmt", &[ParamRef::Int4(1)], ParamFormat::Text, PgFormat::Text, 0)
            .unwrap();
        // Bind Describe Execute Sync
        assert_eq!(resultset_setup(&req, 0), Ok(4));
    }
}
