//! Request assembly.
//!
//! A [`Request`] is an append-only pair: a byte buffer holding framed
//! frontend messages, and a parallel vector of [`MessageTag`]s naming
//! the logical message at each frame boundary. The tag vector is what
//! response handlers later use to claim their slice of the server's
//! reply traffic.
use std::marker::PhantomData;

use bytes::BytesMut;

use crate::{
    error::{ClientError, Result},
    param::{AsParam, ParamRef},
    postgres::{
        Oid, PgFormat, PgType,
        frontend::{self, FrontendMessage, Target},
    },
};

/// The logical kind of one serialized frontend message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    Bind,
    Close,
    Describe,
    Execute,
    Flush,
    Parse,
    Query,
    Sync,
}

/// How parameter wire formats are chosen for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamFormat {
    /// Use text for all parameters. Emits a single format entry.
    ///
    /// This is the safe choice for prepared statements whose parameter
    /// type OIDs were not declared at Parse time.
    Text,
    /// Let the library pick per parameter: binary where the parameter
    /// supports it, text otherwise. Emits one format entry per
    /// parameter.
    #[default]
    SelectBest,
}

impl ParamFormat {
    fn format_vector(self, params: &[ParamRef<'_>]) -> Vec<PgFormat> {
        match self {
            ParamFormat::Text => vec![PgFormat::Text],
            ParamFormat::SelectBest => params.iter().map(|p| p.preferred_format()).collect(),
        }
    }
}

/// An ordered batch of protocol messages, ready for submission.
///
/// When autosync is enabled, the higher-level helpers append Sync
/// messages automatically. You may disable autosync and add Syncs
/// manually to achieve certain pipeline patterns; this is an advanced
/// feature, don't use it if you don't know what a Sync message is.
///
/// Every `add_*` operation provides the strong guarantee: on failure
/// neither the byte buffer nor the tag vector is modified, and the
/// request stays usable.
#[derive(Debug)]
pub struct Request {
    buf: BytesMut,
    tags: Vec<MessageTag>,
    autosync: bool,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Creates an empty request with autosync enabled.
    pub fn new() -> Self {
        Self::with_autosync(true)
    }

    /// Creates an empty request with the given autosync setting.
    pub fn with_autosync(autosync: bool) -> Self {
        Self { buf: BytesMut::new(), tags: Vec::new(), autosync }
    }

    pub fn autosync(&self) -> bool {
        self.autosync
    }

    pub fn set_autosync(&mut self, value: bool) {
        self.autosync = value;
    }

    /// The serialized payload.
    pub fn payload(&self) -> &[u8] {
        &self.buf
    }

    /// The logical message tags, parallel to the payload frames.
    pub fn tags(&self) -> &[MessageTag] {
        &self.tags
    }

    /// Adds one raw protocol message.
    pub fn add<M: FrontendMessage>(&mut self, msg: &M) -> Result<&mut Self> {
        let Some(tag) = M::TAG else {
            return Err(ClientError::ProtocolValue);
        };
        self.tags.reserve(1); // strong guarantee
        frontend::write(msg, &mut self.buf)?;
        self.tags.push(tag);
        Ok(self)
    }

    fn maybe_add_sync(&mut self) -> Result<()> {
        if self.autosync {
            self.add(&frontend::Sync)?;
        }
        Ok(())
    }

    /// Runs `f`, rolling the buffer and tag vector back if it fails.
    fn atomically(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<&mut Self> {
        let buf_mark = self.buf.len();
        let tag_mark = self.tags.len();
        match f(self) {
            Ok(()) => Ok(self),
            Err(err) => {
                self.buf.truncate(buf_mark);
                self.tags.truncate(tag_mark);
                Err(err)
            }
        }
    }

    /// Adds a simple query (PQsendQuery).
    pub fn add_simple_query(&mut self, sql: &str) -> Result<&mut Self> {
        self.add(&frontend::Query { sql })
    }

    /// Adds a parameterized query using the extended protocol
    /// (PQsendQueryParams): Parse + Bind + Describe + Execute on the
    /// unnamed statement and portal, then Sync if autosync is on.
    ///
    /// Parameter type OIDs are always declared in Parse, so
    /// [`ParamFormat::SelectBest`] is safe here. `max_rows` of zero
    /// means "no limit".
    pub fn add_query(
        &mut self,
        sql: &str,
        params: &[ParamRef<'_>],
        fmt: ParamFormat,
        result_format: PgFormat,
        max_rows: i32,
    ) -> Result<&mut Self> {
        let oids: Vec<Oid> = params.iter().map(|p| p.oid()).collect();
        let formats = fmt.format_vector(params);
        self.atomically(|req| {
            req.add(&frontend::Parse { statement_name: "", sql, param_type_oids: &oids })?;
            req.add(&frontend::Bind {
                portal_name: "",
                statement_name: "",
                param_formats: &formats,
                params,
                result_format,
            })?;
            req.add(&frontend::Describe { target: Target::Portal, name: "" })?;
            req.add(&frontend::Execute { portal_name: "", max_rows })?;
            req.maybe_add_sync()
        })
    }

    /// Prepares a named statement (PQsendPrepare).
    pub fn add_prepare(
        &mut self,
        sql: &str,
        statement_name: &str,
        param_type_oids: &[Oid],
    ) -> Result<&mut Self> {
        self.atomically(|req| {
            req.add(&frontend::Parse { statement_name, sql, param_type_oids })?;
            req.maybe_add_sync()
        })
    }

    /// Prepares a named statement, deriving parameter type OIDs from
    /// the statement's declared parameter types.
    pub fn add_prepare_typed<P: ParamTypes>(
        &mut self,
        sql: &str,
        stmt: &Statement<P>,
    ) -> Result<&mut Self> {
        self.add_prepare(sql, stmt.name(), P::OIDS)
    }

    /// Executes a named prepared statement (PQsendQueryPrepared):
    /// Bind to the unnamed portal + Describe + Execute, then Sync if
    /// autosync is on.
    ///
    /// Parameter format should default to [`ParamFormat::Text`]
    /// because binary requires the type OIDs to have been sent at
    /// prepare time, and we're not sure the caller did that.
    pub fn add_execute(
        &mut self,
        statement_name: &str,
        params: &[ParamRef<'_>],
        fmt: ParamFormat,
        result_format: PgFormat,
        max_rows: i32,
    ) -> Result<&mut Self> {
        let formats = fmt.format_vector(params);
        self.atomically(|req| {
            req.add(&frontend::Bind {
                portal_name: "",
                statement_name,
                param_formats: &formats,
                params,
                result_format,
            })?;
            req.add(&frontend::Describe { target: Target::Portal, name: "" })?;
            req.add(&frontend::Execute { portal_name: "", max_rows })?;
            req.maybe_add_sync()
        })
    }

    /// Executes a statement bound with [`Statement::bind`].
    ///
    /// The statement declared its parameter types, so
    /// [`ParamFormat::SelectBest`] is safe.
    pub fn add_execute_bound<const N: usize>(
        &mut self,
        stmt: &BoundStatement<'_, N>,
        fmt: ParamFormat,
        result_format: PgFormat,
        max_rows: i32,
    ) -> Result<&mut Self> {
        self.add_execute(stmt.name, &stmt.params, fmt, result_format, max_rows)
    }

    /// Adds a single Bind message, then Sync if autosync is on.
    pub fn add_bind(
        &mut self,
        statement_name: &str,
        params: &[ParamRef<'_>],
        fmt: ParamFormat,
        portal_name: &str,
        result_format: PgFormat,
    ) -> Result<&mut Self> {
        let formats = fmt.format_vector(params);
        self.atomically(|req| {
            req.add(&frontend::Bind {
                portal_name,
                statement_name,
                param_formats: &formats,
                params,
                result_format,
            })?;
            req.maybe_add_sync()
        })
    }

    /// Adds a single Bind for a statement bound with
    /// [`Statement::bind`], then Sync if autosync is on.
    pub fn add_bind_bound<const N: usize>(
        &mut self,
        stmt: &BoundStatement<'_, N>,
        fmt: ParamFormat,
        portal_name: &str,
        result_format: PgFormat,
    ) -> Result<&mut Self> {
        self.add_bind(stmt.name, &stmt.params, fmt, portal_name, result_format)
    }

    /// Describes a named prepared statement (PQsendDescribePrepared).
    pub fn add_describe_statement(&mut self, statement_name: &str) -> Result<&mut Self> {
        self.atomically(|req| {
            req.add(&frontend::Describe { target: Target::Statement, name: statement_name })?;
            req.maybe_add_sync()
        })
    }

    /// Describes a named portal (PQsendDescribePortal).
    pub fn add_describe_portal(&mut self, portal_name: &str) -> Result<&mut Self> {
        self.atomically(|req| {
            req.add(&frontend::Describe { target: Target::Portal, name: portal_name })?;
            req.maybe_add_sync()
        })
    }

    /// Closes a named prepared statement (PQsendClosePrepared).
    pub fn add_close_statement(&mut self, statement_name: &str) -> Result<&mut Self> {
        self.atomically(|req| {
            req.add(&frontend::Close { target: Target::Statement, name: statement_name })?;
            req.maybe_add_sync()
        })
    }

    /// Closes a named portal (PQsendClosePortal).
    pub fn add_close_portal(&mut self, portal_name: &str) -> Result<&mut Self> {
        self.atomically(|req| {
            req.add(&frontend::Close { target: Target::Portal, name: portal_name })?;
            req.maybe_add_sync()
        })
    }
}

/// Declared parameter types of a prepared statement, as a tuple.
pub trait ParamTypes {
    /// The type OIDs, in declaration order.
    const OIDS: &'static [Oid];
}

/// A prepared-statement descriptor with compile-time parameter types.
#[derive(Debug, Clone)]
pub struct Statement<P> {
    name: String,
    _types: PhantomData<fn() -> P>,
}

impl<P: ParamTypes> Statement<P> {
    /// Creates a descriptor; an empty name selects the unnamed
    /// prepared statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), _types: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A prepared-statement name plus bound parameter values.
#[derive(Debug, Clone, Copy)]
pub struct BoundStatement<'a, const N: usize> {
    pub name: &'a str,
    pub params: [ParamRef<'a>; N],
}

impl ParamTypes for () {
    const OIDS: &'static [Oid] = &[];
}

impl Statement<()> {
    /// Binds a parameterless statement.
    pub fn bind(&self) -> BoundStatement<'_, 0> {
        BoundStatement { name: &self.name, params: [] }
    }
}

macro_rules! param_tuple {
    ($n:literal; $($t:ident . $i:tt),*) => {
        impl<$($t: PgType),*> ParamTypes for ($($t,)*) {
            const OIDS: &'static [Oid] = &[$($t::OID),*];
        }

        impl<$($t: PgType + AsParam),*> Statement<($($t,)*)> {
            /// Binds concrete values of the declared types.
            pub fn bind<'a>(&'a self, values: ($(&'a $t,)*)) -> BoundStatement<'a, $n> {
                BoundStatement {
                    name: &self.name,
                    params: [$(values.$i.as_param()),*],
                }
            }
        }
    };
}

param_tuple!(1; T0.0);
param_tuple!(2; T0.0, T1.1);
param_tuple!(3; T0.0, T1.1, T2.2);
param_tuple!(4; T0.0, T1.1, T2.2, T3.3);
param_tuple!(5; T0.0, T1.1, T2.2, T3.3, T4.4);
param_tuple!(6; T0.0, T1.1, T2.2, T3.3, T4.4, T5.5);
param_tuple!(7; T0.0, T1.1, T2.2, T3.3, T4.4, T5.5, T6.6);
param_tuple!(8; T0.0, T1.1, T2.2, T3.3, T4.4, T5.5, T6.6, T7.7);

#[cfg(test)]
mod test {
    use super::*;
    use super::MessageTag::*;

    #[test]
    fn simple_query_single_tag() {
        let mut req = Request::new();
        req.add_simple_query("SELECT 1").unwrap();
        assert_eq!(req.tags(), &[Query]);
    }

    #[test]
    fn add_query_tag_sequence() {
        let mut req = Request::new();
        req.add_query("SELECT $1", &[ParamRef::Int4(1)], ParamFormat::SelectBest, PgFormat::Text, 0)
            .unwrap();
        assert_eq!(req.tags(), &[Parse, Bind, Describe, Execute, Sync]);
    }

    #[test]
    fn autosync_off_drops_the_sync() {
        let mut req = Request::with_autosync(false);
        req.add_query("SELECT 1", &[], ParamFormat::Text, PgFormat::Text, 0).unwrap();
        req.add(&frontend::Sync).unwrap();
        assert_eq!(req.tags(), &[Parse, Bind, Describe, Execute, Sync]);
    }

    #[test]
    fn failed_add_leaves_request_untouched() {
        let mut req = Request::new();
        req.add_simple_query("SELECT 1").unwrap();
        let payload_before = req.payload().to_vec();

        let err = req.add_query("bad\0sql", &[], ParamFormat::Text, PgFormat::Text, 0);
        assert!(err.is_err());
        assert_eq!(req.payload(), payload_before);
        assert_eq!(req.tags(), &[Query]);
    }

    #[test]
    fn prepare_typed_declares_oids() {
        let stmt: Statement<(i32, String)> = Statement::new("s1");
        let mut req = Request::new();
        req.add_prepare_typed("SELECT $1, $2", &stmt).unwrap();
        assert_eq!(req.tags(), &[Parse, Sync]);
        // the Parse frame carries both declared OIDs
        let payload = req.payload();
        assert!(payload.windows(4).any(|w| w == 23u32.to_be_bytes()));
        assert!(payload.windows(4).any(|w| w == 25u32.to_be_bytes()));
    }

    #[test]
    fn bound_statement_execute() {
        let stmt: Statement<(i64, String)> = Statement::new("s2");
        let id = 42i64;
        let title = String::from("hello");
        let bound = stmt.bind((&id, &title));

        let mut req = Request::new();
        req.add_execute_bound(&bound, ParamFormat::SelectBest, PgFormat::Text, 0).unwrap();
        assert_eq!(req.tags(), &[Bind, Describe, Execute, Sync]);
    }

    #[test]
    fn close_and_describe_helpers() {
        let mut req = Request::with_autosync(false);
        req.add_describe_statement("s").unwrap();
        req.add_describe_portal("p").unwrap();
        req.add_close_statement("s").unwrap();
        req.add_close_portal("p").unwrap();
        assert_eq!(req.tags(), &[Describe, Describe, Close, Close]);
    }
}
