//! Native PostgreSQL frontend/backend protocol client core.
//!
//! A [`Request`] batches protocol messages (simple queries, extended
//! parse/bind/describe/execute sequences, closes, syncs) into one
//! buffer. A [`Connection`] submits it and routes the server's reply
//! into [response handlers][response::ResponseHandler] that decode
//! result sets into statically declared row structs.
//!
//! # Examples
//!
//! ```no_run
//! use pgnative::{
//!     Connection, ParamFormat, PgFormat, Request, row_schema,
//!     response::collect_into,
//! };
//!
//! row_schema! {
//!     #[derive(Debug)]
//!     struct Ticket {
//!         id: i64,
//!         title: String,
//!     }
//! }
//!
//! # async fn app(stream: tokio::net::TcpStream) -> Result<(), pgnative::ExtendedError> {
//! // `stream` has already completed startup and authentication
//! let mut conn = Connection::new(stream);
//!
//! let mut req = Request::new();
//! req.add_query(
//!     "SELECT id, title FROM ticket WHERE id > $1",
//!     &[10i64.into()],
//!     ParamFormat::SelectBest,
//!     PgFormat::Text,
//!     0,
//! )?;
//!
//! let mut tickets = Vec::new();
//! let mut handler = collect_into(&mut tickets);
//! conn.exec(&req, &mut handler).await?;
//!
//! for ticket in &tickets {
//!     println!("#{}: {}", ticket.id, ticket.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Several statements can share one round trip; give each its own
//! handler and route through a [`Response`]:
//!
//! ```no_run
//! # use pgnative::{Connection, ParamFormat, PgFormat, Request, row_schema};
//! use pgnative::response::{Ignore, Response, collect_into};
//! # row_schema! { struct Row { id: i32 } }
//! # async fn app(conn: &mut Connection<tokio::net::TcpStream>) -> Result<(), pgnative::ExtendedError> {
//! let mut req = Request::new();
//! req.add_simple_query("SET search_path TO app")?;
//! req.add_query("SELECT id FROM t", &[], ParamFormat::SelectBest, PgFormat::Text, 0)?;
//!
//! let mut rows = Vec::new();
//! let mut response = Response::new((Ignore::default(), collect_into(&mut rows)));
//! conn.exec(&req, &mut response).await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod ext;

// Protocol
pub mod postgres;

// Request assembly
pub mod param;
pub mod request;

// Decoding
pub mod row;
pub mod types;

// Response routing
pub mod response;

// Transport & driving
pub mod connection;

pub mod error;

#[doc(inline)]
pub use connection::{ByteStream, Connection, ConnectionState};
#[doc(inline)]
pub use error::{ClientError, Diagnostic, ExtendedError};
#[doc(inline)]
pub use param::ParamRef;
#[doc(inline)]
pub use postgres::{BackendStatus, PgFormat};
#[doc(inline)]
pub use request::{BoundStatement, MessageTag, ParamFormat, Request, Statement};
#[doc(inline)]
pub use response::{Response, ResponseHandler, ResponseMessage, ResultSet};
#[doc(inline)]
pub use row::RowSchema;
