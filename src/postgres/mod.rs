//! Postgres frontend and backend protocol, version 3.
//!
//! Docs here mostly quote the official postgres documentation.
//!
//! ## Messaging overview
//!
//! All communication is through a stream of messages. The first byte of
//! a message identifies the message type, and the next four bytes give
//! the length of the rest of the message (this length count includes
//! itself, but not the message-type byte).
//!
//! ```text
//! ┏━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━┓
//! ┃ Ty ┃       Length      ┃ Body ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━┫
//! ┃ u8 ┃        u32        ┃ [u8] ┃
//! ┗━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━┛
//! ```
//!
//! Outbound messages are modeled in [`frontend`], inbound messages in
//! [`backend`]. Integers are big-endian; protocol strings are nul
//! terminated, column values are length-prefixed with -1 encoding NULL.
//!
//! <https://www.postgresql.org/docs/17/protocol-overview.html>

mod pg_format;
mod pg_type;

pub mod backend;
pub mod frontend;

pub use pg_format::PgFormat;
pub use pg_type::{Oid, PgType, oid};

pub use backend::{BackendDecode, BackendMessage, BackendStatus, FieldDescription};
pub use frontend::FrontendMessage;
