//! Static row-shape introspection.
//!
//! A result-set handler needs to know, at compile time, the declared
//! field names and types of the row struct it materializes. That
//! contract is [`RowSchema`]; the [`row_schema!`][crate::row_schema]
//! macro declares a struct and derives the impl in one go.
use crate::{error::Result, types::FieldDecode};

/// A visitor over the fields of a row, in declaration order.
///
/// Implementors get one `visit` call per field; returning an error
/// stops the walk.
pub trait FieldVisitor {
    fn visit<F: FieldDecode>(&mut self, field: &mut F) -> Result<()>;
}

/// A struct with a statically known, ordered list of named fields,
/// each decodable from a database column.
///
/// Prefer declaring impls with [`row_schema!`][crate::row_schema]
/// rather than by hand; the invariants below are easy to break
/// manually.
///
/// Invariants: `NAMES.len() == N`, and `visit_fields` visits exactly
/// `N` fields, in the same order as `NAMES`.
pub trait RowSchema: Default {
    /// Declared field names, in declaration order.
    const NAMES: &'static [&'static str];

    /// Number of declared fields.
    const N: usize;

    /// Visits every field in declaration order.
    fn visit_fields<V: FieldVisitor>(&mut self, visitor: &mut V) -> Result<()>;
}

/// Declares a row struct and implements [`RowSchema`] for it.
///
/// ```
/// use pgnative::{row_schema, types::PgDate};
///
/// row_schema! {
///     /// One row of the tickets report.
///     #[derive(Debug)]
///     pub struct Ticket {
///         pub id: i64,
///         pub title: String,
///         pub due: PgDate,
///     }
/// }
/// ```
///
/// Every field type must implement
/// [`FieldDecode`][crate::types::FieldDecode] and `Default`. The
/// struct gets a `Default` derive appended to whatever derives are
/// written on it.
#[macro_export]
macro_rules! row_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $($(#[$fmeta])* $fvis $field: $ty,)*
        }

        impl $crate::row::RowSchema for $name {
            const NAMES: &'static [&'static str] = &[$(stringify!($field)),*];
            const N: usize = <Self as $crate::row::RowSchema>::NAMES.len();

            fn visit_fields<V: $crate::row::FieldVisitor>(
                &mut self,
                visitor: &mut V,
            ) -> $crate::error::Result<()> {
                $(visitor.visit(&mut self.$field)?;)*
                Ok(())
            }
        }
    };
}
