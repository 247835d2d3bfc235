//! Typed property-reference expressions.
//!
//! Option values, flags and library names may embed references to build
//! properties. Instead of substituting strings at the last moment, values are
//! parsed once into an [`Expr`] made of literal text, scalar references
//! (`${NAME}`) and at most one list reference (`${NAME[]}`), then evaluated
//! against an explicit [`Properties`] environment.
//!
//! `$$` is an escaped dollar sign.

mod error;
mod expr;
mod properties;

pub use error::{PropsError, PropsResult};
pub use expr::{Expr, Segment};
pub use properties::{Properties, PropertyValue};

/// Parse and expand a batch of values in list mode, flattening the result.
///
/// Each value is expanded independently, since one list reference may
/// produce several tokens.
pub fn expand_all<S: AsRef<str>>(values: &[S], props: &Properties) -> PropsResult<Vec<String>> {
    let mut out = Vec::new();
    for value in values {
        out.extend(Expr::parse(value.as_ref())?.expand_list(props)?);
    }
    Ok(out)
}
