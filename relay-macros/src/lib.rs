extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod http_error;

/// Derive macro mapping error variants to an HTTP status and an optional client-facing message
///
/// Annotate each variant with `#[http_error(...)]`:
/// - status code (required), either a `StatusCode` constant (`BAD_REQUEST`) or a number (`400`)
/// - client message (optional), a string literal
///
/// The derive generates two methods:
/// - `http_code()` returns the `http::StatusCode`
/// - `http_message()` returns `Some(message)` when one was given, `None` otherwise
///
/// A variant without a message never leaks its details: the `Display` output of the
/// error is meant for server logs only. Messages support interpolation of tuple
/// indices (`"{0}"`) and struct fields (`"{field}"`).
///
/// Variants without `#[http_error]` map to `500 Internal Server Error` with no message.
///
/// ### Example
///
/// ```rust,ignore
/// #[derive(Debug, thiserror::Error, relay_macros::HttpError)]
/// enum Error {
///     #[error("required form fields missing")]
///     #[http_error(BAD_REQUEST, "Missing required fields")]
///     MissingFields,
///
///     #[error("storage error: {0}")]
///     #[http_error(INTERNAL_SERVER_ERROR)]
///     Storage(#[from] std::io::Error),
/// }
/// ```
#[proc_macro_derive(HttpError, attributes(http_error))]
pub fn http_error_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    http_error::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
