use proc_macro::TokenStream;

mod record;
mod util;

/// Derives `cookiejar::Record` for a struct.
///
/// Struct options, in `#[record(...)]`:
/// - `name = "..."`: the table name, defaults to the struct name.
/// - `jar_as(path)`: the path of the cookiejar crate, defaults to `::cookiejar`.
///
/// Field options:
/// - `#[record(handle)]`: the field owns handles that are released with the record.
///   The field type must implement `cookiejar::handle::HandleRefs`.
#[proc_macro_derive(Record, attributes(record))]
pub fn record(input: TokenStream) -> TokenStream {
    record::derive(input.into()).unwrap_or_else(|err| err.to_compile_error()).into()
}
