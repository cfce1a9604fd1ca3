mod decode_field;
mod decode_record;
mod record_trait;

use decode_field::decode_field;
use decode_record::table_name;
use proc_macro::TokenStream;
use record_trait::record_trait;
use syn::{Fields, ItemStruct, parse_macro_input};

/// Derive `Record`, `Decode` and `Params` for a struct with named fields.
///
/// ```ignore
/// #[derive(Default, Record)]
/// #[keel(table = "users")]
/// struct User {
///     #[keel("id;primary;incr")]
///     id: i64,
///     #[keel("email;unique;length=~255")]
///     email: String,
///     #[keel(flatten)]
///     audit: Audit,
///     #[keel(skip)]
///     cache: Option<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(keel))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let Fields::Named(..) = &item.fields else {
        panic!(
            "Record can only be derived for structs with named fields, `{}` is not",
            item.ident
        );
    };
    let table = table_name(&item);
    let fields = item.fields.iter().map(decode_field).collect::<Vec<_>>();
    record_trait(&item, &table, &fields).into()
}
