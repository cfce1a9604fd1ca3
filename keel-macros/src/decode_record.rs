use convert_case::{Case, Casing};
use syn::{ItemStruct, LitStr};

/// Table name from `#[keel(table = "...")]`, snake case of the struct name otherwise.
pub(crate) fn table_name(item: &ItemStruct) -> String {
    let mut result = item.ident.to_string().to_case(Case::Snake);
    for attr in item.attrs.iter().filter(|v| v.meta.path().is_ident("keel")) {
        let Ok(list) = attr.meta.require_list() else {
            panic!("Error while parsing `keel`, use it like: `#[keel(table = \"{result}\")]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                let Ok(v) = arg.value().and_then(|v| v.parse::<LitStr>()) else {
                    panic!("Error while parsing `table`, use it like: `#[keel(table = \"name\")]`");
                };
                result = v.value();
            } else {
                panic!(
                    "Unknown attribute `{}` inside keel macro",
                    arg.path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                );
            }
            Ok(())
        });
    }
    if result.is_empty() {
        panic!("The table name of `{}` cannot be empty", item.ident);
    }
    result
}
