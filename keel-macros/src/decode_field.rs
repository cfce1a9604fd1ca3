use keel_core::{DdlOverride, FieldTag};
use syn::{Field, Ident, LitStr, Type};

/// How a struct field takes part in the record.
pub(crate) enum FieldKind {
    /// A mapped column, with its raw annotation.
    Column { tag: String, ddl_hook: bool },
    /// `#[keel(flatten)]`: the fields of an embedded record.
    Flatten,
    /// `#[keel(skip)]` or the `-` annotation.
    Skip,
}

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) kind: FieldKind,
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let Some(ident) = field.ident.clone() else {
        panic!("Record can only be derived for structs with named fields");
    };
    let mut kind = None;
    for attr in field.attrs.iter().filter(|v| v.meta.path().is_ident("keel")) {
        let Ok(list) = attr.meta.require_list() else {
            panic!(
                "Error while parsing `keel` on the field `{ident}`, use it like: `#[keel(\"name;primary\")]`"
            );
        };
        if let Ok(tag) = list.parse_args::<LitStr>() {
            kind = Some(FieldKind::Column {
                tag: tag.value(),
                ddl_hook: false,
            });
            continue;
        }
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("flatten") {
                kind = Some(FieldKind::Flatten);
            } else if arg.path.is_ident("skip") {
                kind = Some(FieldKind::Skip);
            } else {
                panic!(
                    "Unknown attribute `{}` on the field `{ident}`",
                    arg.path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                );
            }
            Ok(())
        });
    }
    let kind = match kind.unwrap_or(FieldKind::Column {
        tag: String::new(),
        ddl_hook: false,
    }) {
        FieldKind::Column { tag, .. } => {
            let name = ident.to_string();
            let parsed = match FieldTag::parse(&name, &tag) {
                Ok(v) => v,
                Err(e) => panic!("Invalid annotation on the field `{name}`: {e}"),
            };
            if parsed.skip {
                FieldKind::Skip
            } else {
                FieldKind::Column {
                    tag,
                    ddl_hook: parsed.ddl == Some(DdlOverride::Hook),
                }
            }
        }
        v => v,
    };
    FieldMetadata {
        ident,
        ty: field.ty.clone(),
        kind,
    }
}
