mod support {
    pub mod recorder;
}

#[cfg(test)]
mod tests {
    use crate::support::recorder::{DollarWriter, Person};
    use keel_core::{
        DataError, ErrorExt, Params, Registry, Value, params, placeholders, scan_params,
    };
    use std::{borrow::Cow, collections::BTreeMap};

    #[test]
    fn rewrites_in_order() {
        let (sql, keys) = scan_params(
            "SELECT * FROM t WHERE a = ${a} AND b > ${b} OR a = ${a}",
            &DollarWriter,
        );
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b > $2 OR a = $3");
        assert_eq!(keys.unwrap(), ["a", "b", "a"]);
    }

    #[test]
    fn quotes_suppress_recognition() {
        let (sql, keys) = scan_params(
            r#"SELECT '${a}', "${b}", ${c}, 'it''s ${d}' FROM t"#,
            &DollarWriter,
        );
        assert_eq!(sql, r#"SELECT '${a}', "${b}", $1, 'it''s ${d}' FROM t"#);
        assert_eq!(keys.unwrap(), ["c"]);
    }

    #[test]
    fn plain_text_is_borrowed() {
        for text in ["SELECT 1", "SELECT $1", "SELECT '${a}'", "SELECT ${a"] {
            let (sql, keys) = scan_params(text, &DollarWriter);
            assert!(matches!(sql, Cow::Borrowed(..)), "{text}");
            assert_eq!(sql, text);
            assert!(keys.is_none());
        }
    }

    #[test]
    fn unterminated_tokens_stay() {
        let found = placeholders("${a ' ${b} ' ${c}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "c");
        assert_eq!(&"${a ' ${b} ' ${c}"[found[0].begin..found[0].end], "${c}");
        assert!(placeholders("$$ ${").is_empty());
    }

    #[test]
    fn map_sources() {
        let registry = Registry::new();
        let keys = vec!["b".to_string(), "a".to_string()];
        let map = params!("a" => 1, "b" => "two");
        assert_eq!(
            map.param_values(Some(&keys), &registry).unwrap(),
            [Value::from("two"), Value::Int32(Some(1))]
        );
        let mut tree = BTreeMap::new();
        tree.insert("a".to_string(), Value::Boolean(Some(true)));
        let error = tree.param_values(Some(&keys), &registry).unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::MissingKey("b".into())));
    }

    #[test]
    fn record_source() {
        let registry = Registry::new();
        let person = Person {
            id: 7,
            name: "Alan".into(),
            age: None,
        };
        let keys = vec!["full_name".to_string(), "id".to_string(), "age".to_string()];
        assert_eq!(
            person.param_values(Some(&keys), &registry).unwrap(),
            [
                Value::Varchar(Some("Alan".into())),
                Value::Int64(Some(7)),
                Value::Int32(None),
            ]
        );
        let error = person
            .param_values(Some(&["name".to_string()]), &registry)
            .unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::MissingKey("name".into())));
    }
}
