mod support {
    pub mod recorder;
}

#[cfg(test)]
mod tests {
    use crate::support::recorder::{Person, Pet};
    use keel_core::{
        DataError, Decode, ErrorExt, JoinedDist, JoinedPart, Registry, RowLabeled, RowSet, Rows,
        Value, decode_joined,
    };
    use std::{collections::HashMap, sync::Arc};

    fn row(labels: &[&str], values: Vec<Value>) -> RowLabeled {
        RowLabeled::new(
            labels.iter().map(|v| v.to_string()).collect(),
            values.into(),
        )
    }

    fn people() -> Rows {
        Rows::new(
            RowSet {
                labels: ["id", "full_name", "age"]
                    .iter()
                    .map(|v| v.to_string())
                    .collect(),
                rows: vec![
                    vec![Value::Int64(Some(1)), Value::from("Ada"), Value::Int32(Some(36))].into(),
                    vec![Value::Int64(Some(2)), Value::from("Alan"), Value::Int32(None)].into(),
                ],
            },
            Arc::new(Registry::new()),
        )
    }

    #[test]
    fn records_match_by_name() {
        let registry = Registry::new();
        let person = Person::decode(
            row(
                &["age", "id", "full_name"],
                vec![Value::Int16(Some(40)), Value::Int32(Some(3)), Value::from("Grace")],
            ),
            &registry,
        )
        .unwrap();
        assert_eq!(
            person,
            Person {
                id: 3,
                name: "Grace".into(),
                age: Some(40),
            }
        );
        let partial = Person::decode(row(&["id"], vec![Value::Int64(Some(9))]), &registry).unwrap();
        assert_eq!(partial.name, "");
        let error = Person::decode(
            row(&["id", "email"], vec![Value::Int64(Some(1)), Value::from("x")]),
            &registry,
        )
        .unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::MissingColumn("email".into())));
    }

    #[test]
    fn positional_destinations() {
        let registry = Registry::new();
        let r = row(&["a", "b"], vec![Value::Int32(Some(1)), Value::from("x")]);
        let (a, b): (i64, String) = Decode::decode(r.clone(), &registry).unwrap();
        assert_eq!((a, b.as_str()), (1, "x"));
        let error = i32::decode(r.clone(), &registry).unwrap_err();
        assert_eq!(
            error.data_error(),
            Some(&DataError::ColumnCount {
                expected: 1,
                found: 2
            })
        );
        let map = HashMap::<String, Value>::decode(r.clone(), &registry).unwrap();
        assert_eq!(map["b"], Value::from("x"));
        assert_eq!(Vec::<Value>::decode(r, &registry).unwrap().len(), 2);
        let null: Option<String> =
            Decode::decode(row(&["a"], vec![Value::Varchar(None)]), &registry).unwrap();
        assert_eq!(null, None);
        assert!(String::decode(row(&["a"], vec![Value::Null]), &registry).is_err());
    }

    #[test]
    fn fetch_many_capacity() {
        let mut empty: Vec<Person> = Vec::new();
        let error = people().fetch_many(&mut empty).unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::EmptySlice));

        let mut values: Vec<Person> = Vec::with_capacity(1);
        values.push(Person::default());
        people().fetch_many(&mut values).unwrap();
        assert_eq!(
            values.iter().map(|v| v.id).collect::<Vec<_>>(),
            [0, 1, 2],
            "Rows are appended after the existing elements"
        );

        let mut boxed: Vec<Box<Person>> = Vec::new();
        people().fetch_many(&mut boxed).unwrap();
        assert_eq!(boxed[1].name, "Alan");
        assert_eq!(boxed[1].age, None);
    }

    #[test]
    fn scan_and_fetch_one() {
        let mut rows = people();
        assert_eq!(rows.columns(), ["id", "full_name", "age"]);
        assert_eq!(rows.len(), 2);
        let first: Person = rows.scan().unwrap().unwrap();
        assert_eq!(first.name, "Ada");
        let second: Person = rows.scan().unwrap().unwrap();
        assert_eq!(second.id, 2);
        assert!(rows.scan::<Person>().unwrap().is_none());
        let error = rows.fetch_one::<Person>().unwrap_err();
        assert!(error.is_no_rows());
    }

    #[test]
    fn joined_records() {
        let registry = Registry::new();
        let mut pair = (Person::default(), Pet::default());
        decode_joined(
            &mut pair,
            row(
                &["id", "full_name", "age", "pet_id", "owner_id"],
                vec![
                    Value::Int64(Some(1)),
                    Value::from("Ada"),
                    Value::Null,
                    Value::Int64(Some(10)),
                    Value::Int64(Some(1)),
                ],
            ),
            &registry,
        )
        .unwrap();
        assert_eq!(pair.0.name, "Ada");
        assert_eq!(pair.0.age, None);
        assert_eq!(pair.1, Pet { pet_id: 10, owner: 1 });

        // The first record takes as many columns as it has fields
        let error = decode_joined(
            &mut (Person::default(), Pet::default()),
            row(
                &["id", "full_name", "pet_id"],
                vec![Value::Int64(Some(1)), Value::from("Ada"), Value::Int64(Some(10))],
            ),
            &registry,
        )
        .unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::BadColumn("pet_id".into())));
    }

    #[derive(Default)]
    struct WithExtra {
        pet: Pet,
        extra: Vec<Value>,
    }

    impl JoinedDist for WithExtra {
        fn part(&mut self, ordinal: usize) -> Option<JoinedPart<'_>> {
            match ordinal {
                0 => Some(JoinedPart::Columns(&mut self.extra, 1)),
                1 => Some(JoinedPart::Record(&mut self.pet)),
                _ => None,
            }
        }
    }

    #[test]
    fn joined_columns() {
        let registry = Registry::new();
        let mut value = WithExtra::default();
        decode_joined(
            &mut value,
            row(
                &["rank", "pet_id", "owner_id"],
                vec![Value::Int32(Some(3)), Value::Int64(Some(4)), Value::Int64(Some(5))],
            ),
            &registry,
        )
        .unwrap();
        assert_eq!(value.extra, [Value::Int32(Some(3))]);
        assert_eq!(value.pet.owner, 5);

        let error = decode_joined(
            &mut WithExtra::default(),
            row(
                &["rank", "pet_id", "owner_id", "more"],
                vec![
                    Value::Int32(Some(3)),
                    Value::Int64(Some(4)),
                    Value::Int64(Some(5)),
                    Value::Null,
                ],
            ),
            &registry,
        )
        .unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::UnexpectedDist(2)));

        let mut many: Vec<WithExtra> = Vec::with_capacity(2);
        Rows::new(
            RowSet {
                labels: ["rank", "pet_id", "owner_id"]
                    .iter()
                    .map(|v| v.to_string())
                    .collect(),
                rows: vec![
                    vec![Value::Int32(Some(1)), Value::Int64(Some(1)), Value::Int64(Some(1))].into(),
                    vec![Value::Int32(Some(2)), Value::Int64(Some(2)), Value::Int64(Some(1))].into(),
                ],
            },
            Arc::new(registry),
        )
        .fetch_many_joined(&mut many)
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].pet.pet_id, 2);
    }
}
