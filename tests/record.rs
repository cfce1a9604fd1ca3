mod resource {
    pub mod order;
}

#[cfg(test)]
mod tests {
    use crate::resource::order::{Audit, PurchaseOrder};
    use indoc::indoc;
    use keel::{
        DataError, Decode, ErrorExt, GenericSqlWriter, Params, Record, Registry, RowLabeled, Value,
        create_table_sql, params,
    };
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use time::macros::date;
    use uuid::Uuid;

    #[derive(Default, Record)]
    struct LineItem {
        #[keel(";primary")]
        line_id: i32,
        quantity: u16,
    }

    fn order() -> PurchaseOrder {
        PurchaseOrder {
            id: 12,
            customer: "Ufficio Tecnico".into(),
            placed_on: Some(date!(2024 - 03 - 18)),
            total: Decimal::from_str("1249.90").unwrap(),
            status: "open".into(),
            reference: Uuid::from_u128(0x5c1f_ba0d),
            audit: Audit {
                created_by: "clerk".into(),
                revision: Some(3),
            },
            dirty: true,
            notes: vec!["call first".into()],
        }
    }

    #[test]
    fn table_names() {
        assert_eq!(PurchaseOrder::table_name(), "purchase_orders");
        assert_eq!(LineItem::table_name(), "line_item");
        assert_eq!(Audit::table_name(), "audit");
    }

    #[test]
    fn schema() {
        let registry = Registry::new();
        let schema = registry.resolve::<PurchaseOrder>().unwrap();
        let names: Vec<_> = schema.fields().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "order_id",
                "customer",
                "placed_on",
                "total",
                "status",
                "reference",
                "created_by",
                "revision",
            ]
        );
        assert_eq!(&*schema.field("created_by").unwrap().path, [6, 0]);
        assert_eq!(&*schema.field("reference").unwrap().path, [5]);
        assert!(schema.field("dirty").is_none());
        assert!(schema.field("notes").is_none());
        assert!(schema.field("placed_on").unwrap().nullable);
        assert!(!schema.field("total").unwrap().nullable);
        let primary: Vec<_> = schema.primary_keys().map(|v| v.ident).collect();
        assert_eq!(primary, ["id"]);
    }

    #[test]
    fn create_table() {
        let registry = Registry::new();
        let sql = create_table_sql::<PurchaseOrder>(&GenericSqlWriter, &registry).unwrap();
        assert_eq!(
            sql,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "purchase_orders" (
                "order_id" BIGINT NOT NULL,
                "customer" VARCHAR(120) NOT NULL,
                "placed_on" DATE,
                "total" numeric(12, 2) NOT NULL,
                "status" varchar(16) NOT NULL CHECK (status IN ('open', 'closed')),
                "reference" UUID NOT NULL,
                "created_by" VARCHAR(32) NOT NULL,
                "revision" BIGINT,
                PRIMARY KEY ("order_id")
                );
                CREATE INDEX IF NOT EXISTS "by_customer_date" ON "purchase_orders" ("customer" ASC, "placed_on" DESC);"#}
        );
        assert_eq!(
            create_table_sql::<LineItem>(&GenericSqlWriter, &registry).unwrap(),
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "line_item" (
                "line_id" INTEGER NOT NULL,
                "quantity" USMALLINT NOT NULL,
                PRIMARY KEY ("line_id")
                );"#}
        );
        let error = create_table_sql::<Audit>(&GenericSqlWriter, &registry).unwrap_err();
        assert!(matches!(error.data_error(), Some(DataError::Schema(..))));
    }

    #[test]
    fn field_access() {
        let mut order = order();
        assert_eq!(order.value_at(&[1]).unwrap(), Value::from("Ufficio Tecnico"));
        assert_eq!(order.value_at(&[6, 1]).unwrap(), Value::Int64(Some(3)));
        assert_eq!(order.value_at(&[2]).unwrap(), Value::Date(Some(date!(2024 - 03 - 18))));
        order.assign_at(&[6, 1], Value::Null).unwrap();
        assert_eq!(order.audit.revision, None);
        order.assign_at(&[0], Value::Int32(Some(99))).unwrap();
        assert_eq!(order.id, 99);
        assert!(order.value_at(&[7]).is_err());
        assert!(order.value_at(&[6, 4]).is_err());
        assert!(order.assign_at(&[1], Value::Int64(Some(1))).is_err());
    }

    #[test]
    fn decode() {
        let registry = Registry::new();
        let labels = ["order_id", "customer", "total", "created_by", "revision"];
        let row = RowLabeled::new(
            labels.iter().map(|v| v.to_string()).collect(),
            vec![
                Value::Int64(Some(5)),
                Value::from("Ada"),
                Value::Decimal(Some(Decimal::new(1050, 2))),
                Value::from("system"),
                Value::Int64(None),
            ]
            .into(),
        );
        let decoded = PurchaseOrder::decode(row, &registry).unwrap();
        assert_eq!(decoded.id, 5);
        assert_eq!(decoded.customer, "Ada");
        assert_eq!(decoded.total, Decimal::new(1050, 2));
        assert_eq!(decoded.audit.created_by, "system");
        assert_eq!(decoded.audit.revision, None);
        assert_eq!(decoded.placed_on, None);
        assert!(!decoded.dirty);
        assert!(decoded.notes.is_empty());

        let row = RowLabeled::new(
            ["order_id", "dirty"].iter().map(|v| v.to_string()).collect(),
            vec![Value::Int64(Some(5)), Value::Boolean(Some(true))].into(),
        );
        let error = PurchaseOrder::decode(row, &registry).unwrap_err();
        assert_eq!(
            error.data_error(),
            Some(&DataError::MissingColumn("dirty".into()))
        );
    }

    #[test]
    fn params() {
        let registry = Registry::new();
        let order = order();
        let keys: Vec<String> = ["created_by", "order_id", "created_by"]
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(
            order.param_values(Some(&keys), &registry).unwrap(),
            [Value::from("clerk"), Value::Int64(Some(12)), Value::from("clerk")]
        );
        let keys = vec!["notes".to_string()];
        let error = order.param_values(Some(&keys), &registry).unwrap_err();
        assert_eq!(error.data_error(), Some(&DataError::MissingKey("notes".into())));
        assert!(order.param_values(None, &registry).unwrap().is_empty());

        let map = params!("customer" => "Ada", "total" => Decimal::ONE);
        let keys = vec!["total".to_string()];
        assert_eq!(
            map.param_values(Some(&keys), &registry).unwrap(),
            [Value::Decimal(Some(Decimal::ONE))]
        );
    }
}
