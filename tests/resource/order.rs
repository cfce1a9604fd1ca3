use keel::{FieldDefinition, Record};
use rust_decimal::Decimal;
use time::Date;
use uuid::Uuid;

#[derive(Default, Debug, Clone, PartialEq, Record)]
pub struct Audit {
    #[keel("created_by;length=~32")]
    pub created_by: String,
    pub revision: Option<i64>,
}

#[derive(Default, Debug, Clone, PartialEq, Record)]
#[keel(table = "purchase_orders")]
pub struct PurchaseOrder {
    #[keel("order_id;primary;incr")]
    pub id: i64,
    #[keel("customer;length=~120;index=by_customer_date,asc,0")]
    pub customer: String,
    #[keel(";index=by_customer_date,desc,1")]
    pub placed_on: Option<Date>,
    #[keel("total;ddl=numeric(12, 2)")]
    pub total: Decimal,
    #[keel(";ddl")]
    pub status: String,
    pub reference: Uuid,
    #[keel(flatten)]
    pub audit: Audit,
    #[keel(skip)]
    pub dirty: bool,
    #[keel("-")]
    pub notes: Vec<String>,
}

impl PurchaseOrder {
    fn ddl_status() -> FieldDefinition {
        let mut definition = FieldDefinition::new("status", "varchar(16)");
        definition.check_and("status IN ('open', 'closed')");
        definition
    }
}
