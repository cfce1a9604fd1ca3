use crate::{
    AnyJson, AsValue, Context, DataError, Hstore, Record, Registry, Result, RowLabeled, Value,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

/// Destination of one result row.
///
/// Records match the columns by name, maps capture every column, scalars and tuples take the
/// values positionally.
pub trait Decode: Sized + Send {
    /// Pointer-like destinations, a `Vec` of these can grow from zero capacity.
    const INDIRECT: bool = false;
    fn decode(row: RowLabeled, registry: &Registry) -> Result<Self>;
}

fn expect_columns(row: &RowLabeled, expected: usize) -> Result<()> {
    let found = row.values.len();
    if found != expected {
        return Err(DataError::ColumnCount { expected, found }.into());
    }
    Ok(())
}

macro_rules! impl_decode_scalar {
    ($($source:ty),+ $(,)?) => {
        $(
            impl Decode for $source {
                fn decode(row: RowLabeled, _registry: &Registry) -> Result<Self> {
                    expect_columns(&row, 1)?;
                    let value = row.values.into_vec().pop().unwrap_or_default();
                    <$source as AsValue>::try_from_value(value)
                }
            }
            impl Decode for Option<$source> {
                fn decode(row: RowLabeled, _registry: &Registry) -> Result<Self> {
                    expect_columns(&row, 1)?;
                    let value = row.values.into_vec().pop().unwrap_or_default();
                    <Option<$source> as AsValue>::try_from_value(value)
                }
            }
        )+
    };
}
impl_decode_scalar!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    Decimal,
    String,
    Vec<u8>,
    Date,
    PrimitiveDateTime,
    OffsetDateTime,
    Uuid,
    Hstore,
    serde_json::Value,
    AnyJson,
);

macro_rules! impl_decode_tuple {
    ($len:literal; $($T:ident),+) => {
        impl<$($T: AsValue + Send),+> Decode for ($($T,)+) {
            fn decode(row: RowLabeled, _registry: &Registry) -> Result<Self> {
                expect_columns(&row, $len)?;
                let mut values = row.values.into_vec().into_iter();
                Ok(($($T::try_from_value(values.next().unwrap_or_default())?,)+))
            }
        }
    };
}
impl_decode_tuple!(1; A);
impl_decode_tuple!(2; A, B);
impl_decode_tuple!(3; A, B, C);
impl_decode_tuple!(4; A, B, C, D);
impl_decode_tuple!(5; A, B, C, D, E);
impl_decode_tuple!(6; A, B, C, D, E, F);

impl Decode for HashMap<String, Value> {
    fn decode(row: RowLabeled, _registry: &Registry) -> Result<Self> {
        Ok(row
            .labels
            .iter()
            .cloned()
            .zip(row.values.into_vec())
            .collect())
    }
}

impl Decode for Vec<Value> {
    fn decode(row: RowLabeled, _registry: &Registry) -> Result<Self> {
        Ok(row.values.into_vec())
    }
}

impl<T: Decode> Decode for Box<T> {
    const INDIRECT: bool = true;
    fn decode(row: RowLabeled, registry: &Registry) -> Result<Self> {
        T::decode(row, registry).map(Box::new)
    }
}

/// Fill a default `R` matching every column by name.
pub fn decode_record<R: Record>(row: RowLabeled, registry: &Registry) -> Result<R> {
    let schema = registry.resolve::<R>()?;
    let mut result = R::default();
    for (label, value) in row.labels.iter().zip(row.values.into_vec()) {
        let Some(field) = schema.field(label) else {
            return Err(DataError::MissingColumn(label.clone()).into());
        };
        result.assign_at(&field.path, value).with_context(|| {
            format!(
                "While decoding the column `{}` into `{}`",
                label,
                schema.type_name()
            )
        })?;
    }
    Ok(result)
}
