use bytes::BytesMut;
use keel_core::{Hstore, Value};
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{error::Error, io::Read};
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

#[derive(Debug)]
pub(crate) struct ValueHolder(pub(crate) Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

pub(crate) fn is_hstore(ty: &Type) -> bool {
    ty.name() == "hstore"
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        if is_hstore(ty) {
            return Ok(Value::Hstore(match raw {
                Some(raw) => Some(Hstore::from_sql(ty, raw)?),
                None => None,
            })
            .into());
        }
        macro_rules! to_value {
            ($ty_var:ident, $raw:ident, $($($ty:path)|+ => ( $value:path, $source:ty ) ,)+) => {
                match *$ty_var {
                    $($($ty)|+ => $value(if let Some($raw) = $raw { Some(<$source>::from_sql($ty_var, $raw)?.into()) } else { None }),)+
                    _ => {
                        if let Some(mut raw) = $raw {
                            let mut buf = String::new();
                            let _ = raw.read_to_string(&mut buf);
                            return Err(keel_core::Error::msg(format!("Cannot decode sql type: `{}`, value: `{}`", $ty_var, buf)).into());
                        }
                        Value::Null
                    }
                }
            };
        }
        let value = to_value!(ty, raw,
            Type::BOOL => (Value::Boolean, bool),
            Type::CHAR => (Value::Int8, i8),
            Type::INT2 => (Value::Int16, i16),
            Type::INT4 => (Value::Int32, i32),
            Type::INT8 => (Value::Int64, i64),
            Type::FLOAT4 => (Value::Float32, f32),
            Type::FLOAT8 => (Value::Float64, f64),
            Type::NUMERIC => (Value::Decimal, Decimal),
            Type::OID => (Value::UInt32, u32),
            Type::VARCHAR
            | Type::TEXT
            | Type::NAME
            | Type::BPCHAR
            | Type::XML
            | Type::UNKNOWN => (Value::Varchar, String),
            Type::JSON | Type::JSONB => (Value::Json, serde_json::Value),
            Type::BYTEA => (Value::Blob, Vec<u8>),
            Type::DATE => (Value::Date, Date),
            Type::TIMESTAMP => (Value::Timestamp, PrimitiveDateTime),
            Type::TIMESTAMPTZ => (Value::TimestampWithTimezone, OffsetDateTime),
            Type::UUID => (Value::Uuid, Uuid),
        );
        Ok(value.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn integer(value: &Value) -> Option<Option<i128>> {
    Some(match value {
        Value::Int8(v) => v.map(Into::into),
        Value::Int16(v) => v.map(Into::into),
        Value::Int32(v) => v.map(Into::into),
        Value::Int64(v) => v.map(Into::into),
        Value::UInt8(v) => v.map(Into::into),
        Value::UInt16(v) => v.map(Into::into),
        Value::UInt32(v) => v.map(Into::into),
        Value::UInt64(v) => v.map(Into::into),
        _ => return None,
    })
}

/// Integers are encoded with the width the server asks for, unsigned ones usually land in a
/// `numeric` column.
fn integer_to_sql(v: Option<i128>, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let Some(v) = v else {
        return Ok(IsNull::Yes);
    };
    match *ty {
        Type::CHAR => i8::try_from(v)?.to_sql(ty, out),
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => i64::try_from(v)?.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from_i128(v)
            .ok_or_else(|| format!("{} does not fit into numeric", v))?
            .to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
        _ => Err(format!("Cannot encode the integer {} as `{}`", v, ty).into()),
    }
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        if let Some(v) = integer(&self.0) {
            return integer_to_sql(v, ty, out);
        }
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Float32(v) if *ty == Type::FLOAT8 => v.map(f64::from).to_sql(ty, out),
            Value::Float32(v) if *ty == Type::NUMERIC => {
                v.and_then(Decimal::from_f32).to_sql(ty, out)
            }
            Value::Float32(v) => v.to_sql(ty, out),
            Value::Float64(v) if *ty == Type::FLOAT4 => v.map(|v| v as f32).to_sql(ty, out),
            Value::Float64(v) if *ty == Type::NUMERIC => {
                v.and_then(Decimal::from_f64).to_sql(ty, out)
            }
            Value::Float64(v) => v.to_sql(ty, out),
            Value::Decimal(v) if *ty == Type::FLOAT8 => {
                v.and_then(|v| v.to_f64()).to_sql(ty, out)
            }
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::Varchar(Some(v)) if matches!(*ty, Type::JSON | Type::JSONB) => {
                serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
            }
            Value::Varchar(v) => v.to_sql(ty, out),
            Value::Blob(v) => v.as_deref().to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampWithTimezone(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Hstore(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            v => Err(keel_core::Error::msg(format!(
                "keel::Value variant `{:?}` is not supported by Postgres",
                v
            ))
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}
