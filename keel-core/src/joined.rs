use crate::{DataError, DynRecord, Record, Registry, Result, RowLabeled, Value};

/// One destination of a joined row.
pub enum JoinedPart<'a> {
    /// A record consuming as many columns as it has fields.
    Record(&'a mut dyn DynRecord),
    /// A raw list receiving the next `n` columns as they are.
    Columns(&'a mut Vec<Value>, usize),
}

/// Root of a multi-entity row: `part(ordinal)` returns the destination of the ordinal-th segment,
/// `None` when there are no more destinations.
pub trait JoinedDist: Send {
    /// Pointer-like destinations, a `Vec` of these can grow from zero capacity.
    const INDIRECT: bool = false;
    fn part(&mut self, ordinal: usize) -> Option<JoinedPart<'_>>;
}

impl<D: JoinedDist> JoinedDist for Box<D> {
    const INDIRECT: bool = true;
    fn part(&mut self, ordinal: usize) -> Option<JoinedPart<'_>> {
        (**self).part(ordinal)
    }
}

macro_rules! impl_joined_tuple {
    ($($T:ident $i:tt),+) => {
        impl<$($T: Record),+> JoinedDist for ($($T,)+) {
            fn part(&mut self, ordinal: usize) -> Option<JoinedPart<'_>> {
                match ordinal {
                    $($i => Some(JoinedPart::Record(&mut self.$i)),)+
                    _ => None,
                }
            }
        }
    };
}
impl_joined_tuple!(A 0, B 1);
impl_joined_tuple!(A 0, B 1, C 2);
impl_joined_tuple!(A 0, B 1, C 2, D 3);

/// Spread the columns of `row` left to right over the parts of `dist`.
pub fn decode_joined<D: JoinedDist + ?Sized>(
    dist: &mut D,
    row: RowLabeled,
    registry: &Registry,
) -> Result<()> {
    let total = row.values.len();
    let mut columns = row.labels.iter().zip(row.values.into_vec()).peekable();
    let mut ordinal = 0;
    while columns.peek().is_some() {
        let Some(part) = dist.part(ordinal) else {
            return Err(DataError::UnexpectedDist(ordinal).into());
        };
        ordinal += 1;
        match part {
            JoinedPart::Columns(out, n) => {
                let remaining = columns.len();
                if remaining < n {
                    return Err(DataError::ColumnCount {
                        expected: total - remaining + n,
                        found: total,
                    }
                    .into());
                }
                out.extend(columns.by_ref().take(n).map(|(_, v)| v));
            }
            JoinedPart::Record(record) => {
                let schema = record.dyn_schema(registry)?;
                for _ in 0..schema.len() {
                    let Some((label, value)) = columns.next() else {
                        break;
                    };
                    let Some(field) = schema.field(label) else {
                        return Err(DataError::BadColumn(label.clone()).into());
                    };
                    record.dyn_assign(&field.path, value)?;
                }
            }
        }
    }
    Ok(())
}
