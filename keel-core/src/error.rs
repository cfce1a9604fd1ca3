use thiserror::Error;

/// Typed failures raised by keel itself, carried inside [`crate::Error`].
///
/// Driver errors are never wrapped into this type; they stay downcastable to the driver's own
/// error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// A read-only handle was asked to open a writable transaction.
    #[error("readonly executor cannot begin a writable transaction")]
    Readonly,
    /// A value `Vec` arrived with zero capacity.
    #[error(
        "the destination has zero capacity, reserve the number of rows expected or use a Vec<Box<T>>"
    )]
    EmptySlice,
    /// A returned column has no matching field in the destination record.
    #[error("missing column `{0}`")]
    MissingColumn(String),
    /// A column does not belong to the record currently filled by a joined scan.
    #[error("bad column name `{0}`")]
    BadColumn(String),
    /// A placeholder name was not found in the parameter source.
    #[error("missing key `{0}`")]
    MissingKey(String),
    /// The query returned no row where one was expected.
    #[error("no rows in result set")]
    NoRows,
    /// A joined scan ran out of destinations while columns remained.
    #[error("unexpected destination for the joined ordinal {0}")]
    UnexpectedDist(usize),
    /// The row shape does not match a positional destination.
    #[error("expected {expected} columns, the row has {found}")]
    ColumnCount { expected: usize, found: usize },
    /// The parameter source cannot bind the requested keys.
    #[error("bad params: {0}")]
    BadParams(String),
    /// A json document does not have the requested shape.
    #[error("unexpected json value at `{0}`")]
    UnexpectedJson(String),
    /// The transaction was already committed or rolled back.
    #[error("the transaction is already finished")]
    TxDone,
    /// Invalid record description or field tag.
    #[error("{0}")]
    Schema(String),
}

/// Inspection helpers over [`crate::Error`].
pub trait ErrorExt {
    fn data_error(&self) -> Option<&DataError>;
    fn is_readonly(&self) -> bool {
        matches!(self.data_error(), Some(DataError::Readonly))
    }
    fn is_no_rows(&self) -> bool {
        matches!(self.data_error(), Some(DataError::NoRows))
    }
}

impl ErrorExt for crate::Error {
    fn data_error(&self) -> Option<&DataError> {
        self.downcast_ref::<DataError>()
    }
}
