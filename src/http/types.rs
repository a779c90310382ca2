use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// `OffsetDateTime` provides RFC-3339 (ISO-8601 subset) serialization, but the default
/// `serde::Serialize` implementation produces array of integers, which is great for binary
/// serialization, but infeasible to consume when returned from an API, and certainly
/// not human-readable.
///
/// With `#[sqlx(transparent)]` it's still decoded straight out of a `timestamptz` column.
#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(transparent)]
pub struct Timestamptz(pub OffsetDateTime);

impl Serialize for Timestamptz {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self
            .0
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}
