//! One-time password reset codes.

use core::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`ResetCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResetCodeError {
    /// The code is not exactly six ASCII digits.
    #[error("reset code must be exactly {len} digits")]
    InvalidFormat {
        /// Required number of digits.
        len: usize,
    },
}

/// A six-digit numeric code emailed to a user to authorize a password reset.
///
/// Clients submit the code either as a JSON number (`123456`) or as a
/// string (`"123456"`); both deserialize to the same value. The code is
/// always serialized as a string.
///
/// ```
/// use crime_track_core::ResetCode;
///
/// let code = ResetCode::generate();
/// assert_eq!(code.as_str().len(), 6);
/// assert!(ResetCode::parse("12345").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResetCode(String);

impl ResetCode {
    /// Number of digits in a code.
    pub const LEN: usize = 6;

    /// Generate a fresh code uniformly from `100000..=999999`.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let code: u32 = rand::rng().random_range(100_000..1_000_000);
        Self(code.to_string())
    }

    /// Parse a code from user input.
    ///
    /// # Errors
    ///
    /// Returns [`ResetCodeError::InvalidFormat`] unless the trimmed input is
    /// exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, ResetCodeError> {
        let trimmed = s.trim();
        if trimmed.len() != Self::LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResetCodeError::InvalidFormat { len: Self::LEN });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare two codes without short-circuiting on the first mismatch.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let (a, b) = (self.0.as_bytes(), other.0.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

// Codes are credentials; keep them out of logs.
impl fmt::Debug for ResetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResetCode([REDACTED])")
    }
}

impl fmt::Display for ResetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ResetCode {
    type Err = ResetCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ResetCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResetCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CodeVisitor;

        impl Visitor<'_> for CodeVisitor {
            type Value = ResetCode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a six-digit code as a number or string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ResetCode::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                ResetCode::parse(&v.to_string()).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                ResetCode::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CodeVisitor)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ResetCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ResetCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ResetCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
