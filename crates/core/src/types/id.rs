//! Typed row ids.
//!
//! Every console table uses a `SERIAL` key. Wrapping each in its own type
//! keeps an invite id from being passed where an admin id is expected, and
//! ids arriving from clients (path segments, JSON bodies) are rejected unless
//! positive, so `/api/activities/0` fails at the extractor instead of
//! reaching the database.

/// An id from a client was zero, negative or not a number.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid id {0:?}: must be a positive integer")]
pub struct IdError(pub String);

/// Define a typed id over `i32`.
///
/// ```rust
/// # use activity_console_core::define_id;
/// define_id!(BadgeId);
///
/// assert_eq!("12".parse::<BadgeId>().map(|id| id.as_i32()), Ok(12));
/// assert!("0".parse::<BadgeId>().is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "i32", into = "i32")]
        pub struct $name(i32);

        impl $name {
            /// Wrap a value already known to be a row id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::convert::TryFrom<i32> for $name {
            type Error = $crate::types::id::IdError;

            fn try_from(id: i32) -> ::core::result::Result<Self, Self::Error> {
                if id > 0 {
                    Ok(Self(id))
                } else {
                    Err($crate::types::id::IdError(id.to_string()))
                }
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                let id: i32 = s
                    .trim()
                    .parse()
                    .map_err(|_| $crate::types::id::IdError(s.to_owned()))?;
                Self::try_from(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::core::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(AdminUserId);
define_id!(AdminInviteId);
define_id!(StudentId);
define_id!(ActivityId);
define_id!(ActivityRecordId);
define_id!(AdminLogId);
define_id!(NotificationId);
