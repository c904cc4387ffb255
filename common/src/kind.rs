//! Macros for defining kind enums.

/// Defines a fieldless enum backed by a [`u8`].
///
/// Generated enum can be converted to and from its [`u8`] representation,
/// displayed and parsed in `SCREAMING_SNAKE_CASE`, and (with the
/// corresponding features enabled) stored in Postgres as `INT2` and
/// (de)serialized with [`serde`].
///
/// # Example
///
/// ```rust
/// # use common::define_kind;
/// define_kind! {
///     #[doc = "Light state."]
///     enum Light {
///         #[doc = "Light is off."]
///         Off = 1,
///
///         #[doc = "Light is on."]
///         On = 2,
///     }
/// }
///
/// assert_eq!(Light::from_u8(2), Some(Light::On));
/// assert_eq!(Light::Off.to_string(), "OFF");
/// ```
///
/// [`serde`]: https://docs.rs/serde
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
        )]
        #[cfg_attr(
            feature = "serde",
            derive(
                $crate::private::serde::Deserialize,
                $crate::private::serde::Serialize,
            ),
            serde(rename_all = "SCREAMING_SNAKE_CASE"),
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant = $value,
            )*
        }

        impl $name {
            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Converts the provided [`u8`] representation back.
            ///
            /// [`None`] is returned if it matches no variant.
            #[must_use]
            pub const fn from_u8(value: u8) -> Option<Self> {
                $(
                    if value == Self::$variant.u8() {
                        return Some(Self::$variant);
                    }
                )*
                None
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let v = u8::try_from(
                    <i16 as $crate::private::postgres_types::FromSql<'_>>
                        ::from_sql(ty, raw)?,
                )?;
                Self::from_u8(v).ok_or_else(|| {
                    ::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                $crate::private::postgres_types::ToSql::to_sql(
                    &i16::from(self.u8()),
                    ty,
                    w,
                )
            }
        }
    };
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    crate::define_kind! {
        #[doc = "Test kind."]
        enum Phase {
            #[doc = "First phase."]
            Draft = 1,

            #[doc = "Second phase."]
            FinalReview = 2,
        }
    }

    #[test]
    fn converts_u8() {
        assert_eq!(Phase::Draft.u8(), 1);
        assert_eq!(Phase::from_u8(2), Some(Phase::FinalReview));
        assert_eq!(Phase::from_u8(0), None);
        assert_eq!(Phase::from_u8(3), None);
    }

    #[test]
    fn displays_and_parses() {
        assert_eq!(Phase::FinalReview.to_string(), "FINAL_REVIEW");
        assert_eq!(Phase::from_str("DRAFT").unwrap(), Phase::Draft);
        assert!(Phase::from_str("draft").is_err());
    }
}
