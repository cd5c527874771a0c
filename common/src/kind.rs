//! Macros for defining kind enums.

/// Macro for defining a kind enum.
///
/// Variants are represented as `SCREAMING_SNAKE_CASE` strings, both in
/// [`Display`]/[`FromStr`] and in the database (as `VARCHAR`).
///
/// # Example
///
/// ```rust
/// # use common::define_kind;
/// #
/// define_kind! {
///     #[doc = "Shape kind."]
///     enum Kind {
///         #[doc = "A cube"]
///         Cube,
///
///         #[doc = "A sphere"]
///         Sphere,
///     }
/// }
///
/// assert_eq!(Kind::Sphere.as_str(), "SPHERE");
/// ```
///
/// [`Display`]: std::fmt::Display
/// [`FromStr`]: std::str::FromStr
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            $crate::private::strum::IntoStaticStr,
            Eq,
            Hash,
            PartialEq,
        )]
        #[doc = $doc]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant,
            )*
        }

        impl $name {
            /// Returns the string representation of this value.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                self.into()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(VARCHAR, TEXT);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &'a [u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let s = <&str as $crate::private::postgres_types::FromSql>
                    ::from_sql(ty, raw)?;
                s.parse().map_err(|_| ::std::format!(
                    "invalid `{}` value: {s}",
                    ::core::stringify!($name),
                ).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(VARCHAR, TEXT);
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
                    &self.as_str(),
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

    define_kind! {
        #[doc = "Light of a traffic signal."]
        enum Light {
            #[doc = "Red."]
            Red,

            #[doc = "Flashing yellow."]
            FlashingYellow,
        }
    }

    #[test]
    fn uses_screaming_snake_case() {
        assert_eq!(Light::FlashingYellow.to_string(), "FLASHING_YELLOW");
        assert_eq!(Light::Red.as_str(), "RED");
        assert_eq!(
            Light::from_str("FLASHING_YELLOW").unwrap(),
            Light::FlashingYellow,
        );
    }

    #[test]
    fn parsing_is_exact() {
        assert!(Light::from_str("red").is_err());
        assert!(Light::from_str("FlashingYellow").is_err());
        assert!(Light::from_str("").is_err());
    }
}
