//! Payment definitions.

use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use strum::EnumString;
use uuid::Uuid;

use crate::domain::sale;
#[cfg(doc)]
use crate::domain::Sale;

/// ID of a payment correlating a payment gateway notification with its
/// [`Sale`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[expect(clippy::new_without_default, reason = "always random")]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Outcome of a payment reported by the payment gateway.
///
/// Parsed case-insensitively, accepting both English and Portuguese
/// spellings.
#[derive(Clone, Copy, Debug, EnumString, Eq, PartialEq, strum::Display)]
#[strum(ascii_case_insensitive)]
pub enum Outcome {
    /// Payment went through.
    #[strum(to_string = "APPROVED", serialize = "EFETUADO")]
    Approved,

    /// Payment was canceled by the buyer or the gateway.
    #[strum(to_string = "CANCELED", serialize = "CANCELADO")]
    Canceled,
}

impl Outcome {
    /// Returns the terminal [`sale::Status`] this [`Outcome`] settles a
    /// [`Sale`] into.
    #[must_use]
    pub const fn status(self) -> sale::Status {
        match self {
            Self::Approved => sale::Status::Sold,
            Self::Canceled => sale::Status::Canceled,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::domain::sale;

    use super::Outcome;

    #[test]
    fn recognizes_all_spellings_in_any_case() {
        for raw in ["approved", "APPROVED", "Approved", "efetuado", "Efetuado"]
        {
            assert_eq!(Outcome::from_str(raw).unwrap(), Outcome::Approved);
        }
        for raw in ["canceled", "CANCELED", "cancelado", "CANCELADO"] {
            assert_eq!(Outcome::from_str(raw).unwrap(), Outcome::Canceled);
        }
    }

    #[test]
    fn rejects_unknown_statuses() {
        for raw in ["", "PENDING", "cancelled", " APPROVED", "APPROVED ", "ok"] {
            assert!(Outcome::from_str(raw).is_err(), "`{raw}` was accepted");
        }
    }

    #[test]
    fn settles_into_terminal_status() {
        assert_eq!(Outcome::Approved.status(), sale::Status::Sold);
        assert_eq!(Outcome::Canceled.status(), sale::Status::Canceled);
        assert_eq!(Outcome::Approved.to_string(), "APPROVED");
    }

    #[test]
    fn displays_canonical_spelling() {
        for (raw, shown) in [
            ("efetuado", "APPROVED"),
            ("Approved", "APPROVED"),
            ("CANCELADO", "CANCELED"),
            ("canceled", "CANCELED"),
        ] {
            assert_eq!(Outcome::from_str(raw).unwrap().to_string(), shown);
        }
    }
}
