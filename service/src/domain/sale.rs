//! [`Sale`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::payment;

/// Vehicle listed for sale, tracked from its listing up to the payment
/// settlement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sale {
    /// ID of this [`Sale`].
    pub id: Id,

    /// ID of the listed vehicle in the catalog.
    pub vehicle_id: VehicleId,

    /// [`Brand`] of the listed vehicle.
    pub brand: Brand,

    /// [`Model`] of the listed vehicle.
    pub model: Model,

    /// [`Price`] the vehicle is listed for.
    pub price: Price,

    /// Current [`Status`] of this [`Sale`].
    pub status: Status,

    /// [`Purchase`] initiated for this [`Sale`], if any.
    ///
    /// Once set, it's never cleared.
    pub purchase: Option<Purchase>,

    /// [`DateTime`] when this [`Sale`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Sale`] was modified the last time.
    pub updated_at: ModificationDateTime,
}

impl Sale {
    /// Creates a new [`Status::Available`] [`Sale`] out of the provided raw
    /// listing data.
    ///
    /// # Errors
    ///
    /// Checks are performed in the following order, the first failed one
    /// being reported:
    /// 1. [`ValidationError::EmptyVehicleId`];
    /// 2. [`ValidationError::NonPositivePrice`];
    /// 3. [`ValidationError::EmptyBrandOrModel`].
    pub fn new(
        vehicle_id: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, ValidationError> {
        use ValidationError as E;

        let vehicle_id = VehicleId::new(vehicle_id).ok_or(E::EmptyVehicleId)?;
        let (brand, model, price) = Listing::validate(brand, model, price)?;

        let now = DateTimeOf::<()>::now();
        Ok(Self {
            id: Id::new(),
            vehicle_id,
            brand,
            model,
            price,
            status: Status::Available,
            purchase: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        })
    }

    /// Overwrites the descriptive fields of this [`Sale`] with the provided
    /// [`Listing`].
    ///
    /// Current [`Status`] is not checked.
    pub fn relist(&mut self, listing: Listing) {
        let Listing {
            brand,
            model,
            price,
        } = listing;

        self.brand = brand;
        self.model = model;
        self.price = price;
        self.touch();
    }

    /// Initiates a [`Purchase`] of this [`Sale`] by the provided buyer,
    /// moving it to the [`Status::PendingPayment`].
    ///
    /// Returns the freshly generated [`payment::Id`] to await the payment
    /// notification for.
    ///
    /// # Errors
    ///
    /// Returns the current [`Status`] if this [`Sale`] is not
    /// [`Status::Available`]. This [`Sale`] is left untouched in such case.
    pub fn purchase(
        &mut self,
        buyer_cpf: BuyerCpf,
    ) -> Result<payment::Id, Status> {
        if self.status != Status::Available {
            return Err(self.status);
        }

        let purchase = Purchase {
            payment_id: payment::Id::new(),
            buyer_cpf,
            purchased_at: DateTimeOf::now(),
        };
        let payment_id = purchase.payment_id;

        self.purchase = Some(purchase);
        self.status = Status::PendingPayment;
        self.touch();

        Ok(payment_id)
    }

    /// Settles the pending payment of this [`Sale`] with the provided
    /// [`payment::Outcome`].
    ///
    /// # Errors
    ///
    /// Returns the current [`Status`] if this [`Sale`] is not
    /// [`Status::PendingPayment`]. This [`Sale`] is left untouched in such
    /// case.
    pub fn settle(&mut self, outcome: payment::Outcome) -> Result<(), Status> {
        if self.status != Status::PendingPayment {
            return Err(self.status);
        }

        self.status = outcome.status();
        self.touch();

        Ok(())
    }

    /// Returns the [`payment::Id`] of this [`Sale`], if its [`Purchase`] was
    /// initiated.
    #[must_use]
    pub fn payment_id(&self) -> Option<payment::Id> {
        self.purchase.as_ref().map(|p| p.payment_id)
    }

    /// Bumps the modification [`DateTime`] of this [`Sale`].
    fn touch(&mut self) {
        self.updated_at = DateTimeOf::now();
    }
}

/// Purchase of a [`Sale`], initiated by a buyer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Purchase {
    /// ID of the payment awaited for this [`Purchase`].
    pub payment_id: payment::Id,

    /// [`BuyerCpf`] of the buyer.
    pub buyer_cpf: BuyerCpf,

    /// [`DateTime`] when this [`Purchase`] was initiated.
    pub purchased_at: PurchaseDateTime,
}

/// Validated descriptive fields of a [`Sale`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Listing {
    /// [`Brand`] of the listed vehicle.
    pub brand: Brand,

    /// [`Model`] of the listed vehicle.
    pub model: Model,

    /// [`Price`] the vehicle is listed for.
    pub price: Price,
}

impl Listing {
    /// Creates a new [`Listing`] out of the provided raw data.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NonPositivePrice`] is checked before
    /// [`ValidationError::EmptyBrandOrModel`].
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, ValidationError> {
        let (brand, model, price) = Self::validate(brand, model, price)?;
        Ok(Self {
            brand,
            model,
            price,
        })
    }

    /// Validates the raw descriptive fields in the same order for both new
    /// and updated [`Sale`]s.
    fn validate(
        brand: impl Into<String>,
        model: impl Into<String>,
        price: Decimal,
    ) -> Result<(Brand, Model, Price), ValidationError> {
        use ValidationError as E;

        let price = Price::new(price).ok_or(E::NonPositivePrice)?;
        let brand = Brand::new(brand);
        let model = Model::new(model);
        let (brand, model) = brand.zip(model).ok_or(E::EmptyBrandOrModel)?;

        Ok((brand, model, price))
    }
}

/// Error of validating [`Sale`] data.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// [`VehicleId`] is empty.
    #[display("`vehicle_id` cannot be empty")]
    EmptyVehicleId,

    /// [`Price`] is zero or negative.
    #[display("`price` must be greater than zero")]
    NonPositivePrice,

    /// Either [`Brand`] or [`Model`] is empty.
    #[display("`brand` and `model` are required for listing")]
    EmptyBrandOrModel,
}

/// ID of a [`Sale`].
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

/// ID of a vehicle in the external catalog.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct VehicleId(String);

impl VehicleId {
    /// Creates a new [`VehicleId`] if the given `id` is not empty.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.is_empty()).then_some(Self(id))
    }
}

/// Brand of a listed vehicle.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Brand(String);

impl Brand {
    /// Creates a new [`Brand`] if the given `brand` is not empty.
    #[must_use]
    pub fn new(brand: impl Into<String>) -> Option<Self> {
        let brand = brand.into();
        (!brand.is_empty()).then_some(Self(brand))
    }
}

/// Model of a listed vehicle.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Model(String);

impl Model {
    /// Creates a new [`Model`] if the given `model` is not empty.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Option<Self> {
        let model = model.into();
        (!model.is_empty()).then_some(Self(model))
    }
}

/// Strictly positive amount a vehicle is listed for.
///
/// No currency is attached, and the amount is never rounded.
#[derive(Clone, Copy, Debug, Display, Eq, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Price(Decimal);

impl Price {
    /// Creates a new [`Price`] if the given `amount` is greater than zero.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (amount > Decimal::ZERO).then_some(Self(amount))
    }

    /// Returns the amount of this [`Price`].
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }
}

/// [CPF] of a buyer, identifying them for taxation purposes.
///
/// [CPF]: https://en.wikipedia.org/wiki/CPF_number
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct BuyerCpf(String);

impl BuyerCpf {
    /// Creates a new [`BuyerCpf`] if the given `cpf` is not blank.
    #[must_use]
    pub fn new(cpf: impl Into<String>) -> Option<Self> {
        let cpf = cpf.into();
        (!cpf.trim().is_empty()).then_some(Self(cpf))
    }
}

define_kind! {
    #[doc = "Status of a [`Sale`]."]
    enum Status {
        #[doc = "[`Sale`] is listed and may be purchased."]
        Available,

        #[doc = "[`Sale`] is purchased and awaits its payment settlement."]
        PendingPayment,

        #[doc = "[`Sale`] is paid. Terminal."]
        Sold,

        #[doc = "[`Sale`] payment is canceled. Terminal."]
        Canceled,
    }
}

impl Status {
    /// Indicates whether no transition leaves this [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sold | Self::Canceled)
    }
}

/// [`DateTime`] when a [`Sale`] was created.
pub type CreationDateTime = DateTimeOf<(Sale, unit::Creation)>;

/// [`DateTime`] when a [`Sale`] was modified the last time.
pub type ModificationDateTime = DateTimeOf<(Sale, unit::Modification)>;

/// [`DateTime`] when a [`Purchase`] was initiated.
pub type PurchaseDateTime = DateTimeOf<(Sale, Purchase)>;

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::domain::payment;

    use super::{BuyerCpf, Listing, Price, Sale, Status, ValidationError};

    fn cpf() -> BuyerCpf {
        BuyerCpf::new("12345678900").unwrap()
    }

    #[test]
    fn creates_available_sale() {
        let sale =
            Sale::new("veh-1", "Fiat", "Toro", Decimal::from(150_000)).unwrap();

        assert_eq!(sale.status, Status::Available);
        assert_eq!(sale.vehicle_id.as_ref(), "veh-1");
        assert_eq!(sale.brand.as_ref(), "Fiat");
        assert_eq!(sale.model.as_ref(), "Toro");
        assert_eq!(sale.price.amount(), Decimal::from(150_000));
        assert_eq!(sale.purchase, None);
        assert_eq!(sale.created_at.coerce::<()>(), sale.updated_at.coerce());
    }

    #[test]
    fn generates_distinct_ids() {
        let a = Sale::new("veh-1", "Fiat", "Toro", Decimal::ONE).unwrap();
        let b = Sale::new("veh-1", "Fiat", "Toro", Decimal::ONE).unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn validates_in_fixed_order() {
        use ValidationError as E;

        let negative = Decimal::from(-1);
        for (vehicle_id, brand, model, price, expected) in [
            ("", "", "", Decimal::ZERO, E::EmptyVehicleId),
            ("", "Fiat", "Toro", Decimal::ONE, E::EmptyVehicleId),
            ("", "", "Toro", negative, E::EmptyVehicleId),
            ("veh-1", "", "", Decimal::ZERO, E::NonPositivePrice),
            ("veh-1", "Fiat", "Toro", negative, E::NonPositivePrice),
            ("veh-1", "Fiat", "Toro", Decimal::ZERO, E::NonPositivePrice),
            ("veh-1", "", "Toro", Decimal::ONE, E::EmptyBrandOrModel),
            ("veh-1", "Fiat", "", Decimal::ONE, E::EmptyBrandOrModel),
        ] {
            assert_eq!(
                Sale::new(vehicle_id, brand, model, price).unwrap_err(),
                expected,
                "vehicle_id: `{vehicle_id}`, brand: `{brand}`, \
                 model: `{model}`, price: {price}",
            );
        }
    }

    #[test]
    fn accepts_fractional_price() {
        let price = Decimal::new(1, 2);

        assert_eq!(Price::new(price).map(Price::amount), Some(price));
        assert!(Sale::new("veh-1", "Fiat", "Uno", price).is_ok());
    }

    #[test]
    fn purchase_moves_to_pending_payment() {
        let mut sale =
            Sale::new("veh-1", "Fiat", "Toro", Decimal::from(150_000)).unwrap();

        let payment_id = sale.purchase(cpf()).unwrap();

        assert_eq!(sale.status, Status::PendingPayment);
        assert_eq!(sale.payment_id(), Some(payment_id));
        let purchase = sale.purchase.as_ref().unwrap();
        assert_eq!(purchase.buyer_cpf, cpf());
        assert!(sale.updated_at.coerce::<()>() >= sale.created_at.coerce());
    }

    #[test]
    fn purchase_rejects_non_available_sale() {
        let mut sale =
            Sale::new("veh-1", "Fiat", "Toro", Decimal::from(150_000)).unwrap();
        let payment_id = sale.purchase(cpf()).unwrap();
        let snapshot = sale.clone();

        assert_eq!(sale.purchase(cpf()), Err(Status::PendingPayment));
        assert_eq!(sale, snapshot);
        assert_eq!(sale.payment_id(), Some(payment_id));
    }

    #[test]
    fn settle_resolves_pending_payment_once() {
        let mut sale =
            Sale::new("veh-1", "Fiat", "Toro", Decimal::from(150_000)).unwrap();
        _ = sale.purchase(cpf()).unwrap();

        sale.settle(payment::Outcome::Approved).unwrap();
        assert_eq!(sale.status, Status::Sold);
        assert!(sale.status.is_terminal());

        let snapshot = sale.clone();
        assert_eq!(
            sale.settle(payment::Outcome::Canceled),
            Err(Status::Sold),
        );
        assert_eq!(sale, snapshot);
    }

    #[test]
    fn settle_rejects_available_sale() {
        let mut sale =
            Sale::new("veh-1", "Fiat", "Toro", Decimal::from(150_000)).unwrap();

        assert_eq!(
            sale.settle(payment::Outcome::Approved),
            Err(Status::Available),
        );
        assert_eq!(sale.status, Status::Available);
    }

    #[test]
    fn relist_overwrites_descriptive_fields() {
        let mut sale =
            Sale::new("veh-1", "Fiat", "Toro", Decimal::from(150_000)).unwrap();
        let listing =
            Listing::new("Fiat", "Toro Ultra", Decimal::from(170_000)).unwrap();

        sale.relist(listing);

        assert_eq!(sale.model.as_ref(), "Toro Ultra");
        assert_eq!(sale.price.amount(), Decimal::from(170_000));
        assert_eq!(sale.vehicle_id.as_ref(), "veh-1");
        assert_eq!(sale.status, Status::Available);
    }

    #[test]
    fn listing_validates_price_before_names() {
        assert_eq!(
            Listing::new("", "", Decimal::ZERO).unwrap_err(),
            ValidationError::NonPositivePrice,
        );
        assert_eq!(
            Listing::new("Fiat", "", Decimal::TEN).unwrap_err(),
            ValidationError::EmptyBrandOrModel,
        );
    }

    #[test]
    fn buyer_cpf_cannot_be_blank() {
        assert!(BuyerCpf::new("").is_none());
        assert!(BuyerCpf::new("   ").is_none());
        assert!(BuyerCpf::new("12345678900").is_some());
    }
}
