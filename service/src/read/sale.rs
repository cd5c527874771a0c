//! [`Sale`]-related read definitions.

use crate::domain::sale;
#[cfg(doc)]
use crate::domain::Sale;

/// Summary of a [`Sale`] in a listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListItem {
    /// ID of the [`Sale`].
    pub id: sale::Id,

    /// ID of the listed vehicle.
    pub vehicle_id: sale::VehicleId,

    /// [`sale::Brand`] of the listed vehicle.
    pub brand: sale::Brand,

    /// [`sale::Model`] of the listed vehicle.
    pub model: sale::Model,

    /// [`sale::Price`] the vehicle is listed for.
    pub price: sale::Price,
}
