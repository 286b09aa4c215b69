//! Entity structures for DonorDB.
//!
//! Donators and provinces are the two entity types of the domain.
//! The relationship is a single logical edge stored on the donator side
//! (`Donator::province_id`); the province's donator collection is always
//! derived from it, never stored separately.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DonatorId, ProvinceId};

/// A donator record.
///
/// `id` is `None` while the entity is detached or staged for insertion;
/// the store assigns it at commit. `amount` non-negativity is a domain
/// convention and is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donator {
    /// Store-assigned identity, immutable once set.
    pub id: Option<DonatorId>,
    /// Display name, not required to be unique.
    pub name: String,
    /// Donated amount as a fixed-point decimal.
    pub amount: Decimal,
    /// Calendar date of the donation.
    pub donate_date: NaiveDate,
    /// Reference to the owning province, if assigned.
    pub province_id: Option<ProvinceId>,
}

impl Donator {
    /// Create a detached donator with no identity and no province.
    pub fn new(name: impl Into<String>, amount: Decimal, donate_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            amount,
            donate_date,
            province_id: None,
        }
    }

    /// Create a detached donator already referencing a province.
    pub fn with_province(
        name: impl Into<String>,
        amount: Decimal,
        donate_date: NaiveDate,
        province_id: ProvinceId,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            amount,
            donate_date,
            province_id: Some(province_id),
        }
    }
}

/// A province record.
///
/// `name` is intended to be unique within a dataset but uniqueness is
/// not mechanically enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    /// Store-assigned identity, immutable once set.
    pub id: Option<ProvinceId>,
    /// Province name.
    pub name: String,
}

impl Province {
    /// Create a detached province with no identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}
