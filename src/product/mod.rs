//! Bond static data.
//!
//! The catalog is loaded once at startup and passed around as an immutable handle.
//! Coupons and maturities are the on-the-run US Treasury issues the desk trades; PV01 is
//! approximated as tenor/100 per unit of quantity because no yield curve is wired in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::date;
use time::Date;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown product {0:?}")]
    UnknownProduct(String),
}

/// Anything the services can be instantiated over. The shipped pipeline only ever uses
/// [Bond], but the services stay parametric over the product type.
pub trait Product {
    fn id(&self) -> &str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    Cusip,
    Isin,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub cusip: String,
    pub identifier_kind: IdentifierKind,
    pub ticker: String,
    /// Annual coupon rate as a fraction, e.g. 0.00125 for 1/8%.
    pub coupon: f64,
    pub maturity: Date,
}

impl Bond {
    pub fn new(
        cusip: impl Into<String>,
        ticker: impl Into<String>,
        coupon: f64,
        maturity: Date,
    ) -> Self {
        Self {
            cusip: cusip.into(),
            identifier_kind: IdentifierKind::Cusip,
            ticker: ticker.into(),
            coupon,
            maturity,
        }
    }
}

impl Product for Bond {
    fn id(&self) -> &str {
        &self.cusip
    }
}

struct CatalogEntry {
    bond: Bond,
    pv01: f64,
}

/// CUSIP -> coupon, maturity, PV01. Immutable after construction.
pub struct BondCatalog {
    entries: HashMap<String, CatalogEntry>,
    // CUSIPs in tenor order, shortest first
    order: Vec<String>,
}

impl BondCatalog {
    /// The seven on-the-run Treasury issues, 2Y out to 30Y.
    pub fn treasuries() -> Self {
        let issues = [
            ("91282CAX9", 0.00125, date!(2022 - 11 - 30), 0.02),
            ("91282CBA80", 0.00125, date!(2023 - 12 - 15), 0.03),
            ("91282CAZ4", 0.00375, date!(2025 - 11 - 30), 0.05),
            ("91282CAY7", 0.00625, date!(2027 - 11 - 30), 0.07),
            ("91282CAV3", 0.00875, date!(2030 - 11 - 15), 0.10),
            ("912810ST6", 0.01375, date!(2040 - 11 - 15), 0.20),
            ("912810SS8", 0.01625, date!(2050 - 11 - 15), 0.30),
        ];

        let mut entries = HashMap::new();
        let mut order = Vec::new();
        for (cusip, coupon, maturity, pv01) in issues {
            order.push(cusip.to_string());
            entries.insert(
                cusip.to_string(),
                CatalogEntry {
                    bond: Bond::new(cusip, "T", coupon, maturity),
                    pv01,
                },
            );
        }

        Self {
            entries,
            order,
        }
    }

    pub fn bond(&self, cusip: &str) -> Result<&Bond, CatalogError> {
        self.entries
            .get(cusip)
            .map(|entry| &entry.bond)
            .ok_or_else(|| CatalogError::UnknownProduct(cusip.to_string()))
    }

    /// Per-unit PV01 for the bond.
    pub fn pv01(&self, cusip: &str) -> Result<f64, CatalogError> {
        self.entries
            .get(cusip)
            .map(|entry| entry.pv01)
            .ok_or_else(|| CatalogError::UnknownProduct(cusip.to_string()))
    }

    /// CUSIPs in tenor order, shortest first.
    pub fn cusips(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn bonds(&self) -> impl Iterator<Item = &Bond> {
        self.order.iter().filter_map(|cusip| {
            self.entries.get(cusip).map(|entry| &entry.bond)
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
