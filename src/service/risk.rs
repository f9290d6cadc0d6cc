//! PV01 risk per product and across bucketed sectors.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::{Bond, BondCatalog, CatalogError, Product};
use crate::service::position::Position;

/// Per-unit PV01 together with the quantity it applies to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pv01<T> {
    pub product: T,
    pub pv01: f64,
    pub quantity: i64,
}

impl<T> Pv01<T> {
    pub fn new(product: T, pv01: f64, quantity: i64) -> Self {
        Self {
            product,
            pv01,
            quantity,
        }
    }

    /// PV01 of the whole holding.
    pub fn total(&self) -> f64 {
        self.pv01 * self.quantity as f64
    }
}

/// Named group of products whose risk aggregates together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BucketedSector<T> {
    pub products: Vec<T>,
    pub name: String,
}

impl<T> BucketedSector<T> {
    pub fn new(products: Vec<T>, name: impl Into<String>) -> Self {
        Self {
            products,
            name: name.into(),
        }
    }
}

impl BucketedSector<Bond> {
    /// 2Y and 3Y issues.
    pub fn front_end(catalog: &BondCatalog) -> Result<Self, CatalogError> {
        Self::from_cusips(catalog, &["91282CAX9", "91282CBA80"], "FrontEnd")
    }

    /// 5Y, 7Y and 10Y issues.
    pub fn belly(catalog: &BondCatalog) -> Result<Self, CatalogError> {
        Self::from_cusips(catalog, &["91282CAZ4", "91282CAY7", "91282CAV3"], "Belly")
    }

    /// 20Y and 30Y issues.
    pub fn long_end(catalog: &BondCatalog) -> Result<Self, CatalogError> {
        Self::from_cusips(catalog, &["912810ST6", "912810SS8"], "LongEnd")
    }

    fn from_cusips(
        catalog: &BondCatalog,
        cusips: &[&str],
        name: &str,
    ) -> Result<Self, CatalogError> {
        let mut products = Vec::with_capacity(cusips.len());
        for cusip in cusips {
            products.push(catalog.bond(cusip)?.clone());
        }
        Ok(Self::new(products, name))
    }
}

/// Source of per-unit PV01 values for a product type.
pub trait Pv01Source<T> {
    fn pv01(&self, product: &T) -> Result<f64, CatalogError>;
}

impl Pv01Source<Bond> for BondCatalog {
    fn pv01(&self, product: &Bond) -> Result<f64, CatalogError> {
        self.pv01(product.id())
    }
}

/// Revalues risk on every position update.
pub struct RiskService<T> {
    risks: HashMap<String, Pv01<T>>,
    listeners: ListenerSet<Pv01<T>>,
    source: Rc<dyn Pv01Source<T>>,
}

impl<T: Product + Clone> RiskService<T> {
    pub fn new(source: Rc<dyn Pv01Source<T>>) -> Self {
        Self {
            risks: HashMap::new(),
            listeners: ListenerSet::new(),
            source,
        }
    }

    /// Entry point bridged off the position service.
    ///
    /// The product is already catalog-resolved by the time a position exists for it, so
    /// a missing PV01 here is a programming error.
    pub fn add_position(&mut self, position: &Position<T>) {
        let pv01 = self
            .source
            .pv01(&position.product)
            .unwrap_or_else(|err| panic!("{err}"));
        let quantity = position.aggregate();
        debug!(
            "RISK: {} pv01 {:.2} over {}",
            position.product.id(),
            pv01 * quantity as f64,
            quantity
        );
        self.on_message(Pv01::new(position.product.clone(), pv01, quantity));
    }

    /// Quantity-weighted mean PV01 across the sector, by value.
    ///
    /// Products with no cached risk contribute zero quantity; a sector with zero total
    /// quantity reports zero PV01 rather than dividing by it.
    pub fn bucketed_risk(&self, sector: &BucketedSector<T>) -> Pv01<BucketedSector<T>> {
        let mut total_quantity = 0i64;
        let mut weighted = 0.0;
        for product in &sector.products {
            if let Some(risk) = self.risks.get(product.id()) {
                total_quantity += risk.quantity;
                weighted += risk.quantity as f64 * risk.pv01;
            }
        }
        let pv01 = if total_quantity == 0 {
            0.0
        } else {
            weighted / total_quantity as f64
        };
        Pv01::new(sector.clone(), pv01, total_quantity)
    }
}

impl<T: Product + Clone> Service<str, Pv01<T>> for RiskService<T> {
    fn on_message(&mut self, risk: Pv01<T>) {
        self.risks
            .insert(risk.product.id().to_string(), risk.clone());
        self.listeners.notify(&risk);
    }

    fn add_listener(&mut self, listener: ListenerRef<Pv01<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&Pv01<T>, ServiceError> {
        self.risks
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}
