//! Internal mid/spread prices.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;

/// Mid price with the bid/offer spread around it, both in absolute price units.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Price<T> {
    pub product: T,
    pub mid: f64,
    pub bid_offer_spread: f64,
}

impl<T> Price<T> {
    pub fn new(product: T, mid: f64, bid_offer_spread: f64) -> Self {
        Self {
            product,
            mid,
            bid_offer_spread,
        }
    }
}

/// Caches the latest price per product and fans it out.
pub struct PricingService<T> {
    prices: HashMap<String, Price<T>>,
    listeners: ListenerSet<Price<T>>,
}

impl<T: Product + Clone> PricingService<T> {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            listeners: ListenerSet::new(),
        }
    }
}

impl<T: Product + Clone> Default for PricingService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, Price<T>> for PricingService<T> {
    fn on_message(&mut self, price: Price<T>) {
        // the feed cannot produce a negative spread, so one here is a programming error
        assert!(
            price.bid_offer_spread >= 0.0,
            "negative bid/offer spread for {}",
            price.product.id()
        );
        debug!(
            "PRICING: {} mid {:.6} spread {:.6}",
            price.product.id(),
            price.mid,
            price.bid_offer_spread
        );
        self.prices
            .insert(price.product.id().to_string(), price.clone());
        self.listeners.notify(&price);
    }

    fn add_listener(&mut self, listener: ListenerRef<Price<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&Price<T>, ServiceError> {
        self.prices
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}
