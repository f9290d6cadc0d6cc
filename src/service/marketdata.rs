//! Order-book market data.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;

/// Side of a quoted market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingSide {
    Bid,
    Offer,
}

impl fmt::Display for PricingSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PricingSide::Bid => write!(f, "BID"),
            PricingSide::Offer => write!(f, "OFFER"),
        }
    }
}

/// A resting order at one price level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub price: f64,
    pub quantity: i64,
    pub side: PricingSide,
}

impl Order {
    pub fn new(price: f64, quantity: i64, side: PricingSide) -> Self {
        Self {
            price,
            quantity,
            side,
        }
    }
}

/// Best bid and best offer, returned by value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidOffer {
    pub bid: Order,
    pub offer: Order,
}

/// Top-of-book snapshot with bid and offer stacks, best level at index 0.
///
/// The stacks are never crossed: the best offer price is at or above the best bid price.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderBook<T> {
    pub product: T,
    pub bid_stack: Vec<Order>,
    pub offer_stack: Vec<Order>,
}

impl<T> OrderBook<T> {
    pub fn new(product: T, bid_stack: Vec<Order>, offer_stack: Vec<Order>) -> Self {
        Self {
            product,
            bid_stack,
            offer_stack,
        }
    }

    pub fn best_bid(&self) -> &Order {
        &self.bid_stack[0]
    }

    pub fn best_offer(&self) -> &Order {
        &self.offer_stack[0]
    }

    pub fn spread(&self) -> f64 {
        self.best_offer().price - self.best_bid().price
    }
}

/// Caches the latest order book per product and fans it out.
pub struct MarketDataService<T> {
    books: HashMap<String, OrderBook<T>>,
    listeners: ListenerSet<OrderBook<T>>,
}

impl<T: Product + Clone> MarketDataService<T> {
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
            listeners: ListenerSet::new(),
        }
    }

    pub fn best_bid_offer(&self, product_id: &str) -> Result<BidOffer, ServiceError> {
        let book = self
            .books
            .get(product_id)
            .ok_or_else(|| ServiceError::NotFound(product_id.to_string()))?;
        Ok(BidOffer {
            bid: book.best_bid().clone(),
            offer: book.best_offer().clone(),
        })
    }
}

impl<T: Product + Clone> Default for MarketDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, OrderBook<T>> for MarketDataService<T> {
    fn on_message(&mut self, book: OrderBook<T>) {
        debug!(
            "MARKETDATA: book for {} spread {:.6}",
            book.product.id(),
            book.spread()
        );
        self.books
            .insert(book.product.id().to_string(), book.clone());
        self.listeners.notify(&book);
    }

    fn add_listener(&mut self, listener: ListenerRef<OrderBook<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&OrderBook<T>, ServiceError> {
        self.books
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{MarketDataService, Order, OrderBook, PricingSide};
    use crate::fabric::Service;
    use crate::product::BondCatalog;
    use crate::testutil::CaptureListener;

    fn tight_book() -> OrderBook<crate::product::Bond> {
        let catalog = BondCatalog::treasuries();
        let bond = catalog.bond("91282CAX9").unwrap().clone();
        let bids = vec![
            Order::new(99.96875, 1_000_000, PricingSide::Bid),
            Order::new(99.9609375, 2_000_000, PricingSide::Bid),
        ];
        let offers = vec![
            Order::new(99.9765625, 1_000_000, PricingSide::Offer),
            Order::new(99.984375, 2_000_000, PricingSide::Offer),
        ];
        OrderBook::new(bond, bids, offers)
    }

    #[test]
    fn test_that_best_bid_offer_is_level_zero() {
        let mut service = MarketDataService::new();
        service.on_message(tight_book());

        let top = service.best_bid_offer("91282CAX9").unwrap();
        assert_eq!(top.bid.price, 99.96875);
        assert_eq!(top.offer.price, 99.9765625);
        assert_eq!(top.bid.quantity, 1_000_000);
    }

    #[test]
    fn test_that_on_message_overwrites_and_notifies() {
        let mut service = MarketDataService::new();
        let (listener, seen) = CaptureListener::new();
        service.add_listener(listener);

        service.on_message(tight_book());
        service.on_message(tight_book());

        assert_eq!(seen.borrow().len(), 2);
        assert!(service.get_data("91282CAX9").is_ok());
        assert!(service.get_data("912810SS8").is_err());
    }

    #[test]
    fn test_that_spread_is_offer_minus_bid() {
        let book = tight_book();
        assert_eq!(book.spread(), 1.0 / 128.0);
    }
}
