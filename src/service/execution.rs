//! Algorithmic execution off the market data feed.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;
use crate::service::marketdata::{OrderBook, PricingSide};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Fok,
    Ioc,
    Market,
    Limit,
    Stop,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderType::Fok => write!(f, "FOK"),
            OrderType::Ioc => write!(f, "IOC"),
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
        }
    }
}

/// Venue an order could be routed to. Carried on the execution entry point for interface
/// completeness; nothing downstream reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    Brokertec,
    Espeed,
    Cme,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionOrder<T> {
    pub product: T,
    pub side: PricingSide,
    pub order_id: String,
    pub order_type: OrderType,
    pub price: f64,
    pub visible_quantity: i64,
    pub hidden_quantity: i64,
    pub parent_order_id: String,
    pub is_child: bool,
}

/// Crosses the spread when it is at the minimum tradable tick.
///
/// The aggressing side alternates bid/offer across incoming books to balance flow, and a
/// book whose spread is wider than 1/128 is dropped without an order.
pub struct AlgoExecutionService<T> {
    orders: HashMap<String, ExecutionOrder<T>>,
    listeners: ListenerSet<ExecutionOrder<T>>,
    count: u64,
}

const MAX_CROSSABLE_SPREAD: f64 = 1.0 / 128.0;

impl<T: Product + Clone> AlgoExecutionService<T> {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            listeners: ListenerSet::new(),
            count: 0,
        }
    }

    /// Entry point bridged off the market data service.
    pub fn execute_from_book(&mut self, book: &OrderBook<T>) {
        self.count += 1;
        let side = if self.count % 2 == 1 {
            PricingSide::Bid
        } else {
            PricingSide::Offer
        };

        if book.spread() > MAX_CROSSABLE_SPREAD {
            debug!(
                "ALGOEXEC: {} spread {:.6} too wide, not aggressing",
                book.product.id(),
                book.spread()
            );
            return;
        }

        // aggress at our side's best price for the far side's best quantity
        let (price, quantity) = match side {
            PricingSide::Bid => (book.best_bid().price, book.best_offer().quantity),
            PricingSide::Offer => (book.best_offer().price, book.best_bid().quantity),
        };

        let order_id = self.count.to_string();
        let order = ExecutionOrder {
            product: book.product.clone(),
            side,
            order_id: order_id.clone(),
            order_type: OrderType::Market,
            price,
            visible_quantity: quantity,
            hidden_quantity: quantity,
            parent_order_id: order_id,
            is_child: false,
        };
        self.orders
            .insert(order.product.id().to_string(), order.clone());
        self.listeners.notify(&order);
    }
}

impl<T: Product + Clone> Default for AlgoExecutionService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, ExecutionOrder<T>> for AlgoExecutionService<T> {
    fn on_message(&mut self, order: ExecutionOrder<T>) {
        self.orders
            .insert(order.product.id().to_string(), order.clone());
        self.listeners.notify(&order);
    }

    fn add_listener(&mut self, listener: ListenerRef<ExecutionOrder<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&ExecutionOrder<T>, ServiceError> {
        self.orders
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}

/// Forwards execution orders to its listeners, keyed on order id.
pub struct ExecutionService<T> {
    orders: HashMap<String, ExecutionOrder<T>>,
    listeners: ListenerSet<ExecutionOrder<T>>,
}

impl<T: Product + Clone> ExecutionService<T> {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            listeners: ListenerSet::new(),
        }
    }

    pub fn execute_order(&mut self, order: &ExecutionOrder<T>, _market: Market) {
        debug!(
            "EXECUTION: order {} {} {} @ {:.6}",
            order.order_id,
            order.side,
            order.product.id(),
            order.price
        );
        self.on_message(order.clone());
    }
}

impl<T: Product + Clone> Default for ExecutionService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, ExecutionOrder<T>> for ExecutionService<T> {
    fn on_message(&mut self, order: ExecutionOrder<T>) {
        self.orders.insert(order.order_id.clone(), order.clone());
        self.listeners.notify(&order);
    }

    fn add_listener(&mut self, listener: ListenerRef<ExecutionOrder<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&ExecutionOrder<T>, ServiceError> {
        self.orders
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{AlgoExecutionService, ExecutionService, Market};
    use crate::fabric::Service;
    use crate::product::{Bond, BondCatalog};
    use crate::service::marketdata::{Order, OrderBook, PricingSide};
    use crate::testutil::CaptureListener;

    fn book(spread_ticks: u32) -> OrderBook<Bond> {
        let catalog = BondCatalog::treasuries();
        let bond = catalog.bond("91282CAX9").unwrap().clone();
        let bid = 99.0 + 31.0 / 32.0 + 1.0 / 256.0;
        let offer = bid + f64::from(spread_ticks) / 256.0;
        OrderBook::new(
            bond,
            vec![Order::new(bid, 1_000_000, PricingSide::Bid)],
            vec![Order::new(offer, 1_000_000, PricingSide::Offer)],
        )
    }

    #[test]
    fn test_that_tight_books_are_aggressed_on_alternating_sides() {
        let mut service = AlgoExecutionService::new();
        let (listener, seen) = CaptureListener::new();
        service.add_listener(listener);

        service.execute_from_book(&book(1));
        service.execute_from_book(&book(1));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);

        assert_eq!(seen[0].side, PricingSide::Bid);
        assert_eq!(seen[0].order_id, "1");
        assert_eq!(seen[0].price, 99.0 + 31.0 / 32.0 + 1.0 / 256.0);
        assert_eq!(seen[0].visible_quantity, 1_000_000);
        assert_eq!(seen[0].hidden_quantity, 1_000_000);
        assert!(!seen[0].is_child);
        assert_eq!(seen[0].parent_order_id, "1");

        assert_eq!(seen[1].side, PricingSide::Offer);
        assert_eq!(seen[1].order_id, "2");
        assert_eq!(seen[1].price, 99.0 + 31.0 / 32.0 + 2.0 / 256.0);
    }

    #[test]
    fn test_that_wide_spreads_are_not_crossed() {
        let mut service = AlgoExecutionService::new();
        let (listener, seen) = CaptureListener::new();
        service.add_listener(listener);

        service.execute_from_book(&book(10));

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_that_spread_exactly_at_the_gate_is_crossed() {
        let mut service = AlgoExecutionService::new();
        let (listener, seen) = CaptureListener::new();
        service.add_listener(listener);

        service.execute_from_book(&book(2));

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_that_execution_service_forwards_and_caches_by_order_id() {
        let mut algo = AlgoExecutionService::new();
        let (bridge, orders) = CaptureListener::new();
        algo.add_listener(bridge);
        algo.execute_from_book(&book(1));

        let mut service = ExecutionService::new();
        let (listener, seen) = CaptureListener::new();
        service.add_listener(listener);

        let order = orders.borrow()[0].clone();
        service.execute_order(&order, Market::Cme);

        assert_eq!(seen.borrow().len(), 1);
        assert!(service.get_data("1").is_ok());
    }
}
