//! Per-book and aggregate position tracking.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;
use crate::service::booking::{Book, Side, Trade};

/// Signed quantity held per book. Books with no activity read as zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position<T> {
    pub product: T,
    quantities: HashMap<Book, i64>,
}

impl<T> Position<T> {
    pub fn new(product: T) -> Self {
        Self {
            product,
            quantities: HashMap::new(),
        }
    }

    pub fn quantity(&self, book: Book) -> i64 {
        self.quantities.get(&book).copied().unwrap_or(0)
    }

    pub fn aggregate(&self) -> i64 {
        self.quantities.values().sum()
    }

    /// Applies the trade's signed delta: +quantity for a buy, -quantity for a sell.
    pub fn add(&mut self, book: Book, quantity: i64, side: Side) {
        let delta = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };
        *self.quantities.entry(book).or_insert(0) += delta;
    }
}

/// Tracks a position per product, seeded with an empty position for every product the
/// catalog knows about.
pub struct PositionService<T> {
    positions: HashMap<String, Position<T>>,
    listeners: ListenerSet<Position<T>>,
}

impl<T: Product + Clone> PositionService<T> {
    pub fn with_products(products: impl IntoIterator<Item = T>) -> Self {
        let positions = products
            .into_iter()
            .map(|product| (product.id().to_string(), Position::new(product)))
            .collect();
        Self {
            positions,
            listeners: ListenerSet::new(),
        }
    }

    /// Entry point bridged off the trade booking service.
    ///
    /// A trade for a product without a seeded position is a programming error, not bad
    /// input: the feed layer has already resolved the product against the catalog.
    pub fn add_trade(&mut self, trade: &Trade<T>) {
        let position = self
            .positions
            .get_mut(trade.product.id())
            .unwrap_or_else(|| panic!("no position seeded for {}", trade.product.id()));
        position.add(trade.book, trade.quantity, trade.side);
        debug!(
            "POSITION: {} aggregate now {}",
            trade.product.id(),
            position.aggregate()
        );
        self.listeners.notify(position);
    }

    pub fn aggregate_position(&self, product_id: &str) -> Result<i64, ServiceError> {
        self.positions
            .get(product_id)
            .map(Position::aggregate)
            .ok_or_else(|| ServiceError::NotFound(product_id.to_string()))
    }
}

impl<T: Product + Clone> Service<str, Position<T>> for PositionService<T> {
    fn on_message(&mut self, position: Position<T>) {
        self.positions
            .insert(position.product.id().to_string(), position.clone());
        self.listeners.notify(&position);
    }

    fn add_listener(&mut self, listener: ListenerRef<Position<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&Position<T>, ServiceError> {
        self.positions
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}
