//! Trade booking, fed by the trades feed and by executions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fabric::{Listener, ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;
use crate::service::execution::ExecutionOrder;
use crate::service::marketdata::PricingSide;

/// Direction of a booked trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl From<PricingSide> for Side {
    fn from(side: PricingSide) -> Self {
        match side {
            PricingSide::Bid => Side::Buy,
            PricingSide::Offer => Side::Sell,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unrecognized trade side {0:?}")]
pub struct ParseSideError(pub String);

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ParseSideError(other.to_string())),
        }
    }
}

/// Trading book a position accrues in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Book {
    Trsy1,
    Trsy2,
    Trsy3,
}

impl Book {
    /// Book for the k-th execution-sourced trade: TRSY2, TRSY3, TRSY1, TRSY2, ...
    pub fn cycle(k: u64) -> Book {
        match 1 + k % 3 {
            1 => Book::Trsy1,
            2 => Book::Trsy2,
            _ => Book::Trsy3,
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Book::Trsy1 => write!(f, "TRSY1"),
            Book::Trsy2 => write!(f, "TRSY2"),
            Book::Trsy3 => write!(f, "TRSY3"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unrecognized book {0:?}")]
pub struct ParseBookError(pub String);

impl FromStr for Book {
    type Err = ParseBookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRSY1" => Ok(Book::Trsy1),
            "TRSY2" => Ok(Book::Trsy2),
            "TRSY3" => Ok(Book::Trsy3),
            other => Err(ParseBookError(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trade<T> {
    pub product: T,
    pub trade_id: String,
    pub price: f64,
    pub book: Book,
    pub quantity: i64,
    pub side: Side,
}

/// Caches the latest trade per trade id and fans it out to the position path.
pub struct TradeBookingService<T> {
    trades: HashMap<String, Trade<T>>,
    listeners: ListenerSet<Trade<T>>,
}

impl<T: Product + Clone> TradeBookingService<T> {
    pub fn new() -> Self {
        Self {
            trades: HashMap::new(),
            listeners: ListenerSet::new(),
        }
    }

    /// Books a trade synthesized inside the process rather than read off the feed.
    pub fn book_trade(&mut self, trade: Trade<T>) {
        self.on_message(trade);
    }
}

impl<T: Product + Clone> Default for TradeBookingService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, Trade<T>> for TradeBookingService<T> {
    fn on_message(&mut self, trade: Trade<T>) {
        debug!(
            "BOOKING: trade {} {} {} x {} into {}",
            trade.trade_id,
            trade.side,
            trade.product.id(),
            trade.quantity,
            trade.book
        );
        self.trades.insert(trade.trade_id.clone(), trade.clone());
        self.listeners.notify(&trade);
    }

    fn add_listener(&mut self, listener: ListenerRef<Trade<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&Trade<T>, ServiceError> {
        self.trades
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}

/// Books every execution as a trade.
///
/// The trade reuses the execution's order id, which the feed's own trade ids never
/// collide with, and cycles the target book across TRSY2, TRSY3, TRSY1.
pub struct ExecutionBookingListener<T> {
    service: Rc<RefCell<TradeBookingService<T>>>,
    count: u64,
}

impl<T: Product + Clone + 'static> ExecutionBookingListener<T> {
    pub fn new(service: Rc<RefCell<TradeBookingService<T>>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            service,
            count: 0,
        }))
    }
}

impl<T: Product + Clone> Listener<ExecutionOrder<T>> for ExecutionBookingListener<T> {
    fn on_add(&mut self, order: &ExecutionOrder<T>) {
        self.count += 1;
        let trade = Trade {
            product: order.product.clone(),
            trade_id: order.order_id.clone(),
            price: order.price,
            book: Book::cycle(self.count),
            quantity: order.visible_quantity,
            side: order.side.into(),
        };
        self.service.borrow_mut().book_trade(trade);
    }
}
