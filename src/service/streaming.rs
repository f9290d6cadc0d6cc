//! Two-way price streams generated off the internal price feed.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;
use crate::service::marketdata::PricingSide;
use crate::service::pricing::Price;

/// One side of a streamed two-way market. Hidden size is twice the visible size.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceStreamOrder {
    pub price: f64,
    pub visible_quantity: i64,
    pub hidden_quantity: i64,
    pub side: PricingSide,
}

impl PriceStreamOrder {
    pub fn new(price: f64, visible_quantity: i64, hidden_quantity: i64, side: PricingSide) -> Self {
        Self {
            price,
            visible_quantity,
            hidden_quantity,
            side,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceStream<T> {
    pub product: T,
    pub bid: PriceStreamOrder,
    pub offer: PriceStreamOrder,
}

/// Turns each price tick into a two-way stream around the mid.
///
/// Visible size alternates 2,000,000 / 1,000,000 on subsequent ticks so the downstream
/// path sees both states of the stream; hidden size is always twice visible.
pub struct AlgoStreamingService<T> {
    streams: HashMap<String, PriceStream<T>>,
    listeners: ListenerSet<PriceStream<T>>,
    half_size: bool,
}

const FULL_VISIBLE: i64 = 2_000_000;
const HALF_VISIBLE: i64 = 1_000_000;

impl<T: Product + Clone> AlgoStreamingService<T> {
    pub fn new() -> Self {
        Self {
            streams: HashMap::new(),
            listeners: ListenerSet::new(),
            half_size: false,
        }
    }

    /// Entry point bridged off the pricing service.
    pub fn publish_price(&mut self, price: &Price<T>) {
        let half_spread = price.bid_offer_spread / 2.0;
        let visible = if self.half_size {
            HALF_VISIBLE
        } else {
            FULL_VISIBLE
        };
        self.half_size = !self.half_size;
        let hidden = 2 * visible;

        let stream = PriceStream {
            product: price.product.clone(),
            bid: PriceStreamOrder::new(
                price.mid - half_spread,
                visible,
                hidden,
                PricingSide::Bid,
            ),
            offer: PriceStreamOrder::new(
                price.mid + half_spread,
                visible,
                hidden,
                PricingSide::Offer,
            ),
        };
        self.on_message(stream);
    }
}

impl<T: Product + Clone> Default for AlgoStreamingService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, PriceStream<T>> for AlgoStreamingService<T> {
    fn on_message(&mut self, stream: PriceStream<T>) {
        self.streams
            .insert(stream.product.id().to_string(), stream.clone());
        self.listeners.notify(&stream);
    }

    fn add_listener(&mut self, listener: ListenerRef<PriceStream<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&PriceStream<T>, ServiceError> {
        self.streams
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}

/// Pure fan-out node between algo stream generation and the downstream consumers.
pub struct StreamingService<T> {
    streams: HashMap<String, PriceStream<T>>,
    listeners: ListenerSet<PriceStream<T>>,
}

impl<T: Product + Clone> StreamingService<T> {
    pub fn new() -> Self {
        Self {
            streams: HashMap::new(),
            listeners: ListenerSet::new(),
        }
    }

    pub fn publish_price(&mut self, stream: &PriceStream<T>) {
        debug!(
            "STREAMING: {} bid {:.6} offer {:.6}",
            stream.product.id(),
            stream.bid.price,
            stream.offer.price
        );
        self.on_message(stream.clone());
    }
}

impl<T: Product + Clone> Default for StreamingService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, PriceStream<T>> for StreamingService<T> {
    fn on_message(&mut self, stream: PriceStream<T>) {
        self.streams
            .insert(stream.product.id().to_string(), stream.clone());
        self.listeners.notify(&stream);
    }

    fn add_listener(&mut self, listener: ListenerRef<PriceStream<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&PriceStream<T>, ServiceError> {
        self.streams
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}
