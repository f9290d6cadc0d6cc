//! Customer inquiry lifecycle.
//!
//! Inquiries arrive RECEIVED, get quoted at par through a loopback quote connector and
//! come back QUOTED, then complete as DONE. Anything in an unexpected state is marked
//! REJECTED. Every inquiry that reaches DONE or REJECTED is notified downstream exactly
//! once, by the service itself.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::fabric::{ListenerRef, ListenerSet, Service, ServiceError};
use crate::product::Product;
use crate::service::booking::Side;

/// Par price quoted back on every inquiry.
pub const PAR: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryState {
    Received,
    Quoted,
    Done,
    Rejected,
    CustomerRejected,
}

impl fmt::Display for InquiryState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InquiryState::Received => write!(f, "RECEIVED"),
            InquiryState::Quoted => write!(f, "QUOTED"),
            InquiryState::Done => write!(f, "DONE"),
            InquiryState::Rejected => write!(f, "REJECTED"),
            InquiryState::CustomerRejected => write!(f, "CUSTOMER_REJECTED"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Inquiry<T> {
    pub inquiry_id: String,
    pub product: T,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    pub state: InquiryState,
}

/// Loopback leg of the quote round-trip.
///
/// Stands in for the client acknowledging our quote: a RECEIVED inquiry flips to QUOTED,
/// a DONE update is dropped. This is the one connector that mutates what it is given
/// instead of pushing it onto a wire.
#[derive(Debug, Default)]
pub struct QuoteConnector;

impl QuoteConnector {
    pub fn publish<T>(&mut self, inquiry: &mut Inquiry<T>) {
        if inquiry.state == InquiryState::Received {
            inquiry.state = InquiryState::Quoted;
        }
    }
}

/// Drives inquiries through their state machine, keyed on inquiry id.
pub struct InquiryService<T> {
    inquiries: HashMap<String, Inquiry<T>>,
    listeners: ListenerSet<Inquiry<T>>,
    quote: QuoteConnector,
}

impl<T: Product + Clone> InquiryService<T> {
    pub fn new() -> Self {
        Self {
            inquiries: HashMap::new(),
            listeners: ListenerSet::new(),
            quote: QuoteConnector,
        }
    }

    /// Quotes the inquiry through the loopback connector; if the client comes back
    /// QUOTED the inquiry re-enters `on_message` for its next transition.
    fn send_quote(&mut self, mut inquiry: Inquiry<T>) {
        self.quote.publish(&mut inquiry);
        if inquiry.state == InquiryState::Quoted {
            self.on_message(inquiry);
        }
    }

    fn reject(&mut self, _inquiry: &Inquiry<T>) {
        // nothing goes back to the client; the rejection only lives in our records
    }

    fn cache_and_notify(&mut self, inquiry: Inquiry<T>) {
        self.inquiries
            .insert(inquiry.inquiry_id.clone(), inquiry.clone());
        self.listeners.notify(&inquiry);
    }
}

impl<T: Product + Clone> Default for InquiryService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Product + Clone> Service<str, Inquiry<T>> for InquiryService<T> {
    fn on_message(&mut self, mut inquiry: Inquiry<T>) {
        match inquiry.state {
            InquiryState::Received => {
                inquiry.price = PAR;
                debug!(
                    "INQUIRY: {} quoting {} at par",
                    inquiry.inquiry_id,
                    inquiry.product.id()
                );
                self.send_quote(inquiry);
            }
            InquiryState::Quoted => {
                inquiry.state = InquiryState::Done;
                // the update to the client is a no-op on DONE; we notify ourselves
                self.quote.publish(&mut inquiry);
                self.cache_and_notify(inquiry);
            }
            InquiryState::Done => {
                self.cache_and_notify(inquiry);
            }
            _ => {
                warn!(
                    "INQUIRY: {} in unexpected state {}, rejecting",
                    inquiry.inquiry_id, inquiry.state
                );
                inquiry.state = InquiryState::Rejected;
                self.reject(&inquiry);
                self.cache_and_notify(inquiry);
            }
        }
    }

    fn add_listener(&mut self, listener: ListenerRef<Inquiry<T>>) {
        self.listeners.attach(listener);
    }

    fn get_data(&self, key: &str) -> Result<&Inquiry<T>, ServiceError> {
        self.inquiries
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }
}
