//! Rate-limited price sampling for the GUI feed.

use std::rc::Rc;

use log::debug;

use crate::clock::WallClock;
use crate::fabric::Connector;
use crate::product::Product;
use crate::service::pricing::Price;

pub const DEFAULT_THROTTLE_MS: u64 = 300;
pub const DEFAULT_MAX_SAMPLES: u32 = 100;

/// Samples the price feed into the GUI sink: at most one tick per throttle window, and
/// at most `max_samples` ticks per run. Everything else is dropped without retry.
///
/// The last-emit timestamp starts at zero, so the first tick always goes through.
pub struct GuiService<T> {
    connector: Box<dyn Connector<Price<T>>>,
    clock: Rc<dyn WallClock>,
    throttle_ms: u64,
    max_samples: u32,
    last_emit: u64,
    emitted: u32,
}

impl<T: Product> GuiService<T> {
    pub fn new(
        connector: Box<dyn Connector<Price<T>>>,
        clock: Rc<dyn WallClock>,
        throttle_ms: u64,
        max_samples: u32,
    ) -> Self {
        Self {
            connector,
            clock,
            throttle_ms,
            max_samples,
            last_emit: 0,
            emitted: 0,
        }
    }

    /// Entry point bridged off the pricing service.
    pub fn on_tick(&mut self, price: &Price<T>) {
        let now = self.clock.now_millis();
        if now.saturating_sub(self.last_emit) < self.throttle_ms
            || self.emitted >= self.max_samples
        {
            debug!("GUI: dropping tick for {}", price.product.id());
            return;
        }
        if let Err(err) = self.connector.publish(price) {
            // losing the GUI sink is a transport failure, which ends the run
            panic!("GUI: sink failed: {err:#}");
        }
        self.last_emit = now;
        self.emitted += 1;
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}
