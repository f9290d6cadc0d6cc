//! Terminal persistence fan-out.

use log::debug;

use crate::fabric::Connector;

/// Pushes every received entity to an outbound connector under a fresh persistence key.
///
/// Keys are the decimal renderings of a counter that starts at zero and never resets,
/// so they are unique for the life of the process.
pub struct HistoricalDataService<T> {
    connector: Box<dyn Connector<T>>,
    label: &'static str,
    next_key: u64,
}

impl<T> HistoricalDataService<T> {
    pub fn new(connector: Box<dyn Connector<T>>, label: &'static str) -> Self {
        Self {
            connector,
            label,
            next_key: 0,
        }
    }

    /// Entry point bridged off a terminal service.
    pub fn persist(&mut self, data: &T) {
        let key = self.next_key.to_string();
        self.next_key += 1;
        debug!("HISTORICAL: persisting {} record {}", self.label, key);
        if let Err(err) = self.connector.publish(data) {
            // losing a persistence sink is a transport failure, which ends the run
            panic!("HISTORICAL: {} sink failed at key {key}: {err:#}", self.label);
        }
    }

    pub fn records_persisted(&self) -> u64 {
        self.next_key
    }
}
