//! Builds the service graph and drives the four inbound feeds.
//!
//! Everything runs on the calling thread: a record read from a feed propagates through
//! the whole downstream graph, out to every sink it touches, before the next record is
//! requested. The feeds run in a fixed order: trades, market data, prices, inquiries.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use log::info;
use serde::Deserialize;

use crate::clock::{SystemClock, WallClock};
use crate::fabric::{Service, ServiceBridge};
use crate::feed::records;
use crate::feed::{FeedSubscription, RecordSink};
use crate::product::{Bond, BondCatalog};
use crate::service::booking::{ExecutionBookingListener, TradeBookingService};
use crate::service::execution::{AlgoExecutionService, ExecutionService, Market};
use crate::service::gui::{GuiService, DEFAULT_MAX_SAMPLES, DEFAULT_THROTTLE_MS};
use crate::service::historical::HistoricalDataService;
use crate::service::inquiry::InquiryService;
use crate::service::marketdata::MarketDataService;
use crate::service::position::PositionService;
use crate::service::pricing::PricingService;
use crate::service::risk::{Pv01Source, RiskService};
use crate::service::streaming::{AlgoStreamingService, StreamingService};

/// Where one feed or sink lives: the peer's port and the file name requested from it.
#[derive(Clone, Debug, Deserialize)]
pub struct Endpoint {
    pub port: u16,
    pub file: String,
}

impl Endpoint {
    fn new(port: u16, file: &str) -> Self {
        Self {
            port,
            file: file.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub host: String,
    pub trades: Endpoint,
    pub marketdata: Endpoint,
    pub prices: Endpoint,
    pub inquiries: Endpoint,
    pub positions: Endpoint,
    pub risk: Endpoint,
    pub executions: Endpoint,
    pub streaming: Endpoint,
    pub gui: Endpoint,
    pub all_inquiries: Endpoint,
    pub gui_throttle_ms: u64,
    pub gui_max_samples: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            prices: Endpoint::new(1234, "data/prices.txt"),
            gui: Endpoint::new(1235, "output/gui.txt"),
            trades: Endpoint::new(1236, "data/trades.txt"),
            marketdata: Endpoint::new(1237, "data/marketdata.txt"),
            executions: Endpoint::new(1238, "output/executions.txt"),
            positions: Endpoint::new(1239, "output/positions.txt"),
            risk: Endpoint::new(1240, "output/risk.txt"),
            streaming: Endpoint::new(1241, "output/streaming.txt"),
            inquiries: Endpoint::new(1242, "data/inquiries.txt"),
            all_inquiries: Endpoint::new(1243, "output/allinquiries.txt"),
            gui_throttle_ms: DEFAULT_THROTTLE_MS,
            gui_max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Records consumed per inbound feed over one run.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineReport {
    pub trades: u64,
    pub order_books: u64,
    pub prices: u64,
    pub inquiries: u64,
}

pub fn run(config: &PipelineConfig) -> anyhow::Result<PipelineReport> {
    run_with_clock(config, Rc::new(SystemClock))
}

/// Same as [run] with an injected clock, for deterministic timestamps under test.
pub fn run_with_clock(
    config: &PipelineConfig,
    clock: Rc<dyn WallClock>,
) -> anyhow::Result<PipelineReport> {
    let catalog = Rc::new(BondCatalog::treasuries());
    let host = config.host.as_str();

    // outbound sinks, one long-lived channel each
    let positions_sink = RecordSink::open(
        host,
        config.positions.port,
        &config.positions.file,
        Rc::clone(&clock),
        records::format_position,
    )?;
    let risk_sink = RecordSink::open(
        host,
        config.risk.port,
        &config.risk.file,
        Rc::clone(&clock),
        records::format_risk,
    )?;
    let executions_sink = RecordSink::open(
        host,
        config.executions.port,
        &config.executions.file,
        Rc::clone(&clock),
        records::format_execution,
    )?;
    let streaming_sink = RecordSink::open(
        host,
        config.streaming.port,
        &config.streaming.file,
        Rc::clone(&clock),
        records::format_stream,
    )?;
    let gui_sink = RecordSink::open(
        host,
        config.gui.port,
        &config.gui.file,
        Rc::clone(&clock),
        records::format_gui,
    )?;
    let inquiries_sink = RecordSink::open(
        host,
        config.all_inquiries.port,
        &config.all_inquiries.file,
        Rc::clone(&clock),
        records::format_inquiry,
    )?;

    // terminal persistence
    let position_history = Rc::new(RefCell::new(HistoricalDataService::new(
        Box::new(positions_sink),
        "position",
    )));
    let risk_history = Rc::new(RefCell::new(HistoricalDataService::new(
        Box::new(risk_sink),
        "risk",
    )));
    let execution_history = Rc::new(RefCell::new(HistoricalDataService::new(
        Box::new(executions_sink),
        "execution",
    )));
    let streaming_history = Rc::new(RefCell::new(HistoricalDataService::new(
        Box::new(streaming_sink),
        "streaming",
    )));
    let inquiry_history = Rc::new(RefCell::new(HistoricalDataService::new(
        Box::new(inquiries_sink),
        "inquiry",
    )));

    // trades -> positions -> risk
    let risk = Rc::new(RefCell::new(RiskService::new(
        Rc::clone(&catalog) as Rc<dyn Pv01Source<Bond>>
    )));
    risk.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&risk_history),
        HistoricalDataService::persist,
    ));

    let positions = Rc::new(RefCell::new(PositionService::with_products(
        catalog.bonds().cloned().collect::<Vec<_>>(),
    )));
    positions
        .borrow_mut()
        .add_listener(ServiceBridge::new(Rc::clone(&risk), RiskService::add_position));
    positions.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&position_history),
        HistoricalDataService::persist,
    ));

    let booking = Rc::new(RefCell::new(TradeBookingService::new()));
    booking.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&positions),
        PositionService::add_trade,
    ));

    // market data -> algo execution -> execution -> (booking, history)
    let execution = Rc::new(RefCell::new(ExecutionService::new()));
    execution
        .borrow_mut()
        .add_listener(ExecutionBookingListener::new(Rc::clone(&booking)));
    execution.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&execution_history),
        HistoricalDataService::persist,
    ));

    let algo_execution = Rc::new(RefCell::new(AlgoExecutionService::new()));
    algo_execution.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&execution),
        |service: &mut ExecutionService<Bond>, order: &_| service.execute_order(order, Market::Cme),
    ));

    let marketdata = Rc::new(RefCell::new(MarketDataService::new()));
    marketdata.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&algo_execution),
        AlgoExecutionService::execute_from_book,
    ));

    // prices -> (gui, algo streaming -> streaming -> history)
    let gui = Rc::new(RefCell::new(GuiService::new(
        Box::new(gui_sink),
        Rc::clone(&clock),
        config.gui_throttle_ms,
        config.gui_max_samples,
    )));

    let streaming = Rc::new(RefCell::new(StreamingService::new()));
    streaming.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&streaming_history),
        HistoricalDataService::persist,
    ));

    let algo_streaming = Rc::new(RefCell::new(AlgoStreamingService::new()));
    algo_streaming.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&streaming),
        StreamingService::publish_price,
    ));

    let pricing = Rc::new(RefCell::new(PricingService::new()));
    pricing
        .borrow_mut()
        .add_listener(ServiceBridge::new(Rc::clone(&gui), GuiService::on_tick));
    pricing.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&algo_streaming),
        AlgoStreamingService::publish_price,
    ));

    // inquiries loop through the quote connector inside the service, then persist
    let inquiries = Rc::new(RefCell::new(InquiryService::new()));
    inquiries.borrow_mut().add_listener(ServiceBridge::new(
        Rc::clone(&inquiry_history),
        HistoricalDataService::persist,
    ));

    // drive the feeds to exhaustion, one at a time
    let mut report = PipelineReport::default();

    report.trades = FeedSubscription::open(host, config.trades.port, &config.trades.file)?
        .subscribe(|line| {
            let trade = records::parse_trade(line, &catalog)?;
            booking.borrow_mut().on_message(trade);
            Ok(())
        })?;

    report.order_books =
        FeedSubscription::open(host, config.marketdata.port, &config.marketdata.file)?
            .subscribe(|line| {
                let book = records::parse_order_book(line, &catalog)?;
                marketdata.borrow_mut().on_message(book);
                Ok(())
            })?;

    report.prices = FeedSubscription::open(host, config.prices.port, &config.prices.file)?
        .subscribe(|line| {
            let price = records::parse_price(line, &catalog)?;
            pricing.borrow_mut().on_message(price);
            Ok(())
        })?;

    report.inquiries =
        FeedSubscription::open(host, config.inquiries.port, &config.inquiries.file)?
            .subscribe(|line| {
                let inquiry = records::parse_inquiry(line, &catalog)?;
                inquiries.borrow_mut().on_message(inquiry);
                Ok(())
            })?;

    info!(
        "PIPELINE: consumed {} trades, {} books, {} prices, {} inquiries",
        report.trades, report.order_books, report.prices, report.inquiries
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::PipelineConfig;

    #[test]
    fn test_that_defaults_match_the_shipped_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.prices.port, 1234);
        assert_eq!(config.all_inquiries.port, 1243);
        assert_eq!(config.trades.file, "data/trades.txt");
        assert_eq!(config.gui_throttle_ms, 300);
        assert_eq!(config.gui_max_samples, 100);
    }

    #[test]
    fn test_that_config_reads_from_toml() {
        let text = r#"
            host = "10.0.0.5"
            gui_throttle_ms = 500

            [prices]
            port = 9234
            file = "data/prices.txt"
        "#;
        let config: PipelineConfig = toml::from_str(text).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.gui_throttle_ms, 500);
        assert_eq!(config.prices.port, 9234);
        // untouched fields keep their defaults
        assert_eq!(config.trades.port, 1236);
    }
}
