//! Drives the whole pipeline over loopback TCP against scripted reader and writer
//! peers, then checks every emitted feed line by line.

use std::rc::Rc;

use barra::clock::ManualClock;
use barra::fixture;
use barra::pipeline::{self, Endpoint, PipelineConfig};

const CUSIP: &str = "91282CAX9";
const TS: u64 = 1_000_000;

fn endpoint(port: u16, file: &str) -> Endpoint {
    Endpoint {
        port,
        file: file.to_string(),
    }
}

#[test]
fn test_that_the_pipeline_produces_every_derived_feed() {
    env_logger::init();

    // trades: a buy then a partial sell (S1, S2)
    let trades = vec![
        format!("{CUSIP},T1,TRSY1,100-000,BUY,1000000"),
        format!("{CUSIP},T2,TRSY2,99-000,SELL,400000"),
    ];
    // market data: two books at the minimum tradable spread, one too wide (S3, S4)
    let tight = format!(
        "{CUSIP},99-305,99-306,99-307,99-310,99-311,99-312,99-313,99-314,99-315,99-316"
    );
    let wide = format!(
        "{CUSIP},99-294,99-295,99-296,99-297,99-300,99-310,99-311,99-312,99-313,99-314"
    );
    let marketdata = vec![tight.clone(), tight, wide];
    // prices: the same mid twice so the stream sizes alternate (S5)
    let prices = vec![
        format!("{CUSIP},100-000,2"),
        format!("{CUSIP},100-000,2"),
    ];
    // inquiries: one round trip to DONE (S6)
    let inquiries = vec![format!("Q1,{CUSIP},BUY")];

    let (trades_port, _t) = fixture::spawn_reader(trades).unwrap();
    let (marketdata_port, _m) = fixture::spawn_reader(marketdata).unwrap();
    let (prices_port, _p) = fixture::spawn_reader(prices).unwrap();
    let (inquiries_port, _i) = fixture::spawn_reader(inquiries).unwrap();

    let (positions_port, positions_peer) = fixture::spawn_writer().unwrap();
    let (risk_port, risk_peer) = fixture::spawn_writer().unwrap();
    let (executions_port, executions_peer) = fixture::spawn_writer().unwrap();
    let (streaming_port, streaming_peer) = fixture::spawn_writer().unwrap();
    let (gui_port, gui_peer) = fixture::spawn_writer().unwrap();
    let (all_inquiries_port, inquiries_peer) = fixture::spawn_writer().unwrap();

    let config = PipelineConfig {
        host: "127.0.0.1".to_string(),
        trades: endpoint(trades_port, "data/trades.txt"),
        marketdata: endpoint(marketdata_port, "data/marketdata.txt"),
        prices: endpoint(prices_port, "data/prices.txt"),
        inquiries: endpoint(inquiries_port, "data/inquiries.txt"),
        positions: endpoint(positions_port, "output/positions.txt"),
        risk: endpoint(risk_port, "output/risk.txt"),
        executions: endpoint(executions_port, "output/executions.txt"),
        streaming: endpoint(streaming_port, "output/streaming.txt"),
        gui: endpoint(gui_port, "output/gui.txt"),
        all_inquiries: endpoint(all_inquiries_port, "output/allinquiries.txt"),
        gui_throttle_ms: 300,
        gui_max_samples: 100,
    };

    // pin the wall clock so every emitted timestamp is checkable
    let report = pipeline::run_with_clock(&config, Rc::new(ManualClock::new(TS))).unwrap();
    assert_eq!(report.trades, 2);
    assert_eq!(report.order_books, 3);
    assert_eq!(report.prices, 2);
    assert_eq!(report.inquiries, 1);

    // positions: the two feed trades, then the two execution-sourced trades booked
    // into TRSY2 (buy 1m) and TRSY3 (sell 1m)
    let positions = positions_peer.join().unwrap();
    assert_eq!(
        positions,
        vec![
            format!("{TS},{CUSIP},1000000,0,0,1000000"),
            format!("{TS},{CUSIP},1000000,-400000,0,600000"),
            format!("{TS},{CUSIP},1000000,600000,0,1600000"),
            format!("{TS},{CUSIP},1000000,600000,-1000000,600000"),
        ]
    );

    // risk: aggregate position times the 2Y PV01 of 0.02, after every update
    let risk = risk_peer.join().unwrap();
    assert_eq!(
        risk,
        vec![
            format!("{TS},{CUSIP},20000.00"),
            format!("{TS},{CUSIP},12000.00"),
            format!("{TS},{CUSIP},32000.00"),
            format!("{TS},{CUSIP},12000.00"),
        ]
    );

    // executions: only the tight books trade, sides alternating, third book gated
    let executions = executions_peer.join().unwrap();
    assert_eq!(
        executions,
        vec![
            format!("{TS},{CUSIP},1,MARKET,BUY,99-311,1000000,1000000"),
            format!("{TS},{CUSIP},2,MARKET,SELL,99-312,1000000,1000000"),
        ]
    );

    // streaming: half the 2/128 spread either side of the mid on both ticks
    let streaming = streaming_peer.join().unwrap();
    assert_eq!(
        streaming,
        vec![
            format!("{TS},{CUSIP},99-316,100-002"),
            format!("{TS},{CUSIP},99-316,100-002"),
        ]
    );

    // gui: the first tick emits, the second falls inside the throttle window
    let gui = gui_peer.join().unwrap();
    assert_eq!(gui, vec![format!("{TS},{CUSIP},100,0.015625")]);

    // inquiries: quoted at par and completed
    let all_inquiries = inquiries_peer.join().unwrap();
    assert_eq!(all_inquiries, vec![format!("{TS},{CUSIP},100-000,DONE")]);
}
