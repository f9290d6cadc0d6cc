//! Scripted feed peers and feed generators.
//!
//! The pipeline normally talks to separate reader and writer helper processes. For the
//! integration tests, and for running the binary without those helpers, this module
//! provides in-process peers speaking the same protocol over loopback TCP, plus
//! generators producing feed files in the wire formats.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use rand::Rng;

use crate::feed::EOF_SENTINEL;
use crate::product::BondCatalog;

fn recv_line(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    let read = reader.read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn send_line(reader: &mut BufReader<TcpStream>, line: &str) -> std::io::Result<()> {
    let stream = reader.get_mut();
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")
}

fn serve_reader(listener: TcpListener, lines: Vec<String>) -> std::io::Result<()> {
    let (stream, _) = listener.accept()?;
    let mut reader = BufReader::new(stream);

    // each request names the file; answer with the next record, then the sentinel
    for line in &lines {
        if recv_line(&mut reader)?.is_none() {
            return Ok(());
        }
        send_line(&mut reader, line)?;
    }
    if recv_line(&mut reader)?.is_some() {
        send_line(&mut reader, EOF_SENTINEL)?;
    }
    Ok(())
}

fn serve_writer(listener: TcpListener) -> std::io::Result<Vec<String>> {
    let (stream, _) = listener.accept()?;
    let mut reader = BufReader::new(stream);
    let mut captured = Vec::new();

    // file-name handshake, then one ack per record until the sentinel
    if recv_line(&mut reader)?.is_none() {
        return Ok(captured);
    }
    send_line(&mut reader, "success")?;
    while let Some(line) = recv_line(&mut reader)? {
        if line == EOF_SENTINEL {
            break;
        }
        captured.push(line);
        send_line(&mut reader, "success")?;
    }
    Ok(captured)
}

/// Serves `lines` as an inbound feed on an ephemeral loopback port.
pub fn spawn_reader(lines: Vec<String>) -> std::io::Result<(u16, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let handle = thread::spawn(move || {
        let _ = serve_reader(listener, lines);
    });
    Ok((port, handle))
}

/// Accepts an outbound sink on an ephemeral loopback port and captures every record
/// published to it. Joining the handle returns the captured lines.
pub fn spawn_writer() -> std::io::Result<(u16, JoinHandle<Vec<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let handle = thread::spawn(move || serve_writer(listener).unwrap_or_default());
    Ok((port, handle))
}

fn tick_up(price: (i64, u32, u32)) -> (i64, u32, u32) {
    let (mut whole, mut thirty_seconds, mut ticks) = price;
    ticks += 1;
    if ticks == 8 {
        ticks = 0;
        thirty_seconds += 1;
        if thirty_seconds == 32 {
            thirty_seconds = 0;
            whole += 1;
        }
    }
    (whole, thirty_seconds, ticks)
}

fn tick_down(price: (i64, u32, u32)) -> (i64, u32, u32) {
    let (mut whole, mut thirty_seconds, mut ticks) = price;
    if ticks == 0 {
        ticks = 8;
        if thirty_seconds == 0 {
            thirty_seconds = 32;
            whole -= 1;
        }
        thirty_seconds -= 1;
    }
    ticks -= 1;
    (whole, thirty_seconds, ticks)
}

fn render(price: (i64, u32, u32)) -> String {
    format!("{}-{:02}{}", price.0, price.1, price.2)
}

/// Price records oscillating tick by tick between 99 and 101, with a random one- or
/// two-digit spread, for every catalog bond in turn.
pub fn price_lines(updates_per_bond: usize, catalog: &BondCatalog) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let mut lines = Vec::new();
    let mut price = (98, 31, 7);
    let mut rising = true;

    for _ in 0..updates_per_bond {
        for cusip in catalog.cusips() {
            if rising {
                price = tick_up(price);
                if price == (101, 0, 0) {
                    rising = false;
                }
            } else {
                price = tick_down(price);
                if price == (99, 0, 0) {
                    rising = true;
                }
            }
            let spread = rng.gen_range(1..3);
            lines.push(format!("{cusip},{},{spread}", render(price)));
        }
    }
    lines
}

/// Trade records alternating buy/sell with quantities cycling one to five million
/// across the three books.
pub fn trade_lines(trades_per_bond: usize, catalog: &BondCatalog) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let mut lines = Vec::new();
    let mut idx = 0usize;

    for round in 0..trades_per_bond {
        for cusip in catalog.cusips() {
            let side = if round % 2 == 0 { "BUY" } else { "SELL" };
            let price = if round % 2 == 0 { "99.0" } else { "100.0" };
            let book = rng.gen_range(1..4);
            let quantity = (1 + round % 5) * 1_000_000;
            lines.push(format!("{cusip},TradeId{idx},TRSY{book},{price},{side},{quantity}"));
            idx += 1;
        }
    }
    lines
}

/// Five-level order books around an oscillating mid, with the top-of-book spread
/// cycling between 1/128 and 1/64.
pub fn market_data_lines(books_per_bond: usize, catalog: &BondCatalog) -> Vec<String> {
    let mut lines = Vec::new();
    let mut mid = (99, 0, 0);
    let mut rising = true;
    let mut wide = false;

    for _ in 0..books_per_bond {
        for cusip in catalog.cusips() {
            if rising {
                mid = tick_up(mid);
                if mid.0 >= 101 {
                    rising = false;
                }
            } else {
                mid = tick_down(mid);
                if mid == (99, 0, 0) {
                    rising = true;
                }
            }

            let half_spread_ticks = if wide { 2 } else { 1 };
            wide = !wide;

            let mut fields = vec![cusip.to_string()];
            let mut best_bid = mid;
            for _ in 0..half_spread_ticks {
                best_bid = tick_down(best_bid);
            }
            // bids print deepest first
            let mut bid = best_bid;
            let mut bids = Vec::new();
            for _ in 0..5 {
                bids.push(render(bid));
                bid = tick_down(bid);
            }
            bids.reverse();
            fields.extend(bids);

            let mut offer = mid;
            for _ in 0..half_spread_ticks {
                offer = tick_up(offer);
            }
            for _ in 0..5 {
                fields.push(render(offer));
                offer = tick_up(offer);
            }
            lines.push(fields.join(","));
        }
    }
    lines
}

/// One RECEIVED inquiry per bond per round, alternating sides.
pub fn inquiry_lines(inquiries_per_bond: usize, catalog: &BondCatalog) -> Vec<String> {
    let mut lines = Vec::new();
    let mut idx = 0usize;
    for round in 0..inquiries_per_bond {
        for cusip in catalog.cusips() {
            let side = if round % 2 == 0 { "BUY" } else { "SELL" };
            lines.push(format!("Inquiry{idx},{cusip},{side}"));
            idx += 1;
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::{inquiry_lines, market_data_lines, price_lines, tick_down, tick_up, trade_lines};
    use crate::feed::records;
    use crate::product::BondCatalog;

    #[test]
    fn test_that_tick_arithmetic_carries_across_components() {
        assert_eq!(tick_up((98, 31, 7)), (99, 0, 0));
        assert_eq!(tick_down((99, 0, 0)), (98, 31, 7));
        assert_eq!(tick_up((99, 15, 3)), (99, 15, 4));
    }

    #[test]
    fn test_that_generated_records_parse_back() {
        let catalog = BondCatalog::treasuries();
        for line in price_lines(3, &catalog) {
            records::parse_price(&line, &catalog).unwrap();
        }
        for line in trade_lines(3, &catalog) {
            records::parse_trade(&line, &catalog).unwrap();
        }
        for line in market_data_lines(3, &catalog) {
            let book = records::parse_order_book(&line, &catalog).unwrap();
            assert!(book.spread() > 0.0);
        }
        for line in inquiry_lines(3, &catalog) {
            records::parse_inquiry(&line, &catalog).unwrap();
        }
    }

    #[test]
    fn test_that_generated_spreads_alternate_tight_and_wide() {
        let catalog = BondCatalog::treasuries();
        let lines = market_data_lines(1, &catalog);
        let spreads: Vec<f64> = lines
            .iter()
            .map(|line| {
                records::parse_order_book(line, &catalog)
                    .unwrap()
                    .spread()
            })
            .collect();
        assert_eq!(spreads[0], 1.0 / 128.0);
        assert_eq!(spreads[1], 1.0 / 64.0);
        assert_eq!(spreads[2], 1.0 / 128.0);
    }

    #[test]
    fn test_that_price_oscillation_stays_in_band() {
        let catalog = BondCatalog::treasuries();
        for line in price_lines(100, &catalog) {
            let price = records::parse_price(&line, &catalog).unwrap();
            assert!(price.mid >= 99.0 && price.mid <= 101.0);
        }
    }
}
