//! Codecs for the comma-separated record formats on each feed.

use thiserror::Error;

use crate::fractional;
use crate::fractional::FractionalError;
use crate::product::{Bond, BondCatalog, CatalogError};
use crate::service::booking::{Book, Trade};
use crate::service::execution::ExecutionOrder;
use crate::service::inquiry::{Inquiry, InquiryState};
use crate::service::marketdata::{Order, OrderBook, PricingSide};
use crate::service::position::Position;
use crate::service::pricing::Price;
use crate::service::risk::Pv01;
use crate::service::streaming::PriceStream;

const BOOK_DEPTH: usize = 5;
const LEVEL_QUANTITY: i64 = 1_000_000;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{feed} record {line:?} does not have {expected} fields")]
    WrongShape {
        feed: &'static str,
        expected: usize,
        line: String,
    },
    #[error("{feed} record has a bad {field} field: {reason}")]
    BadField {
        feed: &'static str,
        field: &'static str,
        reason: String,
    },
    #[error(transparent)]
    UnknownProduct(#[from] CatalogError),
    #[error(transparent)]
    BadPrice(#[from] FractionalError),
}

fn fields<'a>(
    feed: &'static str,
    line: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>, RecordError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != expected {
        return Err(RecordError::WrongShape {
            feed,
            expected,
            line: line.to_string(),
        });
    }
    Ok(fields)
}

fn bad(feed: &'static str, field: &'static str, reason: impl ToString) -> RecordError {
    RecordError::BadField {
        feed,
        field,
        reason: reason.to_string(),
    }
}

/// `cusip,price,spread-digit` with the price in fractional notation and the spread as a
/// single digit d meaning d/128.
pub fn parse_price(line: &str, catalog: &BondCatalog) -> Result<Price<Bond>, RecordError> {
    let fields = fields("prices", line, 3)?;
    let product = catalog.bond(fields[0])?.clone();
    let mid = fractional::decode(fields[1])?;

    let digit = fields[2];
    if digit.len() != 1 || !digit.as_bytes()[0].is_ascii_digit() {
        return Err(bad("prices", "spread", format!("{digit:?} is not a digit")));
    }
    let spread = f64::from(digit.as_bytes()[0] - b'0') / 128.0;

    Ok(Price::new(product, mid, spread))
}

/// `cusip,tradeId,book,price,side,quantity`; the price may be fractional or decimal.
pub fn parse_trade(line: &str, catalog: &BondCatalog) -> Result<Trade<Bond>, RecordError> {
    let fields = fields("trades", line, 6)?;
    let product = catalog.bond(fields[0])?.clone();
    let book: Book = fields[2].parse().map_err(|err| bad("trades", "book", err))?;
    let price = if fields[3].contains('-') {
        fractional::decode(fields[3])?
    } else {
        fields[3]
            .parse()
            .map_err(|err| bad("trades", "price", err))?
    };
    let side = fields[4].parse().map_err(|err| bad("trades", "side", err))?;
    let quantity: i64 = fields[5]
        .parse()
        .map_err(|err| bad("trades", "quantity", err))?;
    if quantity <= 0 {
        return Err(bad("trades", "quantity", "must be positive"));
    }

    Ok(Trade {
        product,
        trade_id: fields[1].to_string(),
        price,
        book,
        quantity,
        side,
    })
}

/// `cusip,b1..b5,o1..o5`: five bid levels tightest last, five offer levels tightest
/// first, all in fractional notation. Level L quotes L million on both sides.
pub fn parse_order_book(
    line: &str,
    catalog: &BondCatalog,
) -> Result<OrderBook<Bond>, RecordError> {
    let fields = fields("marketdata", line, 1 + 2 * BOOK_DEPTH)?;
    let product = catalog.bond(fields[0])?.clone();

    let mut bid_stack = Vec::with_capacity(BOOK_DEPTH);
    let mut offer_stack = Vec::with_capacity(BOOK_DEPTH);
    for level in 0..BOOK_DEPTH {
        let quantity = (level as i64 + 1) * LEVEL_QUANTITY;
        let bid_price = fractional::decode(fields[BOOK_DEPTH - level])?;
        let offer_price = fractional::decode(fields[BOOK_DEPTH + 1 + level])?;
        bid_stack.push(Order::new(bid_price, quantity, PricingSide::Bid));
        offer_stack.push(Order::new(offer_price, quantity, PricingSide::Offer));
    }

    Ok(OrderBook::new(product, bid_stack, offer_stack))
}

/// `inquiryId,cusip,side`; quantity and price start at zero, state at RECEIVED.
pub fn parse_inquiry(line: &str, catalog: &BondCatalog) -> Result<Inquiry<Bond>, RecordError> {
    let fields = fields("inquiries", line, 3)?;
    let product = catalog.bond(fields[1])?.clone();
    let side = fields[2]
        .parse()
        .map_err(|err| bad("inquiries", "side", err))?;

    Ok(Inquiry {
        inquiry_id: fields[0].to_string(),
        product,
        side,
        quantity: 0,
        price: 0.0,
        state: InquiryState::Received,
    })
}

pub fn format_position(ts: u64, position: &Position<Bond>) -> String {
    format!(
        "{ts},{},{},{},{},{}",
        position.product.cusip,
        position.quantity(Book::Trsy1),
        position.quantity(Book::Trsy2),
        position.quantity(Book::Trsy3),
        position.aggregate()
    )
}

pub fn format_risk(ts: u64, risk: &Pv01<Bond>) -> String {
    format!("{ts},{},{:.2}", risk.product.cusip, risk.total())
}

pub fn format_execution(ts: u64, order: &ExecutionOrder<Bond>) -> String {
    let side = match order.side {
        PricingSide::Bid => "BUY",
        PricingSide::Offer => "SELL",
    };
    format!(
        "{ts},{},{},{},{side},{},{},{}",
        order.product.cusip,
        order.order_id,
        order.order_type,
        fractional::encode(order.price),
        order.visible_quantity,
        order.hidden_quantity
    )
}

pub fn format_stream(ts: u64, stream: &PriceStream<Bond>) -> String {
    format!(
        "{ts},{},{},{}",
        stream.product.cusip,
        fractional::encode(stream.bid.price),
        fractional::encode(stream.offer.price)
    )
}

pub fn format_gui(ts: u64, price: &Price<Bond>) -> String {
    format!(
        "{ts},{},{},{}",
        price.product.cusip, price.mid, price.bid_offer_spread
    )
}

pub fn format_inquiry(ts: u64, inquiry: &Inquiry<Bond>) -> String {
    let state = match inquiry.state {
        InquiryState::Done => "DONE",
        _ => "REJECTED",
    };
    format!(
        "{ts},{},{},{state}",
        inquiry.product.cusip,
        fractional::encode(inquiry.price)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::booking::Side;
    use crate::service::execution::OrderType;
    use crate::service::streaming::PriceStreamOrder;

    fn catalog() -> BondCatalog {
        BondCatalog::treasuries()
    }

    #[test]
    fn test_that_price_records_decode_mid_and_spread() {
        let price = parse_price("91282CAX9,100-000,2", &catalog()).unwrap();
        assert_eq!(price.product.cusip, "91282CAX9");
        assert_eq!(price.mid, 100.0);
        assert_eq!(price.bid_offer_spread, 2.0 / 128.0);

        let plus = parse_price("912810SS8,99-31+,1", &catalog()).unwrap();
        assert_eq!(plus.mid, 99.0 + 31.0 / 32.0 + 4.0 / 256.0);
    }

    #[test]
    fn test_that_price_records_reject_garbage() {
        assert!(parse_price("91282CAX9,100-000", &catalog()).is_err());
        assert!(parse_price("91282CAX9,100-000,12", &catalog()).is_err());
        assert!(parse_price("91282CAX9,100.0,2", &catalog()).is_err());
        assert!(parse_price("912828ZZ9,100-000,2", &catalog()).is_err());
    }

    #[test]
    fn test_that_trade_records_take_both_price_notations() {
        let fractional = parse_trade("91282CAX9,T1,TRSY1,100-000,BUY,1000000", &catalog()).unwrap();
        assert_eq!(fractional.price, 100.0);
        assert_eq!(fractional.book, Book::Trsy1);
        assert_eq!(fractional.side, Side::Buy);
        assert_eq!(fractional.quantity, 1_000_000);

        let decimal = parse_trade("91282CAX9,T2,TRSY2,99.0,SELL,500000", &catalog()).unwrap();
        assert_eq!(decimal.price, 99.0);
        assert_eq!(decimal.side, Side::Sell);
    }

    #[test]
    fn test_that_trade_records_need_positive_quantity() {
        assert!(parse_trade("91282CAX9,T1,TRSY1,100-000,BUY,0", &catalog()).is_err());
        assert!(parse_trade("91282CAX9,T1,TRSY1,100-000,BUY,-5", &catalog()).is_err());
        assert!(parse_trade("91282CAX9,T1,TRSY9,100-000,BUY,10", &catalog()).is_err());
    }

    #[test]
    fn test_that_order_book_records_stack_best_first() {
        let line = "91282CAX9,99-305,99-306,99-307,99-310,99-311,99-312,99-313,99-314,99-315,99-316";
        let book = parse_order_book(line, &catalog()).unwrap();

        assert_eq!(book.best_bid().price, 99.0 + 31.0 / 32.0 + 1.0 / 256.0);
        assert_eq!(book.best_offer().price, 99.0 + 31.0 / 32.0 + 2.0 / 256.0);
        assert_eq!(book.spread(), 1.0 / 256.0);

        // level quantities climb a million per level on both sides
        for (level, order) in book.bid_stack.iter().enumerate() {
            assert_eq!(order.quantity, (level as i64 + 1) * 1_000_000);
        }
        assert_eq!(book.offer_stack[4].price, 99.0 + 31.0 / 32.0 + 6.0 / 256.0);
    }

    #[test]
    fn test_that_inquiry_records_default_to_received() {
        let inquiry = parse_inquiry("Q1,91282CAX9,BUY", &catalog()).unwrap();
        assert_eq!(inquiry.inquiry_id, "Q1");
        assert_eq!(inquiry.state, InquiryState::Received);
        assert_eq!(inquiry.quantity, 0);
        assert_eq!(inquiry.price, 0.0);
    }

    #[test]
    fn test_that_emitted_records_render_their_wire_shapes() {
        let catalog = catalog();
        let bond = catalog.bond("91282CAX9").unwrap().clone();

        let mut position = Position::new(bond.clone());
        position.add(Book::Trsy1, 1_000_000, Side::Buy);
        position.add(Book::Trsy2, 400_000, Side::Sell);
        assert_eq!(
            format_position(9, &position),
            "9,91282CAX9,1000000,-400000,0,600000"
        );

        let risk = Pv01::new(bond.clone(), 0.02, 600_000);
        assert_eq!(format_risk(9, &risk), "9,91282CAX9,12000.00");

        let order = ExecutionOrder {
            product: bond.clone(),
            side: PricingSide::Bid,
            order_id: "1".to_string(),
            order_type: OrderType::Market,
            price: 99.0 + 31.0 / 32.0 + 1.0 / 256.0,
            visible_quantity: 1_000_000,
            hidden_quantity: 1_000_000,
            parent_order_id: "1".to_string(),
            is_child: false,
        };
        assert_eq!(
            format_execution(9, &order),
            "9,91282CAX9,1,MARKET,BUY,99-311,1000000,1000000"
        );

        let stream = PriceStream {
            product: bond.clone(),
            bid: PriceStreamOrder::new(99.9921875, 2_000_000, 4_000_000, PricingSide::Bid),
            offer: PriceStreamOrder::new(100.0078125, 2_000_000, 4_000_000, PricingSide::Offer),
        };
        assert_eq!(format_stream(9, &stream), "9,91282CAX9,99-316,100-002");

        let price = Price::new(bond.clone(), 100.0, 0.015625);
        assert_eq!(format_gui(9, &price), "9,91282CAX9,100,0.015625");

        let inquiry = Inquiry {
            inquiry_id: "Q1".to_string(),
            product: bond,
            side: Side::Buy,
            quantity: 0,
            price: 100.0,
            state: InquiryState::Done,
        };
        assert_eq!(format_inquiry(9, &inquiry), "9,91282CAX9,100-000,DONE");
    }
}
