//! # What is Barra?
//!
//! Barra is the back-office pipeline for a small US Treasury trading desk. Four inbound
//! feeds (internal prices, order-book market data, booked trades, customer inquiries) are
//! pushed through a graph of services and come out the other side as six derived feeds
//! (two-way price streams, executions, positions, risk, throttled GUI ticks and inquiry
//! lifecycle records).
//!
//! # Implementation
//!
//! The pipeline is composed of:
//! - The fabric, [fabric](crate::fabric): generic service, listener and connector
//!   abstractions. Services cache the latest value per key and notify listeners
//!   synchronously; listeners bridge one service's output into another service's input.
//!   The whole graph runs on one thread, so a single inbound record propagates to every
//!   terminal sink before the next record is read.
//! - The product layer, [product](crate::product): the bond catalog, which is loaded once
//!   at startup and passed around as an immutable handle.
//! - The domain services under [service](crate::service): pricing, market data, algo
//!   streaming and algo execution, trade booking, positions, risk, inquiries, the GUI
//!   throttle and the historical fan-out.
//! - The feed layer, [feed](crate::feed): the line-oriented request/response protocol
//!   spoken with the helper reader and writer processes, plus the record codecs for each
//!   feed format.
//! - The wiring, [pipeline](crate::pipeline): builds the graph and drives the four
//!   inbound feeds in a fixed order.
//!
//! [fixture](crate::fixture) contains scripted peers and feed generators used by the
//! integration tests and for running the binary without real helper processes.

pub mod clock;
pub mod fabric;
pub mod feed;
pub mod fixture;
pub mod fractional;
pub mod pipeline;
pub mod product;
pub mod service;

#[cfg(test)]
pub(crate) mod testutil;
