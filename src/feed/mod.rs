//! The line-oriented boundary with the helper reader and writer processes.
//!
//! Both directions speak the same newline-terminated request/response protocol over a
//! local TCP stream. Inbound, we send the feed's file name and get one record back per
//! request, until the literal `EOF`. Outbound, we announce the file name once, then send
//! one record per line and wait for the peer's ack before the next; teardown sends the
//! `EOF` sentinel so the peer can close its file.

pub mod records;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::rc::Rc;

use anyhow::Context;
use log::{debug, info};

use crate::clock::WallClock;
use crate::fabric::Connector;

pub const EOF_SENTINEL: &str = "EOF";

/// One newline-framed request/response channel.
pub struct LineClient {
    stream: BufReader<TcpStream>,
    peer: String,
}

impl LineClient {
    pub fn connect(host: &str, port: u16) -> anyhow::Result<Self> {
        let peer = format!("{host}:{port}");
        let stream = TcpStream::connect(&peer)
            .with_context(|| format!("connecting to {peer}"))?;
        Ok(Self {
            stream: BufReader::new(stream),
            peer,
        })
    }

    pub fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        let stream = self.stream.get_mut();
        stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .with_context(|| format!("writing to {}", self.peer))
    }

    pub fn recv_line(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = self
            .stream
            .read_line(&mut line)
            .with_context(|| format!("reading from {}", self.peer))?;
        anyhow::ensure!(read > 0, "{} closed the stream mid-feed", self.peer);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Sends one line and waits for the reply line.
    pub fn request(&mut self, line: &str) -> anyhow::Result<String> {
        self.send_line(line)?;
        self.recv_line()
    }
}

/// Inbound connector: pulls a feed record by record and hands each line to a handler.
pub struct FeedSubscription {
    client: LineClient,
    file_name: String,
}

impl FeedSubscription {
    pub fn open(host: &str, port: u16, file_name: &str) -> anyhow::Result<Self> {
        info!("FEED: subscribing to {file_name} on {host}:{port}");
        Ok(Self {
            client: LineClient::connect(host, port)?,
            file_name: file_name.to_string(),
        })
    }

    /// Drives the feed to its EOF sentinel, delivering each record in arrival order.
    /// A handler error aborts the feed: nothing after a bad record is read.
    pub fn subscribe<F>(mut self, mut deliver: F) -> anyhow::Result<u64>
    where
        F: FnMut(&str) -> anyhow::Result<()>,
    {
        let mut records = 0u64;
        let mut line = self.client.request(&self.file_name)?;
        while line != EOF_SENTINEL {
            deliver(&line)
                .with_context(|| format!("{}: bad record {line:?}", self.file_name))?;
            records += 1;
            line = self.client.request(&self.file_name)?;
        }
        info!("FEED: {} exhausted after {records} records", self.file_name);
        Ok(records)
    }
}

/// Outbound connector: formats each entity as a timestamped line and waits for the
/// peer's ack. Dropping the sink sends the EOF sentinel.
pub struct RecordSink<V> {
    client: LineClient,
    clock: Rc<dyn WallClock>,
    format: fn(u64, &V) -> String,
    file_name: String,
}

impl<V> RecordSink<V> {
    pub fn open(
        host: &str,
        port: u16,
        file_name: &str,
        clock: Rc<dyn WallClock>,
        format: fn(u64, &V) -> String,
    ) -> anyhow::Result<Self> {
        info!("FEED: opening sink {file_name} on {host}:{port}");
        let mut client = LineClient::connect(host, port)?;
        let greeting = client.request(file_name)?;
        debug!("FEED: {file_name} peer answered {greeting:?}");
        Ok(Self {
            client,
            clock,
            format,
            file_name: file_name.to_string(),
        })
    }
}

impl<V> Connector<V> for RecordSink<V> {
    fn publish(&mut self, data: &V) -> anyhow::Result<()> {
        let line = (self.format)(self.clock.now_millis(), data);
        self.client
            .request(&line)
            .with_context(|| format!("publishing to {}", self.file_name))?;
        Ok(())
    }
}

impl<V> Drop for RecordSink<V> {
    fn drop(&mut self) {
        // best effort; the peer may already be gone on an error path
        let _ = self.client.send_line(EOF_SENTINEL);
        info!("FEED: closed sink {}", self.file_name);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{FeedSubscription, RecordSink};
    use crate::clock::ManualClock;
    use crate::fabric::Connector;
    use crate::fixture;

    #[test]
    fn test_that_subscription_drains_the_feed_in_order() {
        let lines = vec!["a,1".to_string(), "b,2".to_string(), "c,3".to_string()];
        let (port, handle) = fixture::spawn_reader(lines.clone()).unwrap();

        let mut seen = Vec::new();
        let records = FeedSubscription::open("127.0.0.1", port, "data/test.txt")
            .unwrap()
            .subscribe(|line| {
                seen.push(line.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(records, 3);
        assert_eq!(seen, lines);
        handle.join().unwrap();
    }

    #[test]
    fn test_that_a_bad_record_aborts_the_feed() {
        let lines = vec!["good".to_string(), "bad".to_string(), "good".to_string()];
        let (port, _handle) = fixture::spawn_reader(lines).unwrap();

        let result = FeedSubscription::open("127.0.0.1", port, "data/test.txt")
            .unwrap()
            .subscribe(|line| {
                anyhow::ensure!(line == "good", "malformed");
                Ok(())
            });

        assert!(result.is_err());
    }

    #[test]
    fn test_that_sink_lines_carry_the_clock_timestamp() {
        let (port, handle) = fixture::spawn_writer().unwrap();
        let clock = Rc::new(ManualClock::new(1_234));

        {
            let mut sink: RecordSink<i64> = RecordSink::open(
                "127.0.0.1",
                port,
                "output/test.txt",
                clock,
                |ts, v| format!("{ts},{v}"),
            )
            .unwrap();
            sink.publish(&7).unwrap();
            sink.publish(&8).unwrap();
        }

        let captured = handle.join().unwrap();
        assert_eq!(captured, vec!["1234,7".to_string(), "1234,8".to_string()]);
    }
}
