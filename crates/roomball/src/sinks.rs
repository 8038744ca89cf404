//! Sinks that serialize or log outbound items.

use std::io::{self, Write};

use roomball_protocol::{Codec, JsonCodec, Outbound};
use roomball_room::{EventSink, SinkError};

/// Writes one JSON object per outbound item, newline-terminated.
pub struct JsonLinesSink<W: Write + Send + 'static> {
    writer: W,
    codec: JsonCodec,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codec: JsonCodec,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> EventSink for JsonLinesSink<W> {
    fn deliver(&mut self, item: Outbound) -> Result<(), SinkError> {
        let mut line = self.codec.encode(&item)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Logs every item at debug level, reports at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn deliver(&mut self, item: Outbound) -> Result<(), SinkError> {
        match &item {
            Outbound::Event(event) => tracing::debug!(
                key = %event.key,
                command = %event.command,
                snapshot = event.snapshot,
                fields = ?event.fields,
                "room event"
            ),
            Outbound::EndOfSnapshot => tracing::debug!("end of snapshot"),
            Outbound::Bandwidth(update) => tracing::info!(
                user = %update.user,
                kbps = %update.current_bandwidth,
                "bandwidth"
            ),
            Outbound::Statistics(report) => tracing::info!(
                samples = report.samples,
                min = report.min_kbps,
                max = report.max_kbps,
                mean = report.mean_kbps,
                last = report.last_kbps,
                "bandwidth statistics"
            ),
        }
        Ok(())
    }
}
