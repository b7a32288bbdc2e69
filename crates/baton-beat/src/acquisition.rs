//! Accelerometer acquisition backends.
//!
//! Sources yield raw text messages; decoding happens in the pipeline so every
//! backend drops malformed input the same way.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use baton_core::{Error, Result};

/// Trait for accelerometer message sources
#[async_trait]
pub trait AccelSource: Send + Sync {
    /// Open the source
    async fn start(&mut self) -> Result<()>;

    /// Close the source
    async fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Next raw message; `Ok(None)` once the source has ended
    async fn recv(&mut self) -> Result<Option<String>>;
}

/// Newline-delimited JSON over a persistent TCP connection to the sensor
pub struct TcpAccelSource {
    address: String,
    max_line_length: usize,
    lines: Option<FramedRead<TcpStream, LinesCodec>>,
}

impl TcpAccelSource {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            max_line_length: 4096,
            lines: None,
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl AccelSource for TcpAccelSource {
    async fn start(&mut self) -> Result<()> {
        if self.lines.is_some() {
            return Ok(());
        }

        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| Error::Stream(format!("cannot connect to {}: {}", self.address, e)))?;
        stream.set_nodelay(true)?;

        let codec = LinesCodec::new_with_max_length(self.max_line_length);
        self.lines = Some(FramedRead::new(stream, codec));

        tracing::info!(address = %self.address, "Connected to accelerometer");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.lines.take().is_some() {
            tracing::info!(address = %self.address, "Disconnected from accelerometer");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lines.is_some()
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| Error::Stream("source not started".into()))?;

        match lines.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            // The framed reader does not resume cleanly after a codec error
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(Error::Stream(format!(
                "sensor message exceeds {} bytes",
                self.max_line_length
            ))),
            Some(Err(LinesCodecError::Io(e))) => {
                Err(Error::Stream(format!("sensor connection failed: {}", e)))
            }
            None => Ok(None),
        }
    }
}

/// In-process source fed through an mpsc channel
pub struct ChannelAccelSource {
    rx: mpsc::Receiver<String>,
    running: bool,
}

impl ChannelAccelSource {
    /// Create the source and the sender that feeds it
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { rx, running: false }, tx)
    }
}

#[async_trait]
impl AccelSource for ChannelAccelSource {
    async fn start(&mut self) -> Result<()> {
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running = false;
        self.rx.close();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        if !self.running {
            return Err(Error::Stream("source not started".into()));
        }
        Ok(self.rx.recv().await)
    }
}
