//! Newline-delimited frame transport.
//!
//! The session only sees [`Transport`]; stdio is the default implementation,
//! but any `AsyncRead`/`AsyncWrite` pair (pipes, sockets, in-memory buffers)
//! works through [`FramedTransport`].

use anyhow::Result;
use bytes::{BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, Stdin, Stdout};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};

/// Default upper bound for a single frame (10 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// One line read from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message(String),
    /// A line that can never be a message. The session skips these.
    Malformed(MalformedFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedFrame {
    /// Line exceeded the frame limit; carries its length in bytes
    TooLong(usize),
    InvalidUtf8,
}

/// Line codec that reports bad lines as [`Frame::Malformed`] instead of
/// failing, so one bad frame never ends the stream.
#[derive(Debug)]
pub struct FrameCodec {
    max_length: usize,
    /// Where to resume the newline search
    next_index: usize,
    /// Bytes dropped so far from an oversized line
    discarding: Option<usize>,
}

impl FrameCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: None,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn frame_from(&self, line: &[u8]) -> Option<Frame> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() > self.max_length {
            return Some(Frame::Malformed(MalformedFrame::TooLong(line.len())));
        }
        match std::str::from_utf8(line) {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(Frame::Message(text.trim().to_string())),
            Err(_) => Some(Frame::Malformed(MalformedFrame::InvalidUtf8)),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        loop {
            let start = self.next_index.min(buf.len());
            let newline = buf[start..].iter().position(|b| *b == b'\n');

            let Some(offset) = newline else {
                if let Some(dropped) = self.discarding.as_mut() {
                    *dropped += buf.len();
                    buf.clear();
                    self.next_index = 0;
                } else if buf.len() > self.max_length.saturating_add(1) {
                    // One byte of slack for a '\r' whose '\n' has not arrived yet
                    self.discarding = Some(buf.len());
                    buf.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = buf.len();
                }
                return Ok(None);
            };

            let line = buf.split_to(start + offset + 1);
            self.next_index = 0;

            if let Some(dropped) = self.discarding.take() {
                let total = dropped + line.len() - 1;
                return Ok(Some(Frame::Malformed(MalformedFrame::TooLong(total))));
            }

            // Blank lines are skipped without surfacing a frame
            if let Some(frame) = self.frame_from(&line[..line.len() - 1]) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if let Some(dropped) = self.discarding.take() {
            buf.clear();
            return Ok(Some(Frame::Malformed(MalformedFrame::TooLong(dropped))));
        }
        // An unterminated final line still counts
        let rest = buf.split();
        self.next_index = 0;
        Ok(self.frame_from(&rest))
    }
}

impl Encoder<String> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), io::Error> {
        buf.reserve(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}

/// Source and sink of frames for a session
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Next frame, or `None` at end of input
    async fn recv(&mut self) -> Result<Option<Frame>>;

    /// Write one frame and flush it
    async fn send(&mut self, frame: String) -> Result<()>;
}

/// [`Transport`] over any reader/writer pair
pub struct FramedTransport<R, W> {
    reader: FramedRead<R, FrameCodec>,
    writer: FramedWrite<W, FrameCodec>,
}

impl<R, W> FramedTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, max_frame_bytes: usize) -> Self {
        Self {
            reader: FramedRead::new(reader, FrameCodec::new(max_frame_bytes)),
            writer: FramedWrite::new(writer, FrameCodec::new(max_frame_bytes)),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait::async_trait]
impl<R, W> Transport for FramedTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<Frame>> {
        match self.reader.next().await {
            Some(frame) => Ok(Some(frame?)),
            None => Ok(None),
        }
    }

    async fn send(&mut self, frame: String) -> Result<()> {
        self.writer.send(frame).await?;
        Ok(())
    }
}

pub type StdioTransport = FramedTransport<Stdin, Stdout>;

/// Transport over the process's standard input and output
pub fn stdio(max_frame_bytes: usize) -> StdioTransport {
    FramedTransport::new(tokio::io::stdin(), tokio::io::stdout(), max_frame_bytes)
}
