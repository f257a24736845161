//! Output targets of a render.
//!
//! The renderer writes to a [`Sink`]. A `String` is the simplest sink, while
//! [`BufferedSink`] collects output in a fixed buffer and hands it to a
//! [`Destination`] in large writes, synchronously or asynchronously.
use crate::{
    log::{Error, ErrorKind},
    outcome::BoxFuture,
};
use std::ops::Range;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

/// Capacity in bytes of a [`BufferedSink`] created with [`BufferedSink::new`].
pub const DEFAULT_CAPACITY: usize = 8192;

/// A writer the renderer can target.
pub trait Sink: Send {
    /// Write the text.
    fn write(&mut self, text: &str) -> Result<(), Error>;

    /// Write the text, suspending if the destination is not ready.
    fn write_async<'a>(&'a mut self, text: &'a str) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move { self.write(text) })
    }
}

impl Sink for String {
    #[inline]
    fn write(&mut self, text: &str) -> Result<(), Error> {
        self.push_str(text);

        Ok(())
    }
}

/// The target a [`BufferedSink`] flushes to.
pub trait Destination: Send {
    /// Write every byte.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Flush any data held by the destination itself.
    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Write every byte, suspending if the destination is not ready.
    fn write_all_async<'a>(&'a mut self, bytes: &'a [u8]) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move { self.write_all(bytes) })
    }

    /// Flush any data held by the destination itself, suspending if the
    /// destination is not ready.
    fn flush_async(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move { self.flush() })
    }
}

impl Destination for Vec<u8> {
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);

        Ok(())
    }
}

impl Destination for String {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let text = std::str::from_utf8(bytes).map_err(|error| {
            Error::build("output is not valid utf-8")
                .with_kind(ErrorKind::Io)
                .with_help(error.to_string())
        })?;
        self.push_str(text);

        Ok(())
    }
}

impl<D> Destination for &mut D
where
    D: Destination + ?Sized,
{
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        (**self).write_all(bytes)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Error> {
        (**self).flush()
    }

    #[inline]
    fn write_all_async<'a>(&'a mut self, bytes: &'a [u8]) -> BoxFuture<'a, Result<(), Error>> {
        (**self).write_all_async(bytes)
    }

    #[inline]
    fn flush_async(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        (**self).flush_async()
    }
}

/// A [`Destination`] over a synchronous [`std::io::Write`].
#[derive(Debug)]
pub struct Io<W>(pub W);

impl<W> Destination for Io<W>
where
    W: std::io::Write + Send,
{
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        Ok(std::io::Write::write_all(&mut self.0, bytes)?)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Error> {
        Ok(std::io::Write::flush(&mut self.0)?)
    }
}

/// A [`Destination`] over an asynchronous [`tokio::io::AsyncWrite`].
///
/// Only the asynchronous path is supported, so a [`BufferedSink`] over
/// `Async` must be written with `write_async` and closed with
/// `close_async`.
#[derive(Debug)]
pub struct Async<W>(pub W);

impl<W> Destination for Async<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn write_all(&mut self, _: &[u8]) -> Result<(), Error> {
        Err(error_sync_unsupported())
    }

    fn flush(&mut self) -> Result<(), Error> {
        Err(error_sync_unsupported())
    }

    fn write_all_async<'a>(&'a mut self, bytes: &'a [u8]) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move { Ok(self.0.write_all(bytes).await?) })
    }

    fn flush_async(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move { Ok(self.0.flush().await?) })
    }
}

/// A [`Sink`] that collects output in a reusable buffer and writes it to a
/// [`Destination`] when the buffer fills up.
///
/// A write that does not fit in the remaining space flushes the buffer
/// first, and a write larger than the whole buffer goes straight to the
/// destination. Dropping a sink that still holds output flushes it once.
///
/// # Examples
///
/// ```
/// use sluice::BufferedSink;
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut sink = BufferedSink::with_capacity(&mut output, 16);
/// sink.write("hello").unwrap();
/// assert!(sink.get_ref().is_empty());
///
/// sink.close().unwrap();
/// drop(sink);
/// assert_eq!(output, b"hello");
/// ```
#[derive(Debug)]
pub struct BufferedSink<D>
where
    D: Destination,
{
    destination: D,
    buffer: Vec<u8>,
    capacity: usize,
    /// Start of a region handed out by `reserve` and not yet committed.
    reserved: Option<usize>,
}

impl<D> BufferedSink<D>
where
    D: Destination,
{
    /// Create a new [`BufferedSink`] with a buffer of [`DEFAULT_CAPACITY`] bytes.
    #[inline]
    pub fn new(destination: D) -> Self {
        Self::with_capacity(destination, DEFAULT_CAPACITY)
    }

    /// Create a new [`BufferedSink`] with a buffer of the given size.
    ///
    /// A capacity of zero writes everything straight through.
    pub fn with_capacity(destination: D, capacity: usize) -> Self {
        Self {
            destination,
            buffer: Vec::with_capacity(capacity),
            capacity,
            reserved: None,
        }
    }

    /// Return a reference to the [`Destination`].
    #[inline]
    pub fn get_ref(&self) -> &D {
        &self.destination
    }

    /// Return the number of bytes waiting in the buffer.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Write the text.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the destination fails.
    #[inline]
    pub fn write(&mut self, text: &str) -> Result<(), Error> {
        self.write_bytes(text.as_bytes())
    }

    /// Write the part of the text in the given byte range.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the range is out of bounds, does not fall on
    /// character boundaries, or the destination fails.
    pub fn write_range(&mut self, text: &str, range: Range<usize>) -> Result<(), Error> {
        let part = text.get(range.clone()).ok_or_else(|| error_range(text, range))?;

        self.write(part)
    }

    /// Return a region of `size` bytes at the end of the buffer to be filled
    /// in by the caller, then made part of the output with [`commit`].
    ///
    /// [`commit`]: BufferedSink::commit
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if `size` is larger than the buffer, or the
    /// destination fails while making room.
    pub fn reserve(&mut self, size: usize) -> Result<&mut [u8], Error> {
        self.release();
        if size > self.capacity {
            return Err(Error::build("reservation exceeds buffer").with_help(format!(
                "`{size}` bytes were requested from a buffer of `{}` bytes",
                self.capacity
            )));
        }
        if size > self.remaining() {
            self.flush_buffer()?;
        }

        let begin = self.buffer.len();
        self.buffer.resize(begin + size, 0);
        self.reserved = Some(begin);

        Ok(&mut self.buffer[begin..])
    }

    /// Keep the first `count` bytes of the last reservation.
    pub fn commit(&mut self, count: usize) {
        if let Some(begin) = self.reserved.take() {
            let end = begin + count.min(self.buffer.len() - begin);
            self.buffer.truncate(end);
        }
    }

    /// Write the buffered output to the destination, and flush the destination.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the destination fails.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.release();
        self.flush_buffer()?;

        self.destination.flush()
    }

    /// Flush, leaving the sink empty.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the destination fails.
    #[inline]
    pub fn close(&mut self) -> Result<(), Error> {
        self.flush()
    }

    /// Write the text, suspending if the destination is not ready.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the destination fails.
    pub async fn write_async(&mut self, text: &str) -> Result<(), Error> {
        let bytes = text.as_bytes();
        self.release();
        if bytes.len() > self.remaining() {
            self.flush_buffer_async().await?;
        }
        if bytes.len() > self.capacity {
            trace!(bytes = bytes.len(), "writing through output buffer");
            return self.destination.write_all_async(bytes).await;
        }
        self.buffer.extend_from_slice(bytes);

        Ok(())
    }

    /// Write the buffered output to the destination and flush it,
    /// suspending if the destination is not ready.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the destination fails.
    pub async fn flush_async(&mut self) -> Result<(), Error> {
        self.release();
        self.flush_buffer_async().await?;

        self.destination.flush_async().await
    }

    /// Flush asynchronously, leaving the sink empty.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the destination fails.
    #[inline]
    pub async fn close_async(&mut self) -> Result<(), Error> {
        self.flush_async().await
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.release();
        if bytes.len() > self.remaining() {
            self.flush_buffer()?;
        }
        if bytes.len() > self.capacity {
            trace!(bytes = bytes.len(), "writing through output buffer");
            return self.destination.write_all(bytes);
        }
        self.buffer.extend_from_slice(bytes);

        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        trace!(bytes = self.buffer.len(), "flushing output buffer");
        self.destination.write_all(&self.buffer)?;
        self.buffer.clear();

        Ok(())
    }

    async fn flush_buffer_async(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        trace!(bytes = self.buffer.len(), "flushing output buffer");
        self.destination.write_all_async(&self.buffer).await?;
        self.buffer.clear();

        Ok(())
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.buffer.len())
    }

    /// Drop a reservation that was never committed.
    fn release(&mut self) {
        if let Some(begin) = self.reserved.take() {
            self.buffer.truncate(begin);
        }
    }
}

impl<D> Sink for BufferedSink<D>
where
    D: Destination,
{
    #[inline]
    fn write(&mut self, text: &str) -> Result<(), Error> {
        BufferedSink::write(self, text)
    }

    #[inline]
    fn write_async<'a>(&'a mut self, text: &'a str) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(BufferedSink::write_async(self, text))
    }
}

impl<D> Drop for BufferedSink<D>
where
    D: Destination,
{
    fn drop(&mut self) {
        self.release();
        if let Err(error) = self.flush_buffer() {
            warn!(
                bytes = self.buffer.len(),
                error = error.reason(),
                "failed to flush output buffer on drop"
            );
        }
    }
}

fn error_sync_unsupported() -> Error {
    Error::build("destination is asynchronous")
        .with_kind(ErrorKind::Io)
        .with_help("use `write_async`, `flush_async` or `close_async` with this destination")
}

fn error_range(text: &str, range: Range<usize>) -> Error {
    Error::build("invalid output range").with_help(format!(
        "`{}..{}` is not a valid range of a `{}` byte text",
        range.start,
        range.end,
        text.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::{Async, BufferedSink, Destination, Sink};
    use crate::log::Error;
    use pretty_assertions::assert_eq;

    /// Records every write it receives.
    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        fail: bool,
    }

    impl Destination for Recorder {
        fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
            if self.fail {
                return Err(Error::build("recorder failed"));
            }
            self.writes.push(bytes.to_vec());

            Ok(())
        }
    }

    #[test]
    fn test_small_writes_wait_for_flush() {
        let mut recorder = Recorder::default();
        let mut sink = BufferedSink::with_capacity(&mut recorder, 8);
        sink.write("ab").unwrap();
        sink.write("cd").unwrap();

        assert!(sink.get_ref().writes.is_empty());
        sink.flush().unwrap();

        assert_eq!(sink.get_ref().writes, vec![b"abcd".to_vec()]);
    }

    #[test]
    fn test_overflow_flushes_first() {
        let mut recorder = Recorder::default();
        let mut sink = BufferedSink::with_capacity(&mut recorder, 4);
        sink.write("abc").unwrap();
        sink.write("de").unwrap();

        assert_eq!(sink.get_ref().writes, vec![b"abc".to_vec()]);
        assert_eq!(sink.buffered(), 2);
    }

    #[test]
    fn test_oversized_write_through() {
        let mut recorder = Recorder::default();
        let mut sink = BufferedSink::with_capacity(&mut recorder, 4);
        sink.write("a").unwrap();
        sink.write("0123456789").unwrap();

        assert_eq!(
            sink.get_ref().writes,
            vec![b"a".to_vec(), b"0123456789".to_vec()]
        );
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_write_range() {
        let mut output: Vec<u8> = Vec::new();
        let mut sink = BufferedSink::new(&mut output);
        sink.write_range("hello, world", 7..12).unwrap();

        assert!(sink.write_range("héllo", 1..2).is_err());
        sink.close().unwrap();
        drop(sink);

        assert_eq!(output, b"world");
    }

    #[test]
    fn test_reserve_commit() {
        let mut output: Vec<u8> = Vec::new();
        let mut sink = BufferedSink::with_capacity(&mut output, 8);
        sink.write("n=").unwrap();
        let region = sink.reserve(4).unwrap();
        region[..2].copy_from_slice(b"42");
        sink.commit(2);
        sink.write("!").unwrap();

        assert!(sink.reserve(9).is_err());
        sink.close().unwrap();
        drop(sink);

        assert_eq!(output, b"n=42!");
    }

    #[test]
    fn test_drop_flushes_once() {
        let mut recorder = Recorder::default();
        {
            let mut sink = BufferedSink::with_capacity(&mut recorder, 16);
            sink.write("tail").unwrap();
        }

        assert_eq!(recorder.writes, vec![b"tail".to_vec()]);
    }

    #[test]
    fn test_drop_failure_is_swallowed() {
        let mut recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut sink = BufferedSink::with_capacity(&mut recorder, 16);
        sink.write("lost").unwrap();
        drop(sink);

        assert!(recorder.writes.is_empty());
    }

    #[test]
    fn test_string_sink() {
        let mut output = String::new();
        Sink::write(&mut output, "a").unwrap();
        Sink::write(&mut output, "b").unwrap();

        assert_eq!(output, "ab");
    }

    #[tokio::test]
    async fn test_async_destination() {
        let mut output: Vec<u8> = Vec::new();
        let mut sink = BufferedSink::with_capacity(Async(&mut output), 4);
        sink.write_async("ab").await.unwrap();
        sink.write_async("cdefgh").await.unwrap();
        sink.write_async("i").await.unwrap();

        assert!(sink.write("sync").is_err());
        sink.close_async().await.unwrap();
        drop(sink);

        assert_eq!(output, b"abcdefghi");
    }
}
