//! `put_*`/`get_*` operation pairs for every scalar and composite kind.
//!
//! Failure contract: `put_str` validates before anything is written, but a
//! transport failure mid-operation can leave a partial encoding of the
//! current field on the wire, and earlier sibling fields may already have
//! been flushed. A failed `get_*` leaves consumed bytes consumed. Either
//! way the frame is dead and the caller must close the connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::utf8;
use crate::error::WireError;

/// Maximum encoded length of a varuint over the 64-bit domain.
pub const MAX_VARUINT_LEN: usize = 10;

type Result<T> = std::result::Result<T, WireError>;

/// Write side of the codec, bound to one connection for one response.
///
/// The sink is owned exclusively; writers are created per connection and
/// discarded with it, never pooled.
pub struct WireWriter<W> {
    sink: W,
}

impl<W: AsyncWrite + Unpin> WireWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Transfer all of `buf` or fail. Short writes are retried by the
    /// underlying `write_all`; a closed peer surfaces as `WriteFailed`.
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.sink.write_all(buf).await.map_err(WireError::WriteFailed)
    }

    /// Encode a varuint: 7 payload bits per byte, little-endian group
    /// order, high bit set on every byte but the last.
    pub async fn put_uint(&mut self, mut x: u64) -> Result<()> {
        let mut buf = [0u8; MAX_VARUINT_LEN];
        let mut i = 0;

        while x >= 0x80 {
            buf[i] = x as u8 | 0x80;
            x >>= 7;
            i += 1;
        }
        buf[i] = x as u8;

        self.write_all(&buf[..=i]).await
    }

    /// Encode a varint via the zig-zag mapping: `n >= 0` maps to `2n`,
    /// `n < 0` maps to `!(2n)`.
    pub async fn put_int(&mut self, x: i64) -> Result<()> {
        let mut ux = (x as u64) << 1;
        if x < 0 {
            ux = !ux;
        }
        self.put_uint(ux).await
    }

    pub async fn put_u8(&mut self, x: u8) -> Result<()> {
        self.write_all(&[x]).await
    }

    pub async fn put_u16(&mut self, x: u16) -> Result<()> {
        self.write_all(&x.to_le_bytes()).await
    }

    pub async fn put_u32(&mut self, x: u32) -> Result<()> {
        self.write_all(&x.to_le_bytes()).await
    }

    pub async fn put_u64(&mut self, x: u64) -> Result<()> {
        self.write_all(&x.to_le_bytes()).await
    }

    pub async fn put_i8(&mut self, x: i8) -> Result<()> {
        self.put_u8(x as u8).await
    }

    pub async fn put_i16(&mut self, x: i16) -> Result<()> {
        self.put_u16(x as u16).await
    }

    pub async fn put_i32(&mut self, x: i32) -> Result<()> {
        self.put_u32(x as u32).await
    }

    pub async fn put_i64(&mut self, x: i64) -> Result<()> {
        self.put_u64(x as u64).await
    }

    /// Floats travel as their raw bit pattern, no varint wrapping.
    pub async fn put_f32(&mut self, x: f32) -> Result<()> {
        self.put_u32(x.to_bits()).await
    }

    pub async fn put_f64(&mut self, x: f64) -> Result<()> {
        self.put_u64(x.to_bits()).await
    }

    pub async fn put_bool(&mut self, x: bool) -> Result<()> {
        self.put_u8(x as u8).await
    }

    /// Raw bytes with no length prefix.
    pub async fn put_fixed(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes).await
    }

    /// Sized byte string: varuint length, then the raw bytes.
    pub async fn put_data(&mut self, bytes: &[u8]) -> Result<()> {
        self.put_uint(bytes.len() as u64).await?;
        self.put_fixed(bytes).await
    }

    /// Sized string with UTF-8 validation. Invalid content fails with
    /// `InvalidUtf8` before anything is written.
    pub async fn put_str(&mut self, bytes: &[u8]) -> Result<()> {
        if !utf8::validate_chunked(bytes) {
            return Err(WireError::InvalidUtf8);
        }
        self.put_data(bytes).await
    }
}

/// Read side of the codec, bound to one connection for one request.
pub struct WireReader<R> {
    source: R,
}

impl<R: AsyncRead + Unpin> WireReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Fill `buf` exactly or fail. Short reads are retried to completion;
    /// EOF before the requested length surfaces as `ReadFailed`.
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.source
            .read_exact(buf)
            .await
            .map(drop)
            .map_err(WireError::ReadFailed)
    }

    /// Decode a varuint. Stops at the first byte with the high bit clear;
    /// accumulation stops after ten bytes regardless.
    pub async fn get_uint(&mut self) -> Result<u64> {
        let mut shift = 0u32;
        let mut result = 0u64;

        for _ in 0..MAX_VARUINT_LEN {
            let b = self.get_u8().await?;
            if b < 0x80 {
                result |= (b as u64) << shift;
                return Ok(result);
            }
            result |= ((b & 0x7f) as u64) << shift;
            shift += 7;
        }

        Ok(result)
    }

    /// Decode a varint, reversing the zig-zag mapping.
    pub async fn get_int(&mut self) -> Result<i64> {
        let ux = self.get_uint().await?;
        let mut x = (ux >> 1) as i64;
        if ux & 1 != 0 {
            x = !x;
        }
        Ok(x)
    }

    pub async fn get_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    pub async fn get_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf).await?;
        Ok(u16::from_le_bytes(buf))
    }

    pub async fn get_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        Ok(u32::from_le_bytes(buf))
    }

    pub async fn get_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf).await?;
        Ok(u64::from_le_bytes(buf))
    }

    pub async fn get_i8(&mut self) -> Result<i8> {
        Ok(self.get_u8().await? as i8)
    }

    pub async fn get_i16(&mut self) -> Result<i16> {
        Ok(self.get_u16().await? as i16)
    }

    pub async fn get_i32(&mut self) -> Result<i32> {
        Ok(self.get_u32().await? as i32)
    }

    pub async fn get_i64(&mut self) -> Result<i64> {
        Ok(self.get_u64().await? as i64)
    }

    pub async fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_u32().await?))
    }

    pub async fn get_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.get_u64().await?))
    }

    pub async fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8().await? != 0)
    }

    /// Raw bytes with no length prefix, filling `dst` exactly.
    pub async fn get_fixed(&mut self, dst: &mut [u8]) -> Result<()> {
        self.read_exact(dst).await
    }

    /// Decode a sized byte string into a bounded destination.
    ///
    /// The varuint length prefix is always consumed first; if it exceeds
    /// `capacity` the call fails with `BufferTooSmall` before any body
    /// bytes are read.
    pub async fn get_data(&mut self, capacity: usize) -> Result<Vec<u8>> {
        let len = self.get_uint().await?;
        if len > capacity as u64 {
            return Err(WireError::BufferTooSmall {
                encoded: len,
                capacity: capacity as u64,
            });
        }

        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Decode a sized string and validate it as UTF-8.
    pub async fn get_str(&mut self, capacity: usize) -> Result<String> {
        let buf = self.get_data(capacity).await?;
        if !utf8::validate_chunked(&buf) {
            return Err(WireError::InvalidUtf8);
        }
        String::from_utf8(buf).map_err(|_| WireError::InvalidUtf8)
    }
}
