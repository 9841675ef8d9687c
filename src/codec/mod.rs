//! Binary wire codec.
//!
//! A compact, self-describing encoding for primitive values, sized byte
//! strings, and UTF-8 validated text:
//!
//! - [`WireWriter`] - `put_*` operations against any async byte sink
//! - [`WireReader`] - `get_*` operations against any async byte source
//! - [`utf8`] - the streaming chunked validator backing `put_str`/`get_str`
//!
//! # Design
//!
//! The codec is written once against `AsyncWrite`/`AsyncRead` so adapters
//! are swappable: a Unix socket half in production, a `Vec<u8>` or byte
//! slice in tests. Integers use base-128 little-endian varints (zig-zag for
//! signed), fixed-width scalars are little-endian, floats travel as their
//! raw bit pattern through the unsigned fixed-width path, and byte strings
//! are a varuint length followed by the raw bytes.
//!
//! # Example
//!
//! ```
//! use gitwire::codec::{WireReader, WireWriter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut writer = WireWriter::new(Vec::new());
//! writer.put_uint(300).await.unwrap();
//! writer.put_data(b"main").await.unwrap();
//!
//! let buf = writer.into_inner();
//! let mut reader = WireReader::new(&buf[..]);
//! assert_eq!(reader.get_uint().await.unwrap(), 300);
//! assert_eq!(reader.get_data(64).await.unwrap(), b"main");
//! # }
//! ```

pub mod utf8;
mod wire;

pub use wire::{WireReader, WireWriter, MAX_VARUINT_LEN};
