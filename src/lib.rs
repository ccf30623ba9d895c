//! A bounded, in-process (optionally shared-memory) multi-producer/
//! multi-consumer packet ring buffer.
//!
//! Producers [`Packet::open`] a write handle, optionally [`Packet::setsize`]
//! to freeze the payload length, stream bytes in with [`Packet::write`] /
//! [`Packet::seek`] / [`Packet::dma`], and [`Packet::close`] to commit.
//! Consumers mirror this on the read side, claiming packets in FIFO order
//! regardless of the order producers happen to commit in.
//!
//! ```
//! use psbuf::{BufferAttributes, BufferFlags, Direction, PacketBuffer};
//!
//! let mut attrs = BufferAttributes::new();
//! attrs.set_size(4096).unwrap();
//! attrs.set_flags(BufferFlags::empty()).unwrap();
//! let buffer = PacketBuffer::init(&attrs).unwrap();
//!
//! let mut producer = psbuf::Packet::open(&buffer, Direction::Write, false).unwrap();
//! producer.setsize(5).unwrap();
//! producer.write(b"hello").unwrap();
//! producer.close().unwrap();
//!
//! let mut consumer = psbuf::Packet::open(&buffer, Direction::Read, false).unwrap();
//! let mut got = [0u8; 5];
//! consumer.read(&mut got).unwrap();
//! assert_eq!(&got, b"hello");
//! consumer.close().unwrap();
//! ```

mod arena;
mod attributes;
mod buffer;
mod dma;
mod error;
mod flags;
mod packet;
mod position;
mod semaphore;
mod state;
mod stats;

pub use attributes::{BufferAttributes, ShmId};
pub use buffer::PacketBuffer;
pub use error::{PsError, PsResult};
pub use flags::BufferFlags;
pub use packet::{Direction, Packet};
pub use stats::Stats;
