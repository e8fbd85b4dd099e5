//! Wire-level building blocks: the frame, its checksum, and the growable
//! buffer that turns a byte stream into a sequence of frames.

mod buffer;
mod checksum;
mod frame;

pub use buffer::PacketBuffer;
pub use checksum::ChecksumAccumulator;
pub use frame::{Frame, HEADER_SIZE};
