// lib.rs

/// Contains the bit-stream primitives and the shared value traits.
pub mod core;

/// Contains the wire-frozen code tables, the symbol alphabet, and the
/// history buffers shared by the encoder and the decoder.
pub mod shared;

/// Defines the mesh encoder.
pub mod encode;

/// Defines the mesh decoder.
pub mod decode;

/// Contains the macros used by the encoder and the decoder.
pub(crate) mod utils;

/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::core::bit_coder::{ReadBitstream, ReaderErr, WriteBitstream};
    pub use crate::core::shared::{AttributeValue, IndexValue, UNMAPPED};
    pub use crate::decode::{self, decompress};
    pub use crate::encode::{self, compress};
}

/// Evaluation module with the encoding statistics. When enabled, the
/// encoder can report how often each triangle symbol was emitted and how
/// large the payload came out, which is most often used in the development
/// and testing phase.
#[cfg(feature = "evaluation")]
pub mod eval;
