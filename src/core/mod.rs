pub mod bit_coder;
pub mod shared;
