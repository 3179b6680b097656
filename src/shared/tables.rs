//! The wire-frozen code tables. Every value in this file is part of the
//! interoperability surface and must not change: the three prefix-code
//! tables are emitted bit-for-bit, and the 27-entry rotation table decides
//! which symbol and vertex order the encoder picks, which the decoder's
//! state updates silently assume.

use std::sync::OnceLock;

use super::TriangleCode;
use crate::core::bit_coder::{PrefixCode, PrefixDecodeTable};

pub(crate) const TRIANGLE_MAX_CODE_LENGTH: u32 = 7;
pub(crate) const EDGE_MAX_CODE_LENGTH: u32 = 11;
pub(crate) const VERTEX_MAX_CODE_LENGTH: u32 = 8;

const fn pc(code: u32, bit_length: u32) -> PrefixCode {
    PrefixCode { code, bit_length }
}

/// Prefix codes for the triangle symbols, indexed by `TriangleCode::id`.
pub(crate) static TRIANGLE_CODES: [PrefixCode; TriangleCode::COUNT] = [
    pc(0, 1),   // EdgeNew
    pc(3, 2),   // EdgeCached
    pc(5, 3),   // EdgeFree
    pc(49, 7),  // NewNewNew
    pc(33, 7),  // NewNewCached
    pc(81, 7),  // NewNewFree
    pc(9, 5),   // NewCachedCached
    pc(113, 7), // NewCachedFree
    pc(57, 7),  // NewFreeCached
    pc(25, 6),  // NewFreeFree
    pc(121, 7), // CachedCachedCached
    pc(17, 7),  // CachedCachedFree
    pc(1, 6),   // CachedFreeFree
    pc(97, 7),  // FreeFreeFree
];

/// Prefix codes for edge back-reference ages 0..31.
pub(crate) static EDGE_CODES: [PrefixCode; 32] = [
    pc(1, 2),
    pc(2, 2),
    pc(0, 3),
    pc(15, 4),
    pc(11, 4),
    pc(3, 4),
    pc(7, 5),
    pc(28, 5),
    pc(20, 5),
    pc(55, 6),
    pc(12, 6),
    pc(36, 6),
    pc(23, 7),
    pc(44, 7),
    pc(215, 8),
    pc(87, 8),
    pc(196, 8),
    pc(132, 8),
    pc(236, 9),
    pc(364, 9),
    pc(324, 9),
    pc(68, 9),
    pc(1004, 10),
    pc(492, 10),
    pc(108, 10),
    pc(772, 10),
    pc(516, 10),
    pc(4, 10),
    pc(1644, 11),
    pc(620, 11),
    pc(1284, 11),
    pc(260, 11),
];

/// Prefix codes for cached-vertex back-reference ages 0..31.
pub(crate) static CACHED_VERTEX_CODES: [PrefixCode; 32] = [
    pc(215, 8),
    pc(0, 1),
    pc(5, 3),
    pc(3, 4),
    pc(15, 5),
    pc(11, 5),
    pc(9, 5),
    pc(1, 5),
    pc(55, 6),
    pc(39, 6),
    pc(27, 6),
    pc(25, 6),
    pc(17, 6),
    pc(63, 7),
    pc(31, 7),
    pc(23, 7),
    pc(7, 7),
    pc(59, 7),
    pc(121, 7),
    pc(113, 7),
    pc(49, 7),
    pc(255, 8),
    pc(127, 8),
    pc(223, 8),
    pc(95, 8),
    pc(87, 8),
    pc(199, 8),
    pc(71, 8),
    pc(251, 8),
    pc(123, 8),
    pc(185, 8),
    pc(57, 8),
];

pub(crate) fn triangle_decode_table() -> &'static PrefixDecodeTable {
    static TABLE: OnceLock<PrefixDecodeTable> = OnceLock::new();
    TABLE.get_or_init(|| PrefixDecodeTable::build(&TRIANGLE_CODES, TRIANGLE_MAX_CODE_LENGTH))
}

pub(crate) fn edge_decode_table() -> &'static PrefixDecodeTable {
    static TABLE: OnceLock<PrefixDecodeTable> = OnceLock::new();
    TABLE.get_or_init(|| PrefixDecodeTable::build(&EDGE_CODES, EDGE_MAX_CODE_LENGTH))
}

pub(crate) fn vertex_decode_table() -> &'static PrefixDecodeTable {
    static TABLE: OnceLock<PrefixDecodeTable> = OnceLock::new();
    TABLE.get_or_init(|| PrefixDecodeTable::build(&CACHED_VERTEX_CODES, VERTEX_MAX_CODE_LENGTH))
}

/// Symbol and vertex rotation for one combination of vertex classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RotationCase {
    pub code: TriangleCode,
    pub order: [usize; 3],
}

const fn rot(code: TriangleCode, order: [usize; 3]) -> RotationCase {
    RotationCase { code, order }
}

use super::TriangleCode::*;

/// Maps a triple of vertex classes (indexed new = 0, cached = 1, free = 2)
/// to the symbol and the cyclic shift that brings the triangle into that
/// symbol's canonical vertex order.
pub(crate) static ROTATION_CASES: [[[RotationCase; 3]; 3]; 3] = [
    [
        // new new *
        [
            rot(NewNewNew, [0, 1, 2]),
            rot(NewNewCached, [0, 1, 2]),
            rot(NewNewFree, [0, 1, 2]),
        ],
        // new cached *
        [
            rot(NewNewCached, [2, 0, 1]),
            rot(NewCachedCached, [0, 1, 2]),
            rot(NewCachedFree, [0, 1, 2]),
        ],
        // new free *
        [
            rot(NewNewFree, [2, 0, 1]),
            rot(NewFreeCached, [0, 1, 2]),
            rot(NewFreeFree, [0, 1, 2]),
        ],
    ],
    [
        // cached new *
        [
            rot(NewNewCached, [1, 2, 0]),
            rot(NewCachedCached, [1, 2, 0]),
            rot(NewFreeCached, [1, 2, 0]),
        ],
        // cached cached *
        [
            rot(NewCachedCached, [2, 0, 1]),
            rot(CachedCachedCached, [0, 1, 2]),
            rot(CachedCachedFree, [0, 1, 2]),
        ],
        // cached free *
        [
            rot(NewCachedFree, [2, 0, 1]),
            rot(CachedCachedFree, [2, 0, 1]),
            rot(CachedFreeFree, [0, 1, 2]),
        ],
    ],
    [
        // free new *
        [
            rot(NewNewFree, [1, 2, 0]),
            rot(NewCachedFree, [1, 2, 0]),
            rot(NewFreeFree, [1, 2, 0]),
        ],
        // free cached *
        [
            rot(NewFreeCached, [2, 0, 1]),
            rot(CachedCachedFree, [1, 2, 0]),
            rot(CachedFreeFree, [1, 2, 0]),
        ],
        // free free *
        [
            rot(NewFreeFree, [2, 0, 1]),
            rot(CachedFreeFree, [2, 0, 1]),
            rot(FreeFreeFree, [0, 1, 2]),
        ],
    ],
];
