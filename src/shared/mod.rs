//! Definitions shared by the encoder and the decoder: the triangle symbol
//! alphabet, vertex classification, the wire-frozen code tables, and the
//! two history buffers.

pub(crate) mod history;
pub(crate) mod tables;

/// The fourteen triangle symbols. The discriminant is the symbol's position
/// in the triangle prefix-code table, so the order is part of the wire
/// format: the three edge-hit symbols first (they dominate on meshes with
/// any locality and carry the shortest codes), then the ten canonical
/// rotation patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TriangleCode {
    EdgeNew = 0,
    EdgeCached,
    EdgeFree,
    NewNewNew,
    NewNewCached,
    NewNewFree,
    NewCachedCached,
    NewCachedFree,
    NewFreeCached,
    NewFreeFree,
    CachedCachedCached,
    CachedCachedFree,
    CachedFreeFree,
    FreeFreeFree,
}

impl TriangleCode {
    pub const COUNT: usize = 14;

    pub fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: u32) -> Option<Self> {
        use TriangleCode::*;
        Some(match id {
            0 => EdgeNew,
            1 => EdgeCached,
            2 => EdgeFree,
            3 => NewNewNew,
            4 => NewNewCached,
            5 => NewNewFree,
            6 => NewCachedCached,
            7 => NewCachedFree,
            8 => NewFreeCached,
            9 => NewFreeFree,
            10 => CachedCachedCached,
            11 => CachedCachedFree,
            12 => CachedFreeFree,
            13 => FreeFreeFree,
            _ => return None,
        })
    }

    /// True for the three symbols that describe a shared-edge hit.
    pub fn is_edge_hit(self) -> bool {
        self.id() < 3
    }
}

/// Result of classifying one vertex of an incoming triangle against the
/// encoder state. A cached vertex carries its age in the vertex FIFO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VertexClass {
    New,
    Cached(u32),
    Free,
}

impl VertexClass {
    /// Index into the classification-to-symbol table.
    pub(crate) fn index(self) -> usize {
        match self {
            VertexClass::New => 0,
            VertexClass::Cached(_) => 1,
            VertexClass::Free => 2,
        }
    }

    /// The FIFO age of a cached vertex. Only valid on `Cached`, which the
    /// classification table guarantees wherever this is called.
    pub(crate) fn cached_age(self) -> u32 {
        match self {
            VertexClass::Cached(age) => age,
            _ => unreachable!("classification table promised a cached vertex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable() {
        for id in 0..TriangleCode::COUNT as u32 {
            let code = TriangleCode::from_id(id).unwrap();
            assert_eq!(code.id(), id as usize);
        }
        assert_eq!(TriangleCode::from_id(14), None);
    }

    #[test]
    fn edge_symbols_lead_the_alphabet() {
        assert!(TriangleCode::EdgeNew.is_edge_hit());
        assert!(TriangleCode::EdgeCached.is_edge_hit());
        assert!(TriangleCode::EdgeFree.is_edge_hit());
        assert!(!TriangleCode::NewNewNew.is_edge_hit());
        assert!(!TriangleCode::FreeFreeFree.is_edge_hit());
    }
}
