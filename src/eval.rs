//! Encoding statistics for development and tuning. Enabled through the
//! `evaluation` feature; [`crate::encode::compress_with_stats`] fills one
//! of these per call.

use serde::Serialize;

use crate::shared::TriangleCode;

fn symbol_name(code: TriangleCode) -> &'static str {
    match code {
        TriangleCode::EdgeNew => "edge_new",
        TriangleCode::EdgeCached => "edge_cached",
        TriangleCode::EdgeFree => "edge_free",
        TriangleCode::NewNewNew => "new_new_new",
        TriangleCode::NewNewCached => "new_new_cached",
        TriangleCode::NewNewFree => "new_new_free",
        TriangleCode::NewCachedCached => "new_cached_cached",
        TriangleCode::NewCachedFree => "new_cached_free",
        TriangleCode::NewFreeCached => "new_free_cached",
        TriangleCode::NewFreeFree => "new_free_free",
        TriangleCode::CachedCachedCached => "cached_cached_cached",
        TriangleCode::CachedCachedFree => "cached_cached_free",
        TriangleCode::CachedFreeFree => "cached_free_free",
        TriangleCode::FreeFreeFree => "free_free_free",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolCount {
    pub symbol: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncodeStats {
    pub triangle_count: u64,
    pub bits_written: u64,
    /// one entry per alphabet symbol, in id order
    pub symbols: Vec<SymbolCount>,
}

impl EncodeStats {
    pub(crate) fn new(
        triangle_count: u64,
        bits_written: u64,
        counts: [u64; TriangleCode::COUNT],
    ) -> Self {
        let symbols = counts
            .iter()
            .enumerate()
            .map(|(id, &count)| SymbolCount {
                symbol: symbol_name(TriangleCode::from_id(id as u32).unwrap()),
                count,
            })
            .collect();
        Self { triangle_count, bits_written, symbols }
    }

    /// Mean payload cost per triangle, in bits.
    pub fn bits_per_triangle(&self) -> f64 {
        if self.triangle_count == 0 {
            0.0
        } else {
            self.bits_written as f64 / self.triangle_count as f64
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
