//! Mesh decoder.
//!
//! Exact mirror of the encoder: one symbol per triangle, the same FIFO and
//! counter updates in the same order, indices reproduced in emission-order
//! numbering and attributes synthesized into the caller's storage as the
//! vertices appear. Any read the encoder could not have produced surfaces
//! as a malformed- or truncated-stream error instead of bad output.

use crate::core::bit_coder::{significant_bits, ReadBitstream, ReaderErr};
use crate::core::shared::{AttributeValue, IndexValue, FIRST_NEW_K, MAX_ATTRIBUTES};
use crate::debug_expect;
use crate::shared::history::{EdgeFifo, EdgeRecord, VertexFifo};
use crate::shared::tables::{edge_decode_table, triangle_decode_table, vertex_decode_table};
use crate::shared::TriangleCode;

#[remain::sorted]
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Err {
    #[error("attribute count {0} exceeds the supported maximum of {max}", max = MAX_ATTRIBUTES)]
    AttributeCountTooLarge(usize),
    #[error("attribute output cannot hold the decoded vertices")]
    AttributeOverflow,
    #[error("stream references data outside the valid history window")]
    MalformedStream,
    #[error(transparent)]
    Stream(#[from] ReaderErr),
}

/// Decompresses `triangles_out.len()` triangles from `input`.
///
/// Indices come out in emission order. `attributes_out` receives
/// `attribute_count` values per emitted vertex, in emission order; it must
/// be large enough for every vertex the stream introduces. Consumes exactly
/// the encoder's payload including the trailing 32 bits of padding.
pub fn decompress<I: IndexValue, A: AttributeValue>(
    triangles_out: &mut [[I; 3]],
    attribute_count: usize,
    attributes_out: &mut [A],
    input: &mut ReadBitstream,
) -> Result<(), Err> {
    if attribute_count > MAX_ATTRIBUTES {
        return Err(Err::AttributeCountTooLarge(attribute_count));
    }

    let mut decoder = Decoder {
        edge_fifo: EdgeFifo::new(),
        vertex_fifo: VertexFifo::new(),
        new_vertices: 0,
        k: [4 << 16; MAX_ATTRIBUTES],
        attribute_count,
        attributes: attributes_out,
        next_attribute: 0,
    };

    debug_expect!("tri", input);

    for face in triangles_out.iter_mut() {
        let triangle = decoder.next_triangle(input)?;
        *face = [
            I::from_u32(triangle[0]),
            I::from_u32(triangle[1]),
            I::from_u32(triangle[2]),
        ];
    }

    debug_expect!("end", input);

    // padding the encoder appended after the last triangle
    input.read(32)?;

    Ok(())
}

struct Decoder<'a, A> {
    edge_fifo: EdgeFifo,
    vertex_fifo: VertexFifo,
    new_vertices: u32,
    /// per-attribute universal-code parameter, 16.16 fixed point
    k: [u32; MAX_ATTRIBUTES],
    attribute_count: usize,
    attributes: &'a mut [A],
    /// write cursor; always `new_vertices * attribute_count`
    next_attribute: usize,
}

impl<A: AttributeValue> Decoder<'_, A> {
    fn attr(&self, vertex: u32, j: usize) -> i32 {
        self.attributes[vertex as usize * self.attribute_count + j].to_i32()
    }

    /// Reads one edge back-reference and resolves it.
    fn shared_edge(&self, input: &mut ReadBitstream) -> Result<EdgeRecord, Err> {
        let age = input.decode(edge_decode_table())?;
        if age >= self.edge_fifo.window_len() {
            return Err(Err::MalformedStream);
        }
        Ok(*self.edge_fifo.at_age(age))
    }

    /// Reads one cached-vertex back-reference and resolves it.
    fn cached_vertex(&self, input: &mut ReadBitstream) -> Result<u32, Err> {
        let age = input.decode(vertex_decode_table())?;
        if age >= self.vertex_fifo.window_len() {
            return Err(Err::MalformedStream);
        }
        Ok(self.vertex_fifo.at_age(age))
    }

    /// Reads one emission-order offset and resolves it.
    fn free_vertex(&self, input: &mut ReadBitstream) -> Result<u32, Err> {
        let offset = input.read_varint()?;
        if offset >= self.new_vertices {
            return Err(Err::MalformedStream);
        }
        Ok((self.new_vertices - 1) - offset)
    }

    /// Claims attribute rows for `count` vertices about to be introduced.
    fn reserve_rows(&mut self, count: usize) -> Result<usize, Err> {
        let base = self.next_attribute;
        let end = base + count * self.attribute_count;
        if end > self.attributes.len() {
            return Err(Err::AttributeOverflow);
        }
        self.next_attribute = end;
        Ok(base)
    }

    fn next_triangle(&mut self, input: &mut ReadBitstream) -> Result<[u32; 3], Err> {
        let code = TriangleCode::from_id(input.decode(triangle_decode_table())?)
            .ok_or(Err::MalformedStream)?;

        let triangle = match code {
            TriangleCode::EdgeNew => {
                let edge = self.shared_edge(input)?;
                let t2 = self.new_vertices;
                self.vertex_fifo.push(t2);

                // only path that adapts the universal-code parameter; the
                // estimate derives from the magnitude exactly as on the
                // encoder side
                let base = self.reserve_rows(1)?;
                for j in 0..self.attribute_count {
                    let zigzag = input.decode_universal(self.k[j] >> 16)?;
                    let estimate = significant_bits(zigzag);
                    self.k[j] = (self.k[j] * 7 + (estimate << 16)) >> 3;

                    let delta = ReadBitstream::decode_zigzag(zigzag);
                    let predicted = self.attr(edge.second, j) + self.attr(edge.first, j)
                        - self.attr(edge.third, j);
                    self.attributes[base + j] = A::from_i32(predicted + delta);
                }

                self.new_vertices += 1;
                [edge.second, edge.first, t2]
            }
            TriangleCode::EdgeCached => {
                let edge = self.shared_edge(input)?;
                let t2 = self.cached_vertex(input)?;
                [edge.second, edge.first, t2]
            }
            TriangleCode::EdgeFree => {
                let edge = self.shared_edge(input)?;
                let t2 = self.free_vertex(input)?;
                self.vertex_fifo.push(t2);
                [edge.second, edge.first, t2]
            }
            TriangleCode::NewNewNew => {
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t0 + 1);
                self.vertex_fifo.push(t0 + 2);

                let base = self.reserve_rows(3)?;
                let columns = self.attribute_count;
                for j in 0..columns {
                    let v0 = input.decode_universal_zigzag(FIRST_NEW_K)?;
                    self.attributes[base + j] = A::from_i32(v0);
                    let d1 = input.decode_universal_zigzag(self.k[j] >> 16)?;
                    self.attributes[base + columns + j] = A::from_i32(v0 + d1);
                    let d2 = input.decode_universal_zigzag(self.k[j] >> 16)?;
                    self.attributes[base + 2 * columns + j] = A::from_i32(v0 + d2);
                }

                self.new_vertices += 3;
                [t0, t0 + 1, t0 + 2]
            }
            TriangleCode::NewNewCached => {
                let t2 = self.cached_vertex(input)?;
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t0 + 1);

                self.read_rows_relative_to(t2, 2, input)?;
                self.new_vertices += 2;
                [t0, t0 + 1, t2]
            }
            TriangleCode::NewNewFree => {
                let t2 = self.free_vertex(input)?;
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t0 + 1);
                self.vertex_fifo.push(t2);

                self.read_rows_relative_to(t2, 2, input)?;
                self.new_vertices += 2;
                [t0, t0 + 1, t2]
            }
            TriangleCode::NewCachedCached => {
                let t1 = self.cached_vertex(input)?;
                let t2 = self.cached_vertex(input)?;
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);

                self.read_rows_relative_to(t1, 1, input)?;
                self.new_vertices += 1;
                [t0, t1, t2]
            }
            TriangleCode::NewCachedFree => {
                let t1 = self.cached_vertex(input)?;
                let t2 = self.free_vertex(input)?;
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t2);

                self.read_rows_relative_to(t1, 1, input)?;
                self.new_vertices += 1;
                [t0, t1, t2]
            }
            TriangleCode::NewFreeCached => {
                let t1 = self.free_vertex(input)?;
                let t2 = self.cached_vertex(input)?;
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);

                self.read_rows_relative_to(t2, 1, input)?;
                self.new_vertices += 1;
                [t0, t1, t2]
            }
            TriangleCode::NewFreeFree => {
                let t1 = self.free_vertex(input)?;
                let t2 = self.free_vertex(input)?;
                let t0 = self.new_vertices;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);

                self.read_rows_relative_to(t1, 1, input)?;
                self.new_vertices += 1;
                [t0, t1, t2]
            }
            TriangleCode::CachedCachedCached => {
                let t0 = self.cached_vertex(input)?;
                let t1 = self.cached_vertex(input)?;
                let t2 = self.cached_vertex(input)?;
                [t0, t1, t2]
            }
            TriangleCode::CachedCachedFree => {
                let t0 = self.cached_vertex(input)?;
                let t1 = self.cached_vertex(input)?;
                let t2 = self.free_vertex(input)?;
                self.vertex_fifo.push(t2);
                [t0, t1, t2]
            }
            TriangleCode::CachedFreeFree => {
                let t0 = self.cached_vertex(input)?;
                let t1 = self.free_vertex(input)?;
                let t2 = self.free_vertex(input)?;
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                [t0, t1, t2]
            }
            TriangleCode::FreeFreeFree => {
                let t0 = self.free_vertex(input)?;
                let t1 = self.free_vertex(input)?;
                let t2 = self.free_vertex(input)?;
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                [t0, t1, t2]
            }
        };

        // close this triangle to exactly three fresh edge records; edge-hit
        // symbols contribute only the two below, everything else leads with
        // its own canonical record
        if !code.is_edge_hit() {
            self.edge_fifo.push(triangle[0], triangle[1], triangle[2]);
        }
        self.edge_fifo.push(triangle[1], triangle[2], triangle[0]);
        self.edge_fifo.push(triangle[2], triangle[0], triangle[1]);

        Ok(triangle)
    }

    /// Reads attribute rows for new vertices encoded as deltas to the row
    /// of `reference`, interleaved per attribute column.
    fn read_rows_relative_to(
        &mut self,
        reference: u32,
        count: usize,
        input: &mut ReadBitstream,
    ) -> Result<(), Err> {
        let base = self.reserve_rows(count)?;
        let columns = self.attribute_count;
        for j in 0..columns {
            let reference_value = self.attr(reference, j);
            for row in 0..count {
                let delta = input.decode_universal_zigzag(self.k[j] >> 16)?;
                self.attributes[base + row * columns + j] = A::from_i32(reference_value + delta);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bit_coder::WriteBitstream;
    use crate::shared::tables::{CACHED_VERTEX_CODES, EDGE_CODES, TRIANGLE_CODES};

    #[test]
    fn empty_input_is_truncated() {
        let mut input = ReadBitstream::new(&[]);
        let mut triangles = [[0u16; 3]; 1];
        let result = decompress::<u16, i16>(&mut triangles, 0, &mut [], &mut input);
        assert_eq!(result, Err(super::Err::Stream(ReaderErr::NotEnoughData)));
    }

    #[test]
    fn edge_reference_into_empty_history_is_malformed() {
        // EdgeCached as the very first symbol has no edge to refer to
        let mut writer = WriteBitstream::new();
        writer.write_prefix_code(TriangleCode::EdgeCached.id() as u32, &TRIANGLE_CODES);
        writer.write_prefix_code(0, &EDGE_CODES);
        writer.write_prefix_code(0, &CACHED_VERTEX_CODES);
        writer.write(0, 32);
        writer.finish();

        let mut input = ReadBitstream::new(writer.as_bytes());
        let mut triangles = [[0u32; 3]; 1];
        let result = decompress::<u32, i32>(&mut triangles, 0, &mut [], &mut input);
        assert_eq!(result, Err(super::Err::MalformedStream));
    }

    #[test]
    fn free_offset_beyond_emission_count_is_malformed() {
        let mut writer = WriteBitstream::new();
        writer.write_prefix_code(TriangleCode::FreeFreeFree.id() as u32, &TRIANGLE_CODES);
        writer.write_varint(0);
        writer.write_varint(0);
        writer.write_varint(0);
        writer.write(0, 32);
        writer.finish();

        let mut input = ReadBitstream::new(writer.as_bytes());
        let mut triangles = [[0u32; 3]; 1];
        let result = decompress::<u32, i32>(&mut triangles, 0, &mut [], &mut input);
        assert_eq!(result, Err(super::Err::MalformedStream));
    }

    #[test]
    fn short_attribute_output_is_reported() {
        let triangles_in = [[0u16, 1, 2]];
        let mut remap = [0u32; 3];
        let attributes: [i16; 3] = [1, 2, 3];
        let mut writer = WriteBitstream::new();
        crate::encode::compress(&triangles_in, &mut remap, 1, &attributes, &mut writer).unwrap();
        writer.finish();

        let mut input = ReadBitstream::new(writer.as_bytes());
        let mut triangles = [[0u16; 3]; 1];
        let mut attributes_out = [0i16; 2];
        let result = decompress(&mut triangles, 1, &mut attributes_out, &mut input);
        assert_eq!(result, Err(super::Err::AttributeOverflow));
    }
}
