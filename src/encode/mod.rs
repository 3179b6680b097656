//! Mesh encoder.
//!
//! One forward pass over the triangle list. Each triangle is first probed
//! against the edge history; on a hit only the third vertex needs
//! describing, and a first-seen third vertex gets its attributes
//! parallelogram-predicted from the shared edge. Without a hit the three
//! vertices are classified, the triangle is rotated into the canonical
//! order of the matching symbol, and the payload follows that symbol's
//! fixed shape. The decoder replays the identical FIFO and counter updates,
//! so the statement order around every write here is part of the format.

use crate::core::bit_coder::WriteBitstream;
use crate::core::shared::{AttributeValue, IndexValue, FIRST_NEW_K, MAX_ATTRIBUTES, UNMAPPED};
use crate::debug_write;
use crate::shared::history::{EdgeFifo, VertexFifo};
use crate::shared::tables::{CACHED_VERTEX_CODES, EDGE_CODES, ROTATION_CASES, TRIANGLE_CODES};
use crate::shared::{TriangleCode, VertexClass};

#[remain::sorted]
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Err {
    #[error("attribute count {0} exceeds the supported maximum of {max}", max = MAX_ATTRIBUTES)]
    AttributeCountTooLarge(usize),
    #[error("attribute slice holds {got} values, expected {expected}")]
    AttributeLengthMismatch { expected: usize, got: usize },
    #[error("triangle {0} repeats a vertex")]
    DegenerateTriangle(usize),
    #[error("triangle {0} references a vertex beyond the remap table")]
    IndexOutOfRange(usize),
    #[error("vertex count {0} exceeds the index space")]
    TooManyVertices(usize),
}

/// Compresses a triangle list and its per-vertex attributes into `output`.
///
/// `vertex_remap.len()` is the vertex count. On return it maps every
/// referenced original vertex index to its emission-order index and every
/// unreferenced one to [`UNMAPPED`]; the decoder reproduces indices and
/// attributes in emission order. `attributes` is row-major with
/// `attribute_count` values per vertex. For 16-bit attributes magnitudes up
/// to 2^14 compress best, for 32-bit up to 2^29.
///
/// The stream is not finalized; call [`WriteBitstream::finish`] once all
/// payloads are written.
pub fn compress<I: IndexValue, A: AttributeValue>(
    triangles: &[[I; 3]],
    vertex_remap: &mut [u32],
    attribute_count: usize,
    attributes: &[A],
    output: &mut WriteBitstream,
) -> Result<(), Err> {
    compress_impl(triangles, vertex_remap, attribute_count, attributes, output).map(|_| ())
}

/// Same as [`compress`], additionally reporting per-symbol statistics.
#[cfg(feature = "evaluation")]
pub fn compress_with_stats<I: IndexValue, A: AttributeValue>(
    triangles: &[[I; 3]],
    vertex_remap: &mut [u32],
    attribute_count: usize,
    attributes: &[A],
    output: &mut WriteBitstream,
) -> Result<crate::eval::EncodeStats, Err> {
    let bits_before = output.bit_size();
    let symbol_counts =
        compress_impl(triangles, vertex_remap, attribute_count, attributes, output)?;
    Ok(crate::eval::EncodeStats::new(
        triangles.len() as u64,
        (output.bit_size() - bits_before) as u64,
        symbol_counts,
    ))
}

fn compress_impl<I: IndexValue, A: AttributeValue>(
    triangles: &[[I; 3]],
    vertex_remap: &mut [u32],
    attribute_count: usize,
    attributes: &[A],
    output: &mut WriteBitstream,
) -> Result<[u64; TriangleCode::COUNT], Err> {
    let vertex_count = vertex_remap.len();
    if vertex_count >= u32::MAX as usize {
        return Err(Err::TooManyVertices(vertex_count));
    }
    if attribute_count > MAX_ATTRIBUTES {
        return Err(Err::AttributeCountTooLarge(attribute_count));
    }
    let expected = vertex_count * attribute_count;
    if attributes.len() != expected {
        return Err(Err::AttributeLengthMismatch { expected, got: attributes.len() });
    }

    vertex_remap.fill(UNMAPPED);

    let mut encoder = Encoder {
        edge_fifo: EdgeFifo::new(),
        vertex_fifo: VertexFifo::new(),
        new_vertices: 0,
        k: [4 << 16; MAX_ATTRIBUTES],
        attribute_count,
        attributes,
        remap: vertex_remap,
        symbol_counts: [0; TriangleCode::COUNT],
    };

    debug_write!("tri", output);

    for (index, face) in triangles.iter().enumerate() {
        let triangle = [face[0].to_u32(), face[1].to_u32(), face[2].to_u32()];
        if triangle[0] == triangle[1] || triangle[1] == triangle[2] || triangle[2] == triangle[0]
        {
            return Err(Err::DegenerateTriangle(index));
        }
        if triangle.iter().any(|&v| v as usize >= vertex_count) {
            return Err(Err::IndexOutOfRange(index));
        }

        if let Some((age, spare)) = encoder.edge_fifo.probe(&triangle) {
            encoder.put_edge_hit(triangle, age, spare, output);
        } else {
            encoder.put_rotation(triangle, output);
        }
    }

    debug_write!("end", output);

    // padding, so the decoder may refill a full bit buffer on its last code
    output.write(0, 32);

    Ok(encoder.symbol_counts)
}

struct Encoder<'a, A> {
    edge_fifo: EdgeFifo,
    vertex_fifo: VertexFifo,
    new_vertices: u32,
    /// per-attribute universal-code parameter, 16.16 fixed point
    k: [u32; MAX_ATTRIBUTES],
    attribute_count: usize,
    attributes: &'a [A],
    remap: &'a mut [u32],
    symbol_counts: [u64; TriangleCode::COUNT],
}

impl<A: AttributeValue> Encoder<'_, A> {
    fn attr(&self, vertex: u32, j: usize) -> i32 {
        self.attributes[vertex as usize * self.attribute_count + j].to_i32()
    }

    fn classify(&self, vertex: u32) -> VertexClass {
        if self.remap[vertex as usize] == UNMAPPED {
            VertexClass::New
        } else if let Some(age) = self.vertex_fifo.find(vertex) {
            VertexClass::Cached(age)
        } else {
            VertexClass::Free
        }
    }

    fn put_symbol(&mut self, code: TriangleCode, output: &mut WriteBitstream) {
        self.symbol_counts[code.id()] += 1;
        output.write_prefix_code(code.id() as u32, &TRIANGLE_CODES);
    }

    /// Emission-order offset of an already-mapped vertex, as it goes on the
    /// wire: distance back from the most recently introduced vertex.
    fn free_offset(&self, vertex: u32) -> u32 {
        (self.new_vertices - 1) - self.remap[vertex as usize]
    }

    /// The triangle shares `edge_age`'s edge with an earlier triangle;
    /// `spare` is the position of the vertex not on that edge.
    fn put_edge_hit(
        &mut self,
        triangle: [u32; 3],
        edge_age: u32,
        spare: usize,
        output: &mut WriteBitstream,
    ) {
        let spare_vertex = triangle[spare];

        match self.classify(spare_vertex) {
            VertexClass::New => {
                self.put_symbol(TriangleCode::EdgeNew, output);
                output.write_prefix_code(edge_age, &EDGE_CODES);

                let edge = *self.edge_fifo.at_age(edge_age);
                self.vertex_fifo.push(spare_vertex);
                self.remap[spare_vertex as usize] = self.new_vertices;
                self.new_vertices += 1;

                // the new vertex completes a parallelogram over the shared
                // edge; only the residual goes out, and only this path
                // feeds the parameter adaptation
                for j in 0..self.attribute_count {
                    let predicted =
                        self.attr(edge.second, j) + self.attr(edge.first, j)
                            - self.attr(edge.third, j);
                    let delta = self.attr(spare_vertex, j) - predicted;
                    let estimate = output.write_universal_zigzag(delta, self.k[j] >> 16);
                    self.k[j] = (self.k[j] * 7 + (estimate << 16)) >> 3;
                }
            }
            VertexClass::Cached(age) => {
                self.put_symbol(TriangleCode::EdgeCached, output);
                output.write_prefix_code(edge_age, &EDGE_CODES);
                output.write_prefix_code(age, &CACHED_VERTEX_CODES);
            }
            VertexClass::Free => {
                self.put_symbol(TriangleCode::EdgeFree, output);
                output.write_prefix_code(edge_age, &EDGE_CODES);
                self.vertex_fifo.push(spare_vertex);
                output.write_varint(self.free_offset(spare_vertex));
            }
        }

        // the remaining two edges enter the history as if the shared edge
        // led the triangle, which is the order the decoder reconstructs
        let [i0, i1, i2] = triangle;
        match spare {
            0 => {
                self.edge_fifo.push(i2, i0, i1);
                self.edge_fifo.push(i0, i1, i2);
            }
            1 => {
                self.edge_fifo.push(i0, i1, i2);
                self.edge_fifo.push(i1, i2, i0);
            }
            _ => {
                self.edge_fifo.push(i1, i2, i0);
                self.edge_fifo.push(i2, i0, i1);
            }
        }
    }

    /// No shared edge: classify all three vertices and rotate the triangle
    /// into the canonical order of the matching symbol.
    fn put_rotation(&mut self, triangle: [u32; 3], output: &mut WriteBitstream) {
        let classes = [
            self.classify(triangle[0]),
            self.classify(triangle[1]),
            self.classify(triangle[2]),
        ];
        let case = &ROTATION_CASES[classes[0].index()][classes[1].index()][classes[2].index()];
        let order = case.order;
        let rotated = [triangle[order[0]], triangle[order[1]], triangle[order[2]]];
        let [t0, t1, t2] = rotated;

        self.put_symbol(case.code, output);

        match case.code {
            TriangleCode::NewNewNew => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                self.remap[t0 as usize] = self.new_vertices;
                self.remap[t1 as usize] = self.new_vertices + 1;
                self.remap[t2 as usize] = self.new_vertices + 2;

                // first vertex absolute, the other two as deltas to it,
                // interleaved per attribute column
                for j in 0..self.attribute_count {
                    let v0 = self.attr(t0, j);
                    output.write_universal_zigzag(v0, FIRST_NEW_K);
                    output.write_universal_zigzag(self.attr(t1, j) - v0, self.k[j] >> 16);
                    output.write_universal_zigzag(self.attr(t2, j) - v0, self.k[j] >> 16);
                }

                self.new_vertices += 3;
            }
            TriangleCode::NewNewCached => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                output.write_prefix_code(classes[order[2]].cached_age(), &CACHED_VERTEX_CODES);
                self.remap[t0 as usize] = self.new_vertices;
                self.remap[t1 as usize] = self.new_vertices + 1;

                self.put_deltas_to(t2, &[t0, t1], output);
                self.new_vertices += 2;
            }
            TriangleCode::NewNewFree => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                output.write_varint(self.free_offset(t2));
                self.remap[t0 as usize] = self.new_vertices;
                self.remap[t1 as usize] = self.new_vertices + 1;

                self.put_deltas_to(t2, &[t0, t1], output);
                self.new_vertices += 2;
            }
            TriangleCode::NewCachedCached => {
                self.vertex_fifo.push(t0);
                output.write_prefix_code(classes[order[1]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_prefix_code(classes[order[2]].cached_age(), &CACHED_VERTEX_CODES);
                self.remap[t0 as usize] = self.new_vertices;

                self.put_deltas_to(t1, &[t0], output);
                self.new_vertices += 1;
            }
            TriangleCode::NewCachedFree => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t2);
                output.write_prefix_code(classes[order[1]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_varint(self.free_offset(t2));
                self.remap[t0 as usize] = self.new_vertices;

                self.put_deltas_to(t1, &[t0], output);
                self.new_vertices += 1;
            }
            TriangleCode::NewFreeCached => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                output.write_varint(self.free_offset(t1));
                output.write_prefix_code(classes[order[2]].cached_age(), &CACHED_VERTEX_CODES);
                self.remap[t0 as usize] = self.new_vertices;

                self.put_deltas_to(t2, &[t0], output);
                self.new_vertices += 1;
            }
            TriangleCode::NewFreeFree => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                output.write_varint(self.free_offset(t1));
                output.write_varint(self.free_offset(t2));
                self.remap[t0 as usize] = self.new_vertices;

                self.put_deltas_to(t1, &[t0], output);
                self.new_vertices += 1;
            }
            TriangleCode::CachedCachedCached => {
                output.write_prefix_code(classes[order[0]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_prefix_code(classes[order[1]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_prefix_code(classes[order[2]].cached_age(), &CACHED_VERTEX_CODES);
            }
            TriangleCode::CachedCachedFree => {
                self.vertex_fifo.push(t2);
                output.write_prefix_code(classes[order[0]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_prefix_code(classes[order[1]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_varint(self.free_offset(t2));
            }
            TriangleCode::CachedFreeFree => {
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                output.write_prefix_code(classes[order[0]].cached_age(), &CACHED_VERTEX_CODES);
                output.write_varint(self.free_offset(t1));
                output.write_varint(self.free_offset(t2));
            }
            TriangleCode::FreeFreeFree => {
                self.vertex_fifo.push(t0);
                self.vertex_fifo.push(t1);
                self.vertex_fifo.push(t2);
                output.write_varint(self.free_offset(t0));
                output.write_varint(self.free_offset(t1));
                output.write_varint(self.free_offset(t2));
            }
            TriangleCode::EdgeNew | TriangleCode::EdgeCached | TriangleCode::EdgeFree => {
                unreachable!("edge symbols never come from the rotation table")
            }
        }

        self.edge_fifo.push(t0, t1, t2);
        self.edge_fifo.push(t1, t2, t0);
        self.edge_fifo.push(t2, t0, t1);
    }

    /// Writes each target vertex's attributes as deltas to `reference`,
    /// interleaved per attribute column. No parameter adaptation here.
    fn put_deltas_to(&self, reference: u32, targets: &[u32], output: &mut WriteBitstream) {
        for j in 0..self.attribute_count {
            let base = self.attr(reference, j);
            for &vertex in targets {
                output.write_universal_zigzag(self.attr(vertex, j) - base, self.k[j] >> 16);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bit_coder::ReadBitstream;
    use crate::shared::tables::{edge_decode_table, triangle_decode_table, vertex_decode_table};

    fn symbol(reader: &mut ReadBitstream) -> TriangleCode {
        TriangleCode::from_id(reader.decode(triangle_decode_table()).unwrap()).unwrap()
    }

    #[test]
    fn single_triangle_is_three_new_vertices() {
        let triangles = [[0u16, 1, 2]];
        let mut remap = [0u32; 3];
        let attributes: [i32; 3] = [10, 20, 30];
        let mut output = WriteBitstream::new();
        compress(&triangles, &mut remap, 1, &attributes, &mut output).unwrap();
        output.finish();

        assert_eq!(remap, [0, 1, 2]);

        let mut reader = ReadBitstream::new(output.as_bytes());
        assert_eq!(symbol(&mut reader), TriangleCode::NewNewNew);
        // first vertex absolute at the fixed parameter, the others as
        // deltas to it at the primed parameter of 4
        assert_eq!(reader.decode_universal_zigzag(FIRST_NEW_K).unwrap(), 10);
        assert_eq!(reader.decode_universal_zigzag(4).unwrap(), 10);
        assert_eq!(reader.decode_universal_zigzag(4).unwrap(), 20);
        assert_eq!(reader.read(32).unwrap(), 0);
    }

    #[test]
    fn strip_neighbor_hits_the_shared_edge() {
        // (0,1,2) then (2,1,3): the second triangle walks edge 1->2 the
        // other way around and its spare vertex is first-seen
        let triangles = [[0u16, 1, 2], [2, 1, 3]];
        let mut remap = [0u32; 4];
        let attributes: [i32; 4] = [0, 1, 2, 3];
        let mut output = WriteBitstream::new();
        compress(&triangles, &mut remap, 1, &attributes, &mut output).unwrap();
        output.finish();

        let mut reader = ReadBitstream::new(output.as_bytes());
        assert_eq!(symbol(&mut reader), TriangleCode::NewNewNew);
        reader.decode_universal_zigzag(FIRST_NEW_K).unwrap();
        reader.decode_universal_zigzag(4).unwrap();
        reader.decode_universal_zigzag(4).unwrap();

        assert_eq!(symbol(&mut reader), TriangleCode::EdgeNew);
        // record (1,2,0) went in second of the first triangle's three edges
        assert_eq!(reader.decode(edge_decode_table()).unwrap(), 1);
        // parallelogram: 1 + 2 - 0 predicts 3 exactly
        assert_eq!(reader.decode_universal_zigzag(4).unwrap(), 0);
        assert_eq!(reader.read(32).unwrap(), 0);
    }

    #[test]
    fn repeated_triangle_is_all_cached() {
        // same winding twice: the directed edges match forward, not
        // reversed, so the second triangle classifies instead of edge-hitting
        let triangles = [[0u32, 1, 2], [0, 1, 2]];
        let mut remap = [0u32; 3];
        let mut output = WriteBitstream::new();
        compress::<u32, i32>(&triangles, &mut remap, 0, &[], &mut output).unwrap();
        output.finish();

        let mut reader = ReadBitstream::new(output.as_bytes());
        assert_eq!(symbol(&mut reader), TriangleCode::NewNewNew);
        assert_eq!(symbol(&mut reader), TriangleCode::CachedCachedCached);
        assert_eq!(reader.decode(vertex_decode_table()).unwrap(), 2);
        assert_eq!(reader.decode(vertex_decode_table()).unwrap(), 1);
        assert_eq!(reader.decode(vertex_decode_table()).unwrap(), 0);
        assert_eq!(reader.read(32).unwrap(), 0);
    }

    #[test]
    fn reuse_beyond_the_fifo_goes_free() {
        // 24 isolated triangles push 72 vertices through the 32-deep FIFO,
        // so the very first vertex comes back as a free reference
        let mut triangles: Vec<[u32; 3]> = (0..24).map(|i| [3 * i, 3 * i + 1, 3 * i + 2]).collect();
        triangles.push([0, 72, 73]);
        let mut remap = [0u32; 74];
        let mut output = WriteBitstream::new();
        compress::<u32, i32>(&triangles, &mut remap, 0, &[], &mut output).unwrap();
        output.finish();

        let mut reader = ReadBitstream::new(output.as_bytes());
        for _ in 0..24 {
            assert_eq!(symbol(&mut reader), TriangleCode::NewNewNew);
        }
        // (free, new, new) rotates to (new, new, free)
        assert_eq!(symbol(&mut reader), TriangleCode::NewNewFree);
        assert_eq!(reader.read_varint().unwrap(), 71);
        assert_eq!(remap[0], 0);
        assert_eq!(remap[72], 72);
        assert_eq!(remap[73], 73);
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let triangles = [[5u16, 5, 7]];
        let mut remap = [0u32; 8];
        let mut output = WriteBitstream::new();
        let result = compress::<u16, i32>(&triangles, &mut remap, 0, &[], &mut output);
        assert_eq!(result, Err(Err::DegenerateTriangle(0)));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let triangles = [[0u16, 1, 9]];
        let mut remap = [0u32; 3];
        let mut output = WriteBitstream::new();
        let result = compress::<u16, i32>(&triangles, &mut remap, 0, &[], &mut output);
        assert_eq!(result, Err(Err::IndexOutOfRange(0)));
    }

    #[test]
    fn attribute_layout_is_validated() {
        let triangles = [[0u16, 1, 2]];
        let mut remap = [0u32; 3];
        let mut output = WriteBitstream::new();

        let result = compress::<u16, i32>(&triangles, &mut remap, 65, &[], &mut output);
        assert_eq!(result, Err(Err::AttributeCountTooLarge(65)));

        let short: [i32; 5] = [0; 5];
        let result = compress(&triangles, &mut remap, 2, &short, &mut output);
        assert_eq!(result, Err(Err::AttributeLengthMismatch { expected: 6, got: 5 }));
    }

    #[test]
    fn unreferenced_vertices_stay_unmapped() {
        let triangles = [[0u16, 2, 4]];
        let mut remap = [7u32; 5];
        let mut output = WriteBitstream::new();
        compress::<u16, i32>(&triangles, &mut remap, 0, &[], &mut output).unwrap();
        assert_eq!(remap, [0, UNMAPPED, 1, UNMAPPED, 2]);
    }
}
