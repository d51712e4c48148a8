use crate::math::{IVec2, Vec2};

pub const CHUNK_SIZE: f32 = 16.0;
/// Tolerance for float error at chunk edges when checking canonical offsets.
pub const CHUNK_EPSILON: f32 = 0.001;
pub const CELL_SIZE: f32 = 1.0;

/// Chunk identity plus an in-chunk offset.
///
/// `chunk` is authoritative for coarse location. `offset` stays within
/// `[-CHUNK_EPSILON, CHUNK_SIZE + CHUNK_EPSILON]` on both axes once
/// canonicalized, so precision never degrades far from the world origin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldPosition {
    pub chunk: IVec2,
    pub offset: Vec2,
}

impl WorldPosition {
    pub const fn new(chunk: IVec2, offset: Vec2) -> Self {
        Self { chunk, offset }
    }

    /// Canonical position of a flat world-space point.
    pub fn from_point(point: Vec2) -> Self {
        pos_add(Self::default(), point)
    }

    /// Flat world-space point, measured from the world origin.
    pub fn to_point(self) -> Vec2 {
        distance_between(self, Self::default())
    }

    pub fn is_canonical(&self) -> bool {
        is_canonical_coord(self.offset.x) && is_canonical_coord(self.offset.y)
    }
}

fn is_canonical_coord(chunk_rel: f32) -> bool {
    (-CHUNK_EPSILON..=CHUNK_SIZE + CHUNK_EPSILON).contains(&chunk_rel)
}

fn recanonicalize_coord(chunk: &mut i32, chunk_rel: &mut f32) {
    let chunk_delta = (*chunk_rel / CHUNK_SIZE).floor() as i32;
    *chunk += chunk_delta;
    *chunk_rel -= chunk_delta as f32 * CHUNK_SIZE;
    assert!(
        is_canonical_coord(*chunk_rel),
        "offset {chunk_rel} is not canonical after recanonicalization"
    );
}

pub fn pos_add(base: WorldPosition, delta: Vec2) -> WorldPosition {
    let mut result = base;
    result.offset += delta;
    recanonicalize_coord(&mut result.chunk.x, &mut result.offset.x);
    recanonicalize_coord(&mut result.chunk.y, &mut result.offset.y);
    result
}

/// Vector from `b` to `a`.
pub fn distance_between(a: WorldPosition, b: WorldPosition) -> Vec2 {
    let chunk_delta = (a.chunk - b.chunk).to_vec2();
    chunk_delta * CHUNK_SIZE + (a.offset - b.offset)
}

pub fn same_chunk(a: WorldPosition, b: WorldPosition) -> bool {
    assert!(
        a.is_canonical() && b.is_canonical(),
        "same_chunk requires canonical positions: {a:?} {b:?}"
    );
    a.chunk == b.chunk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec2_close(actual: Vec2, expected: Vec2, epsilon: f32) {
        assert!(
            (actual.x - expected.x).abs() <= epsilon,
            "x {} vs {}",
            actual.x,
            expected.x
        );
        assert!(
            (actual.y - expected.y).abs() <= epsilon,
            "y {} vs {}",
            actual.y,
            expected.y
        );
    }

    #[test]
    fn crossing_chunk_edge_moves_to_next_chunk() {
        let start = WorldPosition::new(IVec2::new(0, 0), Vec2::new(15.5, 0.0));
        let moved = pos_add(start, Vec2::new(1.0, 0.0));
        assert_eq!(moved.chunk, IVec2::new(1, 0));
        assert_vec2_close(moved.offset, Vec2::new(0.5, 0.0), 1e-5);
    }

    #[test]
    fn negative_delta_moves_to_previous_chunk() {
        let start = WorldPosition::new(IVec2::new(0, 0), Vec2::new(0.25, 8.0));
        let moved = pos_add(start, Vec2::new(-0.5, 0.0));
        assert_eq!(moved.chunk, IVec2::new(-1, 0));
        assert_vec2_close(moved.offset, Vec2::new(15.75, 8.0), 1e-4);
    }

    #[test]
    fn large_delta_crosses_many_chunks() {
        let start = WorldPosition::new(IVec2::new(3, -2), Vec2::new(1.0, 1.0));
        let moved = pos_add(start, Vec2::new(16.0 * 10.0 + 2.0, -16.0 * 7.0 - 3.0));
        assert_eq!(moved.chunk, IVec2::new(13, -10));
        assert_vec2_close(moved.offset, Vec2::new(3.0, 14.0), 1e-3);
        assert!(moved.is_canonical());
    }

    #[test]
    fn pos_add_is_translation_consistent() {
        let bases = [
            WorldPosition::default(),
            WorldPosition::new(IVec2::new(-4, 7), Vec2::new(15.9, 0.1)),
            WorldPosition::new(IVec2::new(100, -100), Vec2::new(8.0, 8.0)),
        ];
        let deltas = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, -0.5),
            Vec2::new(-31.25, 47.5),
            Vec2::new(255.0, -1.0),
            Vec2::new(-0.001, 16.0),
        ];
        for base in bases {
            for delta in deltas {
                let moved = pos_add(base, delta);
                assert!(moved.is_canonical(), "{moved:?}");
                assert_vec2_close(distance_between(moved, base), delta, 1e-3);
            }
        }
    }

    #[test]
    fn point_round_trip_through_world_position() {
        let point = Vec2::new(-37.5, 129.25);
        let position = WorldPosition::from_point(point);
        assert_eq!(position.chunk, IVec2::new(-3, 8));
        assert_vec2_close(position.to_point(), point, 1e-4);
    }

    #[test]
    fn same_chunk_compares_chunk_identity() {
        let a = WorldPosition::new(IVec2::new(2, 2), Vec2::new(0.0, 0.0));
        let b = WorldPosition::new(IVec2::new(2, 2), Vec2::new(15.0, 3.0));
        let c = pos_add(b, Vec2::new(1.5, 0.0));
        assert!(same_chunk(a, b));
        assert!(!same_chunk(b, c));
    }

    #[test]
    #[should_panic(expected = "canonical")]
    fn same_chunk_rejects_non_canonical_offsets() {
        let raw = WorldPosition::new(IVec2::new(0, 0), Vec2::new(40.0, 0.0));
        same_chunk(raw, WorldPosition::default());
    }
}
