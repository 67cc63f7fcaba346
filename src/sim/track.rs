//! Just-in-time track generation
//!
//! The generator keeps a frontier: the exit transform of the last tile and
//! the track distance it sits at. Tiles are appended at the frontier until the
//! track reaches far enough past the player, and recycled once they fall
//! behind. Obstacles are tracked in a flat table keyed by segment id rather
//! than parented to their tile.

use std::collections::{BTreeMap, VecDeque};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::segment::{Obstacle, ObstacleId, Segment, SegmentCatalog, SegmentId, Transform};
use crate::error::SimError;
use crate::tuning::RunnerTuning;

/// Endless track builder
#[derive(Debug, Clone)]
pub struct TrackGenerator {
    catalog: SegmentCatalog,
    start: Transform,
    init_no_obstacles: u32,
    obstacle_chance: f64,
    rng: Pcg32,
    /// Live tiles, oldest first
    segments: VecDeque<Segment>,
    /// Live obstacles
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    /// Ownership table: which obstacle (if any) each live tile carries
    occupancy: BTreeMap<SegmentId, Option<ObstacleId>>,
    /// Where the next tile attaches
    next_tile: Transform,
    /// Track distance at `next_tile`
    frontier_distance: f32,
    /// Tiles spawned since the last reset
    spawned_this_run: u32,
    next_id: u32,
}

impl TrackGenerator {
    pub fn new(catalog: SegmentCatalog, tuning: &RunnerTuning, seed: u64) -> Self {
        let start = Transform::from_position(tuning.start_point);
        Self {
            catalog,
            start,
            init_no_obstacles: tuning.init_no_obstacles,
            obstacle_chance: tuning.obstacle_chance,
            rng: Pcg32::seed_from_u64(seed),
            segments: VecDeque::new(),
            obstacles: BTreeMap::new(),
            occupancy: BTreeMap::new(),
            next_tile: start,
            frontier_distance: 0.0,
            spawned_this_run: 0,
            next_id: 1,
        }
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Throw away the current track and lay `initial` tiles from the start point
    pub fn reset(&mut self, initial: u32) {
        self.segments.clear();
        self.obstacles.clear();
        self.occupancy.clear();
        self.next_tile = self.start;
        self.frontier_distance = 0.0;
        self.spawned_this_run = 0;

        for _ in 0..initial {
            self.spawn_next();
        }
        log::info!(
            "Track reset: {} tiles, {} obstacles, frontier at {:.1}",
            self.segments.len(),
            self.obstacles.len(),
            self.frontier_distance
        );
    }

    /// Make sure the track reaches at least `ahead` past `player_distance`
    ///
    /// Returns how many tiles were added (0 when already satisfied).
    pub fn ensure_frontier(&mut self, player_distance: f32, ahead: f32) -> Result<u32, SimError> {
        if ahead.is_nan() || ahead < 0.0 {
            return Err(SimError::NegativeDistance(ahead));
        }
        if !player_distance.is_finite() || !ahead.is_finite() {
            return Err(SimError::InvalidDistance(player_distance + ahead));
        }
        let target = player_distance + ahead;
        if !target.is_finite() {
            return Err(SimError::InvalidDistance(target));
        }
        let mut added = 0;
        while self.frontier_distance < target {
            let before = self.frontier_distance;
            self.spawn_next();
            added += 1;
            // Tile length below f32 resolution at this distance
            if self.frontier_distance <= before {
                log::warn!("Track stopped advancing at {} (target {})", before, target);
                return Err(SimError::InvalidDistance(target));
            }
        }
        if added > 0 {
            log::debug!("Extended frontier by {} tiles to {:.1}", added, self.frontier_distance);
        }
        Ok(added)
    }

    /// Append one tile at the frontier
    pub fn spawn_next(&mut self) -> SegmentId {
        let template_index = if self.catalog.len() > 1 {
            self.rng.random_range(0..self.catalog.len())
        } else {
            0
        };
        let id = SegmentId(self.next_entity_id());
        // Catalog is non-empty by construction
        let segment = self.catalog.templates()[template_index].place(
            id,
            template_index,
            self.next_tile,
            self.frontier_distance,
        );

        self.next_tile = segment.exit;
        self.frontier_distance = segment.end_distance();

        let eligible = self.spawned_this_run >= self.init_no_obstacles;
        self.spawned_this_run += 1;

        let obstacle = if eligible { self.roll_obstacle(&segment) } else { None };
        self.occupancy.insert(id, obstacle);
        self.segments.push_back(segment);
        id
    }

    /// Maybe put an obstacle on one uniformly chosen slot of `segment`
    fn roll_obstacle(&mut self, segment: &Segment) -> Option<ObstacleId> {
        // No slots: nothing to place, no draw
        if segment.obstacle_slots.is_empty() {
            return None;
        }
        if !self.rng.random_bool(self.obstacle_chance) {
            return None;
        }
        let slot = self.rng.random_range(0..segment.obstacle_slots.len());
        let id = ObstacleId(self.next_entity_id());
        self.obstacles.insert(
            id,
            Obstacle {
                id,
                segment: segment.id,
                slot,
                position: segment.obstacle_slots[slot],
            },
        );
        Some(id)
    }

    /// Remove an obstacle from the track (after a continue)
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let obstacle = self.obstacles.remove(&id)?;
        if let Some(slot) = self.occupancy.get_mut(&obstacle.segment) {
            *slot = None;
        }
        log::info!("Removed {} from {}", id, obstacle.segment);
        Some(obstacle)
    }

    /// Drop tiles whose exit is more than `margin` behind the player
    pub fn recycle_behind(&mut self, player_distance: f32, margin: f32) -> usize {
        let mut recycled = 0;
        while let Some(front) = self.segments.front() {
            if front.end_distance() + margin >= player_distance {
                break;
            }
            if let Some(segment) = self.segments.pop_front() {
                if let Some(Some(obstacle)) = self.occupancy.remove(&segment.id) {
                    self.obstacles.remove(&obstacle);
                }
                recycled += 1;
            }
        }
        recycled
    }

    /// Track distance the generated track reaches
    pub fn frontier_distance(&self) -> f32 {
        self.frontier_distance
    }

    /// Transform the next tile will attach at
    pub fn frontier(&self) -> Transform {
        self.next_tile
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    /// Obstacle carried by a tile, if any
    pub fn obstacle_on(&self, segment: SegmentId) -> Option<&Obstacle> {
        self.occupancy
            .get(&segment)
            .copied()
            .flatten()
            .and_then(|id| self.obstacles.get(&id))
    }

    /// Tiles spawned since the last reset (including recycled ones)
    pub fn spawned_this_run(&self) -> u32 {
        self.spawned_this_run
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::segment::SegmentTemplate;
    use proptest::prelude::*;

    fn tuning(init_no_obstacles: u32, chance: f64) -> RunnerTuning {
        RunnerTuning {
            init_no_obstacles,
            obstacle_chance: chance,
            ..Default::default()
        }
    }

    fn mixed_catalog() -> SegmentCatalog {
        SegmentCatalog::new(vec![
            SegmentTemplate::straight(10.0, 3),
            SegmentTemplate::turn(12.0, 0.4, 2),
            SegmentTemplate::turn(12.0, -0.4, 2),
            SegmentTemplate::plain(6.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_reset_spawns_initial_tiles() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(4, 1.0), 1);
        track.reset(10);
        assert_eq!(track.segment_count(), 10);
        assert_eq!(track.frontier_distance(), 100.0);
        // Default chance is 1.0 and every tile has slots: 6 obstacles
        assert_eq!(track.obstacles().count(), 6);
        let first = track.segments().next().unwrap();
        assert_eq!(first.entry.position, glam::Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn test_first_tiles_obstacle_free() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(4, 1.0), 99);
        track.reset(10);
        for (i, seg) in track.segments().enumerate() {
            let has = track.obstacle_on(seg.id).is_some();
            assert_eq!(has, i >= 4, "tile {}", i);
        }
    }

    #[test]
    fn test_ensure_frontier_idempotent() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(4, 0.5), 3);
        track.reset(1);
        let added = track.ensure_frontier(0.0, 55.0).unwrap();
        assert_eq!(added, 5);
        assert_eq!(track.frontier_distance(), 60.0);
        assert_eq!(track.ensure_frontier(0.0, 55.0).unwrap(), 0);
        assert_eq!(track.ensure_frontier(5.0, 55.0).unwrap(), 0);
        assert_eq!(track.segment_count(), 6);
    }

    #[test]
    fn test_ensure_frontier_rejects_negative() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(4, 0.5), 3);
        let err = track.ensure_frontier(0.0, -1.0).unwrap_err();
        assert!(matches!(err, SimError::NegativeDistance(_)));
        assert!(err.is_contract_violation());
        assert!(track.ensure_frontier(0.0, f32::NAN).is_err());
        assert_eq!(track.segment_count(), 0);
    }

    #[test]
    fn test_ensure_frontier_rejects_unbounded() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(4, 0.5), 3);
        track.reset(1);
        let err = track.ensure_frontier(0.0, f32::INFINITY).unwrap_err();
        assert!(matches!(err, SimError::InvalidDistance(_)));
        assert!(err.is_contract_violation());
        assert!(track.ensure_frontier(f32::INFINITY, 10.0).is_err());
        assert!(track.ensure_frontier(f32::NAN, 10.0).is_err());
        assert!(track.ensure_frontier(f32::MAX, f32::MAX).is_err());
        assert_eq!(track.segment_count(), 1);
    }

    #[test]
    fn test_ensure_frontier_stops_when_tiles_stall() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(4, 0.5), 3);
        // Spacing between f32 values at this distance exceeds one tile
        track.frontier_distance = 1.0e9;
        let err = track.ensure_frontier(1.0e9, 1.0e3).unwrap_err();
        assert!(matches!(err, SimError::InvalidDistance(_)));
        assert_eq!(track.segment_count(), 1);
    }

    #[test]
    fn test_zero_slot_tiles_never_get_obstacles() {
        let catalog = SegmentCatalog::new(vec![SegmentTemplate::plain(5.0)]).unwrap();
        let mut track = TrackGenerator::new(catalog, &tuning(0, 1.0), 5);
        track.reset(15);
        assert_eq!(track.obstacles().count(), 0);
    }

    #[test]
    fn test_remove_obstacle_clears_table() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(0, 1.0), 5);
        track.reset(3);
        let obstacle = track.obstacles().next().unwrap().clone();
        let removed = track.remove_obstacle(obstacle.id).unwrap();
        assert_eq!(removed.segment, obstacle.segment);
        assert!(track.obstacle_on(obstacle.segment).is_none());
        assert!(track.obstacle(obstacle.id).is_none());
        assert!(track.remove_obstacle(obstacle.id).is_none());
    }

    #[test]
    fn test_recycle_behind() {
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(0, 1.0), 5);
        track.reset(10);
        // Tiles end at 10, 20, ...; player at 35 with margin 10 drops the first two
        assert_eq!(track.recycle_behind(35.0, 10.0), 2);
        assert_eq!(track.segment_count(), 8);
        assert_eq!(track.obstacles().count(), 8);
        assert_eq!(track.segments().next().unwrap().start_distance, 20.0);
        assert_eq!(track.recycle_behind(35.0, 10.0), 0);
    }

    #[test]
    fn test_placement_rate_statistical() {
        let n = 20_000;
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(0, 0.3), 2024);
        track.reset(0);
        let mut hits = 0;
        for _ in 0..n {
            let id = track.spawn_next();
            if track.obstacle_on(id).is_some() {
                hits += 1;
            }
            track.recycle_behind(track.frontier_distance(), 0.0);
        }
        let rate = hits as f64 / n as f64;
        assert!((rate - 0.3).abs() < 0.02, "rate {}", rate);
    }

    #[test]
    fn test_slot_choice_uniform() {
        let n = 30_000;
        let mut track = TrackGenerator::new(SegmentCatalog::default(), &tuning(0, 1.0), 77);
        track.reset(0);
        let mut counts = [0u32; 3];
        for _ in 0..n {
            let id = track.spawn_next();
            counts[track.obstacle_on(id).unwrap().slot] += 1;
            track.recycle_behind(track.frontier_distance(), 0.0);
        }
        for count in counts {
            let share = count as f64 / n as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.02, "share {}", share);
        }
    }

    #[test]
    fn test_same_seed_same_track() {
        let mut a = TrackGenerator::new(mixed_catalog(), &tuning(2, 0.5), 42);
        let mut b = TrackGenerator::new(mixed_catalog(), &tuning(2, 0.5), 42);
        a.reset(15);
        b.reset(15);
        let ta: Vec<_> = a.segments().map(|s| (s.template, s.exit)).collect();
        let tb: Vec<_> = b.segments().map(|s| (s.template, s.exit)).collect();
        assert_eq!(ta, tb);
        let oa: Vec<_> = a.obstacles().map(|o| (o.segment, o.slot)).collect();
        let ob: Vec<_> = b.obstacles().map(|o| (o.segment, o.slot)).collect();
        assert_eq!(oa, ob);
    }

    proptest! {
        #[test]
        fn prop_tiles_chain_without_gaps(seed in any::<u64>(), count in 1u32..60) {
            let mut track = TrackGenerator::new(mixed_catalog(), &tuning(4, 0.7), seed);
            track.reset(count);
            let segments: Vec<_> = track.segments().collect();
            for pair in segments.windows(2) {
                prop_assert_eq!(pair[0].exit, pair[1].entry);
                prop_assert_eq!(pair[0].end_distance(), pair[1].start_distance);
            }
            prop_assert_eq!(track.frontier(), segments[segments.len() - 1].exit);
        }

        #[test]
        fn prop_one_obstacle_per_tile(seed in any::<u64>(), safe in 0u32..8, count in 1u32..60) {
            let mut track = TrackGenerator::new(mixed_catalog(), &tuning(safe, 0.8), seed);
            track.reset(count);
            for (i, seg) in track.segments().enumerate() {
                let carried: Vec<_> = track.obstacles().filter(|o| o.segment == seg.id).collect();
                prop_assert!(carried.len() <= 1);
                if (i as u32) < safe {
                    prop_assert!(carried.is_empty());
                }
                if let Some(o) = carried.first() {
                    prop_assert!(o.slot < seg.obstacle_slots.len());
                    prop_assert_eq!(o.position, seg.obstacle_slots[o.slot]);
                }
            }
        }
    }
}
