//! Track segments, their templates, and obstacles
//!
//! A template describes a tile in its own local space: how long it is, where
//! the next tile attaches, and where obstacles may sit. Placing a template at
//! an entry transform yields a `Segment` in world space.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::{LANE_SPACING, TILE_LENGTH};
use crate::error::SimError;

/// Segment identifier (unique per session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

/// Obstacle identifier (unique per session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment#{}", self.0)
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obstacle#{}", self.0)
    }
}

/// Position + orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Map a point from this transform's local space into its parent space
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Compose a child transform expressed in this transform's local space
    pub fn mul_transform(&self, local: &Transform) -> Transform {
        Transform {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }
}

/// A placeable tile, in local space (entry at the origin, facing +Z)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentTemplate {
    pub name: String,
    /// Path length from entry to exit
    pub length: f32,
    /// Where the next tile attaches, relative to this tile's entry
    pub exit: Transform,
    /// Candidate obstacle attachment points, relative to entry
    pub obstacle_slots: Vec<Vec3>,
}

impl SegmentTemplate {
    /// Straight tile with `lanes` obstacle slots across its middle
    pub fn straight(length: f32, lanes: u32) -> Self {
        let half = (lanes.saturating_sub(1)) as f32 * LANE_SPACING / 2.0;
        let obstacle_slots = (0..lanes)
            .map(|lane| Vec3::new(lane as f32 * LANE_SPACING - half, 0.0, length / 2.0))
            .collect();
        Self {
            name: format!("straight_{}", lanes),
            length,
            exit: Transform::from_position(Vec3::new(0.0, 0.0, length)),
            obstacle_slots,
        }
    }

    /// Tile that turns by `yaw` radians around +Y over its length
    ///
    /// Modeled as a circular arc; the exit is where the arc ends.
    pub fn turn(length: f32, yaw: f32, lanes: u32) -> Self {
        let exit_pos = if yaw.abs() < f32::EPSILON {
            Vec3::new(0.0, 0.0, length)
        } else {
            let radius = length / yaw;
            Vec3::new(radius * (1.0 - yaw.cos()), 0.0, radius * yaw.sin())
        };
        let mut template = Self::straight(length, lanes);
        template.name = format!("turn_{:.2}", yaw);
        template.exit = Transform::new(exit_pos, Quat::from_rotation_y(yaw));
        template
    }

    /// Tile with no obstacle slots at all
    pub fn plain(length: f32) -> Self {
        let mut template = Self::straight(length, 0);
        template.name = String::from("plain");
        template
    }

    /// Place this template at a world transform
    pub fn place(
        &self,
        id: SegmentId,
        template: usize,
        entry: Transform,
        start_distance: f32,
    ) -> Segment {
        Segment {
            id,
            template,
            entry,
            exit: entry.mul_transform(&self.exit),
            obstacle_slots: self
                .obstacle_slots
                .iter()
                .map(|&slot| entry.transform_point(slot))
                .collect(),
            start_distance,
            length: self.length,
        }
    }
}

/// Static set of tiles the generator may place (never empty)
#[derive(Debug, Clone, Serialize)]
pub struct SegmentCatalog {
    templates: Vec<SegmentTemplate>,
}

impl Default for SegmentCatalog {
    fn default() -> Self {
        Self {
            templates: vec![SegmentTemplate::straight(TILE_LENGTH, 3)],
        }
    }
}

impl SegmentCatalog {
    pub fn new(templates: Vec<SegmentTemplate>) -> Result<Self, SimError> {
        if templates.is_empty() {
            return Err(SimError::InvalidTuning("segment catalog is empty".into()));
        }
        if let Some(bad) = templates.iter().find(|t| !(t.length > 0.0)) {
            return Err(SimError::InvalidTuning(format!(
                "template '{}' has non-positive length {}",
                bad.name, bad.length
            )));
        }
        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SegmentTemplate> {
        self.templates.get(index)
    }

    pub fn templates(&self) -> &[SegmentTemplate] {
        &self.templates
    }
}

/// A tile placed in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    /// Index into the catalog
    pub template: usize,
    pub entry: Transform,
    pub exit: Transform,
    /// Obstacle attachment points in world space (may be empty)
    pub obstacle_slots: Vec<Vec3>,
    /// Track distance at the entry
    pub start_distance: f32,
    pub length: f32,
}

impl Segment {
    /// Track distance at the exit
    #[inline]
    pub fn end_distance(&self) -> f32 {
        self.start_distance + self.length
    }
}

/// An obstacle sitting in one slot of one segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    /// Back-reference to the segment holding the slot
    pub segment: SegmentId,
    /// Index into the segment's `obstacle_slots`
    pub slot: usize,
    /// World position
    pub position: Vec3,
}
