//! Proximal sensing of the four egocentric neighbour cells.

use serde::{Deserialize, Serialize};

use crate::kinematics::AgentPose;
use crate::world::{GridPos, WorldGrid};

/// Number of egocentric directions sampled each tick.
pub const NUM_DIRECTIONS: usize = 4;

/// Egocentric sampling direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Front,
    Right,
    Left,
    Back,
}

impl Direction {
    /// All directions in channel order.
    pub const ALL: [Self; NUM_DIRECTIONS] = [Self::Front, Self::Right, Self::Left, Self::Back];

    /// Offset in degrees added to the agent heading.
    #[must_use]
    pub const fn offset(self) -> i32 {
        match self {
            Self::Front => 0,
            Self::Right => 90,
            Self::Left => -90,
            Self::Back => 180,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Right => "right",
            Self::Left => "left",
            Self::Back => "back",
        }
    }
}

/// Material found one step away in one direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProximalSample {
    pub direction: Direction,
    pub material: u16,
    pub cell: GridPos,
}

/// Barrier contact flags derived from a scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contacts {
    pub front: bool,
    pub right: bool,
    pub left: bool,
    pub back: bool,
}

impl Contacts {
    #[must_use]
    pub const fn get(&self, direction: Direction) -> bool {
        match direction {
            Direction::Front => self.front,
            Direction::Right => self.right,
            Direction::Left => self.left,
            Direction::Back => self.back,
        }
    }
}

/// One sample per egocentric direction, in [`Direction::ALL`] order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProximalScan {
    samples: [ProximalSample; NUM_DIRECTIONS],
}

impl ProximalScan {
    /// Sample the four neighbour cells of `pose`.
    #[must_use]
    pub fn scan(world: &WorldGrid, pose: &AgentPose) -> Self {
        let samples = Direction::ALL.map(|direction| {
            let cell = pose.cell_toward(direction.offset());
            ProximalSample {
                direction,
                material: world.material_or_edge(cell),
                cell,
            }
        });
        Self { samples }
    }

    #[must_use]
    pub const fn get(&self, direction: Direction) -> &ProximalSample {
        &self.samples[direction.index()]
    }

    #[must_use]
    pub const fn samples(&self) -> &[ProximalSample; NUM_DIRECTIONS] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProximalSample> {
        self.samples.iter()
    }

    /// Which directions face a barrier material.
    #[must_use]
    pub fn contacts(&self, world: &WorldGrid) -> Contacts {
        let blocked = |direction: Direction| world.is_barrier(self.get(direction).material);
        Contacts {
            front: blocked(Direction::Front),
            right: blocked(Direction::Right),
            left: blocked(Direction::Left),
            back: blocked(Direction::Back),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NavConfig;

    #[test]
    fn scan_reports_walls_in_corner() {
        let config = NavConfig {
            world_width: 5,
            world_height: 5,
            ..NavConfig::default()
        };
        let world = WorldGrid::with_wall_ring(&config).expect("world");
        let pose = AgentPose::at(GridPos::new(3, 3), 0);
        let scan = ProximalScan::scan(&world, &pose);
        assert_eq!(scan.get(Direction::Front).cell, GridPos::new(4, 3));
        assert_eq!(scan.get(Direction::Right).cell, GridPos::new(3, 4));
        assert_eq!(scan.get(Direction::Left).cell, GridPos::new(3, 2));
        assert_eq!(scan.get(Direction::Back).cell, GridPos::new(2, 3));
        let contacts = scan.contacts(&world);
        assert!(contacts.front && contacts.right);
        assert!(!contacts.left && !contacts.back);
    }

    #[test]
    fn samples_follow_direction_order() {
        let config = NavConfig::default();
        let world = WorldGrid::blank(&config).expect("world");
        let scan = ProximalScan::scan(&world, &AgentPose::at(GridPos::new(5, 5), 90));
        let order: Vec<Direction> = scan.iter().map(|s| s.direction).collect();
        assert_eq!(order, Direction::ALL.to_vec());
        assert_eq!(scan.get(Direction::Front).cell, GridPos::new(5, 6));
        assert_eq!(scan.get(Direction::Right).cell, GridPos::new(4, 5));
    }
}
