//! Agent pose and the movement primitives acting on it.

use serde::{Deserialize, Serialize};

use crate::world::{GridPos, WorldGrid};

/// Wrap an angle in degrees into `[0, 360)`.
#[must_use]
pub const fn wrap_degrees(angle: i32) -> i32 {
    angle.rem_euclid(360)
}

/// Direction vector for `angle` (degrees) scaled so its dominant component is exactly 1.
///
/// Angle 0 points along +x (columns) and angle 90 along +y (rows). Every forward step
/// therefore advances exactly one cell along the dominant axis.
#[must_use]
pub fn heading_vector(angle: i32) -> [f32; 2] {
    let radians = f64::from(wrap_degrees(angle)).to_radians();
    let (sin, cos) = radians.sin_cos();
    let snap = |v: f64| if v.abs() < 1e-9 { 0.0 } else { v };
    let (dx, dy) = (snap(cos), snap(sin));
    let norm = dx.abs().max(dy.abs());
    [(dx / norm) as f32, (dy / norm) as f32]
}

fn round_cell(pos: [f32; 2]) -> GridPos {
    GridPos::new(pos[0].round() as i32, pos[1].round() as i32)
}

/// Rotation direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Turn {
    /// Counter-clockwise on the text map (negative delta).
    Left,
    /// Clockwise on the text map (positive delta).
    Right,
}

impl Turn {
    /// Signed angular delta for one rotation step.
    #[must_use]
    pub const fn delta(self, increment: i32) -> i32 {
        match self {
            Self::Left => -increment,
            Self::Right => increment,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Result of applying one primitive to the pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Heading changed by `delta` degrees.
    Rotated { delta: i32 },
    /// The agent advanced into `cell`.
    Moved { cell: GridPos },
    /// Forward movement was refused by a barrier cell.
    Blocked { cell: GridPos, material: u16 },
}

impl MoveOutcome {
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Continuous and discrete position plus heading of the agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentPose {
    /// Continuous position in cell units.
    pub pos_f: [f32; 2],
    /// Nearest grid cell to `pos_f`.
    pub pos_i: GridPos,
    /// Heading in degrees, `[0, 360)`.
    pub angle: i32,
    /// Signed delta of the last rotation; 0 after any forward attempt.
    pub rot_ang: i32,
}

impl AgentPose {
    /// Pose centred on `cell` facing `angle`.
    #[must_use]
    pub fn at(cell: GridPos, angle: i32) -> Self {
        Self {
            pos_f: [cell.x as f32, cell.y as f32],
            pos_i: cell,
            angle: wrap_degrees(angle),
            rot_ang: 0,
        }
    }

    /// Cell reached by travelling one heading vector from `pos_f` at `angle + offset`.
    #[must_use]
    pub fn cell_toward(&self, offset: i32) -> GridPos {
        let step = heading_vector(self.angle + offset);
        round_cell([self.pos_f[0] + step[0], self.pos_f[1] + step[1]])
    }

    /// Rotate one increment; position is untouched.
    pub fn rotate(&mut self, turn: Turn, increment: i32) -> MoveOutcome {
        let delta = turn.delta(increment);
        self.angle = wrap_degrees(self.angle + delta);
        self.rot_ang = delta;
        MoveOutcome::Rotated { delta }
    }

    /// Advance one heading vector unless the target cell holds a barrier material.
    pub fn move_forward(&mut self, world: &WorldGrid) -> MoveOutcome {
        self.rot_ang = 0;
        let step = heading_vector(self.angle);
        let next = [self.pos_f[0] + step[0], self.pos_f[1] + step[1]];
        let cell = round_cell(next);
        let material = world.material_or_edge(cell);
        if world.is_barrier(material) || !world.in_bounds(cell) {
            return MoveOutcome::Blocked { cell, material };
        }
        self.pos_f = next;
        self.pos_i = cell;
        MoveOutcome::Moved { cell }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NavConfig;

    #[test]
    fn cardinal_heading_vectors_are_unit_steps() {
        assert_eq!(heading_vector(0), [1.0, 0.0]);
        assert_eq!(heading_vector(90), [0.0, 1.0]);
        assert_eq!(heading_vector(180), [-1.0, 0.0]);
        assert_eq!(heading_vector(270), [0.0, -1.0]);
        assert_eq!(heading_vector(-90), [0.0, -1.0]);
    }

    #[test]
    fn diagonal_heading_is_max_normalized() {
        let v = heading_vector(45);
        assert_eq!(v[0].abs().max(v[1].abs()), 1.0);
        assert!((v[0] - 1.0).abs() < 1e-6 && (v[1] - 1.0).abs() < 1e-6);
        let v = heading_vector(15);
        assert_eq!(v[0], 1.0);
        assert!((v[1] - 0.267_949_2).abs() < 1e-6);
    }

    #[test]
    fn rotation_wraps_and_records_delta() {
        let mut pose = AgentPose::at(GridPos::new(2, 2), 0);
        pose.rotate(Turn::Left, 15);
        assert_eq!(pose.angle, 345);
        assert_eq!(pose.rot_ang, -15);
        pose.rotate(Turn::Right, 15);
        assert_eq!(pose.angle, 0);
        assert_eq!(pose.rot_ang, 15);
        assert_eq!(pose.pos_i, GridPos::new(2, 2));
    }

    #[test]
    fn forward_into_wall_is_rejected() {
        let config = NavConfig {
            world_width: 5,
            world_height: 5,
            ..NavConfig::default()
        };
        let world = WorldGrid::with_wall_ring(&config).expect("world");
        let mut pose = AgentPose::at(GridPos::new(3, 2), 0);
        pose.rot_ang = 15;
        let outcome = pose.move_forward(&world);
        assert_eq!(
            outcome,
            MoveOutcome::Blocked {
                cell: GridPos::new(4, 2),
                material: 1
            }
        );
        assert_eq!(pose.pos_f, [3.0, 2.0]);
        assert_eq!(pose.pos_i, GridPos::new(3, 2));
        assert_eq!(pose.rot_ang, 0);
    }

    #[test]
    fn oblique_moves_accumulate_fractional_position() {
        let config = NavConfig {
            world_width: 9,
            world_height: 9,
            ..NavConfig::default()
        };
        let world = WorldGrid::with_wall_ring(&config).expect("world");
        let mut pose = AgentPose::at(GridPos::new(2, 2), 30);
        pose.move_forward(&world);
        pose.move_forward(&world);
        assert_eq!(pose.pos_i, GridPos::new(4, 3));
        assert!((pose.pos_f[1] - (2.0 + 2.0 * 0.577_350_3)).abs() < 1e-5);
    }
}
