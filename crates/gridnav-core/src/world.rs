//! Terrain grid holding one material index per cell.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BACKGROUND, EnvError, NavConfig};

/// Integer grid coordinate (`x` = column, `y` = row).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    /// Construct a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev (king-move) distance to `other`.
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        if dx > dy { dx } else { dy }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Reject material names that cannot round-trip through the tab-delimited map format.
pub(crate) fn check_material_names(materials: &[String]) -> Result<(), EnvError> {
    for (idx, name) in materials.iter().enumerate() {
        if idx > 0 && name.is_empty() {
            return Err(EnvError::InvalidConfig(
                "only the background material may have an empty name",
            ));
        }
        if name.contains(['\t', '\n', '\r']) {
            return Err(EnvError::InvalidConfig(
                "material names must not contain tabs or line breaks",
            ));
        }
        if name.trim() != name {
            return Err(EnvError::InvalidConfig(
                "material names must not start or end with whitespace",
            ));
        }
        if materials[..idx].contains(name) {
            return Err(EnvError::InvalidConfig("material names must be unique"));
        }
    }
    Ok(())
}

/// 2D array of material indices plus the material vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldGrid {
    width: u32,
    height: u32,
    cells: Vec<u16>,
    materials: Vec<String>,
    barrier_index: u16,
}

impl WorldGrid {
    /// Construct a background-filled grid.
    pub fn new(
        width: u32,
        height: u32,
        materials: Vec<String>,
        barrier_index: u16,
    ) -> Result<Self, EnvError> {
        if width == 0 || height == 0 {
            return Err(EnvError::InvalidConfig(
                "world grid dimensions must be non-zero",
            ));
        }
        if materials.len() > usize::from(u16::MAX) {
            return Err(EnvError::InvalidConfig("too many materials"));
        }
        check_material_names(&materials)?;
        if barrier_index == 0 || usize::from(barrier_index) >= materials.len() {
            return Err(EnvError::InvalidConfig(
                "barrier_index must select a non-background material",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![BACKGROUND; (width as usize) * (height as usize)],
            materials,
            barrier_index,
        })
    }

    /// Background-filled grid sized and labelled from `config`.
    pub fn blank(config: &NavConfig) -> Result<Self, EnvError> {
        Self::new(
            config.world_width,
            config.world_height,
            config.materials.clone(),
            config.barrier_index,
        )
    }

    /// Default world: a one-cell wall ring of material 1 around an open interior.
    pub fn with_wall_ring(config: &NavConfig) -> Result<Self, EnvError> {
        let mut grid = Self::blank(config)?;
        let (w, h) = (grid.width as i32, grid.height as i32);
        for x in 0..w {
            grid.set(GridPos::new(x, 0), 1)?;
            grid.set(GridPos::new(x, h - 1), 1)?;
        }
        for y in 0..h {
            grid.set(GridPos::new(0, y), 1)?;
            grid.set(GridPos::new(w - 1, y), 1)?;
        }
        grid.set(grid.center(), BACKGROUND)?;
        Ok(grid)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn barrier_index(&self) -> u16 {
        self.barrier_index
    }

    #[must_use]
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Raw cell storage in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    /// Center cell of the grid.
    #[must_use]
    pub const fn center(&self) -> GridPos {
        GridPos::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Name of material `index`, if defined.
    #[must_use]
    pub fn material_name(&self, index: u16) -> Option<&str> {
        self.materials.get(usize::from(index)).map(String::as_str)
    }

    /// Index of the material called `name`.
    #[must_use]
    pub fn material_index(&self, name: &str) -> Option<u16> {
        self.materials
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|idx| u16::try_from(idx).ok())
    }

    /// Whether `material` blocks forward movement.
    #[must_use]
    pub const fn is_barrier(&self, material: u16) -> bool {
        material > BACKGROUND && material <= self.barrier_index
    }

    #[must_use]
    pub const fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    #[inline]
    fn offset(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Material at `pos`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, pos: GridPos) -> Option<u16> {
        self.in_bounds(pos).then(|| self.cells[self.offset(pos)])
    }

    /// Closest passable cell to `from` by Chebyshev distance, scanning each ring row by row.
    #[must_use]
    pub fn nearest_passable(&self, from: GridPos) -> Option<GridPos> {
        let reach = self.width.max(self.height) as i32;
        for radius in 0..=reach {
            for y in from.y - radius..=from.y + radius {
                for x in from.x - radius..=from.x + radius {
                    let pos = GridPos::new(x, y);
                    if pos.chebyshev(from) != radius {
                        continue;
                    }
                    if self.get(pos).is_some_and(|material| !self.is_barrier(material)) {
                        return Some(pos);
                    }
                }
            }
        }
        None
    }

    /// Material at `pos`, treating everything beyond the edge as the first barrier material.
    #[must_use]
    pub fn material_or_edge(&self, pos: GridPos) -> u16 {
        self.get(pos).unwrap_or(1)
    }

    /// Overwrite the material at `pos`.
    pub fn set(&mut self, pos: GridPos, material: u16) -> Result<(), EnvError> {
        if !self.in_bounds(pos) {
            return Err(EnvError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if usize::from(material) >= self.materials.len() {
            return Err(EnvError::UnknownMaterial(format!("#{material}")));
        }
        let idx = self.offset(pos);
        self.cells[idx] = material;
        Ok(())
    }

    /// Overwrite the material at `pos` using its name.
    pub fn set_by_name(&mut self, pos: GridPos, name: &str) -> Result<(), EnvError> {
        let material = self
            .material_index(name)
            .ok_or_else(|| EnvError::UnknownMaterial(name.to_string()))?;
        self.set(pos, material)
    }

    /// Fill the inclusive rectangle spanned by `from` and `to`.
    pub fn fill_rect(&mut self, from: GridPos, to: GridPos, material: u16) -> Result<(), EnvError> {
        for y in from.y.min(to.y)..=from.y.max(to.y) {
            for x in from.x.min(to.x)..=from.x.max(to.x) {
                self.set(GridPos::new(x, y), material)?;
            }
        }
        Ok(())
    }

    /// Place `count` cells of `material` on random background cells, avoiding the outer ring
    /// and the center. Returns how many cells were placed.
    pub fn scatter<R: Rng + ?Sized>(
        &mut self,
        material: u16,
        count: usize,
        rng: &mut R,
    ) -> Result<usize, EnvError> {
        if usize::from(material) >= self.materials.len() {
            return Err(EnvError::UnknownMaterial(format!("#{material}")));
        }
        let center = self.center();
        let (w, h) = (self.width as i32, self.height as i32);
        let mut free: Vec<GridPos> = (1..h - 1)
            .flat_map(|y| (1..w - 1).map(move |x| GridPos::new(x, y)))
            .filter(|&pos| pos != center && self.get(pos) == Some(BACKGROUND))
            .collect();
        let mut placed = 0;
        while placed < count && !free.is_empty() {
            let pick = rng.random_range(0..free.len());
            let pos = free.swap_remove(pick);
            let idx = self.offset(pos);
            self.cells[idx] = material;
            placed += 1;
        }
        Ok(placed)
    }

    /// Number of cells holding `material`.
    #[must_use]
    pub fn count(&self, material: u16) -> usize {
        self.cells.iter().filter(|&&cell| cell == material).count()
    }

    /// Iterate over one row of material indices.
    pub fn row(&self, y: u32) -> impl Iterator<Item = u16> + '_ {
        let start = (y as usize) * (self.width as usize);
        let end = if y < self.height {
            start + self.width as usize
        } else {
            start
        };
        self.cells[start.min(self.cells.len())..end.min(self.cells.len())]
            .iter()
            .copied()
    }

    /// Debug rendering: `.` for background, `#` for barriers, the material's first letter
    /// otherwise, and `@` at `agent` when supplied.
    #[must_use]
    pub fn render_ascii(&self, agent: Option<GridPos>) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.height as usize);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = GridPos::new(x, y);
                if agent == Some(pos) {
                    out.push('@');
                    continue;
                }
                let material = self.cells[self.offset(pos)];
                let glyph = if material == BACKGROUND {
                    '.'
                } else if self.is_barrier(material) {
                    '#'
                } else {
                    self.material_name(material)
                        .and_then(|name| name.chars().next())
                        .unwrap_or('?')
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    fn small_config() -> NavConfig {
        NavConfig {
            world_width: 5,
            world_height: 5,
            ..NavConfig::default()
        }
    }

    #[test]
    fn wall_ring_surrounds_open_interior() {
        let grid = WorldGrid::with_wall_ring(&small_config()).expect("grid");
        assert_eq!(grid.count(1), 16);
        assert_eq!(grid.get(GridPos::new(0, 0)), Some(1));
        assert_eq!(grid.get(GridPos::new(4, 2)), Some(1));
        assert_eq!(grid.get(grid.center()), Some(BACKGROUND));
        assert_eq!(grid.get(GridPos::new(1, 1)), Some(BACKGROUND));
    }

    #[test]
    fn set_rejects_out_of_bounds_and_unknown_material() {
        let mut grid = WorldGrid::blank(&small_config()).expect("grid");
        assert_eq!(
            grid.set(GridPos::new(5, 0), 1),
            Err(EnvError::OutOfBounds { x: 5, y: 0 })
        );
        assert!(matches!(
            grid.set(GridPos::new(0, 0), 9),
            Err(EnvError::UnknownMaterial(_))
        ));
        grid.set_by_name(GridPos::new(2, 3), "Food").expect("food");
        assert_eq!(grid.get(GridPos::new(2, 3)), Some(2));
        assert!(grid.set_by_name(GridPos::new(2, 3), "Lava").is_err());
    }

    #[test]
    fn material_names_must_survive_the_map_format() {
        let names = |list: &[&str]| list.iter().map(|name| name.to_string()).collect::<Vec<_>>();
        assert!(WorldGrid::new(3, 3, names(&["", "Wall", "Moss"]), 1).is_ok());
        for bad in [
            names(&["Empty", "Wall", " Moss"]),
            names(&["Empty", "Wall", "Moss "]),
            names(&["Empty", "Wall", "Mo\tss"]),
            names(&["Empty", "Wall", "Moss\n"]),
            names(&["Empty", "Wall", "Mo\rss"]),
            names(&["Empty", "Wall", "Wall"]),
            names(&["Empty", "Wall", ""]),
        ] {
            assert!(
                matches!(WorldGrid::new(3, 3, bad.clone(), 1), Err(EnvError::InvalidConfig(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn nearest_passable_searches_outward() {
        let mut grid = WorldGrid::with_wall_ring(&small_config()).expect("grid");
        let center = grid.center();
        assert_eq!(grid.nearest_passable(center), Some(center));
        grid.set(center, 1).expect("wall");
        assert_eq!(grid.nearest_passable(center), Some(GridPos::new(1, 1)));
        grid.fill_rect(GridPos::new(1, 1), GridPos::new(3, 3), 1)
            .expect("fill");
        assert_eq!(grid.nearest_passable(center), None);
        grid.set(GridPos::new(0, 4), 3).expect("water");
        assert_eq!(grid.nearest_passable(center), Some(GridPos::new(0, 4)));
    }

    #[test]
    fn barrier_range_excludes_background_and_decorations() {
        let grid = WorldGrid::blank(&small_config()).expect("grid");
        assert!(!grid.is_barrier(BACKGROUND));
        assert!(grid.is_barrier(1));
        assert!(!grid.is_barrier(2));
        assert_eq!(grid.material_or_edge(GridPos::new(-1, 2)), 1);
    }

    #[test]
    fn scatter_avoids_ring_and_center() {
        let config = NavConfig {
            world_width: 9,
            world_height: 9,
            ..NavConfig::default()
        };
        let mut grid = WorldGrid::with_wall_ring(&config).expect("grid");
        let mut rng = SmallRng::seed_from_u64(11);
        let placed = grid.scatter(3, 100, &mut rng).expect("scatter");
        // 7x7 interior minus the center.
        assert_eq!(placed, 48);
        assert_eq!(grid.get(grid.center()), Some(BACKGROUND));
        assert_eq!(grid.count(1), 32);
    }

    #[test]
    fn ascii_rendering_marks_agent() {
        let grid = WorldGrid::with_wall_ring(&small_config()).expect("grid");
        let text = grid.render_ascii(Some(grid.center()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#####");
        assert_eq!(lines[2], "#.@.#");
    }
}
