//! File persistence for gridnav worlds and pattern tables.
//!
//! World maps are plain text: one line per row, tab-delimited cells, each cell holding a
//! material name or nothing for background. Pattern tables are JSON documents keyed by
//! material and action name.

use gridnav_core::{BACKGROUND, EnvError, GridPos, NavConfig, PatternTable, WorldGrid};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use thiserror::Error;
use tracing::{info, warn};

const FIELD_SEPARATOR: char = '\t';

/// Storage error wrapper.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Env(#[from] EnvError),
    /// A map row has a different number of cells than the first row.
    #[error("map line {line} has {found} cells, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// A map cell whose material name is not in the configured vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCell {
    pub pos: GridPos,
    pub name: String,
}

/// Result of loading a map: the grid plus every cell that fell back to background.
#[derive(Debug, Clone)]
pub struct MapLoadReport {
    pub world: WorldGrid,
    pub unknown: Vec<UnknownCell>,
}

impl MapLoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty()
    }
}

/// Render `world` in the text map format.
#[must_use]
pub fn format_map(world: &WorldGrid) -> String {
    let mut out = String::with_capacity(world.cells().len() * 4);
    for y in 0..world.height() {
        let mut first = true;
        for material in world.row(y) {
            if !first {
                out.push(FIELD_SEPARATOR);
            }
            first = false;
            if material != BACKGROUND {
                out.push_str(world.material_name(material).unwrap_or_default());
            }
        }
        out.push('\n');
    }
    out
}

/// Parse a text map against the material vocabulary of `config`.
///
/// Unknown names are logged and left as background.
pub fn parse_map(text: &str, config: &NavConfig) -> Result<MapLoadReport, StorageError> {
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(|line| line.trim_end_matches('\r').split(FIELD_SEPARATOR).collect())
        .collect();
    let width = rows.first().map_or(0, Vec::len);
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(StorageError::Ragged {
                line: idx + 1,
                expected: width,
                found: row.len(),
            });
        }
    }

    let mut world = WorldGrid::new(
        width as u32,
        rows.len() as u32,
        config.materials.clone(),
        config.barrier_index,
    )?;
    let mut unknown = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        for (x, field) in row.iter().enumerate() {
            let name = field.trim();
            if name.is_empty() {
                continue;
            }
            let pos = GridPos::new(x as i32, y as i32);
            match world.material_index(name) {
                Some(material) => world.set(pos, material)?,
                None => {
                    warn!(%pos, material = name, "unknown material in map; cell left as background");
                    unknown.push(UnknownCell {
                        pos,
                        name: name.to_string(),
                    });
                }
            }
        }
    }
    Ok(MapLoadReport { world, unknown })
}

/// Write `world` to `path` as a text map.
pub fn save_map(path: impl AsRef<Path>, world: &WorldGrid) -> Result<(), StorageError> {
    let path = path.as_ref();
    fs::write(path, format_map(world))?;
    info!(
        path = %path.display(),
        width = world.width(),
        height = world.height(),
        "saved world map"
    );
    Ok(())
}

/// Read a text map from `path`.
pub fn load_map(path: impl AsRef<Path>, config: &NavConfig) -> Result<MapLoadReport, StorageError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let report = parse_map(&text, config)?;
    info!(
        path = %path.display(),
        width = report.world.width(),
        height = report.world.height(),
        unknown = report.unknown.len(),
        "loaded world map"
    );
    Ok(report)
}

/// Write a pattern table to `path` as pretty-printed JSON.
pub fn save_patterns(path: impl AsRef<Path>, patterns: &PatternTable) -> Result<(), StorageError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, patterns)?;
    writer.flush()?;
    info!(path = %path.display(), "saved pattern table");
    Ok(())
}

/// Read a pattern table from `path`, checking every entry against `config`.
pub fn load_patterns(
    path: impl AsRef<Path>,
    config: &NavConfig,
) -> Result<PatternTable, StorageError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let patterns: PatternTable = serde_json::from_reader(reader)?;
    patterns.validate(&config.materials, config)?;
    info!(path = %path.display(), "loaded pattern table");
    Ok(patterns)
}
