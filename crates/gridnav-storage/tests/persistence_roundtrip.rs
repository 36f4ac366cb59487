use gridnav_core::{Action, BACKGROUND, EnvError, GridPos, NavConfig, PatternTable, Tensor2, WorldGrid};
use gridnav_storage::{StorageError, load_map, load_patterns, save_map, save_patterns};
use rand::{SeedableRng, rngs::SmallRng};
use std::fs;
use tempfile::tempdir;

fn config() -> NavConfig {
    NavConfig {
        world_width: 12,
        world_height: 9,
        rng_seed: Some(11),
        ..NavConfig::default()
    }
}

fn furnished_world(config: &NavConfig) -> WorldGrid {
    let mut rng = SmallRng::seed_from_u64(31);
    let mut world = WorldGrid::with_wall_ring(config).expect("world");
    world
        .fill_rect(GridPos::new(3, 2), GridPos::new(4, 5), 1)
        .expect("inner wall");
    world.scatter(2, 6, &mut rng).expect("food");
    world.scatter(3, 4, &mut rng).expect("water");
    world
}

#[test]
fn map_round_trips_exactly() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("world.map");
    let config = config();
    let world = furnished_world(&config);

    save_map(&path, &world).expect("save");
    let report = load_map(&path, &config).expect("load");

    assert!(report.is_clean());
    assert_eq!(report.world, world);
    for material in 0..config.materials.len() as u16 {
        assert_eq!(report.world.count(material), world.count(material));
    }
    assert_eq!(report.world.get(world.center()), Some(BACKGROUND));
}

#[test]
fn unknown_materials_fall_back_to_background() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("lava.map");
    fs::write(&path, "Wall\tWall\tWall\nWall\tLava\tFood\nWall\tWall\tWall\n").expect("write");

    let report = load_map(&path, &config()).expect("load");

    assert_eq!(report.unknown.len(), 1);
    assert_eq!(report.unknown[0].pos, GridPos::new(1, 1));
    assert_eq!(report.unknown[0].name, "Lava");
    assert_eq!(report.world.get(GridPos::new(1, 1)), Some(BACKGROUND));
    assert_eq!(report.world.get(GridPos::new(2, 1)), Some(2));
}

#[test]
fn missing_map_reports_io_error() {
    let dir = tempdir().expect("tempdir");
    let err = load_map(dir.path().join("absent.map"), &config()).expect_err("missing");
    assert!(matches!(err, StorageError::Io(_)));
}

#[test]
fn pattern_table_round_trips() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("patterns.json");
    let config = config();
    let mut rng = SmallRng::seed_from_u64(2);
    let patterns = PatternTable::generate(&config, &mut rng);

    save_patterns(&path, &patterns).expect("save");
    let loaded = load_patterns(&path, &config).expect("load");

    assert_eq!(loaded, patterns);
    assert!(loaded.action(Action::Forward).is_some());
    assert!(loaded.material("Water").is_some());
}

#[test]
fn pattern_shape_mismatch_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("patterns.json");
    let config = config();
    let mut rng = SmallRng::seed_from_u64(2);
    let mut patterns = PatternTable::generate(&config, &mut rng);
    patterns
        .actions
        .insert("Left".to_string(), Tensor2::zeros([2, 3]));

    save_patterns(&path, &patterns).expect("save");
    let err = load_patterns(&path, &config).expect_err("shape");

    match err {
        StorageError::Env(EnvError::ShapeMismatch {
            name,
            expected,
            found,
        }) => {
            assert_eq!(name, "Left");
            assert_eq!(expected, config.action_pattern_shape);
            assert_eq!(found, [2, 3]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pattern_values_must_match_declared_shape() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    fs::write(
        &path,
        r#"{ "actions": { "Left": { "shape": [2, 2], "values": [1.0] } } }"#,
    )
    .expect("write");

    let err = load_patterns(&path, &config()).expect_err("length");
    assert!(matches!(err, StorageError::Json(_)));
}

#[test]
fn missing_pattern_entries_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("sparse.json");
    fs::write(&path, r#"{ "materials": {}, "actions": {} }"#).expect("write");

    let err = load_patterns(&path, &config()).expect_err("missing");
    assert!(matches!(
        err,
        StorageError::Env(EnvError::MissingPattern(_))
    ));
}

#[test]
fn oversized_pattern_shape_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("huge.json");
    fs::write(
        &path,
        r#"{ "actions": { "Left": { "shape": [9223372036854775808, 2], "values": [] } } }"#,
    )
    .expect("write");

    let err = load_patterns(&path, &config()).expect_err("overflow");
    assert!(matches!(err, StorageError::Json(_)));
}

#[test]
fn padded_material_names_cannot_reach_the_map_format() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("moss.map");
    fs::write(&path, "Wall\tWall\tWall\nWall\tMoss\tWall\nWall\tWall\tWall\n").expect("write");
    let config = NavConfig {
        materials: vec!["Empty".into(), "Wall".into(), " Moss".into()],
        ..config()
    };

    assert!(config.validate().is_err());
    let err = load_map(&path, &config).expect_err("padded name");
    assert!(matches!(
        err,
        StorageError::Env(EnvError::InvalidConfig(_))
    ));
}
