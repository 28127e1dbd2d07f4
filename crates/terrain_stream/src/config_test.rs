use std::io::Write;

use super::*;

// =========================================================================
// Batch 1: Defaults
// =========================================================================

/// Default settings pass validation.
#[test]
fn test_defaults_are_valid() {
  let settings = Settings::default();
  assert!(settings.validate().is_ok());
  assert_eq!(settings.tile_resolution, 65);
  assert_eq!(settings.polyhedron, Polyhedron::Triacontahedron);
  assert_eq!(settings.max_level, 23);
}

/// An empty document yields the defaults.
#[test]
fn test_empty_toml_is_default() {
  let settings = Settings::from_toml_str("").unwrap();
  assert_eq!(settings, Settings::default());
}

/// Fields not named in the document keep their defaults.
#[test]
fn test_partial_toml_overrides_named_fields() {
  let settings = Settings::from_toml_str(
    r#"
    planet_radius = 1737400.0
    cache_main_node_size = 512
    data_manager_fetch_requests_per_frame = 4
    polyhedron = "cube"
    "#,
  )
  .unwrap();
  assert_eq!(settings.planet_radius, 1_737_400.0);
  assert_eq!(settings.cache_main_node_size, 512);
  assert_eq!(settings.data_manager_fetch_requests_per_frame, 4);
  assert_eq!(settings.polyhedron, Polyhedron::Cube);
  assert_eq!(settings.cache_gpu_geometry_size, 1024);
}

// =========================================================================
// Batch 2: Rejection
// =========================================================================

/// Misspelled keys are rejected rather than silently ignored.
#[test]
fn test_unknown_key_is_parse_error() {
  let err = Settings::from_toml_str("cache_main_size = 4").unwrap_err();
  assert!(matches!(err, TerrainError::SettingsParse(_)), "{err}");
}

#[test]
fn test_unknown_polyhedron_is_parse_error() {
  let err = Settings::from_toml_str(r#"polyhedron = "icosahedron""#).unwrap_err();
  assert!(matches!(err, TerrainError::SettingsParse(_)));
}

#[test]
fn test_out_of_range_values_are_invalid() {
  for text in [
    "planet_radius = 0.0",
    "vertical_scale = -1.0",
    "tile_resolution = 1",
    "cache_gpu_geometry_size = 0",
    "max_level = 24",
    "lod_scale = 0.0",
  ] {
    let err = Settings::from_toml_str(text).unwrap_err();
    assert!(matches!(err, TerrainError::InvalidSettings(_)), "{text}: {err}");
  }
}

// =========================================================================
// Batch 3: Files and derived values
// =========================================================================

#[test]
fn test_load_from_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "tile_resolution = 33\nmax_splits_per_frame = 8").unwrap();
  let settings = Settings::load(file.path()).unwrap();
  assert_eq!(settings.tile_resolution, 33);
  assert_eq!(settings.refinement_budget().max_splits, 8);
  assert_eq!(settings.frustum_lod().tile_resolution, 33);
}

#[test]
fn test_missing_file_is_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let err = Settings::load(&dir.path().join("absent.toml")).unwrap_err();
  assert!(matches!(err, TerrainError::SettingsIo { .. }));
}
