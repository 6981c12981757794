//! End-to-end builds of a small project on disk.

use std::fs;
use std::path::Path;

use image::{GenericImageView, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use montage::cli::build::{build_project, BuildOptions};
use montage::cli::list::listings;
use montage::discovery::MANIFEST_FILENAME;
use montage::output::Printer;
use montage::{Cache, Capabilities, MontageError, Project, CACHE_VERSION};

const MANIFEST: &str = r#"
padding: 4
url: "/assets/:filename"
sass: app/styles
sprites:
  - source: "app/sprites/:name/*.png"
    to: "public/assets/:name-sprite.png"
  - source: "app/flags/**/*.png"
    name: flags
    padding: 0
"#;

fn image(root: &Path, relative: &str, width: u32, height: u32, colour: [u8; 4]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba(colour))
        .save(&path)
        .unwrap();
}

fn project_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(MANIFEST_FILENAME), MANIFEST).unwrap();

    image(dir.path(), "app/sprites/fry/a.png", 10, 10, [255, 0, 0, 255]);
    image(dir.path(), "app/sprites/fry/b.png", 6, 5, [0, 255, 0, 255]);
    image(dir.path(), "app/sprites/leela/eye.png", 8, 8, [0, 0, 255, 255]);
    image(dir.path(), "app/flags/eu/fr.png", 3, 2, [1, 1, 1, 255]);
    image(dir.path(), "app/flags/uk.png", 3, 2, [2, 2, 2, 255]);
    dir
}

fn options() -> BuildOptions {
    BuildOptions {
        optimise: false,
        ..BuildOptions::default()
    }
}

fn build(root: &Path) -> montage::cli::build::BuildReport {
    let project = Project::find(root).unwrap();
    build_project(&project, &options(), &Capabilities::none(), &Printer::new()).unwrap()
}

#[test]
fn builds_every_sprite_and_the_stylesheet() {
    let dir = project_dir();

    let report = build(dir.path());
    assert_eq!(report.built, vec!["fry", "leela", "flags"]);

    let fry = image::open(dir.path().join("public/assets/fry-sprite.png")).unwrap();
    assert_eq!(fry.dimensions(), (10, 19));
    assert_eq!(fry.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(fry.get_pixel(0, 12), Rgba([0, 0, 0, 0]));
    assert_eq!(fry.get_pixel(0, 14), Rgba([0, 255, 0, 255]));
    assert_eq!(fry.get_pixel(8, 14), Rgba([0, 0, 0, 0]));

    // Default `to` is used for the flags sprite
    let flags = image::open(dir.path().join("public/images/flags.png")).unwrap();
    assert_eq!(flags.dimensions(), (3, 4));

    let scss = fs::read_to_string(dir.path().join("app/styles/_montage.scss")).unwrap();
    assert!(scss.contains("$fry-sprite-url: url(\"/assets/fry-sprite.png\");"));
    assert!(scss.contains("\"b\": 14px,"));
    assert!(scss.contains("$flags-sprite-url: url(\"/assets/flags.png\");"));
    assert!(scss.contains("\"uk\": 2px,"));
}

#[test]
fn rebuilds_only_what_changed() {
    let dir = project_dir();
    build(dir.path());

    let untouched = build(dir.path());
    assert!(untouched.built.is_empty());
    assert_eq!(untouched.fresh.len(), 3);

    image(dir.path(), "app/sprites/leela/eye.png", 8, 9, [0, 0, 255, 255]);
    let changed = build(dir.path());
    assert_eq!(changed.built, vec!["leela"]);

    // Renaming a source changes the digest even though the bytes do not
    fs::rename(
        dir.path().join("app/flags/uk.png"),
        dir.path().join("app/flags/gb.png"),
    )
    .unwrap();
    let renamed = build(dir.path());
    assert_eq!(renamed.built, vec!["flags"]);
}

#[test]
fn finds_the_project_from_a_subdirectory() {
    let dir = project_dir();

    let report = build(&dir.path().join("app/sprites/fry"));

    assert_eq!(report.built.len(), 3);
}

#[test]
fn cache_survives_between_runs() {
    let dir = project_dir();
    build(dir.path());

    let cache = Cache::load(dir.path().join(".montage_cache")).unwrap();
    assert_eq!(cache.store().cache_version, CACHE_VERSION);
    assert_eq!(
        cache.store().sprites.keys().collect::<Vec<_>>(),
        vec!["flags", "fry", "leela"]
    );
    assert_eq!(
        cache.store().paths.keys().collect::<Vec<_>>(),
        vec!["app/styles/_montage.scss"]
    );

    let project = Project::find(dir.path()).unwrap();
    assert!(listings(&project).unwrap().iter().all(|l| l.fresh));
}

#[test]
fn stale_cache_version_rebuilds_everything() {
    let dir = project_dir();
    build(dir.path());

    fs::write(
        dir.path().join(".montage_cache"),
        "cache_version: 1\nsprites: {}\n",
    )
    .unwrap();

    let report = build(dir.path());
    assert_eq!(report.built.len(), 3);
}

#[test]
fn missing_name_is_reported_before_building() {
    let dir = project_dir();
    fs::write(
        dir.path().join(MANIFEST_FILENAME),
        "sprites:\n  - source: \"app/flags/*.png\"\n",
    )
    .unwrap();

    let err = Project::find(dir.path()).unwrap_err();

    assert!(matches!(err, MontageError::MissingName { .. }));
    assert!(!dir.path().join("public").exists());
}
