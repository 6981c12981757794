//! SCSS generation.
//!
//! For each sprite the stylesheet declares the sprite's URL, a map of
//! source name to vertical offset, and a mixin which positions the sprite
//! background on a given source:
//!
//! ```scss
//! .icon { @include fry-sprite("two"); }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{MontageError, Result};
use crate::sprite::Sprite;

const HEADER: &str = "// Generated by montage. Changes will be overwritten.\n";

/// Render the stylesheet for `sprites`, ordered by sprite name.
pub fn render(sprites: &[Sprite]) -> Result<String> {
    let mut ordered: Vec<&Sprite> = sprites.iter().collect();
    ordered.sort_by(|a, b| a.name().cmp(b.name()));

    let mut scss = String::from(HEADER);

    for sprite in ordered {
        let name = sprite.name();
        let positions = sprite.positions()?;

        scss.push('\n');
        scss.push_str(&format!("${}-sprite-url: url(\"{}\");\n", name, sprite.url()));
        scss.push_str(&format!("${}-sprite-positions: (\n", name));
        let mut seen = HashSet::new();
        for (source, position) in sprite.sources().iter().zip(positions) {
            // A repeated name would be a duplicate map key; the first wins
            if !seen.insert(source.name()) {
                continue;
            }
            scss.push_str(&format!("  \"{}\": {}px,\n", source.name(), position));
        }
        scss.push_str(");\n\n");

        scss.push_str(&format!(
            "@mixin {}-sprite($source, $offset-x: 0px, $offset-y: 0px) {{\n",
            name
        ));
        scss.push_str(&format!(
            "  background: ${name}-sprite-url $offset-x ($offset-y - map-get(${name}-sprite-positions, $source)) no-repeat;\n"
        ));
        scss.push_str("}\n");
    }

    Ok(scss)
}

/// Render the stylesheet and write it to `path`.
pub fn write(path: &Path, sprites: &[Sprite]) -> Result<()> {
    save(path, &render(sprites)?)
}

/// Write already rendered `scss` to `path`, creating parent directories.
pub fn save(path: &Path, scss: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MontageError::write_failed(parent, e))?;
    }
    fs::write(path, scss).map_err(|e| MontageError::write_failed(path, e))
}
