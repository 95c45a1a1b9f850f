use std::fs;
use std::path::{Path, PathBuf};

/// Unit cube centred on the origin, quads left for the loader to triangulate
pub const CUBE_OBJ: &str = "\
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 3 4 8 7
f 2 3 7 6
f 1 5 8 4
";

pub fn write_cube(dir: &Path) -> PathBuf {
    let path = dir.join("cube.obj");
    fs::write(&path, CUBE_OBJ).unwrap();
    path
}
