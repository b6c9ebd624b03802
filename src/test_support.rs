//! Stand-ins for ImageMagick and potrace used by unit tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Rasterizer stand-in: writes a stub bitmap to its last argument.
pub const TOUCH_LAST_ARG: &str = r#"for last; do :; done
printf 'BM' > "$last""#;

/// Tracer stand-in: writes a stub SVG to the path following `-o`.
pub const WRITE_AFTER_O: &str = r#"out=
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
printf '<svg xmlns="http://www.w3.org/2000/svg"/>' > "$out""#;

/// Always fails with a message on stderr.
pub const FAIL: &str = r#"echo boom >&2
exit 3"#;

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
