//! Shared test helpers and utilities

#![allow(dead_code)]

use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Module built by the default fixture target
pub(crate) const TARGET: &str = "aimbot.xwayland_capture";

/// ABI tag appended by the fake build tool
pub(crate) const MODULE_TAG: &str = "cpython-312-x86_64-linux-gnu.so";

/// Environment variables that would leak the developer's setup into a run
const ISOLATED_VARS: &[&str] = &[
    "CMAKE",
    "PYTHON",
    "PYTHONPATH",
    "EXTBUILD_CONFIG",
    "EXTBUILD_STUBGEN",
    "EXTBUILD_JOBS",
    "EXTBUILD_FORCE",
    "CC",
    "CXX",
    "CFLAGS",
    "CXXFLAGS",
    "LDFLAGS",
];

/// Path to the compiled extbuild binary
pub(crate) fn get_extbuild_binary() -> &'static str {
    env!("CARGO_BIN_EXE_extbuild")
}

/// Fake `cmake`
///
/// Logs every call to `cmake.log`. Configure remembers the library output
/// directory and leaves a generated `cmake_install.cmake` in the workspace;
/// build drops one module per line of `modules` into the output directory.
/// `fail-configure` / `fail-build` files make the phase fail.
fn fake_cmake(root: &Path) -> String {
    let root = root.display();
    format!(
        r##"#!/bin/sh
echo "$*" >> "{root}/cmake.log"
if [ "$1" = "--build" ]; then
  if [ -f "{root}/fail-build" ]; then
    echo "capture.cpp:3: error: expected ';'" >&2
    exit 2
  fi
  for m in $(cat "{root}/modules"); do
    touch "$(cat .outdir)/$m.{MODULE_TAG}"
  done
else
  if [ -f "{root}/fail-configure" ]; then
    echo "CMake Error: Could not find pybind11" >&2
    exit 1
  fi
  echo "# generated" > cmake_install.cmake
  for arg in "$@"; do
    case "$arg" in
      -DCMAKE_LIBRARY_OUTPUT_DIRECTORY=*) echo "${{arg#*=}}" > .outdir ;;
    esac
  done
fi
"##
    )
}

/// Fake stub tool
///
/// Logs `args|PYTHONPATH` to `stubgen.log` and writes `<out>/<pkg>/<mod>.pyi`.
/// Modules listed in `stubgen.fail` exit non-zero instead.
fn fake_stubgen(root: &Path) -> String {
    let root = root.display();
    format!(
        r#"#!/bin/sh
echo "$*|$PYTHONPATH" >> "{root}/stubgen.log"
mod="$1"
out="$3"
if [ -f "{root}/stubgen.fail" ] && grep -qx "$mod" "{root}/stubgen.fail"; then
  echo "ImportError: cannot import $mod" >&2
  exit 1
fi
path=$(echo "$mod" | tr . /)
mkdir -p "$out/$(dirname "$path")"
touch "$out/$path.pyi"
"#
    )
}

fn write_script(path: &Path, contents: &str) {
    fs::write(path, contents).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod script");
}

/// Temporary project with one C++ target and fake tools
///
/// ```text
/// extbuild.toml
/// cpp/CMakeLists.txt
/// cpp/capture.cpp
/// src/                 (package root)
/// bin/cmake, bin/stubgen
/// ```
pub(crate) struct Project {
    dir: TempDir,
}

impl Project {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();

        fs::create_dir_all(root.join("cpp")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("xdg")).unwrap();

        fs::write(
            root.join("cpp/CMakeLists.txt"),
            "cmake_minimum_required(VERSION 3.15)\nproject(xwayland_capture CXX)\n",
        )
        .unwrap();
        fs::write(root.join("cpp/capture.cpp"), "X").unwrap();
        fs::write(root.join("modules"), "xwayland_capture\n").unwrap();

        write_script(&root.join("bin/cmake"), &fake_cmake(root));
        write_script(&root.join("bin/stubgen"), &fake_stubgen(root));

        let project = Self { dir };
        project.write_config("");
        project
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write `extbuild.toml` with the fixture target, `extra` goes before it
    pub(crate) fn write_config(&self, extra: &str) {
        self.write_config_with_source(extra, "cpp");
    }

    /// Same as `write_config` with the target's sources at `source_dir`
    pub(crate) fn write_config_with_source(&self, extra: &str, source_dir: &str) {
        let config = format!(
            r#"package_root = "src"
stub_dir = "typings"
{extra}

[tools]
cmake = "bin/cmake"
stubgen = "bin/stubgen"

[[target]]
name = "{TARGET}"
source_dir = "{source_dir}"
"#
        );
        fs::write(self.path("extbuild.toml"), config).unwrap();
    }

    /// Run extbuild in the project root with an isolated environment
    pub(crate) fn run(&self, args: &[&str]) -> Output {
        self.run_with_env::<&str>(args, &[])
    }

    /// Run extbuild with `envs` set on top of the isolated environment
    pub(crate) fn run_with_env<V: AsRef<OsStr>>(
        &self,
        args: &[&str],
        envs: &[(&str, V)],
    ) -> Output {
        let mut cmd = Command::new(get_extbuild_binary());
        cmd.args(args)
            .current_dir(self.root())
            .env("XDG_CONFIG_HOME", self.path("xdg"));
        for var in ISOLATED_VARS {
            cmd.env_remove(var);
        }
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.output().expect("Failed to run extbuild")
    }

    /// Executable script at `rel` that does nothing
    pub(crate) fn install_tool(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        write_script(&path, "#!/bin/sh\nexit 0\n");
        path
    }

    /// Compiled module produced for the fixture target
    pub(crate) fn artifact(&self) -> PathBuf {
        self.path(&format!("src/aimbot/xwayland_capture.{MODULE_TAG}"))
    }

    /// Cache record of the fixture target
    pub(crate) fn cache_record(&self) -> PathBuf {
        self.path(&format!("build/extbuild/{TARGET}/.source-fingerprint"))
    }

    /// Logged tool invocations, one per line (empty if never called)
    pub(crate) fn log(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.path(name))
            .map(|s| s.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    pub(crate) fn clear_logs(&self) {
        for name in ["cmake.log", "stubgen.log"] {
            fs::remove_file(self.path(name)).ok();
        }
    }
}

pub(crate) fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub(crate) fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
