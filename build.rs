use std::env;
use std::path::{Path, PathBuf};

const FFMPEG_VARS: &[&str] = &["FFMPEG_DIR", "PKG_CONFIG_PATH", "VCPKG_ROOT", "VCPKGRS_TRIPLET"];
const OPENCV_VARS: &[&str] = &[
    "OPENCV_LINK_LIBS",
    "OPENCV_LINK_PATHS",
    "OPENCV_INCLUDE_PATHS",
    "OPENCV_PACKAGE_NAME",
    "LIBCLANG_PATH",
];

fn main() {
    for name in FFMPEG_VARS.iter().chain(OPENCV_VARS) {
        println!("cargo:rerun-if-env-changed={name}");
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        check_windows_ffmpeg();
    }

    if env::var_os("CARGO_FEATURE_OPENCV").is_some() {
        check_opencv(&target_os);
    }
}

/// ffmpeg-next finds FFmpeg through pkg-config everywhere except Windows,
/// where a vcpkg install has to be pointed at explicitly.
fn check_windows_ffmpeg() {
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=FFMPEG_DIR is not set. On Windows, install FFmpeg via vcpkg and set FFMPEG_DIR to its installed triplet directory."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    report_candidate("FFmpeg", "FFMPEG_DIR", &candidate);
}

/// The opencv crate generates bindings with libclang and probes for OpenCV
/// at build time; surface the usual misconfiguration early.
fn check_opencv(target_os: &str) {
    if target_os == "windows"
        && env::var_os("OPENCV_LINK_LIBS").is_none()
        && env::var_os("VCPKG_ROOT").is_none()
    {
        println!(
            "cargo:warning=The opencv feature needs OPENCV_LINK_LIBS, OPENCV_LINK_PATHS and OPENCV_INCLUDE_PATHS (or a vcpkg install with the stitching module)."
        );
    }

    if let Some(path) = env::var_os("LIBCLANG_PATH") {
        let path = PathBuf::from(path);
        if !path.exists() {
            println!(
                "cargo:warning=LIBCLANG_PATH points to {}, which does not exist.",
                path.display()
            );
        }
    }
}

fn report_candidate(library: &str, variable: &str, candidate: &Path) {
    if candidate.exists() {
        println!(
            "cargo:warning=Detected vcpkg {library} at {}. Set {variable}={} to make discovery explicit.",
            candidate.display(),
            candidate.display(),
        );
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but no {library} install was found at {}.",
            candidate.display(),
        );
    }
}
