//! Source-level architecture checks for the courier core.
//!
//! These walk the core crate's sources and fail on patterns that violate
//! the layering the crate promises: a headless core, network access
//! confined to the transport layer, and no blocking sleeps that would
//! stall the cooperative scheduler.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Root of the courier core sources, resolved relative to this crate
fn core_src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../courier/core/src")
        .canonicalize()
        .expect("courier core sources must exist")
}

/// Collect every Rust source file under the core crate
fn core_sources() -> Vec<(PathBuf, String)> {
    WalkDir::new(core_src_dir())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| {
            let content = std::fs::read_to_string(e.path())
                .unwrap_or_else(|err| panic!("failed to read {}: {err}", e.path().display()));
            (e.path().to_path_buf(), content)
        })
        .collect()
}

#[test]
fn core_has_no_ui_framework_imports() {
    let forbidden = ["ratatui", "crossterm", "eframe", "egui", "tauri", "gtk"];
    for (path, content) in core_sources() {
        for framework in forbidden {
            assert!(
                !content.contains(&format!("use {framework}")),
                "{} imports UI framework `{framework}`; the core must stay headless",
                path.display()
            );
        }
    }
}

#[test]
fn network_io_stays_inside_transport() {
    for (path, content) in core_sources() {
        let in_transport = path
            .components()
            .any(|c| c.as_os_str() == "transport");
        if !in_transport && content.contains("reqwest::") {
            panic!(
                "{} touches reqwest outside the transport layer",
                path.display()
            );
        }
    }
}

#[test]
fn no_blocking_sleep_on_the_runtime() {
    for (path, content) in core_sources() {
        assert!(
            !content.contains("std::thread::sleep"),
            "{} blocks the async runtime with std::thread::sleep",
            path.display()
        );
    }
}

#[test]
fn core_sources_are_present() {
    let expected = [
        "lib.rs",
        "controller.rs",
        "frame.rs",
        "notifications.rs",
        "timeout.rs",
        "config.rs",
    ];
    let sources = core_sources();
    for name in expected {
        assert!(
            sources
                .iter()
                .any(|(path, _)| path.file_name().is_some_and(|f| f == name)),
            "expected core source file {name} is missing"
        );
    }
}
