#![allow(dead_code)]

use std::path::PathBuf;

use lumen::data::LumenCtx;

pub const BUILD_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

pub fn out_path(test_name: &str, file_name: &str) -> PathBuf {
    PathBuf::from(BUILD_DIR).join(format!("tests/{test_name}/{file_name}"))
}

pub fn setup_ctx() -> LumenCtx {
    LumenCtx::new().expect("failed to create context")
}
