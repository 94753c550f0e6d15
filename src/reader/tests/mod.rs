//! Tests for the file-level readers
//!
//! Fixtures are the five NumObs.txt records used throughout the crate.


use crate::filter::FilterConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub const HALL2: &str =
    "     Hall2    C1999 06 05.03484 17 47 47.64 -25 27 24.3          16.6 R      706";
pub const SHE001: &str =
    "     She001  2C1995 09 14.79817 23 29 42.54 -02 59 15.9          15.5 V      121";
pub const NUMBERED: &str =
    "     0000001  C2002 10 10.28966 01 45 43.18 +08 05 24.4                r     644";
pub const PROVISIONAL_K: &str =
    "     000007k ZC2009 07 12.38821 20 52 22.26 -16 47 54.1                r     I41";
pub const PROVISIONAL_M3: &str =
    "     00000m3 ZC2009 07 22.38815 20 45 14.31 -17 34 51.4          21.8 Rr     I41";

pub fn corpus_lines() -> Vec<&'static str> {
    vec![HALL2, SHE001, NUMBERED, PROVISIONAL_K, PROVISIONAL_M3]
}

/// The corpus as file content, one record per line
pub fn corpus_text() -> String {
    let mut text = corpus_lines().join("\n");
    text.push('\n');
    text
}

pub fn write_corpus(dir: &Path) -> PathBuf {
    let path = dir.join("NumObs.txt");
    fs::write(&path, corpus_text()).unwrap();
    path
}

/// Corpus with the day of the third record replaced by letters
pub fn corpus_with_bad_timestamp() -> String {
    let mut lines: Vec<String> = corpus_lines().into_iter().map(String::from).collect();
    lines[2].replace_range(23..25, "xx");
    lines.join("\n") + "\n"
}

pub fn sky_window_config() -> FilterConfig {
    FilterConfig::new()
        .with_sky_window(17.0, 21.0, -25.5, -15.0)
        .unwrap()
}
