//! Generators with fixed paths and version so outputs can be compared verbatim

use opsagent_confgen::{Generated, Generator, Paths};
use opsagent_config::{Os, PlatformFacts};

pub const LOGS_DIR: &str = "/logs";
pub const STATE_DIR: &str = "/state";

/// Generator for a plain Linux host
pub fn linux() -> Generator {
    for_platform(PlatformFacts::new(Os::Linux))
}

/// Generator for a Windows host
pub fn windows() -> Generator {
    for_platform(PlatformFacts::new(Os::Windows))
}

pub fn for_platform(platform: PlatformFacts) -> Generator {
    Generator::for_platform(platform, Paths::new(LOGS_DIR, STATE_DIR)).with_version("latest")
}

/// Generate on Linux, panicking with the full error text on failure
pub fn generate(raw: &str) -> Generated {
    linux().generate(raw).unwrap_or_else(|e| panic!("generation failed:\n{e}"))
}

/// Split a rendered engine file into its blank-line separated sections
pub fn sections(file: &str) -> Vec<&str> {
    file.trim_end().split("\n\n").collect()
}
