//! Facts about the host the configuration is generated for

use std::str::FromStr;

/// Host operating system family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Os {
    #[default]
    Linux,
    Windows,
}

/// Platform facts consumed by validation, defaults and rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFacts {
    /// Operating system family
    pub os: Os,
    /// Whether an NVIDIA GPU is attached
    pub has_nvidia_gpu: bool,
    /// Distribution the agent was built for (e.g. `bookworm`)
    pub build_distro: String,
    /// Short OS name (e.g. `debian`)
    pub short_name: String,
    /// Short OS version (e.g. `12`)
    pub short_version: String,
}

impl PlatformFacts {
    /// Facts for an operating system with otherwise empty details
    pub fn new(os: Os) -> Self {
        Self {
            os,
            has_nvidia_gpu: false,
            build_distro: String::new(),
            short_name: String::new(),
            short_version: String::new(),
        }
    }

    /// Facts for the operating system this binary was compiled for
    pub fn current() -> Self {
        Self::new(if cfg!(windows) { Os::Windows } else { Os::Linux })
    }

    /// Key selecting the built-in configuration (`linux`, `linux_gpu` or `windows`)
    pub fn key(&self) -> String {
        if self.has_nvidia_gpu {
            format!("{}_gpu", self.os)
        } else {
            self.os.to_string()
        }
    }

    /// Whether the host runs Windows
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl Default for PlatformFacts {
    fn default() -> Self {
        Self::new(Os::Linux)
    }
}

impl FromStr for PlatformFacts {
    type Err = String;

    /// Parse a platform key as produced by [`PlatformFacts::key`]
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let (os, gpu) = match key.strip_suffix("_gpu") {
            Some(os) => (os, true),
            None => (key, false),
        };
        let os = Os::from_str(os).map_err(|_| format!("unknown platform {key:?}"))?;

        Ok(Self {
            has_nvidia_gpu: gpu,
            ..Self::new(os)
        })
    }
}
