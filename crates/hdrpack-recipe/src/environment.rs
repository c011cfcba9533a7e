//! Target environment model and profile files.
//!
//! A profile is a TOML file describing one environment a package is built
//! for:
//!
//! ```toml
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! build_type = "Release"
//!
//! [settings.compiler]
//! name = "gcc"
//! version = "12"
//! cppstd = "20"
//!
//! [conf]
//! skip_test = false
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RecipeError, Result};
use crate::version::CompilerVersion;

/// A C++ language standard level, optionally with GNU extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CppStd {
    year: u16,
    gnu: bool,
}

impl CppStd {
    /// Build a standard from its two-digit level (`98`, `11`, ... `26`).
    pub fn new(level: u16) -> Result<Self> {
        let year = match level {
            98 => 1998,
            3 | 11 | 14 | 17 | 20 | 23 | 26 => 2000 + level,
            _ => return Err(RecipeError::InvalidStandard(level.to_string())),
        };
        Ok(CppStd { year, gnu: false })
    }

    /// Parse `"17"`, `"20"`, `"gnu20"`, `"03"`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (gnu, digits) = match trimmed.strip_prefix("gnu") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if digits.len() != 2 {
            return Err(RecipeError::InvalidStandard(input.to_string()));
        }
        let level: u16 = digits
            .parse()
            .map_err(|_| RecipeError::InvalidStandard(input.to_string()))?;
        let mut parsed =
            CppStd::new(level).map_err(|_| RecipeError::InvalidStandard(input.to_string()))?;
        parsed.gnu = gnu;
        Ok(parsed)
    }

    /// The two-digit level, e.g. `"20"` or `"03"`.
    pub fn level(&self) -> String {
        format!("{:02}", self.year % 100)
    }

    /// Whether GNU extensions are requested.
    pub fn is_gnu(&self) -> bool {
        self.gnu
    }

    /// Whether this standard is numerically older than `other`.
    ///
    /// GNU extensions do not change the level.
    pub fn is_older_than(&self, other: &CppStd) -> bool {
        self.year < other.year
    }
}

impl fmt::Display for CppStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gnu {
            write!(f, "gnu{}", self.level())
        } else {
            f.write_str(&self.level())
        }
    }
}

impl FromStr for CppStd {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self> {
        CppStd::parse(s)
    }
}

impl Serialize for CppStd {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CppStd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u16),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => CppStd::parse(&s).map_err(serde::de::Error::custom),
            Raw::Number(n) => CppStd::new(n).map_err(serde::de::Error::custom),
        }
    }
}

/// The environment a build is requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    /// Compiler name (e.g., "gcc", "clang", "apple-clang", "msvc").
    pub compiler: String,
    /// Compiler version.
    pub compiler_version: CompilerVersion,
    /// Declared language standard, if any.
    #[serde(default)]
    pub cppstd: Option<CppStd>,
    /// Operating system (e.g., "Linux", "Windows", "Macos").
    pub os: String,
    /// Architecture (e.g., "x86_64", "armv8").
    pub arch: String,
    /// Build type (e.g., "Release", "Debug").
    #[serde(default)]
    pub build_type: Option<String>,
}

impl EnvironmentDescriptor {
    /// Whether this environment targets Windows.
    pub fn is_windows(&self) -> bool {
        self.os.eq_ignore_ascii_case("windows")
    }

    /// Whether this environment differs in os/arch from the machine running
    /// the tool.
    pub fn is_cross_building(&self) -> bool {
        let (host_os, host_arch) = host_platform();
        !self.os.eq_ignore_ascii_case(host_os) || !self.arch.eq_ignore_ascii_case(host_arch)
    }
}

/// The host os/arch in profile spelling.
pub fn host_platform() -> (&'static str, &'static str) {
    let os = match std::env::consts::OS {
        "linux" => "Linux",
        "windows" => "Windows",
        "macos" => "Macos",
        "freebsd" => "FreeBSD",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "aarch64" => "armv8",
        other => other,
    };
    (os, arch)
}

/// A parsed profile file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Environment settings.
    pub settings: ProfileSettings,
    /// Tool configuration.
    #[serde(default)]
    pub conf: ProfileConf,
}

/// The `[settings]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub os: String,
    pub arch: String,
    #[serde(default)]
    pub build_type: Option<String>,
    pub compiler: CompilerSettings,
}

/// The `[settings.compiler]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerSettings {
    pub name: String,
    pub version: CompilerVersion,
    #[serde(default)]
    pub cppstd: Option<CppStd>,
}

/// The `[conf]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConf {
    /// Skip building and running the unit tests.
    #[serde(default)]
    pub skip_test: bool,
}

impl Profile {
    /// Parse a profile from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(input)?;

        if profile.settings.compiler.name.trim().is_empty() {
            return Err(RecipeError::InvalidProfile {
                detail: "settings.compiler.name is required".to_string(),
            });
        }
        if profile.settings.os.trim().is_empty() || profile.settings.arch.trim().is_empty() {
            return Err(RecipeError::InvalidProfile {
                detail: "settings.os and settings.arch are required".to_string(),
            });
        }

        Ok(profile)
    }

    /// Load a profile from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// The environment this profile describes.
    pub fn environment(&self) -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            compiler: self.settings.compiler.name.clone(),
            compiler_version: self.settings.compiler.version.clone(),
            cppstd: self.settings.compiler.cppstd,
            os: self.settings.os.clone(),
            arch: self.settings.arch.clone(),
            build_type: self.settings.build_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_standards() {
        assert_eq!(CppStd::parse("20").unwrap().level(), "20");
        assert_eq!(CppStd::parse("03").unwrap().level(), "03");
        let gnu = CppStd::parse("gnu17").unwrap();
        assert!(gnu.is_gnu());
        assert_eq!(gnu.to_string(), "gnu17");
        assert!(CppStd::parse("2a").is_err());
        assert!(CppStd::parse("19").is_err());
        assert!(CppStd::parse("").is_err());
        assert!(CppStd::parse("gnu").is_err());
    }

    #[test]
    fn standard_ordering_treats_98_as_oldest() {
        let s98 = CppStd::parse("98").unwrap();
        let s03 = CppStd::parse("03").unwrap();
        let s17 = CppStd::parse("17").unwrap();
        let s20 = CppStd::parse("20").unwrap();
        assert!(s98.is_older_than(&s03));
        assert!(s03.is_older_than(&s17));
        assert!(s17.is_older_than(&s20));
        assert!(!s20.is_older_than(&s17));
        assert!(!CppStd::parse("gnu20").unwrap().is_older_than(&s20));
    }

    #[test]
    fn parse_full_profile() {
        let input = r#"
[settings]
os = "Linux"
arch = "x86_64"
build_type = "Release"

[settings.compiler]
name = "gcc"
version = "12.2"
cppstd = "gnu20"

[conf]
skip_test = true
"#;
        let profile = Profile::parse(input).unwrap();
        assert!(profile.conf.skip_test);

        let env = profile.environment();
        assert_eq!(env.compiler, "gcc");
        assert_eq!(env.compiler_version.components(), &[12, 2]);
        assert_eq!(env.cppstd.unwrap().to_string(), "gnu20");
        assert_eq!(env.build_type.as_deref(), Some("Release"));
        assert!(!env.is_windows());
    }

    #[test]
    fn parse_minimal_profile_with_numeric_std() {
        let input = r#"
[settings]
os = "Windows"
arch = "x86_64"

[settings.compiler]
name = "msvc"
version = "193"
cppstd = 20
"#;
        let profile = Profile::parse(input).unwrap();
        assert!(!profile.conf.skip_test);
        let env = profile.environment();
        assert!(env.is_windows());
        assert_eq!(env.cppstd.unwrap().level(), "20");
        assert!(env.build_type.is_none());
    }

    #[test]
    fn reject_bad_profiles() {
        let bad_version = r#"
[settings]
os = "Linux"
arch = "x86_64"
[settings.compiler]
name = "gcc"
version = "twelve"
"#;
        assert!(Profile::parse(bad_version).is_err());

        let empty_compiler = r#"
[settings]
os = "Linux"
arch = "x86_64"
[settings.compiler]
name = ""
version = "12"
"#;
        assert!(matches!(
            Profile::parse(empty_compiler),
            Err(RecipeError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn host_environment_is_not_cross_building() {
        let (os, arch) = host_platform();
        let env = EnvironmentDescriptor {
            compiler: "gcc".to_string(),
            compiler_version: CompilerVersion::parse("12").unwrap(),
            cppstd: None,
            os: os.to_string(),
            arch: arch.to_string(),
            build_type: None,
        };
        assert!(!env.is_cross_building());

        let other = EnvironmentDescriptor {
            arch: "avr".to_string(),
            ..env
        };
        assert!(other.is_cross_building());
    }

    #[test]
    fn load_profile_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.toml");
        std::fs::write(
            &path,
            "[settings]\nos = \"Macos\"\narch = \"armv8\"\n[settings.compiler]\nname = \"apple-clang\"\nversion = \"14.0.0\"\n",
        )
        .unwrap();
        let env = Profile::load(&path).unwrap().environment();
        assert_eq!(env.compiler, "apple-clang");
        assert_eq!(env.os, "Macos");
    }
}
