//! Package identity for cache matching.
//!
//! Two build requests with equal identities can share one built package.
//! Header-only packages compile the same everywhere, so their identity
//! ignores the environment entirely.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::environment::EnvironmentDescriptor;

/// A content hash (SHA-256 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute the SHA-256 hash of the given data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex_encode(&hasher.finalize()))
    }

    /// Get the hex string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode bytes as lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// How a package's binaries depend on the build environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Declarations only; nothing is compiled into the package.
    #[default]
    HeaderOnly,
    /// Compiled binaries that vary with every setting.
    SettingsDependent,
}

/// The key a package cache matches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "hash", rename_all = "kebab-case")]
pub enum PackageIdentity {
    /// Shared by every environment.
    Universal,
    /// Hash over the environment settings.
    Settings(ContentHash),
}

impl PackageIdentity {
    /// Folder-safe name for this identity.
    pub fn as_str(&self) -> &str {
        match self {
            PackageIdentity::Universal => UNIVERSAL_ID,
            PackageIdentity::Settings(hash) => hash.as_str(),
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of every header-only package: the hash of no settings at all.
const UNIVERSAL_ID: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Reduce an environment to the identity of the package it would produce.
pub fn reduce_identity(kind: ArtifactKind, env: &EnvironmentDescriptor) -> PackageIdentity {
    match kind {
        ArtifactKind::HeaderOnly => PackageIdentity::Universal,
        ArtifactKind::SettingsDependent => {
            PackageIdentity::Settings(ContentHash::compute(&canonical_settings(env)))
        }
    }
}

/// Settings in a fixed field order, the way they are hashed.
#[derive(Serialize)]
struct CanonicalSettings<'a> {
    arch: &'a str,
    build_type: Option<&'a str>,
    compiler: &'a str,
    cppstd: Option<String>,
    compiler_version: &'a str,
    os: &'a str,
}

/// JSON encoding of the settings. Every value is quoted and escaped, so no
/// field can spell out another.
fn canonical_settings(env: &EnvironmentDescriptor) -> Vec<u8> {
    let settings = CanonicalSettings {
        arch: &env.arch,
        build_type: env.build_type.as_deref(),
        compiler: &env.compiler,
        cppstd: env.cppstd.map(|cppstd| cppstd.to_string()),
        compiler_version: env.compiler_version.as_str(),
        os: &env.os,
    };
    // Serializing plain strings and options cannot fail.
    serde_json::to_vec(&settings).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::CppStd;
    use crate::version::CompilerVersion;

    fn linux_gcc() -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            compiler: "gcc".to_string(),
            compiler_version: CompilerVersion::parse("12").unwrap(),
            cppstd: Some(CppStd::parse("20").unwrap()),
            os: "Linux".to_string(),
            arch: "x86_64".to_string(),
            build_type: Some("Release".to_string()),
        }
    }

    fn windows_msvc() -> EnvironmentDescriptor {
        EnvironmentDescriptor {
            compiler: "msvc".to_string(),
            compiler_version: CompilerVersion::parse("193").unwrap(),
            cppstd: None,
            os: "Windows".to_string(),
            arch: "armv8".to_string(),
            build_type: Some("Debug".to_string()),
        }
    }

    #[test]
    fn header_only_identity_ignores_environment() {
        let a = reduce_identity(ArtifactKind::HeaderOnly, &linux_gcc());
        let b = reduce_identity(ArtifactKind::HeaderOnly, &windows_msvc());
        assert_eq!(a, b);
        assert_eq!(a, PackageIdentity::Universal);
    }

    #[test]
    fn settings_identity_tracks_environment() {
        let a = reduce_identity(ArtifactKind::SettingsDependent, &linux_gcc());
        let b = reduce_identity(ArtifactKind::SettingsDependent, &windows_msvc());
        let again = reduce_identity(ArtifactKind::SettingsDependent, &linux_gcc());
        assert_ne!(a, b);
        assert_eq!(a, again);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn settings_identity_sees_build_type() {
        let release = linux_gcc();
        let debug = EnvironmentDescriptor {
            build_type: Some("Debug".to_string()),
            ..linux_gcc()
        };
        assert_ne!(
            reduce_identity(ArtifactKind::SettingsDependent, &release),
            reduce_identity(ArtifactKind::SettingsDependent, &debug)
        );
    }

    #[test]
    fn settings_cannot_spell_out_other_fields() {
        let forged = EnvironmentDescriptor {
            os: "Linux\narch=armv8".to_string(),
            arch: "x86_64".to_string(),
            ..linux_gcc()
        };
        let honest = EnvironmentDescriptor {
            os: "Linux".to_string(),
            arch: "armv8".to_string(),
            ..linux_gcc()
        };
        assert_ne!(
            reduce_identity(ArtifactKind::SettingsDependent, &forged),
            reduce_identity(ArtifactKind::SettingsDependent, &honest)
        );
        assert_ne!(canonical_settings(&forged), canonical_settings(&honest));
    }

    #[test]
    fn universal_id_is_hash_of_nothing() {
        assert_eq!(ContentHash::compute(b"").as_str(), UNIVERSAL_ID);
        assert_eq!(PackageIdentity::Universal.to_string(), UNIVERSAL_ID);
    }

    #[test]
    fn identity_serializes_with_kind_tag() {
        let json = serde_json::to_value(PackageIdentity::Universal).unwrap();
        assert_eq!(json["kind"], "universal");
        let kind: ArtifactKind = serde_json::from_str("\"settings-dependent\"").unwrap();
        assert_eq!(kind, ArtifactKind::SettingsDependent);
    }
}
