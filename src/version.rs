// Version normalization for the package managers we drive.
// Go encodes the major version in the module path, NuGet needs bracket syntax
// to pin an exact version.

use std::str::FromStr;

use crate::error::{InputError, Result};

pub const PUBLISHER_PLACEHOLDER: &str = "{publisher}";
pub const PROVIDER_PLACEHOLDER: &str = "{provider}";
pub const MODULE_SUFFIX_PLACEHOLDER: &str = "{moduleVersionSuffix}";

/// Parse the released provider version, echoing the raw input on failure.
pub fn parse_provider_version(input: &str) -> Result<semver::Version> {
    semver::Version::parse(input.trim()).map_err(|e| {
        InputError::InvalidProviderVersion {
            version: input.to_string(),
            error: e.to_string(),
        }
        .into()
    })
}

/// Leading numeric component of a dotted version string.
pub fn major_version(version: &str) -> Result<u64> {
    let leading = version.split('.').next().unwrap_or_default();
    leading.parse::<u64>().map_err(|e| {
        InputError::InvalidModuleVersion {
            version: version.to_string(),
            reason: format!("leading component {leading:?} is not numeric: {e}"),
        }
        .into()
    })
}

/// `/vN` for major versions 2 and up, empty otherwise.
pub fn module_version_suffix(major: u64) -> String {
    if major >= 2 {
        format!("/v{major}")
    } else {
        String::new()
    }
}

/// Expand a Go module path template such as
/// `github.com/{publisher}/pulumi-{provider}/sdk{moduleVersionSuffix}`.
///
/// Substitution is literal and every occurrence of each placeholder is replaced.
pub fn go_module_path(
    template: &str,
    publisher: &str,
    provider: &str,
    provider_version: &str,
) -> Result<String> {
    let suffix = module_version_suffix(major_version(provider_version)?);
    Ok(template
        .replace(PUBLISHER_PLACEHOLDER, publisher)
        .replace(PROVIDER_PLACEHOLDER, provider)
        .replace(MODULE_SUFFIX_PLACEHOLDER, &suffix))
}

/// Go module versions always carry a `v` prefix.
pub fn go_module_version(package_version: &str) -> String {
    if package_version.starts_with('v') {
        package_version.to_string()
    } else {
        format!("v{package_version}")
    }
}

/// NuGet exact-match range, so `dotnet add` never floats to a newer release.
pub fn dotnet_exact_version(version: &str) -> String {
    format!("[{version}]")
}

/// Whether a registry-reported version is exactly the requested one.
/// Both sides are compared as semver when they parse, ignoring a leading `v`.
pub fn same_version(reported: &str, requested: &str) -> bool {
    let parse = |v: &str| semver::Version::parse(v.trim().trim_start_matches('v'));
    match (parse(reported), parse(requested)) {
        (Ok(reported), Ok(requested)) => reported == requested,
        _ => reported.trim() == requested.trim(),
    }
}

/// PEP 440 equality, so pip's `4.17.0a1` matches a requested `4.17.0-alpha.1`.
pub fn same_pep440_version(listed: &str, requested: &str) -> bool {
    match (
        pep440_rs::Version::from_str(listed.trim()),
        pep440_rs::Version::from_str(requested.trim()),
    ) {
        (Ok(listed), Ok(requested)) => listed == requested,
        _ => listed.trim() == requested.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "github.com/{publisher}/pulumi-{provider}/sdk{moduleVersionSuffix}";

    #[test]
    fn test_major_version() {
        assert_eq!(major_version("4.16.2").unwrap(), 4);
        assert_eq!(major_version("0.1.0").unwrap(), 0);
        assert_eq!(major_version("12").unwrap(), 12);
        assert!(major_version("v4.16.2").is_err());
        assert!(major_version("").is_err());
    }

    #[test]
    fn test_suffix_threshold() {
        assert_eq!(module_version_suffix(0), "");
        assert_eq!(module_version_suffix(1), "");
        assert_eq!(module_version_suffix(2), "/v2");
        assert_eq!(module_version_suffix(5), "/v5");
    }

    #[test]
    fn test_go_module_path_applies_major_suffix() {
        assert_eq!(
            go_module_path(TEMPLATE, "pulumi", "random", "4.16.2").unwrap(),
            "github.com/pulumi/pulumi-random/sdk/v4"
        );
        assert_eq!(
            go_module_path(TEMPLATE, "pulumi", "random", "5.0.0").unwrap(),
            "github.com/pulumi/pulumi-random/sdk/v5"
        );
        assert_eq!(
            go_module_path(TEMPLATE, "pulumi", "random", "1.9.0").unwrap(),
            "github.com/pulumi/pulumi-random/sdk"
        );
    }

    #[test]
    fn test_go_module_path_is_order_independent() {
        let reordered = "{moduleVersionSuffix}|{provider}|{publisher}|{provider}";
        assert_eq!(
            go_module_path(reordered, "acme", "widgets", "3.0.0").unwrap(),
            "/v3|widgets|acme|widgets"
        );
    }

    #[test]
    fn test_go_module_version_prefix() {
        assert_eq!(go_module_version("4.16.2"), "v4.16.2");
        assert_eq!(go_module_version("v4.16.2"), "v4.16.2");
    }

    #[test]
    fn test_dotnet_exact_version() {
        assert_eq!(dotnet_exact_version("4.16.2"), "[4.16.2]");
        assert_eq!(dotnet_exact_version("4.16.2-alpha.1"), "[4.16.2-alpha.1]");
        assert_eq!(dotnet_exact_version("4.16.2+build.7"), "[4.16.2+build.7]");
    }

    #[test]
    fn test_parse_provider_version() {
        assert_eq!(
            parse_provider_version("4.16.2").unwrap(),
            semver::Version::new(4, 16, 2)
        );
        let err = parse_provider_version("not a version").unwrap_err();
        assert_eq!(err.to_string(), "Invalid provider version: not a version");
    }

    #[test]
    fn test_same_version_is_exact() {
        assert!(same_version("4.16.2", "4.16.2"));
        assert!(same_version("v4.16.2", "4.16.2"));
        assert!(!same_version("14.16.2", "4.16.2"));
        assert!(!same_version("4.16.20", "4.16.2"));
        assert!(!same_version("4.16.2-alpha.1", "4.16.2"));
        assert!(same_version("not-semver", "not-semver"));
    }

    #[test]
    fn test_same_pep440_version() {
        assert!(same_pep440_version("4.17.0a1", "4.17.0-alpha.1"));
        assert!(same_pep440_version("4.17.0b2", "4.17.0-beta.2"));
        assert!(same_pep440_version("4.17.0rc1", "4.17.0-rc.1"));
        assert!(same_pep440_version("4.16.2", "4.16.2"));
        assert!(!same_pep440_version("14.16.2", "4.16.2"));
        assert!(!same_pep440_version("4.17.0a1", "4.17.0"));
    }
}
