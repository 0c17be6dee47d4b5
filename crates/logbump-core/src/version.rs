//! Version parsing and the patch bump.
//!
//! logbump only ever moves the patch component. Choosing between major,
//! minor and patch is left to whoever edits the changelog by hand.

use semver::Version;
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// A component is not a decimal number that fits in 64 bits.
    #[error("version component {component:?} in {version} is not a 64-bit number")]
    Component {
        /// The offending component text.
        component: String,
        /// The whole version text.
        version: String,
    },

    /// The patch component cannot be incremented any further.
    #[error("cannot bump {0}: patch number is at its maximum")]
    Overflow(Version),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// The version assumed when nothing has been released yet.
pub const fn initial_version() -> Version {
    Version::new(0, 0, 0)
}

/// Compute the next patch version: `X.Y.Z` becomes `X.Y.(Z+1)`.
///
/// # Errors
///
/// [`VersionError::Overflow`] when the patch is already `u64::MAX`.
pub fn next_patch(current: &Version) -> VersionResult<Version> {
    current
        .patch
        .checked_add(1)
        .map(|patch| Version::new(current.major, current.minor, patch))
        .ok_or_else(|| VersionError::Overflow(current.clone()))
}

/// Build a version from the digit runs of an `X.Y.Z` heading.
///
/// Components are read as plain integers, so leading zeros are accepted
/// (`01.2.3` is `1.2.3`), unlike semver's strict grammar.
pub fn from_components(major: &str, minor: &str, patch: &str) -> VersionResult<Version> {
    let number = |component: &str| {
        component
            .parse::<u64>()
            .map_err(|_| VersionError::Component {
                component: component.to_string(),
                version: format!("{major}.{minor}.{patch}"),
            })
    };
    Ok(Version::new(number(major)?, number(minor)?, number(patch)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_patch() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_patch(&v).unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn bump_never_touches_major_or_minor() {
        for (major, minor, patch) in [(0, 0, 0), (0, 9, 99), (3, 0, 41), (12, 7, 0)] {
            let next = next_patch(&Version::new(major, minor, patch)).unwrap();
            assert_eq!(next.major, major);
            assert_eq!(next.minor, minor);
            assert_eq!(next.patch, patch + 1);
        }
    }

    #[test]
    fn bump_from_initial() {
        assert_eq!(next_patch(&initial_version()).unwrap().to_string(), "0.0.1");
    }

    #[test]
    fn patch_grows_past_nine() {
        assert_eq!(next_patch(&Version::new(0, 1, 9)).unwrap().to_string(), "0.1.10");
    }

    #[test]
    fn bump_at_max_patch_is_an_error() {
        let max = Version::new(0, 0, u64::MAX);
        assert!(matches!(next_patch(&max), Err(VersionError::Overflow(v)) if v == max));
    }

    #[test]
    fn components_with_leading_zeros() {
        assert_eq!(from_components("01", "2", "003").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn components_at_u64_max() {
        let max = u64::MAX.to_string();
        assert_eq!(
            from_components("0", "0", &max).unwrap(),
            Version::new(0, 0, u64::MAX)
        );
    }

    #[test]
    fn oversized_component_is_rejected() {
        let err = from_components("1", "99999999999999999999999", "0").unwrap_err();
        assert!(matches!(
            err,
            VersionError::Component { ref component, .. } if component == "99999999999999999999999"
        ));
    }
}
