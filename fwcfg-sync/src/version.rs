use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::descriptor::ParamDescriptor;

/// Remote software version, ordered as a `(major, minor, patch)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SoftwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SoftwareVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Version string that does not start with `major[.minor[.patch]]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid software version '{0}'")]
pub struct VersionParseError(pub String);

impl FromStr for SoftwareVersion {
    type Err = VersionParseError;

    /// Accepts `10.1`, `10.1.3` and hotfix builds such as `10.1.3-h2`; the
    /// suffix after `-` is ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(input.to_string());
        let core = input.trim().split('-').next().unwrap_or_default();
        let mut parts = core.split('.');
        let mut next = |required: bool| -> Result<u32, VersionParseError> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| err()),
                None if required => Err(err()),
                None => Ok(0),
            }
        };
        let version = Self::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

impl Display for SoftwareVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// True when `descriptor` applies at `version`: `since <= version < until`.
///
/// `None` stands for the newest release, so unbounded parameters are visible
/// and parameters with an upper bound are not.
pub fn is_visible(descriptor: &ParamDescriptor, version: Option<&SoftwareVersion>) -> bool {
    match version {
        Some(v) => {
            descriptor.since.map_or(true, |min| min <= *v)
                && descriptor.until.map_or(true, |max| *v < max)
        }
        None => descriptor.until.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::{is_visible, SoftwareVersion};
    use crate::descriptor::{param, Encoding};

    #[test]
    fn parses_hotfix_builds() {
        assert_eq!(
            "10.1.3-h2".parse::<SoftwareVersion>().expect("version"),
            SoftwareVersion::new(10, 1, 3)
        );
        assert_eq!(
            "9.1".parse::<SoftwareVersion>().expect("version"),
            SoftwareVersion::new(9, 1, 0)
        );
        assert!("ten".parse::<SoftwareVersion>().is_err());
        assert!("1.2.3.4".parse::<SoftwareVersion>().is_err());
    }

    #[test]
    fn ordering_is_numeric_not_lexical() {
        let a: SoftwareVersion = "9.1.0".parse().expect("a");
        let b: SoftwareVersion = "10.0.0".parse().expect("b");
        assert!(a < b);
    }

    #[test]
    fn range_is_half_open() {
        let d = param("x", "x", Encoding::Text)
            .since(SoftwareVersion::new(8, 0, 0))
            .until(SoftwareVersion::new(10, 0, 0));
        assert!(!is_visible(&d, Some(&SoftwareVersion::new(7, 1, 0))));
        assert!(is_visible(&d, Some(&SoftwareVersion::new(8, 0, 0))));
        assert!(is_visible(&d, Some(&SoftwareVersion::new(9, 1, 5))));
        assert!(!is_visible(&d, Some(&SoftwareVersion::new(10, 0, 0))));
    }

    #[test]
    fn unbounded_visibility_is_monotonic() {
        let d = param("x", "x", Encoding::Text).since(SoftwareVersion::new(8, 0, 0));
        let versions = ["8.0.0", "8.1.2", "9.0.0", "10.2.4", "11.1.0"];
        for pair in versions.windows(2) {
            let v1: SoftwareVersion = pair[0].parse().expect("v1");
            let v2: SoftwareVersion = pair[1].parse().expect("v2");
            assert!(is_visible(&d, Some(&v1)));
            assert!(is_visible(&d, Some(&v2)));
        }
        assert!(is_visible(&d, None));
    }

    #[test]
    fn latest_hides_removed_params() {
        let d = param("x", "x", Encoding::Text).until(SoftwareVersion::new(11, 0, 0));
        assert!(!is_visible(&d, None));
    }
}
