use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::SpecParseError;

/// Range used when a specifier carries no version part.
pub const DEFAULT_RANGE: &str = "latest";

/// A parsed `name[@range]` specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    /// Package name, including the scope for scoped packages
    pub name: String,
    /// Version, range or tag as written; `latest` when omitted
    pub range: String,
}

impl FromStr for Specifier {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a specifier of the form `name`, `name@range`, `@scope/name` or
/// `@scope/name@range`.
pub fn parse(input: &str) -> Result<Specifier, SpecParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SpecParseError::Empty);
    }

    let (name, range) = split_name_and_range(input)?;
    validate_name(name)?;

    let range = match range {
        Some(r) => {
            let r = r.trim();
            if r.is_empty() {
                return Err(SpecParseError::EmptyVersion(input.to_string()));
            }
            r.to_string()
        }
        None => DEFAULT_RANGE.to_string(),
    };

    trace!("parsed specifier '{}' into name={} range={}", input, name, range);

    Ok(Specifier {
        name: name.to_string(),
        range,
    })
}

fn split_name_and_range(input: &str) -> Result<(&str, Option<&str>), SpecParseError> {
    if let Some(rest) = input.strip_prefix('@') {
        let Some(slash) = rest.find('/') else {
            return Err(SpecParseError::InvalidScope(input.to_string()));
        };
        // the version separator can only appear after the scope's slash
        match rest[slash..].find('@') {
            Some(at) => {
                let split = 1 + slash + at;
                Ok((&input[..split], Some(&input[split + 1..])))
            }
            None => Ok((input, None)),
        }
    } else {
        match input.split_once('@') {
            Some((name, range)) => Ok((name, Some(range))),
            None => Ok((input, None)),
        }
    }
}

fn validate_name(name: &str) -> Result<(), SpecParseError> {
    if let Some(scoped) = name.strip_prefix('@') {
        let Some((scope, bare)) = scoped.split_once('/') else {
            return Err(SpecParseError::InvalidScope(name.to_string()));
        };
        if scope.is_empty() || bare.is_empty() || bare.contains('/') {
            return Err(SpecParseError::InvalidScope(name.to_string()));
        }
        if !is_valid_segment(scope) || !is_valid_segment(bare) {
            return Err(SpecParseError::InvalidName(name.to_string()));
        }
        return Ok(());
    }

    if name.is_empty() || name.contains('/') || !is_valid_segment(name) {
        return Err(SpecParseError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.starts_with('.')
        && !segment.starts_with('_')
        && !segment
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '@')
}

/// Identifier of one concrete package instance, `name@version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullName {
    pub name: String,
    pub version: String,
}

impl FullName {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl FromStr for FullName {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, version) = split_name_and_range(s.trim())?;
        if version.is_none() {
            return Err(SpecParseError::MissingVersion(s.to_string()));
        }
        let spec = parse(s)?;
        Ok(Self {
            name: spec.name,
            version: spec.range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specifiers() {
        let test_cases = vec![
            ("left-pad", "left-pad", "latest"),
            ("left-pad@1.3.0", "left-pad", "1.3.0"),
            ("left-pad@^1.0.0", "left-pad", "^1.0.0"),
            ("left-pad@>=1.0.0 <2.0.0", "left-pad", ">=1.0.0 <2.0.0"),
            ("@babel/core", "@babel/core", "latest"),
            ("@babel/core@7.24.0", "@babel/core", "7.24.0"),
            ("@types/node@~20.1", "@types/node", "~20.1"),
            ("  lodash@*  ", "lodash", "*"),
        ];

        for (input, name, range) in test_cases {
            let spec = parse(input).unwrap();
            assert_eq!(spec.name, name, "name of {}", input);
            assert_eq!(spec.range, range, "range of {}", input);
        }
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(parse(""), Err(SpecParseError::Empty));
        assert_eq!(parse("   "), Err(SpecParseError::Empty));
        assert!(matches!(
            parse("@babel"),
            Err(SpecParseError::InvalidScope(_))
        ));
        assert!(matches!(
            parse("@/core"),
            Err(SpecParseError::InvalidScope(_))
        ));
        assert!(matches!(
            parse("@babel/"),
            Err(SpecParseError::InvalidScope(_))
        ));
        assert!(matches!(
            parse("left-pad@"),
            Err(SpecParseError::EmptyVersion(_))
        ));
        assert!(matches!(
            parse("@1.0.0"),
            Err(SpecParseError::InvalidScope(_))
        ));
        assert!(matches!(
            parse("left pad"),
            Err(SpecParseError::InvalidName(_))
        ));
        assert!(matches!(
            parse(".hidden"),
            Err(SpecParseError::InvalidName(_))
        ));
        assert!(matches!(
            parse("a/b"),
            Err(SpecParseError::InvalidName(_))
        ));
    }

    #[test]
    fn test_full_name() {
        let full: FullName = "left-pad@1.3.0".parse().unwrap();
        assert_eq!(full, FullName::new("left-pad", "1.3.0"));
        assert_eq!(full.to_string(), "left-pad@1.3.0");

        let scoped: FullName = "@babel/core@7.24.0".parse().unwrap();
        assert_eq!(scoped.name, "@babel/core");
        assert_eq!(scoped.version, "7.24.0");

        assert!(matches!(
            "left-pad".parse::<FullName>(),
            Err(SpecParseError::MissingVersion(_))
        ));
        assert!(matches!(
            "@babel/core".parse::<FullName>(),
            Err(SpecParseError::MissingVersion(_))
        ));
    }
}
