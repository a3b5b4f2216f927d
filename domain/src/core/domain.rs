//! Knowledge domain value object

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Subject-matter domain a query belongs to (Value Object)
///
/// The three standard domains ship with built-in profiles. Any other name
/// parses to [`Domain::Custom`] and only resolves if a profile for it has
/// been configured; otherwise lookup fails with a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    General,
    Healthcare,
    Finance,
    Custom(String),
}

impl Domain {
    /// Get the string identifier for this domain
    pub fn as_str(&self) -> &str {
        match self {
            Domain::General => "general",
            Domain::Healthcare => "healthcare",
            Domain::Finance => "finance",
            Domain::Custom(s) => s,
        }
    }

    /// The domains that have built-in profiles
    pub fn standard() -> Vec<Domain> {
        vec![Domain::General, Domain::Healthcare, Domain::Finance]
    }

    pub fn is_standard(&self) -> bool {
        !matches!(self, Domain::Custom(_))
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain::General
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "general" => Domain::General,
            "healthcare" => Domain::Healthcare,
            "finance" => Domain::Finance,
            _ => Domain::Custom(normalized),
        })
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(domain) => domain,
            Err(never) => match never {},
        }
    }
}

impl Serialize for Domain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Domain::from(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_roundtrip() {
        for domain in Domain::standard() {
            let parsed: Domain = domain.to_string().parse().unwrap();
            assert_eq!(domain, parsed);
        }
    }

    #[test]
    fn test_unknown_domain_is_custom() {
        let domain: Domain = "Astrology".parse().unwrap();
        assert_eq!(domain, Domain::Custom("astrology".to_string()));
        assert!(!domain.is_standard());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Domain::Healthcare).unwrap();
        assert_eq!(json, "\"healthcare\"");
        let back: Domain = serde_json::from_str("\"finance\"").unwrap();
        assert_eq!(back, Domain::Finance);
    }
}
