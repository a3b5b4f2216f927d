//! Read-only collection of domain profiles

use super::entities::DomainProfile;
use crate::core::domain::Domain;
use crate::core::error::DomainError;
use std::collections::BTreeMap;

/// All domain profiles known to the process
///
/// Built once at startup and shared read-only between concurrent queries.
/// Lookups never mutate, so repeated lookups for one domain return the same
/// profile.
#[derive(Debug, Clone, Default)]
pub struct DomainCatalog {
    profiles: BTreeMap<Domain, DomainProfile>,
}

impl DomainCatalog {
    /// An empty catalog; every lookup fails until profiles are inserted
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with the built-in profiles for the standard domains
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        for domain in Domain::standard() {
            if let Some(profile) = DomainProfile::builtin(&domain) {
                catalog = catalog.with_profile(profile);
            }
        }
        catalog
    }

    /// Insert or replace the profile for its domain
    pub fn with_profile(mut self, profile: DomainProfile) -> Self {
        self.profiles.insert(profile.domain.clone(), profile);
        self
    }

    /// Look up the profile for a domain
    ///
    /// Fails with a configuration error for unknown domains and for domains
    /// whose backend set is empty.
    pub fn lookup(&self, domain: &Domain) -> Result<&DomainProfile, DomainError> {
        let profile = self
            .profiles
            .get(domain)
            .ok_or_else(|| DomainError::UnknownDomain(domain.to_string()))?;
        if profile.backends.is_empty() {
            return Err(DomainError::NoBackends(domain.to_string()));
        }
        Ok(profile)
    }

    pub fn get(&self, domain: &Domain) -> Option<&DomainProfile> {
        self.profiles.get(domain)
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.profiles.keys()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &DomainProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Check that every referenced provider is registered
    ///
    /// Returns the first offending (domain, provider) pair as an error.
    pub fn validate_providers<F>(&self, is_registered: F) -> Result<(), DomainError>
    where
        F: Fn(&str) -> bool,
    {
        for profile in self.profiles.values() {
            for provider in profile.providers() {
                if !is_registered(provider) {
                    return Err(DomainError::UnregisteredProvider {
                        domain: profile.domain.to_string(),
                        provider: provider.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_unknown_domain() {
        let catalog = DomainCatalog::with_builtin();
        let result = catalog.lookup(&Domain::Custom("astrology".to_string()));
        assert_eq!(
            result.unwrap_err(),
            DomainError::UnknownDomain("astrology".to_string())
        );
    }

    #[test]
    fn test_lookup_empty_backends() {
        let catalog =
            DomainCatalog::new().with_profile(DomainProfile::new(Domain::General, "prompt"));
        assert_eq!(
            catalog.lookup(&Domain::General).unwrap_err(),
            DomainError::NoBackends("general".to_string())
        );
    }

    #[test]
    fn test_repeated_lookup_is_identical() {
        let catalog = DomainCatalog::with_builtin();
        let first = catalog.lookup(&Domain::Healthcare).unwrap().clone();
        for _ in 0..5 {
            assert_eq!(catalog.lookup(&Domain::Healthcare).unwrap(), &first);
        }
    }

    #[test]
    fn test_custom_profile_overrides_builtin() {
        let catalog = DomainCatalog::with_builtin().with_profile(
            DomainProfile::new(Domain::Finance, "custom").with_backend("local", "llama3"),
        );
        let profile = catalog.lookup(&Domain::Finance).unwrap();
        assert_eq!(profile.system_prompt, "custom");
        assert_eq!(profile.providers().collect::<Vec<_>>(), vec!["local"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_validate_providers() {
        let catalog = DomainCatalog::new().with_profile(
            DomainProfile::new(Domain::General, "p")
                .with_backend("openai", "gpt-4o")
                .with_backend("mistral", "large"),
        );
        assert!(catalog.validate_providers(|_| true).is_ok());
        let err = catalog
            .validate_providers(|p| p == "openai")
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnregisteredProvider {
                domain: "general".to_string(),
                provider: "mistral".to_string(),
            }
        );
    }
}
