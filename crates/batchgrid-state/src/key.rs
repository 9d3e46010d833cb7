//! Cache key composition.

use std::fmt;

use crate::types::Action;

/// Prefix shared by every persisted batch record.
pub const CACHE_KEY_PREFIX: &str = "GPBInstances_";

/// Key a batch record is stored under: `GPBInstances_{service}_{action}`.
///
/// The action is a closed set, so two keys are equal only when both the
/// service and the action are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn compose(service_id: &str, action: Action) -> Self {
        Self(format!("{CACHE_KEY_PREFIX}{service_id}_{action}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_matches_store_layout() {
        let key = CacheKey::compose("svc-1", Action::Create);
        assert_eq!(key.as_str(), "GPBInstances_svc-1_create");
    }

    #[test]
    fn compose_is_deterministic() {
        assert_eq!(
            CacheKey::compose("x", Action::Create),
            CacheKey::compose("x", Action::Create)
        );
    }

    #[test]
    fn distinct_inputs_do_not_collide() {
        let keys = [
            CacheKey::compose("x", Action::Create),
            CacheKey::compose("x", Action::Update),
            CacheKey::compose("x", Action::Delete),
            CacheKey::compose("y", Action::Create),
            CacheKey::compose("x_create", Action::Create),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
