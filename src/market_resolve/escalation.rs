// Escalation resolver: the external authority that rules on disputed assertions.

use crate::error::{MarketError, MarketResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Hex SHA-256 of `(assertion_time, identifier, ancillary_data)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisputeKey(String);

impl DisputeKey {
    pub fn new(assertion_time: u64, identifier: &str, ancillary_data: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(assertion_time.to_be_bytes());
        hasher.update(identifier.as_bytes());
        hasher.update(ancillary_data.as_bytes());
        DisputeKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisputeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait EscalationResolver: Send + Sync {
    /// Record a verdict. Fails if one exists and `allow_override` is false.
    fn record_verdict(
        &self,
        key: &DisputeKey,
        verdict: bool,
        allow_override: bool,
    ) -> MarketResult<()>;

    /// The recorded verdict, if any
    fn get_verdict(&self, key: &DisputeKey) -> Option<bool>;

    /// Every recorded verdict, for state snapshots
    fn export(&self) -> HashMap<DisputeKey, bool> {
        HashMap::new()
    }
}

/// Verdict store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    verdicts: Mutex<HashMap<DisputeKey, bool>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verdicts(verdicts: HashMap<DisputeKey, bool>) -> Self {
        Self { verdicts: Mutex::new(verdicts) }
    }
}

impl EscalationResolver for InMemoryResolver {
    fn record_verdict(
        &self,
        key: &DisputeKey,
        verdict: bool,
        allow_override: bool,
    ) -> MarketResult<()> {
        let mut verdicts = self.verdicts.lock().unwrap_or_else(PoisonError::into_inner);
        if verdicts.contains_key(key) && !allow_override {
            return Err(MarketError::VerdictAlreadyRecorded(key.to_string()));
        }
        verdicts.insert(key.clone(), verdict);
        Ok(())
    }

    fn get_verdict(&self, key: &DisputeKey) -> Option<bool> {
        self.verdicts.lock().unwrap_or_else(PoisonError::into_inner).get(key).copied()
    }

    fn export(&self) -> HashMap<DisputeKey, bool> {
        self.verdicts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_every_part() {
        let base = DisputeKey::new(10, "YES_OR_NO_QUERY", "assertionId:1,asserter:alice");
        assert_ne!(base, DisputeKey::new(11, "YES_OR_NO_QUERY", "assertionId:1,asserter:alice"));
        assert_ne!(base, DisputeKey::new(10, "OTHER", "assertionId:1,asserter:alice"));
        assert_ne!(base, DisputeKey::new(10, "YES_OR_NO_QUERY", "assertionId:2,asserter:alice"));
        assert_eq!(base.as_str().len(), 64);
    }

    #[test]
    fn test_record_and_override() {
        let resolver = InMemoryResolver::new();
        let key = DisputeKey::new(1, "id", "data");
        assert_eq!(resolver.get_verdict(&key), None);

        resolver.record_verdict(&key, true, false).unwrap();
        assert_eq!(resolver.get_verdict(&key), Some(true));

        assert!(matches!(
            resolver.record_verdict(&key, false, false),
            Err(MarketError::VerdictAlreadyRecorded(_))
        ));
        assert_eq!(resolver.get_verdict(&key), Some(true));

        resolver.record_verdict(&key, false, true).unwrap();
        assert_eq!(resolver.get_verdict(&key), Some(false));
        assert_eq!(resolver.export().len(), 1);
    }
}
