// Assertion policy: who may assert, who may dispute, and the global kill switch.

/// Strategy consulted by the assertion engine before bonding.
///
/// The default implementation is `MarketConfig` (whitelists plus the
/// `validate_*` flags); a custom policy can be injected with
/// `MarketEngine::with_policy`.
pub trait AssertionPolicy: Send + Sync {
    fn allowed_to_assert(&self, account: &str) -> bool;
    fn allowed_to_dispute(&self, account: &str) -> bool;
    fn blocked(&self) -> bool;
}

/// Policy that admits everybody. Useful for tests and demos.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenPolicy;

impl AssertionPolicy for OpenPolicy {
    fn allowed_to_assert(&self, _account: &str) -> bool {
        true
    }

    fn allowed_to_dispute(&self, _account: &str) -> bool {
        true
    }

    fn blocked(&self) -> bool {
        false
    }
}
