use crate::ProviderError;

/// Result of a fetch after the caller has decided how much it depends on it.
///
/// `Degraded` and `Failed` carry the reason so a genuine zero can always be
/// told apart from a value that is unknown because a source failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Available(T),
    Degraded(String),
    Failed(String),
}

/// Collections that can come back empty from a provider
pub trait HasData {
    fn has_data(&self) -> bool;
}

impl<T> HasData for Vec<T> {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> HasData for std::collections::HashMap<K, V, S> {
    fn has_data(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: HasData> FetchOutcome<T> {
    /// Primary source: an error or an empty answer is fatal for the module
    pub fn primary(source: &str, result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(value) if value.has_data() => FetchOutcome::Available(value),
            Ok(_) => FetchOutcome::Failed(format!("{} returned no data", source)),
            Err(e) => FetchOutcome::Failed(format!("{} failed: {}", source, e)),
        }
    }

    /// Confirmatory source: an error or an empty answer degrades the module
    pub fn secondary(source: &str, result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(value) if value.has_data() => FetchOutcome::Available(value),
            Ok(_) => FetchOutcome::Degraded(format!("{} returned no data", source)),
            Err(e) => FetchOutcome::Degraded(format!("{} failed: {}", source, e)),
        }
    }
}

impl<T> FetchOutcome<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, FetchOutcome::Available(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            FetchOutcome::Available(v) => Some(v),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FetchOutcome::Available(_) => None,
            FetchOutcome::Degraded(r) | FetchOutcome::Failed(r) => Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_empty_is_failure() {
        let outcome: FetchOutcome<Vec<u32>> = FetchOutcome::primary("alpha ranking", Ok(vec![]));
        assert_eq!(
            outcome,
            FetchOutcome::Failed("alpha ranking returned no data".to_string())
        );
    }

    #[test]
    fn test_secondary_error_is_degraded() {
        let outcome: FetchOutcome<Vec<u32>> =
            FetchOutcome::secondary("rank velocity", Err(ProviderError::Timeout));
        assert!(!outcome.is_available());
        assert_eq!(outcome.reason(), Some("rank velocity failed: Request timed out"));
    }

    #[test]
    fn test_available_keeps_value() {
        let outcome = FetchOutcome::secondary("limit-up board", Ok(vec![0u32]));
        assert_eq!(outcome.value(), Some(vec![0]));
    }
}
