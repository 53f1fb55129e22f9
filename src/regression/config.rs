// Tolerance band and process aliases for run comparison

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default relative tolerance (5%)
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Old process-name prefix → the prefix the same process carries in newer
/// tool versions
///
/// Only consulted during matching. Lookups are by exact key; an alias does
/// not chain to further aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessAliases(BTreeMap<String, String>);

impl ProcessAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aliases shipped with the tool: the node service moved from
    /// `openshift start node` to a standalone kubelet.
    pub fn builtin() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            "openshift_start_node_".to_string(),
            "hyperkube_kubelet_".to_string(),
        );
        Self(map)
    }

    pub fn get(&self, kind: &str) -> Option<&str> {
        self.0.get(kind).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ProcessAliases {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Configuration for one comparison pass
///
/// # Example
/// ```
/// use perf_analyzer::regression::ComparisonConfig;
///
/// let config = ComparisonConfig::default();
/// assert_eq!(config.tolerance, 0.05);
/// assert_eq!(config.aliases.get("openshift_start_node_"), Some("hyperkube_kubelet_"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Allowed fractional deviation of the new p95 from the old p95
    ///
    /// - 0.05 (default): new may sit anywhere in `[0.95*old, 1.05*old]`
    /// - 0.0: any change at all is reported
    /// - negative: the band is empty and every matched series is reported
    pub tolerance: f64,

    pub aliases: ProcessAliases,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            aliases: ProcessAliases::builtin(),
        }
    }
}

impl ComparisonConfig {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Validate configuration
    ///
    /// Negative tolerance is allowed (it flags everything); only values that
    /// cannot describe a band are rejected.
    pub fn validate(&self) -> Result<(), String> {
        if !self.tolerance.is_finite() {
            return Err(format!("tolerance must be finite, got {}", self.tolerance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ComparisonConfig::default();
        assert_eq!(config.tolerance, 0.05);
        assert_eq!(config.aliases.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_tolerance_is_valid() {
        let config = ComparisonConfig::with_tolerance(-0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_finite_tolerance_is_invalid() {
        assert!(ComparisonConfig::with_tolerance(f64::NAN).validate().is_err());
        assert!(ComparisonConfig::with_tolerance(f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_alias_lookup_is_exact() {
        let aliases = ProcessAliases::builtin();
        assert_eq!(aliases.get("openshift_start_node_"), Some("hyperkube_kubelet_"));
        assert_eq!(aliases.get("openshift_start_node"), None);
        assert_eq!(aliases.get("hyperkube_kubelet_"), None);
    }

    #[test]
    fn test_aliases_deserialize_from_table() {
        let aliases: ProcessAliases =
            toml::from_str("\"dockerd-current_\" = \"crio\"\n").unwrap();
        assert_eq!(aliases.get("dockerd-current_"), Some("crio"));
    }
}
