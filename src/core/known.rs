use crate::core::Storage;
use crate::utils::error::Result;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Names of the common, pre-packaged datasets and views. Resources listed here
/// are deployed by the common package, so the export only references them.
#[derive(Debug, Clone, Default)]
pub struct KnownResources {
    datasets: HashSet<String>,
    views: HashSet<String>,
}

// Same layout as an exported resource file; only the names matter.
#[derive(Deserialize)]
struct KnownResourcesFile {
    #[serde(default)]
    datasets: Option<BTreeMap<String, IgnoredAny>>,
    #[serde(default)]
    views: Option<BTreeMap<String, IgnoredAny>>,
}

impl KnownResources {
    pub fn from_names(datasets: Vec<String>, views: Vec<String>) -> Self {
        Self {
            datasets: datasets.into_iter().collect(),
            views: views.into_iter().collect(),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: KnownResourcesFile = serde_yaml::from_str(content)?;
        Ok(Self {
            datasets: file.datasets.unwrap_or_default().into_keys().collect(),
            views: file.views.unwrap_or_default().into_keys().collect(),
        })
    }

    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        let data = storage.read_file(path).await?;
        let known = Self::from_yaml_str(&String::from_utf8_lossy(&data))?;
        tracing::info!(
            "Loaded {} common datasets and {} common views from {}",
            known.datasets.len(),
            known.views.len(),
            path
        );
        Ok(known)
    }

    pub fn has_dataset(&self, name: &str) -> bool {
        self.datasets.contains(name)
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fakes::MemoryStorage;

    const RESOURCES: &str = r#"
dashboards:
  CUDOS:
    name: CUDOS
datasets:
  summary_view:
    data:
      DataSetId: d0ec3f0c
  ec2_running_cost: {}
views:
  summary_view:
    dependsOn:
      cur: true
    data: |
      CREATE OR REPLACE VIEW summary_view AS SELECT 1
"#;

    #[test]
    fn test_parse_names_only() {
        let known = KnownResources::from_yaml_str(RESOURCES).unwrap();
        assert!(known.has_dataset("summary_view"));
        assert!(known.has_dataset("ec2_running_cost"));
        assert!(known.has_view("summary_view"));
        assert!(!known.has_view("ec2_running_cost"));
    }

    #[test]
    fn test_empty_sections() {
        let known = KnownResources::from_yaml_str("views:\n").unwrap();
        assert!(!known.has_view("anything"));
    }

    #[tokio::test]
    async fn test_load_from_storage() {
        let storage = MemoryStorage::new().with_file("resources.yaml", RESOURCES);
        let known = KnownResources::load(&storage, "resources.yaml").await.unwrap();
        assert!(known.has_dataset("summary_view"));
        assert!(KnownResources::load(&storage, "missing.yaml").await.is_err());
    }
}
