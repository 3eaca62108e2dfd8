//! Traffic class lookup.
//!
//! CTU-13 flows carry one of three labels. Their position in the class
//! attribute depends on the order in which the converter first saw them, so
//! the indices are resolved from each dataset's schema.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arff::Dataset;
use crate::config::LabelConfig;

/// Semantic traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficClass {
    Background,
    Normal,
    Botnet,
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => write!(f, "BACKGROUND"),
            Self::Normal => write!(f, "NORMAL"),
            Self::Botnet => write!(f, "BOTNET"),
        }
    }
}

/// Label names for each traffic class, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRegistry {
    background: String,
    normal: String,
    botnet: String,
}

impl LabelRegistry {
    pub fn new(config: &LabelConfig) -> Self {
        Self {
            background: config.background.clone(),
            normal: config.normal.clone(),
            botnet: config.botnet.clone(),
        }
    }

    pub fn label(&self, class: TrafficClass) -> &str {
        match class {
            TrafficClass::Background => &self.background,
            TrafficClass::Normal => &self.normal,
            TrafficClass::Botnet => &self.botnet,
        }
    }

    pub fn is_background(&self, label: &str) -> bool {
        label == self.background
    }

    /// Maps raw CTU-13 labels such as `flow=From-Botnet-V42-TCP-CC6` onto
    /// the registered class names. Unrecognized labels are kept as they are.
    pub fn canonicalize<'a>(&'a self, raw: &'a str) -> &'a str {
        [&self.botnet, &self.normal, &self.background]
            .into_iter()
            .find(|name| raw.contains(name.as_str()))
            .map(String::as_str)
            .unwrap_or(raw)
    }
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::new(&LabelConfig::default())
    }
}

/// Positions of the three traffic classes within a dataset's class attribute.
///
/// A class that never occurs in the data has no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassIndexs {
    pub background: Option<usize>,
    pub normal: Option<usize>,
    pub botnet: Option<usize>,
}

impl ClassIndexs {
    pub fn from_dataset(dataset: &Dataset, registry: &LabelRegistry) -> Self {
        let class = dataset.class_attribute();
        Self {
            background: class.index_of(registry.label(TrafficClass::Background)),
            normal: class.index_of(registry.label(TrafficClass::Normal)),
            botnet: class.index_of(registry.label(TrafficClass::Botnet)),
        }
    }

    pub fn get(&self, class: TrafficClass) -> Option<usize> {
        match class {
            TrafficClass::Background => self.background,
            TrafficClass::Normal => self.normal,
            TrafficClass::Botnet => self.botnet,
        }
    }

    pub fn is_background(&self, class_index: Option<usize>) -> bool {
        self.background.is_some() && class_index == self.background
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(labels: &str) -> Dataset {
        Dataset::parse_arff(&format!(
            "@relation t\n@attribute a numeric\n@attribute Label {{{}}}\n@data\n",
            labels
        ))
        .unwrap()
    }

    #[test]
    fn test_indices_follow_schema_order() {
        let registry = LabelRegistry::default();
        let idx = ClassIndexs::from_dataset(&dataset("Botnet,Background,Normal"), &registry);
        assert_eq!(idx.botnet, Some(0));
        assert_eq!(idx.background, Some(1));
        assert_eq!(idx.normal, Some(2));
        assert_eq!(idx.get(TrafficClass::Normal), Some(2));
    }

    #[test]
    fn test_missing_background() {
        let registry = LabelRegistry::default();
        let idx = ClassIndexs::from_dataset(&dataset("Normal,Botnet"), &registry);
        assert_eq!(idx.background, None);
        assert!(!idx.is_background(None));
        assert!(!idx.is_background(Some(0)));
    }

    #[test]
    fn test_custom_label_names() {
        let registry = LabelRegistry::new(&LabelConfig {
            background: "bg".to_string(),
            normal: "benign".to_string(),
            botnet: "bot".to_string(),
        });
        let idx = ClassIndexs::from_dataset(&dataset("benign,bot,bg"), &registry);
        assert_eq!(idx.background, Some(2));
        assert!(idx.is_background(Some(2)));
        assert!(registry.is_background("bg"));
    }

    #[test]
    fn test_canonicalize_raw_ctu_labels() {
        let registry = LabelRegistry::default();
        assert_eq!(
            registry.canonicalize("flow=From-Botnet-V42-TCP-CC6-Plain-HTTP-Encrypted-Data"),
            "Botnet"
        );
        assert_eq!(registry.canonicalize("flow=To-Background-UDP-CVUT-DNS-Server"), "Background");
        assert_eq!(registry.canonicalize("flow=From-Normal-V42-Stribrek"), "Normal");
        assert_eq!(registry.canonicalize("Normal"), "Normal");
        assert_eq!(registry.canonicalize("unlabelled"), "unlabelled");
    }

    #[test]
    fn test_traffic_class_display() {
        assert_eq!(TrafficClass::Botnet.to_string(), "BOTNET");
        assert_eq!(TrafficClass::Background.to_string(), "BACKGROUND");
    }
}
