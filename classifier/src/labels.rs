use crate::config::LabelsConfig;
use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelsError {
    #[error("Failed to read labels file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("Labels file {0} contains no labels")]
    Empty(String),
}

/// Human-readable names indexed by class id.
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn load(labels_cfg: &LabelsConfig) -> Result<Self, LabelsError> {
        match labels_cfg.get_path() {
            Some(path) => {
                let labels = load_labels(&path).map_err(|source| LabelsError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                if labels.is_empty() {
                    return Err(LabelsError::Empty(path.display().to_string()));
                }
                tracing::info!("Loaded {} class labels from {:?}", labels.len(), path);
                Ok(Self { labels })
            }
            None => Ok(Self::default()),
        }
    }

    /// Number of known labels, or `None` when labels are synthesized.
    pub fn expected_classes(&self) -> Option<usize> {
        if self.labels.is_empty() {
            None
        } else {
            Some(self.labels.len())
        }
    }

    pub fn name(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

fn load_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if label.is_empty() || label.starts_with('#') {
            continue;
        }
        labels.push(label.to_string());
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_skips_blank_and_comment_lines() {
        let dir = std::env::temp_dir().join(format!("labels-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labels.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "# pizza detector").unwrap();
        writeln!(file, "pizza").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  not pizza  ").unwrap();

        let cfg = LabelsConfig {
            labels_file: Some("labels.txt".to_string()),
            labels_dir: Some(dir.clone()),
        };
        let labels = ClassLabels::load(&cfg).unwrap();

        assert_eq!(labels.expected_classes(), Some(2));
        assert_eq!(labels.name(0), "pizza");
        assert_eq!(labels.name(1), "not pizza");
        assert_eq!(labels.name(2), "class_2");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_without_file_labels_are_synthesized() {
        let labels = ClassLabels::load(&LabelsConfig::default()).unwrap();
        assert_eq!(labels.expected_classes(), None);
        assert_eq!(labels.name(7), "class_7");
    }
}
