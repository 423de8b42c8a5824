//! Competency → course-title index.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Courses grouped by competency, competencies kept in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CompetencyIndex {
    entries: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
}

impl CompetencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `title` to the list for `competency`, creating the entry if needed.
    pub fn insert(&mut self, competency: &str, title: &str) {
        let idx = match self.positions.get(competency) {
            Some(idx) => *idx,
            None => {
                self.entries.push((competency.to_string(), Vec::new()));
                self.positions
                    .insert(competency.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[idx].1.push(title.to_string());
    }

    /// Course titles for `competency`, in catalog order.
    pub fn courses(&self, competency: &str) -> Option<&[String]> {
        self.positions
            .get(competency)
            .map(|idx| self.entries[*idx].1.as_slice())
    }

    /// Iterate `(competency, titles)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(competency, titles)| (competency.as_str(), titles.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Serialized as a JSON object whose keys keep first-seen order.
impl Serialize for CompetencyIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (competency, titles) in &self.entries {
            map.serialize_entry(competency, titles)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_seen_order() {
        let mut index = CompetencyIndex::new();
        index.insert("Risk", "Credit Risk");
        index.insert("Analytics", "Python");
        index.insert("Risk", "Market Risk");

        let order: Vec<&str> = index.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec!["Risk", "Analytics"]);
        assert_eq!(
            index.courses("Risk").unwrap(),
            &["Credit Risk".to_string(), "Market Risk".to_string()]
        );
        assert!(index.courses("Tax").is_none());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn serializes_as_ordered_object() {
        let mut index = CompetencyIndex::new();
        index.insert("Zeta", "Z1");
        index.insert("Alpha", "A1");
        let json = serde_json::to_string(&index).expect("serialize");
        assert_eq!(json, r#"{"Zeta":["Z1"],"Alpha":["A1"]}"#);
    }
}
