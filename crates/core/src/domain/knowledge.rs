use serde::{Deserialize, Deserializer, Serialize};

/// One curated support answer as it appears in the knowledge-base file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    #[serde(default)]
    pub category: String,
    pub issue: String,
    pub solution: String,
}

impl KnowledgeEntry {
    pub fn document(&self) -> String {
        format!("Issue: {}\nSolution: {}", self.issue, self.solution)
    }

    pub fn metadata(&self) -> KbMetadata {
        KbMetadata { id: self.id.clone(), category: self.category.clone() }
    }

    pub fn to_document(&self) -> KbDocument {
        KbDocument { id: self.id.clone(), metadata: self.metadata(), text: self.document() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbMetadata {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbDocument {
    pub id: String,
    pub metadata: KbMetadata,
    pub text: String,
}

/// Ranked documents for a single query, closest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KbSearchResult {
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
}

impl KbSearchResult {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn top(&self, count: usize) -> &[String] {
        &self.documents[..count.min(self.documents.len())]
    }
}

pub fn parse_entries(raw: &str) -> Result<Vec<KnowledgeEntry>, serde_json::Error> {
    serde_json::from_str(raw)
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Integer(value) => value.to_string(),
        RawId::Float(value) => value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::domain::knowledge::{parse_entries, KbMetadata, KbSearchResult};

    #[test]
    fn numeric_and_string_ids_normalise_to_strings() {
        let entries = parse_entries(
            r#"[
                {"id": 1, "category": "login", "issue": "Cannot log in", "solution": "Reset the password"},
                {"id": "2", "category": "billing", "issue": "Double charge", "solution": "Contact billing"}
            ]"#,
        )
        .expect("entries parse");

        assert_eq!(entries[0].id, "1");
        assert_eq!(entries[1].id, "2");
        assert_eq!(entries[0].document(), "Issue: Cannot log in\nSolution: Reset the password");
        assert_eq!(entries[1].metadata().category, "billing");
    }

    #[test]
    fn stored_metadata_accepts_numeric_ids() {
        let metadata: KbMetadata =
            serde_json::from_str(r#"{"id": 7, "category": "sync"}"#).expect("metadata");
        assert_eq!(metadata.id, "7");
    }

    #[test]
    fn top_is_bounded_by_available_documents() {
        let result = KbSearchResult {
            documents: vec!["a".to_owned(), "b".to_owned()],
            distances: vec![0.1, 0.2],
        };
        assert_eq!(result.top(3).len(), 2);
        assert_eq!(result.top(1), ["a".to_owned()]);
        assert!(KbSearchResult::default().is_empty());
    }

    #[test]
    fn entries_missing_a_solution_are_rejected() {
        assert!(parse_entries(r#"[{"id": 1, "issue": "x"}]"#).is_err());
    }
}
