use serde::{Deserialize, Serialize};

use crate::flows::FlowState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesField {
    Name,
    Company,
    TeamSize,
    SalesQuery,
}

impl SalesField {
    /// Collection order; the first empty field is always the one prompted for.
    pub const ORDER: [SalesField; 4] =
        [SalesField::Name, SalesField::Company, SalesField::TeamSize, SalesField::SalesQuery];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Company => "company",
            Self::TeamSize => "team_size",
            Self::SalesQuery => "sales_query",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Name => "Could you please provide your name?",
            Self::Company => "What company are you representing?",
            Self::TeamSize => "How many people are on your team?",
            Self::SalesQuery => "What is your sales or business query?",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesFields {
    pub name: String,
    pub company: String,
    pub team_size: String,
    pub sales_query: String,
}

impl SalesFields {
    pub fn get(&self, field: SalesField) -> &str {
        match field {
            SalesField::Name => &self.name,
            SalesField::Company => &self.company,
            SalesField::TeamSize => &self.team_size,
            SalesField::SalesQuery => &self.sales_query,
        }
    }

    fn slot(&mut self, field: SalesField) -> &mut String {
        match field {
            SalesField::Name => &mut self.name,
            SalesField::Company => &mut self.company,
            SalesField::TeamSize => &mut self.team_size,
            SalesField::SalesQuery => &mut self.sales_query,
        }
    }

    /// Writes `value` only when the field is still empty. Returns whether it was written.
    pub fn set_if_empty(&mut self, field: SalesField, value: &str) -> bool {
        let value = value.trim();
        let slot = self.slot(field);
        if !slot.is_empty() || value.is_empty() {
            return false;
        }
        *slot = value.to_owned();
        true
    }

    /// Copies every non-empty value from `extracted` into fields that are still empty.
    pub fn merge_missing(&mut self, extracted: &SalesFields) -> bool {
        let mut updated = false;
        for field in SalesField::ORDER {
            updated |= self.set_if_empty(field, extracted.get(field));
        }
        updated
    }

    pub fn first_missing(&self) -> Option<SalesField> {
        SalesField::ORDER.into_iter().find(|field| self.get(*field).is_empty())
    }

    pub fn missing(&self) -> Vec<SalesField> {
        SalesField::ORDER.into_iter().filter(|field| self.get(*field).is_empty()).collect()
    }

    pub fn to_log_entry(&self) -> String {
        format!(
            "Name: {}\nCompany: {}\nTeam Size: {}\nMessage: {}",
            self.name, self.company, self.team_size, self.sales_query
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesProgress {
    pub fields: SalesFields,
    pub last_prompted_field: Option<SalesField>,
    pub state: FlowState,
}

impl Default for SalesProgress {
    fn default() -> Self {
        Self { fields: SalesFields::default(), last_prompted_field: None, state: FlowState::New }
    }
}

impl SalesProgress {
    /// Folds one customer turn into the collected fields and returns the next field to ask
    /// for, or `None` when every field is filled.
    ///
    /// Extraction results win. When extraction filled nothing, the raw message answers the
    /// field that was prompted for last, provided it is still empty.
    pub fn apply_turn(&mut self, extracted: &SalesFields, message: &str) -> Option<SalesField> {
        let updated = self.fields.merge_missing(extracted);
        if !updated {
            if let Some(field) = self.last_prompted_field {
                self.fields.set_if_empty(field, message);
            }
        }
        self.fields.first_missing()
    }

    pub fn mark_prompted(&mut self, field: SalesField) {
        self.last_prompted_field = Some(field);
    }
}
