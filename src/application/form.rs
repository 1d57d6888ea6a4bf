use super::{answer_for, ApplicationAnswer};
use crate::error::{form_error, AppResult};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Answers a boolean field accepts
pub const BOOLEAN_OPTIONS: [&str; 2] = ["Yes", "No"];

/// The whole application form, in display order
#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    pub sections: Vec<ConfigSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    pub category: String,
    pub title: String,
    pub fields: Vec<ConfigField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub field_name: String,
    pub title: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// The closed set of input kinds a field can use
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Boolean,
    Text {
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        validation: Option<Pattern>,
    },
    LongText {
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default, rename = "maxLength")]
        max_length: Option<usize>,
    },
    Choice {
        options: Vec<String>,
        #[serde(default)]
        other: bool,
    },
    /// Answers are stored comma separated
    MultiChoice {
        options: Vec<String>,
        #[serde(default)]
        other: bool,
    },
}

/// A validation regex, compiled when the form is loaded
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Pattern)
            .map_err(|e| serde::de::Error::custom(format!("invalid validation regex: {}", e)))
    }
}

impl FormConfig {
    /// Parse and validate a form description
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: FormConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the form description from disk
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            form_error(&format!("Failed to read form config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> AppResult<()> {
        if self.sections.is_empty() {
            return Err(form_error("Form has no sections"));
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.title.trim().is_empty() {
                return Err(form_error("Section title must not be empty"));
            }

            for field in &section.fields {
                if field.field_name.trim().is_empty() || field.title.trim().is_empty() {
                    return Err(form_error(&format!(
                        "Field in section '{}' needs a name and a title",
                        section.title
                    )));
                }
                if !seen.insert(field.field_name.as_str()) {
                    return Err(form_error(&format!(
                        "Duplicate field name '{}'",
                        field.field_name
                    )));
                }
                if let FieldKind::Choice { options, .. } | FieldKind::MultiChoice { options, .. } =
                    &field.kind
                {
                    if options.is_empty() {
                        return Err(form_error(&format!(
                            "Field '{}' has no options",
                            field.field_name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Look up a field by its name
    pub fn field(&self, field_name: &str) -> Option<&ConfigField> {
        self.fields().find(|f| f.field_name == field_name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &ConfigField> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Check every field of a submitted application.
    ///
    /// All problems are reported together, one per line.
    pub fn validate_submission(&self, answers: &[ApplicationAnswer]) -> AppResult<()> {
        let problems: Vec<String> = self
            .fields()
            .filter_map(|field| {
                field
                    .validate_answer(answer_for(answers, &field.field_name), true)
                    .err()
                    .map(|e| e.to_string())
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(form_error(&problems.join("\n")))
        }
    }
}

impl ConfigField {
    /// Check a single answer against this field's kind.
    ///
    /// Empty answers pass unless `submitting` and the field is required.
    pub fn validate_answer(&self, value: &str, submitting: bool) -> AppResult<()> {
        let value = value.trim();
        if value.is_empty() {
            if submitting && !self.optional {
                return Err(form_error(&format!("{} is required", self.title)));
            }
            return Ok(());
        }

        let valid = match &self.kind {
            FieldKind::Boolean => BOOLEAN_OPTIONS.contains(&value),
            FieldKind::Text { validation, .. } => {
                validation.as_ref().map_or(true, |p| p.is_match(value))
            }
            FieldKind::LongText { max_length, .. } => {
                max_length.map_or(true, |max| value.chars().count() <= max)
            }
            FieldKind::Choice { options, other } => *other || options.iter().any(|o| o == value),
            FieldKind::MultiChoice { options, other } => {
                *other
                    || split_choices(value).all(|choice| options.iter().any(|o| o == choice))
            }
        };

        if valid {
            Ok(())
        } else {
            Err(form_error(&format!("{} has an invalid answer", self.title)))
        }
    }
}

/// Individual selections of a multi-choice answer
pub fn split_choices(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"
[[sections]]
category = "about"
title = "About You"

[[sections.fields]]
fieldName = "school"
title = "School"
kind = "text"
placeholder = "Vanderbilt University"

[[sections.fields]]
fieldName = "gradYear"
title = "Graduation year"
kind = "text"
validation = "^[0-9]{4}$"

[[sections.fields]]
fieldName = "adult"
title = "Are you 18 or older?"
kind = "boolean"

[[sections]]
category = "extras"
title = "Extras"

[[sections.fields]]
fieldName = "shirtSize"
title = "Shirt size"
kind = "choice"
options = ["S", "M", "L"]

[[sections.fields]]
fieldName = "interests"
title = "Interests"
kind = "multi_choice"
options = ["Web", "Hardware", "ML"]
other = true
optional = true

[[sections.fields]]
fieldName = "essay"
title = "Why do you want to come?"
kind = "long_text"
maxLength = 20
optional = true
"#;

    fn form() -> FormConfig {
        FormConfig::from_toml(FORM).unwrap()
    }

    fn answers(pairs: &[(&str, &str)]) -> Vec<ApplicationAnswer> {
        pairs
            .iter()
            .map(|(q, a)| ApplicationAnswer {
                question: q.to_string(),
                answer: a.to_string(),
            })
            .collect()
    }

    #[test]
    fn parses_tagged_field_kinds() {
        let form = form();
        assert_eq!(form.sections.len(), 2);
        assert!(matches!(form.field("adult").unwrap().kind, FieldKind::Boolean));
        match &form.field("essay").unwrap().kind {
            FieldKind::LongText { max_length, .. } => assert_eq!(*max_length, Some(20)),
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(form.field("interests").unwrap().optional);
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let content = FORM.replace("fieldName = \"gradYear\"", "fieldName = \"school\"");
        let err = FormConfig::from_toml(&content).unwrap_err();
        assert!(err.to_string().contains("Duplicate field name 'school'"));
    }

    #[test]
    fn rejects_choice_without_options() {
        let content = FORM.replace("options = [\"S\", \"M\", \"L\"]", "options = []");
        assert!(FormConfig::from_toml(&content).is_err());
    }

    #[test]
    fn rejects_bad_validation_regex() {
        let content = FORM.replace("^[0-9]{4}$", "([0-9");
        assert!(FormConfig::from_toml(&content).is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let content = FORM.replace("kind = \"boolean\"", "kind = \"slider\"");
        assert!(FormConfig::from_toml(&content).is_err());
    }

    #[test]
    fn validates_answers_per_kind() {
        let form = form();
        let check = |name: &str, value: &str| form.field(name).unwrap().validate_answer(value, false);

        assert!(check("adult", "Yes").is_ok());
        assert!(check("adult", "Maybe").is_err());
        assert!(check("gradYear", "2026").is_ok());
        assert!(check("gradYear", "next year").is_err());
        assert!(check("shirtSize", "M").is_ok());
        assert!(check("shirtSize", "XXL").is_err());
        assert!(check("interests", "Web, Knitting").is_ok());
        assert!(check("essay", "short").is_ok());
        assert!(check("essay", "this answer is way too long").is_err());
    }

    #[test]
    fn submission_reports_every_problem() {
        let form = form();
        let err = form
            .validate_submission(&answers(&[("school", "MIT"), ("adult", "Maybe")]))
            .unwrap_err();
        let message = err.to_string();

        assert!(message.contains("Graduation year is required"));
        assert!(message.contains("Are you 18 or older? has an invalid answer"));
        assert!(message.contains("Shirt size is required"));
        assert!(!message.contains("Interests"));
    }

    #[test]
    fn complete_submission_passes() {
        let form = form();
        let complete = answers(&[
            ("school", "MIT"),
            ("gradYear", "2026"),
            ("adult", "Yes"),
            ("shirtSize", "L"),
        ]);
        assert!(form.validate_submission(&complete).is_ok());
    }
}
