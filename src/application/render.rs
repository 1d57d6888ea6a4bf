use super::form::{split_choices, ConfigField, FieldKind, FormConfig, BOOLEAN_OPTIONS};
use super::{answer_for, ApplicationAnswer};
use crate::error::AppResult;
use askama::Template;

/// Label, help text and name shared by every field template
pub struct FieldHeader<'a> {
    pub name: &'a str,
    pub title: &'a str,
    pub note: &'a str,
    pub prompt: &'a str,
    pub required: bool,
}

impl<'a> From<&'a ConfigField> for FieldHeader<'a> {
    fn from(field: &'a ConfigField) -> Self {
        Self {
            name: &field.field_name,
            title: &field.title,
            note: field.note.as_deref().unwrap_or(""),
            prompt: field.prompt.as_deref().unwrap_or(""),
            required: !field.optional,
        }
    }
}

pub struct ChoiceOption<'a> {
    pub label: &'a str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "application/boolean.html")]
struct BooleanTemplate<'a> {
    field: FieldHeader<'a>,
    options: Vec<ChoiceOption<'a>>,
}

#[derive(Template)]
#[template(path = "application/text.html")]
struct TextTemplate<'a> {
    field: FieldHeader<'a>,
    value: &'a str,
    placeholder: &'a str,
    pattern: &'a str,
}

#[derive(Template)]
#[template(path = "application/long_text.html")]
struct LongTextTemplate<'a> {
    field: FieldHeader<'a>,
    value: &'a str,
    placeholder: &'a str,
    max_length: Option<usize>,
}

#[derive(Template)]
#[template(path = "application/choice.html")]
struct ChoiceTemplate<'a> {
    field: FieldHeader<'a>,
    options: Vec<ChoiceOption<'a>>,
    other: bool,
    other_value: String,
}

#[derive(Template)]
#[template(path = "application/multi_choice.html")]
struct MultiChoiceTemplate<'a> {
    field: FieldHeader<'a>,
    options: Vec<ChoiceOption<'a>>,
    other: bool,
    other_value: String,
}

struct SectionView<'a> {
    category: &'a str,
    title: &'a str,
    open: bool,
    fields: Vec<String>,
}

#[derive(Template)]
#[template(path = "application/form.html")]
struct FormTemplate<'a> {
    sections: Vec<SectionView<'a>>,
}

fn mark_selected<'a>(
    options: &'a [String],
    is_selected: impl Fn(&str) -> bool,
) -> Vec<ChoiceOption<'a>> {
    options
        .iter()
        .map(|label| ChoiceOption {
            label,
            selected: is_selected(label),
        })
        .collect()
}

/// Render one field with its current value
pub fn render_field(field: &ConfigField, value: &str) -> AppResult<String> {
    let header = FieldHeader::from(field);

    let html = match &field.kind {
        FieldKind::Boolean => BooleanTemplate {
            field: header,
            options: BOOLEAN_OPTIONS
                .iter()
                .map(|label| ChoiceOption {
                    label,
                    selected: *label == value,
                })
                .collect(),
        }
        .render()?,
        FieldKind::Text {
            placeholder,
            validation,
        } => TextTemplate {
            field: header,
            value,
            placeholder: placeholder.as_deref().unwrap_or(""),
            pattern: validation.as_ref().map(|p| p.as_str()).unwrap_or(""),
        }
        .render()?,
        FieldKind::LongText {
            placeholder,
            max_length,
        } => LongTextTemplate {
            field: header,
            value,
            placeholder: placeholder.as_deref().unwrap_or(""),
            max_length: *max_length,
        }
        .render()?,
        FieldKind::Choice { options, other } => {
            let known = options.iter().any(|o| o == value);
            ChoiceTemplate {
                field: header,
                options: mark_selected(options, |label| label == value),
                other: *other,
                other_value: if known { String::new() } else { value.to_string() },
            }
            .render()?
        }
        FieldKind::MultiChoice { options, other } => {
            let chosen: Vec<&str> = split_choices(value).collect();
            let extra: Vec<&str> = chosen
                .iter()
                .copied()
                .filter(|c| !options.iter().any(|o| o == *c))
                .collect();
            MultiChoiceTemplate {
                field: header,
                options: mark_selected(options, |label| chosen.contains(&label)),
                other: *other,
                other_value: extra.join(", "),
            }
            .render()?
        }
    };

    Ok(html)
}

/// Render the full form as collapsible sections.
///
/// `open_section` names a section category; the first section opens when
/// it is `None` or unknown.
pub fn render_form(
    config: &FormConfig,
    answers: &[ApplicationAnswer],
    open_section: Option<&str>,
) -> AppResult<String> {
    let open_index = open_section
        .and_then(|category| config.sections.iter().position(|s| s.category == category))
        .unwrap_or(0);

    let mut sections = Vec::with_capacity(config.sections.len());
    for (index, section) in config.sections.iter().enumerate() {
        let mut fields = Vec::with_capacity(section.fields.len());
        for field in &section.fields {
            let answer = answer_for(answers, &field.field_name);
            let value = if answer.is_empty() {
                field.default.as_deref().unwrap_or("")
            } else {
                answer
            };
            fields.push(render_field(field, value)?);
        }

        sections.push(SectionView {
            category: &section.category,
            title: &section.title,
            open: index == open_index,
            fields,
        });
    }

    Ok(FormTemplate { sections }.render()?)
}
