use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::form::{ElementKind, Form, FormElement, ROW_KEY, ROW_VALUE};
use crate::form_data::FormData;
use crate::pillar::Pillar;

/// Builds a [`FormData`] for one formula by merging the form's structure
/// with the values found in a previously persisted pillar.
///
/// The merge always materializes containers: groups become mappings and
/// collections become sequences (seeded from the form's declared default
/// rows when the pillar has none), so locator-addressed writes find their
/// parents right away. Scalar fields are only installed when the pillar
/// provides a value; absent ones stay unset and resolve to their default on
/// read. Pillar data at paths the form does not declare is ignored.
pub struct FormDataReader<'a> {
    form: Arc<Form>,
    pillar: &'a Pillar,
}

impl<'a> FormDataReader<'a> {
    pub fn new(form: Arc<Form>, pillar: &'a Pillar) -> Self {
        Self { form, pillar }
    }

    pub fn form_data(self) -> FormData {
        log::debug!("merging pillar values into the form structure");
        let root = elements_from_pillar(self.form.root().elements(), Some(self.pillar.data()));
        FormData::new(self.form, Value::Mapping(root))
    }
}

/// Converts one level of pillar data guided by the given schema elements.
/// Used for group bodies and for collection rows alike; the reserved `$key`
/// element of keyed prototypes is handled by the row conversion instead.
fn elements_from_pillar(elements: &[FormElement], data: Option<&Value>) -> Mapping {
    let mut out = Mapping::new();
    let map = data.and_then(Value::as_mapping);
    for element in elements {
        if element.id() == ROW_KEY {
            continue;
        }
        let raw = map.and_then(|m| m.get(element.id()));
        match element.kind() {
            ElementKind::Group => {
                out.insert(
                    Value::String(element.id().to_string()),
                    Value::Mapping(elements_from_pillar(element.elements(), raw)),
                );
            }
            ElementKind::Collection => {
                let rows = match raw.or_else(|| element.default()) {
                    Some(value) => rows_from_pillar(element, value),
                    None => Vec::new(),
                };
                out.insert(
                    Value::String(element.id().to_string()),
                    Value::Sequence(rows),
                );
            }
            ElementKind::Field => {
                if let Some(value) = raw {
                    out.insert(Value::String(element.id().to_string()), value.clone());
                }
            }
        }
    }
    out
}

/// Converts a pillar-shaped collection value into the internal row form,
/// preserving the pillar's item order.
///
/// Keyed collections arrive as a mapping of name to attributes and become
/// rows tagged with `$key`; scalar collections arrive as a plain list and
/// become `{"$value" => v}` rows; everything else is a sequence of row
/// mappings converted against the prototype.
pub(crate) fn rows_from_pillar(collection: &FormElement, value: &Value) -> Vec<Value> {
    match value {
        Value::Mapping(map) if collection.keyed() => map
            .iter()
            .map(|(name, attrs)| {
                let mut row = Mapping::new();
                row.insert(Value::String(ROW_KEY.to_string()), name.clone());
                for (field, field_value) in elements_from_pillar(collection.elements(), Some(attrs))
                {
                    row.insert(field, field_value);
                }
                Value::Mapping(row)
            })
            .collect(),
        Value::Sequence(items) if collection.scalar() => items
            .iter()
            .map(|item| {
                let mut row = Mapping::new();
                row.insert(Value::String(ROW_VALUE.to_string()), item.clone());
                Value::Mapping(row)
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| Value::Mapping(elements_from_pillar(collection.elements(), Some(item))))
            .collect(),
        _ => Vec::new(),
    }
}
