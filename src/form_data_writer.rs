use serde_yaml::{Mapping, Value};

use crate::form::{ElementKind, FormElement, ROW_KEY, ROW_VALUE};
use crate::form_data::FormData;
use crate::locator::FormElementLocator;

/// Serializes a [`FormData`] into pillar form.
///
/// The writer is schema-authoritative: it walks the form description and
/// reads each declared element through [`FormData::get`], so unset values
/// surface as their defaults and get materialized into the output, while
/// data the form does not declare is dropped. Keyed collections are written
/// as a mapping keyed by each row's `$key`, scalar collections as a plain
/// list, and any other collection as a sequence of row mappings.
pub struct FormDataWriter<'a> {
    form_data: &'a FormData,
}

impl<'a> FormDataWriter<'a> {
    pub fn new(form_data: &'a FormData) -> Self {
        Self { form_data }
    }

    pub fn to_pillar_data(&self) -> Value {
        let root = self.form_data.form().root();
        Value::Mapping(self.elements_to_pillar(root.elements(), &FormElementLocator::root()))
    }

    /// Writes one level of declared elements: a group body or a collection
    /// row (whose `$key`, if any, has already become the row's map key).
    fn elements_to_pillar(&self, elements: &[FormElement], locator: &FormElementLocator) -> Mapping {
        let mut out = Mapping::new();
        for element in elements {
            if element.id() == ROW_KEY {
                continue;
            }
            let element_locator = locator.join(element.id());
            match element.kind() {
                ElementKind::Field => {
                    let value = self.form_data.get(&element_locator);
                    // Null marks "unset with no declared default"; there is
                    // nothing to persist in that case.
                    if !value.is_null() {
                        out.insert(Value::String(element.id().to_string()), value);
                    }
                }
                ElementKind::Group => {
                    out.insert(
                        Value::String(element.id().to_string()),
                        Value::Mapping(self.elements_to_pillar(element.elements(), &element_locator)),
                    );
                }
                ElementKind::Collection => {
                    out.insert(
                        Value::String(element.id().to_string()),
                        self.collection_to_pillar(element, &element_locator),
                    );
                }
            }
        }
        out
    }

    fn collection_to_pillar(
        &self,
        collection: &FormElement,
        locator: &FormElementLocator,
    ) -> Value {
        let rows = match self.form_data.get(locator) {
            Value::Sequence(rows) => rows,
            _ => Vec::new(),
        };
        if collection.keyed() {
            let mut out = Mapping::new();
            for (index, row) in rows.iter().enumerate() {
                let Some(name) = row.as_mapping().and_then(|m| m.get(ROW_KEY)) else {
                    log::warn!("dropping row without {} at {}[{}]", ROW_KEY, locator, index);
                    continue;
                };
                out.insert(
                    name.clone(),
                    Value::Mapping(
                        self.elements_to_pillar(collection.elements(), &locator.join(index)),
                    ),
                );
            }
            Value::Mapping(out)
        } else if collection.scalar() {
            Value::Sequence(
                rows.iter()
                    .filter_map(|row| {
                        row.as_mapping().and_then(|m| m.get(ROW_VALUE)).cloned()
                    })
                    .collect(),
            )
        } else {
            Value::Sequence(
                rows.iter()
                    .enumerate()
                    .map(|(index, _)| {
                        Value::Mapping(
                            self.elements_to_pillar(collection.elements(), &locator.join(index)),
                        )
                    })
                    .collect(),
            )
        }
    }
}
