use std::sync::Arc;

use serde_yaml::Value;

use crate::errors::FormDataError;
use crate::form::{Form, ROW_KEY};
use crate::form_data_reader::FormDataReader;
use crate::form_data_writer::FormDataWriter;
use crate::locator::{FormElementLocator, Segment};
use crate::pillar::Pillar;

/// Holds the data of one form: a tree of mappings and sequences addressed
/// exclusively through [`FormElementLocator`]s.
///
/// Reads are total for schema-declared locators: a locator with no stored
/// value resolves to the form's declared default. Writes never create
/// missing intermediate containers; addressing absent structure is a caller
/// error and fails with a [`FormDataError`].
///
/// The backing tree is exclusively owned. `clone` produces a structurally
/// independent deep copy, so two editing contexts never share mutable state.
#[derive(Clone, Debug)]
pub struct FormData {
    form: Arc<Form>,
    data: Value,
}

impl FormData {
    /// Builds a `FormData` merging the form's defaults with the values of a
    /// previously persisted pillar.
    pub fn from_pillar(form: Arc<Form>, pillar: &Pillar) -> FormData {
        FormDataReader::new(form, pillar).form_data()
    }

    pub fn new(form: Arc<Form>, initial: Value) -> FormData {
        FormData {
            form,
            data: initial,
        }
    }

    pub fn form(&self) -> &Arc<Form> {
        &self.form
    }

    /// Value at `locator`: the stored value, else the schema's declared
    /// default for that locator, else `Value::Null`.
    pub fn get(&self, locator: &FormElementLocator) -> Value {
        match find_by_locator(&self.data, locator) {
            Some(value) => value.clone(),
            None => self.default_for(locator),
        }
    }

    /// Assigns `value` at `locator`. The parent container must already
    /// exist.
    pub fn update(
        &mut self,
        locator: &FormElementLocator,
        value: Value,
    ) -> Result<(), FormDataError> {
        let last = locator
            .last()
            .cloned()
            .ok_or_else(|| FormDataError::MissingItem(locator.clone()))?;
        let parent_locator = locator.parent();
        let parent = find_by_locator_mut(&mut self.data, &parent_locator)
            .ok_or(FormDataError::MissingContainer(parent_locator))?;
        write_at(parent, &last, value, locator)
    }

    /// Appends `value` to the collection at `locator`, preserving insertion
    /// order.
    pub fn add_item(
        &mut self,
        locator: &FormElementLocator,
        value: Value,
    ) -> Result<(), FormDataError> {
        match find_by_locator_mut(&mut self.data, locator) {
            Some(Value::Sequence(rows)) => {
                rows.push(value);
                Ok(())
            }
            Some(_) => Err(FormDataError::NotACollection(locator.clone())),
            None => Err(FormDataError::MissingContainer(locator.clone())),
        }
    }

    /// Replaces the collection member addressed by `locator` (by position,
    /// or by `$key` name).
    pub fn update_item(
        &mut self,
        locator: &FormElementLocator,
        value: Value,
    ) -> Result<(), FormDataError> {
        let last = locator
            .last()
            .cloned()
            .ok_or_else(|| FormDataError::MissingItem(locator.clone()))?;
        let parent_locator = locator.parent();
        match find_by_locator_mut(&mut self.data, &parent_locator) {
            Some(parent) => {
                if matches!(parent, Value::Sequence(_)) {
                    write_at(parent, &last, value, locator)
                } else {
                    Err(FormDataError::NotACollection(parent_locator))
                }
            }
            None => Err(FormDataError::MissingContainer(parent_locator)),
        }
    }

    /// Removes the collection member addressed by `locator`. Removal is
    /// positional: members past the removed one shift down by one, so held
    /// locators into the same collection must be recomputed afterwards.
    pub fn remove_item(&mut self, locator: &FormElementLocator) -> Result<(), FormDataError> {
        let last = locator
            .last()
            .cloned()
            .ok_or_else(|| FormDataError::MissingItem(locator.clone()))?;
        let parent_locator = locator.parent();
        let rows = match find_by_locator_mut(&mut self.data, &parent_locator) {
            Some(Value::Sequence(rows)) => rows,
            Some(_) => return Err(FormDataError::NotACollection(parent_locator)),
            None => return Err(FormDataError::MissingContainer(parent_locator)),
        };
        let position = match &last {
            Segment::Index(index) if *index < rows.len() => *index,
            Segment::Key(key) => rows
                .iter()
                .position(|row| row_key_matches(row, key))
                .ok_or_else(|| FormDataError::MissingItem(locator.clone()))?,
            Segment::Index(_) => return Err(FormDataError::MissingItem(locator.clone())),
        };
        rows.remove(position);
        Ok(())
    }

    /// Snapshot of the raw backing document.
    pub fn to_h(&self) -> Value {
        self.data.clone()
    }

    /// Serializes into pillar form, guided by the form description.
    pub fn to_pillar_data(&self) -> Value {
        FormDataWriter::new(self).to_pillar_data()
    }

    fn default_for(&self, locator: &FormElementLocator) -> Value {
        self.form
            .find_element_by(locator)
            .map(|element| element.default_value())
            .unwrap_or(Value::Null)
    }
}

/// Recursive descent from `data` along `locator`. Resolution is decided by
/// the current node: a key segment is a map lookup on a mapping and a `$key`
/// row search on a sequence; an index segment is positional on a sequence
/// and a numeric-key lookup on a mapping.
fn find_by_locator<'a>(data: &'a Value, locator: &FormElementLocator) -> Option<&'a Value> {
    let Some(segment) = locator.first() else {
        return Some(data);
    };
    let next = match (data, segment) {
        (Value::Mapping(map), Segment::Key(key)) => map.get(key.as_str()),
        (Value::Mapping(map), Segment::Index(index)) => map.get(Value::from(*index as u64)),
        (Value::Sequence(rows), Segment::Key(key)) => {
            rows.iter().find(|row| row_key_matches(row, key))
        }
        (Value::Sequence(rows), Segment::Index(index)) => rows.get(*index),
        _ => None,
    }?;
    find_by_locator(next, &locator.rest())
}

fn find_by_locator_mut<'a>(
    data: &'a mut Value,
    locator: &FormElementLocator,
) -> Option<&'a mut Value> {
    let Some(segment) = locator.first() else {
        return Some(data);
    };
    let next = match (data, segment) {
        (Value::Mapping(map), Segment::Key(key)) => map.get_mut(key.as_str()),
        (Value::Mapping(map), Segment::Index(index)) => map.get_mut(Value::from(*index as u64)),
        (Value::Sequence(rows), Segment::Key(key)) => {
            rows.iter_mut().find(|row| row_key_matches(row, key))
        }
        (Value::Sequence(rows), Segment::Index(index)) => rows.get_mut(*index),
        _ => None,
    }?;
    find_by_locator_mut(next, &locator.rest())
}

fn write_at(
    parent: &mut Value,
    segment: &Segment,
    value: Value,
    locator: &FormElementLocator,
) -> Result<(), FormDataError> {
    match (parent, segment) {
        (Value::Mapping(map), Segment::Key(key)) => {
            map.insert(Value::String(key.clone()), value);
            Ok(())
        }
        (Value::Mapping(map), Segment::Index(index)) => {
            map.insert(Value::from(*index as u64), value);
            Ok(())
        }
        (Value::Sequence(rows), Segment::Index(index)) => match rows.get_mut(*index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FormDataError::MissingItem(locator.clone())),
        },
        (Value::Sequence(rows), Segment::Key(key)) => {
            match rows.iter_mut().find(|row| row_key_matches(row, key)) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(FormDataError::MissingItem(locator.clone())),
            }
        }
        _ => Err(FormDataError::NotAContainer(locator.parent())),
    }
}

fn row_key_matches(row: &Value, key: &str) -> bool {
    row.as_mapping()
        .and_then(|map| map.get(ROW_KEY))
        .and_then(Value::as_str)
        == Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    fn empty_form() -> Arc<Form> {
        Arc::new(Form::from_yaml("{}").unwrap())
    }

    fn data(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn index_segments_address_numeric_mapping_keys() {
        let form_data = FormData::new(empty_form(), data("levels:\n  1: warn\n  2: debug"));
        let locator = FormElementLocator::root().join("levels").join(2usize);
        assert_eq!(form_data.get(&locator), Value::String("debug".into()));
    }

    #[test]
    fn key_segments_match_key_tagged_rows_never_positions() {
        let form_data = FormData::new(
            empty_form(),
            data("hosts:\n- $key: alpha\n  ip: 10.0.0.1\n- $key: beta\n  ip: 10.0.0.2"),
        );
        let locator: FormElementLocator = ".hosts.beta.ip".parse().unwrap();
        assert_eq!(form_data.get(&locator), Value::String("10.0.0.2".into()));
    }

    #[test]
    fn update_does_not_create_missing_containers() {
        let mut form_data = FormData::new(empty_form(), data("{}"));
        let locator: FormElementLocator = ".person.name".parse().unwrap();
        let err = form_data
            .update(&locator, Value::String("Jane".into()))
            .unwrap_err();
        assert!(matches!(err, FormDataError::MissingContainer(_)));
    }

    #[test]
    fn update_into_scalar_parent_is_rejected() {
        let mut form_data = FormData::new(empty_form(), data("color: blue"));
        let locator: FormElementLocator = ".color.shade".parse().unwrap();
        let err = form_data
            .update(&locator, Value::String("navy".into()))
            .unwrap_err();
        assert!(matches!(err, FormDataError::NotAContainer(_)));
    }

    #[test]
    fn add_item_requires_a_sequence() {
        let mut form_data = FormData::new(empty_form(), data("person:\n  name: Jane"));
        let locator: FormElementLocator = ".person".parse().unwrap();
        let err = form_data
            .add_item(&locator, Value::Mapping(Mapping::new()))
            .unwrap_err();
        assert!(matches!(err, FormDataError::NotACollection(_)));
    }
}
