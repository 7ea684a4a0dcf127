use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::errors::FormError;
use crate::form_data_reader::rows_from_pillar;
use crate::locator::{FormElementLocator, Segment};

/// Reserved row field naming a collection member for `$key`-based lookup.
pub const ROW_KEY: &str = "$key";
/// Reserved row field carrying the value of a scalar collection member.
pub const ROW_VALUE: &str = "$value";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Field,
    Group,
    Collection,
}

/// One element of a form description: a scalar field, a group of named
/// elements, or a collection of rows sharing a prototype.
#[derive(Clone, Debug)]
pub struct FormElement {
    id: String,
    kind: ElementKind,
    element_type: String,
    default: Option<Value>,
    values: Vec<Value>,
    elements: Vec<FormElement>,
    keyed: bool,
    scalar: bool,
}

impl FormElement {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Raw `$type` from the form description ("text", "select", "group", ...).
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Declared `$default`, if any.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Allowed values of a `select` field.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Children of a group, or the row prototype of a collection.
    pub fn elements(&self) -> &[FormElement] {
        &self.elements
    }

    /// Whether collection rows carry a `$key` field and are persisted as a
    /// mapping keyed by it.
    pub fn keyed(&self) -> bool {
        self.keyed
    }

    /// Whether the collection holds bare scalars, persisted as a plain list
    /// and held internally as `{"$value" => v}` rows.
    pub fn scalar(&self) -> bool {
        self.scalar
    }

    pub fn child(&self, id: &str) -> Option<&FormElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Default value synthesized for this element when no data is stored.
    ///
    /// Fields yield their declared or type-derived default (Null when there
    /// is none), groups a mapping of their children's defaults, collections
    /// their declared default rows in internal row form.
    pub fn default_value(&self) -> Value {
        match self.kind {
            ElementKind::Field => self.default.clone().unwrap_or(Value::Null),
            ElementKind::Group => {
                let mut map = Mapping::new();
                for child in &self.elements {
                    let value = child.default_value();
                    if !value.is_null() {
                        map.insert(Value::String(child.id.clone()), value);
                    }
                }
                Value::Mapping(map)
            }
            ElementKind::Collection => {
                let rows = match &self.default {
                    Some(value) => rows_from_pillar(self, value),
                    None => Vec::new(),
                };
                Value::Sequence(rows)
            }
        }
    }

    /// Recursive schema lookup. Row selectors (index segments, and key
    /// segments that do not name a prototype child) are transparent: the
    /// descent continues against the collection's prototype.
    fn find(&self, locator: &FormElementLocator) -> Option<&FormElement> {
        let Some(segment) = locator.first() else {
            return Some(self);
        };
        match self.kind {
            ElementKind::Field => None,
            ElementKind::Group => match segment {
                Segment::Key(key) => self.child(key)?.find(&locator.rest()),
                Segment::Index(_) => None,
            },
            ElementKind::Collection => match segment {
                Segment::Key(key) => match self.child(key) {
                    Some(child) => child.find(&locator.rest()),
                    None => self.find(&locator.rest()),
                },
                Segment::Index(_) => self.find(&locator.rest()),
            },
        }
    }

    fn parse(id: &str, desc: &Value) -> Result<FormElement, FormError> {
        let map = desc.as_mapping().ok_or(FormError::NotAMapping)?;
        let element_type = map
            .get("$type")
            .and_then(Value::as_str)
            .unwrap_or("text")
            .to_string();

        match element_type.as_str() {
            "group" | "namespace" | "hidden-group" => Ok(FormElement {
                id: id.to_string(),
                kind: ElementKind::Group,
                element_type,
                default: None,
                values: Vec::new(),
                elements: Self::parse_children(map)?,
                keyed: false,
                scalar: false,
            }),
            "edit-group" => {
                let prototype = map
                    .get("$prototype")
                    .ok_or_else(|| FormError::MissingPrototype(id.to_string()))?;
                let proto_map = prototype.as_mapping().ok_or(FormError::NotAMapping)?;
                // A prototype with its own $type is a single bare field; the
                // collection then holds plain scalars.
                let (elements, scalar) = if proto_map.contains_key("$type") {
                    (vec![Self::parse(ROW_VALUE, prototype)?], true)
                } else {
                    (Self::parse_children(proto_map)?, false)
                };
                let keyed = elements.iter().any(|e| e.id == ROW_KEY);
                Ok(FormElement {
                    id: id.to_string(),
                    kind: ElementKind::Collection,
                    element_type,
                    default: map.get("$default").cloned(),
                    values: Vec::new(),
                    elements,
                    keyed,
                    scalar,
                })
            }
            _ => {
                let values: Vec<Value> = map
                    .get("$values")
                    .and_then(Value::as_sequence)
                    .cloned()
                    .unwrap_or_default();
                let default = map
                    .get("$default")
                    .cloned()
                    .or_else(|| Self::derived_default(&element_type, &values));
                Ok(FormElement {
                    id: id.to_string(),
                    kind: ElementKind::Field,
                    element_type,
                    default,
                    values,
                    elements: Vec::new(),
                    keyed: false,
                    scalar: false,
                })
            }
        }
    }

    fn derived_default(element_type: &str, values: &[Value]) -> Option<Value> {
        match element_type {
            "select" => values.first().cloned(),
            "boolean" => Some(Value::Bool(false)),
            "text" => Some(Value::String(String::new())),
            _ => None,
        }
    }

    fn parse_children(map: &Mapping) -> Result<Vec<FormElement>, FormError> {
        let mut children = Vec::new();
        for (key, desc) in map {
            let Some(id) = key.as_str() else { continue };
            // $-prefixed entries are element attributes, except the reserved
            // $key field of keyed prototypes.
            if id.starts_with('$') && id != ROW_KEY {
                continue;
            }
            children.push(Self::parse(id, desc)?);
        }
        Ok(children)
    }
}

/// A parsed form description: the static tree of allowed elements, their
/// kinds and their defaults.
#[derive(Clone, Debug)]
pub struct Form {
    root: FormElement,
}

impl Form {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FormError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, FormError> {
        let doc: Value = serde_yaml::from_str(text)?;
        let map = doc.as_mapping().ok_or(FormError::NotAMapping)?;
        Ok(Form {
            root: FormElement {
                id: "root".to_string(),
                kind: ElementKind::Group,
                element_type: "group".to_string(),
                default: None,
                values: Vec::new(),
                elements: FormElement::parse_children(map)?,
                keyed: false,
                scalar: false,
            },
        })
    }

    pub fn root(&self) -> &FormElement {
        &self.root
    }

    /// Schema element addressed by `locator`, if the form declares one.
    pub fn find_element_by(&self, locator: &FormElementLocator) -> Option<&FormElement> {
        self.root.find(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"
person:
  $type: group
  name:
    $type: text
    $default: John Doe
  computers:
    $type: edit-group
    $prototype:
      $key:
        $type: text
      brand:
        $type: select
        $values: [Dell, Lenovo]
  projects:
    $type: edit-group
    $prototype:
      $type: text
"#;

    #[test]
    fn parses_groups_collections_and_fields() {
        let form = Form::from_yaml(FORM).unwrap();
        let person = form.root().child("person").unwrap();
        assert_eq!(person.kind(), ElementKind::Group);

        let computers = person.child("computers").unwrap();
        assert_eq!(computers.kind(), ElementKind::Collection);
        assert!(computers.keyed());
        assert!(!computers.scalar());

        let projects = person.child("projects").unwrap();
        assert!(projects.scalar());
        assert_eq!(projects.elements().len(), 1);
    }

    #[test]
    fn finds_elements_through_row_selectors() {
        let form = Form::from_yaml(FORM).unwrap();
        let locator: FormElementLocator = ".person.computers[1].brand".parse().unwrap();
        let brand = form.find_element_by(&locator).unwrap();
        assert_eq!(brand.id(), "brand");
        // select without an explicit default falls back to the first value
        assert_eq!(brand.default(), Some(&Value::String("Dell".into())));

        let by_name: FormElementLocator = ".person.computers.workhorse.brand".parse().unwrap();
        assert_eq!(form.find_element_by(&by_name).unwrap().id(), "brand");
    }

    #[test]
    fn unknown_paths_resolve_to_none() {
        let form = Form::from_yaml(FORM).unwrap();
        let locator: FormElementLocator = ".person.age".parse().unwrap();
        assert!(form.find_element_by(&locator).is_none());
    }

    #[test]
    fn group_defaults_nest_field_defaults() {
        let form = Form::from_yaml(FORM).unwrap();
        let person = form.root().child("person").unwrap();
        let Value::Mapping(defaults) = person.default_value() else {
            panic!("group default should be a mapping");
        };
        assert_eq!(
            defaults.get("name"),
            Some(&Value::String("John Doe".into()))
        );
    }
}
