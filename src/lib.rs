//! Schema-driven form data engine for provisioning formulas.
//!
//! A formula ships a form description (`form.yml`) declaring groups,
//! collections and fields with their defaults. This crate parses that
//! description, merges it with the formula's persisted pillar document into
//! a locator-addressed [`FormData`] tree, lets a front-end mutate the tree
//! through [`FormElementLocator`]s, and serializes it back into pillar form.
//!
//! The typical round trip:
//!
//! ```text
//! Pillar --FormDataReader--> FormData --(get/update/add_item/...)-->
//!   FormData --FormDataWriter--> Pillar
//! ```

mod configurations;
mod errors;
mod form;
mod form_data;
mod form_data_reader;
mod form_data_writer;
mod formula;
mod locator;
mod pillar;

pub use configurations::{Configuration, Configurator, ConfiguratorRegistry, Mode, Settings};
pub use errors::{ConfigurationError, FormDataError, FormError, PillarError};
pub use form::{ElementKind, Form, FormElement, ROW_KEY, ROW_VALUE};
pub use form_data::FormData;
pub use form_data_reader::FormDataReader;
pub use form_data_writer::FormDataWriter;
pub use formula::{Formula, Metadata};
pub use locator::{FormElementLocator, ParseLocatorError, Segment};
pub use pillar::Pillar;
