pub mod document;
pub mod simulator;
pub mod store;
pub mod validator;

pub use document::{from_document, parse_document, to_document, to_json, DOCUMENT_VERSION};
pub use simulator::{Simulator, Walk};
pub use store::{EdgeChange, GraphStore, NodeChange, NodeTemplate};
pub use validator::{validate, validate_workflow, ValidationReport};
