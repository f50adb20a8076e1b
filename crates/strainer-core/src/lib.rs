//! # strainer-core
//!
//! Backend-independent building blocks of the strainer filter engine:
//!
//! - [`filter`]: the filter AST and the payload parser
//! - [`order`]: order terms
//! - [`operators`] and [`operator_registry`]: the operator vocabulary and
//!   which adapter implements what
//! - [`operand`]: operand coercion against semantic types
//! - [`capability`]: detected backend capabilities
//! - [`queryable`] and [`schema_registry`]: queryable metadata supplied by
//!   the schema layer
//! - [`access`]: the filterable-field allow-list
//! - [`settings`]: engine configuration
//!
//! ## Example
//!
//! ```
//! use strainer_core::filter::FilterNode;
//! use strainer_core::operators::OperatorTag;
//! use serde_json::json;
//!
//! let node = FilterNode::parse(&json!({"age": {"_gte": 18}})).unwrap();
//! assert_eq!(node, FilterNode::leaf("age", OperatorTag::Gte, 18));
//! ```

pub mod access;
pub mod capability;
pub mod error;
pub mod filter;
pub mod operand;
pub mod operator_registry;
pub mod operators;
pub mod order;
pub mod queryable;
pub mod schema_registry;
pub mod settings;
pub mod types;
pub mod value;

pub use access::FieldAccess;
pub use capability::{AdapterCapability, Feature, Version};
pub use error::{FilterError, FilterResult};
pub use filter::{Combinator, FilterNode, Leaf};
pub use operand::Operand;
pub use operator_registry::{OperatorRegistry, OperatorSpec};
pub use operators::{Arity, CostClass, OperatorTag};
pub use order::{Direction, NullsOrder, OrderTerm};
pub use queryable::{Association, Column, Queryable};
pub use schema_registry::QueryableRegistry;
pub use settings::{
	CompilerSettings, ComplexitySettings, RegistrySettings, StrainerSettings, ToManyMode,
};
pub use types::{
	AdapterId, AssociationLink, Cardinality, ElementType, FieldDescriptor, FieldKind, FieldPath,
	QueryableId, SemanticType,
};
pub use value::{DistanceUnit, GeoPoint, Value};
