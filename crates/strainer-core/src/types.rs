//! Semantic types, adapter identities and field metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend families a query can be compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterId {
	Postgres,
	CockroachDb,
	MySql,
	Sqlite,
	MsSql,
	/// Elasticsearch / OpenSearch compatible search engine
	Search,
}

impl AdapterId {
	pub const ALL: [AdapterId; 6] = [
		AdapterId::Postgres,
		AdapterId::CockroachDb,
		AdapterId::MySql,
		AdapterId::Sqlite,
		AdapterId::MsSql,
		AdapterId::Search,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			AdapterId::Postgres => "postgres",
			AdapterId::CockroachDb => "cockroachdb",
			AdapterId::MySql => "mysql",
			AdapterId::Sqlite => "sqlite",
			AdapterId::MsSql => "mssql",
			AdapterId::Search => "search",
		}
	}

	/// Whether the adapter compiles to SQL
	pub fn is_sql(&self) -> bool {
		!matches!(self, AdapterId::Search)
	}
}

impl fmt::Display for AdapterId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Element type of an array-typed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
	String,
	Integer,
	Float,
	Decimal,
	Boolean,
	Date,
	DateTime,
	Uuid,
	Enum,
}

impl ElementType {
	pub const ALL: [ElementType; 9] = [
		ElementType::String,
		ElementType::Integer,
		ElementType::Float,
		ElementType::Decimal,
		ElementType::Boolean,
		ElementType::Date,
		ElementType::DateTime,
		ElementType::Uuid,
		ElementType::Enum,
	];

	/// Element type for a scalar semantic type, if arrays of it exist
	pub fn from_scalar(ty: SemanticType) -> Option<ElementType> {
		ElementType::ALL.into_iter().find(|e| e.scalar() == ty)
	}

	/// The scalar semantic type of one element
	pub fn scalar(self) -> SemanticType {
		match self {
			ElementType::String => SemanticType::String,
			ElementType::Integer => SemanticType::Integer,
			ElementType::Float => SemanticType::Float,
			ElementType::Decimal => SemanticType::Decimal,
			ElementType::Boolean => SemanticType::Boolean,
			ElementType::Date => SemanticType::Date,
			ElementType::DateTime => SemanticType::DateTime,
			ElementType::Uuid => SemanticType::Uuid,
			ElementType::Enum => SemanticType::Enum,
		}
	}
}

/// Filter-relevant classification of a field, independent of storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
	String,
	Integer,
	Float,
	Decimal,
	Boolean,
	Date,
	DateTime,
	Time,
	Uuid,
	Enum,
	Json,
	Coordinates,
	Array(ElementType),
}

impl SemanticType {
	pub const SCALARS: [SemanticType; 12] = [
		SemanticType::String,
		SemanticType::Integer,
		SemanticType::Float,
		SemanticType::Decimal,
		SemanticType::Boolean,
		SemanticType::Date,
		SemanticType::DateTime,
		SemanticType::Time,
		SemanticType::Uuid,
		SemanticType::Enum,
		SemanticType::Json,
		SemanticType::Coordinates,
	];

	/// Every semantic type, scalars first, then one array type per element
	pub fn catalogue() -> Vec<SemanticType> {
		Self::SCALARS
			.iter()
			.copied()
			.chain(ElementType::ALL.iter().map(|e| SemanticType::Array(*e)))
			.collect()
	}

	/// Whether the backend has a native ordering for the type
	pub fn is_orderable(&self) -> bool {
		!matches!(
			self,
			SemanticType::Json | SemanticType::Coordinates | SemanticType::Array(_)
		)
	}

	pub fn is_numeric(&self) -> bool {
		matches!(
			self,
			SemanticType::Integer | SemanticType::Float | SemanticType::Decimal
		)
	}

	pub fn is_temporal(&self) -> bool {
		matches!(
			self,
			SemanticType::Date | SemanticType::DateTime | SemanticType::Time
		)
	}

	pub fn is_array(&self) -> bool {
		matches!(self, SemanticType::Array(_))
	}

	pub fn name(&self) -> String {
		match self {
			SemanticType::Array(element) => format!("array<{}>", element.scalar().name()),
			other => other.scalar_name().to_string(),
		}
	}

	fn scalar_name(&self) -> &'static str {
		match self {
			SemanticType::String => "string",
			SemanticType::Integer => "integer",
			SemanticType::Float => "float",
			SemanticType::Decimal => "decimal",
			SemanticType::Boolean => "boolean",
			SemanticType::Date => "date",
			SemanticType::DateTime => "datetime",
			SemanticType::Time => "time",
			SemanticType::Uuid => "uuid",
			SemanticType::Enum => "enum",
			SemanticType::Json => "json",
			SemanticType::Coordinates => "coordinates",
			SemanticType::Array(_) => "array",
		}
	}
}

impl fmt::Display for SemanticType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name())
	}
}

/// Identity of a queryable (an ORM struct, a table, a search index)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryableId(String);

impl QueryableId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for QueryableId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for QueryableId {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

impl From<String> for QueryableId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
	One,
	Many,
}

/// A dotted field path (`organization.name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
	pub fn new(segments: Vec<String>) -> Self {
		Self(segments)
	}

	pub fn single(name: impl Into<String>) -> Self {
		Self(vec![name.into()])
	}

	/// Parse `a.b.c`
	pub fn parse(dotted: &str) -> Self {
		Self(dotted.split('.').map(str::to_string).collect())
	}

	pub fn segments(&self) -> &[String] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn head(&self) -> Option<&str> {
		self.0.first().map(String::as_str)
	}

	/// Everything after the first segment
	pub fn tail(&self) -> FieldPath {
		Self(self.0.iter().skip(1).cloned().collect())
	}

	pub fn is_nested(&self) -> bool {
		self.0.len() > 1
	}

	pub fn child(&self, segment: impl Into<String>) -> FieldPath {
		let mut segments = self.0.clone();
		segments.push(segment.into());
		Self(segments)
	}

	/// All proper and improper prefixes, shortest first
	pub fn prefixes(&self) -> impl Iterator<Item = FieldPath> + '_ {
		(1..=self.0.len()).map(move |n| Self(self.0[..n].to_vec()))
	}

	pub fn dotted(&self) -> String {
		self.0.join(".")
	}
}

impl fmt::Display for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.dotted())
	}
}

impl From<&str> for FieldPath {
	fn from(s: &str) -> Self {
		Self::parse(s)
	}
}

/// How an association links two queryables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationLink {
	pub target: QueryableId,
	pub cardinality: Cardinality,
	/// Column on the owning side
	pub owner_key: String,
	/// Column on the related side
	pub related_key: String,
}

/// What a field is: a filterable scalar or a link to another queryable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
	Scalar(SemanticType),
	Association(AssociationLink),
}

/// Metadata for one filterable field of a queryable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
	pub name: String,
	/// Storage column (or document field) backing the field
	pub column: String,
	pub kind: FieldKind,
	pub nullable: bool,
	/// Allowed members when the field is enum-typed
	pub enum_values: Option<Vec<String>>,
	/// Backend-native type name, when the field came from introspection
	pub native_type: Option<String>,
}

impl FieldDescriptor {
	pub fn scalar(name: impl Into<String>, semantic_type: SemanticType) -> Self {
		let name = name.into();
		Self {
			column: name.clone(),
			name,
			kind: FieldKind::Scalar(semantic_type),
			nullable: true,
			enum_values: None,
			native_type: None,
		}
	}

	pub fn association(name: impl Into<String>, link: AssociationLink) -> Self {
		let name = name.into();
		Self {
			column: name.clone(),
			name,
			kind: FieldKind::Association(link),
			nullable: true,
			enum_values: None,
			native_type: None,
		}
	}

	pub fn with_column(mut self, column: impl Into<String>) -> Self {
		self.column = column.into();
		self
	}

	pub fn with_nullable(mut self, nullable: bool) -> Self {
		self.nullable = nullable;
		self
	}

	pub fn with_enum_values(mut self, members: Vec<String>) -> Self {
		self.enum_values = Some(members);
		self
	}

	pub fn with_native_type(mut self, native_type: impl Into<String>) -> Self {
		self.native_type = Some(native_type.into());
		self
	}

	pub fn semantic_type(&self) -> Option<SemanticType> {
		match &self.kind {
			FieldKind::Scalar(ty) => Some(*ty),
			FieldKind::Association(_) => None,
		}
	}

	pub fn is_association(&self) -> bool {
		matches!(self.kind, FieldKind::Association(_))
	}

	pub fn association_link(&self) -> Option<&AssociationLink> {
		match &self.kind {
			FieldKind::Association(link) => Some(link),
			FieldKind::Scalar(_) => None,
		}
	}

	pub fn related_queryable(&self) -> Option<&QueryableId> {
		self.association_link().map(|link| &link.target)
	}
}
