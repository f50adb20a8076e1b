//! Queryable definitions
//!
//! A [`Queryable`] is what the schema/ORM layer hands us: an identity, the
//! backend it lives on, its columns with their *native* type names, and its
//! associations. Adapters turn the native type names into
//! [`crate::types::SemanticType`]s.

use crate::types::{AdapterId, AssociationLink, Cardinality, QueryableId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored column and its backend-native type name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
	pub name: String,
	pub native_type: String,
	pub nullable: bool,
}

/// A named relationship to another queryable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
	pub name: String,
	pub link: AssociationLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queryable {
	pub id: QueryableId,
	/// Table, view or index name
	pub source: String,
	pub adapter: AdapterId,
	pub primary_key: String,
	pub columns: Vec<Column>,
	pub associations: Vec<Association>,
	/// Enum overrides from the schema layer: column -> allowed members
	pub enums: BTreeMap<String, Vec<String>>,
}

impl Queryable {
	pub fn new(id: impl Into<QueryableId>, source: impl Into<String>, adapter: AdapterId) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			adapter,
			primary_key: "id".to_string(),
			columns: Vec::new(),
			associations: Vec::new(),
			enums: BTreeMap::new(),
		}
	}

	pub fn primary_key(mut self, column: impl Into<String>) -> Self {
		self.primary_key = column.into();
		self
	}

	/// Add a NOT NULL column
	pub fn column(mut self, name: impl Into<String>, native_type: impl Into<String>) -> Self {
		self.columns.push(Column {
			name: name.into(),
			native_type: native_type.into(),
			nullable: false,
		});
		self
	}

	pub fn nullable_column(
		mut self,
		name: impl Into<String>,
		native_type: impl Into<String>,
	) -> Self {
		self.columns.push(Column {
			name: name.into(),
			native_type: native_type.into(),
			nullable: true,
		});
		self
	}

	/// Mark a column as enum-typed, overriding its storage type
	pub fn with_enum<I, S>(mut self, column: impl Into<String>, members: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.enums
			.insert(column.into(), members.into_iter().map(Into::into).collect());
		self
	}

	/// To-one association where this side holds the foreign key
	pub fn belongs_to(
		mut self,
		name: impl Into<String>,
		target: impl Into<QueryableId>,
		foreign_key: impl Into<String>,
	) -> Self {
		self.associations.push(Association {
			name: name.into(),
			link: AssociationLink {
				target: target.into(),
				cardinality: Cardinality::One,
				owner_key: foreign_key.into(),
				related_key: "id".to_string(),
			},
		});
		self
	}

	/// To-one association where the related side holds the foreign key
	pub fn has_one(
		mut self,
		name: impl Into<String>,
		target: impl Into<QueryableId>,
		foreign_key: impl Into<String>,
	) -> Self {
		let owner_key = self.primary_key.clone();
		self.associations.push(Association {
			name: name.into(),
			link: AssociationLink {
				target: target.into(),
				cardinality: Cardinality::One,
				owner_key,
				related_key: foreign_key.into(),
			},
		});
		self
	}

	/// To-many association; `foreign_key` lives on the related side
	pub fn has_many(
		mut self,
		name: impl Into<String>,
		target: impl Into<QueryableId>,
		foreign_key: impl Into<String>,
	) -> Self {
		let owner_key = self.primary_key.clone();
		self.associations.push(Association {
			name: name.into(),
			link: AssociationLink {
				target: target.into(),
				cardinality: Cardinality::Many,
				owner_key,
				related_key: foreign_key.into(),
			},
		});
		self
	}

	pub fn find_column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name == name)
	}

	pub fn find_association(&self, name: &str) -> Option<&Association> {
		self.associations.iter().find(|a| a.name == name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_builder_collects_columns_and_associations() {
		let user = Queryable::new("User", "users", AdapterId::Postgres)
			.column("id", "int8")
			.column("age", "int4")
			.nullable_column("status", "text")
			.with_enum("status", ["active", "pending"])
			.belongs_to("organization", "Organization", "organization_id")
			.has_many("posts", "Post", "author_id");

		assert_eq!(user.columns.len(), 3);
		assert!(user.find_column("status").map(|c| c.nullable).unwrap_or(false));
		assert_eq!(user.enums["status"], vec!["active", "pending"]);

		let org = user.find_association("organization").unwrap();
		assert_eq!(org.link.cardinality, Cardinality::One);
		assert_eq!(org.link.owner_key, "organization_id");
		assert_eq!(org.link.related_key, "id");

		let posts = user.find_association("posts").unwrap();
		assert_eq!(posts.link.cardinality, Cardinality::Many);
		assert_eq!(posts.link.owner_key, "id");
		assert_eq!(posts.link.related_key, "author_id");
	}
}
