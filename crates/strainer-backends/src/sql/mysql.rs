//! MySQL dialect
//!
//! - Identifiers: backticks
//! - Placeholders: `?`
//! - No `NULLS FIRST` / `NULLS LAST`; emulated with a null-indicator key
//! - OFFSET requires LIMIT

use super::SqlDialect;
use super::dialect::to_int;
use super::writer::SqlWriter;
use super::SelectQuery;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
	pub fn new() -> Self {
		Self
	}
}

impl SqlDialect for MySqlDialect {
	fn adapter(&self) -> AdapterId {
		AdapterId::MySql
	}

	fn escape_iden(&self, ident: &str) -> String {
		format!("`{}`", ident.replace('`', "``"))
	}

	fn placeholder(&self, _index: usize) -> String {
		"?".to_string()
	}

	fn supports_nulls_ordering(&self) -> bool {
		false
	}

	fn write_pagination(&self, writer: &mut SqlWriter, query: &SelectQuery) {
		match (query.limit, query.offset) {
			(Some(limit), offset) => {
				writer.push_keyword("LIMIT");
				writer.push_space();
				writer.push_value(to_int(limit), |i| self.placeholder(i));
				if let Some(offset) = offset {
					writer.push_keyword("OFFSET");
					writer.push_space();
					writer.push_value(to_int(offset), |i| self.placeholder(i));
				}
			}
			(None, Some(offset)) => {
				// Documented idiom for "all remaining rows"
				writer.push_keyword("LIMIT 18446744073709551615 OFFSET");
				writer.push_space();
				writer.push_value(to_int(offset), |i| self.placeholder(i));
			}
			(None, None) => {}
		}
	}
}
