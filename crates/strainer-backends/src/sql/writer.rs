//! SQL Writer helper for constructing SQL strings
//!
//! Tracks spacing, placeholder numbering and the collected parameter values
//! while a dialect renders a [`super::SelectQuery`]. Subqueries are written
//! into the same writer, so placeholder numbering never needs rewriting.

use strainer_core::value::Value;

#[derive(Debug, Clone)]
pub struct SqlWriter {
	sql: String,
	values: Vec<Value>,
	/// Next parameter index (1-based)
	param_index: usize,
}

impl SqlWriter {
	pub fn new() -> Self {
		Self {
			sql: String::new(),
			values: Vec::new(),
			param_index: 1,
		}
	}

	pub fn push(&mut self, s: &str) {
		self.sql.push_str(s);
	}

	pub fn push_space(&mut self) {
		if !self.sql.is_empty() && !self.sql.ends_with(' ') && !self.sql.ends_with('(') {
			self.sql.push(' ');
		}
	}

	/// Push a keyword with automatic spacing
	pub fn push_keyword(&mut self, keyword: &str) {
		self.push_space();
		self.sql.push_str(keyword);
	}

	pub fn push_identifier<F>(&mut self, ident: &str, escape_fn: F)
	where
		F: FnOnce(&str) -> String,
	{
		self.sql.push_str(&escape_fn(ident));
	}

	/// Push a placeholder and collect its value.
	///
	/// NULL is inlined and consumes no parameter index, which keeps typed
	/// backends from rejecting an untyped NULL parameter.
	pub fn push_value<F>(&mut self, value: Value, format_fn: F) -> Option<usize>
	where
		F: FnOnce(usize) -> String,
	{
		if value.is_null() {
			self.sql.push_str("NULL");
			return None;
		}

		let index = self.param_index;
		self.sql.push_str(&format_fn(index));
		self.values.push(value);
		self.param_index += 1;
		Some(index)
	}

	pub fn push_list<I, T, F>(&mut self, items: I, separator: &str, mut f: F)
	where
		I: IntoIterator<Item = T>,
		F: FnMut(&mut Self, T),
	{
		let mut first = true;
		for item in items {
			if !first {
				self.sql.push_str(separator);
			}
			f(self, item);
			first = false;
		}
	}

	pub fn sql(&self) -> &str {
		&self.sql
	}

	pub fn values(&self) -> &[Value] {
		&self.values
	}

	pub fn param_index(&self) -> usize {
		self.param_index
	}

	pub fn is_empty(&self) -> bool {
		self.sql.is_empty()
	}

	/// Consume the writer and return (SQL, parameters)
	pub fn finish(self) -> (String, Vec<Value>) {
		(self.sql, self.values)
	}
}

impl Default for SqlWriter {
	fn default() -> Self {
		Self::new()
	}
}
