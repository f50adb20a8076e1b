use crate::handle::BackendHandle;
use std::collections::BTreeMap;
use strainer_core::capability::{AdapterCapability, Feature, Version};
use strainer_core::types::AdapterId;

/// Features a handle may probe directly instead of inferring them from the
/// version number
const PROBED: [Feature; 3] = [Feature::Json, Feature::Regex, Feature::Spatial];

/// Probe `handle` and build its capability set.
///
/// Never fails. An unreachable backend or an unparseable version string
/// yields [`AdapterCapability::conservative`].
pub async fn detect(handle: &dyn BackendHandle) -> AdapterCapability {
	let adapter = handle.adapter();
	let raw_version = match handle.server_version().await {
		Ok(raw) => raw,
		Err(err) => {
			tracing::warn!(
				adapter = %adapter,
				error = %err,
				"version probe failed, assuming no optional features"
			);
			return AdapterCapability::conservative(adapter);
		}
	};

	let extensions = match handle.extensions().await {
		Ok(extensions) => extensions,
		Err(err) => {
			tracing::warn!(adapter = %adapter, error = %err, "extension probe failed");
			Vec::new()
		}
	};

	let mut probed = BTreeMap::new();
	for feature in PROBED {
		match handle.probe_feature(feature).await {
			Ok(Some(enabled)) => {
				probed.insert(feature, enabled);
			}
			Ok(None) => {}
			Err(err) => {
				tracing::warn!(
					adapter = %adapter,
					feature = %feature,
					error = %err,
					"feature probe failed"
				);
				probed.insert(feature, false);
			}
		}
	}

	let capability = capability_from(adapter, &raw_version, &extensions, &probed);
	tracing::debug!(
		adapter = %adapter,
		version = ?capability.version,
		features = ?capability.enabled_features().collect::<Vec<_>>(),
		"detected backend capabilities"
	);
	capability
}

/// Capability set from probe results.
///
/// Direct probe results override version-based inference.
pub fn capability_from(
	adapter: AdapterId,
	raw_version: &str,
	extensions: &[String],
	probed: &BTreeMap<Feature, bool>,
) -> AdapterCapability {
	let Some(version) = Version::parse(raw_version) else {
		tracing::warn!(
			adapter = %adapter,
			raw_version,
			"unparseable server version, assuming no optional features"
		);
		return AdapterCapability::conservative(adapter);
	};

	let mut capability = AdapterCapability::new(adapter, Some(version));
	for extension in extensions {
		capability = capability.with_extension(extension.to_ascii_lowercase());
	}
	let mariadb = raw_version.to_ascii_lowercase().contains("mariadb");
	let inferred = inferred_features(adapter, version, mariadb, &capability);
	for feature in Feature::ALL {
		let enabled = probed
			.get(&feature)
			.copied()
			.unwrap_or_else(|| inferred.contains(&feature));
		capability = capability.with_feature(feature, enabled);
	}
	capability
}

fn inferred_features(
	adapter: AdapterId,
	version: Version,
	mariadb: bool,
	capability: &AdapterCapability,
) -> Vec<Feature> {
	let v = |major, minor, patch| version.at_least(major, minor, patch);
	let candidates = match adapter {
		AdapterId::Postgres => vec![
			(Feature::Json, v(9, 4, 0)),
			(Feature::JsonArrayOverlap, v(9, 4, 0)),
			(Feature::FullText, true),
			(Feature::Regex, true),
			(Feature::Arrays, true),
			(Feature::NullsOrdering, v(8, 3, 0)),
			(Feature::ExplainJson, v(9, 0, 0)),
			(Feature::Spatial, capability.has_extension("postgis")),
		],
		AdapterId::CockroachDb => vec![
			(Feature::Json, v(2, 0, 0)),
			(Feature::JsonArrayOverlap, v(2, 0, 0)),
			(Feature::FullText, v(23, 1, 0)),
			(Feature::Regex, true),
			(Feature::Arrays, true),
			(Feature::NullsOrdering, v(20, 1, 0)),
			(Feature::Spatial, v(20, 2, 0)),
		],
		AdapterId::MySql if mariadb => vec![
			(Feature::Json, v(10, 2, 7)),
			(Feature::JsonArrayOverlap, v(10, 9, 0)),
			(Feature::FullText, true),
			(Feature::Spatial, v(10, 2, 38)),
			(Feature::ExplainJson, v(10, 1, 0)),
		],
		AdapterId::MySql => vec![
			(Feature::Json, v(5, 7, 8)),
			(Feature::JsonArrayOverlap, v(8, 0, 17)),
			(Feature::FullText, true),
			(Feature::Regex, v(8, 0, 4)),
			(Feature::Spatial, v(5, 7, 6)),
			(Feature::ExplainJson, v(5, 6, 5)),
		],
		AdapterId::Sqlite => vec![
			(Feature::Json, v(3, 38, 0)),
			(Feature::NullsOrdering, v(3, 30, 0)),
		],
		AdapterId::MsSql => vec![
			// 13.x is SQL Server 2016
			(Feature::Json, v(13, 0, 0)),
			(Feature::Spatial, v(10, 0, 0)),
		],
		AdapterId::Search => vec![
			(Feature::Json, true),
			(Feature::JsonArrayOverlap, true),
			(Feature::FullText, true),
			(Feature::Regex, true),
			(Feature::Spatial, true),
			(Feature::Arrays, true),
			(Feature::NullsOrdering, true),
		],
	};
	candidates
		.into_iter()
		.filter(|(_, enabled)| *enabled)
		.map(|(feature, _)| feature)
		.collect()
}
