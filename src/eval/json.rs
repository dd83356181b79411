//! JSON flag evaluator with lock-free reads.

use super::{Evaluator, Reason, Resolution};
use crate::error::{Error, ResolveError, Result};
use crate::sources::FlagPayload;
use arc_swap::ArcSwap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether a flag may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagState {
    /// The flag resolves normally.
    #[default]
    Enabled,
    /// The flag is defined but must not be served.
    Disabled,
}

/// A single flag definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Serving state; defaults to enabled.
    #[serde(default)]
    pub state: FlagState,
    /// Named values the flag can take.
    pub variants: BTreeMap<String, Value>,
    /// Variant served when no targeting applies.
    pub default_variant: String,
}

/// The parsed flag document, swapped in as one unit.
#[derive(Debug, Default, Deserialize)]
struct FlagSet {
    flags: BTreeMap<String, Flag>,
}

impl FlagSet {
    fn parse(payload: &FlagPayload) -> Result<Self> {
        if payload.is_empty() {
            return Err(Error::Parse("empty payload".to_string()));
        }

        let set: FlagSet =
            serde_json::from_slice(payload.as_bytes()).map_err(|e| Error::Parse(e.to_string()))?;

        for (key, flag) in &set.flags {
            if !flag.variants.contains_key(&flag.default_variant) {
                return Err(Error::Parse(format!(
                    "flag '{}' has default variant '{}' which is not among its variants",
                    key, flag.default_variant
                )));
            }
        }

        Ok(set)
    }

    fn resolve(&self, flag_key: &str) -> std::result::Result<Resolution, ResolveError> {
        let flag = self
            .flags
            .get(flag_key)
            .ok_or_else(|| ResolveError::FlagNotFound(flag_key.to_string()))?;

        if flag.state == FlagState::Disabled {
            return Err(ResolveError::FlagDisabled(flag_key.to_string()));
        }

        let value = flag
            .variants
            .get(&flag.default_variant)
            .cloned()
            .ok_or_else(|| ResolveError::FlagNotFound(flag_key.to_string()))?;

        Ok(Resolution {
            value,
            variant: flag.default_variant.clone(),
            reason: Reason::Static,
        })
    }
}

/// Evaluator for JSON flag documents.
///
/// The live flag set sits behind an `ArcSwap`: queries load the current set
/// without locking and a reload replaces it atomically, so a query never sees
/// flags from two different documents.
///
/// Expected document shape:
///
/// ```json
/// {
///   "flags": {
///     "new-checkout": {
///       "state": "ENABLED",
///       "variants": { "on": true, "off": false },
///       "defaultVariant": "on"
///     }
///   }
/// }
/// ```
///
/// # Examples
///
/// ```rust
/// use flagsync::eval::{Evaluator, JsonEvaluator};
/// use flagsync::sources::FlagPayload;
///
/// let evaluator = JsonEvaluator::new();
/// evaluator
///     .load(&FlagPayload::from(
///         r#"{"flags":{"beta":{"variants":{"on":true,"off":false},"defaultVariant":"on"}}}"#,
///     ))
///     .unwrap();
/// assert_eq!(evaluator.resolve_boolean("beta"), Ok(true));
/// ```
pub struct JsonEvaluator {
    current: ArcSwap<FlagSet>,
}

impl JsonEvaluator {
    /// Create an evaluator with no flags loaded.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(FlagSet::default()),
        }
    }
}

impl Default for JsonEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for JsonEvaluator {
    fn load(&self, payload: &FlagPayload) -> Result<()> {
        let set = FlagSet::parse(payload)?;
        self.current.store(Arc::new(set));
        Ok(())
    }

    fn resolve(&self, flag_key: &str) -> std::result::Result<Resolution, ResolveError> {
        self.current.load().resolve(flag_key)
    }

    fn resolve_all(&self) -> Vec<(String, Resolution)> {
        let snapshot = self.current.load_full();
        snapshot
            .flags
            .keys()
            .filter_map(|key| snapshot.resolve(key).ok().map(|r| (key.clone(), r)))
            .collect()
    }

    fn flag_count(&self) -> usize {
        self.current.load().flags.len()
    }
}
