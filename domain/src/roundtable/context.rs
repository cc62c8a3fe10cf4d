//! Caller-supplied context handed to every agent and the moderator

use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form key/value context (e.g. audience, goal, constraints)
pub type Context = BTreeMap<String, Value>;
