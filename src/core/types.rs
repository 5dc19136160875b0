/*!
 * Core Types
 * Common types used across the crate
 */

use std::collections::BTreeMap;

/// Raw process identifier as the OS reports it
pub type RawPid = i32;

/// Environment handed to a child: variable name to value
///
/// Keys are unique by construction; iteration order is stable so the
/// marshaled `envp` is reproducible.
pub type EnvMap = BTreeMap<String, String>;
