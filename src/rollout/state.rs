// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Zero-sized types keep the phases in order at compile time.

/// Initial state: plan accepted, nothing checked yet.
/// Available actions: `guard()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Guarded: pre-flight checks passed, fleet untouched.
/// Available actions: `drain()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Guarded;

/// Drained: every pending component runs zero replicas.
/// Available actions: `replace()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Drained;

/// Replaced: pending components reinstalled at their new versions.
/// Available actions: `cleanup()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Replaced;

/// Completed: obsolete objects removed.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;
