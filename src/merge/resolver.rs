//! Conflict resolution strategies

use super::{Conflict, ConflictType, MergeStrategy};
use crate::config::MergeConfig;
use crate::types::Item;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Source of disambiguating suffixes for renamed identifiers
pub trait SuffixSource {
    /// Next suffix; successive calls never repeat
    fn next_suffix(&mut self) -> String;
}

/// Millisecond UTC timestamps, bumped so each suffix is strictly larger
#[derive(Debug, Default)]
pub struct ClockSuffix {
    last: i64,
}

impl ClockSuffix {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SuffixSource for ClockSuffix {
    fn next_suffix(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last.saturating_add(1));
        self.last.to_string()
    }
}

/// Plain counter, for reproducible renames
#[derive(Debug, Default)]
pub struct SequentialSuffix {
    next: u64,
}

impl SequentialSuffix {
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl SuffixSource for SequentialSuffix {
    fn next_suffix(&mut self) -> String {
        let suffix = self.next.to_string();
        self.next += 1;
        suffix
    }
}

/// What happened to the incoming record of a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ResolutionAction {
    /// Incoming record kept as-is
    Kept,
    /// Incoming record dropped
    Skipped,
    /// Existing record removed in favour of the incoming one
    Replaced,
    /// Incoming record given a fresh identifier
    Renamed { new_id: String },
}

/// Output of resolving a set of conflicts
#[derive(Debug, Clone, Default)]
pub struct ResolvedIncoming {
    /// Incoming records to append, in caller order
    pub items: Vec<Item>,
    pub warnings: Vec<String>,
    /// Existing indices to remove before appending (ascending)
    pub replace_existing: Vec<usize>,
    /// One action per input conflict, in the same order
    pub actions: Vec<ResolutionAction>,
}

/// Applies a merge strategy to detected conflicts
///
/// Resolution is pure: inputs are only read, and every output is a new
/// collection. Conflicts whose indices fall outside the given
/// collections are left as [`ResolutionAction::Kept`].
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    duplicate_threshold: f32,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(&MergeConfig::default())
    }
}

impl ConflictResolver {
    /// Create a new resolver
    pub fn new(config: &MergeConfig) -> Self {
        Self {
            duplicate_threshold: config.duplicate_threshold,
        }
    }

    /// Resolve `conflicts` against `incoming` using `strategy`
    pub fn resolve(
        &self,
        conflicts: &[Conflict],
        existing: &[Item],
        incoming: &[Item],
        strategy: MergeStrategy,
        suffixes: &mut dyn SuffixSource,
    ) -> ResolvedIncoming {
        let resolved = match strategy {
            MergeStrategy::AppendAll => self.append_all(conflicts, incoming),
            MergeStrategy::SkipDuplicates => self.skip_duplicates(conflicts, existing, incoming),
            MergeStrategy::ReplaceDuplicates => {
                self.replace_duplicates(conflicts, existing, incoming)
            }
            MergeStrategy::RenameDuplicates => {
                self.rename_duplicates(conflicts, existing, incoming, suffixes)
            }
        };

        tracing::debug!(
            %strategy,
            conflicts = conflicts.len(),
            kept = resolved.items.len(),
            replaced = resolved.replace_existing.len(),
            "Resolved incoming items"
        );
        resolved
    }

    fn append_all(&self, conflicts: &[Conflict], incoming: &[Item]) -> ResolvedIncoming {
        let mut warnings = Vec::new();
        if !conflicts.is_empty() {
            warnings.push(format!(
                "Appending all {} incoming items despite {} conflict(s)",
                incoming.len(),
                conflicts.len()
            ));
        }
        ResolvedIncoming {
            items: incoming.to_vec(),
            warnings,
            replace_existing: Vec::new(),
            actions: vec![ResolutionAction::Kept; conflicts.len()],
        }
    }

    fn skip_duplicates(
        &self,
        conflicts: &[Conflict],
        existing: &[Item],
        incoming: &[Item],
    ) -> ResolvedIncoming {
        let mut dropped: BTreeSet<usize> = BTreeSet::new();
        let mut warnings = Vec::new();
        let mut actions = Vec::with_capacity(conflicts.len());

        for conflict in conflicts {
            if !in_bounds(conflict, existing, incoming)
                || !conflict.is_duplicate(self.duplicate_threshold)
            {
                actions.push(ResolutionAction::Kept);
                continue;
            }
            actions.push(ResolutionAction::Skipped);
            if dropped.insert(conflict.incoming_index) {
                warnings.push(format!(
                    "Skipping incoming item '{}': duplicates existing item '{}' ({:.0}% similar)",
                    incoming[conflict.incoming_index].resolved_id(conflict.incoming_index),
                    existing[conflict.existing_index].resolved_id(conflict.existing_index),
                    conflict.similarity * 100.0
                ));
            }
        }

        // A record named by any duplicate conflict is dropped, so every
        // conflict on that record reports the skip.
        for (conflict, action) in conflicts.iter().zip(actions.iter_mut()) {
            if dropped.contains(&conflict.incoming_index) {
                *action = ResolutionAction::Skipped;
            }
        }

        if !dropped.is_empty() {
            warnings.push(format!("Skipped {} duplicate item(s)", dropped.len()));
        }

        let items = incoming
            .iter()
            .enumerate()
            .filter(|(i, _)| !dropped.contains(i))
            .map(|(_, item)| item.clone())
            .collect();

        ResolvedIncoming {
            items,
            warnings,
            replace_existing: Vec::new(),
            actions,
        }
    }

    fn replace_duplicates(
        &self,
        conflicts: &[Conflict],
        existing: &[Item],
        incoming: &[Item],
    ) -> ResolvedIncoming {
        let mut replaced: BTreeSet<usize> = BTreeSet::new();
        let mut warnings = Vec::new();
        let mut actions = Vec::with_capacity(conflicts.len());

        for conflict in conflicts {
            if conflict.conflict_type != ConflictType::IdentityCollision
                || !in_bounds(conflict, existing, incoming)
            {
                actions.push(ResolutionAction::Kept);
                continue;
            }
            actions.push(ResolutionAction::Replaced);
            if replaced.insert(conflict.existing_index) {
                warnings.push(format!(
                    "Replacing existing item '{}' with the incoming version",
                    existing[conflict.existing_index].resolved_id(conflict.existing_index)
                ));
            }
        }

        ResolvedIncoming {
            items: incoming.to_vec(),
            warnings,
            replace_existing: replaced.into_iter().collect(),
            actions,
        }
    }

    fn rename_duplicates(
        &self,
        conflicts: &[Conflict],
        existing: &[Item],
        incoming: &[Item],
        suffixes: &mut dyn SuffixSource,
    ) -> ResolvedIncoming {
        let mut taken: HashSet<String> = existing
            .iter()
            .enumerate()
            .map(|(i, item)| item.resolved_id(i))
            .chain(incoming.iter().enumerate().map(|(i, item)| item.resolved_id(i)))
            .collect();

        let mut items = incoming.to_vec();
        let mut renamed: HashMap<usize, String> = HashMap::new();
        let mut warnings = Vec::new();
        let mut actions = Vec::with_capacity(conflicts.len());

        for conflict in conflicts {
            if conflict.conflict_type != ConflictType::IdentityCollision
                || !in_bounds(conflict, existing, incoming)
            {
                actions.push(ResolutionAction::Kept);
                continue;
            }

            let index = conflict.incoming_index;
            let new_id = match renamed.get(&index) {
                Some(id) => id.clone(),
                None => {
                    let original = incoming[index].resolved_id(index);
                    let new_id = unique_id(&original, &taken, suffixes);
                    taken.insert(new_id.clone());

                    let item = &mut items[index];
                    let title = item.title.clone().unwrap_or_else(|| original.clone());
                    item.title = Some(format!("{} (imported)", title));
                    item.id = Some(new_id.clone());

                    warnings.push(format!(
                        "Incoming item '{}' will be renamed to avoid an ID collision",
                        original
                    ));
                    renamed.insert(index, new_id.clone());
                    new_id
                }
            };
            actions.push(ResolutionAction::Renamed { new_id });
        }

        ResolvedIncoming {
            items,
            warnings,
            replace_existing: Vec::new(),
            actions,
        }
    }
}

fn in_bounds(conflict: &Conflict, existing: &[Item], incoming: &[Item]) -> bool {
    conflict.existing_index < existing.len() && conflict.incoming_index < incoming.len()
}

fn unique_id(original: &str, taken: &HashSet<String>, suffixes: &mut dyn SuffixSource) -> String {
    loop {
        let candidate = format!("{}_{}", original, suffixes.next_suffix());
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}
