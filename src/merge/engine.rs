//! Preview and execution of merges

use super::{
    auto_renumber, is_trivially_sequential, ClockSuffix, Conflict, ConflictDetector,
    ConflictResolver, ConflictType, MergeStrategy, ResolutionAction, ResolvedIncoming, Severity,
    SuffixSource,
};
use crate::config::MergeConfig;
use crate::error::{MergeError, Result, Side};
use crate::types::Item;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Conflict counts by type and severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub total: usize,
    pub by_type: BTreeMap<ConflictType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl ConflictSummary {
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        let mut summary = Self {
            total: conflicts.len(),
            ..Default::default()
        };
        for conflict in conflicts {
            *summary.by_type.entry(conflict.conflict_type).or_insert(0) += 1;
            *summary.by_severity.entry(conflict.severity).or_insert(0) += 1;
        }
        summary
    }

    /// Most severe conflict level, if any conflicts exist
    pub fn highest_severity(&self) -> Option<Severity> {
        self.by_severity.keys().next_back().copied()
    }
}

/// Prospective outcome of a merge; nothing is changed by computing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePreview {
    pub existing_count: usize,
    pub incoming_count: usize,
    /// Size of the collection `execute` would produce
    pub final_count: usize,
    pub conflicts: Vec<Conflict>,
    pub summary: ConflictSummary,
    pub warnings: Vec<String>,
    pub strategy: MergeStrategy,
    /// Existing indices that would be overwritten (replace_duplicates)
    #[serde(default)]
    pub replaced_existing: Vec<usize>,
    /// Incoming records that would be dropped (skip_duplicates)
    #[serde(default)]
    pub duplicates_skipped: usize,
    /// Digest of the inputs this preview was computed from
    pub fingerprint: String,
}

impl MergePreview {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// A conflict paired with the action taken for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConflict {
    pub conflict: Conflict,
    pub action: ResolutionAction,
}

/// Outcome of an executed merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    /// Merged collection; on failure, an unchanged copy of the existing one
    pub merged: Vec<Item>,
    pub resolved_conflicts: Vec<ResolvedConflict>,
    pub error_message: Option<String>,
    /// Identifier the caller should attach to its pre-merge snapshot
    pub rollback_ref: Option<String>,
    pub strategy: MergeStrategy,
}

impl MergeResult {
    fn failed(existing: &[Item], strategy: MergeStrategy, error: &MergeError) -> Self {
        Self {
            success: false,
            merged: existing.to_vec(),
            resolved_conflicts: Vec::new(),
            error_message: Some(error.to_string()),
            rollback_ref: None,
            strategy,
        }
    }

    /// User-facing one-line outcome
    pub fn outcome_message(&self) -> String {
        if !self.success {
            let reason = self.error_message.as_deref().unwrap_or("unknown error");
            return format!("merge failed: {}, nothing changed", reason);
        }
        match self.resolved_conflicts.len() {
            0 => "no conflicts, ready".to_string(),
            n => format!("{} conflicts resolved, ready", n),
        }
    }
}

/// Orchestrates detection and resolution into preview and execute
///
/// Holds configuration only; every call works on borrowed inputs and
/// returns fresh values. Callers serialize merges against the same
/// existing collection.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    detector: ConflictDetector,
    resolver: ConflictResolver,
}

impl MergeEngine {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            resolver: ConflictResolver::new(&config),
            detector: ConflictDetector::new(config),
        }
    }

    pub fn config(&self) -> &MergeConfig {
        self.detector.config()
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Detect and resolve without changing anything
    pub fn preview(
        &self,
        existing: &[Item],
        incoming: &[Item],
        strategy: MergeStrategy,
    ) -> MergePreview {
        let conflicts = self.detector.detect(existing, incoming);
        let resolved = self.resolver.resolve(
            &conflicts,
            existing,
            incoming,
            strategy,
            &mut ClockSuffix::new(),
        );

        let final_count = existing.len() - resolved.replace_existing.len() + resolved.items.len();
        let preview = MergePreview {
            existing_count: existing.len(),
            incoming_count: incoming.len(),
            final_count,
            summary: ConflictSummary::from_conflicts(&conflicts),
            conflicts,
            warnings: resolved.warnings,
            strategy,
            replaced_existing: resolved.replace_existing,
            duplicates_skipped: incoming.len() - resolved.items.len(),
            fingerprint: fingerprint(existing, incoming),
        };

        tracing::info!(
            %strategy,
            existing = preview.existing_count,
            incoming = preview.incoming_count,
            final_count = preview.final_count,
            conflicts = preview.summary.total,
            "Merge preview computed"
        );
        preview
    }

    /// Apply a merge, re-deriving the preview unless one is supplied.
    ///
    /// All-or-nothing: on failure the result carries the existing
    /// collection unchanged.
    pub fn execute(
        &self,
        existing: &[Item],
        incoming: &[Item],
        strategy: MergeStrategy,
        preview: Option<&MergePreview>,
    ) -> MergeResult {
        self.execute_with(existing, incoming, strategy, preview, &mut ClockSuffix::new())
    }

    /// [`execute`](Self::execute) with the strategy given by name
    pub fn execute_named(
        &self,
        existing: &[Item],
        incoming: &[Item],
        strategy: &str,
        preview: Option<&MergePreview>,
    ) -> MergeResult {
        match strategy.parse::<MergeStrategy>() {
            Ok(strategy) => self.execute(existing, incoming, strategy, preview),
            Err(e) => {
                tracing::warn!(strategy, "Merge rejected: {}", e);
                MergeResult::failed(existing, MergeStrategy::default(), &e)
            }
        }
    }

    /// [`execute`](Self::execute) with an explicit rename suffix source
    pub fn execute_with(
        &self,
        existing: &[Item],
        incoming: &[Item],
        strategy: MergeStrategy,
        preview: Option<&MergePreview>,
        suffixes: &mut dyn SuffixSource,
    ) -> MergeResult {
        match self.try_execute(existing, incoming, strategy, preview, suffixes) {
            Ok((merged, resolved_conflicts)) => {
                let rollback_ref = uuid::Uuid::new_v4().to_string();
                tracing::info!(
                    %strategy,
                    final_count = merged.len(),
                    resolved = resolved_conflicts.len(),
                    rollback_ref = %rollback_ref,
                    "Merge executed"
                );
                MergeResult {
                    success: true,
                    merged,
                    resolved_conflicts,
                    error_message: None,
                    rollback_ref: Some(rollback_ref),
                    strategy,
                }
            }
            Err(e) => {
                tracing::warn!(%strategy, code = e.code(), "Merge failed: {}", e);
                MergeResult::failed(existing, strategy, &e)
            }
        }
    }

    fn try_execute(
        &self,
        existing: &[Item],
        incoming: &[Item],
        strategy: MergeStrategy,
        preview: Option<&MergePreview>,
        suffixes: &mut dyn SuffixSource,
    ) -> Result<(Vec<Item>, Vec<ResolvedConflict>)> {
        let detected;
        let conflicts = match preview {
            Some(preview) => {
                validate_preview(preview, existing, incoming, strategy)?;
                &preview.conflicts
            }
            None => {
                detected = self.detector.detect(existing, incoming);
                &detected
            }
        };

        let ResolvedIncoming {
            items,
            replace_existing,
            actions,
            ..
        } = self
            .resolver
            .resolve(conflicts, existing, incoming, strategy, suffixes);

        let removed: BTreeSet<usize> = replace_existing.into_iter().collect();
        let mut merged = Vec::with_capacity(existing.len() - removed.len() + items.len());
        merged.extend(
            existing
                .iter()
                .enumerate()
                .filter(|(i, _)| !removed.contains(i))
                .map(|(_, item)| item.clone()),
        );
        merged.extend(items);

        let resolved_conflicts = conflicts
            .iter()
            .cloned()
            .zip(actions)
            .map(|(conflict, action)| ResolvedConflict { conflict, action })
            .collect();

        Ok((merged, resolved_conflicts))
    }

    /// Renumber `incoming` after the existing ids when its ids are just
    /// 0..N-1, so positional ids never surface as user-facing collisions.
    ///
    /// Returns the items to merge and whether renumbering happened.
    pub fn prepare_incoming(&self, existing: &[Item], incoming: &[Item]) -> (Vec<Item>, bool) {
        if is_trivially_sequential(incoming) {
            tracing::debug!(incoming = incoming.len(), "Renumbering sequential incoming ids");
            (auto_renumber(existing, incoming), true)
        } else {
            (incoming.to_vec(), false)
        }
    }
}

fn validate_preview(
    preview: &MergePreview,
    existing: &[Item],
    incoming: &[Item],
    strategy: MergeStrategy,
) -> Result<()> {
    if preview.strategy != strategy {
        return Err(MergeError::StalePreview(format!(
            "preview was computed for {}, not {}",
            preview.strategy, strategy
        )));
    }
    if preview.existing_count != existing.len() || preview.incoming_count != incoming.len() {
        return Err(MergeError::StalePreview(format!(
            "preview covers {} existing and {} incoming items, got {} and {}",
            preview.existing_count,
            preview.incoming_count,
            existing.len(),
            incoming.len()
        )));
    }
    for conflict in &preview.conflicts {
        if conflict.existing_index >= existing.len() {
            return Err(MergeError::IndexOutOfRange {
                side: Side::Existing,
                index: conflict.existing_index,
                len: existing.len(),
            });
        }
        if conflict.incoming_index >= incoming.len() {
            return Err(MergeError::IndexOutOfRange {
                side: Side::Incoming,
                index: conflict.incoming_index,
                len: incoming.len(),
            });
        }
    }
    if preview.fingerprint != fingerprint(existing, incoming) {
        return Err(MergeError::StalePreview(
            "collections changed since the preview was computed".to_string(),
        ));
    }
    Ok(())
}

/// Digest of both collections
fn fingerprint(existing: &[Item], incoming: &[Item]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(existing).expect("items serialize to JSON"));
    hasher.update([0u8]);
    hasher.update(serde_json::to_vec(incoming).expect("items serialize to JSON"));
    hex::encode(hasher.finalize())[..16].to_string()
}
