//! File edit transactions with single-level rollback.
//!
//! Every applied `whole_write`, `edit` or `rollback` records a
//! [`VersionEntry`] holding the content the file had before. Rollback
//! restores that content (or deletes the file when the transaction created
//! it). Only one level of undo is kept: rolling back a rollback is refused.
//!
//! History persists to `.kodu/versions.json`.

use super::engine::{PatchFailure, apply_blocks};
use super::parser::parse_diff_blocks;
use crate::config::DiffSettings;
use crate::context::WorkspaceContext;
use crate::error::{KoduError, Result};
use crate::events::{self, Event, EventAction};
use crate::fs::{atomic_write_file, remove_file_if_exists};
use crate::git::{CommitInfo, VersionControl};
use crate::tools::FileEditAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Kind of change a version entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    WholeWrite,
    Edit,
    Rollback,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::WholeWrite => "whole_write",
            EditMode::Edit => "edit",
            EditMode::Rollback => "rollback",
        }
    }
}

/// One applied transaction on a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// 1-based, increasing per path.
    pub version: u32,
    pub ts: DateTime<Utc>,
    pub mode: EditMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Whether the transaction created the file.
    #[serde(default)]
    pub created: bool,
    /// Content before the transaction. Only the newest entry of a path keeps
    /// it; older pre-images are dropped when a newer entry is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// Version entries keyed by workspace-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionHistory {
    files: BTreeMap<String, Vec<VersionEntry>>,
}

impl VersionHistory {
    /// Load history from `path`. A missing file yields an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(KoduError::UserError(format!(
                    "failed to read version history '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            KoduError::UserError(format!(
                "malformed version history '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            KoduError::UserError(format!("failed to serialize version history: {}", e))
        })?;
        atomic_write_file(path, &json)
    }

    pub fn entries(&self, path: &str) -> &[VersionEntry] {
        self.files.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn last(&self, path: &str) -> Option<&VersionEntry> {
        self.entries(path).last()
    }

    fn next_version(&self, path: &str) -> u32 {
        self.last(path).map_or(1, |e| e.version + 1)
    }

    fn push(&mut self, path: &str, entry: VersionEntry) {
        let entries = self.files.entry(path.to_string()).or_default();
        for older in entries.iter_mut() {
            older.previous = None;
        }
        entries.push(entry);
    }
}

/// What an applied transaction did.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub path: String,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<VersionEntry>,
}

impl EditReport {
    /// Text returned to the model as the tool response.
    pub fn response_text(&self) -> String {
        let mut out = self.summary.clone();
        for entry in &self.versions {
            out.push_str(&format!(
                "\n- v{} {} {}: {}",
                entry.version,
                entry.ts.to_rfc3339(),
                entry.mode.as_str(),
                entry.commit_message.as_deref().unwrap_or("-")
            ));
        }
        if let Some(commit) = &self.commit {
            out.push('\n');
            out.push_str(&commit.to_xml());
        }
        out
    }
}

/// Outcome of [`FileEditor::apply`].
#[derive(Debug, Clone)]
pub enum EditOutcome {
    Applied(EditReport),
    /// The diff did not match; the file was not changed.
    Mismatch(PatchFailure),
}

/// The only writer of workspace files.
///
/// Content is read from disk at the start of every transaction, never from
/// a cache.
pub struct FileEditor {
    ctx: WorkspaceContext,
    settings: DiffSettings,
    history: VersionHistory,
    vcs: Option<Box<dyn VersionControl>>,
    push: bool,
}

impl FileEditor {
    /// Open an editor on a workspace, loading its version history.
    pub fn open(ctx: WorkspaceContext, settings: DiffSettings) -> Result<Self> {
        let history = VersionHistory::load(&ctx.versions_path())?;
        Ok(Self {
            ctx,
            settings,
            history,
            vcs: None,
            push: false,
        })
    }

    /// Commit each applied transaction through `vcs`, optionally pushing.
    pub fn with_vcs(mut self, vcs: Box<dyn VersionControl>, push: bool) -> Self {
        self.vcs = Some(vcs);
        self.push = push;
        self
    }

    pub fn workspace(&self) -> &WorkspaceContext {
        &self.ctx
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    /// Current content of a workspace file, `None` when it does not exist.
    pub fn read(&self, path: &str) -> Result<Option<String>> {
        let full = self.ctx.resolve_path(path)?;
        match fs::read_to_string(&full) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KoduError::UserError(format!(
                "failed to read '{}': {}",
                full.display(),
                e
            ))),
        }
    }

    /// Run one `file_editor` transaction.
    pub fn apply(&mut self, path: &str, action: &FileEditAction) -> Result<EditOutcome> {
        let full = self.ctx.resolve_path(path)?;
        let rel = self.ctx.relative_display(&full);

        match action {
            FileEditAction::WholeWrite {
                content,
                commit_message,
            } => self
                .whole_write(&rel, content, commit_message)
                .map(EditOutcome::Applied),
            FileEditAction::Edit {
                diff,
                commit_message,
            } => self.edit(&rel, diff, commit_message),
            FileEditAction::Rollback => self.rollback(&rel).map(EditOutcome::Applied),
            FileEditAction::ListVersions => Ok(EditOutcome::Applied(self.list_versions(&rel))),
        }
    }

    fn whole_write(&mut self, rel: &str, content: &str, message: &str) -> Result<EditReport> {
        let previous = self.read(rel)?;
        atomic_write_file(self.ctx.root.join(rel), content)?;

        let created = previous.is_none();
        let report = self.commit_transaction(rel, EditMode::WholeWrite, Some(message), previous)?;
        events::record(
            Some(&self.ctx),
            Event::new(EventAction::PatchApplied)
                .with_tool("file_editor")
                .with_path(rel)
                .with_details(json!({
                    "mode": "whole_write",
                    "created": created,
                    "version": report.version,
                })),
        );

        Ok(EditReport {
            summary: format!(
                "{} '{}' ({} lines).",
                if created { "Created" } else { "Wrote" },
                rel,
                content.lines().count()
            ),
            ..report
        })
    }

    fn edit(&mut self, rel: &str, diff: &str, message: &str) -> Result<EditOutcome> {
        let blocks = parse_diff_blocks(diff, self.settings.max_blocks)?;
        let current = self.read(rel)?.ok_or_else(|| {
            KoduError::UserError(format!(
                "cannot edit '{}': the file does not exist (use whole_write to create it)",
                rel
            ))
        })?;

        let patched = match apply_blocks(&current, &blocks, &self.settings) {
            Ok(patched) => patched,
            Err(failure) => {
                events::record(
                    Some(&self.ctx),
                    Event::new(EventAction::PatchFailed)
                        .with_tool("file_editor")
                        .with_path(rel)
                        .with_details(json!({
                            "block": failure.block,
                            "total": failure.total,
                            "reason": failure.reason,
                        })),
                );
                return Ok(EditOutcome::Mismatch(failure));
            }
        };

        atomic_write_file(self.ctx.root.join(rel), &patched.content)?;
        let report = self.commit_transaction(rel, EditMode::Edit, Some(message), Some(current))?;
        events::record(
            Some(&self.ctx),
            Event::new(EventAction::PatchApplied)
                .with_tool("file_editor")
                .with_path(rel)
                .with_details(json!({
                    "mode": "edit",
                    "blocks": blocks.len(),
                    "lines": patched.lines,
                    "version": report.version,
                })),
        );

        Ok(EditOutcome::Applied(EditReport {
            summary: format!(
                "Applied {} block(s) to '{}'. Read the file again before editing it further.",
                blocks.len(),
                rel
            ),
            ..report
        }))
    }

    fn rollback(&mut self, rel: &str) -> Result<EditReport> {
        let last = self.history.last(rel).cloned().ok_or_else(|| {
            KoduError::UserError(format!("no recorded changes for '{}' to roll back", rel))
        })?;
        if last.mode == EditMode::Rollback {
            return Err(KoduError::UserError(format!(
                "the last change to '{}' is already a rollback; only one level of undo is kept",
                rel
            )));
        }

        let before = self.read(rel)?;
        let target = self.ctx.root.join(rel);
        match (&last.previous, last.created) {
            (_, true) => remove_file_if_exists(&target)?,
            (Some(content), false) => atomic_write_file(&target, content)?,
            (None, false) => {
                return Err(KoduError::UserError(format!(
                    "the content of '{}' before v{} is no longer recorded",
                    rel, last.version
                )));
            }
        }

        let message = format!("revert: {}", rel);
        let report = self.commit_transaction(rel, EditMode::Rollback, Some(&message), before)?;
        events::record(
            Some(&self.ctx),
            Event::new(EventAction::FileRollback)
                .with_tool("file_editor")
                .with_path(rel)
                .with_details(json!({
                    "restored_version": last.version,
                    "deleted": last.created,
                })),
        );

        let summary = if last.created {
            format!("Rolled back '{}': v{} created it, so it was removed.", rel, last.version)
        } else {
            format!("Rolled back '{}' to its content before v{}.", rel, last.version)
        };
        Ok(EditReport { summary, ..report })
    }

    fn list_versions(&self, rel: &str) -> EditReport {
        let versions = self.history.entries(rel).to_vec();
        let summary = if versions.is_empty() {
            format!("No recorded versions for '{}'.", rel)
        } else {
            format!("{} recorded version(s) for '{}':", versions.len(), rel)
        };
        EditReport {
            path: rel.to_string(),
            mode: "list_versions",
            version: None,
            summary,
            commit: None,
            versions,
        }
    }

    /// Commit through the version-control collaborator, record the entry and
    /// persist the history.
    fn commit_transaction(
        &mut self,
        rel: &str,
        mode: EditMode,
        message: Option<&str>,
        previous: Option<String>,
    ) -> Result<EditReport> {
        let commit = match (&self.vcs, message) {
            (Some(vcs), Some(message)) => match vcs.commit(message, Path::new(rel)) {
                Ok(info) => {
                    if self.push
                        && let Err(e) = vcs.push()
                    {
                        eprintln!("Warning: failed to push commit for '{}': {}", rel, e);
                    }
                    Some(info)
                }
                Err(e) => {
                    eprintln!("Warning: failed to commit '{}': {}", rel, e);
                    None
                }
            },
            _ => None,
        };

        let version = self.history.next_version(rel);
        let created = mode != EditMode::Rollback && previous.is_none();
        self.history.push(
            rel,
            VersionEntry {
                version,
                ts: Utc::now(),
                mode,
                commit_message: message.map(str::to_string),
                commit_hash: commit.as_ref().map(|c| c.commit_hash.clone()),
                branch: commit.as_ref().map(|c| c.branch.clone()),
                created,
                previous,
            },
        );
        self.history.save(&self.ctx.versions_path())?;

        Ok(EditReport {
            path: rel.to_string(),
            mode: mode.as_str(),
            version: Some(version),
            summary: String::new(),
            commit,
            versions: Vec::new(),
        })
    }
}
