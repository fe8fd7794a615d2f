//! File operations for saving and loading projects.
//!
//! Dialog-driven operations run on a tokio task and report back through the
//! channel in [`FileState`](super::state::FileState), which is drained once
//! per frame so the UI never blocks on a dialog.

use super::state::{
    FileOperationResult, InteractionState, PendingLoadOperation, PendingSaveOperation,
    PlanboardApp,
};
use crate::constants::PROJECT_EXTENSION;
use crate::project::Project;
use eframe::egui;
use std::path::PathBuf;

impl PlanboardApp {
    /// Processes completed file operations and starts newly requested ones.
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.file.file_operation_receiver.try_recv() {
            match result {
                FileOperationResult::SaveCompleted(path) => {
                    log::info!("saved project to {}", path.display());
                    self.project.filepath = Some(path.clone());
                    self.project.modified = false;
                    self.file.status = Some(format!("Saved {}", path.display()));
                    self.remember_recent(path);
                }
                FileOperationResult::LoadCompleted(path, content) => {
                    match Project::from_json(&content, self.project.config) {
                        Ok(project) => {
                            log::info!("loaded project from {}", path.display());
                            self.replace_project(project, Some(path.clone()));
                            self.file.status = Some(format!("Opened {}", path.display()));
                            self.remember_recent(path);
                        }
                        Err(err) => {
                            log::warn!("rejected project file {}: {err}", path.display());
                            self.file.status = Some(format!("Could not open file: {err}"));
                        }
                    }
                }
                FileOperationResult::OperationFailed(error) => {
                    log::error!("file operation failed: {error}");
                    self.file.status = Some(error);
                }
            }
        }

        if let Some(save_op) = self.file.pending_save_operation.take() {
            let json = match self.project.to_json() {
                Ok(json) => json,
                Err(err) => {
                    log::error!("failed to serialize project: {err}");
                    self.file.status = Some(format!("Could not save: {err}"));
                    return;
                }
            };
            let ctx = ctx.clone();
            let sender = self.file.file_operation_sender.clone();
            let target = match save_op {
                PendingSaveOperation::Save => self.project.filepath.clone(),
                PendingSaveOperation::SaveAs => None,
            };

            tokio::spawn(async move {
                let path = match target {
                    Some(path) => Some(path),
                    None => rfd::AsyncFileDialog::new()
                        .add_filter("Planboard project", &[PROJECT_EXTENSION])
                        .set_file_name(format!("untitled.{PROJECT_EXTENSION}"))
                        .save_file()
                        .await
                        .map(|handle| handle.path().to_path_buf()),
                };
                if let Some(path) = path {
                    let result = match std::fs::write(&path, json) {
                        Ok(()) => FileOperationResult::SaveCompleted(path),
                        Err(e) => FileOperationResult::OperationFailed(format!(
                            "Failed to save {}: {e}",
                            path.display()
                        )),
                    };
                    let _ = sender.send(result);
                }
                ctx.request_repaint();
            });
        }

        if let Some(PendingLoadOperation::Load) = self.file.pending_load_operation.take() {
            let ctx = ctx.clone();
            let sender = self.file.file_operation_sender.clone();

            tokio::spawn(async move {
                if let Some(handle) = rfd::AsyncFileDialog::new()
                    .add_filter("Planboard project", &[PROJECT_EXTENSION])
                    .pick_file()
                    .await
                {
                    let path = handle.path().to_path_buf();
                    let result = match std::fs::read_to_string(&path) {
                        Ok(json) => FileOperationResult::LoadCompleted(path, json),
                        Err(e) => FileOperationResult::OperationFailed(format!(
                            "Failed to read {}: {e}",
                            path.display()
                        )),
                    };
                    let _ = sender.send(result);
                }
                ctx.request_repaint();
            });
        }
    }

    /// Opens a file dialog to save the project under a new name.
    pub fn save_as_project(&mut self) {
        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
    }

    /// Saves to the current file, or asks for one if the project was never saved.
    pub fn save_project(&mut self) {
        if self.project.filepath.is_some() {
            self.file.pending_save_operation = Some(PendingSaveOperation::Save);
        } else {
            self.save_as_project();
        }
    }

    /// Opens a file dialog to load a project.
    pub fn load_project(&mut self) {
        self.file.pending_load_operation = Some(PendingLoadOperation::Load);
    }

    /// Opens an entry of the recent files list directly, without a dialog.
    pub fn open_recent(&mut self, index: usize) {
        let Some(path) = self.recent_files.get(index).cloned() else {
            return;
        };
        match Project::load_from(&path, self.project.config) {
            Ok(project) => {
                self.replace_project(project, Some(path.clone()));
                self.file.status = Some(format!("Opened {}", path.display()));
                self.remember_recent(path);
            }
            Err(err) => {
                self.file.status = Some(format!("Could not open {}: {err}", path.display()));
                self.recent_files.remove(index);
            }
        }
    }

    /// Starts a fresh, empty project.
    pub fn new_project(&mut self) {
        let config = self.project.config;
        self.replace_project(Project::new(config), None);
        self.file.status = None;
    }

    fn replace_project(&mut self, project: Project, path: Option<PathBuf>) {
        self.project = project;
        self.project.filepath = path;
        self.project.modified = false;
        self.interaction = InteractionState::default();
        self.context_menu.show = false;
        self.watch_selection();
    }
}
