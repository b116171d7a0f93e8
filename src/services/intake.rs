use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::IntakeConfig;
use crate::error::{IntakeError, RejectReason, Rejection};
use crate::models::{FileHandle, Notice, StagedId, StagingSnapshot};
use crate::services::admission;
use crate::services::dropzone::{DropZone, DropZoneView};
use crate::services::notifier::{Notifier, TracingNotifier};
use crate::services::preview::{DataUriPreview, PreviewGenerator, spawn_preview};
use crate::services::progress::{ProgressSettings, ProgressTimer};
use crate::services::staging::{PreviewUpdate, ProgressUpdate, StagingList};

/// Receives the raw files admitted by one `submit`
pub type FilesAddedCallback = Arc<dyn Fn(&[Arc<FileHandle>]) + Send + Sync>;

/// What one `submit` did
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmitReport {
    pub admitted: Vec<StagedId>,
    pub rejections: Vec<Rejection>,
}

impl SubmitReport {
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty() && self.rejections.is_empty()
    }

    pub fn batch_rejected(&self) -> bool {
        self.rejections
            .iter()
            .any(|r| r.reason == RejectReason::TooManyFiles)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Direct,
    Drop,
    Picker,
}

enum Command {
    Submit {
        files: Vec<Arc<FileHandle>>,
        origin: Origin,
        reply: oneshot::Sender<SubmitReport>,
    },
    Remove {
        id: StagedId,
        reply: oneshot::Sender<Result<(), IntakeError>>,
    },
    DragEnter,
    DragLeave,
    SetDisabled(bool),
    View {
        reply: oneshot::Sender<DropZoneView>,
    },
    Shutdown,
}

/// Messages from the background producers, keyed by id
enum Event {
    PreviewReady { id: StagedId, preview: String },
    Progress { id: StagedId, progress: u8 },
}

/// Builds and starts an intake controller
pub struct IntakeBuilder {
    config: IntakeConfig,
    on_files_added: Option<FilesAddedCallback>,
    notifier: Arc<dyn Notifier>,
    preview: Option<Arc<dyn PreviewGenerator>>,
    disabled: bool,
}

impl IntakeBuilder {
    pub fn new(config: IntakeConfig) -> Self {
        Self {
            config,
            on_files_added: None,
            notifier: Arc::new(TracingNotifier),
            preview: None,
            disabled: false,
        }
    }

    pub fn on_files_added<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[Arc<FileHandle>]) + Send + Sync + 'static,
    {
        self.on_files_added = Some(Arc::new(callback));
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn preview_generator(mut self, generator: Arc<dyn PreviewGenerator>) -> Self {
        self.preview = Some(generator);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Validates the config and spawns the controller on the current tokio runtime.
    pub fn spawn(self) -> Result<IntakeHandle, IntakeError> {
        self.config.ensure_valid()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(StagingSnapshot::default());

        let rng = match self.config.progress_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let preview = self.preview.unwrap_or_else(|| {
            Arc::new(DataUriPreview::new(self.config.preview_max_dimension))
        });

        tracing::info!(
            "Intake ready: max {} files, {} bytes each, accept {:?}",
            self.config.max_files,
            self.config.max_file_size,
            self.config.accept
        );

        let controller = IntakeController {
            staging: StagingList::new(self.config.max_files),
            progress: ProgressSettings::from_config(&self.config),
            config: self.config,
            dropzone: DropZone::new(self.disabled),
            timers: HashMap::new(),
            on_files_added: self.on_files_added,
            notifier: self.notifier,
            preview,
            rng,
            events_tx,
            snapshots: snapshots_tx,
        };
        tokio::spawn(controller.run(commands_rx, events_rx));

        Ok(IntakeHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        })
    }
}

/// Owns the staging list. All mutations happen on its task, one at a time.
struct IntakeController {
    config: IntakeConfig,
    staging: StagingList,
    dropzone: DropZone,
    progress: ProgressSettings,
    timers: HashMap<StagedId, ProgressTimer>,
    on_files_added: Option<FilesAddedCallback>,
    notifier: Arc<dyn Notifier>,
    preview: Arc<dyn PreviewGenerator>,
    rng: StdRng,
    events_tx: mpsc::UnboundedSender<Event>,
    snapshots: watch::Sender<StagingSnapshot>,
}

impl IntakeController {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        for (_, timer) in self.timers.drain() {
            timer.cancel();
        }
        tracing::info!("Intake controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit {
                files,
                origin,
                reply,
            } => {
                let report = self.submit(files, origin);
                let _ = reply.send(report);
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(id));
            }
            Command::DragEnter => {
                self.dropzone.drag_enter();
            }
            Command::DragLeave => {
                self.dropzone.drag_leave();
            }
            Command::SetDisabled(disabled) => self.dropzone.set_disabled(disabled),
            Command::View { reply } => {
                let view = self.dropzone.view(&self.snapshots.borrow(), &self.config);
                let _ = reply.send(view);
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::PreviewReady { id, preview } => match self.staging.set_preview(id, preview) {
                PreviewUpdate::Applied => self.publish(),
                PreviewUpdate::AlreadySet => {
                    tracing::debug!("Preview for {} already set, dropping", id)
                }
                PreviewUpdate::Missing => {
                    tracing::debug!("Preview for removed file {} discarded", id)
                }
            },
            Event::Progress { id, progress } => match self.staging.advance_progress(id, progress) {
                ProgressUpdate::Advanced {
                    progress,
                    completed,
                } => {
                    tracing::debug!("Progress {} -> {}%", id, progress);
                    self.publish();
                    if completed {
                        self.timers.remove(&id);
                        if let Some(entry) = self.staging.get(id) {
                            self.notifier
                                .notify(&Notice::upload_complete(entry.file().name()));
                        }
                    }
                }
                ProgressUpdate::Ignored => {}
                ProgressUpdate::Missing => {
                    tracing::debug!("Progress tick for removed file {} ignored", id);
                }
            },
        }
    }

    fn submit(&mut self, files: Vec<Arc<FileHandle>>, origin: Origin) -> SubmitReport {
        let files = match origin {
            Origin::Drop => self.dropzone.drop_files(files),
            Origin::Picker | Origin::Direct => self.dropzone.pick_files(files),
        };
        let Some(files) = files else {
            tracing::debug!("Intake disabled, ignoring {:?} submission", origin);
            return SubmitReport::default();
        };

        let mut outcome = admission::evaluate(&files, self.staging.len(), &self.config);

        let admitted = match self.staging.append(&outcome.accepted) {
            Ok(ids) => ids,
            Err(e) => {
                // evaluate() already checked the count against the same list
                tracing::error!("Staging rejected an admitted batch: {}", e);
                for file in outcome.accepted.drain(..) {
                    outcome.rejections.push(Rejection {
                        file_name: file.name().to_string(),
                        reason: RejectReason::TooManyFiles,
                    });
                }
                Vec::new()
            }
        };

        for (id, file) in admitted.iter().zip(&outcome.accepted) {
            self.start_producers(*id, file.clone());
        }
        if !admitted.is_empty() {
            tracing::info!(
                "Staged {} file(s), {}/{} in use",
                admitted.len(),
                self.staging.len(),
                self.config.max_files
            );
            self.publish();
        }

        for notice in outcome.notices(&self.config) {
            self.notifier.notify(&notice);
        }

        if !outcome.accepted.is_empty() {
            self.notify_files_added(&outcome.accepted);
        }

        SubmitReport {
            admitted,
            rejections: outcome.rejections,
        }
    }

    fn start_producers(&mut self, id: StagedId, file: Arc<FileHandle>) {
        if file.is_image() {
            let events = self.events_tx.clone();
            spawn_preview(self.preview.clone(), id, file, move |id, preview| {
                let _ = events.send(Event::PreviewReady { id, preview });
            });
        }

        let events = self.events_tx.clone();
        let rng = StdRng::seed_from_u64(self.rng.r#gen());
        let timer = ProgressTimer::start(self.progress, rng, move |progress| {
            events.send(Event::Progress { id, progress }).is_ok()
        });
        self.timers.insert(id, timer);
    }

    fn notify_files_added(&self, files: &[Arc<FileHandle>]) {
        let Some(callback) = &self.on_files_added else {
            return;
        };

        if catch_unwind(AssertUnwindSafe(|| callback(files))).is_err() {
            tracing::error!(
                "on_files_added callback panicked; {} staged file(s) kept",
                files.len()
            );
        }
    }

    fn remove(&mut self, id: StagedId) -> Result<(), IntakeError> {
        if self.dropzone.is_disabled() {
            return Err(IntakeError::Disabled);
        }

        let removed = self.staging.remove(id, self.config.strict_removal)?;
        if let Some(timer) = self.timers.remove(&id) {
            timer.cancel();
        }
        tracing::info!("Removed {} ({})", removed.file().name(), id);
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.staging.snapshot());
    }
}

/// Cloneable front end to a running intake controller
#[derive(Clone)]
pub struct IntakeHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<StagingSnapshot>,
}

impl IntakeHandle {
    pub fn builder(config: IntakeConfig) -> IntakeBuilder {
        IntakeBuilder::new(config)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, IntakeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| IntakeError::ControllerClosed)?;
        rx.await.map_err(|_| IntakeError::ControllerClosed)
    }

    async fn submit_as(
        &self,
        files: Vec<FileHandle>,
        origin: Origin,
    ) -> Result<SubmitReport, IntakeError> {
        let files: Vec<Arc<FileHandle>> = files.into_iter().map(Arc::new).collect();
        self.request(move |reply| Command::Submit {
            files,
            origin,
            reply,
        })
        .await
    }

    /// Runs admission over `files` as one batch.
    pub async fn submit(&self, files: Vec<FileHandle>) -> Result<SubmitReport, IntakeError> {
        self.submit_as(files, Origin::Direct).await
    }

    /// Files dropped onto the drop target. Ends any drag in progress.
    pub async fn drop_files(&self, files: Vec<FileHandle>) -> Result<SubmitReport, IntakeError> {
        self.submit_as(files, Origin::Drop).await
    }

    /// Files chosen through the picker
    pub async fn pick_files(&self, files: Vec<FileHandle>) -> Result<SubmitReport, IntakeError> {
        self.submit_as(files, Origin::Picker).await
    }

    pub async fn remove(&self, id: StagedId) -> Result<(), IntakeError> {
        self.request(|reply| Command::Remove { id, reply }).await?
    }

    pub fn drag_enter(&self) -> Result<(), IntakeError> {
        self.send(Command::DragEnter)
    }

    pub fn drag_leave(&self) -> Result<(), IntakeError> {
        self.send(Command::DragLeave)
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<(), IntakeError> {
        self.send(Command::SetDisabled(disabled))
    }

    pub async fn view(&self) -> Result<DropZoneView, IntakeError> {
        self.request(|reply| Command::View { reply }).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> StagingSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StagingSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until every staged file has reached 100%.
    pub async fn wait_until_complete(&self) -> Result<StagingSnapshot, IntakeError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(StagingSnapshot::all_complete)
            .await
            .map_err(|_| IntakeError::ControllerClosed)?;
        Ok(snapshot.clone())
    }

    /// Stops the controller and cancels every running progress timer.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    fn send(&self, command: Command) -> Result<(), IntakeError> {
        self.commands
            .send(command)
            .map_err(|_| IntakeError::ControllerClosed)
    }
}
