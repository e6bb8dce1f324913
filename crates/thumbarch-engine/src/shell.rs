//! Studio shell: owns the step machine, the gateway workers and the hand-off
//! into the editor.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use thumbarch_contracts::events::{now_utc_iso, EventKind, EventPayload, EventWriter};
use thumbarch_contracts::session::SessionSummary;
use thumbarch_contracts::{AnalysisResult, AppStep, ThumbnailTemplate};

use crate::card::{CardView, TemplateCard};
use crate::editor::scene::Scene;
use crate::editor::{BackgroundView, EditorSession, ExportOutcome};
use crate::error::StudioError;
use crate::gateway::{error_chain_text, AiGateway, GeneratedImage};
use crate::upload::UploadedImage;

pub const ANALYSIS_FAILED_NOTICE: &str = "Failed to analyze image. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundState {
    Idle,
    Pending,
    Ready { href: String, placeholder: bool },
}

/// Everything the template-selection view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionView {
    pub critique: String,
    pub cards: Vec<CardView>,
    pub suggestions: Vec<String>,
}

enum WorkerMessage {
    Analysis {
        token: u64,
        outcome: Result<AnalysisResult>,
    },
    Background {
        token: u64,
        template_id: String,
        outcome: Result<GeneratedImage>,
    },
}

pub struct Studio {
    gateway: Arc<dyn AiGateway>,
    events: EventWriter,
    placeholder_background: String,
    started_at: String,
    step: AppStep,
    topic: String,
    image: Option<UploadedImage>,
    analysis: Option<AnalysisResult>,
    selected: Option<ThumbnailTemplate>,
    selected_index: Option<usize>,
    editor: Option<EditorSession>,
    background: BackgroundState,
    container_width: Option<f64>,
    analysis_token: u64,
    background_token: u64,
    in_flight: usize,
    notification: Option<String>,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
}

impl Studio {
    pub fn new(
        gateway: Arc<dyn AiGateway>,
        events: EventWriter,
        placeholder_background: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let studio = Self {
            gateway,
            events,
            placeholder_background: placeholder_background.into(),
            started_at: now_utc_iso(),
            step: AppStep::Upload,
            topic: String::new(),
            image: None,
            analysis: None,
            selected: None,
            selected_index: None,
            editor: None,
            background: BackgroundState::Idle,
            container_width: None,
            analysis_token: 0,
            background_token: 0,
            in_flight: 0,
            notification: None,
            tx,
            rx,
        };
        studio.record(EventKind::SessionStarted, json!({ "step": studio.step }));
        studio
    }

    pub fn step(&self) -> AppStep {
        self.step
    }

    pub fn session_id(&self) -> &str {
        self.events.session_id()
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn selected_template(&self) -> Option<&ThumbnailTemplate> {
        self.selected.as_ref()
    }

    pub fn background(&self) -> &BackgroundState {
        &self.background
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// The analysis is only consulted while picking a template.
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self.step {
            AppStep::TemplateSelection => self.analysis.as_ref(),
            _ => None,
        }
    }

    pub fn editor(&self) -> Option<&EditorSession> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorSession> {
        self.editor.as_mut()
    }

    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) -> Result<(), StudioError> {
        self.require(AppStep::Upload, "change the topic")?;
        self.topic = topic.into();
        Ok(())
    }

    pub fn set_image(&mut self, image: UploadedImage) -> Result<(), StudioError> {
        self.require(AppStep::Upload, "change the photo")?;
        self.record(
            EventKind::ImageLoaded,
            json!({
                "file_name": image.file_name(),
                "mime_type": image.mime_type(),
                "bytes": image.bytes().len(),
                "width": image.width(),
                "height": image.height(),
            }),
        );
        self.image = Some(image);
        Ok(())
    }

    pub fn load_image(&mut self, path: &Path) -> Result<(), StudioError> {
        self.require(AppStep::Upload, "change the photo")?;
        let image = UploadedImage::from_path(path)?;
        self.set_image(image)
    }

    pub fn can_generate(&self) -> bool {
        !self.topic.trim().is_empty() && self.image.is_some()
    }

    /// Moves to `ANALYZING` and starts the gateway call on a worker.
    pub fn start_analysis(&mut self) -> Result<u64, StudioError> {
        self.require(AppStep::Upload, "generate templates")?;
        let Some(image) = self.image.as_ref() else {
            return Err(StudioError::upload("select a photo before generating"));
        };
        if self.topic.trim().is_empty() {
            return Err(StudioError::upload("enter a video topic before generating"));
        }

        let inline = image.inline();
        let topic = self.topic.trim().to_string();
        self.analysis = None;
        self.notification = None;
        self.analysis_token += 1;
        let token = self.analysis_token;
        self.transition(AppStep::Analyzing)?;
        self.record(
            EventKind::AnalysisStarted,
            json!({ "token": token, "topic": topic, "mime_type": inline.mime_type }),
        );
        tracing::info!(token, topic = %topic, "analysis started");

        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let outcome = guarded(|| gateway.analyze(&inline, &topic));
            let _ = tx.send(WorkerMessage::Analysis { token, outcome });
        });
        Ok(token)
    }

    /// Blocks until the running analysis has been applied.
    pub fn wait_for_analysis(&mut self) -> Result<(), StudioError> {
        while self.step == AppStep::Analyzing {
            self.recv_one()?;
        }
        Ok(())
    }

    /// Applies finished worker results without blocking. Returns how many
    /// were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    self.apply(message);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Blocks until every spawned worker has reported.
    pub fn settle(&mut self) -> Result<(), StudioError> {
        while self.in_flight > 0 {
            self.recv_one()?;
        }
        Ok(())
    }

    pub fn selection_view(&self) -> Option<SelectionView> {
        let analysis = self.analysis()?;
        Some(SelectionView {
            critique: analysis.critique.clone(),
            cards: analysis
                .templates
                .iter()
                .enumerate()
                .map(|(index, template)| {
                    TemplateCard::new(template, self.selected_index == Some(index)).view()
                })
                .collect(),
            suggestions: analysis.background_suggestions.clone(),
        })
    }

    /// Stores the template, enters the editor at once and kicks off
    /// background generation without waiting for it.
    pub fn select_template(&mut self, index: usize) -> Result<&ThumbnailTemplate, StudioError> {
        self.require(AppStep::TemplateSelection, "select a template")?;
        let Some(template) = self
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.template(index))
        else {
            let count = self
                .analysis
                .as_ref()
                .map(|analysis| analysis.templates.len())
                .unwrap_or(0);
            return Err(anyhow!("no template #{} (have {count})", index + 1).into());
        };

        let mut chosen = None;
        TemplateCard::new(template, false).activate(|picked| chosen = Some(picked.clone()));
        let Some(template) = chosen else {
            return Err(anyhow!("template card did not report a selection").into());
        };

        self.record(
            EventKind::TemplateSelected,
            json!({
                "index": index,
                "template_id": template.id,
                "layout_type": template.layout_type,
            }),
        );
        let prompt = template.suggested_background.clone();
        let template_id = template.id.clone();
        self.mount_editor(&template);
        self.selected = Some(template);
        self.selected_index = Some(index);
        self.transition(AppStep::Editor)?;
        self.request_background(template_id, prompt);

        self.selected
            .as_ref()
            .ok_or_else(|| anyhow!("selected template missing").into())
    }

    /// Re-enters the editor with the retained template and background.
    pub fn reopen_editor(&mut self) -> Result<(), StudioError> {
        self.require(AppStep::TemplateSelection, "reopen the editor")?;
        let Some(template) = self.selected.clone() else {
            return Err(StudioError::invalid_transition(
                self.step,
                "reopen the editor without a selected template",
            ));
        };
        self.mount_editor(&template);
        self.transition(AppStep::Editor)?;
        Ok(())
    }

    /// Leaves the editor. Its edits end with it; template and background stay.
    pub fn back(&mut self) -> Result<(), StudioError> {
        self.require(AppStep::Editor, "go back")?;
        self.editor = None;
        self.transition(AppStep::TemplateSelection)?;
        Ok(())
    }

    pub fn set_container_width(&mut self, width: f64) -> Option<f64> {
        self.container_width = Some(width);
        self.editor
            .as_mut()
            .map(|editor| editor.set_container_width(width))
    }

    pub fn background_view(&self) -> BackgroundView<'_> {
        match &self.background {
            BackgroundState::Pending => BackgroundView::Generating,
            BackgroundState::Ready { href, .. } => BackgroundView::Ready(href),
            BackgroundState::Idle => BackgroundView::Missing,
        }
    }

    pub fn compose_preview(&self) -> Option<Scene> {
        let editor = self.editor.as_ref()?;
        Some(editor.compose(self.image.as_ref(), self.background_view()))
    }

    pub fn export(&mut self) -> Result<ExportOutcome, StudioError> {
        self.require(AppStep::Editor, "export")?;
        let Some(editor) = self.editor.as_ref() else {
            return Err(StudioError::invalid_transition(self.step, "export"));
        };
        let outcome = editor.export_hd();
        let ExportOutcome::Unavailable(message) = &outcome;
        self.record(
            EventKind::ExportRequested,
            json!({ "available": false, "message": message }),
        );
        Ok(outcome)
    }

    /// Settles outstanding workers, logs `session_finished` and returns the
    /// summary for `session.json`.
    pub fn finish(&mut self) -> SessionSummary {
        if let Err(err) = self.settle() {
            tracing::warn!(error = %err, "workers did not settle before exit");
        }
        let summary = SessionSummary {
            session_id: self.session_id().to_string(),
            started_at: self.started_at.clone(),
            finished_at: now_utc_iso(),
            final_step: self.step,
            topic: self.topic.clone(),
            templates_offered: self
                .analysis
                .as_ref()
                .map(|analysis| analysis.templates.len() as u64)
                .unwrap_or(0),
            selected_template: self.selected.as_ref().map(|template| template.id.clone()),
            background_source: match &self.background {
                BackgroundState::Ready {
                    placeholder: true, ..
                } => Some("placeholder".to_string()),
                BackgroundState::Ready { .. } => Some("generated".to_string()),
                _ => None,
            },
        };
        self.record(
            EventKind::SessionFinished,
            json!({
                "final_step": summary.final_step,
                "selected_template": summary.selected_template,
            }),
        );
        summary
    }

    fn mount_editor(&mut self, template: &ThumbnailTemplate) {
        let mut editor = EditorSession::new(template.clone());
        if let Some(width) = self.container_width {
            editor.set_container_width(width);
        }
        self.editor = Some(editor);
    }

    fn request_background(&mut self, template_id: String, prompt: String) {
        self.background_token += 1;
        let token = self.background_token;
        self.background = BackgroundState::Pending;
        self.record(
            EventKind::BackgroundRequested,
            json!({ "token": token, "template_id": template_id, "prompt": prompt }),
        );

        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let outcome = guarded(|| gateway.generate_background(&prompt));
            let _ = tx.send(WorkerMessage::Background {
                token,
                template_id,
                outcome,
            });
        });
    }

    fn recv_one(&mut self) -> Result<(), StudioError> {
        let message = self
            .rx
            .recv()
            .map_err(|_| anyhow!("worker channel closed"))?;
        self.apply(message);
        Ok(())
    }

    fn apply(&mut self, message: WorkerMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match message {
            WorkerMessage::Analysis { token, outcome } => self.apply_analysis(token, outcome),
            WorkerMessage::Background {
                token,
                template_id,
                outcome,
            } => self.apply_background(token, template_id, outcome),
        }
    }

    fn apply_analysis(&mut self, token: u64, outcome: Result<AnalysisResult>) {
        if token != self.analysis_token || self.step != AppStep::Analyzing {
            tracing::debug!(token, latest = self.analysis_token, "stale analysis dropped");
            return;
        }
        match outcome {
            Ok(result) => {
                self.record(
                    EventKind::AnalysisCompleted,
                    json!({
                        "token": token,
                        "templates": result.templates.len(),
                        "layouts": result
                            .templates
                            .iter()
                            .map(|template| template.layout_type.as_str())
                            .collect::<Vec<_>>(),
                    }),
                );
                tracing::info!(token, templates = result.templates.len(), "analysis completed");
                self.analysis = Some(result);
                self.selected = None;
                self.selected_index = None;
                self.background = BackgroundState::Idle;
                self.step_to(AppStep::TemplateSelection);
            }
            Err(err) => {
                let error = error_chain_text(&err, 512);
                let classified = StudioError::analysis(error.clone());
                tracing::warn!(token, error = %classified, "analysis failed");
                self.record(
                    EventKind::AnalysisFailed,
                    json!({ "token": token, "error": error }),
                );
                self.notification = Some(ANALYSIS_FAILED_NOTICE.to_string());
                self.step_to(AppStep::Upload);
            }
        }
    }

    fn apply_background(&mut self, token: u64, template_id: String, outcome: Result<GeneratedImage>) {
        if token != self.background_token {
            tracing::debug!(token, latest = self.background_token, "stale background dropped");
            self.record(
                EventKind::BackgroundDiscarded,
                json!({
                    "token": token,
                    "latest_token": self.background_token,
                    "template_id": template_id,
                    "ok": outcome.is_ok(),
                }),
            );
            return;
        }
        match outcome {
            Ok(image) => {
                self.record(
                    EventKind::BackgroundReady,
                    json!({
                        "token": token,
                        "template_id": template_id,
                        "mime_type": image.mime_type,
                        "bytes": image.bytes.len(),
                    }),
                );
                self.background = BackgroundState::Ready {
                    href: image.data_url(),
                    placeholder: false,
                };
            }
            Err(err) => {
                let error = error_chain_text(&err, 512);
                let classified = StudioError::background(error.clone());
                tracing::warn!(token, error = %classified, "using placeholder background");
                self.record(
                    EventKind::BackgroundFailed,
                    json!({
                        "token": token,
                        "template_id": template_id,
                        "error": error,
                        "placeholder": self.placeholder_background,
                    }),
                );
                self.background = BackgroundState::Ready {
                    href: self.placeholder_background.clone(),
                    placeholder: true,
                };
            }
        }
    }

    fn require(&self, step: AppStep, action: &'static str) -> Result<(), StudioError> {
        if self.step != step {
            return Err(StudioError::invalid_transition(self.step, action));
        }
        Ok(())
    }

    fn transition(&mut self, next: AppStep) -> Result<(), StudioError> {
        if !self.step.can_transition_to(next) {
            return Err(StudioError::invalid_transition(self.step, "change step"));
        }
        let from = self.step;
        self.step = next;
        self.record(EventKind::StepChanged, json!({ "from": from, "to": next }));
        tracing::debug!(from = %from, to = %next, "step changed");
        Ok(())
    }

    /// Worker-driven transitions are always legal edges.
    fn step_to(&mut self, next: AppStep) {
        if let Err(err) = self.transition(next) {
            tracing::warn!(error = %err, "worker result ignored");
        }
    }

    fn record(&self, kind: EventKind, payload: Value) {
        let payload: EventPayload = match payload {
            Value::Object(map) => map,
            _ => EventPayload::new(),
        };
        if let Err(err) = self.events.emit(kind, payload) {
            tracing::warn!(event = %kind, error = %err, "failed to write session event");
        }
    }
}

fn guarded<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|_| Err(anyhow!("gateway worker panicked")))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use serde_json::Value;
    use thumbarch_contracts::events::EventWriter;
    use thumbarch_contracts::{AnalysisResult, AppStep, LayoutType, ThumbnailTemplate};

    use super::{BackgroundState, Studio, ANALYSIS_FAILED_NOTICE};
    use crate::editor::scene::Layer;
    use crate::editor::test_support::template;
    use crate::error::StudioError;
    use crate::gateway::{AiGateway, GeneratedImage, InlineImage};
    use crate::upload::{test_images, UploadedImage};

    const PLACEHOLDER: &str = "https://picsum.photos/1280/720?grayscale&blur=2";

    struct FakeGateway {
        fail_analysis: bool,
        fail_background: bool,
        shared_template_id: Option<String>,
        background_calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        fn new(fail_analysis: bool, fail_background: bool) -> Arc<Self> {
            Arc::new(Self {
                fail_analysis,
                fail_background,
                shared_template_id: None,
                background_calls: Mutex::new(Vec::new()),
            })
        }

        /// Every returned template carries the same id.
        fn with_shared_template_id(id: &str) -> Arc<Self> {
            Arc::new(Self {
                fail_analysis: false,
                fail_background: false,
                shared_template_id: Some(id.to_string()),
                background_calls: Mutex::new(Vec::new()),
            })
        }

        fn background_calls(&self) -> Vec<String> {
            self.background_calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }
    }

    fn four_templates() -> Vec<ThumbnailTemplate> {
        LayoutType::ALL
            .iter()
            .map(|layout| {
                let mut blueprint = template(*layout);
                blueprint.suggested_background = format!("{} backdrop", layout.as_str());
                blueprint
            })
            .collect()
    }

    impl AiGateway for FakeGateway {
        fn analyze(&self, image: &InlineImage, topic: &str) -> Result<AnalysisResult> {
            if self.fail_analysis {
                return Err(anyhow!("gateway returned 503"));
            }
            assert_eq!(image.mime_type, "image/jpeg");
            let mut templates = four_templates();
            if let Some(id) = &self.shared_template_id {
                for blueprint in &mut templates {
                    blueprint.id = id.clone();
                }
            }
            Ok(AnalysisResult {
                templates,
                background_suggestions: vec!["neon".to_string()],
                critique: format!("Solid photo for '{topic}'."),
            })
        }

        fn generate_background(&self, prompt: &str) -> Result<GeneratedImage> {
            if let Ok(mut calls) = self.background_calls.lock() {
                calls.push(prompt.to_string());
            }
            if self.fail_background {
                return Err(anyhow!("quota exceeded"));
            }
            Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                bytes: prompt.as_bytes().to_vec(),
            })
        }
    }

    fn studio(gateway: Arc<FakeGateway>, dir: &Path) -> Studio {
        let events = EventWriter::new(dir.join("events.jsonl"), "session-test");
        Studio::new(gateway, events, PLACEHOLDER)
    }

    fn jpeg() -> UploadedImage {
        UploadedImage::from_bytes(test_images::jpeg(64, 48), Some("face.jpg".to_string()))
            .expect("test jpeg")
    }

    fn event_types(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("events.jsonl"))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|event| event["type"].as_str().map(str::to_string))
            .collect()
    }

    fn analyzed(gateway: Arc<FakeGateway>, dir: &Path) -> Result<Studio> {
        let mut studio = studio(gateway, dir);
        studio.set_topic("How I learned to code in 30 days")?;
        studio.set_image(jpeg())?;
        studio.start_analysis()?;
        studio.wait_for_analysis()?;
        Ok(studio)
    }

    #[test]
    fn generate_requires_topic_and_image() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut studio = studio(FakeGateway::new(false, false), temp.path());
        assert!(!studio.can_generate());
        assert!(matches!(studio.start_analysis(), Err(StudioError::Upload(_))));

        studio.set_topic("   ")?;
        studio.set_image(jpeg())?;
        assert!(!studio.can_generate());
        assert!(studio.start_analysis().is_err());
        assert_eq!(studio.step(), AppStep::Upload);

        studio.set_topic("Rust tips")?;
        assert!(studio.can_generate());
        Ok(())
    }

    #[test]
    fn scenario_split_selection_bleeds_subject_and_shows_divider() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let gateway = FakeGateway::new(false, false);
        let mut studio = analyzed(gateway.clone(), temp.path())?;
        assert_eq!(studio.step(), AppStep::TemplateSelection);

        let view = studio.selection_view().expect("selection view");
        assert_eq!(view.cards.len(), 4);
        let tags: Vec<_> = view.cards.iter().map(|card| card.layout_tag.as_str()).collect();
        assert_eq!(tags, vec!["SPLIT", "FULL-FACE", "MINIMAL", "GRID"]);
        assert!(view.critique.contains("How I learned to code in 30 days"));

        let chosen = studio.select_template(0)?;
        assert_eq!(chosen.layout_type, LayoutType::Split);
        assert_eq!(studio.step(), AppStep::Editor);
        assert_eq!(studio.background(), &BackgroundState::Pending);

        let pending = studio.compose_preview().expect("scene");
        assert!(matches!(
            &pending.layers[0],
            Layer::BackgroundPlaceholder { label: Some(_), .. }
        ));

        studio.settle()?;
        let scene = studio.compose_preview().expect("scene");
        assert!(matches!(&scene.layers[0], Layer::BackgroundImage { .. }));
        let subject = scene.subject().expect("subject");
        assert!(subject.frame.right() >= 800.0);
        assert!(scene
            .layers
            .iter()
            .any(|layer| matches!(layer, Layer::Divider { x, .. } if *x == 400.0)));
        assert_eq!(gateway.background_calls(), vec!["split backdrop".to_string()]);
        Ok(())
    }

    #[test]
    fn failed_analysis_rolls_back_and_keeps_inputs() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let studio = analyzed(FakeGateway::new(true, false), temp.path());
        let mut studio = studio?;
        assert_eq!(studio.step(), AppStep::Upload);
        assert_eq!(studio.topic(), "How I learned to code in 30 days");
        assert!(studio.image().is_some());
        assert_eq!(studio.take_notification().as_deref(), Some(ANALYSIS_FAILED_NOTICE));
        assert_eq!(studio.take_notification(), None);
        assert!(studio.can_generate());
        assert!(event_types(temp.path()).contains(&"analysis_failed".to_string()));
        Ok(())
    }

    #[test]
    fn failed_background_still_reaches_editor_with_placeholder() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut studio = analyzed(FakeGateway::new(false, true), temp.path())?;
        studio.select_template(1)?;
        assert_eq!(studio.step(), AppStep::Editor);
        studio.settle()?;
        assert_eq!(
            studio.background(),
            &BackgroundState::Ready {
                href: PLACEHOLDER.to_string(),
                placeholder: true
            }
        );
        let scene = studio.compose_preview().expect("scene");
        assert!(matches!(
            &scene.layers[0],
            Layer::BackgroundImage { href, .. } if href == PLACEHOLDER
        ));
        assert!(studio.take_notification().is_none());
        assert!(event_types(temp.path()).contains(&"background_failed".to_string()));
        Ok(())
    }

    #[test]
    fn stale_background_is_discarded() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut studio = analyzed(FakeGateway::new(false, false), temp.path())?;
        studio.select_template(0)?;
        studio.back()?;
        studio.select_template(3)?;
        studio.settle()?;

        match studio.background() {
            BackgroundState::Ready { href, placeholder } => {
                assert!(!placeholder);
                let expected = GeneratedImage {
                    mime_type: "image/png".to_string(),
                    bytes: b"grid backdrop".to_vec(),
                };
                assert_eq!(href, &expected.data_url());
            }
            other => panic!("unexpected background {other:?}"),
        }
        let types = event_types(temp.path());
        assert_eq!(
            types.iter().filter(|kind| *kind == "background_discarded").count(),
            1
        );
        assert_eq!(
            types.iter().filter(|kind| *kind == "background_ready").count(),
            1
        );
        Ok(())
    }

    #[test]
    fn back_keeps_selection_and_reopen_does_not_regenerate() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let gateway = FakeGateway::new(false, false);
        let mut studio = analyzed(gateway.clone(), temp.path())?;
        studio.select_template(2)?;
        studio.settle()?;

        if let Some(editor) = studio.editor_mut() {
            editor.set_headline("Edited Headline Here");
        }
        let edited = studio.compose_preview().expect("scene");
        assert_eq!(
            edited.headline().expect("headline").plain_text().replace('\n', " "),
            "EDITED HEADLINE HERE"
        );

        studio.back()?;
        assert_eq!(studio.step(), AppStep::TemplateSelection);
        assert!(studio.editor().is_none());
        let selected = studio.selected_template().expect("selected");
        assert_eq!(selected.headline, "How I Learned X");
        let view = studio.selection_view().expect("view");
        assert!(view.cards[2].selected);
        assert_eq!(view.cards[2].headline_text(), "HOW I LEARNED X");

        studio.reopen_editor()?;
        assert_eq!(studio.step(), AppStep::Editor);
        assert_eq!(studio.editor().map(|editor| editor.headline()), Some("How I Learned X"));
        assert!(matches!(studio.background(), BackgroundState::Ready { .. }));
        assert_eq!(gateway.background_calls().len(), 1);
        Ok(())
    }

    #[test]
    fn duplicate_template_ids_mark_only_the_chosen_card() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let gateway = FakeGateway::with_shared_template_id("tpl-1");
        let mut studio = analyzed(gateway, temp.path())?;
        let view = studio.selection_view().expect("view");
        assert!(view.cards.iter().all(|card| !card.selected));

        studio.select_template(1)?;
        studio.settle()?;
        studio.back()?;
        let view = studio.selection_view().expect("view");
        let marked: Vec<usize> = view
            .cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.selected)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(marked, vec![1]);
        Ok(())
    }

    #[test]
    fn guards_reject_out_of_order_actions() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut studio = studio(FakeGateway::new(false, false), temp.path());
        assert!(matches!(
            studio.select_template(0),
            Err(StudioError::InvalidTransition { from: AppStep::Upload, .. })
        ));
        assert!(studio.back().is_err());
        assert!(studio.reopen_editor().is_err());
        assert!(studio.export().is_err());
        assert!(studio.compose_preview().is_none());

        let mut studio = analyzed(FakeGateway::new(false, false), temp.path())?;
        assert!(studio.select_template(9).is_err());
        assert!(studio.reopen_editor().is_err());
        assert!(studio.set_topic("new topic").is_err());
        Ok(())
    }

    #[test]
    fn container_width_carries_into_new_editor_mounts() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut studio = analyzed(FakeGateway::new(false, false), temp.path())?;
        assert_eq!(studio.set_container_width(400.0), None);
        studio.select_template(0)?;
        assert_eq!(studio.editor().map(|editor| editor.display_scale()), Some(0.5));
        assert_eq!(studio.set_container_width(1200.0), Some(1.0));
        studio.settle()?;
        Ok(())
    }

    #[test]
    fn export_and_finish_are_logged() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut studio = analyzed(FakeGateway::new(false, false), temp.path())?;
        studio.select_template(1)?;
        let outcome = studio.export()?;
        let crate::editor::ExportOutcome::Unavailable(message) = outcome;
        assert!(!message.is_empty());

        let summary = studio.finish();
        assert_eq!(summary.final_step, AppStep::Editor);
        assert_eq!(summary.templates_offered, 4);
        assert_eq!(summary.selected_template.as_deref(), Some("tpl-full-face"));
        assert_eq!(summary.background_source.as_deref(), Some("generated"));

        let types = event_types(temp.path());
        assert_eq!(types.first().map(String::as_str), Some("session_started"));
        assert_eq!(types.last().map(String::as_str), Some("session_finished"));
        for expected in [
            "image_loaded",
            "step_changed",
            "analysis_started",
            "analysis_completed",
            "template_selected",
            "background_requested",
            "background_ready",
            "export_requested",
        ] {
            assert!(types.iter().any(|kind| kind == expected), "missing {expected}");
        }
        Ok(())
    }
}
