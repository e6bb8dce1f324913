use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::{Map, Value};
use thumbarch_contracts::chat::{parse_intent, Intent, STUDIO_HELP_COMMANDS};
use thumbarch_contracts::events::{EventKind, EventWriter};
use thumbarch_contracts::session::write_summary;
use thumbarch_contracts::AnalysisResult;
use thumbarch_engine::config::{load_dotenv, GatewayConfig};
use thumbarch_engine::editor::scene::Point;
use thumbarch_engine::gateway::error_chain_text;
use thumbarch_engine::{
    render_svg, AiGateway, BackgroundState, BackgroundView, EditorSession, ExportOutcome,
    RoutedGateway, SelectionView, Studio, UploadedImage,
};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "thumbarch",
    version,
    about = "ThumbArchitect thumbnail blueprint studio"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Dotenv file merged beneath the process environment.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[arg(long, global = true)]
    analysis_model: Option<String>,
    #[arg(long, global = true)]
    image_model: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive studio session over slash commands.
    Studio(StudioArgs),
    /// Analyze one photo and print the proposed blueprints.
    Analyze(AnalyzeArgs),
    /// Render one blueprint to an SVG preview without prompting.
    Compose(ComposeArgs),
}

#[derive(Debug, Args)]
struct StudioArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    topic: Option<String>,
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    container_width: Option<f64>,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    topic: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ComposeArgs {
    /// `analysis.json` written by `analyze` or `studio`.
    #[arg(long)]
    analysis: PathBuf,
    #[arg(long)]
    image: PathBuf,
    /// Template number, starting at 1.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    template: u64,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    headline: Option<String>,
    #[arg(long)]
    highlight: Option<String>,
    #[arg(long)]
    scale: Option<f64>,
    /// Subject offset in canvas pixels, as `X,Y`.
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    offset: Option<Offset>,
    /// Keep the photo's own background instead of the cutout look.
    #[arg(long)]
    original_subject: bool,
    #[arg(long)]
    skip_background: bool,
    #[arg(long)]
    container_width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Offset {
    x: f64,
    y: f64,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("thumbarch error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(
        cli.env_file.as_deref(),
        cli.analysis_model.as_deref(),
        cli.image_model.as_deref(),
    )?;
    match cli.command {
        Command::Studio(args) => run_studio(&config, args),
        Command::Analyze(args) => run_analyze(&config, args),
        Command::Compose(args) => run_compose(&config, args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(
    env_file: Option<&Path>,
    analysis_model: Option<&str>,
    image_model: Option<&str>,
) -> Result<GatewayConfig> {
    let dotenv = match env_file {
        Some(path) => {
            if !path.is_file() {
                bail!("env file not found: {}", path.display());
            }
            load_dotenv(path)
        }
        None => load_dotenv(Path::new(".env")),
    };
    let mut config = GatewayConfig::from_env_with_dotenv(&dotenv);
    if let Some(model) = non_empty(analysis_model) {
        config.analysis_model = model;
    }
    if let Some(model) = non_empty(image_model) {
        config.image_model = model;
    }
    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn report_config_warnings(config: &GatewayConfig, events: Option<&EventWriter>) {
    for warning in config.warnings() {
        tracing::warn!(%warning, "gateway configuration");
        let Some(events) = events else {
            continue;
        };
        let mut payload = Map::new();
        payload.insert("message".to_string(), Value::String(warning));
        if let Err(err) = events.emit(EventKind::ConfigWarning, payload) {
            tracing::warn!(error = %err, "failed to log config warning");
        }
    }
}

fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn AiGateway>> {
    let gateway = RoutedGateway::from_config(config).context("failed to set up the AI gateway")?;
    Ok(Arc::new(gateway))
}

fn open_studio(config: &GatewayConfig, out_dir: &Path, events: Option<PathBuf>) -> Result<Studio> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let events_path = events.unwrap_or_else(|| out_dir.join("events.jsonl"));
    let events = EventWriter::for_new_session(events_path);
    report_config_warnings(config, Some(&events));
    let gateway = build_gateway(config)?;
    Ok(Studio::new(
        gateway,
        events,
        config.placeholder_background.clone(),
    ))
}

fn run_studio(config: &GatewayConfig, args: StudioArgs) -> Result<i32> {
    let studio = open_studio(config, &args.out, args.events)?;
    let mut repl = StudioRepl::new(studio, args.out);
    if let Some(width) = args.container_width {
        repl.studio.set_container_width(width);
    }
    if let Some(topic) = args.topic {
        repl.studio.set_topic(topic)?;
    }
    if let Some(image) = args.image {
        repl.studio.load_image(&image)?;
    }

    println!("ThumbArchitect studio (session {})", repl.studio.session_id());
    println!("Type /help for commands. Plain text sets the video topic.");
    repl.print_generate_hint();

    let stdin = io::stdin();
    loop {
        if let Err(err) = repl.pump() {
            println!("error: {err:#}");
        }
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
        let intent = parse_intent(&input);
        if intent.action == "noop" {
            continue;
        }
        match repl.handle(&intent) {
            Ok(ReplFlow::Continue) => {}
            Ok(ReplFlow::Quit) => break,
            Err(err) => println!("error: {err:#}"),
        }
    }

    repl.finish()?;
    Ok(0)
}

fn run_analyze(config: &GatewayConfig, args: AnalyzeArgs) -> Result<i32> {
    let mut studio = open_studio(config, &args.out, args.events)?;
    studio.set_topic(args.topic)?;
    studio.load_image(&args.image)?;
    studio.start_analysis()?;
    studio.wait_for_analysis()?;
    if let Some(notice) = studio.take_notification() {
        studio.finish();
        bail!("{notice}");
    }

    let analysis_path = args.out.join("analysis.json");
    {
        let analysis = studio
            .analysis()
            .ok_or_else(|| anyhow!("analysis finished without a result"))?;
        write_json_value(&analysis_path, &serde_json::to_value(analysis)?)?;
    }
    if let Some(view) = studio.selection_view() {
        print!("{}", format_selection(&view, io::stdout().is_terminal()));
    }
    studio.finish();
    println!("Analysis written to {}", analysis_path.display());
    Ok(0)
}

fn run_compose(config: &GatewayConfig, args: ComposeArgs) -> Result<i32> {
    let raw = fs::read_to_string(&args.analysis)
        .with_context(|| format!("failed to read {}", args.analysis.display()))?;
    let analysis = AnalysisResult::from_json(&raw)
        .with_context(|| format!("invalid analysis file {}", args.analysis.display()))?;
    let index = usize::try_from(args.template - 1)?;
    let Some(template) = analysis.template(index).cloned() else {
        bail!(
            "no template #{} (have {})",
            args.template,
            analysis.templates.len()
        );
    };
    let image = UploadedImage::from_path(&args.image)?;

    let mut editor = EditorSession::new(template);
    apply_compose_edits(&mut editor, &args);

    let background = if args.skip_background {
        None
    } else {
        report_config_warnings(config, None);
        let gateway = build_gateway(config)?;
        Some(resolve_background(
            gateway.as_ref(),
            &editor.template().suggested_background,
            &config.placeholder_background,
        ))
    };
    let view = match background.as_deref() {
        Some(href) => BackgroundView::Ready(href),
        None => BackgroundView::Missing,
    };

    let scene = editor.compose(Some(&image), view);
    write_text(&args.out, &render_svg(&scene))?;
    println!(
        "Preview of \"{}\" written to {}",
        editor.template().name,
        args.out.display()
    );
    Ok(0)
}

fn apply_compose_edits(editor: &mut EditorSession, args: &ComposeArgs) {
    if let Some(headline) = &args.headline {
        editor.set_headline(headline.clone());
    }
    if let Some(highlight) = &args.highlight {
        editor.set_highlight_word(highlight.clone());
    }
    if let Some(scale) = args.scale {
        editor.set_scale(scale);
    }
    if let Some(offset) = args.offset {
        editor.begin_drag(Point::ORIGIN);
        editor.drag_to(Point::new(offset.x, offset.y));
        editor.end_drag();
    }
    if args.original_subject && editor.background_removed() {
        editor.toggle_background_removal();
    }
    if let Some(width) = args.container_width {
        editor.set_container_width(width);
    }
}

/// Generated image as a data URL, or the placeholder when generation fails.
fn resolve_background(gateway: &dyn AiGateway, prompt: &str, placeholder: &str) -> String {
    match gateway.generate_background(prompt) {
        Ok(image) => image.data_url(),
        Err(err) => {
            tracing::warn!(
                error = %error_chain_text(&err, 400),
                "background generation failed; using placeholder"
            );
            placeholder.to_string()
        }
    }
}

fn parse_offset(raw: &str) -> std::result::Result<Offset, String> {
    let Some((x, y)) = raw.split_once(',') else {
        return Err(format!("expected X,Y but got '{raw}'"));
    };
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| format!("'{}' is not a number", part.trim()))
    };
    Ok(Offset {
        x: parse(x)?,
        y: parse(y)?,
    })
}

enum ReplFlow {
    Continue,
    Quit,
}

struct StudioRepl {
    studio: Studio,
    out_dir: PathBuf,
    color: bool,
}

impl StudioRepl {
    fn new(studio: Studio, out_dir: PathBuf) -> Self {
        Self {
            studio,
            out_dir,
            color: io::stdout().is_terminal(),
        }
    }

    fn preview_path(&self) -> PathBuf {
        self.out_dir.join("preview.svg")
    }

    /// Applies finished worker results and reports what they changed.
    fn pump(&mut self) -> Result<()> {
        let before = background_label(self.studio.background());
        if self.studio.pump() == 0 {
            return Ok(());
        }
        self.report_worker_results(before)
    }

    fn report_worker_results(&mut self, before: &'static str) -> Result<()> {
        let after = background_label(self.studio.background());
        if after != before {
            match after {
                "generated" => println!("Background ready."),
                "placeholder" => println!("Background generation failed; using placeholder."),
                _ => {}
            }
        }
        if let Some(notice) = self.studio.take_notification() {
            println!("! {notice}");
        }
        self.refresh_preview()?;
        Ok(())
    }

    fn refresh_preview(&self) -> Result<Option<PathBuf>> {
        let Some(scene) = self.studio.compose_preview() else {
            return Ok(None);
        };
        let path = self.preview_path();
        write_text(&path, &render_svg(&scene))?;
        Ok(Some(path))
    }

    fn editor_mut(&mut self) -> Result<&mut EditorSession> {
        self.studio
            .editor_mut()
            .ok_or_else(|| anyhow!("no editor open; /select a template first"))
    }

    fn handle(&mut self, intent: &Intent) -> Result<ReplFlow> {
        match intent.action.as_str() {
            "set_topic" => {
                let text = intent.arg_str("text").unwrap_or_default();
                self.studio.set_topic(text)?;
                println!("Topic: {text}");
                self.print_generate_hint();
            }
            "set_image" => {
                let path = intent.arg_str("path").unwrap_or_default();
                if path.is_empty() {
                    bail!("usage: /image <path>");
                }
                self.studio.load_image(Path::new(path))?;
                if let Some(image) = self.studio.image() {
                    println!(
                        "Photo: {} ({}x{}, {})",
                        image.file_name().unwrap_or(path),
                        image.width(),
                        image.height(),
                        image.mime_type()
                    );
                }
                self.print_generate_hint();
            }
            "generate" => self.generate()?,
            "select_template" => {
                let index = intent
                    .command_args
                    .get("index")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| anyhow!("missing template number"))?;
                let name = self
                    .studio
                    .select_template(usize::try_from(index)?)?
                    .name
                    .clone();
                println!("Editing \"{name}\". Generating background...");
                self.report_preview()?;
            }
            "reopen_editor" => {
                self.studio.reopen_editor()?;
                println!("Editor reopened.");
                self.report_preview()?;
            }
            "back" => {
                self.studio.back()?;
                self.print_selection();
            }
            "set_headline" => {
                let text = intent.arg_str("text").unwrap_or_default();
                self.editor_mut()?.set_headline(text);
                self.refresh_preview()?;
            }
            "set_highlight" => {
                let text = intent.arg_str("text").unwrap_or_default();
                self.editor_mut()?.set_highlight_word(text);
                self.refresh_preview()?;
            }
            "set_scale" => {
                let value = intent
                    .arg_f64("value")
                    .ok_or_else(|| anyhow!("usage: /scale <0.5-2.0>"))?;
                let applied = self.editor_mut()?.set_scale(value);
                println!("Subject scale: {applied:.1}");
                self.refresh_preview()?;
            }
            "drag" => {
                let from = point_arg(intent, "from")?;
                let to = point_arg(intent, "to")?;
                let editor = self.editor_mut()?;
                editor.begin_drag(from);
                editor.drag_to(to);
                editor.end_drag();
                let transform = editor.transform();
                println!("Subject offset: {:.0}, {:.0}", transform.x, transform.y);
                self.refresh_preview()?;
            }
            "toggle_background_removal" => {
                if self.editor_mut()?.toggle_background_removal() {
                    println!("Background removal: on");
                } else {
                    println!("Background removal: off (original photo)");
                }
                self.refresh_preview()?;
            }
            "set_container_width" => {
                let width = intent
                    .arg_f64("value")
                    .ok_or_else(|| anyhow!("usage: /width <px>"))?;
                match self.studio.set_container_width(width) {
                    Some(scale) => println!("Display scale: {scale:.3}"),
                    None => println!("Container width {width}px applies once the editor opens."),
                }
                self.refresh_preview()?;
            }
            "preview" => {
                let path = match intent.arg_str("path") {
                    Some(path) if !path.is_empty() => PathBuf::from(path),
                    _ => self.preview_path(),
                };
                let scene = self
                    .studio
                    .compose_preview()
                    .ok_or_else(|| anyhow!("no preview outside the editor"))?;
                write_text(&path, &render_svg(&scene))?;
                println!("Preview written to {}", path.display());
            }
            "export" => {
                let ExportOutcome::Unavailable(message) = self.studio.export()?;
                println!("{message}");
            }
            "status" => print!("{}", format_status(&self.studio)),
            "wait" => {
                let before = background_label(self.studio.background());
                self.studio.settle()?;
                self.report_worker_results(before)?;
                println!("Nothing left in flight.");
            }
            "help" => {
                println!("Commands:");
                for command in STUDIO_HELP_COMMANDS {
                    println!("  {command}");
                }
            }
            "quit" => return Ok(ReplFlow::Quit),
            "invalid" => println!(
                "{}",
                intent.arg_str("error").unwrap_or("invalid command")
            ),
            "unknown" => println!(
                "Unknown command: /{}. Type /help.",
                intent.arg_str("command").unwrap_or_default()
            ),
            _ => {}
        }
        Ok(ReplFlow::Continue)
    }

    fn generate(&mut self) -> Result<()> {
        self.studio.start_analysis()?;
        println!("Analyzing photo for \"{}\"...", self.studio.topic().trim());
        self.studio.wait_for_analysis()?;
        if let Some(notice) = self.studio.take_notification() {
            println!("! {notice}");
            return Ok(());
        }
        if let Some(analysis) = self.studio.analysis() {
            write_json_value(
                &self.out_dir.join("analysis.json"),
                &serde_json::to_value(analysis)?,
            )?;
        }
        self.print_selection();
        Ok(())
    }

    fn report_preview(&self) -> Result<()> {
        if let Some(path) = self.refresh_preview()? {
            println!("Live preview: {}", path.display());
        }
        Ok(())
    }

    fn print_selection(&self) {
        let Some(view) = self.studio.selection_view() else {
            return;
        };
        print!("{}", format_selection(&view, self.color));
        println!("Use /select <n> to open a blueprint in the editor.");
    }

    fn print_generate_hint(&self) {
        if self.studio.can_generate() {
            println!("Ready. Type /generate to analyze the photo.");
        } else if self.studio.topic().trim().is_empty() {
            println!("Set a video topic (plain text or /topic) to continue.");
        } else {
            println!("Load a photo with /image <path> to continue.");
        }
    }

    fn finish(mut self) -> Result<()> {
        let summary = self.studio.finish();
        self.refresh_preview()?;
        let path = self.out_dir.join("session.json");
        write_summary(&path, &summary, None)?;
        println!("Session summary written to {}", path.display());
        Ok(())
    }
}

fn point_arg(intent: &Intent, key: &str) -> Result<Point> {
    let coords = intent
        .command_args
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("missing drag point '{key}'"))?;
    match coords.as_slice() {
        [x, y] => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Point::new(x, y)),
            _ => bail!("drag point '{key}' is not numeric"),
        },
        _ => bail!("drag point '{key}' needs two coordinates"),
    }
}

fn background_label(state: &BackgroundState) -> &'static str {
    match state {
        BackgroundState::Idle => "idle",
        BackgroundState::Pending => "pending",
        BackgroundState::Ready {
            placeholder: true, ..
        } => "placeholder",
        BackgroundState::Ready { .. } => "generated",
    }
}

fn format_selection(view: &SelectionView, color: bool) -> String {
    let mut out = format!("Critique: {}\n\n", view.critique);
    for (idx, card) in view.cards.iter().enumerate() {
        out.push_str(&format!("{}. {}\n\n", idx + 1, card.render_text(color)));
    }
    if !view.suggestions.is_empty() {
        out.push_str("Background ideas:\n");
        for suggestion in &view.suggestions {
            out.push_str(&format!("  - {suggestion}\n"));
        }
    }
    out
}

fn format_status(studio: &Studio) -> String {
    let mut lines = vec![
        format!("step: {}", studio.step()),
        format!("session: {}", studio.session_id()),
        format!(
            "topic: {}",
            if studio.topic().trim().is_empty() {
                "(none)"
            } else {
                studio.topic()
            }
        ),
        format!(
            "photo: {}",
            studio
                .image()
                .map(|image| format!("{}x{} {}", image.width(), image.height(), image.mime_type()))
                .unwrap_or_else(|| "(none)".to_string())
        ),
        format!(
            "template: {}",
            studio
                .selected_template()
                .map(|template| format!("{} ({})", template.name, template.layout_type))
                .unwrap_or_else(|| "(none)".to_string())
        ),
        format!("background: {}", background_label(studio.background())),
        format!("in flight: {}", studio.in_flight()),
    ];
    if let Some(editor) = studio.editor() {
        let transform = editor.transform();
        lines.push(format!("headline: {}", editor.headline()));
        lines.push(format!("highlight: {}", editor.highlight_word()));
        lines.push(format!(
            "subject: scale {:.1}, offset {:.0},{:.0}, background removed {}",
            transform.scale,
            transform.x,
            transform.y,
            editor.background_removed()
        ));
        lines.push(format!("display scale: {:.3}", editor.display_scale()));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn write_json_value(path: &Path, value: &Value) -> Result<()> {
    write_text(path, &format!("{}\n", serde_json::to_string_pretty(value)?))
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
