use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use courseware_core::model::{CourseId, Position, SectionId, SequenceId, UnitId};
use courseware_core::navigation::{
    Destination, ExamSession, ExamStatus, LoadOutcome, NavRequest, Outcome,
};
use provider::{CourseStructureProvider, HttpProvider, HttpProviderConfig, JsonFileProvider};
use services::courseware::{OutlineView, ResumeAction};
use services::{CoursewareSession, Route, RouteMode, Router, TracingAnalytics, ViewerState};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Settings, load_settings};

#[derive(Parser, Debug)]
#[command(name = "courseware", about = "Inspect and walk course navigation")]
struct Cli {
    /// Config file (defaults to ./courseware.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Course-blocks JSON file, or a directory of `<course id>.json` files.
    #[arg(long, global = true)]
    course_file: Option<PathBuf>,
    /// Base url of the course structure API.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Log filter, e.g. `debug` or `services=debug`.
    #[arg(long, global = true)]
    log: Option<String>,
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the course outline.
    Outline {
        course_id: String,
        #[arg(long)]
        sequence: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        expand_all: bool,
        /// Toggle a section open/closed (repeatable).
        #[arg(long = "toggle")]
        toggles: Vec<String>,
    },
    /// Apply navigation steps and print where each one lands.
    Walk {
        course_id: String,
        #[arg(long)]
        sequence: Option<String>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long, value_enum, default_value_t = ExamArg::Inactive)]
        exam: ExamArg,
        #[arg(long)]
        no_proctoring: bool,
        /// `next`, `prev`, `jump:<sequence>`, `unit:<unit>` or `exam-passed`.
        steps: Vec<Step>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExamArg {
    Inactive,
    Active,
    Completed,
}

impl From<ExamArg> for ExamStatus {
    fn from(value: ExamArg) -> Self {
        match value {
            ExamArg::Inactive => ExamStatus::Inactive,
            ExamArg::Active => ExamStatus::Active,
            ExamArg::Completed => ExamStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Navigate(NavRequest),
    ExamPassed,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "next" => return Ok(Step::Navigate(NavRequest::Next)),
            "prev" | "previous" => return Ok(Step::Navigate(NavRequest::Previous)),
            "exam-passed" => return Ok(Step::ExamPassed),
            _ => {}
        }
        match raw.split_once(':') {
            Some(("jump", id)) if !id.is_empty() => {
                Ok(Step::Navigate(NavRequest::Jump(SequenceId::new(id))))
            }
            Some(("unit", id)) if !id.is_empty() => {
                Ok(Step::Navigate(NavRequest::SelectUnit(UnitId::new(id))))
            }
            _ => Err(format!(
                "unknown step `{raw}`; expected next, prev, jump:<id>, unit:<id> or exam-passed"
            )),
        }
    }
}

/// Prints every route change instead of touching a browser history.
struct StdoutRouter;

impl Router for StdoutRouter {
    fn navigate(&self, route: &Route, mode: RouteMode) {
        let verb = match mode {
            RouteMode::Push => "push",
            RouteMode::Replace => "replace",
        };
        println!("  -> {verb} {}", route.path());
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_provider(settings: &Settings) -> anyhow::Result<Arc<dyn CourseStructureProvider>> {
    if let Some(path) = &settings.course_file {
        info!(path = %path.display(), "using course file provider");
        return Ok(Arc::new(JsonFileProvider::open(path.clone())));
    }
    if let Some(url) = &settings.api_url {
        let config = HttpProviderConfig::new(url, settings.api_token.clone())
            .context("invalid course structure api url")?;
        info!(%url, "using http provider");
        return Ok(Arc::new(HttpProvider::new(config)));
    }
    bail!("no course source configured; pass --course-file or --api-url");
}

fn entry(sequence: Option<String>, unit: Option<String>) -> Position {
    Position {
        sequence_id: sequence.map(SequenceId::new),
        unit_id: unit.map(UnitId::new),
    }
}

async fn open(
    session: &mut CoursewareSession,
    course_id: String,
    entry: Position,
) -> anyhow::Result<()> {
    let course_id = CourseId::new(course_id);
    session.open(course_id.clone(), entry);
    match session.settle().await {
        Some(LoadOutcome::Failed(reason)) => {
            bail!("cannot load course {course_id}: {}", reason.code())
        }
        Some(_) => Ok(()),
        None => bail!("course {course_id} did not finish loading"),
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outline(view: &OutlineView) {
    println!("{}", view.course_title);
    if let Some(card) = &view.resume {
        let label = match card.action {
            ResumeAction::Start => "Start course",
            ResumeAction::Resume => "Resume course",
        };
        println!("[{label}] {}", card.route.path());
    }
    let toggle = if view.expand_all_active {
        "Collapse all"
    } else {
        "Expand all"
    };
    println!("[{toggle}]");

    for section in &view.sections {
        let marker = if section.open { "v" } else { ">" };
        let done = if section.complete { " (complete)" } else { "" };
        println!("{marker} {}{done}", section.title);
        if !section.open {
            continue;
        }
        for sequence in &section.sequences {
            let current = if sequence.is_current { "*" } else { " " };
            let check = if sequence.complete { "[x]" } else { "[ ]" };
            let link = sequence
                .link
                .as_ref()
                .map(|route| format!("  {}", route.path()))
                .unwrap_or_default();
            let lock = sequence
                .blocked
                .map(|reason| format!("  ({})", reason.code()))
                .unwrap_or_default();
            println!("  {current}{check} {}{link}{lock}", sequence.title);
        }
    }
}

fn describe(viewer: &ViewerState) -> String {
    match viewer {
        ViewerState::Loading { sequence_id } => format!("loading {sequence_id}"),
        ViewerState::NoContent => "no content".into(),
        ViewerState::Failed(reason) => format!("failed: {}", reason.code()),
        ViewerState::Notice {
            sequence_id,
            reason,
            prereq_section_name,
            ..
        } => match prereq_section_name {
            Some(name) => format!("{sequence_id}: {} (complete {name} first)", reason.code()),
            None => format!("{sequence_id}: {}", reason.code()),
        },
        ViewerState::Content {
            sequence_id,
            unit_id,
            unit_index,
            unit_count,
            ..
        } => {
            let unit = unit_id.as_ref().map_or("-", UnitId::as_str);
            let tab = unit_index.map_or(0, |index| index + 1);
            format!("{sequence_id} / {unit} ({tab} of {unit_count})")
        }
    }
}

fn run_outline(
    session: &mut CoursewareSession,
    expand_all: bool,
    toggles: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    if expand_all {
        session.toggle_expand_all()?;
    }
    for section in toggles {
        session.toggle_section(&SectionId::new(section))?;
    }
    let view = session.outline()?;
    if json {
        print_json(&view)
    } else {
        print_outline(&view);
        Ok(())
    }
}

async fn run_walk(
    session: &mut CoursewareSession,
    steps: Vec<Step>,
    json: bool,
) -> anyhow::Result<()> {
    println!("start: {}", describe(&session.viewer()));
    for step in steps {
        let request = match step {
            Step::ExamPassed => {
                session.entrance_exam_passed();
                session.settle().await;
                println!("exam-passed: {}", describe(&session.viewer()));
                continue;
            }
            Step::Navigate(request) => request,
        };
        let label = format!("{request:?}");
        match session.navigate(request) {
            Outcome::Navigated {
                destination: Destination::CourseExit,
                ..
            } => {
                println!("{label}: end of course");
                break;
            }
            Outcome::Navigated { destination, .. } => {
                if let Some(position) = destination.position() {
                    session.route_changed(position);
                }
                println!("{label}: {}", describe(&session.viewer()));
            }
            Outcome::Blocked {
                sequence_id,
                reason,
            } => println!("{label}: blocked at {sequence_id} ({})", reason.code()),
            Outcome::Deferred => println!("{label}: deferred"),
            Outcome::NoOp(reason) => println!("{label}: nothing to do ({reason:?})"),
        }
        if json {
            print_json(&session.viewer())?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(path) = cli.course_file {
        settings.course_file = Some(path);
    }
    if let Some(url) = cli.api_url {
        settings.api_url = Some(url);
    }
    if let Some(log) = cli.log {
        settings.log = log;
    }
    init_tracing(&settings.log);

    let provider = build_provider(&settings)?;
    let mut session =
        CoursewareSession::new(provider, Arc::new(StdoutRouter), Arc::new(TracingAnalytics));

    match cli.command {
        Command::Outline {
            course_id,
            sequence,
            unit,
            expand_all,
            toggles,
        } => {
            open(&mut session, course_id, entry(sequence, unit)).await?;
            run_outline(&mut session, expand_all, toggles, cli.json)
        }
        Command::Walk {
            course_id,
            sequence,
            unit,
            exam,
            no_proctoring,
            steps,
        } => {
            session.set_exam_session(ExamSession {
                status: exam.into(),
                can_access_proctored_exams: !no_proctoring,
            });
            open(&mut session, course_id, entry(sequence, unit)).await?;
            run_walk(&mut session, steps, cli.json).await
        }
    }
}
