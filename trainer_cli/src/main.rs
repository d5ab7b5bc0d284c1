use clap::{Parser, Subcommand};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use trainer_core::plan::effective_exercise_at;
use trainer_core::*;

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Workout and mobility session timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// More log output on stderr (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List available presets
    Presets {
        /// Only this category (preMobility, workout, postMobility)
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },

    /// Print the steps a preset expands into
    Steps {
        /// Preset id
        preset: String,

        #[command(flatten)]
        selection: Selection,
    },

    /// Run a preset's session in the terminal
    Run {
        /// Preset id
        preset: String,

        #[command(flatten)]
        selection: Selection,

        /// Auto-complete (for testing) - finish every step without input
        #[arg(long)]
        auto_complete: bool,
    },

    /// Show the persisted session of one or every category
    Status {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,

        /// Print snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// Abandon the session of one or every category
    Reset {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },

    /// Control the global stopwatch
    Stopwatch {
        #[command(subcommand)]
        action: StopwatchAction,
    },
}

#[derive(clap::Args)]
struct Selection {
    /// Exercise id (workout category only)
    #[arg(long)]
    exercise: Option<String>,

    /// Plan day, 1-based
    #[arg(long, default_value_t = 1)]
    day: u32,

    /// Use the preset's day-plan programming
    #[arg(long)]
    plan: bool,
}

impl Selection {
    fn execution(&self) -> ExecutionType {
        if self.plan {
            ExecutionType::Plan
        } else {
            ExecutionType::Individual
        }
    }
}

#[derive(Subcommand)]
enum StopwatchAction {
    Start,
    Pause,
    Reset,
    Show,
}

fn parse_category(s: &str) -> std::result::Result<Category, String> {
    Category::parse(s).ok_or_else(|| {
        format!(
            "unknown category '{}' (expected preMobility, workout or postMobility)",
            s
        )
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = trainer_core::logging::level_for_verbosity(cli.verbose);
    trainer_core::logging::init_with_level(level);

    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    match cli.command {
        Commands::Presets { category } => cmd_presets(&config, category),
        Commands::Steps { preset, selection } => cmd_steps(&config, &preset, &selection),
        Commands::Run {
            preset,
            selection,
            auto_complete,
        } => cmd_run(&config, &preset, &selection, auto_complete),
        Commands::Status { category, json } => cmd_status(&config, category, json),
        Commands::Reset { category } => cmd_reset(&config, category),
        Commands::Stopwatch { action } => cmd_stopwatch(&config, action),
    }
}

// ============================================================================
// Setup helpers
// ============================================================================

fn load_library(config: &Config) -> Result<PresetLibrary> {
    let library = PresetLibrary::load(&config.presets_path())?;
    let problems = library.validate();
    if !problems.is_empty() {
        eprintln!("Preset validation errors:");
        for problem in problems {
            eprintln!("  - {}", problem);
        }
        return Err(Error::Config("Invalid preset library".into()));
    }
    Ok(library)
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let dir = config.state_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(Arc::new(FileStore::new(dir)))
}

fn open_engine(store: &Arc<dyn KeyValueStore>, category: Category) -> SessionEngine {
    SessionEngine::new(category, Arc::clone(store), Arc::new(SystemClock))
}

fn categories(category: Option<Category>) -> Vec<Category> {
    category.map(|c| vec![c]).unwrap_or_else(|| Category::ALL.to_vec())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_presets(config: &Config, category: Option<Category>) -> Result<()> {
    let library = load_library(config)?;

    for category in categories(category) {
        println!("{}:", category);
        let workouts = library.workouts_in(category);
        if workouts.is_empty() {
            println!("  (none)");
        }
        for workout in workouts {
            let plan = match workout.kind {
                WorkoutKind::Plan => format!(", {}-day plan", workout.repeat_count.max(1)),
                WorkoutKind::Individual => String::new(),
            };
            println!(
                "  {}  {} ({} exercises{})",
                workout.id,
                workout.name,
                workout.exercises.len(),
                plan
            );
        }
    }
    Ok(())
}

fn cmd_steps(config: &Config, preset: &str, selection: &Selection) -> Result<()> {
    let library = load_library(config)?;
    let workout = library.require(preset)?;

    let position = match &selection.exercise {
        Some(id) => workout
            .exercise_position(id)
            .ok_or_else(|| Error::NotFound(format!("exercise '{}'", id)))?,
        None => 0,
    };
    let execution = ExecutionType::for_workout(workout, selection.execution());
    let exercise = effective_exercise_at(workout, position, execution, selection.day);
    let steps = build_steps(workout, exercise.as_ref());

    println!("{} ({})", workout.name, workout.category);
    for (i, step) in steps.iter().enumerate() {
        let duration = step
            .duration_seconds
            .map(|s| format!(" [{}]", format_clock(u64::from(s))))
            .unwrap_or_default();
        println!(
            "{:>3}. {:<14} {}{}",
            i + 1,
            kind_name(step.kind),
            describe(step),
            duration
        );
    }
    Ok(())
}

fn cmd_run(
    config: &Config,
    preset: &str,
    selection: &Selection,
    auto_complete: bool,
) -> Result<()> {
    let library = load_library(config)?;
    let workout = library.require(preset)?.clone();
    let store = open_store(config)?;

    let engine = open_engine(&store, workout.category);
    if !engine.state().is_dormant() && !session_belongs_to(&engine, &workout) {
        eprintln!(
            "A {} session from another preset is in progress.",
            workout.category
        );
        eprintln!(
            "Finish it, or discard it with `trainer reset --category {}`.",
            workout.category
        );
    }
    let mut runner = WorkoutRunner::new(engine, workout, selection.execution(), selection.day)?;

    if runner.engine().state() == SessionState::Completed && !runner.next_exercise() {
        runner.engine_mut().full_reset();
    }
    if let Some(id) = &selection.exercise {
        runner.select_exercise(id)?;
    }
    if !runner.start() {
        println!("Resuming session in progress.");
    }

    if auto_complete {
        run_to_completion(&mut runner);
        return Ok(());
    }

    let tick = Duration::from_millis(config.engine.tick_interval_ms);
    drive_interactive(&mut runner, tick, preset)
}

fn run_to_completion(runner: &mut WorkoutRunner) {
    let mut view = View::new(Rc::new(Cell::new(false)));
    view.render(runner);

    loop {
        let engine = runner.engine_mut();
        match engine.state() {
            SessionState::Completed => {
                if !runner.next_exercise() {
                    break;
                }
            }
            SessionState::ActiveSet
                if engine.current_step().map(|s| s.kind) == Some(StepKind::AwaitUserDone) =>
            {
                engine.mark_done();
            }
            _ => {
                engine.skip();
            }
        }
        view.render(runner);
    }

    let snap = runner.engine().snapshot();
    println!(
        "\n✓ Session complete ({} total)",
        format_clock(snap.total_elapsed_seconds)
    );
}

fn drive_interactive(runner: &mut WorkoutRunner, tick: Duration, preset: &str) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for c in line.trim().chars() {
                if tx.send(c).is_err() {
                    return;
                }
            }
        }
    });

    print_controls();
    let live_open = Rc::new(Cell::new(false));
    let live = subscribe_live_line(runner.engine(), Rc::clone(&live_open));
    let mut view = View::new(Rc::clone(&live_open));
    view.render(runner);

    loop {
        match rx.recv_timeout(tick) {
            Ok(c) => {
                tracing::debug!("Command '{}'", c);
                let engine = runner.engine_mut();
                match c {
                    'd' => {
                        engine.mark_done();
                    }
                    'p' => {
                        engine.pause();
                    }
                    'r' => {
                        engine.resume();
                    }
                    's' => {
                        engine.skip();
                    }
                    'x' => engine.reset_current_step(),
                    'b' => {
                        runner.go_back();
                    }
                    'n' => {
                        if !runner.next_exercise() {
                            end_live_line(&live_open);
                            println!("No next exercise yet.");
                        }
                    }
                    'q' => break,
                    'R' => {
                        engine.full_reset();
                        live.unsubscribe();
                        end_live_line(&live_open);
                        println!("Session reset.");
                        return Ok(());
                    }
                    _ => {
                        end_live_line(&live_open);
                        print_controls();
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                runner.engine_mut().tick();
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        view.render(runner);
    }

    live.unsubscribe();
    runner.engine_mut().app_will_resign_active();
    end_live_line(&live_open);
    println!("Session saved. Resume with `trainer run {}`.", preset);
    io::stdout().flush()?;
    Ok(())
}

fn cmd_status(config: &Config, category: Option<Category>, json: bool) -> Result<()> {
    let store = open_store(config)?;

    for category in categories(category) {
        let mut engine = open_engine(&store, category);
        engine.app_became_active();
        let snap = engine.snapshot();

        if json {
            println!("{}", serde_json::to_string(&snap)?);
        } else {
            display_snapshot(category, &snap);
        }
    }
    Ok(())
}

fn cmd_reset(config: &Config, category: Option<Category>) -> Result<()> {
    let store = open_store(config)?;
    for category in categories(category) {
        open_engine(&store, category).full_reset();
        println!("✓ Reset {}", category);
    }
    Ok(())
}

fn cmd_stopwatch(config: &Config, action: StopwatchAction) -> Result<()> {
    let store = open_store(config)?;
    let mut timer = GlobalTimer::new(store, Arc::new(SystemClock));

    match action {
        StopwatchAction::Start => timer.start(),
        StopwatchAction::Pause => timer.pause(),
        StopwatchAction::Reset => timer.reset(),
        StopwatchAction::Show => {}
    }

    let snap = timer.snapshot();
    println!(
        "Stopwatch: {} {}",
        if snap.is_running { "running" } else { "paused" },
        format_clock(snap.elapsed_seconds)
    );
    Ok(())
}

// ============================================================================
// Display
// ============================================================================

/// Redraw the countdown line in place on every engine notification whose
/// whole seconds changed. `open` is set while that line awaits a newline.
fn subscribe_live_line(
    engine: &SessionEngine,
    open: Rc<Cell<bool>>,
) -> Subscription<EngineSnapshot> {
    let last = Cell::new(None);
    engine.subscribe(move |snap| {
        if snap.state.is_dormant() || snap.is_paused {
            return;
        }
        let key = (
            snap.step_index,
            snap.time_remaining_seconds,
            snap.total_elapsed_seconds,
        );
        if last.replace(Some(key)) == Some(key) {
            return;
        }
        print!("\r{}", live_line(snap));
        let _ = io::stdout().flush();
        open.set(true);
    })
}

fn live_line(snap: &EngineSnapshot) -> String {
    let remaining = snap
        .time_remaining_seconds
        .map(|s| format!("{} left • ", format_clock(u64::from(s))))
        .unwrap_or_default();
    format!(
        "  ⏱ {}step {} • total {}   ",
        remaining,
        format_clock(snap.step_elapsed_seconds),
        format_clock(snap.total_elapsed_seconds)
    )
}

fn end_live_line(open: &Cell<bool>) {
    if open.replace(false) {
        println!();
    }
}

/// Prints a line whenever the visible step changes
struct View {
    last: Option<(SessionState, usize, bool, usize)>,
    live_open: Rc<Cell<bool>>,
}

impl View {
    fn new(live_open: Rc<Cell<bool>>) -> Self {
        Self {
            last: None,
            live_open,
        }
    }

    fn render(&mut self, runner: &WorkoutRunner) {
        let snap = runner.engine().snapshot();
        let key = (snap.state, snap.step_index, snap.is_paused, snap.step_count);
        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);
        end_live_line(&self.live_open);

        if snap.is_paused {
            println!("  ⏸ Paused");
            return;
        }

        match (&snap.current_step, snap.state) {
            (Some(step), SessionState::Completed) | (Some(step), SessionState::Idle) => {
                println!("■ {}", step.label);
                if let Some(summary) = runner.up_next_summary() {
                    println!("  {} ('n' to continue)", summary);
                }
            }
            (Some(step), _) => {
                let remaining = snap
                    .time_remaining_seconds
                    .map(|s| format!(" [{}]", format_clock(u64::from(s))))
                    .unwrap_or_default();
                println!(
                    "[{}/{}] {}{}",
                    snap.step_index + 1,
                    snap.step_count,
                    describe(step),
                    remaining
                );
            }
            (None, _) => println!("■ {}", snap.state),
        }
    }
}

fn display_snapshot(category: Category, snap: &EngineSnapshot) {
    let paused = if snap.is_paused { " (paused)" } else { "" };
    println!("{}: {}{}", category, snap.state, paused);
    if snap.state == SessionState::Idle {
        return;
    }

    if let Some(step) = &snap.current_step {
        println!(
            "  Step {}/{}: {}",
            snap.step_index + 1,
            snap.step_count,
            describe(step)
        );
    }
    if let Some(remaining) = snap.time_remaining_seconds {
        println!("  Remaining: {}", format_clock(u64::from(remaining)));
    }
    println!(
        "  Elapsed: total {} • step {} • exercise {}",
        format_clock(snap.total_elapsed_seconds),
        format_clock(snap.step_elapsed_seconds),
        format_clock(snap.exercise_elapsed_seconds)
    );
    if let Some(next) = &snap.next_step {
        println!("  Next: {}", describe(next));
    }
}

fn describe(step: &SessionStep) -> String {
    if step.exercise_name.is_empty() || step.is_completed() {
        step.label.clone()
    } else {
        format!("{}: {}", step.exercise_name, step.label)
    }
}

fn kind_name(kind: StepKind) -> &'static str {
    match kind {
        StepKind::SetupTimer => "setup",
        StepKind::TimedActive => "timed",
        StepKind::AwaitUserDone => "await-done",
        StepKind::RestTimer => "rest",
        StepKind::Completed => "completed",
    }
}

fn format_clock(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds / 60) % 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn print_controls() {
    println!("─────────────────────────────────────────");
    println!("  d done   p pause   r resume   s skip");
    println!("  b back   x reset step   n next exercise");
    println!("  q quit (keeps session)   R full reset");
    println!("─────────────────────────────────────────");
}
