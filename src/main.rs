use braingym::{
    app::{App, AppAction, AppState},
    app_dirs::AppDirs,
    arena::Arena,
    config::{ConfigStore, FileConfigStore},
    difficulty::{StroopMode, Tier, MAX_GRID_LEVEL},
    game::GameType,
    runtime::{ChannelEventSource, FixedTicker, Runner, TerminalBell},
    stats::{export_csv, export_json, import_json, StatsDb},
    trial::{ContentType, MemoryMode},
    ui::screen::current_screen,
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin, BufReader, BufWriter},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const TICK_RATE_MS: u64 = 100;

/// terminal brain training: schulte grids, stroop, sequence memory and auditory attention
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Four short cognitive training games in the terminal, with adaptive difficulty and a local history of every session."
)]
pub struct Cli {
    /// jump straight into a game instead of the menu
    #[clap(short = 'g', long, value_enum)]
    game: Option<GameType>,

    /// log debug output to the log file
    #[clap(short = 'v', long)]
    verbose: bool,

    /// turn sound cues on
    #[clap(long, conflicts_with = "mute")]
    sound: bool,

    /// turn sound cues off
    #[clap(long)]
    mute: bool,

    /// schulte start level, 1 (3x3) to 8 (10x10)
    #[clap(short = 'l', long, value_parser = clap::value_parser!(u8).range(1..=8))]
    level: Option<u8>,

    /// keep going through every larger schulte grid
    #[clap(long)]
    marathon: bool,

    /// use letters instead of numbers in the schulte grid
    #[clap(long)]
    letters: bool,

    /// stroop mode: name the ink (classic) or the word (reverse)
    #[clap(long, value_enum)]
    stroop_mode: Option<StroopMode>,

    /// stroop questions per session
    #[clap(short = 'q', long, value_parser = clap::value_parser!(u32).range(1..=200))]
    questions: Option<u32>,

    /// stroop seconds per question, 0 for unlimited
    #[clap(short = 't', long)]
    time_limit: Option<u32>,

    /// stroop palette size
    #[clap(long, value_enum)]
    tier: Option<Tier>,

    /// sequence memory presentation
    #[clap(short = 'm', long, value_enum)]
    memory_mode: Option<MemoryMode>,

    /// seed for reproducible layouts and sequences
    #[clap(long)]
    seed: Option<u64>,

    /// write every record to a JSON file and exit
    #[clap(long, value_name = "PATH")]
    export_json: Option<PathBuf>,

    /// merge records from a JSON export and exit
    #[clap(long, value_name = "PATH")]
    import_json: Option<PathBuf>,

    /// write the records of --game to a CSV file and exit
    #[clap(long, value_name = "PATH", requires = "game")]
    export_csv: Option<PathBuf>,
}

impl Cli {
    /// Fold command line overrides into the stored config. Returns true when
    /// something changed.
    fn apply_to(&self, cfg: &mut braingym::config::Config) -> bool {
        let before = cfg.clone();
        if self.sound {
            cfg.sound_enabled = true;
        }
        if self.mute {
            cfg.sound_enabled = false;
        }
        if let Some(level) = self.level {
            cfg.schulte_level = (level as usize - 1).min(MAX_GRID_LEVEL);
        }
        if self.marathon {
            cfg.schulte_marathon = true;
        }
        if self.letters {
            cfg.schulte_content = ContentType::Letter;
        }
        if let Some(mode) = self.stroop_mode {
            cfg.stroop_mode = mode;
        }
        if let Some(q) = self.questions {
            cfg.stroop_questions = q;
        }
        if let Some(t) = self.time_limit {
            cfg.stroop_time_limit = t;
        }
        if let Some(tier) = self.tier {
            cfg.stroop_tier = tier;
        }
        if let Some(mode) = self.memory_mode {
            cfg.memory_mode = mode;
        }
        *cfg != before
    }

    fn wants_transfer(&self) -> bool {
        self.export_json.is_some() || self.import_json.is_some() || self.export_csv.is_some()
    }
}

fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let Some(path) = AppDirs::log_path() else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Import/export without touching the terminal.
fn transfer(cli: &Cli, db: &mut StatsDb) -> Result<(), Box<dyn Error>> {
    if let Some(path) = &cli.import_json {
        let n = import_json(db, BufReader::new(File::open(path)?))?;
        println!("imported {n} records from {}", path.display());
    }
    if let Some(path) = &cli.export_json {
        let n = export_json(&*db, BufWriter::new(File::create(path)?))?;
        println!("exported {n} records to {}", path.display());
    }
    if let (Some(path), Some(game)) = (&cli.export_csv, cli.game) {
        let n = export_csv(&*db, game, BufWriter::new(File::create(path)?))?;
        println!("exported {n} {game} records to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut db = StatsDb::new()?;
    if cli.wants_transfer() {
        return transfer(&cli, &mut db);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    if cli.apply_to(&mut config) {
        if let Err(e) = store.save(&config) {
            tracing::warn!("could not save config: {}", e);
        }
    }
    info!(?config, "starting");

    let arena = Arena::new(Box::new(db)).with_hooks(Box::new(TerminalBell::new(io::stdout())));
    let mut app = App::new(arena, config).with_config_store(Box::new(store));
    if let Some(seed) = cli.seed {
        app = app.with_seed(seed);
    }
    if let Some(game) = cli.game {
        if let Err(e) = app.start_game(game) {
            tracing::warn!(%game, "could not start: {}", e);
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        ChannelEventSource::crossterm(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| {
            let screen = current_screen(&app.state);
            screen.render(app, f);
        })?;

        let (event, elapsed) = runner.step();
        if app.on_event(event, elapsed) == AppAction::Quit {
            break;
        }
    }

    if app.state == AppState::Playing {
        app.stop_game();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use braingym::config::Config;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["braingym"]);

        assert_eq!(cli.game, None);
        assert!(!cli.verbose);
        assert_eq!(cli.level, None);
        assert_eq!(cli.seed, None);
        assert!(!cli.wants_transfer());
    }

    #[test]
    fn test_cli_game_accepts_short_names() {
        let cli = Cli::parse_from(["braingym", "-g", "stroop"]);
        assert_eq!(cli.game, Some(GameType::Interference));

        let cli = Cli::parse_from(["braingym", "--game", "sequence-memory"]);
        assert_eq!(cli.game, Some(GameType::SequenceMemory));
    }

    #[test]
    fn test_cli_level_range() {
        let cli = Cli::parse_from(["braingym", "-l", "8"]);
        assert_eq!(cli.level, Some(8));

        assert!(Cli::try_parse_from(["braingym", "-l", "0"]).is_err());
        assert!(Cli::try_parse_from(["braingym", "-l", "9"]).is_err());
    }

    #[test]
    fn test_cli_sound_flags_conflict() {
        assert!(Cli::try_parse_from(["braingym", "--sound", "--mute"]).is_err());
    }

    #[test]
    fn test_cli_csv_export_needs_game() {
        assert!(Cli::try_parse_from(["braingym", "--export-csv", "out.csv"]).is_err());
        let cli = Cli::parse_from(["braingym", "--export-csv", "out.csv", "-g", "memory"]);
        assert!(cli.wants_transfer());
    }

    #[test]
    fn test_overrides_change_config() {
        let cli = Cli::parse_from([
            "braingym",
            "--mute",
            "-l",
            "3",
            "--letters",
            "--stroop-mode",
            "reverse",
            "-q",
            "10",
            "-t",
            "0",
            "--tier",
            "hard",
            "-m",
            "digit",
        ]);
        let mut cfg = Config::default();
        assert!(cli.apply_to(&mut cfg));
        assert!(!cfg.sound_enabled);
        assert_eq!(cfg.schulte_level, 2);
        assert_eq!(cfg.schulte_content, ContentType::Letter);
        assert_eq!(cfg.stroop_mode, StroopMode::Reverse);
        assert_eq!(cfg.stroop_questions, 10);
        assert_eq!(cfg.stroop_time_limit, 0);
        assert_eq!(cfg.stroop_tier, Tier::Hard);
        assert_eq!(cfg.memory_mode, MemoryMode::Digit);
    }

    #[test]
    fn test_no_overrides_leave_config_alone() {
        let cli = Cli::parse_from(["braingym", "--seed", "7"]);
        let mut cfg = Config::default();
        assert!(!cli.apply_to(&mut cfg));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }
}
