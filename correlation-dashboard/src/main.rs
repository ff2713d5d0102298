use correlation_engine::{
    Dashboard, DashboardState, EngineConfig, EngineError, HttpCorrelationService, Ticker,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const HELP: &str = "commands: add <TICKER> | remove <TICKER> | select <TICKER> | \
deselect <TICKER> | all | none | cutoff <0..1> | inspect <A> <B> | clear | dismiss | show | quit";

/// Parsed stdin command
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Add(String),
    Remove(Ticker),
    Select(Ticker),
    Deselect(Ticker),
    SelectAll,
    DeselectAll,
    Cutoff(f64),
    Inspect(Ticker, Ticker),
    ClearInspection,
    Dismiss,
    Show,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "add" => Self::Add(words.collect::<Vec<_>>().join(" ")),
            "remove" | "rm" => Self::Remove(ticker_arg(&mut words)?),
            "select" => Self::Select(ticker_arg(&mut words)?),
            "deselect" => Self::Deselect(ticker_arg(&mut words)?),
            "all" => Self::SelectAll,
            "none" => Self::DeselectAll,
            "cutoff" => {
                let raw = words.next().unwrap_or_default();
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| format!("cutoff {raw:?} is not a number"))?;
                Self::Cutoff(value)
            }
            "inspect" => {
                let a = ticker_arg(&mut words)?;
                let b = ticker_arg(&mut words)?;
                Self::Inspect(a, b)
            }
            "clear" => Self::ClearInspection,
            "dismiss" => Self::Dismiss,
            "show" => Self::Show,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command {other:?}; {HELP}")),
        };

        Ok(Some(command))
    }
}

fn ticker_arg<'a, Words>(words: &mut Words) -> Result<Ticker, String>
where
    Words: Iterator<Item = &'a str>,
{
    Ticker::parse(words.next().unwrap_or_default()).map_err(|error| error.to_string())
}

enum Event {
    Line(std::io::Result<Option<String>>),
    Outcome,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };

    let service = match HttpCorrelationService::new(&config) {
        Ok(service) => service,
        Err(error) => {
            error!(%error, "failed to build correlation service client");
            std::process::exit(1);
        }
    };

    info!(base_url = %service.base_url(), "correlation service configured");
    info!("{HELP}");

    let mut dashboard = Dashboard::start(service, &config);
    emit(dashboard.state());

    let mut lines: Lines<BufReader<Stdin>> = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line),
            _ = dashboard.poll_outcome(), if !dashboard.is_settled() => Event::Outcome,
        };

        match event {
            Event::Outcome => emit(dashboard.state()),
            Event::Line(Ok(Some(line))) => match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => {
                    run(&mut dashboard, command).await;
                    emit(dashboard.state());
                }
                Ok(None) => {}
                Err(message) => warn!("{message}"),
            },
            Event::Line(Ok(None)) => {
                // stdin closed, drain outstanding fetches before exiting
                dashboard.settle().await;
                emit(dashboard.state());
                break;
            }
            Event::Line(Err(error)) => {
                error!(%error, "failed to read stdin");
                break;
            }
        }
    }

    info!("correlation dashboard stopped");
}

async fn run(dashboard: &mut Dashboard<HttpCorrelationService>, command: Command) {
    let result: Result<(), EngineError> = match command {
        Command::Add(input) => dashboard
            .add_ticker(&input)
            .await
            .map(|ticker| info!(%ticker, "ticker added")),
        Command::Remove(ticker) => {
            dashboard.remove_ticker(ticker);
            Ok(())
        }
        Command::Select(ticker) => {
            dashboard.select(ticker);
            Ok(())
        }
        Command::Deselect(ticker) => {
            dashboard.deselect(ticker);
            Ok(())
        }
        Command::SelectAll => {
            dashboard.select_all();
            Ok(())
        }
        Command::DeselectAll => {
            dashboard.deselect_all();
            Ok(())
        }
        Command::Cutoff(value) => dashboard.set_cutoff(value),
        Command::Inspect(a, b) => {
            dashboard.inspect(a, b);
            Ok(())
        }
        Command::ClearInspection => {
            dashboard.clear_inspection();
            Ok(())
        }
        Command::Dismiss => {
            dashboard.dismiss_error();
            Ok(())
        }
        Command::Show | Command::Quit => Ok(()),
    };

    if let Err(error) = result {
        warn!(%error, surface = ?error.surface(), "command rejected");
    }
}

/// Write the current snapshot to stdout as a single JSON line.
fn emit(state: &DashboardState) {
    match serde_json::to_string(&state.view()) {
        Ok(json) => println!("{json}"),
        Err(error) => error!(%error, "failed to serialise dashboard snapshot"),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // LOG_FORMAT=json switches to structured output
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
