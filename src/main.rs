//! microtask-promise - CLI

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use microtask_promise::runtime::promise::{Realm, SynchronousInspectable};
use microtask_promise::runtime::scheduler::{EventLoop, MicrotaskQueue, TaskError};
use microtask_promise::runtime::value::{Function, Value};
use microtask_promise::util::config::{resolve_config, save_config, RuntimeConfig};
use microtask_promise::util::logger::{self, LogLevel};
use microtask_promise::{new_runtime, NAME, VERSION};

/// Promises on an explicit microtask queue
#[derive(Parser, Debug)]
#[command(name = "microtask-promise")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in scenarios
    Demo {
        /// Scenario to run (all of them when omitted)
        #[arg(value_enum, value_name = "SCENARIO")]
        scenario: Option<Scenario>,
    },

    /// Drain a long chain of self-scheduling tasks
    Stress {
        /// Number of tasks
        #[arg(long, default_value_t = 100_000)]
        tasks: usize,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to this file
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    Ordering,
    Chain,
    All,
    Race,
    Finally,
    Tracking,
}

impl Scenario {
    const EVERY: [Scenario; 6] = [
        Scenario::Ordering,
        Scenario::Chain,
        Scenario::All,
        Scenario::Race,
        Scenario::Finally,
        Scenario::Tracking,
    ];
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = resolve_config(args.config.as_deref()).context("Failed to load configuration")?;
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log.level
    };
    logger::init_with_level(level);

    match args.command {
        Commands::Demo { scenario } => {
            let selected = match scenario {
                Some(scenario) => vec![scenario],
                None => Scenario::EVERY.to_vec(),
            };
            for scenario in selected {
                run_scenario(scenario, &config)
                    .with_context(|| format!("Scenario {:?} failed", scenario))?;
            }
        }
        Commands::Stress { tasks } => {
            stress(tasks, &config).context("Stress run failed")?;
        }
        Commands::Config { write } => {
            print!("{}", config.to_toml_string()?);
            if let Some(path) = write {
                save_config(&path, &config)
                    .with_context(|| format!("Failed to write: {}", path.display()))?;
            }
        }
    }

    Ok(())
}

/// `TaskError` holds `Rc` values and cannot cross into `anyhow` directly.
fn uncaught(err: TaskError) -> anyhow::Error {
    anyhow!("{}", err)
}

fn log_fn(
    log: &Rc<RefCell<Vec<String>>>,
    label: &'static str,
) -> Function {
    let log = log.clone();
    Function::new(move |value| {
        log.borrow_mut().push(format!("{}: {}", label, value));
        Ok(value)
    })
}

fn run_scenario(
    scenario: Scenario,
    config: &RuntimeConfig,
) -> Result<()> {
    let (mut event_loop, realm) = new_runtime(config);
    let log = Rc::new(RefCell::new(Vec::new()));

    match scenario {
        Scenario::Ordering => {
            let settled = realm.resolve("settled");
            settled.then(Some(log_fn(&log, "first")), None);
            settled.then(Some(log_fn(&log, "second")), None);
            log.borrow_mut().push("synchronous code done".to_string());
        }
        Scenario::Chain => {
            realm
                .resolve(1)
                .then(Some(Function::new(|v| Ok(Value::from(v.as_number().unwrap_or(0.0) + 1.0)))), None)
                .then(Some(Function::new(|_| Err(Value::error("boom")))), None)
                .then(Some(log_fn(&log, "skipped")), None)
                .catch(log_fn(&log, "caught"));
        }
        Scenario::All => {
            let deferred = realm.promise(|functions| {
                functions.resolve("later");
                Ok(())
            });
            realm
                .all(vec![Value::from(1), Value::Promise(deferred), Value::from("plain")])
                .then(Some(log_fn(&log, "all")), None);
        }
        Scenario::Race => {
            let slow = realm.resolve("slow").then(None, None).then(None, None);
            let fast = realm.resolve("fast");
            realm
                .race(vec![Value::Promise(slow), Value::Promise(fast)])
                .then(Some(log_fn(&log, "race")), None);
        }
        Scenario::Finally => {
            let cleanup = log.clone();
            realm
                .reject(Value::error("original"))
                .finally(move || {
                    cleanup.borrow_mut().push("cleanup ran".to_string());
                    Ok(Value::Undefined)
                })
                .catch(log_fn(&log, "still rejected"));
        }
        Scenario::Tracking => return tracking_scenario(config),
    }

    event_loop.run_until_idle().map_err(uncaught)?;
    for line in log.borrow().iter() {
        info!("[{:?}] {}", scenario, line);
    }
    Ok(())
}

fn tracking_scenario(config: &RuntimeConfig) -> Result<()> {
    let mut promise_config = config.promise.clone();
    promise_config.track_rejections = true;

    let mut event_loop = EventLoop::with_config(&config.queue);
    let realm = Realm::with_config(event_loop.queue().clone(), &promise_config);

    let handled = realm.inspectable(|functions| {
        functions.reject(Value::error("handled"));
        Ok(())
    });
    handled.catch(Function::new(|_| Ok(Value::Undefined)));
    realm.reject(Value::error("forgotten"));

    event_loop.run_until_idle().map_err(uncaught)?;

    info!("[Tracking] handled promise is rejected: {}", handled.is_rejected());
    let reports = realm
        .rejection_tracker()
        .map(|tracker| tracker.reports())
        .unwrap_or_default();
    for report in reports {
        info!("[Tracking] unhandled {}: {}", report.promise, report.reason);
    }
    Ok(())
}

fn schedule(
    queue: MicrotaskQueue,
    remaining: usize,
    peak: Rc<Cell<usize>>,
) {
    if remaining == 0 {
        return;
    }
    let next = queue.clone();
    queue.enqueue(move || {
        peak.set(peak.get().max(next.slots()));
        schedule(next, remaining - 1, peak);
        Ok(())
    });
}

fn stress(
    tasks: usize,
    config: &RuntimeConfig,
) -> Result<()> {
    let mut event_loop = EventLoop::with_config(&config.queue);
    let queue = event_loop.queue().clone();
    let peak = Rc::new(Cell::new(0));

    schedule(queue.clone(), tasks, peak.clone());
    let turns = event_loop.run_until_idle().map_err(uncaught)?;

    info!(
        "ran {} tasks in {} turn(s); capacity {}, peak slots held {}",
        tasks,
        turns,
        queue.capacity(),
        peak.get()
    );
    Ok(())
}
