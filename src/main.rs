use std::collections::VecDeque;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use pmemtest::catalog;
use pmemtest::config::TesterConfig;
use pmemtest::dispatch::spawn_worker;
use pmemtest::driver::TestResult;
use pmemtest::error::Error;
use pmemtest::input::{InputDecoder, InputEvent, PinLevels, PinSource};
use pmemtest::operator::{Operator, OperatorState};
use pmemtest::panel::{ConsolePanel, ConsolePower};
use pmemtest::sim::Fault;

#[derive(Parser)]
#[command(name = "pmemtest", about = "DRAM tester front panel, driven from a script")]
struct Cli {
    /// Part number from the device menu (e.g. 4164, "4116 half", 44256).
    #[arg(long, default_value = "4164")]
    chip: String,

    /// Speed grade index in the speed menu.
    #[arg(long, default_value_t = 0)]
    speed: usize,

    /// Variant index, for parts that have variants.
    #[arg(long, default_value_t = 0)]
    variant: usize,

    /// Defect to inject into the simulated chip: stuck0:L[@A], stuck1:L[@A],
    /// flip:A:L or leaky:MICROS. May be repeated.
    #[arg(long)]
    fault: Vec<Fault>,

    /// Press action again this many times from the results screen.
    #[arg(long, default_value_t = 0)]
    retests: usize,

    /// Refresh test retention delay in microseconds.
    #[arg(long)]
    retention_us: Option<u64>,

    /// Master seed for the pseudorandom streams.
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// A single operator gesture on the front panel.
#[derive(Debug, Clone, Copy)]
enum Gesture {
    Turn(InputEvent),
    Press(InputEvent),
}

/// Pin source that plays back gestures at the levels and durations the
/// decoder needs, then idles.
struct ScriptedPins {
    hold: u32,
    quiet: u32,
    runs: VecDeque<(PinLevels, u32)>,
}

impl ScriptedPins {
    fn new(config: &TesterConfig) -> Self {
        Self {
            hold: config.encoder_debounce,
            quiet: config.button_quiet,
            runs: VecDeque::new(),
        }
    }

    fn is_idle(&self) -> bool {
        self.runs.is_empty()
    }

    fn push(&mut self, gesture: Gesture) {
        const CLOCKWISE: [u8; 4] = [0b01, 0b11, 0b10, 0b00];
        let idle = PinLevels::default();
        match gesture {
            Gesture::Turn(dir) => {
                let mut phases = CLOCKWISE;
                if dir == InputEvent::Decrement {
                    phases = [0b10, 0b11, 0b01, 0b00];
                }
                for state in phases {
                    let levels = PinLevels {
                        quad_a: state & 1 != 0,
                        quad_b: state & 2 != 0,
                        ..idle
                    };
                    self.runs.push_back((levels, self.hold));
                }
            }
            Gesture::Press(button) => {
                let levels = match button {
                    InputEvent::Back => PinLevels {
                        back_btn: false,
                        ..idle
                    },
                    _ => PinLevels {
                        action_btn: false,
                        ..idle
                    },
                };
                self.runs.push_back((levels, 1));
                self.runs.push_back((idle, self.quiet + 1));
            }
        }
    }
}

impl PinSource for ScriptedPins {
    fn sample(&mut self) -> PinLevels {
        let Some((levels, left)) = self.runs.front_mut() else {
            return PinLevels::default();
        };
        let levels = *levels;
        *left -= 1;
        if *left == 0 {
            self.runs.pop_front();
        }
        levels
    }
}

/// Gestures from power-up to the start of the first test.
fn selection_script(chip: usize, speed: usize, variant: Option<usize>) -> Vec<Gesture> {
    let scroll = |n: usize| std::iter::repeat_n(Gesture::Turn(InputEvent::Increment), n);
    let action = Gesture::Press(InputEvent::Action);

    let mut script: Vec<Gesture> = scroll(chip).collect();
    script.push(action);
    if let Some(v) = variant {
        script.extend(scroll(v));
        script.push(action);
    }
    script.extend(scroll(speed));
    // Speed menu, then the socket prompt.
    script.push(action);
    script.push(action);
    script
}

fn check_index(what: &'static str, index: usize, len: usize) -> Result<(), Error> {
    if index < len {
        Ok(())
    } else {
        Err(Error::SelectionOutOfRange { what, index, len })
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let mut config = TesterConfig::default();
    if let Some(us) = cli.retention_us {
        config.retention_delay = Duration::from_micros(us);
    }
    if let Some(seed) = cli.seed {
        config.master_seed = seed;
    }

    let index = catalog::find(&cli.chip).context("selecting device")?;
    let info = catalog::CHIPS[index];
    check_index("speed grade", cli.speed, info.speed_grades.len())?;
    let variant = match info.variants {
        Some(names) => {
            check_index("variant", cli.variant, names.len())?;
            Some(cli.variant)
        }
        None => None,
    };

    let (dispatcher, worker) = spawn_worker(&config);
    let chips = catalog::simulated(Some(index), &cli.fault);
    let mut operator = Operator::new(
        config.clone(),
        chips,
        dispatcher,
        ConsolePanel::new(),
        ConsolePower::default(),
    );

    let mut pins = ScriptedPins::new(&config);
    for gesture in selection_script(index, cli.speed, variant) {
        pins.push(gesture);
    }

    let mut decoder = InputDecoder::new(&config);
    let mut events = Vec::new();
    let mut retests = cli.retests;
    let mut results: Vec<TestResult> = Vec::new();
    let mut was_testing = false;

    operator.start();
    loop {
        decoder.poll(pins.sample(), |e| events.push(e));
        for event in events.drain(..) {
            debug!("input {event:?}");
            operator.handle(event).context("handling input")?;
        }
        operator.poll_status().context("polling worker")?;

        let testing = operator.state() == OperatorState::Testing;
        if was_testing && !testing {
            let result = operator.last_result().unwrap_or(TestResult::FAILED);
            results.push(result);
            if retests > 0 {
                retests -= 1;
                pins.push(Gesture::Press(InputEvent::Action));
            } else {
                break;
            }
        }
        was_testing = testing;

        if testing {
            thread::yield_now();
        } else if pins.is_idle() {
            anyhow::bail!("script finished without reaching a test result");
        }
    }

    let panel = operator.panel();
    let verdict = if panel.detail().is_empty() {
        panel.headline()
    } else {
        panel.detail()
    };
    println!("{}: {}", info.name, verdict);
    print!("{}", panel.grid_ascii());

    drop(operator);
    if worker.join().is_err() {
        anyhow::bail!("worker thread panicked");
    }

    let failed = results.iter().filter(|r| !r.is_pass()).count();
    info!("{} run(s), {} failed", results.len(), failed);
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TesterConfig {
        TesterConfig {
            encoder_debounce: 3,
            button_quiet: 5,
            ..Default::default()
        }
    }

    fn decode(script: &[Gesture]) -> Vec<InputEvent> {
        let config = config();
        let mut pins = ScriptedPins::new(&config);
        for &g in script {
            pins.push(g);
        }
        let mut decoder = InputDecoder::new(&config);
        let mut events = Vec::new();
        while !pins.is_idle() {
            decoder.poll(pins.sample(), |e| events.push(e));
        }
        for _ in 0..10 {
            decoder.poll(pins.sample(), |e| events.push(e));
        }
        events
    }

    #[test]
    fn test_script_decodes_to_its_gestures() {
        use InputEvent::*;
        let script = [
            Gesture::Turn(Increment),
            Gesture::Turn(Increment),
            Gesture::Press(Action),
            Gesture::Turn(Decrement),
            Gesture::Press(Back),
            Gesture::Press(Action),
        ];
        assert_eq!(
            decode(&script),
            vec![Increment, Increment, Action, Decrement, Back, Action]
        );
    }

    #[test]
    fn test_selection_script_shape() {
        let s = selection_script(2, 1, Some(1));
        let presses = s.iter().filter(|g| matches!(g, Gesture::Press(_))).count();
        assert_eq!(s.len(), 2 + 1 + 1 + 1 + 1 + 2);
        assert_eq!(presses, 4);
        assert_eq!(selection_script(0, 0, None).len(), 3);
    }

    #[test]
    fn test_check_index() {
        assert!(check_index("speed grade", 1, 2).is_ok());
        assert_eq!(
            check_index("speed grade", 2, 2),
            Err(Error::SelectionOutOfRange {
                what: "speed grade",
                index: 2,
                len: 2
            })
        );
    }
}
