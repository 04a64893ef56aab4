// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};

use midiloop::config::LooperConfig;
use midiloop::control::{KeyboardController, LoopController, Outcome};
use midiloop::looper::LoopEngine;
use midiloop::midi::{
    print_destinations, print_sources, MidiInput, MidiOutput, MidirOutput, NullOutput, PortSelector,
};
use midiloop::session::SessionFile;
use midiloop::timing::FrameClock;
use midiloop::ui::{self, App, MidiActivityMessage, UiState, UiStatus};

const DEFAULT_SESSION: &str = "midiloop-session.yaml";

fn print_usage() {
    println!("MIDILOOP - Nine-slot MIDI loop recorder");
    println!();
    println!("Usage: midiloop [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <FILE>         Load a YAML configuration file");
    println!("  --input <N|NAME>        MIDI source to record from (index or name)");
    println!("  --output <N|NAME>       MIDI destination to play to (index or name)");
    println!("  --session <FILE>        Session file loaded at startup and written with 's'");
    println!("  --log <FILE>            Write logs to FILE");
    println!("  --frame-rate <MS>       Frame clock period in milliseconds (default 25)");
    println!("  --list-midi             List available MIDI destinations (outputs)");
    println!("  --list-sources          List available MIDI sources (inputs)");
    println!("  --help                  Show this help message");
}

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Options {
    config: Option<PathBuf>,
    input: Option<String>,
    output: Option<String>,
    session: Option<PathBuf>,
    log: Option<PathBuf>,
    frame_rate: Option<u64>,
}

#[derive(Debug, PartialEq)]
enum Mode {
    Run(Options),
    ListMidi,
    ListSources,
    Help,
}

fn parse_args(args: &[String]) -> Result<Mode> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", name))
        };

        match arg.as_str() {
            "--list-midi" => return Ok(Mode::ListMidi),
            "--list-sources" => return Ok(Mode::ListSources),
            "--help" | "-h" => return Ok(Mode::Help),
            "--config" => options.config = Some(value("--config")?.into()),
            "--input" => options.input = Some(value("--input")?),
            "--output" => options.output = Some(value("--output")?),
            "--session" => options.session = Some(value("--session")?.into()),
            "--log" => options.log = Some(value("--log")?.into()),
            "--frame-rate" => {
                let raw = value("--frame-rate")?;
                let ms = raw
                    .parse()
                    .map_err(|_| anyhow!("Invalid frame rate: {}", raw))?;
                options.frame_rate = Some(ms);
            }
            other => bail!("Unknown option: {}", other),
        }
    }

    Ok(Mode::Run(options))
}

/// Load the config file and apply command line overrides
fn build_config(options: &Options) -> Result<LooperConfig> {
    let mut config = match &options.config {
        Some(path) => LooperConfig::load(path)?,
        None => LooperConfig::default(),
    };

    if let Some(input) = &options.input {
        config.midi.input = Some(input.clone());
    }
    if let Some(output) = &options.output {
        config.midi.output = Some(output.clone());
    }
    if let Some(session) = &options.session {
        config.session = Some(session.clone());
    }
    if let Some(log) = &options.log {
        config.log_file = Some(log.clone());
    }
    if let Some(ms) = options.frame_rate {
        config.engine.frame_rate_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

/// Log to a file. Without one nothing is installed, so the terminal UI is
/// never written over.
fn init_file_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create log file: {:?}", path))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::INFO)
        .init();
}

fn connect_output(selector: Option<PortSelector>) -> Result<(Box<dyn MidiOutput>, Option<String>)> {
    match selector {
        Some(selector) => {
            let output = MidirOutput::connect(&selector)?;
            let name = output.port_name().to_string();
            Ok((Box::new(output), Some(name)))
        }
        None => Ok((Box::new(NullOutput), None)),
    }
}

fn session_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string())
}

fn save_session(engine: &mut LoopEngine, path: &Path) {
    let session = SessionFile::capture(session_name(path), engine);
    match session.save(path) {
        Ok(()) => {
            info!(path = ?path, loops = session.loops.len(), "session saved");
            engine.report(&format!("saved {} loops to {}", session.loops.len(), path.display()));
        }
        Err(e) => {
            warn!(error = %e, "session save failed");
            engine.report(&format!("save failed: {:#}", e));
        }
    }
}

async fn run(config: LooperConfig) -> Result<()> {
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let (midi_tx, mut midi_rx) = mpsc::unbounded_channel();
    let (key_tx, mut key_rx) = mpsc::unbounded_channel();

    let (output, output_port) = connect_output(config.midi.output_selector())?;
    let input = match config.midi.input_selector() {
        Some(selector) => Some(MidiInput::connect(&selector, midi_tx)?),
        None => None,
    };

    let mut keyboard = KeyboardController::with_defaults();
    keyboard.apply_overrides(&config.keyboard)?;

    let session_path = config
        .session
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION));

    let state = Arc::new(Mutex::new(UiState {
        input_port: input.as_ref().map(|i| i.port_name().to_string()),
        output_port,
        session: Some(session_path.display().to_string()),
        ..UiState::default()
    }));

    let clock = FrameClock::new(config.engine.frame_rate(), tick_tx);
    let mut engine = LoopEngine::new(clock, output, Box::new(UiStatus::new(state.clone())));
    let mut controller = LoopController::new();

    if session_path.exists() {
        match SessionFile::load(&session_path).and_then(|s| s.restore(&mut engine)) {
            Ok(()) => engine.report(&format!("loaded {}", session_path.display())),
            Err(e) => {
                warn!(error = %e, "session load failed");
                engine.report(&format!("load failed: {:#}", e));
            }
        }
    }
    if input.is_none() {
        engine.report("no MIDI input selected (use --input)");
    }

    let mut app = App::new(state.clone(), ui::help_entries(&keyboard))?;
    app.set_frame_rate(config.ui.fps);
    let _keys = ui::spawn_key_reader(key_tx);
    let mut redraw = tokio::time::interval(app.redraw_period());

    info!(
        frame_rate_ms = config.engine.frame_rate_ms,
        session = %session_path.display(),
        "midiloop started"
    );

    loop {
        tokio::select! {
            Some(tick) = tick_rx.recv() => {
                engine.on_tick(tick);
            }
            Some(event) = midi_rx.recv() => {
                let armed = engine.state().armed;
                let recorded = engine.handle_midi(&event.bytes);
                let target = armed.filter(|_| recorded).map(|id| id.get());
                if let Some(message) = MidiActivityMessage::from_bytes(&event.bytes, target) {
                    if let Ok(mut state) = state.lock() {
                        state.midi_activity.add(message);
                    }
                }
            }
            Some(key) = key_rx.recv() => {
                let Some(action) = keyboard.process_key(key.code, key.modifiers) else {
                    continue;
                };
                match controller.resolve(action) {
                    Outcome::Nothing => {}
                    Outcome::Engine(command) => engine.execute(command),
                    Outcome::Save => save_session(&mut engine, &session_path),
                    Outcome::ToggleHelp => app.toggle_help(),
                    Outcome::Quit => break,
                }
            }
            _ = redraw.tick() => {
                if let Ok(mut state) = state.lock() {
                    state.sync(&engine, &controller);
                }
                app.draw()?;
            }
        }
    }

    info!("midiloop stopped");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let options = match parse_args(&args) {
        Ok(Mode::Run(options)) => options,
        Ok(Mode::ListMidi) => {
            init_stderr_logging();
            print_destinations();
            return Ok(());
        }
        Ok(Mode::ListSources) => {
            init_stderr_logging();
            print_sources();
            return Ok(());
        }
        Ok(Mode::Help) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let config = build_config(&options)?;
    if let Some(path) = &config.log_file {
        init_file_logging(path)?;
    }

    run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("midiloop")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_run_options() {
        let mode = parse_args(&args(&[
            "--input", "1", "--output", "IAC", "--frame-rate", "20", "--session", "jam.yaml",
        ]))
        .unwrap();

        let Mode::Run(options) = mode else {
            panic!("expected run mode");
        };
        assert_eq!(options.input.as_deref(), Some("1"));
        assert_eq!(options.output.as_deref(), Some("IAC"));
        assert_eq!(options.frame_rate, Some(20));
        assert_eq!(options.session, Some(PathBuf::from("jam.yaml")));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_args(&args(&["--list-midi"])).unwrap(), Mode::ListMidi);
        assert_eq!(parse_args(&args(&["--list-sources"])).unwrap(), Mode::ListSources);
        assert_eq!(parse_args(&args(&["-h"])).unwrap(), Mode::Help);
        assert_eq!(parse_args(&args(&[])).unwrap(), Mode::Run(Options::default()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--input"])).is_err());
        assert!(parse_args(&args(&["--frame-rate", "fast"])).is_err());
        assert!(parse_args(&args(&["--tempo", "120"])).is_err());
    }

    #[test]
    fn test_build_config_overrides() {
        let options = Options {
            frame_rate: Some(10),
            output: Some("2".to_string()),
            ..Options::default()
        };
        let config = build_config(&options).unwrap();
        assert_eq!(config.engine.frame_rate_ms, 10);
        assert_eq!(config.midi.output_selector(), Some(PortSelector::Index(2)));

        let options = Options {
            frame_rate: Some(0),
            ..Options::default()
        };
        assert!(build_config(&options).is_err());
    }

    #[test]
    fn test_session_name() {
        assert_eq!(session_name(Path::new("sets/jam.yaml")), "jam");
    }
}
