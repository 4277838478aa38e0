//! ILI9486 Panel Simulator
//!
//! Runs the display driver on the host against a recording SPI bus and a
//! virtual panel, to inspect setup traffic, update windows and register reads
//! without hardware.
//!
//! # Usage
//!
//! ```bash
//! # List supported controller models
//! panel-sim models list
//!
//! # Show a model's geometry and decoded init table
//! panel-sim models show tft35
//!
//! # Write and check a panel configuration file
//! panel-sim config generate -o panel.toml
//! panel-sim config validate panel.toml
//!
//! # Draw a pattern and run five update ticks, dumping the bus traffic
//! panel-sim run -c panel.toml --pattern checker --frames 5 --dump
//!
//! # Read byte 1 of the display power mode register
//! panel-sim read --command 0x0a --index 1
//! ```

mod config;
mod patterns;
mod recorder;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ili9486_spi_display::display::ili9486::{ControllerModel, InitCommands};
use ili9486_spi_display::{ControlPins, Flush, Ili9486, Model, Rotation};

use config::PanelFile;
use patterns::Pattern;
use recorder::{Line, RecordingBus, SimDelay, SimPin, Transaction};

type SimDisplay = Ili9486<RecordingBus, SimPin, SimDelay, SimPin, SimPin>;

/// ILI9486 Panel Simulator
///
/// Host-side harness for the ILI9486 display driver
#[derive(Parser)]
#[command(name = "panel-sim")]
#[command(version = "0.1.0")]
#[command(about = "Simulate the ILI9486 display driver against a recording SPI bus")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Controller model operations
    #[command(subcommand)]
    Models(ModelCommands),

    /// Panel configuration files
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Set up the display, draw a pattern and run update ticks
    Run {
        /// Panel configuration file (default: built-in defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pattern drawn before the first tick
        #[arg(short, long, value_enum, default_value = "checker")]
        pattern: Pattern,

        /// Number of update ticks; a marker moves between ticks
        #[arg(short, long, default_value_t = 3)]
        frames: u32,

        /// Hex dump every transaction
        #[arg(long)]
        dump: bool,
    },

    /// Run the diagnostic register read after setup
    Read {
        /// Panel configuration file (default: built-in defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read command, decimal or 0x-prefixed hex
        #[arg(long, default_value = "0x09", value_parser = parse_byte)]
        command: u8,

        /// Response byte to return
        #[arg(short, long, default_value_t = 0)]
        index: u8,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List all supported models
    List,

    /// Show geometry, rotations and the init table of a model
    Show {
        /// Model key (e.g., tft35)
        model: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default panel configuration
    Generate {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a panel configuration file
    Validate {
        path: PathBuf,
    },
}

fn parse_byte(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid byte {:?}: {}", value, e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Models(cmd) => handle_models(cmd),
        Commands::Config(cmd) => handle_config(cmd),
        Commands::Run {
            config,
            pattern,
            frames,
            dump,
        } => handle_run(config.as_deref(), pattern, frames, dump),
        Commands::Read {
            config,
            command,
            index,
        } => handle_read(config.as_deref(), command, index),
    }
}

fn handle_models(cmd: ModelCommands) -> Result<()> {
    match cmd {
        ModelCommands::List => {
            println!("{}", "=".repeat(60));
            println!("{}", "Supported Controller Models".cyan().bold());
            println!("{}", "=".repeat(60));

            for model in Model::ALL {
                let controller = model.controller();
                let (w, h) = controller.native_size();
                println!("\n  {}: {}", model.key().white().bold(), controller.name());
                println!("    Native size: {}x{}", w, h);
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} to see the init table",
                "panel-sim models show <model>".cyan()
            );
        }

        ModelCommands::Show { model } => {
            let model = Model::from_key(&model).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown model: {}. Use 'panel-sim models list' to see available models.",
                    model
                )
            })?;
            print_model(model.controller());
        }
    }

    Ok(())
}

fn print_model(controller: &dyn ControllerModel) {
    println!("{}", "=".repeat(70));
    println!("{}", format!("Model: {}", controller.name()).cyan().bold());
    println!("{}", "=".repeat(70));

    println!("\n{}", "Rotations:".white().bold());
    for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
        let (w, h) = controller.size(rotation);
        println!(
            "  {:>3}°  {}x{}  MADCTL {:#04x}",
            rotation.degrees(),
            w,
            h,
            controller.madctl(rotation)
        );
    }

    println!("\n{}", "Init Sequence:".white().bold());
    for entry in InitCommands::new(controller.init_sequence()) {
        let wait = if entry.delay_ms > 0 {
            format!(" (+{} ms)", entry.delay_ms).yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:#04x} {}{}",
            entry.command,
            format!("{:02x?}", entry.args).dimmed(),
            wait
        );
    }
    println!(
        "  Inversion: {}",
        if controller.inverted() { "on" } else { "off" }
    );

    println!("\n{}", "=".repeat(70));
}

fn handle_config(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Generate { output } => {
            let file = PanelFile::default();
            match output {
                Some(path) => {
                    file.save(&path)?;
                    println!("{} Wrote {}", "[OK]".green().bold(), path.display());
                }
                None => print!("{}", file.to_toml()?),
            }
        }

        ConfigCommands::Validate { path } => {
            let file = PanelFile::load(&path)?;
            println!("{} {} is valid", "[OK]".green().bold(), path.display());

            let display = file.display_config();
            println!(
                "  {} {}x{}, {:?}, {} bytes of frame buffer",
                display.model.controller().name(),
                display.model.controller().size(display.rotation).0,
                display.model.controller().size(display.rotation).1,
                display.color_mode,
                display.buffer_length()
            );
            for warning in file.warnings() {
                println!("{} {}", "[WARN]".yellow().bold(), warning);
            }
        }
    }

    Ok(())
}

/// Bus, pins and session wired together per the panel file
fn build_display(file: &PanelFile) -> (SimDisplay, RecordingBus) {
    let config = file.display_config();
    let (width, height) = config.model.controller().size(config.rotation);
    let bus = RecordingBus::new(width, height);
    let pins = ControlPins::with_pins(
        bus.pin(Line::Dc),
        file.pins.reset.map(|_| bus.pin(Line::Reset)),
        file.pins.backlight.map(|_| bus.pin(Line::Backlight)),
    );
    let display = Ili9486::new(bus.clone(), pins, SimDelay::default(), config);
    (display, bus)
}

fn setup(file: &PanelFile) -> Result<(SimDisplay, RecordingBus)> {
    let (mut display, bus) = build_display(file);
    display.setup().context("display setup failed")?;
    bus.resize_panel(display.width(), display.height());

    let traffic = bus.take_transactions();
    let stats = RecordingBus::stats(&traffic);
    println!(
        "{} setup: {} commands, {} bytes, {} ms of waits",
        "[OK]".green().bold(),
        stats.commands,
        stats.total_bytes(),
        display.delay().elapsed_ms()
    );
    Ok((display, bus))
}

fn handle_run(config: Option<&Path>, pattern: Pattern, frames: u32, dump: bool) -> Result<()> {
    let file = PanelFile::load_or_default(config)?;
    let (mut display, bus) = setup(&file)?;

    pattern
        .draw(&mut display)
        .unwrap_or_else(|never| match never {});

    println!("{}", "=".repeat(70));
    println!(
        "{}",
        format!("{:?} on {}x{}, {} ticks", pattern, display.width(), display.height(), frames)
            .cyan()
            .bold()
    );
    println!("{}", "=".repeat(70));

    for frame in 0..frames {
        if frame > 0 {
            patterns::move_marker(&mut display, frame).unwrap_or_else(|never| match never {});
        }
        let flush = display.update();
        let traffic = bus.take_transactions();
        let stats = RecordingBus::stats(&traffic);

        match flush {
            Ok(Flush::Skipped) => println!("  tick {:>3}: {}", frame, "idle".dimmed()),
            Ok(Flush::Sent { rect, pixels }) => println!(
                "  tick {:>3}: {}x{} at ({}, {}), {} px, {} bytes in {} transactions",
                frame,
                rect.w,
                rect.h,
                rect.x,
                rect.y,
                pixels,
                stats.total_bytes(),
                stats.transactions
            ),
            Err(err) => println!("  tick {:>3}: {} {}", frame, "[ERROR]".red().bold(), err),
        }

        if dump {
            dump_traffic(&traffic);
        }
    }

    let mismatches = compare_panel(&display, &bus);
    if mismatches == 0 {
        println!("\n{} panel memory matches the frame buffer", "[OK]".green().bold());
    } else {
        println!(
            "\n{} {} pixels differ between panel and frame buffer",
            "[FAIL]".red().bold(),
            mismatches
        );
    }
    println!(
        "  Frame buffer: {} bytes ({:?})",
        display.buffer_length(),
        display.config().color_mode
    );

    Ok(())
}

/// Pixels whose panel memory differs from the buffer's wire format
fn compare_panel(display: &SimDisplay, bus: &RecordingBus) -> usize {
    let panel = bus.panel();
    let buffer = display.buffer();
    let mut mismatches = 0;
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let expected = buffer.wire_pixel(x, y).map(|px| px.0);
            if panel.pixel(x, y) != expected {
                mismatches += 1;
            }
        }
    }
    mismatches
}

fn dump_traffic(traffic: &[Transaction]) {
    for t in traffic {
        let phase = if t.data { "DATA".blue() } else { "CMD ".magenta() };
        println!("    {} {} bytes", phase, t.bytes.len());
        for line in hexdump::hexdump_iter(&t.bytes) {
            println!("      {}", (&*line).dimmed());
        }
    }
}

fn handle_read(config: Option<&Path>, command: u8, index: u8) -> Result<()> {
    let file = PanelFile::load_or_default(config)?;
    let (mut display, bus) = setup(&file)?;

    let value = display
        .read_command(command, index)
        .with_context(|| format!("read of {:#04x} failed", command))?;

    println!(
        "{} {:#04x}[{}] = {:#04x} ({:#010b})",
        "[READ]".cyan().bold(),
        command,
        index,
        value,
        value
    );
    let panel = bus.panel();
    println!(
        "  Panel: display {}, inversion {}, MADCTL {:#04x}, backlight {}",
        if panel.is_display_on() { "on" } else { "off" },
        if panel.is_inverted() { "on" } else { "off" },
        panel.madctl(),
        if bus.backlight() { "on" } else { "off" }
    );
    dump_traffic(&bus.take_transactions());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ili9486_spi_display::display::ili9486::cmd;
    use ili9486_spi_display::Color;

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x0A"), Ok(0x0A));
        assert_eq!(parse_byte("9"), Ok(9));
        assert!(parse_byte("0x100").is_err());
    }

    #[test]
    fn test_updates_reach_panel_memory() {
        let (mut display, bus) = setup(&PanelFile::default()).unwrap();
        Pattern::Border.draw(&mut display).unwrap();
        display.draw_pixel(100, 100, Color::RED);
        display.update().unwrap();
        assert_eq!(compare_panel(&display, &bus), 0);
        assert_eq!(bus.panel().pixel(100, 100), Some(0xF800));
    }

    #[test]
    fn test_second_tick_sends_only_marker() {
        let (mut display, bus) = setup(&PanelFile::default()).unwrap();
        patterns::move_marker(&mut display, 0).unwrap();
        display.update().unwrap();
        bus.take_transactions();

        patterns::move_marker(&mut display, 1).unwrap();
        let flush = display.update().unwrap();
        // old marker at x 0..8 erased, new one drawn at 8..16
        assert!(matches!(flush, Flush::Sent { pixels: 128, .. }));
        assert_eq!(compare_panel(&display, &bus), 0);
    }

    #[test]
    fn test_register_read_reports_power_mode() {
        let (mut display, _bus) = setup(&PanelFile::default()).unwrap();
        assert_eq!(display.read_command(cmd::RDMODE, 1).unwrap(), 0x9C);
        assert_eq!(display.read_command(cmd::RDMADCTL, 1).unwrap(), 0x28);
    }

    #[test]
    fn test_rgb332_run_matches_panel() {
        let mut file = PanelFile::default();
        file.display.color_mode = ili9486_spi_display::ColorMode::Rgb332;
        let (mut display, bus) = setup(&file).unwrap();
        Pattern::Gradient.draw(&mut display).unwrap();
        display.update().unwrap();
        assert_eq!(compare_panel(&display, &bus), 0);
    }
}
