use clap::Parser;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use streetmap::config::{LabelConfig, RenderConfig, RenderSpec, DEFAULT_FONT_PATH};
use streetmap::location::Coordinate;
use streetmap::pipeline::Pipeline;

/// streetmap: dark road-network wallpapers
///
/// Geocodes a place, downloads its drivable streets from OpenStreetMap,
/// draws them gray-on-black and crops the result to 1920x1080.
///
/// Examples:
///   streetmap Athens
///   streetmap "Norman, Oklahoma" --radius 7
///   streetmap "48.8566, 2.3522" --aspect 21/9
///   streetmap default --format svg
///   streetmap            (prompts for every option)
#[derive(Parser)]
#[command(name = "streetmap", version, about, long_about = None)]
struct Cli {
    /// Place name, "lat, lon", or "default" (Athens). Omit to be prompted.
    #[arg(index = 1)]
    location: Option<String>,

    /// Radius in kilometres, or "default" (18 km).
    #[arg(long, short = 'r', default_value = "default", allow_hyphen_values = true)]
    radius: String,

    /// Render resolution in dots per inch, or "default" (750).
    #[arg(long, default_value = "default", allow_hyphen_values = true)]
    dpi: String,

    /// Target aspect ratio: 1.7778, 16/9 or 16:9, or "default".
    #[arg(long, short = 'a', default_value = "default", allow_hyphen_values = true)]
    aspect: String,

    /// Output format: png or svg. Anything else becomes png.
    #[arg(long, short = 'f', default_value = "png")]
    format: String,

    /// Do not draw the location label.
    #[arg(long)]
    no_label: bool,

    /// TrueType font for the label.
    #[arg(long, default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,

    /// Working directory for map.<format> and the transient cache.
    #[arg(long, short = 'o', value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Offline mode: only use the geocode cache and the default location.
    #[arg(long)]
    offline: bool,

    /// Leave the .cache directory in place after the run.
    #[arg(long)]
    keep_cache: bool,
}

fn main() {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "streetmap=info".into()))
        .init();

    let cli = Cli::parse();
    let config = build_config(cli);

    let mut pipeline = Pipeline::new(&config);
    let report = pipeline.run(&config, ask_for_name).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    eprintln!("  {}", report.location.display_line());
    for warning in &report.warnings {
        eprintln!("  warning: {}", warning);
    }

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: cannot serialize report: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_config(cli: Cli) -> RenderConfig {
    // No location on the command line: interactive mode, every option prompted.
    let (query, radius, dpi, aspect, format) = match cli.location {
        Some(location) => (location, cli.radius, cli.dpi, cli.aspect, cli.format),
        None => (
            prompt("Location (place name, \"lat, lon\" or default)"),
            prompt("Radius in km (default 18)"),
            prompt("DPI (default 750)"),
            prompt("Aspect ratio (default 16/9)"),
            prompt("Output format png|svg (default png)"),
        ),
    };

    RenderConfig {
        query,
        spec: RenderSpec::from_inputs(&radius, &dpi, &aspect, &format),
        label: LabelConfig {
            enabled: !cli.no_label,
            font_path: cli.font,
        },
        work_dir: cli.output_dir,
        offline: cli.offline,
        keep_cache: cli.keep_cache,
    }
}

/// Read one line from stdin. EOF or errors count as "default".
fn prompt(label: &str) -> String {
    eprint!("{}: ", label);
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => "default".to_string(),
        Ok(_) => line.trim().to_string(),
    }
}

fn ask_for_name(coordinate: Coordinate) -> Option<String> {
    if !io::stdin().is_terminal() {
        return None;
    }
    let name = prompt(&format!(
        "No place name found for {}. Label text (blank for coordinates)",
        coordinate
    ));
    if name.is_empty() || name == "default" {
        None
    } else {
        Some(name)
    }
}
