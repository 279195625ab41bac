use std::path::{Path, PathBuf};

use clap::Parser;

use cinegen::cli::{self, Args, Command, GenerateArgs};
use cinegen::config::Config;
use cinegen::form::{FormState, Submission};
use cinegen::media::MediaAsset;
use cinegen::playback::{self, PlaybackPlan};
use cinegen::prompt::assemble_prompt;
use cinegen::recorder::{Recording, StopSignal, VoiceRecorder};
use cinegen::studio::{GenerationResult, Studio};
use cinegen::veo::{self, TokioClock, VeoClient, VeoError, API_KEY_ENV};

/// Build the API client from the environment and config.
fn create_client(cfg: &Config) -> Result<VeoClient, String> {
    let api_key = veo::api_key_from_env().ok_or_else(|| {
        format!(
            "{API_KEY_ENV} environment variable is not set.\n\n\
            Add your API key to a .env file:\n\
                echo '{API_KEY_ENV}=your-api-key-here' >> .env\n\n\
            Or set it as an environment variable:\n\
                export {API_KEY_ENV}=\"your-api-key-here\"\n\n\
            Get your API key at: https://aistudio.google.com/apikey"
        )
    })?;

    VeoClient::with_base_url(api_key, cfg.api.base_url.clone())
        .map(|client| {
            client
                .with_video_model(cfg.api.video_model.clone())
                .with_analysis_model(cfg.api.analysis_model.clone())
        })
        .map_err(|e| match e {
            VeoError::MissingApiKey => format!("{API_KEY_ENV} is empty"),
            _ => format!("Failed to create API client: {}", e),
        })
}

fn create_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create async runtime: {}", e))
}

/// Record a voice clip, stopping at the limit or on Ctrl+C.
async fn record_voice(cfg: &Config, dir: &Path) -> Result<Recording, String> {
    let recorder = VoiceRecorder::new(cfg.recording.recorder_config());
    let stop = StopSignal::ctrlc().unwrap_or_else(|e| {
        log::warn!("Could not set up Ctrl+C handler: {}", e);
        StopSignal::new()
    });

    println!(
        "Recording for up to {}s. Press Ctrl+C to stop.",
        recorder.config().max_duration.as_secs()
    );
    let recording = recorder
        .record(dir, &stop)
        .await
        .map_err(|e| e.to_string())?;
    println!(
        "Recorded {:.1}s: {}",
        recording.elapsed.as_secs_f64(),
        recording.path.display()
    );
    Ok(recording)
}

/// Run the generate command
fn run_generate(args: &GenerateArgs, cfg: &Config) -> Result<(), String> {
    let mut form = cli::build_form(args).map_err(|e| e.to_string())?;
    // Nothing is recorded or sent for an empty form.
    form.validate().map_err(|e| e.to_string())?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| cfg.output.resolved_dir());
    let client = create_client(cfg)?;
    let rt = create_runtime()?;

    let result = rt.block_on(async {
        if args.record && form.will_analyze() {
            log::warn!("Image analysis ignores audio, skipping voice recording");
        } else if args.record {
            let recording = record_voice(cfg, &output_dir).await?;
            form.audio.file = Some(recording.path);
        }

        let submission = form.submission().map_err(|e| e.to_string())?;
        let studio = Studio::new(client, TokioClock, output_dir.clone())
            .with_poll_config(cfg.polling.poll_config())
            .with_sound_effects_dir(cfg.playback.sound_effects_dir.clone());

        if matches!(submission, Submission::Analyze { .. }) {
            print!("Analyzing image... ");
            std::io::Write::flush(&mut std::io::stdout()).ok();
        }
        let params = studio.resolve(submission).await.map_err(|e| {
            println!("failed");
            e.to_string()
        })?;
        if form.will_analyze() {
            println!("done");
            println!("  Prompt: {}", params.prompt);
            println!("  Mood: {}  Style: {}", params.mood, params.style);
        }

        studio
            .generate(&params, cli::print_progress)
            .await
            .map_err(|e| e.to_string())
    })?;

    println!();
    println!("Video ready!");
    println!("  Path: {}", result.video_path.display());
    println!(
        "  Manifest: {}",
        GenerationResult::manifest_path(&result.video_path).display()
    );

    if args.play {
        play_result(&result, cfg)?;
    }
    Ok(())
}

/// Run the prompt command (dry run)
fn run_prompt(args: &GenerateArgs) -> Result<(), String> {
    let form: FormState = cli::build_form(args).map_err(|e| e.to_string())?;
    match form.submission().map_err(|e| e.to_string())? {
        Submission::Manual(params) => {
            println!("{}", assemble_prompt(&params));
            Ok(())
        }
        Submission::Analyze { .. } => {
            Err("The prompt for --analyze is written by the analysis model; run `cinegen analyze <image>` to preview it".to_string())
        }
    }
}

/// Run the analyze command
fn run_analyze(image: &Path, cfg: &Config) -> Result<(), String> {
    let asset = MediaAsset::load_image(image).map_err(|e| e.to_string())?;
    let client = create_client(cfg)?;
    let rt = create_runtime()?;

    let analyzed = rt
        .block_on(client.analyze_image(&asset))
        .map_err(|e| e.to_string())?;

    let json = serde_json::to_string_pretty(&analyzed)
        .map_err(|e| format!("Failed to format analysis: {}", e))?;
    println!("{}", json);
    Ok(())
}

/// Run the record command
fn run_record(output: Option<PathBuf>, cfg: &Config) -> Result<(), String> {
    let dir = output.unwrap_or_else(|| cfg.output.resolved_dir());
    let rt = create_runtime()?;
    let recording = rt.block_on(record_voice(cfg, &dir))?;
    println!();
    println!("Use it with: cinegen generate --audio-file {}", recording.path.display());
    Ok(())
}

/// Run the play command
fn run_play(path: &Path, cfg: &Config) -> Result<(), String> {
    let manifest = if path.extension().is_some_and(|ext| ext == "json") {
        path.to_path_buf()
    } else {
        GenerationResult::manifest_path(path)
    };
    let result = GenerationResult::load(&manifest).map_err(|e| e.to_string())?;
    play_result(&result, cfg)
}

fn play_result(result: &GenerationResult, cfg: &Config) -> Result<(), String> {
    let plan = PlaybackPlan::from_result(result, &cfg.playback);
    playback::play(&plan).map_err(|e| e.to_string())?;
    Ok(())
}

/// Load .env file and check for the API key
///
/// Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    if veo::api_key_from_env().is_none() {
        log::warn!(
            "{} environment variable not set; generate and analyze will not work",
            API_KEY_ENV
        );
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));
}

/// Load the config file.
///
/// An explicit `--config` must load; problems with the default file fall
/// back to built-in defaults.
fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match Config::load(path) {
        Ok(cfg) => Ok(cfg),
        Err(e) if path.is_some() => Err(e.to_string()),
        Err(e) => {
            eprintln!("Warning: Failed to load config file: {}", e);
            eprintln!("Using default settings.\n");
            Ok(Config::default())
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    // Load .env file before anything touches the API
    load_env();

    let cfg = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::Generate(generate) => run_generate(&generate, &cfg),
        Command::Prompt(generate) => run_prompt(&generate),
        Command::Analyze { image } => run_analyze(&image, &cfg),
        Command::Record { output } => run_record(output, &cfg),
        Command::Play { manifest } => run_play(&manifest, &cfg),
        Command::Options { kind } => cli::list_options(kind.as_deref()),
        Command::Config { action } => {
            cli::handle_config_action(action, args.config.as_deref(), &cfg)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
