use super::*;
use clap::CommandFactory;

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_transcribe_args() {
    let cli = Cli::try_parse_from([
        "vtctl",
        "--url",
        "http://gpu-box:8001",
        "transcribe",
        "clip.wav",
        "-l",
        "de",
        "--task",
        "translate",
        "--json",
    ])
    .unwrap();

    assert_eq!(cli.url, "http://gpu-box:8001");
    match cli.command {
        Commands::Transcribe {
            file,
            language,
            task,
            json,
        } => {
            assert_eq!(file, PathBuf::from("clip.wav"));
            assert_eq!(language.as_deref(), Some("de"));
            assert_eq!(task.as_deref(), Some("translate"));
            assert!(json);
        }
        other => panic!("Expected transcribe, got {:?}", other),
    }
}

#[test]
fn test_url_after_subcommand() {
    let cli = Cli::try_parse_from(["vtctl", "health", "--url", "http://localhost:9000"]).unwrap();

    assert_eq!(cli.url, "http://localhost:9000");
    assert!(matches!(cli.command, Commands::Health));
}

#[test]
fn test_download_defaults_are_unset() {
    let cli = Cli::try_parse_from(["vtctl", "download"]).unwrap();

    match cli.command {
        Commands::Download {
            model,
            compute_type,
            models_dir,
        } => {
            assert!(model.is_none());
            assert!(compute_type.is_none());
            assert!(models_dir.is_none());
        }
        other => panic!("Expected download, got {:?}", other),
    }
}

#[test]
fn test_transcribe_requires_file() {
    assert!(Cli::try_parse_from(["vtctl", "transcribe"]).is_err());
}
