use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn storage_dir_prefers_flag_then_env_then_default() {
    assert_eq!(
        resolve_storage_dir(Some(PathBuf::from("/a")), Some("/b".to_string())),
        PathBuf::from("/a")
    );
    assert_eq!(
        resolve_storage_dir(None, Some("/b".to_string())),
        PathBuf::from("/b")
    );
    assert_eq!(
        resolve_storage_dir(None, None),
        PathBuf::from(DEFAULT_STORAGE_DIR)
    );
}

#[test]
fn parses_move_job_and_filters() {
    let cli = Cli::try_parse_from(["talentflow", "move-job", "abc", "3"]).expect("parse");
    assert!(matches!(
        cli.command,
        Command::MoveJob { ref id, index: 3 } if id == "abc"
    ));

    let cli = Cli::try_parse_from(["talentflow", "jobs", "--search", "eng", "--status", "Open"])
        .expect("parse");
    assert!(matches!(
        cli.command,
        Command::Jobs { ref search, status: Some(JobStatus::Open) } if search == "eng"
    ));
}

#[test]
fn rejects_unknown_stage() {
    assert!(Cli::try_parse_from(["talentflow", "stage", "c1", "interview"]).is_err());
    let cli = Cli::try_parse_from(["talentflow", "stage", "c1", "tech"]).expect("parse");
    assert!(matches!(cli.command, Command::Stage { stage: Stage::Tech, .. }));
}

#[test]
fn create_job_collects_repeated_tags() {
    let cli = Cli::try_parse_from([
        "talentflow",
        "create-job",
        "--title",
        "Staff Engineer",
        "--tag",
        "backend",
        "--tag",
        "devops",
    ])
    .expect("parse");
    match cli.command {
        Command::CreateJob { title, slug, tags } => {
            assert_eq!(title, "Staff Engineer");
            assert_eq!(slug, None);
            assert_eq!(tags, vec!["backend", "devops"]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn timestamps_render_as_rfc3339() {
    assert_eq!(commands::format_ms(0), "1970-01-01T00:00:00Z");
}
