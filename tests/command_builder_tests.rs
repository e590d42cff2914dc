// Vite invocation assembly: env prefix, debug flags, executable and mode


use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use test_utils::{install_local_vite, project_with_lockfiles, RecordingRunner};
use vitepm::package_manager::{
    CommandBuilder, ExecutableResolution, PackageManagerKind, BUN_LOCKFILE, YARN_LOCKFILE,
};
use vitepm::{ConfigError, ConfigOptions, ProjectConfig, ViteConfig, VitePmError};

#[test]
fn test_empty_args_get_env_prefix_and_mode() {
    let project = project_with_lockfiles(&[]);
    let vite = install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "production");
    let builder = CommandBuilder::new(&config);

    let command = builder.command_for::<&str>(&[]).unwrap();
    let argv = command.clone().into_args().into_vec();

    assert_eq!(
        argv[0],
        config.mode_to_env_string(config.mode(), config.env())
    );
    assert_eq!(argv[1], vite.display().to_string());
    assert_eq!(&argv[argv.len() - 2..], &["--mode", "production"]);
    assert_eq!(argv.len(), 4);
    assert_eq!(
        command.executable(),
        &ExecutableResolution::Found(vite.clone())
    );
}

#[test]
fn test_inspect_rewritten_for_node() {
    let project = project_with_lockfiles(&[]);
    let vite = install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    let argv = builder
        .command_for(&["--inspect"])
        .unwrap()
        .into_args()
        .into_vec();

    assert_eq!(argv[1], "node");
    assert_eq!(argv[2], "--inspect-brk");
    assert_eq!(argv[3], vite.display().to_string());
    assert!(!argv.iter().any(|a| a == "--inspect"));
    assert_eq!(&argv[4..], &["--mode", "development"]);
}

#[test]
fn test_trace_deprecation_rewritten_for_node() {
    let project = project_with_lockfiles(&[YARN_LOCKFILE]);
    install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    let argv = builder
        .command_for(&["build", "--trace_deprecation", "--inspect"])
        .unwrap()
        .into_args()
        .into_vec();

    assert_eq!(&argv[1..3], &["node", "--inspect-brk"]);
    assert_eq!(argv[3], "--trace-deprecation");
    assert_eq!(argv[5], "build");
    assert!(!argv.iter().any(|a| a == "--trace_deprecation"));
}

#[test]
fn test_debug_flags_pass_through_on_bun() {
    let project = project_with_lockfiles(&[BUN_LOCKFILE]);
    let vite = install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    let argv = builder
        .command_for(&["--inspect", "--trace_deprecation"])
        .unwrap()
        .into_args()
        .into_vec();

    assert!(!argv.iter().any(|a| a == "node"));
    assert_eq!(argv[1], vite.display().to_string());
    assert_eq!(&argv[2..4], &["--inspect", "--trace_deprecation"]);
    assert!(!argv.iter().any(|a| a == "--inspect-brk"));
}

#[test]
fn test_explicit_mode_is_not_duplicated() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    for args in [vec!["--mode", "production"], vec!["build", "-m", "staging"]] {
        let argv = builder.command_for(args.as_slice()).unwrap().into_args().into_vec();
        let mode_flags = argv.iter().filter(|a| *a == "--mode" || *a == "-m").count();
        assert_eq!(mode_flags, 1, "unexpected argv {argv:?}");
        assert!(!argv.iter().any(|a| a == "development"));
        assert_eq!(argv.last().map(String::as_str), args.last().copied());
    }
}

#[test]
fn test_caller_args_are_not_mutated() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    let args = vec![
        "--inspect".to_string(),
        "build".to_string(),
        "--trace_deprecation".to_string(),
    ];
    let snapshot = args.clone();
    builder.command_for(args.as_slice()).unwrap();
    assert_eq!(args, snapshot);
}

#[test]
fn test_npm_bin_fallback_when_no_local_binary() {
    let project = project_with_lockfiles(&[]);
    let config = ViteConfig::new(project.path(), "development");
    let runner = Arc::new(RecordingRunner::succeeding("/app/node_modules/.bin  \n"));
    let builder = CommandBuilder::new(&config).with_runner(runner.clone());

    let command = builder.command_for(&["build"]).unwrap();
    assert_eq!(
        command.executable(),
        &ExecutableResolution::Found(PathBuf::from("/app/node_modules/.bin/vite"))
    );
    assert_eq!(
        &command.args()[1..],
        &["/app/node_modules/.bin/vite", "build", "--mode", "development"]
    );
    assert_eq!(runner.calls(), vec!["npm bin".to_string()]);
}

#[test]
fn test_local_binary_skips_npm_bin() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let runner = Arc::new(RecordingRunner::failing());
    let builder = CommandBuilder::new(&config).with_runner(runner.clone());

    assert!(builder.command_for(&["build"]).is_ok());
    assert!(runner.calls().is_empty());
}

#[test]
fn test_configured_bin_path_is_used() {
    let project = project_with_lockfiles(&[]);
    let custom = project.path().join("bin").join("vite");
    std::fs::create_dir_all(custom.parent().unwrap()).unwrap();
    std::fs::write(&custom, "").unwrap();
    let config = ViteConfig::new(project.path(), "test").with_vite_bin_path("bin/vite");

    let command = CommandBuilder::new(&config).command_for(&["dev"]).unwrap();
    assert_eq!(command.executable(), &ExecutableResolution::Found(custom));
}

#[test]
fn test_npm_bin_failure_propagates() {
    let project = project_with_lockfiles(&[]);
    let config = ViteConfig::new(project.path(), "development");
    let builder =
        CommandBuilder::new(&config).with_runner(Arc::new(RecordingRunner::failing()));

    let err = builder.command_for(&["build"]).unwrap_err();
    assert!(matches!(err, VitePmError::Process(_)));
}

#[test]
fn test_yarn_and_bun_without_local_binary_resolve_nothing() {
    for (lockfile, kind) in [
        (YARN_LOCKFILE, PackageManagerKind::Yarn),
        (BUN_LOCKFILE, PackageManagerKind::Bun),
    ] {
        let project = project_with_lockfiles(&[lockfile]);
        let config = ViteConfig::new(project.path(), "development");
        let runner = Arc::new(RecordingRunner::succeeding("/should/not/be/used\n"));
        let builder = CommandBuilder::new(&config).with_runner(runner.clone());

        let command = builder.command_for(&["build"]).unwrap();
        assert_eq!(command.executable(), &ExecutableResolution::NotFound);
        assert_eq!(command.package_manager(), kind);
        assert!(runner.calls().is_empty());
        assert_eq!(
            &command.args()[1..],
            &["build", "--mode", "development"]
        );

        match command.require_executable().unwrap_err() {
            VitePmError::Config(inner) => match *inner {
                ConfigError::ExecutableNotFound {
                    package_manager, ..
                } => assert_eq!(package_manager, kind.to_string()),
                other => panic!("Expected ExecutableNotFound, got {other:?}"),
            },
            other => panic!("Expected config error, got {other:?}"),
        }
    }
}

#[test]
fn test_env_assignment_carries_mode_and_env() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let mut env = BTreeMap::new();
    env.insert("VITE_API_URL".to_string(), "https://api.example.com".to_string());
    let config = ViteConfig::new(project.path(), "staging").with_env(env);

    let command = CommandBuilder::new(&config).command_for(&["build"]).unwrap();
    let assignment = command.env_assignment();
    assert!(assignment.contains("VITE_RUBY_MODE=staging"));
    assert!(assignment.contains("VITE_API_URL=https://api.example.com"));
}

#[test]
fn test_resolved_mode_drives_env_assignment_and_flag() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let mut vars = BTreeMap::new();
    vars.insert("VITE_RUBY_MODE".to_string(), "development".to_string());
    vars.insert("VITE_RUBY_ROOT".to_string(), "/somewhere/else".to_string());
    vars.insert("VITE_ASSET_HOST".to_string(), "cdn".to_string());

    let config = ViteConfig::resolve_with_vars(
        ConfigOptions {
            root: Some(project.path().to_path_buf()),
            mode: Some("production".to_string()),
            config_file: None,
        },
        &vars,
    )
    .unwrap();

    let command = CommandBuilder::new(&config).command_for(&["build"]).unwrap();
    let root = project.path().display().to_string();
    assert_eq!(command.env()["VITE_RUBY_MODE"], "production");
    assert_eq!(command.env()["VITE_RUBY_ROOT"], root);
    assert_eq!(command.env()["VITE_ASSET_HOST"], "cdn");

    let assignment = command.env_assignment();
    assert!(assignment.contains("VITE_RUBY_MODE=production"));
    assert!(!assignment.contains("VITE_RUBY_MODE=development"));
    assert!(!assignment.contains("/somewhere/else"));
    assert_eq!(&command.args()[command.args().len() - 2..], &["--mode", "production"]);
}

#[test]
fn test_shell_line_quotes_env_values() {
    let project = project_with_lockfiles(&[]);
    let vite = install_local_vite(project.path());
    let mut env = BTreeMap::new();
    env.insert("VITE_TITLE".to_string(), "My App; rm -rf x".to_string());
    let config = ViteConfig::new(project.path(), "production").with_env(env);

    let line = CommandBuilder::new(&config)
        .command_for(&["build"])
        .unwrap()
        .to_shell_line();

    assert!(line.contains("VITE_TITLE='My App; rm -rf x'"));
    assert!(line.contains("VITE_RUBY_MODE=production"));
    assert!(line.ends_with(&format!("{} build --mode production", vite.display())));
}

#[test]
fn test_command_for_is_idempotent() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    let first = builder.command_for(&["build", "--inspect"]).unwrap();
    let second = builder.command_for(&["build", "--inspect"]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_builder_is_shareable_across_threads() {
    let project = project_with_lockfiles(&[]);
    install_local_vite(project.path());
    let config = ViteConfig::new(project.path(), "development");
    let builder = CommandBuilder::new(&config);

    let results: Vec<Vec<String>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| builder.command_for(&["build"]).unwrap().into_args().into_vec()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}
