//! Integration tests for inhouse

mod engine;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const LOCAL_CONFIG: &str = r#"
[general]
event_log = false

[named.react]
source = "https://unpkg.com/react@18/umd/react.production.min.js"
"#;

    /// A project directory with a local config; paths are canonical so they
    /// match what the binary sees as its working directory
    struct Project {
        _dir: TempDir,
        root: PathBuf,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().canonicalize().unwrap();
            fs::write(root.join(".inhouse.toml"), LOCAL_CONFIG).unwrap();
            Self { _dir: dir, root }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn cache_file(&self, relative: &str) -> PathBuf {
            self.root.join("storage/app/public/inhouse").join(relative)
        }

        fn cmd(&self) -> Command {
            let mut cmd = inhouse();
            cmd.current_dir(&self.root)
                .env("INHOUSE_CONFIG", self.root.join("global.toml"))
                .env_remove("INHOUSE_DEV_MODE");
            cmd
        }
    }

    fn inhouse() -> Command {
        cargo_bin_cmd!("inhouse")
    }

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn help_displays() {
        inhouse()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("asset internalization"));
    }

    #[test]
    fn version_displays() {
        inhouse()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("inhouse"));
    }

    #[test]
    fn config_path_follows_flag() {
        let project = Project::new();
        project
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("global.toml"));
    }

    #[test]
    fn config_show_merges_local_file() {
        let project = Project::new();
        project
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("react@18"));
    }

    #[test]
    fn config_init_writes_global_file() {
        let project = Project::new();
        project.cmd().args(["config", "init"]).assert().success();
        assert!(project.root.join("global.toml").is_file());
    }

    #[test]
    fn list_empty() {
        let project = Project::new();
        project
            .cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached assets"));
    }

    #[test]
    fn named_lists_configured_assets() {
        let project = Project::new();
        project
            .cmd()
            .args(["named", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("react"));

        project
            .cmd()
            .args(["named", "--filter", "vue", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn internalize_local_file() {
        let project = Project::new();
        let source = project.write("resources/js/app.js", "let a = 1;");

        project
            .cmd()
            .args(["internalize", &path_str(&source)])
            .assert()
            .success()
            .stdout(predicate::str::contains("/storage/inhouse/resources/js/app.js"));

        assert_eq!(
            fs::read_to_string(project.cache_file("resources/js/app.js")).unwrap(),
            "let a = 1;"
        );

        project
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(path_str(&source)));
    }

    #[test]
    fn internalize_prints_tag() {
        let project = Project::new();
        let source = project.write("resources/css/site.css", "body{}");

        project
            .cmd()
            .args(["internalize", "--tag", &path_str(&source)])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"<link href="/storage/inhouse/resources/css/site.css" rel="stylesheet" type="text/css">"#,
            ));
    }

    #[test]
    fn internalize_missing_file_fails() {
        let project = Project::new();
        project
            .cmd()
            .args(["internalize", "not/a/real/path.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not/a/real/path.js"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn cache_scans_templates_and_clear_removes_them() {
        let project = Project::new();
        let source = project.write("resources/js/app.js", "let a = 1;");
        project.write(
            "resources/views/layout.blade.php",
            &format!(
                "<head>\n  @inhouse('{}')\n  @inhouse($theme . '/app.css')\n</head>\n",
                path_str(&source)
            ),
        );

        project
            .cmd()
            .arg("cache")
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 1 directive(s) in 1 template(s)"))
            .stdout(predicate::str::contains("not a literal"))
            .stdout(predicate::str::contains("Cached 1 asset(s)"));
        assert!(project.cache_file("resources/js/app.js").is_file());

        project.cmd().args(["clear", "--yes"]).assert().success();
        assert!(!project.cache_file("resources/js/app.js").exists());
        assert!(!project.root.join("storage/app/public/inhouse.map.json").exists());
    }

    #[test]
    fn clear_without_yes_keeps_cache() {
        let project = Project::new();
        let source = project.write("resources/js/app.js", "let a = 1;");
        project
            .cmd()
            .args(["internalize", &path_str(&source)])
            .assert()
            .success();

        project
            .cmd()
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing deleted"));
        assert!(project.cache_file("resources/js/app.js").is_file());
    }
}
