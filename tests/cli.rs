//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::fs;

    use assert_cmd::Command;
    use tempfile::TempDir;

    const PAGE: &str = "<html><head><title>Doc</title></head><body><p>Hello there</p></body></html>";

    fn cmd(dir: &TempDir) -> Command {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.current_dir(dir.path())
            .env("NO_COLOR", "1")
            .env_remove("INPAGE_CONFIG")
            .env_remove("INPAGE_PROVIDER")
            .env_remove("INPAGE_LOCAL_ENDPOINT_URL");
        cmd
    }

    #[test]
    fn init_config_writes_example() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        cmd(&dir)
            .arg("init-config")
            .arg(&path)
            .assert()
            .success();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# inpage-translator settings"));
        assert!(content.contains("INPAGE_PROVIDER"));
        assert!(content.contains("llama3.2"));
    }

    #[test]
    fn messages_print_one_response_per_line() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), PAGE).unwrap();

        let output = cmd(&dir)
            .args([
                "messages",
                "page.html",
                r#"{"action":"ping"}"#,
                r#"{"action":"removeTranslations"}"#,
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines, [r#"{"success":true}"#, r#"{"success":true,"count":0}"#]);
    }

    #[test]
    fn messages_write_document_when_asked() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), PAGE).unwrap();

        cmd(&dir)
            .args(["messages", "page.html", r#"{"action":"revertAll"}"#, "-o", "out.html"])
            .assert()
            .success();

        let written = fs::read_to_string(dir.path().join("out.html")).unwrap();
        assert!(written.contains("<p>Hello there</p>"));
    }

    #[test]
    fn page_keeps_original_text_when_backend_is_down() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), PAGE).unwrap();

        let output = cmd(&dir)
            .args([
                "page",
                "page.html",
                "--silent",
                "--provider",
                "local",
                "--endpoint",
                "http://127.0.0.1:9",
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(stdout.contains("<p>Hello there</p>"));
        assert!(!stdout.contains("inpage-translator-"));
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use std::fs;

    use assert_cmd::Command;
    use tempfile::TempDir;

    fn cmd(dir: &TempDir) -> Command {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.current_dir(dir.path())
            .env("NO_COLOR", "1")
            .env_remove("INPAGE_CONFIG")
            .env_remove("INPAGE_PROVIDER")
            .env_remove("INPAGE_LOCAL_ENDPOINT_URL");
        cmd
    }

    #[test]
    fn unknown_message_action() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), "<p>x</p>").unwrap();

        let output = cmd(&dir)
            .args(["messages", "page.html", r#"{"action":"dance"}"#])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
    }

    #[test]
    fn unknown_encoding() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), "<p>x</p>").unwrap();

        let output = cmd(&dir)
            .args(["page", "page.html", "-e", "klingon"])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("unknown encoding \"klingon\""));
    }

    #[test]
    fn missing_input_file() {
        let dir = TempDir::new().unwrap();

        let output = cmd(&dir).args(["page", "nope.html"]).output().unwrap();

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("could not read \"nope.html\""));
    }

    #[test]
    fn check_reports_unreachable_backend() {
        let dir = TempDir::new().unwrap();

        let output = cmd(&dir)
            .args(["check", "--provider", "local", "--endpoint", "http://127.0.0.1:9"])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr)
            .contains("Cannot connect to Ollama at http://127.0.0.1:9"));
    }
}
