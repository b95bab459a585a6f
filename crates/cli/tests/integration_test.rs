//! Integration tests for the treesnap CLI

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A working tree plus an isolated config home
struct Sandbox {
    root: TempDir,
    config_home: TempDir,
}

impl Sandbox {
    fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
            config_home: TempDir::new()?,
        })
    }

    fn root(&self) -> &Path {
        self.root.path()
    }

    fn write(&self, rel: &str, data: &str) -> Result<()> {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, data)?;
        Ok(())
    }

    fn read(&self, rel: &str) -> Result<String> {
        Ok(fs::read_to_string(self.root().join(rel))?)
    }

    fn write_config(&self, content: &str) -> Result<()> {
        let subdir = if cfg!(target_os = "macos") { ".config/treesnap" } else { "treesnap" };
        let dir = self.config_home.path().join(subdir);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("config.toml"), content)?;
        Ok(())
    }

    /// Run treesnap with `--root` pointing at the sandbox
    fn run(&self, args: &[&str]) -> Result<Output> {
        Ok(Command::new(env!("CARGO_BIN_EXE_treesnap"))
            .args(args)
            .arg("--root")
            .arg(self.root())
            .env("XDG_CONFIG_HOME", self.config_home.path())
            .env("HOME", self.config_home.path())
            .env_remove("RUST_LOG")
            .output()?)
    }

    fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        assert!(
            output.status.success(),
            "treesnap {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn read_meta(sandbox: &Sandbox, version: &str) -> Result<serde_json::Value> {
    let path = sandbox.root().join("archive").join(version).join("meta.json");
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn test_create_list_restore_cycle() -> Result<()> {
    let sandbox = Sandbox::new()?;

    sandbox.write("a.txt", "hello")?;
    let stdout = sandbox.run_ok(&["create", "-s", "first"])?;
    assert!(stdout.contains("v1-1"));

    sandbox.write("a.txt", "world")?;
    sandbox.run_ok(&["create", "-s", "second", "-p", "v1-1"])?;

    let listing = sandbox.run_ok(&["list"])?;
    let v1 = listing.find("v1-1").unwrap();
    let v2 = listing.find("v2-1").unwrap();
    assert!(v1 < v2);
    assert!(listing.contains("second"));

    sandbox.run_ok(&["restore", "v1-1", "--overwrite"])?;
    assert_eq!(sandbox.read("a.txt")?, "hello");
    Ok(())
}

#[test]
fn test_restore_without_overwrite_keeps_files() -> Result<()> {
    let sandbox = Sandbox::new()?;

    sandbox.write("a.txt", "hello")?;
    sandbox.run_ok(&["create"])?;
    sandbox.write("a.txt", "edited")?;

    let stdout = sandbox.run_ok(&["restore", "v1-1"])?;

    assert!(stdout.contains("--overwrite"));
    assert_eq!(sandbox.read("a.txt")?, "edited");
    Ok(())
}

#[test]
fn test_config_overwrite_default() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write_config("[restore]\noverwrite = true\n")?;

    sandbox.write("a.txt", "hello")?;
    sandbox.run_ok(&["create"])?;
    sandbox.write("a.txt", "edited")?;

    sandbox.run_ok(&["restore", "v1-1"])?;
    assert_eq!(sandbox.read("a.txt")?, "hello");
    Ok(())
}

#[test]
fn test_restore_uses_configured_ignore() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write_config("[snapshot]\nignore = [\"*.log\"]\n")?;

    sandbox.write("index.html", "<html>")?;
    sandbox.run_ok(&["create"])?;
    let meta = read_meta(&sandbox, "v1-1")?;
    assert!(meta["file_index"].get("index.html").is_some());

    sandbox.write("index.html", "drift")?;
    sandbox.write("debug.log", "trace")?;
    let stdout = sandbox.run_ok(&["restore", "v1-1", "--overwrite"])?;

    assert!(!stdout.contains("debug.log"));
    assert_eq!(sandbox.read("index.html")?, "<html>");
    assert_eq!(sandbox.read("debug.log")?, "trace");
    Ok(())
}

#[test]
fn test_restore_with_ignore_file() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let ignore = sandbox.config_home.path().join("ignore.json");
    fs::write(&ignore, r#"["notes/**"]"#)?;
    let ignore = ignore.to_str().unwrap();

    sandbox.write("style.css", "body {}")?;
    sandbox.run_ok(&["create", "--ignore-file", ignore])?;

    sandbox.write("style.css", "body { color: red }")?;
    sandbox.write("notes/todo.md", "later")?;
    sandbox.run_ok(&["restore", "v1-1", "--overwrite", "--ignore-file", ignore])?;

    assert_eq!(sandbox.read("style.css")?, "body {}");
    assert_eq!(sandbox.read("notes/todo.md")?, "later");
    Ok(())
}

#[test]
fn test_second_root_create_fails() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write("a.txt", "hello")?;
    sandbox.run_ok(&["create", "-s", "first"])?;

    sandbox.write("a.txt", "other")?;
    let output = sandbox.run(&["create", "-s", "again"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert_eq!(read_meta(&sandbox, "v1-1")?["summary"], "first");
    Ok(())
}

#[test]
fn test_chat_history_is_embedded() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write("chat_history.json", r#"{"messages": ["hi"]}"#)?;
    sandbox.write("main.ts", "x")?;

    sandbox.run_ok(&["create"])?;

    let meta = read_meta(&sandbox, "v1-1")?;
    assert_eq!(meta["chat"]["messages"][0], "hi");
    // The chat file itself is never tracked
    assert!(meta["file_index"].get("chat_history.json").is_none());
    Ok(())
}

#[test]
fn test_broken_chat_history_becomes_warning() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write("chat_history.json", "{ not json")?;

    sandbox.run_ok(&["create"])?;

    let meta = read_meta(&sandbox, "v1-1")?;
    assert_eq!(
        meta["chat"]["warning"],
        "chat_history.json exists but failed to parse"
    );
    Ok(())
}

#[test]
fn test_explicit_chat_file_must_parse() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let chat = sandbox.root().join("other.json");
    fs::write(&chat, "nope")?;

    let output = sandbox.run(&["create", "--chat-file", chat.to_str().unwrap()])?;
    assert!(!output.status.success());
    assert!(!sandbox.root().join("archive/v1-1").exists());
    Ok(())
}

#[test]
fn test_ignore_file_replaces_defaults() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write("index.html", "<html>")?;
    sandbox.write("dist/app.js", "bundle")?;
    let ignore = sandbox.config_home.path().join("ignore.json");
    fs::write(&ignore, r#"["dist/**", "archive/**"]"#)?;

    sandbox.run_ok(&["create", "--ignore-file", ignore.to_str().unwrap()])?;

    let meta = read_meta(&sandbox, "v1-1")?;
    let tracked: Vec<&String> = meta["file_index"].as_object().unwrap().keys().collect();
    assert_eq!(tracked, vec!["index.html"]);
    Ok(())
}

#[test]
fn test_log_and_show() -> Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.write("a.txt", "a")?;
    sandbox.run_ok(&["create", "-s", "root snapshot"])?;
    sandbox.write("b.txt", "b")?;
    sandbox.run_ok(&["create", "-s", "add b", "-p", "v1-1"])?;

    let log = sandbox.run_ok(&["log"])?;
    assert!(log.find("v2-1").unwrap() < log.find("v1-1").unwrap());
    assert!(log.contains("(latest)"));

    let show = sandbox.run_ok(&["show", "v2-1"])?;
    assert!(show.contains("add b"));
    assert!(show.contains("b.txt"));
    assert!(show.contains("a.txt"));
    assert!(show.contains("-> v1-1"));
    Ok(())
}

#[test]
fn test_unknown_version_fails() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let output = sandbox.run(&["restore", "v3-1"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("version not found"));

    let output = sandbox.run(&["show", "bogus"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid version id"));
    Ok(())
}

#[test]
fn test_list_empty_archive() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let stdout = sandbox.run_ok(&["list"])?;
    assert!(stdout.contains("No versions yet"));
    Ok(())
}
