//! End-to-end tests running the `binpkg` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// SHA-1 of `abc`.
const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

/// Test context with an isolated `BINPKG_HOME`.
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join(".binpkg"))
            .expect("failed to create binpkg home");
        Self { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn binpkg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_binpkg"));
        cmd.env("HOME", self.path());
        cmd.env("BINPKG_HOME", self.path().join(".binpkg"));
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("BINPKG_RETRIES");
        cmd.env_remove("BINPKG_TIMEOUT_SECONDS");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    fn manifest(&self, x86_64_url: &str, x86_64_sha1: &str) -> PathBuf {
        self.write(
            "mpfr.toml",
            &format!(
                "name = \"mpfr\"\nversion = \"3.1.2\"\n\n[binary_url]\nx86_64 = \"{x86_64_url}\"\n\n[binary_sha1]\nx86_64 = \"{x86_64_sha1}\"\n"
            ),
        )
    }
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run binpkg")
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("terminated by signal")
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = run(ctx.binpkg().arg("--help"));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_usage_error_exits_2() {
    let ctx = TestContext::new();
    let output = run(ctx.binpkg().args(["install", "mpfr.toml"]));
    assert_eq!(code(&output), 2);
}

#[test]
fn test_install_success() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/mpfr-3.1.2-x86_64.tar.gz")
        .with_body("abc")
        .create();

    let ctx = TestContext::new();
    let manifest = ctx.manifest(
        &format!("{}/mpfr-3.1.2-x86_64.tar.gz", server.url()),
        ABC_SHA1,
    );
    let dest = ctx.path().join("lib/libmpfr.tar.gz");

    let output = run(ctx
        .binpkg()
        .arg("install")
        .arg(&manifest)
        .args(["--arch", "x86_64", "--dest"])
        .arg(&dest));

    mock.assert();
    assert_eq!(
        code(&output),
        0,
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
}

#[test]
fn test_install_into_directory_and_again() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/mpfr-3.1.2-x86_64.tar.gz")
        .with_body("abc")
        .expect(2)
        .create();

    let ctx = TestContext::new();
    let manifest = ctx.manifest(
        &format!("{}/mpfr-3.1.2-x86_64.tar.gz", server.url()),
        ABC_SHA1,
    );
    let out = ctx.path().join("out");
    std::fs::create_dir(&out).unwrap();

    for _ in 0..2 {
        let output = run(ctx
            .binpkg()
            .arg("--quiet")
            .arg("install")
            .arg(&manifest)
            .args(["--arch", "amd64", "--dest"])
            .arg(&out));
        assert_eq!(code(&output), 0);
    }

    mock.assert();
    let names: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, ["mpfr-3.1.2-x86_64.tar.gz"]);
}

#[test]
fn test_malformed_manifest_exits_3() {
    let ctx = TestContext::new();
    let manifest = ctx.write(
        "broken.toml",
        "name = \"mpfr\"\nversion = \"3.1.2\"\n\n[binary_url]\nx86_64 = \"https://example.test/a\"\n\n[binary_sha1]\ni686 = \"eb81b9bb83ebb43b94ab33e43293f1df3bcbad7c\"\n",
    );

    let output = run(ctx
        .binpkg()
        .arg("install")
        .arg(&manifest)
        .args(["--arch", "x86_64", "--dest"])
        .arg(ctx.path().join("a")));
    assert_eq!(code(&output), 3);
}

#[test]
fn test_missing_architecture_exits_4() {
    let ctx = TestContext::new();
    let manifest = ctx.manifest(
        "https://example.test/mpfr-3.1.2-x86_64.tar.gz",
        "a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c",
    );
    let dest = ctx.path().join("mpfr.tar.gz");

    let output = run(ctx
        .binpkg()
        .arg("install")
        .arg(&manifest)
        .args(["--arch", "armv7l", "--dest"])
        .arg(&dest));
    assert_eq!(code(&output), 4);
    assert!(!dest.exists());
}

#[test]
fn test_not_found_exits_5() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/mpfr.tar.gz")
        .with_status(404)
        .expect(1)
        .create();

    let ctx = TestContext::new();
    let manifest = ctx.manifest(&format!("{}/mpfr.tar.gz", server.url()), ABC_SHA1);

    let output = run(ctx
        .binpkg()
        .arg("install")
        .arg(&manifest)
        .args(["--arch", "x86_64", "--retries", "3", "--dest"])
        .arg(ctx.path().join("mpfr.tar.gz")));

    mock.assert();
    assert_eq!(code(&output), 5);
}

#[test]
fn test_checksum_mismatch_exits_6() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/mpfr.tar.gz")
        .with_body("not the real tarball")
        .create();

    let ctx = TestContext::new();
    let manifest = ctx.manifest(
        &format!("{}/mpfr.tar.gz", server.url()),
        "a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c",
    );
    let out = ctx.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let output = run(ctx
        .binpkg()
        .arg("install")
        .arg(&manifest)
        .args(["--arch", "x86_64", "--dest"])
        .arg(&out));

    assert_eq!(code(&output), 6);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("a80c48bee7e6e8ddcd1771c4fd7708d89f2abb9c"), "{stderr}");
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_invalid_config_exits_1() {
    let ctx = TestContext::new();
    let manifest = ctx.manifest("https://example.test/a.tar.gz", ABC_SHA1);
    let config = ctx.write("config.toml", "retry = 3\n");

    let output = run(ctx
        .binpkg()
        .arg("install")
        .arg(&manifest)
        .arg("--config")
        .arg(&config)
        .args(["--arch", "x86_64", "--dest"])
        .arg(ctx.path().join("a.tar.gz")));
    assert_eq!(code(&output), 1);
}

#[test]
fn test_check_lists_architectures() {
    let ctx = TestContext::new();
    let output = run(ctx.binpkg().arg("check").arg(fixture("mpfr.toml")));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mpfr"));
    for arch in ["armv7l", "i686", "x86_64"] {
        assert!(stdout.contains(arch), "missing {arch} in {stdout}");
    }
}

#[test]
fn test_hash_prints_sha1() {
    let ctx = TestContext::new();
    let file = ctx.write("abc.txt", "abc");

    let output = run(ctx.binpkg().arg("hash").arg(&file));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(ABC_SHA1), "{stdout}");
}
