//! # hivemind
//!
//! Command-line client for the Hivemind bridge: sends one command, prints
//! the result as JSON, and converts images to and from tensor JSON.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use hivemind_bridge::{BridgeClient, DaemonEndpoint, FileRef, PackageSpec};
use hivemind_core::logging::LogFormat;
use hivemind_settings::HivemindSettings;
use hivemind_tensor::{PixelBuffer, Tensor};
use serde_json::{Map, Value};
use tracing::debug;

/// Hivemind bridge client.
#[derive(Parser, Debug)]
#[command(name = "hivemind", about = "Talk to a Hivemind daemon through its bridge")]
struct Cli {
    /// Settings file (defaults to `~/.hivemind/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Bridge host (overrides settings).
    #[arg(long, global = true)]
    host: Option<String>,

    /// Bridge port (overrides settings).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Bridge access key (overrides settings).
    #[arg(long, global = true)]
    key: Option<String>,

    /// Log filter, e.g. `debug` or `hivemind_bridge=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as one JSON object per line.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the bridge and daemon respond.
    Heartbeat,
    /// Run a package entry point.
    Run {
        /// Entry point, e.g. `package/function`.
        target: String,
        /// Arguments as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },
    /// Run a model directly.
    RunInternal {
        /// Package that owns the model.
        package: String,
        /// Model name.
        model: String,
        /// Model inputs as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },
    /// Fetch a stored result by hash.
    Result {
        /// Result hash.
        hash: String,
        /// Print the daemon URL of the returned file reference instead.
        #[arg(long)]
        url: bool,
    },
    /// Manage packages.
    #[command(subcommand)]
    Package(PackageCommand),
    /// Ask the bridge for the daemon's HTTP endpoint.
    Daemon,
    /// Print the URL of a stored result on the configured daemon.
    ResultUrl {
        /// Stored result key.
        key: String,
    },
    /// Convert images to and from tensor JSON.
    #[command(subcommand)]
    Tensor(TensorCommand),
}

#[derive(Subcommand, Debug)]
enum PackageCommand {
    /// Install a package.
    Install(PackageSourceArgs),
    /// Download a package without installing it.
    Fetch(PackageSourceArgs),
    /// Activate an installed package.
    Activate(PackageRefArgs),
    /// Deactivate a package.
    Deactivate(PackageRefArgs),
    /// Remove an installed package.
    Remove(PackageRefArgs),
    /// List installed packages.
    List,
}

#[derive(Args, Debug, Default, PartialEq)]
struct PackageSourceArgs {
    /// Package name in the index.
    #[arg(long)]
    name: Option<String>,
    /// Package spec file.
    #[arg(long)]
    specfile: Option<String>,
    /// Local package archive.
    #[arg(long)]
    localfile: Option<String>,
    /// Remote package archive.
    #[arg(long)]
    url: Option<String>,
    /// Expected archive hash.
    #[arg(long)]
    package_hash: Option<String>,
}

impl PackageSourceArgs {
    fn into_spec(self) -> Result<PackageSpec> {
        if self.name.is_none()
            && self.specfile.is_none()
            && self.localfile.is_none()
            && self.url.is_none()
        {
            bail!("one of --name, --specfile, --localfile or --url is required");
        }
        Ok(PackageSpec {
            name: self.name,
            specfile: self.specfile,
            localfile: self.localfile,
            url: self.url,
            package_hash: self.package_hash,
        })
    }
}

#[derive(Args, Debug, PartialEq)]
struct PackageRefArgs {
    /// Package name.
    name: String,
    /// Package version (daemon picks when omitted).
    #[arg(long)]
    version: Option<String>,
}

#[derive(Subcommand, Debug)]
enum TensorCommand {
    /// Encode an image file as tensor JSON.
    Encode {
        /// Input image (PNG or JPEG).
        image: PathBuf,
        /// Keep the alpha channel.
        #[arg(long, default_value_t = false)]
        alpha: bool,
        /// Write JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decode tensor JSON into an image file.
    Decode {
        /// Tensor JSON file.
        tensor: PathBuf,
        /// Output image; format follows the extension.
        #[arg(long)]
        out: PathBuf,
    },
}

impl Cli {
    fn log_format(&self) -> LogFormat {
        if self.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }

    /// Load settings and apply command-line overrides.
    fn resolve_settings(&self) -> Result<HivemindSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(hivemind_settings::settings_path);
        let mut settings = hivemind_settings::load_settings_from_path(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;

        if let Some(ref host) = self.host {
            settings.bridge.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.bridge.port = port;
        }
        if let Some(ref key) = self.key {
            settings.bridge.key.clone_from(key);
        }
        if let Some(ref level) = self.log_level {
            settings.log_level.clone_from(level);
        }
        settings.validate().context("invalid command-line overrides")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve_settings()?;
    hivemind_core::logging::init_subscriber(&settings.log_level, cli.log_format());
    debug!(url = %settings.bridge.ws_url(), "resolved settings");

    match cli.command {
        Commands::ResultUrl { key } => {
            println!("{}", DaemonEndpoint::from(&settings.daemon).result_url(&key));
            Ok(())
        }
        Commands::Tensor(cmd) => run_tensor(cmd),
        command => {
            let client = BridgeClient::connect(&settings)
                .await
                .context("could not reach the bridge")?;
            let outcome = run_bridge(&client, command).await;
            client.close().await;
            print_json(&outcome?)
        }
    }
}

async fn run_bridge(client: &BridgeClient, command: Commands) -> Result<Value> {
    let value = match command {
        Commands::Heartbeat => client.heartbeat().await?,
        Commands::Run { target, params } => client.run(&target, parse_params(params)?).await?,
        Commands::RunInternal {
            package,
            model,
            params,
        } => {
            client
                .run_internal(&package, &model, parse_params(params)?)
                .await?
        }
        Commands::Result { hash, url: false } => client.result(&hash).await?,
        Commands::Result { hash, url: true } => file_url(client, client.result(&hash).await?)?,
        Commands::Package(cmd) => run_package(client, cmd).await?,
        Commands::Daemon => serde_json::to_value(client.get_daemon().await?)?,
        Commands::ResultUrl { .. } | Commands::Tensor(_) => {
            bail!("command does not use the bridge")
        }
    };
    Ok(value)
}

fn file_url(client: &BridgeClient, result: Value) -> Result<Value> {
    let file: FileRef =
        serde_json::from_value(result).context("result is not a stored file reference")?;
    Ok(Value::String(client.file_url(&file)))
}

async fn run_package(client: &BridgeClient, cmd: PackageCommand) -> Result<Value> {
    let value = match cmd {
        PackageCommand::Install(src) => client.package_install(src.into_spec()?).await?,
        PackageCommand::Fetch(src) => client.package_fetch(src.into_spec()?).await?,
        PackageCommand::Activate(r) => {
            client
                .package_activate(&r.name, r.version.as_deref())
                .await?
        }
        PackageCommand::Deactivate(r) => {
            client
                .package_deactivate(&r.name, r.version.as_deref())
                .await?
        }
        PackageCommand::Remove(r) => client.package_remove(&r.name, r.version.as_deref()).await?,
        PackageCommand::List => client.package_list().await?,
    };
    Ok(value)
}

fn run_tensor(cmd: TensorCommand) -> Result<()> {
    match cmd {
        TensorCommand::Encode { image, alpha, out } => {
            let tensor = encode_image(&image, alpha)?;
            let text = serde_json::to_string_pretty(&tensor)?;
            match out {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{text}"),
            }
            Ok(())
        }
        TensorCommand::Decode { tensor, out } => decode_to_image(&tensor, &out),
    }
}

fn encode_image(path: &Path, alpha: bool) -> Result<Tensor> {
    let img =
        image::open(path).with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(hivemind_tensor::encode(&PixelBuffer::from(&img), alpha))
}

fn decode_to_image(tensor_path: &Path, out: &Path) -> Result<()> {
    let text = std::fs::read_to_string(tensor_path)
        .with_context(|| format!("failed to read {}", tensor_path.display()))?;
    let tensor: Tensor = serde_json::from_str(&text).context("not a tensor JSON object")?;
    let pixels = hivemind_tensor::decode(&tensor)?;
    image::RgbaImage::from(&pixels)
        .save(out)
        .with_context(|| format!("failed to write image {}", out.display()))?;
    Ok(())
}

/// Parse a `--params` JSON object; absent means empty.
fn parse_params(raw: Option<String>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(&raw).context("--params is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--params must be a JSON object, got {other}"),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── argument parsing ──

    #[test]
    fn cli_heartbeat() {
        let cli = Cli::parse_from(["hivemind", "heartbeat"]);
        assert!(matches!(cli.command, Commands::Heartbeat));
        assert!(cli.host.is_none());
    }

    #[test]
    fn cli_global_overrides_after_subcommand() {
        let cli = Cli::parse_from([
            "hivemind", "package", "list", "--host", "10.0.0.5", "--port", "7000", "--key", "abc",
        ]);
        assert_eq!(cli.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(cli.port, Some(7000));
        assert_eq!(cli.key.as_deref(), Some("abc"));
        assert!(matches!(cli.command, Commands::Package(PackageCommand::List)));
    }

    #[test]
    fn cli_json_logs_flag_selects_format() {
        let cli = Cli::parse_from(["hivemind", "heartbeat"]);
        assert_eq!(cli.log_format(), LogFormat::Compact);

        let cli = Cli::parse_from(["hivemind", "daemon", "--json-logs"]);
        assert_eq!(cli.log_format(), LogFormat::Json);
    }

    #[test]
    fn cli_result_url_flag() {
        let cli = Cli::parse_from(["hivemind", "result", "9f2c", "--url"]);
        let Commands::Result { hash, url } = cli.command else {
            panic!("expected result");
        };
        assert_eq!(hash, "9f2c");
        assert!(url);

        let cli = Cli::parse_from(["hivemind", "result", "9f2c"]);
        assert!(matches!(cli.command, Commands::Result { url: false, .. }));
    }

    #[test]
    fn cli_run_with_params() {
        let cli = Cli::parse_from(["hivemind", "run", "vision/classify", "--params", "{\"k\": 1}"]);
        let Commands::Run { target, params } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(target, "vision/classify");
        assert_eq!(params.as_deref(), Some("{\"k\": 1}"));
    }

    #[test]
    fn cli_run_internal_positionals() {
        let cli = Cli::parse_from(["hivemind", "run-internal", "vision", "resnet"]);
        let Commands::RunInternal { package, model, params } = cli.command else {
            panic!("expected run-internal");
        };
        assert_eq!(package, "vision");
        assert_eq!(model, "resnet");
        assert!(params.is_none());
    }

    #[test]
    fn cli_package_activate_version() {
        let cli = Cli::parse_from(["hivemind", "package", "activate", "vision", "--version", "1.0"]);
        let Commands::Package(PackageCommand::Activate(r)) = cli.command else {
            panic!("expected package activate");
        };
        assert_eq!(
            r,
            PackageRefArgs {
                name: "vision".into(),
                version: Some("1.0".into())
            }
        );
    }

    #[test]
    fn cli_package_install_sources() {
        let cli = Cli::parse_from([
            "hivemind",
            "package",
            "install",
            "--url",
            "https://example.com/p.zip",
            "--package-hash",
            "beef",
        ]);
        let Commands::Package(PackageCommand::Install(src)) = cli.command else {
            panic!("expected package install");
        };
        let spec = src.into_spec().unwrap();
        assert_eq!(spec.url.as_deref(), Some("https://example.com/p.zip"));
        assert_eq!(spec.package_hash.as_deref(), Some("beef"));
        assert!(spec.name.is_none());
    }

    #[test]
    fn package_source_required() {
        let err = PackageSourceArgs {
            package_hash: Some("beef".into()),
            ..PackageSourceArgs::default()
        }
        .into_spec()
        .unwrap_err();
        assert!(err.to_string().contains("--url"));
    }

    #[test]
    fn cli_tensor_encode_defaults() {
        let cli = Cli::parse_from(["hivemind", "tensor", "encode", "cat.png"]);
        let Commands::Tensor(TensorCommand::Encode { image, alpha, out }) = cli.command else {
            panic!("expected tensor encode");
        };
        assert_eq!(image, PathBuf::from("cat.png"));
        assert!(!alpha);
        assert!(out.is_none());
    }

    #[test]
    fn cli_tensor_decode_requires_out() {
        assert!(Cli::try_parse_from(["hivemind", "tensor", "decode", "t.json"]).is_err());
    }

    // ── params ──

    #[test]
    fn params_absent_is_empty() {
        assert!(parse_params(None).unwrap().is_empty());
    }

    #[test]
    fn params_object_parsed() {
        let map = parse_params(Some(r#"{"text": "hi", "n": 2}"#.into())).unwrap();
        assert_eq!(map["text"], json!("hi"));
        assert_eq!(map["n"], json!(2));
    }

    #[test]
    fn params_non_object_rejected() {
        assert!(parse_params(Some("[1, 2]".into())).is_err());
        assert!(parse_params(Some("{oops".into())).is_err());
    }

    // ── settings ──

    #[test]
    fn overrides_apply_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"bridge": {"host": "filehost", "key": "filekey"}}"#).unwrap();

        let cli = Cli::parse_from([
            "hivemind",
            "--settings",
            path.to_str().unwrap(),
            "--key",
            "clikey",
            "heartbeat",
        ]);
        let settings = cli.resolve_settings().unwrap();
        assert_eq!(settings.bridge.host, "filehost");
        assert_eq!(settings.bridge.key, "clikey");
    }

    #[test]
    fn invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "hivemind",
            "--settings",
            dir.path().join("missing.json").to_str().unwrap(),
            "--port",
            "0",
            "heartbeat",
        ]);
        assert!(cli.resolve_settings().is_err());
    }

    // ── tensor files ──

    #[test]
    fn image_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("in.png");
        let json_path = dir.path().join("t.json");
        let out = dir.path().join("out.png");

        let src = PixelBuffer::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 128]).unwrap();
        image::RgbaImage::from(&src).save(&png).unwrap();

        let tensor = encode_image(&png, true).unwrap();
        assert_eq!(tensor.shape, vec![1, 2, 4]);
        std::fs::write(&json_path, serde_json::to_string(&tensor).unwrap()).unwrap();

        decode_to_image(&json_path, &out).unwrap();
        let back = PixelBuffer::from(image::open(&out).unwrap().to_rgba8());
        assert_eq!(back, src);
    }
}
