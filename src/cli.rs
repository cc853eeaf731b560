use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{resolve_credentials, CredentialProvider, Credentials, StaticProvider};
use crate::config::{Config, OutputFormat};
use crate::output::{write_json, write_muted_tests, RequestProgress};
use crate::teamcity::{locator, TeamCityClient};

#[derive(Parser)]
#[command(name = "tcrest")]
#[command(author, version, about = "TeamCity REST API client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Server host name, or a full root URL such as http://localhost:8111
    #[arg(short, long, global = true, env = "TC_SERVER")]
    server: Option<String>,

    /// Username; TC_USERNAME or a prompt is used when omitted
    #[arg(long, global = true)]
    username: Option<String>,

    /// Password; prefer TC_PASSWORD or the interactive prompt, since flags
    /// end up in shell history and the process list
    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
enum Commands {
    /// List all projects
    Projects,
    /// List all build configurations
    BuildTypes,
    /// Latest builds of a build configuration on a branch
    Builds {
        build_type: String,

        #[arg(short, long)]
        branch: Option<String>,

        #[arg(short = 'n', long)]
        count: Option<u32>,
    },
    /// Details of one build configuration
    BuildType { id: String },
    /// Every recorded run of a test
    TestHistory { test_id: String },
    /// Test occurrences of a build (at most 500)
    Tests { build_id: String },
    /// Muted tests in the project owning a build configuration
    Muted {
        build_type: String,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// GET an arbitrary path below app/rest/
    Get { path: String },
}

impl Commands {
    fn label(&self) -> String {
        match self {
            Self::Projects => "projects".to_string(),
            Self::BuildTypes => "build types".to_string(),
            Self::Builds { build_type, .. } => format!("builds of {build_type}"),
            Self::BuildType { id } => format!("build type {id}"),
            Self::TestHistory { test_id } => format!("history of test {test_id}"),
            Self::Tests { build_id } => format!("tests of build {build_id}"),
            Self::Muted { build_type, .. } => format!("muted tests for {build_type}"),
            Self::Get { path } => path.clone(),
        }
    }
}

impl Cli {
    fn credentials(&self) -> Result<Credentials> {
        let credentials = match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                StaticProvider::new(username, password).credentials()?
            }
            (None, None) => resolve_credentials()?,
            _ => bail!("--username and --password must be given together"),
        };
        Ok(credentials)
    }

    async fn connect(&self, config: &Config) -> Result<TeamCityClient> {
        let server = self
            .server
            .clone()
            .or_else(|| config.server.name.clone())
            .ok_or_else(|| anyhow!("No TeamCity server given; use --server, TC_SERVER or a config file"))?;

        let mut settings = config.client_settings();
        if let Some(timeout) = self.timeout {
            settings.timeout = Duration::from_secs(timeout);
        }

        let credentials = self.credentials()?;
        info!("Connecting to {} as {}", server, credentials.username());

        let client = if server.contains("://") {
            TeamCityClient::connect_to_root(&server, credentials, settings).await
        } else {
            TeamCityClient::connect(&server, credentials, settings).await
        };
        let client = client.with_context(|| format!("Failed to set up client for {server}"))?;
        info!("Using {} as {}", client.base_url(), client.username());
        Ok(client)
    }

    async fn fetch(
        &self,
        client: &TeamCityClient,
        command: &Commands,
    ) -> crate::error::Result<reqwest::Response> {
        match command {
            Commands::Projects => client.get_projects().await,
            Commands::BuildTypes => client.get_buildtypes().await,
            Commands::Builds {
                build_type,
                branch,
                count,
            } => {
                client
                    .get_builds_by_branch(build_type, branch.as_deref(), *count)
                    .await
            }
            Commands::BuildType { id } => client.get_build_information_by_id(id).await,
            Commands::TestHistory { test_id } => client.get_test_history_by_id(test_id).await,
            Commands::Tests { build_id } => client.get_tests_from_build(build_id).await,
            Commands::Get { path } => client.get(path).await,
            Commands::Muted { build_type, .. } => {
                client.get(&locator::project_mutes(build_type)).await
            }
        }
    }

    async fn execute_raw(
        &self,
        client: &TeamCityClient,
        command: &Commands,
        pretty: bool,
    ) -> Result<()> {
        let progress = RequestProgress::start(&command.label());
        let response = match self.fetch(client, command).await {
            Ok(response) => {
                progress.finish();
                response
            }
            Err(e) => {
                progress.fail();
                let hint = if e.is_transport() {
                    " (is the server reachable?)"
                } else {
                    ""
                };
                return Err(e)
                    .with_context(|| format!("Failed to fetch {}{hint}", command.label()));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        if !status.is_success() {
            bail!("TeamCity returned {status}: {body}");
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).context("Response body is not valid JSON")?;
        self.write_output(|out| write_json(&value, pretty, out))
    }

    async fn execute_muted(
        &self,
        client: &TeamCityClient,
        build_type: &str,
        format: OutputFormat,
        pretty: bool,
    ) -> Result<()> {
        let progress = RequestProgress::start(&format!("muted tests for {build_type}"));
        let muted = match client.get_muted_tests_in_project(build_type).await {
            Ok(muted) => {
                progress.finish();
                muted
            }
            Err(e) => {
                progress.fail();
                return Err(e).context("Failed to fetch muted tests");
            }
        };

        self.write_output(|out| write_muted_tests(&muted, format, pretty, out))
    }

    fn write_output<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            write(&mut file)?;
            info!("Output written to: {}", output_path.display());
        } else {
            write(&mut std::io::stdout().lock())?;
        }
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let client = self.connect(&config).await?;
        let pretty = self.pretty || config.output.pretty;

        let command = self.command.clone().unwrap_or(Commands::Projects);
        match &command {
            Commands::Muted { build_type, format } => {
                let format = format.unwrap_or(config.output.format);
                self.execute_muted(&client, build_type, format, pretty).await
            }
            other => self.execute_raw(&client, other, pretty).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mockito::{Matcher, Server};
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tcrest").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_builds_with_options() {
        let cli = parse(&["--server", "tc.example.com", "builds", "Cfg", "-b", "main", "-n", "5"]);

        assert_eq!(cli.server.as_deref(), Some("tc.example.com"));
        assert_eq!(
            cli.command,
            Some(Commands::Builds {
                build_type: "Cfg".to_string(),
                branch: Some("main".to_string()),
                count: Some(5),
            })
        );
    }

    #[test]
    fn test_parse_muted_format_and_global_flags_after_subcommand() {
        let cli = parse(&["muted", "Cfg", "--format", "json", "--pretty", "--timeout", "7"]);

        assert!(cli.pretty);
        assert_eq!(cli.timeout, Some(7));
        assert_eq!(
            cli.command,
            Some(Commands::Muted {
                build_type: "Cfg".to_string(),
                format: Some(OutputFormat::Json),
            })
        );
    }

    #[test]
    fn test_command_is_optional() {
        let cli = parse(&["--server", "tc"]);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_flag_credentials_must_come_in_pairs() {
        let cli = parse(&["--username", "alice", "projects"]);
        assert!(cli.credentials().is_err());

        let cli = parse(&["--username", "alice", "--password", "secret", "projects"]);
        let creds = cli.credentials().unwrap();
        assert_eq!(creds.username(), "alice");
        assert_eq!(creds.password(), "secret");
    }

    #[test]
    fn test_password_flag_points_to_safer_sources() {
        let command = Cli::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "password")
            .and_then(|arg| arg.get_help())
            .map(ToString::to_string)
            .unwrap_or_default();

        assert!(help.contains("TC_PASSWORD"));
        assert!(help.contains("prompt"));
    }

    #[tokio::test]
    async fn test_fetch_muted_returns_raw_mutes_response() {
        let mut server = Server::new_async().await;
        let mutes = server
            .mock("GET", Matcher::Regex("^/app/rest/mutes/".to_string()))
            .match_query(Matcher::UrlEncoded(
                "locator".to_string(),
                "affectedProject:(buildType:(id:Cfg))".to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"mute":[]}"#)
            .create_async()
            .await;
        let client = TeamCityClient::connect_to_root(
            &server.url(),
            Credentials::new("alice", "secret"),
            crate::teamcity::ClientSettings::default(),
        )
        .await
        .unwrap();
        let cli = parse(&["muted", "Cfg"]);

        let command = cli.command.clone().unwrap();
        let response = cli.fetch(&client, &command).await.unwrap();

        mutes.assert_async().await;
        assert_eq!(response.text().await.unwrap(), r#"{"mute":[]}"#);
    }

    async fn run(server: &Server, dir: &TempDir, command: &[&str]) -> Result<String> {
        let output = dir.path().join("out.json");
        let config = dir.path().join("missing.toml");
        let url = server.url();
        let mut args = vec![
            "--server",
            url.as_str(),
            "--username",
            "alice",
            "--password",
            "secret",
            "--config",
            config.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ];
        args.extend_from_slice(command);

        parse(&args).execute().await?;
        Ok(std::fs::read_to_string(output).unwrap())
    }

    #[tokio::test]
    async fn test_execute_defaults_to_projects() {
        let mut server = Server::new_async().await;
        let projects = server
            .mock("GET", "/app/rest/projects")
            .with_status(200)
            .with_body(r#"{"count":1,"project":[{"id":"_Root"}]}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();

        let written = run(&server, &dir, &[]).await.unwrap();

        projects.assert_async().await;
        assert_eq!(written, "{\"count\":1,\"project\":[{\"id\":\"_Root\"}]}\n");
    }

    #[tokio::test]
    async fn test_execute_muted_as_json() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Regex("^/app/rest/mutes/".to_string()))
            .with_status(200)
            .with_body(r#"{"mute":[{"target":{"tests":{"test":[{"name":"test_a"}]}},"assignment":{"text":"flaky"}}]}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();

        let written = run(&server, &dir, &["muted", "Cfg", "--format", "json"])
            .await
            .unwrap();

        assert_eq!(written, "{\"test_a\":\"flaky\"}\n");
    }

    #[tokio::test]
    async fn test_execute_reports_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/app/rest/buildTypes/id:Nope")
            .with_status(404)
            .with_body("No build type")
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();

        let err = run(&server, &dir, &["build-type", "Nope"]).await.unwrap_err();

        assert!(err.to_string().contains("404"));
    }
}
