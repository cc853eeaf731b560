//! Credential resolution for the TeamCity REST API.
//!
//! Credentials come from the environment (`TC_USERNAME` / `TC_PASSWORD`) and
//! fall back to terminal prompts for whichever value is missing.

use std::env;
use std::fmt;
use std::io;

use console::Term;
use log::debug;

use crate::error::{Result, TeamCityError};

pub const USERNAME_VAR: &str = "TC_USERNAME";
pub const PASSWORD_VAR: &str = "TC_PASSWORD";

/// Username/password pair used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of [`Credentials`] handed to the client constructor.
pub trait CredentialProvider {
    fn credentials(&self) -> Result<Credentials>;
}

/// Fixed credentials, e.g. from command-line flags.
pub struct StaticProvider(Credentials);

impl StaticProvider {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(Credentials::new(username, password))
    }
}

impl CredentialProvider for StaticProvider {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

/// Reads credentials from environment variables.
pub struct EnvironmentProvider {
    username_var: String,
    password_var: String,
}

impl Default for EnvironmentProvider {
    fn default() -> Self {
        Self::with_vars(USERNAME_VAR, PASSWORD_VAR)
    }
}

impl EnvironmentProvider {
    pub fn with_vars(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }

    pub fn username(&self) -> Option<String> {
        env::var(&self.username_var).ok()
    }

    pub fn password(&self) -> Option<String> {
        env::var(&self.password_var).ok()
    }
}

impl CredentialProvider for EnvironmentProvider {
    fn credentials(&self) -> Result<Credentials> {
        let username = self
            .username()
            .ok_or_else(|| TeamCityError::Credentials(format!("{} is not set", self.username_var)))?;
        let password = self
            .password()
            .ok_or_else(|| TeamCityError::Credentials(format!("{} is not set", self.password_var)))?;

        Ok(Credentials::new(username, password))
    }
}

/// Line-oriented terminal input, visible or masked.
pub trait Prompt {
    fn ask(&self, prompt: &str) -> io::Result<String>;

    /// Reads a line without echoing it back.
    fn ask_hidden(&self, prompt: &str) -> io::Result<String>;
}

/// Prompts on stderr so stdout stays clean for JSON output.
pub struct TerminalPrompt {
    term: Term,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        self.term.write_str(prompt)?;
        self.term.read_line()
    }

    fn ask_hidden(&self, prompt: &str) -> io::Result<String> {
        self.term.write_str(prompt)?;
        self.term.read_secure_line()
    }
}

/// Asks the user for both values interactively.
pub struct PromptProvider<P> {
    prompt: P,
}

impl<P: Prompt> PromptProvider<P> {
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }

    pub fn prompt_username(&self) -> Result<String> {
        Ok(self.prompt.ask("Enter TC username: ")?)
    }

    /// The returned password has surrounding whitespace stripped.
    pub fn prompt_password(&self, username: &str) -> Result<String> {
        let password = self.prompt.ask_hidden(&format!(
            "Please enter TeamCity password for {username}:"
        ))?;
        Ok(password.trim().to_string())
    }
}

impl<P: Prompt> CredentialProvider for PromptProvider<P> {
    fn credentials(&self) -> Result<Credentials> {
        let username = self.prompt_username()?;
        let password = self.prompt_password(&username)?;
        Ok(Credentials::new(username, password))
    }
}

/// Environment first, prompting per missing value.
pub struct EnvOrPrompt<P> {
    env: EnvironmentProvider,
    prompt: PromptProvider<P>,
}

impl<P: Prompt> EnvOrPrompt<P> {
    pub fn new(env: EnvironmentProvider, prompt: P) -> Self {
        Self {
            env,
            prompt: PromptProvider::new(prompt),
        }
    }
}

impl<P: Prompt> CredentialProvider for EnvOrPrompt<P> {
    fn credentials(&self) -> Result<Credentials> {
        let username = match self.env.username() {
            Some(username) => username,
            None => {
                debug!("No username in environment, prompting");
                self.prompt.prompt_username()?
            }
        };

        let password = match self.env.password() {
            Some(password) => password,
            None => {
                debug!("No password in environment, prompting");
                self.prompt.prompt_password(&username)?
            }
        };

        Ok(Credentials::new(username, password))
    }
}

/// Resolves credentials from `TC_USERNAME` / `TC_PASSWORD`, prompting on the
/// terminal for anything that is not set.
pub fn resolve_credentials() -> Result<Credentials> {
    EnvOrPrompt::new(EnvironmentProvider::default(), TerminalPrompt::default()).credentials()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned answers and records every prompt shown.
    struct ScriptedPrompt {
        answers: RefCell<VecDeque<String>>,
        asked: RefCell<Vec<(String, bool)>>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().map(|a| a.to_string()).collect()),
                asked: RefCell::new(Vec::new()),
            }
        }

        fn next(&self, prompt: &str, hidden: bool) -> io::Result<String> {
            self.asked.borrow_mut().push((prompt.to_string(), hidden));
            self.answers
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"))
        }
    }

    impl Prompt for &ScriptedPrompt {
        fn ask(&self, prompt: &str) -> io::Result<String> {
            self.next(prompt, false)
        }

        fn ask_hidden(&self, prompt: &str) -> io::Result<String> {
            self.next(prompt, true)
        }
    }

    #[test]
    fn test_env_values_are_used_without_prompting() {
        env::set_var("TCREST_TEST_ENV_ONLY_USER", "alice");
        env::set_var("TCREST_TEST_ENV_ONLY_PASS", "s3cret");
        let prompt = ScriptedPrompt::new(&[]);

        let provider = EnvOrPrompt::new(
            EnvironmentProvider::with_vars("TCREST_TEST_ENV_ONLY_USER", "TCREST_TEST_ENV_ONLY_PASS"),
            &prompt,
        );
        let creds = provider.credentials().unwrap();

        assert_eq!(creds, Credentials::new("alice", "s3cret"));
        assert!(prompt.asked.borrow().is_empty());
    }

    #[test]
    fn test_prompts_for_both_and_trims_password() {
        let prompt = ScriptedPrompt::new(&["bob", "  hunter2 \t"]);

        let provider = EnvOrPrompt::new(
            EnvironmentProvider::with_vars("TCREST_TEST_UNSET_USER", "TCREST_TEST_UNSET_PASS"),
            &prompt,
        );
        let creds = provider.credentials().unwrap();

        assert_eq!(creds.username(), "bob");
        assert_eq!(creds.password(), "hunter2");

        let asked = prompt.asked.borrow();
        assert_eq!(asked.len(), 2);
        assert_eq!(asked[0], ("Enter TC username: ".to_string(), false));
        assert_eq!(
            asked[1],
            ("Please enter TeamCity password for bob:".to_string(), true)
        );
    }

    #[test]
    fn test_prompts_only_for_missing_password() {
        env::set_var("TCREST_TEST_PARTIAL_USER", "carol");
        let prompt = ScriptedPrompt::new(&["pw\n"]);

        let provider = EnvOrPrompt::new(
            EnvironmentProvider::with_vars("TCREST_TEST_PARTIAL_USER", "TCREST_TEST_PARTIAL_PASS"),
            &prompt,
        );
        let creds = provider.credentials().unwrap();

        assert_eq!(creds, Credentials::new("carol", "pw"));
        let asked = prompt.asked.borrow();
        assert_eq!(asked.len(), 1);
        assert!(asked[0].0.contains("carol"));
        assert!(asked[0].1);
    }

    #[test]
    fn test_environment_provider_reports_missing_variable() {
        let provider =
            EnvironmentProvider::with_vars("TCREST_TEST_MISSING_USER", "TCREST_TEST_MISSING_PASS");

        let err = provider.credentials().unwrap_err();
        assert!(matches!(err, TeamCityError::Credentials(_)));
        assert!(err.to_string().contains("TCREST_TEST_MISSING_USER"));
    }

    #[test]
    fn test_prompt_failure_surfaces_as_io_error() {
        let prompt = ScriptedPrompt::new(&[]);
        let provider = PromptProvider::new(&prompt);

        assert!(matches!(
            provider.credentials(),
            Err(TeamCityError::Io(_))
        ));
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let creds = StaticProvider::new("dave", "topsecret").credentials().unwrap();
        let debug = format!("{creds:?}");

        assert!(debug.contains("dave"));
        assert!(!debug.contains("topsecret"));
    }
}
