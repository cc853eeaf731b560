use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::error::Result;

/// Reason reported for a mute that carries no assignment text.
pub const NO_COMMENT: &str = "No comment";

/// Test name to mute reason, in the order the server listed them.
pub type MutedTests = IndexMap<String, String>;

/// Body of `GET mutes/?locator=...`.
#[derive(Debug, Default, Deserialize)]
pub struct MutesResponse {
    #[serde(default)]
    pub mute: Vec<Mute>,
}

/// A single mute; only the fields used for the name/reason mapping are read.
#[derive(Debug, Deserialize)]
pub struct Mute {
    pub id: Option<i64>,
    #[serde(default)]
    pub target: MuteTarget,
    pub assignment: Option<MuteAssignment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MuteTarget {
    #[serde(default)]
    pub tests: TestList,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestList {
    #[serde(default)]
    pub test: Vec<TestRef>,
}

#[derive(Debug, Deserialize)]
pub struct TestRef {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MuteAssignment {
    pub text: Option<String>,
}

impl Mute {
    /// Name of the first affected test.
    pub fn test_name(&self) -> Option<&str> {
        self.target.tests.test.first().map(|t| t.name.as_str())
    }

    pub fn reason(&self) -> &str {
        self.assignment
            .as_ref()
            .and_then(|a| a.text.as_deref())
            .unwrap_or(NO_COMMENT)
    }
}

impl MutesResponse {
    /// Maps each mute's first test name to its reason. Later mutes of the same
    /// test overwrite earlier ones.
    pub fn muted_tests(&self) -> MutedTests {
        let mut muted = MutedTests::new();
        for mute in &self.mute {
            match mute.test_name() {
                Some(name) => {
                    muted.insert(name.to_string(), mute.reason().to_string());
                }
                None => debug!("Skipping mute {:?} without affected tests", mute.id),
            }
        }
        muted
    }
}

/// Parses a mutes response body into a [`MutedTests`] map.
pub fn parse_muted_tests(body: &str) -> Result<MutedTests> {
    let response: MutesResponse = serde_json::from_str(body)?;
    Ok(response.muted_tests())
}
