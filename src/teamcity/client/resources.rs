use log::info;
use reqwest::Response;

use super::core::TeamCityClient;
use crate::error::{Result, TeamCityError};
use crate::teamcity::locator;
use crate::teamcity::types::{parse_muted_tests, MutedTests};

impl TeamCityClient {
    pub async fn get_projects(&self) -> Result<Response> {
        self.get(&locator::projects()).await
    }

    pub async fn get_buildtypes(&self) -> Result<Response> {
        self.get(&locator::build_types()).await
    }

    /// Latest builds of a build type on one branch.
    ///
    /// `branch_name` defaults to the server's default branch and `count`
    /// to 10.
    pub async fn get_builds_by_branch(
        &self,
        buildtype_id: &str,
        branch_name: Option<&str>,
        count: Option<u32>,
    ) -> Result<Response> {
        let path = locator::builds_by_branch(
            buildtype_id,
            branch_name.unwrap_or(locator::DEFAULT_BRANCH),
            count.unwrap_or(locator::DEFAULT_BUILD_COUNT),
        );
        self.get(&path).await
    }

    pub async fn get_build_information_by_id(&self, build_id: &str) -> Result<Response> {
        self.get(&locator::build_type(build_id)).await
    }

    pub async fn get_test_history_by_id(&self, test_id: &str) -> Result<Response> {
        self.get(&locator::test_history(test_id)).await
    }

    /// Test occurrences of one build, capped at 500.
    pub async fn get_tests_from_build(&self, build_id: &str) -> Result<Response> {
        self.get(&locator::build_tests(build_id)).await
    }

    /// Muted tests of the project owning `build_id`, as test name to reason.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body is not a mutes document.
    pub async fn get_muted_tests_in_project(&self, build_id: &str) -> Result<MutedTests> {
        let response = self.get(&locator::project_mutes(build_id)).await?;

        let status = response.status();
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|source| TeamCityError::Transport { url, source })?;

        if !status.is_success() {
            return Err(TeamCityError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let muted = parse_muted_tests(&body)?;
        info!("Found {} muted tests for {}", muted.len(), build_id);
        Ok(muted)
    }
}
