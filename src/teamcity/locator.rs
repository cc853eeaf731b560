//! Resource paths for the TeamCity REST API, relative to `app/rest/`.
//!
//! Locator syntax belongs to the server; values are inserted verbatim and
//! percent-encoding is left to URL resolution.

pub const DEFAULT_BRANCH: &str = "<default>";
pub const DEFAULT_BUILD_COUNT: u32 = 10;
pub const BUILD_TESTS_LIMIT: u32 = 500;

pub fn projects() -> String {
    "projects".to_string()
}

pub fn build_types() -> String {
    "buildTypes".to_string()
}

pub fn builds_by_branch(build_type_id: &str, branch_name: &str, count: u32) -> String {
    format!("builds/?locator=buildType:(id:{build_type_id}),branch:name:{branch_name},count:{count}")
}

pub fn build_type(build_type_id: &str) -> String {
    format!("buildTypes/id:{build_type_id}")
}

pub fn test_history(test_id: &str) -> String {
    format!("testOccurrences?locator=test:id:{test_id}")
}

pub fn build_tests(build_id: &str) -> String {
    format!("testOccurrences?locator=build:(id:{build_id}),count:{BUILD_TESTS_LIMIT}")
}

pub fn project_mutes(build_type_id: &str) -> String {
    format!("mutes/?locator=affectedProject:(buildType:(id:{build_type_id}))")
}
