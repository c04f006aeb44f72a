use super::*;

#[test]
fn test_parse_gh_pr_list_output() {
    // `gh pr list --json number,title,state` uses uppercase states
    let json = r#"[
        {"number": 12, "title": "PRKit Pull Request", "state": "OPEN"},
        {"number": 9, "title": "older change", "state": "MERGED"}
    ]"#;

    let pulls: Vec<PullRequest> = serde_json::from_str(json).unwrap();

    assert_eq!(pulls.len(), 2);
    assert_eq!(pulls[0].number, 12);
    assert_eq!(pulls[0].title, "PRKit Pull Request");
    assert_eq!(pulls[0].state, PullRequestState::Open);
    assert_eq!(pulls[1].state, PullRequestState::Merged);
}

#[test]
fn test_parse_rest_api_pull_request() {
    // `gh api repos/.../pulls -X POST` returns the REST representation with
    // lowercase states and many extra fields we ignore
    let json = r#"{
        "number": 42,
        "title": "T",
        "state": "open",
        "html_url": "https://github.com/livingsocial/crispy-duck/pull/42",
        "draft": false
    }"#;

    let pull: PullRequest = serde_json::from_str(json).unwrap();

    assert_eq!(pull.number, 42);
    assert_eq!(pull.state, PullRequestState::Open);
}

#[test]
fn test_parse_fork_response() {
    let json = r#"{"full_name": "someone/crispy-duck", "ssh_url": "git@github.com:someone/crispy-duck.git"}"#;

    let fork: ForkInfo = serde_json::from_str(json).unwrap();

    assert_eq!(fork.ssh_url, "git@github.com:someone/crispy-duck.git");
}

#[test]
fn test_state_query_values() {
    assert_eq!(PullRequestState::Open.as_query(), "open");
    assert_eq!(PullRequestState::Closed.as_query(), "closed");
    assert_eq!(PullRequestState::Merged.as_query(), "merged");
}

#[test]
fn test_mock_create_assigns_sequential_numbers() {
    let github = MockGitHub::new();

    let first = github
        .create_pull_request("livingsocial/crispy-duck", "master", "someone:prkit", "T")
        .unwrap();
    let second = github
        .create_pull_request("livingsocial/crispy-duck", "master", "someone:prkit", "U")
        .unwrap();

    assert_eq!(first.number, 1);
    assert_eq!(second.number, 2);
    assert_eq!(github.open_pulls().len(), 2);
}

#[test]
fn test_mock_close_moves_pr_out_of_open() {
    let github = MockGitHub::new().with_open_pr("T");
    let number = github.open_pulls()[0].number;

    github
        .close_pull_request("livingsocial/crispy-duck", number)
        .unwrap();

    assert!(github.open_pulls().is_empty());
    let closed = github
        .list_pull_requests("livingsocial/crispy-duck", PullRequestState::Closed)
        .unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].title, "T");
}

#[test]
fn test_mock_close_unknown_number_is_an_error() {
    let github = MockGitHub::new();

    let result = github.close_pull_request("livingsocial/crispy-duck", 7);

    assert!(result.is_err());
}

#[test]
fn test_mock_fork_records_repo_and_returns_ssh_url() {
    let github = MockGitHub::new();

    let fork = github.fork_repository("livingsocial/crispy-duck").unwrap();

    assert_eq!(fork.ssh_url, github.fork_ssh_url);
    assert_eq!(github.forked_repos(), vec!["livingsocial/crispy-duck"]);
}
