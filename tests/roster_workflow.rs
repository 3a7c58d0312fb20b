use chrono::{TimeZone, Utc};
use classroom_roster::adapters::import::parse_identifiers;
use classroom_roster::adapters::persistence::MemoryRepo;
use classroom_roster::domain::{DomainError, GithubAccount, Roster, SortMode};
use classroom_roster::ports::{AssignmentPort, RosterRepoPort, UserPort};
use classroom_roster::usecases::{ExportService, RosterService, RosterViewService};
use std::collections::HashMap;
use std::sync::Arc;

struct Fixture {
    repo: Arc<MemoryRepo>,
    rosters: RosterService,
    view: RosterViewService,
    export: ExportService,
}

impl Fixture {
    fn new() -> Self {
        let repo = Arc::new(MemoryRepo::new());
        Self {
            rosters: RosterService::new(repo.clone(), repo.clone()),
            view: RosterViewService::new(repo.clone(), repo.clone()),
            export: ExportService::new(repo.clone(), repo.clone(), repo.clone()),
            repo,
        }
    }

    async fn roster_with(&self, identifiers: &[&str]) -> Roster {
        let roster = self.rosters.create_roster("Intro to Rust").await.unwrap();
        let identifiers: Vec<String> = identifiers.iter().map(|s| s.to_string()).collect();
        self.rosters
            .create_entries(&identifiers, &roster, &[])
            .await
            .unwrap();
        roster
    }

    async fn link(&self, roster: &Roster, identifier: &str, github: Option<GithubAccount>) -> i64 {
        let entry = self
            .rosters
            .entries(roster.id)
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.identifier == identifier)
            .unwrap();
        let user = self.repo.create_user(github).await.unwrap();
        self.rosters.link_user(entry.id, user.id).await.unwrap();
        user.id
    }
}

fn names(entries: &[classroom_roster::domain::RosterEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.identifier.as_str()).collect()
}

#[tokio::test]
async fn test_import_file_then_reimport_suffixes_everything() {
    let fx = Fixture::new();
    let roster = fx.rosters.create_roster("CS 101").await.unwrap();
    let import = parse_identifiers("identifier,lms_user_id\nalice,1\nbob,2\nalice,3\n").unwrap();

    let first = fx
        .rosters
        .create_entries(&import.identifiers, &roster, &import.lms_user_ids)
        .await
        .unwrap();
    assert_eq!(names(&first), vec!["alice", "bob", "alice-1"]);
    assert_eq!(first[2].lms_user_id.as_deref(), Some("3"));

    let second = fx
        .rosters
        .create_entries(&import.identifiers, &roster, &[])
        .await
        .unwrap();
    assert_eq!(names(&second), vec!["alice-2", "bob-1", "alice-3"]);
    assert_eq!(fx.rosters.entries(roster.id).await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_rolled_back_batch_leaves_earlier_entries_intact() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["zoe"]).await;
    fx.repo.fail_on_identifier("bad").await;

    let batch: Vec<String> = ["amy", "bad", "cy"].iter().map(|s| s.to_string()).collect();
    let err = fx.rosters.create_entries(&batch, &roster, &[]).await.unwrap_err();

    assert!(matches!(err, DomainError::IdentifierCreation { .. }));
    assert_eq!(names(&fx.rosters.entries(roster.id).await.unwrap()), vec!["zoe"]);
}

#[tokio::test]
async fn test_order_for_view_accepted_linked_unlinked() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["unlinked", "linked", "accepted"]).await;
    fx.link(&roster, "linked", None).await;
    let accepted_user = fx.link(&roster, "accepted", None).await;
    fx.repo
        .record_assignment_repo(7, accepted_user, Utc::now())
        .await
        .unwrap();

    let ordered = fx.view.order_for_view(roster.id, 7).await.unwrap();
    assert_eq!(names(&ordered), vec!["accepted", "linked", "unlinked"]);

    // Another assignment: nobody accepted it, so linked entries share rank 1.
    let ordered = fx.view.order_for_view(roster.id, 8).await.unwrap();
    assert_eq!(names(&ordered), vec!["linked", "accepted", "unlinked"]);
}

#[tokio::test]
async fn test_sort_modes_and_search() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["carol", "Alice", "bob", "alicia"]).await;
    let bob = fx.link(&roster, "bob", None).await;
    let carol = fx.link(&roster, "carol", None).await;
    let at = |s| Utc.timestamp_opt(s, 0).unwrap();
    fx.repo.record_assignment_repo(1, bob, at(2_000)).await.unwrap();
    fx.repo.record_assignment_repo(1, carol, at(1_000)).await.unwrap();

    let by_id = fx
        .view
        .sorted_entries(roster.id, SortMode::StudentIdentifier, None)
        .await
        .unwrap();
    assert_eq!(names(&by_id), vec!["Alice", "alicia", "bob", "carol"]);

    let by_repo = fx
        .view
        .sorted_entries(roster.id, SortMode::RepoCreatedAt, Some(1))
        .await
        .unwrap();
    assert_eq!(names(&by_repo), vec!["carol", "bob", "Alice", "alicia"]);

    let hits = fx
        .view
        .search(roster.id, "ALI", SortMode::StudentIdentifier, None)
        .await
        .unwrap();
    assert_eq!(names(&hits), vec!["Alice", "alicia"]);
}

#[tokio::test]
async fn test_students_not_on_team_excludes_team_members() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["a", "b", "c"]).await;
    let a = fx.link(&roster, "a", None).await;
    fx.link(&roster, "b", None).await;
    fx.repo.record_team_access(3, "Team A", a).await.unwrap();

    let free = fx.view.students_not_on_team(roster.id, 3).await.unwrap();
    assert_eq!(names(&free), vec!["b", "c"]);
}

#[tokio::test]
async fn test_csv_export_of_empty_and_unlinked_rosters() {
    let fx = Fixture::new();
    let empty = fx.rosters.create_roster("empty").await.unwrap();
    let csv = fx.export.export_roster(empty.id, &HashMap::new()).await.unwrap();
    assert_eq!(csv.lines().count(), 1);

    let roster = fx.roster_with(&["solo"]).await;
    let csv = fx.export.export_roster(roster.id, &HashMap::new()).await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "\"solo\",\"\",\"\",\"\"");
}

#[tokio::test]
async fn test_csv_export_with_accounts_and_groups() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["ben", "ava"]).await;
    let ava = fx
        .link(
            &roster,
            "ava",
            Some(GithubAccount {
                github_id: 314,
                login: "ava-codes".to_string(),
                name: Some("Ava L".to_string()),
            }),
        )
        .await;
    let mut groups = HashMap::new();
    groups.insert(ava, "Lambdas".to_string());

    let csv = fx.export.export_roster(roster.id, &groups).await.unwrap();
    assert_eq!(
        csv,
        concat!(
            "\"identifier\",\"github_username\",\"github_id\",\"name\",\"group_name\"\n",
            "\"ava\",\"ava-codes\",\"314\",\"Ava L\",\"Lambdas\"\n",
            "\"ben\",\"\",\"\",\"\",\"\"\n",
        )
    );
}

#[tokio::test]
async fn test_deleting_linked_user_removes_entry() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["a", "b"]).await;
    let a = fx.link(&roster, "a", None).await;

    fx.repo.delete_user(a).await.unwrap();

    assert_eq!(names(&fx.rosters.entries(roster.id).await.unwrap()), vec!["b"]);
}

#[tokio::test]
async fn test_remove_entry_and_delete_roster() {
    let fx = Fixture::new();
    let roster = fx.roster_with(&["a", "b"]).await;
    let a = fx.rosters.entries(roster.id).await.unwrap()[0].id;

    fx.rosters.remove_entry(a).await.unwrap();
    assert_eq!(names(&fx.rosters.entries(roster.id).await.unwrap()), vec!["b"]);
    assert!(fx.repo.find_entry(a).await.unwrap().is_none());

    fx.rosters.delete_roster(roster.id).await.unwrap();
    assert!(matches!(
        fx.rosters.roster(roster.id).await,
        Err(DomainError::NotFound { kind: "roster", .. })
    ));
    assert!(fx.rosters.entries(roster.id).await.unwrap().is_empty());
}
