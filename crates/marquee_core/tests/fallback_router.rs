use marquee_core::db::open_db_in_memory;
use marquee_core::{
    CatalogGateway, CatalogService, ListFilter, Movie, MoviePatch, MovieValidationError,
    OverlayRepository, RemoteError, RemoteResult, ServiceError, SqliteOverlayRepository,
    WriteOutcome,
};
use serde_json::json;

/// Scripted remote double: every write answers with the same scripted
/// failure (or success), reads answer from fixed fixtures.
#[derive(Default)]
struct ScriptedGateway {
    write_script: WriteScript,
    list: RemoteResultScript<Vec<Movie>>,
    detail: RemoteResultScript<Option<Movie>>,
}

#[derive(Default, Clone, Copy)]
enum WriteScript {
    #[default]
    Ok,
    Transport,
    Status(u16),
    Decode,
}

enum RemoteResultScript<T> {
    Ok(T),
    Transport,
}

impl<T: Default> Default for RemoteResultScript<T> {
    fn default() -> Self {
        Self::Ok(T::default())
    }
}

impl<T: Clone> RemoteResultScript<T> {
    fn play(&self) -> RemoteResult<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Transport => Err(RemoteError::Transport("connection refused".to_string())),
        }
    }
}

impl ScriptedGateway {
    fn writes(script: WriteScript) -> Self {
        Self {
            write_script: script,
            ..Self::default()
        }
    }

    fn play_write(&self) -> RemoteResult<()> {
        match self.write_script {
            WriteScript::Ok => Ok(()),
            WriteScript::Transport => {
                Err(RemoteError::Transport("connection refused".to_string()))
            }
            WriteScript::Status(status) => Err(RemoteError::Status {
                status,
                body: "write rejected".to_string(),
            }),
            WriteScript::Decode => Err(RemoteError::Decode("body was not JSON".to_string())),
        }
    }
}

impl CatalogGateway for ScriptedGateway {
    fn list_query(&self, _filter: &ListFilter) -> RemoteResult<Vec<Movie>> {
        self.list.play()
    }

    fn get_by_id(&self, _id: &str) -> RemoteResult<Option<Movie>> {
        self.detail.play()
    }

    fn create(&self, _movie: &Movie) -> RemoteResult<()> {
        self.play_write()
    }

    fn update_by_id(&self, _id: &str, _patch: &MoviePatch) -> RemoteResult<()> {
        self.play_write()
    }

    fn delete_by_id(&self, _id: &str) -> RemoteResult<()> {
        self.play_write()
    }
}

fn movie(value: serde_json::Value) -> Movie {
    serde_json::from_value(value).unwrap()
}

fn patch(value: serde_json::Value) -> MoviePatch {
    serde_json::from_value(value).unwrap()
}

#[test]
fn remote_success_leaves_the_overlay_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Ok));

    let outcome = service
        .create_movie(&movie(json!({"imdbID": "80001", "Title": "new"})))
        .unwrap();

    assert!(matches!(outcome, WriteOutcome::RemoteSuccess { .. }));
    assert!(outcome.message().contains("80001"));
    assert!(service.overlay().get_adds().unwrap().is_empty());
}

#[test]
fn transport_failure_on_update_falls_back_to_a_stored_override() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Transport));

    let payload = patch(json!({"Title": "edited", "Year": "2024"}));
    let outcome = service.update_movie("80001", &payload).unwrap();

    assert!(outcome.is_local());
    assert!(outcome.message().contains("80001"));
    assert!(outcome.message().contains("network unreachable"));

    let overrides = service.overlay().get_overrides().unwrap();
    assert_eq!(overrides["80001"], payload);
}

#[test]
fn any_status_failure_on_update_is_blocked() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Status(500)));

    let outcome = service
        .update_movie("80001", &patch(json!({"Title": "edited"})))
        .unwrap();

    assert!(outcome.is_local());
    assert!(outcome.message().contains("HTTP 500"));
}

#[test]
fn decode_failure_on_update_propagates_and_stores_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Decode));

    let err = service
        .update_movie("80001", &patch(json!({"Title": "edited"})))
        .unwrap_err();

    assert!(matches!(err, ServiceError::Remote(RemoteError::Decode(_))));
    assert!(service.overlay().get_overrides().unwrap().is_empty());
}

#[test]
fn create_falls_back_only_on_403_and_405() {
    for status in [403u16, 405] {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
        let service =
            CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Status(status)));

        let outcome = service
            .create_movie(&movie(json!({"imdbID": "90001", "Title": "local only"})))
            .unwrap();

        assert!(outcome.is_local());
        assert_eq!(
            service
                .overlay()
                .get_add("90001")
                .unwrap()
                .unwrap()
                .title
                .as_deref(),
            Some("local only")
        );
    }

    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Status(400)));

    let err = service
        .create_movie(&movie(json!({"imdbID": "90001", "Title": "rejected"})))
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Remote(RemoteError::Status { status: 400, .. })
    ));
    assert!(service.overlay().get_adds().unwrap().is_empty());
}

#[test]
fn delete_falls_back_to_tombstone_on_blocked_statuses_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Status(405)));

    let outcome = service.delete_movie("80001").unwrap();
    assert!(outcome.is_local());
    assert!(service.overlay().is_deleted("80001").unwrap());

    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Status(500)));

    let err = service.delete_movie("80001").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Remote(RemoteError::Status { status: 500, .. })
    ));
    assert!(!service.overlay().is_deleted("80001").unwrap());
}

#[test]
fn create_without_identifier_fails_validation_before_any_remote_call() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Ok));

    let err = service
        .create_movie(&movie(json!({"Title": "orphan"})))
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Validation(MovieValidationError::MissingId)
    ));
}

#[test]
fn fetch_list_propagates_remote_failure() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let gateway = ScriptedGateway {
        list: RemoteResultScript::Transport,
        ..ScriptedGateway::default()
    };
    let service = CatalogService::new(repo, gateway);

    let err = service.fetch_list(&ListFilter::default()).unwrap_err();
    assert!(matches!(err, ServiceError::Remote(RemoteError::Transport(_))));
}

#[test]
fn fetch_list_merges_remote_records_with_the_overlay() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    repo.add_movie(&movie(json!({"imdbID": "2", "Title": "local"}))).unwrap();

    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let gateway = ScriptedGateway {
        list: RemoteResultScript::Ok(vec![movie(json!({"imdbID": "1", "Title": "remote"}))]),
        ..ScriptedGateway::default()
    };
    let service = CatalogService::new(repo, gateway);

    let composed = service.fetch_list(&ListFilter::default()).unwrap();
    assert_eq!(composed.len(), 2);
    assert_eq!(composed[0].imdb_id, "2");
    assert_eq!(composed[1].imdb_id, "1");
}

#[test]
fn fetch_detail_degrades_to_the_local_add_when_remote_is_down() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    repo.add_movie(&movie(json!({"imdbID": "7", "Title": "local only"}))).unwrap();

    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let gateway = ScriptedGateway {
        detail: RemoteResultScript::Transport,
        ..ScriptedGateway::default()
    };
    let service = CatalogService::new(repo, gateway);

    let detail = service.fetch_detail("7").unwrap().unwrap();
    assert_eq!(detail.title.as_deref(), Some("local only"));

    assert!(service.fetch_detail("unknown").unwrap().is_none());
}

#[test]
fn stage_edit_updates_the_add_itself_for_locally_created_records() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    repo.add_movie(&movie(json!({"imdbID": "5", "Title": "draft", "Year": "2020"})))
        .unwrap();

    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Ok));

    let message = service.stage_edit("5", &patch(json!({"Title": "final"}))).unwrap();
    assert!(message.contains("5"));

    let stored = service.overlay().get_add("5").unwrap().unwrap();
    assert_eq!(stored.title.as_deref(), Some("final"));
    assert_eq!(stored.year.as_deref(), Some("2020"));
    // No override was created; the add itself absorbed the edit.
    assert!(service.overlay().get_overrides().unwrap().is_empty());
}

#[test]
fn stage_edit_stores_an_override_for_remote_records() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Ok));

    service.stage_edit("80001", &patch(json!({"Title": "renamed"}))).unwrap();

    assert_eq!(
        service.overlay().get_overrides().unwrap()["80001"]
            .title
            .as_deref(),
        Some("renamed")
    );
}

#[test]
fn discard_local_removes_adds_outright_but_tombstones_remote_records() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    repo.add_movie(&movie(json!({"imdbID": "5", "Title": "local"}))).unwrap();

    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Ok));

    let message = service.discard_local("5").unwrap();
    assert!(message.contains("Removed locally added"));
    assert!(service.overlay().get_add("5").unwrap().is_none());
    assert!(!service.overlay().is_deleted("5").unwrap());

    let message = service.discard_local("80001").unwrap();
    assert!(message.contains("marked as deleted"));
    assert!(service.overlay().is_deleted("80001").unwrap());
}

#[test]
fn restore_and_reset_round_out_the_admin_surface() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOverlayRepository::try_new(&conn).unwrap();
    let service = CatalogService::new(repo, ScriptedGateway::writes(WriteScript::Ok));

    service.discard_local("80001").unwrap();
    assert!(service.overlay().is_deleted("80001").unwrap());

    service.restore("80001").unwrap();
    assert!(!service.overlay().is_deleted("80001").unwrap());

    service.stage_edit("1", &patch(json!({"Title": "x"}))).unwrap();
    let message = service.reset_local().unwrap();
    assert!(message.contains("Cleared"));
    assert!(service.overlay().get_overrides().unwrap().is_empty());

    let err = service.restore("  ").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(MovieValidationError::MissingId)
    ));
}
