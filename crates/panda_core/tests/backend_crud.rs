use panda_core::{
    Backend, BackendFilter, BackendListQuery, BackendRepository, BackendValidationError,
    DocumentBackendRepository, RepoError, StoreConfig,
};
use serde_json::json;
use uuid::Uuid;

fn memory_repo() -> DocumentBackendRepository {
    let config = StoreConfig::memory(format!("backend-crud-{}", Uuid::new_v4()));
    DocumentBackendRepository::connect(config).expect("in-memory repository should open")
}

fn backend(name: &str, kind: &str, region: &str) -> Backend {
    let mut backend = Backend::new(name);
    backend.kind = Some(kind.to_string());
    backend.region = Some(region.to_string());
    backend
}

#[test]
fn create_without_id_assigns_generated_id() {
    let repo = memory_repo();

    let created = repo.create_backend(Backend::new("s3-east")).unwrap();
    let id = created.id.expect("create must assign an id");
    assert!(!id.is_nil());
    assert!(!id.to_string().is_empty());
}

#[test]
fn create_keeps_caller_supplied_id() {
    let repo = memory_repo();
    let id = Uuid::parse_str("00000000-0000-4000-8000-000000000042").unwrap();

    let created = repo.create_backend(Backend::with_id(id, "fixed")).unwrap();
    assert_eq!(created.id, Some(id));
    assert_eq!(repo.get_backend(id).unwrap().name.as_deref(), Some("fixed"));
}

#[test]
fn create_and_get_roundtrip() {
    let repo = memory_repo();

    let mut input = backend("archive", "aws-s3", "us-east-1");
    input.tenant_id = Some("tenant-a".into());
    input.endpoint = Some("https://s3.amazonaws.com".into());
    input.bucket_name = Some("cold-data".into());
    input.access = Some("AKIA".into());
    input.security = Some("secret".into());
    input.set_extra("capacity", json!({"gb": 512, "tier": "glacier"}));

    let created = repo.create_backend(input).unwrap();
    let loaded = repo.get_backend(created.id.unwrap()).unwrap();

    assert_eq!(loaded, created);
}

#[test]
fn create_with_duplicate_id_surfaces_store_error() {
    let repo = memory_repo();
    let first = repo.create_backend(Backend::new("one")).unwrap();

    let duplicate = Backend::with_id(first.id.unwrap(), "two");
    let err = repo.create_backend(duplicate).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let loaded = repo.get_backend(first.id.unwrap()).unwrap();
    assert_eq!(loaded.name.as_deref(), Some("one"));
}

#[test]
fn get_missing_returns_not_found() {
    let repo = memory_repo();
    let id = Uuid::new_v4();

    let err = repo.get_backend(id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn delete_then_get_returns_not_found() {
    let repo = memory_repo();
    let created = repo.create_backend(Backend::new("short-lived")).unwrap();
    let id = created.id.unwrap();

    repo.delete_backend(id).unwrap();

    let err = repo.get_backend(id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn delete_missing_returns_not_found() {
    let repo = memory_repo();
    let id = Uuid::new_v4();

    let err = repo.delete_backend(id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn update_replaces_whole_document() {
    let repo = memory_repo();
    let mut created = repo
        .create_backend(backend("primary", "aws-s3", "us-east-1"))
        .unwrap();

    created.region = None;
    created.endpoint = Some("https://minio.local".into());
    created.set_extra("weight", 3);
    let updated = repo.update_backend(created.clone()).unwrap();
    assert_eq!(updated, created);

    let loaded = repo.get_backend(created.id.unwrap()).unwrap();
    assert_eq!(loaded.region, None);
    assert_eq!(loaded.endpoint.as_deref(), Some("https://minio.local"));
    assert_eq!(loaded.extra.get("weight"), Some(&json!(3)));
}

#[test]
fn update_missing_returns_not_found() {
    let repo = memory_repo();
    let ghost = Backend::with_id(Uuid::new_v4(), "ghost");

    let err = repo.update_backend(ghost.clone()).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if Some(id) == ghost.id));
}

#[test]
fn update_without_id_is_rejected() {
    let repo = memory_repo();

    let err = repo.update_backend(Backend::new("anonymous")).unwrap_err();
    assert!(matches!(err, RepoError::MissingId));
}

#[test]
fn extra_fields_shadowing_named_fields_are_rejected_on_write() {
    let repo = memory_repo();
    let kept = repo.create_backend(backend("kept", "aws-s3", "eu")).unwrap();

    let mut shadowed = Backend::new("shadowed");
    shadowed.set_extra("name", "second name");
    let err = repo.create_backend(shadowed).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(BackendValidationError::ReservedExtraField(ref key)) if key == "name"
    ));

    let mut edited = kept.clone();
    edited.set_extra("type", "gcs");
    let err = repo.update_backend(edited).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(BackendValidationError::ReservedExtraField(ref key)) if key == "type"
    ));

    let all = repo.list_backends(&BackendListQuery::default()).unwrap();
    assert_eq!(all, vec![kept.clone()]);
    assert_eq!(repo.get_backend(kept.id.unwrap()).unwrap(), kept);
}

#[test]
fn documents_with_shadowing_keys_read_back_as_named_fields() {
    let repo = memory_repo();
    let parsed: Backend = serde_json::from_value(json!({
        "name": "from-json",
        "bucketName": "logs",
        "zone": "c"
    }))
    .expect("fixture should parse");
    assert!(parsed.extra.get("bucketName").is_none());

    let created = repo.create_backend(parsed).unwrap();
    let loaded = repo.get_backend(created.id.unwrap()).unwrap();
    assert_eq!(loaded.bucket_name.as_deref(), Some("logs"));
    assert_eq!(loaded.extra.get("zone"), Some(&json!("c")));
}

#[test]
fn list_with_zero_limit_returns_everything_in_insertion_order() {
    let repo = memory_repo();
    let names = ["a", "b", "c", "d", "e"];
    for name in names {
        repo.create_backend(Backend::new(name)).unwrap();
    }

    let all = repo.list_backends(&BackendListQuery::default()).unwrap();
    let listed: Vec<_> = all.iter().filter_map(|b| b.name.as_deref()).collect();
    assert_eq!(listed, names);
}

#[test]
fn list_applies_limit_and_offset() {
    let repo = memory_repo();
    for name in ["a", "b", "c", "d", "e"] {
        repo.create_backend(Backend::new(name)).unwrap();
    }

    let page = repo
        .list_backends(&BackendListQuery {
            limit: 2,
            offset: 1,
            ..BackendListQuery::default()
        })
        .unwrap();
    let listed: Vec<_> = page.iter().filter_map(|b| b.name.as_deref()).collect();
    assert_eq!(listed, ["b", "c"]);

    let tail = repo
        .list_backends(&BackendListQuery {
            offset: 3,
            ..BackendListQuery::default()
        })
        .unwrap();
    let listed: Vec<_> = tail.iter().filter_map(|b| b.name.as_deref()).collect();
    assert_eq!(listed, ["d", "e"]);

    let past_end = repo
        .list_backends(&BackendListQuery {
            limit: 10,
            offset: 10,
            ..BackendListQuery::default()
        })
        .unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn list_filters_by_named_fields() {
    let repo = memory_repo();
    repo.create_backend(backend("east", "aws-s3", "us-east-1"))
        .unwrap();
    repo.create_backend(backend("west", "aws-s3", "us-west-2"))
        .unwrap();
    repo.create_backend(backend("blob", "azure-blob", "us-east-1"))
        .unwrap();

    let query = BackendListQuery {
        filter: BackendFilter::new()
            .eq("type", "aws-s3")
            .eq("region", "us-east-1"),
        ..BackendListQuery::default()
    };
    let matched = repo.list_backends(&query).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name.as_deref(), Some("east"));

    let by_type = BackendListQuery {
        filter: BackendFilter::from_json(json!({"type": "aws-s3"})).unwrap(),
        ..BackendListQuery::default()
    };
    assert_eq!(repo.list_backends(&by_type).unwrap().len(), 2);
}

#[test]
fn list_filters_by_extra_and_nested_fields() {
    let repo = memory_repo();

    let mut hot = Backend::new("hot");
    hot.set_extra("weight", 3);
    hot.set_extra("enabled", true);
    hot.set_extra("capacity", json!({"tier": "ssd"}));
    repo.create_backend(hot).unwrap();

    let mut cold = Backend::new("cold");
    cold.set_extra("weight", 1);
    cold.set_extra("enabled", false);
    cold.set_extra("capacity", json!({"tier": "hdd"}));
    repo.create_backend(cold).unwrap();

    let names = |filter: BackendFilter| -> Vec<String> {
        repo.list_backends(&BackendListQuery {
            filter,
            ..BackendListQuery::default()
        })
        .unwrap()
        .into_iter()
        .filter_map(|b| b.name)
        .collect()
    };

    assert_eq!(names(BackendFilter::new().eq("weight", 3)), ["hot"]);
    assert_eq!(names(BackendFilter::new().eq("enabled", false)), ["cold"]);
    assert_eq!(names(BackendFilter::new().eq("capacity.tier", "hdd")), ["cold"]);
    assert_eq!(
        names(BackendFilter::new().eq("capacity", json!({"tier": "ssd"}))),
        ["hot"]
    );
    assert_eq!(
        names(BackendFilter::new().eq("endpoint", serde_json::Value::Null)),
        ["hot", "cold"]
    );
    assert!(names(BackendFilter::new().eq("weight", "3")).is_empty());
}

#[test]
fn list_with_zero_limit_and_filter_returns_all_matches() {
    let repo = memory_repo();
    for index in 0..12 {
        let kind = if index % 3 == 0 { "ceph" } else { "aws-s3" };
        repo.create_backend(backend(&format!("b{index}"), kind, "eu"))
            .unwrap();
    }

    let query = BackendListQuery {
        limit: 0,
        filter: BackendFilter::new().eq("type", "ceph"),
        ..BackendListQuery::default()
    };
    assert_eq!(repo.list_backends(&query).unwrap().len(), 4);
}

#[test]
fn list_rejects_invalid_filter_path() {
    let repo = memory_repo();

    let query = BackendListQuery {
        filter: BackendFilter::new().eq("capacity..tier", "ssd"),
        ..BackendListQuery::default()
    };
    let err = repo.list_backends(&query).unwrap_err();
    assert!(matches!(err, RepoError::InvalidFilter(_)));
}

#[test]
fn repository_works_through_trait_object() {
    let repo: Box<dyn BackendRepository> = Box::new(memory_repo());

    let created = repo.create_backend(Backend::new("boxed")).unwrap();
    let loaded = repo.get_backend(created.id.unwrap()).unwrap();
    assert_eq!(loaded.name.as_deref(), Some("boxed"));
    repo.close().unwrap();
}
