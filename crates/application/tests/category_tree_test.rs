//! Tree-consistency tests for the category manager.
//!
//! Every scenario runs against both the in-memory and the SQLite store.

use application::CategoryApp;
use domain::{Category, CategoryId, DomainError, ListQuery};
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;

fn sqlite_app(temp_dir: &TempDir) -> CategoryApp {
    let db_path = temp_dir.path().join("tree.db");
    CategoryApp::new(db_path.to_str().unwrap()).unwrap()
}

fn payload(name: &str, parent: Value) -> Value {
    json!({
        "name": name,
        "parentId": parent,
        "description": "A category used in tree tests",
        "status": "active"
    })
}

async fn root(app: &CategoryApp, name: &str) -> Category {
    app.categories.create(&payload(name, Value::Null)).await.unwrap()
}

async fn child(app: &CategoryApp, name: &str, parent: &Category) -> Category {
    app.categories
        .create(&payload(name, json!(parent.id.to_string())))
        .await
        .unwrap()
}

async fn reload(app: &CategoryApp, id: CategoryId) -> Category {
    app.store().find_by_id(id).await.unwrap().unwrap()
}

async fn exists(app: &CategoryApp, id: CategoryId) -> bool {
    app.store().find_by_id(id).await.unwrap().is_some()
}

async fn reparent(app: &CategoryApp, category: &Category, parent: Value) -> Result<Category, DomainError> {
    app.categories
        .update(&category.id.to_string(), &json!({ "parentId": parent }))
        .await
}

/// Every parent link is mirrored by exactly one `children` entry and vice versa.
async fn assert_links_consistent(app: &CategoryApp, ids: &[CategoryId]) {
    let categories = app.store().find_by_ids(ids).await.unwrap();
    let by_id: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    for category in &categories {
        let listed_in: Vec<CategoryId> = categories
            .iter()
            .filter(|other| other.children.contains(&category.id))
            .map(|other| other.id)
            .collect();
        match category.parent_id {
            None => assert!(listed_in.is_empty(), "root {} listed as a child", category.name),
            Some(parent_id) => {
                assert_eq!(listed_in, vec![parent_id], "{} has wrong parent listing", category.name);
                let parent = by_id[&parent_id];
                let occurrences = parent.children.iter().filter(|id| **id == category.id).count();
                assert_eq!(occurrences, 1);
            }
        }
        for child_id in &category.children {
            let child = by_id
                .get(child_id)
                .unwrap_or_else(|| panic!("{} lists missing child", category.name));
            assert_eq!(child.parent_id, Some(category.id));
        }
    }
}

async fn creates_root_and_child(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    assert!(electronics.children.is_empty());
    assert!(electronics.is_root());

    let laptops = child(app, "Laptops", &electronics).await;
    assert_eq!(laptops.parent_id, Some(electronics.id));

    let electronics = reload(app, electronics.id).await;
    assert_eq!(electronics.children, vec![laptops.id]);

    let node = app
        .categories
        .get_by_id(&electronics.id.to_string())
        .await
        .unwrap();
    assert_eq!(node.child_nodes()[0].category.name, "Laptops");

    assert_links_consistent(app, &[electronics.id, laptops.id]).await;
}

async fn missing_parent_fails_without_persisting(app: &CategoryApp) {
    let ghost = uuid::Uuid::new_v4().to_string();
    let err = app
        .categories
        .create(&payload("Orphans", json!(ghost)))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::NotFound("No parent found, please check parentId".to_string()));

    let err = app.categories.search("orphan").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

async fn omitted_parent_is_rejected(app: &CategoryApp) {
    let err = app
        .categories
        .create(&json!({
            "name": "Electronics",
            "description": "A category used in tree tests",
            "status": "active"
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidRequest(_)));

    let err = app.categories.get_all(&ListQuery::default()).await.unwrap_err();
    assert_eq!(err, DomainError::NotFound("No categories found".to_string()));
}

async fn malformed_parent_id_is_a_cast_error(app: &CategoryApp) {
    let err = app
        .categories
        .create(&payload("Electronics", json!("12345")))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::InvalidId {
            field: "parentId".to_string(),
            value: "12345".to_string()
        }
    );
}

async fn self_parent_is_rejected(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;

    let err = reparent(app, &electronics, json!(electronics.id.to_string()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::InvalidRequest("A category cannot be its own parent".to_string())
    );
    assert_eq!(reload(app, electronics.id).await, electronics);
}

async fn moving_under_a_descendant_is_rejected(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;
    let gaming = child(app, "Gaming laptops", &laptops).await;

    let err = reparent(app, &electronics, json!(gaming.id.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidRequest(_)));

    assert!(reload(app, electronics.id).await.is_root());
    assert_links_consistent(app, &[electronics.id, laptops.id, gaming.id]).await;
}

async fn delete_with_children_conflicts(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;

    let err = app
        .categories
        .delete(&electronics.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    assert_eq!(reload(app, electronics.id).await.children, vec![laptops.id]);
    assert!(exists(app, laptops.id).await);
}

async fn delete_leaf_unlinks_from_parent(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;

    let snapshot = app.categories.delete(&laptops.id.to_string()).await.unwrap();
    assert_eq!(snapshot.id, laptops.id);
    assert!(!exists(app, laptops.id).await);
    assert!(reload(app, electronics.id).await.children.is_empty());

    let err = app.categories.delete(&laptops.id.to_string()).await.unwrap_err();
    assert_eq!(err, DomainError::NotFound("Category not found".to_string()));
}

async fn reparenting_moves_child_between_sets(app: &CategoryApp) {
    let a = root(app, "Electronics").await;
    let b = root(app, "Computers").await;
    let x = child(app, "Laptops", &a).await;

    let moved = reparent(app, &x, json!(b.id.to_string())).await.unwrap();
    assert_eq!(moved.parent_id, Some(b.id));
    assert!(!reload(app, a.id).await.has_child(&x.id));
    assert_eq!(reload(app, b.id).await.children, vec![x.id]);

    // Same parent again: nothing is duplicated.
    reparent(app, &x, json!(b.id.to_string())).await.unwrap();
    assert_eq!(reload(app, b.id).await.children, vec![x.id]);

    assert_links_consistent(app, &[a.id, b.id, x.id]).await;
}

async fn root_can_be_attached_and_detached(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = root(app, "Laptops").await;

    reparent(app, &laptops, json!(electronics.id.to_string())).await.unwrap();
    assert_eq!(reload(app, electronics.id).await.children, vec![laptops.id]);

    let detached = reparent(app, &laptops, Value::Null).await.unwrap();
    assert!(detached.is_root());
    assert!(reload(app, electronics.id).await.children.is_empty());

    assert_links_consistent(app, &[electronics.id, laptops.id]).await;
}

async fn update_to_unknown_parent_is_rejected(app: &CategoryApp) {
    let laptops = root(app, "Laptops").await;

    let err = reparent(app, &laptops, json!(uuid::Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::InvalidRequest("Parent category not found. Provide a valid parentId.".to_string())
    );
    assert!(reload(app, laptops.id).await.is_root());
}

async fn update_without_parent_keeps_linkage(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;

    let updated = app
        .categories
        .update(
            &laptops.id.to_string(),
            &json!({ "name": "NOTEBOOKS", "stockAvailability": true }),
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Notebooks");
    assert!(updated.stock_availability);
    assert_eq!(updated.parent_id, Some(electronics.id));
    assert_eq!(reload(app, electronics.id).await.children, vec![laptops.id]);
}

async fn rejected_rename_leaves_links_untouched(app: &CategoryApp) {
    let alpha = root(app, "Alpha").await;
    let bravo = root(app, "Bravo").await;
    let xray = child(app, "Xray", &alpha).await;

    let err = app
        .categories
        .update(
            &xray.id.to_string(),
            &json!({ "parentId": bravo.id.to_string(), "name": "Alpha" }),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::DuplicateField {
            field: "name".to_string(),
            value: "Alpha".to_string()
        }
    );

    assert_eq!(reload(app, xray.id).await.parent_id, Some(alpha.id));
    assert_eq!(reload(app, alpha.id).await.children, vec![xray.id]);
    assert!(reload(app, bravo.id).await.children.is_empty());

    let err = app
        .categories
        .update(&xray.id.to_string(), &json!({ "parentId": null, "name": "Bravo" }))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DuplicateField { .. }));
    assert_eq!(reload(app, alpha.id).await.children, vec![xray.id]);

    assert_links_consistent(app, &[alpha.id, bravo.id, xray.id]).await;
}

async fn update_reports_first_validation_error(app: &CategoryApp) {
    let laptops = root(app, "Laptops").await;

    let err = app
        .categories
        .update(&laptops.id.to_string(), &json!({ "status": "archived", "name": "x" }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::ValidationError("Name must be at least 3 characters long.".to_string())
    );

    let err = app
        .categories
        .update(&uuid::Uuid::new_v4().to_string(), &json!({ "status": "inactive" }))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::NotFound("Category not found".to_string()));
}

async fn bulk_delete_aborts_when_any_has_children(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;
    let books = root(app, "Books").await;

    let ids = vec![books.id.to_string(), electronics.id.to_string()];
    let err = app.categories.delete_many(&ids).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    for id in [electronics.id, laptops.id, books.id] {
        assert!(exists(app, id).await);
    }
    assert_links_consistent(app, &[electronics.id, laptops.id, books.id]).await;
}

async fn bulk_delete_unlinks_and_removes(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;
    let phones = child(app, "Phones", &electronics).await;
    let books = root(app, "Books").await;

    let ids = vec![
        laptops.id.to_string(),
        phones.id.to_string(),
        books.id.to_string(),
        laptops.id.to_string(),
        uuid::Uuid::new_v4().to_string(),
    ];
    let deleted = app.categories.delete_many(&ids).await.unwrap();

    let mut deleted_ids: Vec<CategoryId> = deleted.iter().map(|c| c.id).collect();
    deleted_ids.sort();
    let mut expected = vec![laptops.id, phones.id, books.id];
    expected.sort();
    assert_eq!(deleted_ids, expected);

    assert!(reload(app, electronics.id).await.children.is_empty());
    for id in expected {
        assert!(!exists(app, id).await);
    }
}

async fn bulk_delete_rejects_bad_input(app: &CategoryApp) {
    let err = app.categories.delete_many(&[]).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidRequest(_)));

    let err = app
        .categories
        .delete_many(&["nope".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidId { .. }));

    let err = app
        .categories
        .delete_many(&[uuid::Uuid::new_v4().to_string()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::NotFound("No categories found with the provided IDs".to_string())
    );
}

async fn names_are_normalized_and_unique(app: &CategoryApp) {
    let goods = root(app, "  home   goods ").await;
    assert_eq!(goods.name, "Home goods");

    let err = app
        .categories
        .create(&payload("HOME GOODS", Value::Null))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::DuplicateField {
            field: "name".to_string(),
            value: "Home goods".to_string()
        }
    );

    let electronics = root(app, "electronics").await;
    assert_eq!(electronics.name, "Electronics");
}

async fn search_is_case_insensitive_substring(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;
    child(app, "Gaming laptops", &laptops).await;

    let hits = app.categories.search("laptop").await.unwrap();
    let names: Vec<&str> = hits.iter().map(|n| n.category.name.as_str()).collect();
    assert_eq!(names, ["Laptops", "Gaming laptops"]);
    assert_eq!(hits[0].child_nodes()[0].category.name, "Gaming laptops");
    assert_eq!(hits[0].depth(), 1);

    assert!(matches!(
        app.categories.search("123").await.unwrap_err(),
        DomainError::InvalidRequest(_)
    ));
    assert!(matches!(
        app.categories.search("zzz").await.unwrap_err(),
        DomainError::NotFound(_)
    ));
}

async fn get_all_returns_roots_with_two_levels(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let laptops = child(app, "Laptops", &electronics).await;
    let gaming = child(app, "Gaming laptops", &laptops).await;
    child(app, "Ultra gaming", &gaming).await;
    app.categories
        .create(&json!({
            "name": "Books",
            "parentId": null,
            "description": "A category used in tree tests",
            "status": "inactive"
        }))
        .await
        .unwrap();

    let forest = app.categories.get_all(&ListQuery::default()).await.unwrap();
    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].category.name, "Electronics");
    assert_eq!(forest[0].depth(), 2);

    let params: HashMap<String, String> = [("status".to_string(), "inactive".to_string())].into();
    let query = ListQuery::from_params(&params).unwrap();
    let inactive = app.categories.get_all(&query).await.unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].category.name, "Books");

    let err = app
        .categories
        .get_by_id(&uuid::Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::NotFound("Category not found with the provided ID.".to_string())
    );
}

async fn links_stay_consistent_across_a_session(app: &CategoryApp) {
    let electronics = root(app, "Electronics").await;
    let computers = root(app, "Computers").await;
    let laptops = child(app, "Laptops", &electronics).await;
    let phones = child(app, "Phones", &electronics).await;
    let tablets = child(app, "Tablets", &computers).await;

    reparent(app, &laptops, json!(computers.id.to_string())).await.unwrap();
    reparent(app, &tablets, Value::Null).await.unwrap();
    reparent(app, &phones, json!(tablets.id.to_string())).await.unwrap();
    reparent(app, &computers, json!(electronics.id.to_string())).await.unwrap();
    app.categories.delete(&laptops.id.to_string()).await.unwrap();

    let ids = [electronics.id, computers.id, phones.id, tablets.id];
    assert_links_consistent(app, &ids).await;
    assert_eq!(reload(app, electronics.id).await.children, vec![computers.id]);
    assert!(reload(app, computers.id).await.children.is_empty());
}

macro_rules! for_each_store {
    ($($name:ident),* $(,)?) => {
        mod in_memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(&application::CategoryApp::in_memory()).await;
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() {
                    let temp_dir = tempfile::TempDir::new().unwrap();
                    super::$name(&super::sqlite_app(&temp_dir)).await;
                }
            )*
        }
    };
}

for_each_store!(
    creates_root_and_child,
    missing_parent_fails_without_persisting,
    omitted_parent_is_rejected,
    malformed_parent_id_is_a_cast_error,
    self_parent_is_rejected,
    moving_under_a_descendant_is_rejected,
    delete_with_children_conflicts,
    delete_leaf_unlinks_from_parent,
    reparenting_moves_child_between_sets,
    root_can_be_attached_and_detached,
    update_to_unknown_parent_is_rejected,
    update_without_parent_keeps_linkage,
    update_reports_first_validation_error,
    rejected_rename_leaves_links_untouched,
    bulk_delete_aborts_when_any_has_children,
    bulk_delete_unlinks_and_removes,
    bulk_delete_rejects_bad_input,
    names_are_normalized_and_unique,
    search_is_case_insensitive_substring,
    get_all_returns_roots_with_two_levels,
    links_stay_consistent_across_a_session,
);
