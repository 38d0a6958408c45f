//! Single-entity loads: revisions, translations, access and field values.

mod common;

use std::sync::Arc;

use contentgraph_db_memory::{NewEntity, TranslationData};
use contentgraph_graphql::GraphQLRequest;
use contentgraph_storage::{
    Account, CONTEXT_USER_PERMISSIONS, PERMISSION_VIEW_LATEST_VERSION,
    PERMISSION_VIEW_UNPUBLISHED,
};
use serde_json::json;

use common::{CountingStore, NOTES_PERMISSION, data, error_code, graph, run, run_in, store};

#[tokio::test]
async fn test_load_by_id() {
    let store = store();
    let node = store
        .create(
            NewEntity::new("node", "Hello")
                .sub_kind("article")
                .path("/hello"),
        )
        .unwrap();
    let graph = graph(store);

    let body = run(
        &graph,
        &format!(
            "{{ node(id: {}) {{ __typename ... on NodeArticle {{ id label entityType entityBundle url }} }} }}",
            node.id
        ),
        Account::anonymous(),
    )
    .await;

    assert_eq!(
        data(&body)["node"],
        json!({
            "__typename": "NodeArticle",
            "id": node.id.to_string(),
            "label": "Hello",
            "entityType": "node",
            "entityBundle": "article",
            "url": "/hello",
        })
    );
}

#[tokio::test]
async fn test_missing_entity_is_null() {
    let graph = graph(store());
    let body = run(&graph, "{ node(id: 404) { __typename } }", Account::anonymous()).await;

    assert_eq!(data(&body)["node"], json!(null));
}

#[tokio::test]
async fn test_revision_selection() {
    let store = store();
    let node = store
        .create(NewEntity::new("node", "Published").sub_kind("article"))
        .unwrap();
    store
        .save_draft("node", node.id, "en", TranslationData::new("Draft 1").unpublished())
        .unwrap();
    store
        .save_draft("node", node.id, "en", TranslationData::new("Draft 2").unpublished())
        .unwrap();
    let graph = graph(store);

    let query = |revision: &str| {
        format!(
            "{{ node(id: {}, revision: \"{revision}\") {{ ... on NodeArticle {{ label defaultRevision }} }} }}",
            node.id
        )
    };

    let current = run(&graph, &query("current"), Account::anonymous()).await;
    assert_eq!(
        data(&current)["node"],
        json!({"label": "Published", "defaultRevision": true})
    );

    let denied = run(&graph, &query("latest"), Account::anonymous()).await;
    assert_eq!(data(&denied)["node"], json!(null));

    let editor = Account::new(2).with_permission(PERMISSION_VIEW_LATEST_VERSION);
    let latest = run(&graph, &query("latest"), editor.clone()).await;
    assert_eq!(
        data(&latest)["node"],
        json!({"label": "Draft 2", "defaultRevision": false})
    );

    let explicit = run(&graph, &query(&node.revision_id.to_string()), editor).await;
    assert_eq!(
        data(&explicit)["node"],
        json!({"label": "Published", "defaultRevision": true})
    );
}

#[tokio::test]
async fn test_latest_revision_per_language() {
    let store = store();
    let node = store
        .create(NewEntity::new("node", "Published").sub_kind("article"))
        .unwrap();
    let translated = store
        .add_translation("node", node.id, "ja", TranslationData::new("Konnichiwa"))
        .unwrap();
    let draft = store
        .save_draft("node", node.id, "en", TranslationData::new("Draft").unpublished())
        .unwrap();
    assert!(translated.revision_id < draft.revision_id);
    let graph = graph(store);

    let latest_in = |langcode: &str| {
        format!(
            "{{ node(id: {}, langcode: \"{langcode}\", revision: \"latest\") {{ \
             ... on NodeArticle {{ label langcode defaultRevision }} }} }}",
            node.id
        )
    };
    let editor = Account::new(2).with_permission(PERMISSION_VIEW_LATEST_VERSION);

    // The language's own draft
    let en = run(&graph, &latest_in("en"), editor.clone()).await;
    assert_eq!(
        data(&en)["node"],
        json!({"label": "Draft", "langcode": "en", "defaultRevision": false})
    );

    // ja was last changed in the default revision
    let ja = run(&graph, &latest_in("ja"), editor.clone()).await;
    assert_eq!(
        data(&ja)["node"],
        json!({"label": "Konnichiwa", "langcode": "ja", "defaultRevision": true})
    );

    // No de revision at all: the entity's latest revision is used
    let de = run(&graph, &latest_in("de"), editor).await;
    assert_eq!(
        data(&de)["node"],
        json!({"label": "Draft", "langcode": "en", "defaultRevision": false})
    );
}

#[tokio::test]
async fn test_revision_of_another_entity_is_rejected() {
    let store = store();
    let first = store
        .create(NewEntity::new("node", "First").sub_kind("article"))
        .unwrap();
    let second = store
        .create(NewEntity::new("node", "Second").sub_kind("article"))
        .unwrap();
    let graph = graph(store);

    let body = run(
        &graph,
        &format!(
            "{{ node(id: {}, revision: \"{}\") {{ __typename }} }}",
            first.id, second.revision_id
        ),
        Account::new(1).with_permission(PERMISSION_VIEW_UNPUBLISHED),
    )
    .await;

    assert_eq!(error_code(&body), "REVISION_MISMATCH");
    assert_eq!(body["data"]["node"], json!(null));
}

#[tokio::test]
async fn test_unpublished_translation_is_hidden() {
    let store = store();
    let node = store
        .create(NewEntity::new("node", "Hello").sub_kind("article"))
        .unwrap();
    store
        .add_translation(
            "node",
            node.id,
            "ja",
            TranslationData::new("Konnichiwa").unpublished(),
        )
        .unwrap();
    let graph = graph(store);

    let query = format!("{{ node(id: {}) {{ ... on NodeArticle {{ label }} }} }}", node.id);

    let ja = run_in(&graph, &query, Account::anonymous(), "ja").await;
    assert_eq!(data(&ja)["node"], json!(null));

    let en = run_in(&graph, &query, Account::anonymous(), "en").await;
    assert_eq!(data(&en)["node"], json!({"label": "Hello"}));

    let reviewer = Account::new(3).with_permission(PERMISSION_VIEW_UNPUBLISHED);
    let ja = run_in(&graph, &query, reviewer, "ja").await;
    assert_eq!(data(&ja)["node"], json!({"label": "Konnichiwa"}));
}

#[tokio::test]
async fn test_language_argument_narrows_subtree() {
    let store = store();
    let tag = store
        .create(NewEntity::new("taxonomy_term", "Rust").sub_kind("tags"))
        .unwrap();
    store
        .add_translation("taxonomy_term", tag.id, "de", TranslationData::new("Rost"))
        .unwrap();
    let node = store
        .create(
            NewEntity::new("node", "Hello")
                .sub_kind("article")
                .field("field_tags", json!([{"target_id": tag.id}])),
        )
        .unwrap();
    store
        .add_translation(
            "node",
            node.id,
            "de",
            TranslationData::new("Hallo").with_field("field_tags", json!([{"target_id": tag.id}])),
        )
        .unwrap();
    let graph = graph(store);

    let body = run(
        &graph,
        &format!(
            "{{ de: node(id: {id}, langcode: \"de\") {{ ... on NodeArticle {{ label langcode tags {{ label }} }} }} \
             en: node(id: {id}) {{ ... on NodeArticle {{ label tags {{ label }} }} }} }}",
            id = node.id
        ),
        Account::anonymous(),
    )
    .await;

    let data = data(&body);
    assert_eq!(
        data["de"],
        json!({"label": "Hallo", "langcode": "de", "tags": [{"label": "Rost"}]})
    );
    assert_eq!(data["en"], json!({"label": "Hello", "tags": [{"label": "Rust"}]}));
}

#[tokio::test]
async fn test_field_access() {
    let store = store();
    let node = store
        .create(
            NewEntity::new("node", "Hello")
                .sub_kind("article")
                .field("field_notes", json!([{"value": "Check the facts"}])),
        )
        .unwrap();
    let graph = graph(store);

    let query = format!(
        "{{ node(id: {}) {{ ... on NodeArticle {{ notes fieldNotesRaw {{ count }} }} }} }}",
        node.id
    );

    let anonymous = graph
        .execute(GraphQLRequest::new(&query), Account::anonymous(), None)
        .await;
    assert_eq!(
        data(&anonymous.to_json())["node"],
        json!({"notes": null, "fieldNotesRaw": null})
    );
    assert!(
        anonymous
            .cache_contexts_header()
            .contains(CONTEXT_USER_PERMISSIONS)
    );

    let editor = Account::new(5).with_permission(NOTES_PERMISSION);
    let body = run(&graph, &query, editor).await;
    assert_eq!(
        data(&body)["node"],
        json!({"notes": "Check the facts", "fieldNotesRaw": {"count": 1}})
    );
}

#[tokio::test]
async fn test_field_values() {
    let store = store();
    let page = store
        .create(NewEntity::new("node", "About").sub_kind("page").path("/about"))
        .unwrap();
    let author = store.create(NewEntity::new("user", "editor")).unwrap();
    let node = store
        .create(
            NewEntity::new("node", "Hello")
                .sub_kind("article")
                .field(
                    "body",
                    json!([{"value": "Fish & chips\n\nSecond", "format": "plain_text"}]),
                )
                .field("field_menu", json!([{"value": "404_pages"}]))
                .field("field_rating", json!([{"value": 4}]))
                .field("field_author", json!([{"target_id": author.id}]))
                .field(
                    "field_link",
                    json!([{"uri": format!("entity:node/{}", page.id), "title": "About us"}]),
                ),
        )
        .unwrap();
    let graph = graph(store);

    let body = run(
        &graph,
        &format!(
            "{{ node(id: {}) {{ ... on NodeArticle {{ \
               body {{ value processed }} menu rating author {{ label }} \
               link {{ title url }} fieldRatingRaw {{ count first {{ value }} }} \
             }} }} }}",
            node.id
        ),
        Account::anonymous(),
    )
    .await;

    assert_eq!(
        data(&body)["node"],
        json!({
            "body": {
                "value": "Fish & chips\n\nSecond",
                "processed": "<p>Fish &amp; chips</p>\n<p>Second</p>",
            },
            "menu": "__404_PAGES",
            "rating": 4,
            "author": {"label": "editor"},
            "link": {"title": "About us", "url": "/about"},
            "fieldRatingRaw": {"count": 1, "first": {"value": 4}},
        })
    );
}

#[tokio::test]
async fn test_unexposed_reference_resolves_to_unsupported_type() {
    let store = store();
    let comment = store.create(NewEntity::new("comment", "First!")).unwrap();
    let tag = store
        .create(NewEntity::new("taxonomy_term", "Rust").sub_kind("tags"))
        .unwrap();
    let node = store
        .create(
            NewEntity::new("node", "Hello")
                .sub_kind("article")
                .field(
                    "field_attachments",
                    json!([
                        {"target_id": comment.id, "target_type": "comment"},
                        {"target_id": tag.id, "target_type": "taxonomy_term"},
                    ]),
                ),
        )
        .unwrap();
    let graph = graph(store);

    let body = run(
        &graph,
        &format!(
            "{{ node(id: {}) {{ ... on NodeArticle {{ attachments {{ \
               __typename \
               ... on UnsupportedType {{ unsupported }} \
               ... on TaxonomyTermTags {{ label }} \
             }} }} }} }}",
            node.id
        ),
        Account::anonymous(),
    )
    .await;

    assert_eq!(
        data(&body)["node"]["attachments"],
        json!([
            {"__typename": "UnsupportedType", "unsupported": true},
            {"__typename": "TaxonomyTermTags", "label": "Rust"},
        ])
    );
}

#[tokio::test]
async fn test_inaccessible_references_are_dropped() {
    let store = store();
    let visible = store
        .create(NewEntity::new("node", "Visible").sub_kind("page"))
        .unwrap();
    let hidden = store
        .create(NewEntity::new("node", "Hidden").sub_kind("page").unpublished())
        .unwrap();
    let node = store
        .create(
            NewEntity::new("node", "Hello")
                .sub_kind("article")
                .field(
                    "field_related",
                    json!([{"target_id": hidden.id}, {"target_id": visible.id}]),
                ),
        )
        .unwrap();
    let graph = graph(store);

    let body = run(
        &graph,
        &format!(
            "{{ node(id: {}) {{ ... on NodeArticle {{ related {{ ... on NodePage {{ label }} }} }} }} }}",
            node.id
        ),
        Account::anonymous(),
    )
    .await;

    assert_eq!(
        data(&body)["node"]["related"],
        json!([{"label": "Visible"}])
    );
}

#[tokio::test]
async fn test_references_are_batched() {
    let inner = store();
    let tags: Vec<u64> = ["Rust", "GraphQL", "CMS"]
        .into_iter()
        .map(|label| {
            inner
                .create(NewEntity::new("taxonomy_term", label).sub_kind("tags"))
                .unwrap()
                .id
        })
        .collect();
    for n in 0..3 {
        inner
            .create(
                NewEntity::new("node", format!("Article {n}"))
                    .sub_kind("article")
                    .created(n)
                    .field(
                        "field_tags",
                        json!([{"target_id": tags[n as usize]}, {"target_id": tags[2]}]),
                    ),
            )
            .unwrap();
    }
    let counting = Arc::new(CountingStore::new(inner));
    let graph = graph(counting.clone());

    let body = run(
        &graph,
        "{ nodeArticleItems { nodes { label tags { label } } } }",
        Account::anonymous(),
    )
    .await;

    let nodes = data(&body)["nodeArticleItems"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["tags"], json!([{"label": "Rust"}, {"label": "CMS"}]));
    assert_eq!(counting.load_by_id_calls(), 0);
    assert!(counting.load_multiple_calls() <= 2);
}

#[tokio::test]
async fn test_cache_metadata() {
    let store = store();
    let node = store
        .create(NewEntity::new("node", "Hello").sub_kind("article"))
        .unwrap();
    let graph = graph(store);

    let response = graph
        .execute(
            GraphQLRequest::new(format!(
                "{{ node(id: {}) {{ __typename }} nodeArticleItems {{ total }} }}",
                node.id
            )),
            Account::anonymous(),
            Some("en"),
        )
        .await;

    assert!(response.is_ok());
    let tags = response.cache_tags_header();
    assert!(tags.contains(&format!("node:{}", node.id)));
    assert!(tags.contains("node_list"));

    let contexts = response.cache_contexts_header();
    assert!(contexts.contains("languages:en"));
    assert!(contexts.contains(CONTEXT_USER_PERMISSIONS));

    // Cache metadata stays out of the response body
    let body = response.to_json();
    assert!(body.get("cache").is_none());
}

#[tokio::test]
async fn test_requests_do_not_share_state() {
    let store = store();
    let node = store
        .create(NewEntity::new("node", "Hello").sub_kind("article"))
        .unwrap();
    store
        .add_translation("node", node.id, "fr", TranslationData::new("Bonjour"))
        .unwrap();
    let graph = graph(store);

    let narrowed = format!(
        "{{ node(id: {}, langcode: \"fr\") {{ ... on NodeArticle {{ label }} }} }}",
        node.id
    );
    let plain = format!("{{ node(id: {}) {{ ... on NodeArticle {{ label }} }} }}", node.id);

    let first = run(&graph, &narrowed, Account::anonymous()).await;
    assert_eq!(data(&first)["node"]["label"], "Bonjour");

    let second = run(&graph, &plain, Account::anonymous()).await;
    assert_eq!(data(&second)["node"]["label"], "Hello");
}
