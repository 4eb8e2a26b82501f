//! Tests for blog module
//!
//! These tests verify posting and listing against in-memory collaborators:
//! - posts are echoed and persisted in append order
//! - listing honours the configured user id matching rule
//! - storage integrity errors reach the caller

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::auth::AuthedUser;
    use crate::common::state::test_support::{test_state, TEST_POSTS_KEY};
    use crate::services::identity::fake::FakeIdentity;
    use crate::services::object_store::memory::MemoryObjectStore;
    use axum::extract::{Extension, Json};
    use axum::http::StatusCode;
    use models::{BlogPostRequest, PostRecord, UserIdMatch};
    use std::sync::Arc;

    fn user(user_id: &str, email: &str) -> AuthedUser {
        AuthedUser {
            user_id: user_id.to_string(),
            email: email.to_string(),
            profile: Some("user".to_string()),
        }
    }

    fn post(title: &str) -> BlogPostRequest {
        BlogPostRequest {
            title: title.to_string(),
            post: format!("{} body", title),
        }
    }

    fn setup(rule: UserIdMatch) -> (crate::common::state::SharedState, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        let state = test_state(Arc::new(FakeIdentity::new()), store.clone(), rule);
        (state, store)
    }

    #[tokio::test]
    async fn test_send_post_echoes_record() {
        let (state, store) = setup(UserIdMatch::Exact);

        let Json(record) = handlers::send_post(
            Extension(state),
            user("uid-1", "johndoe@gmail.com"),
            Json(post("first post")),
        )
        .await
        .unwrap();

        assert_eq!(
            record,
            PostRecord {
                user_id: "uid-1".to_string(),
                email: "johndoe@gmail.com".to_string(),
                title: "first post".to_string(),
                post: "first post body".to_string(),
            }
        );

        let stored: Vec<PostRecord> =
            serde_json::from_slice(&store.raw(TEST_POSTS_KEY).unwrap()).unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test]
    async fn test_send_post_accepts_empty_fields() {
        let (state, store) = setup(UserIdMatch::Exact);

        let Json(record) = handlers::send_post(
            Extension(state),
            user("uid-1", "johndoe@gmail.com"),
            Json(BlogPostRequest {
                title: String::new(),
                post: String::new(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.post, "");
        let stored: Vec<PostRecord> =
            serde_json::from_slice(&store.raw(TEST_POSTS_KEY).unwrap()).unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[test]
    fn test_send_post_body_requires_both_fields() {
        assert!(serde_json::from_str::<BlogPostRequest>(r#"{"title":"","post":""}"#).is_ok());
        assert!(serde_json::from_str::<BlogPostRequest>(r#"{"title":"only a title"}"#).is_err());
    }

    #[tokio::test]
    async fn test_list_posts_empty_log() {
        let (state, _) = setup(UserIdMatch::Exact);

        let Json(posts) = handlers::get_user_posts(Extension(state), user("uid-1", "a@b.com"))
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_list_posts_exact_match_in_order() {
        let (state, _) = setup(UserIdMatch::Exact);
        let alice = user("uid-1", "alice@example.com");
        let bob = user("uid-12", "bob@example.com");

        for (author, title) in [(&alice, "a1"), (&bob, "b1"), (&alice, "a2")] {
            let _ = handlers::send_post(Extension(state.clone()), author.clone(), Json(post(title)))
                .await
                .unwrap();
        }

        let Json(alice_posts) = handlers::get_user_posts(Extension(state.clone()), alice)
            .await
            .unwrap();
        let titles: Vec<&str> = alice_posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "a2"]);

        let Json(bob_posts) = handlers::get_user_posts(Extension(state), bob).await.unwrap();
        let titles: Vec<&str> = bob_posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["b1"]);
    }

    #[tokio::test]
    async fn test_list_posts_contains_rule_leaks_substring_ids() {
        let (state, _) = setup(UserIdMatch::Contains);
        let alice = user("uid-1", "alice@example.com");
        let bob = user("uid-12", "bob@example.com");

        let _ = handlers::send_post(Extension(state.clone()), alice.clone(), Json(post("a1")))
            .await
            .unwrap();
        let _ = handlers::send_post(Extension(state.clone()), bob.clone(), Json(post("b1")))
            .await
            .unwrap();

        // "uid-1" is a substring of "uid-12", so bob also sees alice's post
        let Json(bob_posts) = handlers::get_user_posts(Extension(state.clone()), bob)
            .await
            .unwrap();
        let titles: Vec<&str> = bob_posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "b1"]);

        let Json(alice_posts) = handlers::get_user_posts(Extension(state), alice)
            .await
            .unwrap();
        let titles: Vec<&str> = alice_posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a1"]);
    }

    #[tokio::test]
    async fn test_corrupt_log_is_server_error() {
        let (state, store) = setup(UserIdMatch::Exact);
        store.insert_raw(TEST_POSTS_KEY, b"not json");

        let err = handlers::get_user_posts(Extension(state.clone()), user("uid-1", "a@b.com"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = handlers::send_post(
            Extension(state),
            user("uid-1", "a@b.com"),
            Json(post("lost")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.raw(TEST_POSTS_KEY).unwrap().as_ref(), b"not json");
    }

    #[test]
    fn test_user_id_match_rules() {
        assert!(UserIdMatch::Contains.matches("uid-1", "uid-1"));
        assert!(UserIdMatch::Contains.matches("uid-1", "uid-12"));
        assert!(UserIdMatch::Contains.matches("", "uid-12"));
        assert!(!UserIdMatch::Contains.matches("uid-12", "uid-1"));

        assert!(UserIdMatch::Exact.matches("uid-1", "uid-1"));
        assert!(!UserIdMatch::Exact.matches("uid-1", "uid-12"));
        assert!(!UserIdMatch::Exact.matches("", "uid-12"));

        assert_eq!("EXACT".parse::<UserIdMatch>().unwrap(), UserIdMatch::Exact);
        assert!("equals".parse::<UserIdMatch>().is_err());
    }

    #[test]
    fn test_post_record_wire_shape() {
        let record = PostRecord {
            user_id: "uid-1".to_string(),
            email: "johndoe@gmail.com".to_string(),
            title: "first post".to_string(),
            post: "hello there and welcome to my blog !".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "user_id": "uid-1",
                "email": "johndoe@gmail.com",
                "title": "first post",
                "post": "hello there and welcome to my blog !"
            })
        );
    }
}
