/// Integration tests for profile pages and avatar uploads

mod common;

use axum::http::StatusCode;
use common::{Part, TestContext, PNG};
use photobook_shared::models::Visibility;
use photobook_shared::store::Store;

fn profile_fields<'a>(username: &'a str, email: &'a str, bio: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::Field("username", username),
        Part::Field("email", email),
        Part::Field("first_name", "Ana"),
        Part::Field("last_name", "Silva"),
        Part::Field("bio", bio),
    ]
}

/// Test that the owner sees an edit form and others a read-only page
#[tokio::test]
async fn test_profile_views() {
    let ctx = TestContext::new().await.unwrap();
    let ana = ctx.create_user("ana", true).await.unwrap();
    ctx.create_user("ben", true).await.unwrap();
    ctx.create_album(&ana, "Harbour", Visibility::Public).await.unwrap();
    ctx.create_album(&ana, "Diary", Visibility::Private).await.unwrap();

    let mut owner = ctx.logged_in("ana").await;
    let page = owner.get("/profile/ana").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Your profile"));
    assert!(page.body.contains("Harbour"));
    assert!(page.body.contains("Diary"));

    let mut visitor = ctx.logged_in("ben").await;
    let page = visitor.get("/profile/ana").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(!page.body.contains("Your profile"));
    assert!(page.body.contains("Harbour"));
    assert!(!page.body.contains("Diary"));
}

/// Test that profiles need a signed-in viewer
#[tokio::test]
async fn test_profile_requires_login() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("carla", true).await.unwrap();
    let mut client = ctx.client();

    let response = client.get("/profile/carla").await;
    assert_eq!(response.location(), "/login?next=/profile/carla");
}

/// Test that an unknown username redirects home with a message
#[tokio::test]
async fn test_unknown_profile() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("diego", true).await.unwrap();
    let mut client = ctx.logged_in("diego").await;

    let response = client.get("/profile/ghost").await;
    assert_eq!(response.location(), "/");
    let page = client.follow(&response).await;
    assert!(page.body.contains("User ghost does not exist"));
}

/// Test a successful update that renames the user
#[tokio::test]
async fn test_update_profile() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("elena", true).await.unwrap();
    let mut client = ctx.logged_in("elena").await;

    let response = client
        .post_multipart(
            "/profile/elena",
            &profile_fields("elena.s", "Elena.S@example.com", "Street photographer"),
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/profile/elena.s");

    let page = client.follow(&response).await;
    assert!(page.body.contains("elena.s, your profile was updated successfully"));

    let stored = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "elena.s");
    assert_eq!(stored.email, "elena.s@example.com");
    assert_eq!(stored.first_name, "Ana");
    assert_eq!(stored.bio, "Street photographer");
}

/// Test that a taken username or email leaves the profile unchanged
#[tokio::test]
async fn test_update_profile_rejects_taken_values() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("felix", true).await.unwrap();
    ctx.create_user("gina", true).await.unwrap();
    let mut client = ctx.logged_in("felix").await;

    let response = client
        .post_multipart(
            "/profile/felix",
            &profile_fields("gina", "gina@example.com", ""),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("A user with that username already exists."));
    assert!(response.body.contains("A user with that email already exists."));

    let stored = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "felix");

    // Keeping one's own values is not a conflict
    let response = client
        .post_multipart(
            "/profile/felix",
            &profile_fields("felix", "felix@example.com", "Hello"),
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

/// Test that a user cannot edit someone else's profile
#[tokio::test]
async fn test_update_other_profile_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    ctx.create_user("hugo", true).await.unwrap();
    let iris = ctx.create_user("iris", true).await.unwrap();
    let mut client = ctx.logged_in("hugo").await;

    let response = client
        .post_multipart(
            "/profile/iris",
            &profile_fields("iris", "iris@example.com", "hacked"),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let stored = ctx.store.find_user_by_id(iris.id).await.unwrap().unwrap();
    assert_eq!(stored.bio, "");
}

/// Test avatar upload, replacement and serving
#[tokio::test]
async fn test_avatar_upload() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("jon", true).await.unwrap();
    let mut client = ctx.logged_in("jon").await;

    let mut parts = profile_fields("jon", "jon@example.com", "");
    parts.push(Part::File("avatar", "me.png", PNG));
    let response = client.post_multipart("/profile/jon", &parts).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let first = ctx
        .store
        .find_user_by_id(user.id)
        .await
        .unwrap()
        .unwrap()
        .avatar_path
        .unwrap();
    assert!(ctx.storage.exists(&first).await);

    let avatar = client.get("/profile/jon/avatar").await;
    assert_eq!(avatar.status, StatusCode::OK);
    assert_eq!(avatar.content_type.as_deref(), Some("image/png"));
    assert_eq!(avatar.bytes, PNG);

    let response = client.post_multipart("/profile/jon", &parts).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let second = ctx
        .store
        .find_user_by_id(user.id)
        .await
        .unwrap()
        .unwrap()
        .avatar_path
        .unwrap();
    assert_ne!(first, second);
    assert!(!ctx.storage.exists(&first).await);
    assert!(ctx.storage.exists(&second).await);
}

/// Test that a non-image avatar is rejected before anything is saved
#[tokio::test]
async fn test_avatar_must_be_an_image() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_user("kim", true).await.unwrap();
    let mut client = ctx.logged_in("kim").await;

    let mut parts = profile_fields("kim2", "kim@example.com", "");
    parts.push(Part::File("avatar", "notes.txt", b"just some text"));
    let response = client.post_multipart("/profile/kim", &parts).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Upload a valid image."));

    let stored = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "kim");
    assert!(stored.avatar_path.is_none());

    let avatar = client.get("/profile/kim/avatar").await;
    assert_eq!(avatar.status, StatusCode::NOT_FOUND);
}
