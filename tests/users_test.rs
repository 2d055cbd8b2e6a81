mod common;

use axum::http::StatusCode;
use common::{
    build_test_context, register_user, request_json, request_multipart, signed_in_user,
    upload_video, Part,
};
use serde_json::json;

#[tokio::test]
async fn current_user_returns_profile() {
    let ctx = build_test_context().expect("test context should build");
    let (id, token) = signed_in_user(&ctx.app, "ivy").await;

    let (status, body) =
        request_json(&ctx.app, "GET", "/users/current-user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["username"], "ivy");
}

#[tokio::test]
async fn update_account_details() {
    let ctx = build_test_context().expect("test context should build");
    let (_, token) = signed_in_user(&ctx.app, "jack").await;
    register_user(&ctx.app, "taken").await;

    let (status, body) = request_json(
        &ctx.app,
        "PATCH",
        "/users/update-user-details",
        Some(&token),
        Some(json!({ "fullName": "Jack Renamed", "email": "Jack.New@Example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Jack Renamed");
    assert_eq!(body["data"]["email"], "jack.new@example.com");

    let (status, _) = request_json(
        &ctx.app,
        "PATCH",
        "/users/update-user-details",
        Some(&token),
        Some(json!({ "fullName": "Jack", "email": "taken@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = request_json(
        &ctx.app,
        "PATCH",
        "/users/update-user-details",
        Some(&token),
        Some(json!({ "fullName": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_avatar_and_cover_image() {
    let ctx = build_test_context().expect("test context should build");
    let (_, token) = signed_in_user(&ctx.app, "kate").await;

    let (_, before) =
        request_json(&ctx.app, "GET", "/users/current-user", Some(&token), None).await;

    let (status, body) = request_multipart(
        &ctx.app,
        "PATCH",
        "/users/update-avatar",
        Some(&token),
        &[Part::File("avatar", "me.png", b"new-avatar")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["avatar"], before["data"]["avatar"]);

    let (status, body) = request_multipart(
        &ctx.app,
        "PATCH",
        "/users/update-coverimage",
        Some(&token),
        &[Part::File("coverImage", "cover.jpg", b"new-cover")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["coverImage"].is_string());

    let (status, _) = request_multipart(
        &ctx.app,
        "PATCH",
        "/users/update-avatar",
        Some(&token),
        &[Part::Text("note", "no file")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn channel_profile_counts_videos_and_likes() {
    let ctx = build_test_context().expect("test context should build");
    let (_, creator) = signed_in_user(&ctx.app, "studio").await;
    let (_, fan) = signed_in_user(&ctx.app, "watcher").await;

    let video = upload_video(&ctx.app, &creator, "Episode 1").await;
    upload_video(&ctx.app, &creator, "Episode 2").await;
    let id = video["id"].as_str().unwrap();
    request_json(&ctx.app, "POST", &format!("/likes/toggle/{id}"), Some(&fan), None).await;

    let (status, body) = request_json(&ctx.app, "GET", "/users/c/studio", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "studio");
    assert_eq!(body["data"]["videosCount"], 2);
    assert_eq!(body["data"]["totalLikes"], 1);

    let (status, _) = request_json(&ctx.app, "GET", "/users/c/ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn watch_history_records_authenticated_views() {
    let ctx = build_test_context().expect("test context should build");
    let (_, creator) = signed_in_user(&ctx.app, "director").await;
    let (_, viewer) = signed_in_user(&ctx.app, "audience").await;
    let video = upload_video(&ctx.app, &creator, "Feature").await;
    let id = video["id"].as_str().unwrap();

    // Anonymous views are not attributed to anyone
    request_json(&ctx.app, "GET", &format!("/videos/{id}"), None, None).await;
    let (_, body) = request_json(&ctx.app, "GET", "/users/history", Some(&viewer), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    request_json(&ctx.app, "GET", &format!("/videos/{id}"), Some(&viewer), None).await;
    request_json(&ctx.app, "GET", &format!("/videos/{id}"), Some(&viewer), None).await;

    let (status, body) =
        request_json(&ctx.app, "GET", "/users/history", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], id);
    assert_eq!(history[0]["ownerDetails"]["username"], "director");
}
