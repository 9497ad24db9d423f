mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_new_learner_profile() {
    let app = common::create_test_app();
    let token = app.token("fresh");

    let (status, json) = app.get("/api/v1/profile", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalXP"], 0);
    assert_eq!(json["progress"], 0.0);
    assert_eq!(json["streak"]["current"], 0);
    assert_eq!(json["streak"]["longest"], 0);
    assert_eq!(json["hasActivityToday"], false);
    assert_eq!(json["level"], 1);
    assert_eq!(json["xpIntoLevel"], 0);
    assert_eq!(json["xpForNextLevel"], 100);
    assert_eq!(json["levelProgress"], 0.0);
}

#[tokio::test]
async fn test_profile_reflects_submissions() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    app.submit(&token, "geography", "geo-1", "a1", "Paris").await;
    app.submit(&token, "addition", "add-1", "a2", "12").await;

    let (status, json) = app.get("/api/v1/profile", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalXP"], 20);
    // geography complete, addition half done
    assert_eq!(json["progress"], 50.0);
    assert_eq!(json["streak"]["current"], 1);
    assert_eq!(json["hasActivityToday"], true);
    assert_eq!(json["xpIntoLevel"], 20);
    assert_eq!(json["levelProgress"], 20.0);
}

#[tokio::test]
async fn test_activity_flag_resets_at_utc_midnight() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    app.submit(&token, "addition", "add-1", "a1", "wrong").await;
    let (_, today) = app.get("/api/v1/profile", Some(&token)).await;
    assert_eq!(today["hasActivityToday"], true);

    app.clock.advance_days(1);
    let (_, tomorrow) = app.get("/api/v1/profile", Some(&token)).await;
    assert_eq!(tomorrow["hasActivityToday"], false);
}

#[tokio::test]
async fn test_profile_requires_identity() {
    let app = common::create_test_app();

    let (status, json) = app.get("/api/v1/profile", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);
}

#[tokio::test]
async fn test_level_progress_is_public() {
    let app = common::create_test_app();

    let (status, json) = app.get("/api/v1/levels/progress?totalXp=100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["level"], 2);
    assert_eq!(json["xpIntoLevel"], 0);
    assert_eq!(json["totalXpForCurrentLevel"], 100);

    let (status, json) = app.get("/api/v1/levels/progress", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["level"], 1);
    assert_eq!(json["xpForNextLevel"], 100);

    let (status, _) = app
        .get("/api/v1/levels/progress?totalXp=lots", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
