mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_first_correct_answer_awards_xp() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (status, json) = app
        .submit(&token, "addition", "add-1", "attempt-1", "  12 ")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isCorrect"], true);
    assert_eq!(json["wasNewlyCorrect"], true);
    assert_eq!(json["xpAwarded"], 10);
    assert_eq!(json["totalXp"], 10);
    assert_eq!(json["streak"], 1);
    assert_eq!(json["longestStreak"], 1);
    assert_eq!(json["message"], "Correct! +10 XP");
    assert_eq!(app.store.cached_total_xp("learner-1").await, Some(10));
}

#[tokio::test]
async fn test_incorrect_answer_awards_nothing() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (status, json) = app
        .submit(&token, "addition", "add-1", "attempt-1", "13")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isCorrect"], false);
    assert_eq!(json["xpAwarded"], 0);
    assert_eq!(json["totalXp"], 0);
    assert_eq!(json["streak"], 0);
    assert_eq!(json["message"], "Incorrect answer");
    assert!(json.get("answer").is_none());
}

#[tokio::test]
async fn test_resubmitting_same_attempt_is_idempotent() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (_, first) = app
        .submit(&token, "geography", "geo-1", "attempt-1", "paris")
        .await;
    let (status, second) = app
        .submit(&token, "geography", "geo-1", "attempt-1", "paris")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(app.store.xp_entries("learner-1").await.len(), 1);
}

#[tokio::test]
async fn test_replay_ignores_a_changed_answer() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (_, first) = app
        .submit(&token, "geography", "geo-1", "attempt-1", "Lyon")
        .await;
    let (_, replay) = app
        .submit(&token, "geography", "geo-1", "attempt-1", "Paris")
        .await;

    assert_eq!(first, replay);
    assert_eq!(replay["isCorrect"], false);
    assert!(app.store.xp_entries("learner-1").await.is_empty());
}

#[tokio::test]
async fn test_older_attempt_replayed_after_newer_one_returns_its_own_outcome() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (_, first) = app
        .submit(&token, "geography", "geo-1", "attempt-1", "Lyon")
        .await;
    let (_, second) = app
        .submit(&token, "geography", "geo-1", "attempt-2", "Paris")
        .await;
    let (status, replay) = app
        .submit(&token, "geography", "geo-1", "attempt-1", "Lyon")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, replay);
    assert_eq!(replay["totalXp"], 0);
    assert_eq!(replay["streak"], 0);
    assert_eq!(second["totalXp"], 10);
    assert_eq!(app.store.xp_entries("learner-1").await.len(), 1);
    assert_eq!(app.store.cached_total_xp("learner-1").await, Some(10));

    let (_, profile) = app.get("/api/v1/profile", Some(&token)).await;
    assert_eq!(profile["totalXP"], 10);
    assert_eq!(profile["streak"]["current"], 1);

    let (_, attempts) = app
        .get("/api/v1/lessons/geography/problem-attempts", Some(&token))
        .await;
    assert_eq!(attempts["geo-1"]["isCorrect"], true);
}

#[tokio::test]
async fn test_correctness_is_sticky() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let mut newly = Vec::new();
    for (attempt, answer) in [("a1", "b"), ("a2", "c"), ("a3", "B")] {
        let (status, json) = app.submit(&token, "addition", "add-2", attempt, answer).await;
        assert_eq!(status, StatusCode::OK);
        newly.push(json["wasNewlyCorrect"].as_bool().unwrap());
        if attempt == "a3" {
            assert_eq!(json["message"], "Already answered correctly");
            assert_eq!(json["isCorrect"], true);
            assert_eq!(json["xpAwarded"], 0);
            assert_eq!(json["totalXp"], 10);
        }
    }

    assert_eq!(newly, vec![true, false, false]);
    assert_eq!(app.store.xp_entries("learner-1").await.len(), 1);

    let (_, attempts) = app
        .get("/api/v1/lessons/addition/problem-attempts", Some(&token))
        .await;
    assert_eq!(attempts["add-2"]["isCorrect"], true);
}

#[tokio::test]
async fn test_streak_restarts_after_a_missed_day() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    app.submit(&token, "addition", "add-1", "a1", "12").await;
    app.clock.advance_days(2);
    let (_, json) = app.submit(&token, "addition", "add-2", "a2", "b").await;

    assert_eq!(json["streak"], 1);
    assert_eq!(json["longestStreak"], 1);
}

#[tokio::test]
async fn test_streak_extends_on_consecutive_days_only_once_per_day() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    app.submit(&token, "addition", "add-1", "a1", "12").await;
    let (_, same_day) = app.submit(&token, "addition", "add-2", "a2", "b").await;
    assert_eq!(same_day["streak"], 1);
    assert_eq!(same_day["totalXp"], 20);

    app.clock.advance_days(1);
    let (_, next_day) = app
        .submit(&token, "geography", "geo-1", "a3", "Paris")
        .await;
    assert_eq!(next_day["streak"], 2);
    assert_eq!(next_day["longestStreak"], 2);
}

#[tokio::test]
async fn test_learners_are_isolated() {
    let app = common::create_test_app();

    app.submit(&app.token("alice"), "addition", "add-1", "a1", "12")
        .await;
    let (_, bob) = app
        .submit(&app.token("bob"), "addition", "add-1", "a1", "12")
        .await;

    assert_eq!(bob["wasNewlyCorrect"], true);
    assert_eq!(bob["totalXp"], 10);
}

#[tokio::test]
async fn test_submit_requires_identity() {
    let app = common::create_test_app();
    let body = json!({ "problemId": "add-1", "attemptId": "a1", "answer": "12" });

    let (status, json) = app
        .post_json("/api/v1/lessons/addition/submit", None, &body)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);
    assert!(json["message"].is_string());

    let (status, _) = app
        .post_json("/api/v1/lessons/addition/submit", Some("not-a-jwt"), &body)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_problem_from_another_lesson_is_not_found() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (status, json) = app
        .submit(&token, "geography", "add-1", "a1", "12")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);

    let (status, _) = app
        .submit(&token, "addition", "missing", "a1", "12")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.xp_entries("learner-1").await.is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_are_rejected() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (status, json) = app
        .post_json(
            "/api/v1/lessons/addition/submit",
            Some(&token),
            &json!({ "problemId": "add-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);

    let (status, _) = app.submit(&token, "addition", "add-1", "", "12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_streak_dated_in_the_future_is_rejected() {
    let app = common::create_test_app();
    let token = app.token("learner-1");
    app.store
        .put_streak(
            "learner-1",
            mathquest_api::models::Streak {
                current_streak: 3,
                longest_streak: 3,
                last_active_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
            },
        )
        .await;

    let (status, json) = app.submit(&token, "addition", "add-1", "a1", "12").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Internal server error");
    assert!(app.store.xp_entries("learner-1").await.is_empty());
}
