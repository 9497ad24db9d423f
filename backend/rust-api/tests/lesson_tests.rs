mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_lessons_are_listed_in_order_with_progress() {
    let app = common::create_test_app();
    let token = app.token("learner-1");
    app.submit(&token, "addition", "add-2", "a1", "b").await;

    let (status, json) = app.get("/api/v1/lessons", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let lessons = json.as_array().unwrap();
    assert_eq!(lessons.len(), 2);
    assert_eq!(lessons[0]["id"], "addition");
    assert_eq!(lessons[0]["problemCount"], 2);
    assert_eq!(lessons[0]["percentage"], 50.0);
    assert_eq!(lessons[0]["completed"], false);
    assert_eq!(lessons[1]["id"], "geography");
    assert_eq!(lessons[1]["percentage"], 0.0);
}

#[tokio::test]
async fn test_lesson_detail_hides_answers() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (status, json) = app.get("/api/v1/lessons/addition", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Addition");
    let problems = json["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0]["id"], "add-1");
    assert_eq!(problems[1]["type"], "MULTIPLE_CHOICE");
    assert_eq!(problems[1]["options"].as_array().unwrap().len(), 3);
    for problem in problems {
        assert!(problem.get("answer").is_none());
    }
}

#[tokio::test]
async fn test_completed_lesson() {
    let app = common::create_test_app();
    let token = app.token("learner-1");
    app.submit(&token, "geography", "geo-1", "a1", "PARIS").await;

    let (_, json) = app.get("/api/v1/lessons/geography", Some(&token)).await;

    assert_eq!(json["completed"], true);
    assert_eq!(json["percentage"], 100.0);
}

#[tokio::test]
async fn test_problem_attempt_map() {
    let app = common::create_test_app();
    let token = app.token("learner-1");
    app.submit(&token, "addition", "add-1", "a1", "11").await;

    let (status, json) = app
        .get("/api/v1/lessons/addition/problem-attempts", Some(&token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["add-1"]["attempted"], true);
    assert_eq!(json["add-1"]["isCorrect"], false);
    assert!(json["add-1"]["lastAttempted"].is_string());
    assert_eq!(json["add-2"]["attempted"], false);
    assert!(json["add-2"].get("lastAttempted").is_none());
}

#[tokio::test]
async fn test_unknown_lesson_is_not_found() {
    let app = common::create_test_app();
    let token = app.token("learner-1");

    let (status, json) = app.get("/api/v1/lessons/calculus", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Lesson not found");

    let (status, _) = app
        .get("/api/v1/lessons/calculus/problem-attempts", Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
