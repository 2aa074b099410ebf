mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{Value, json};

async fn publish(app: &TestApp, token: &str, body: Value) -> String {
    let response = app.post("/api/job-postings", token, body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["id"].as_str().unwrap().to_string()
}

fn posting(status: &str) -> Value {
    json!({
        "roleTitle": "Platform Engineer",
        "location": "Menlo Park",
        "workMode": "hybrid",
        "employmentType": "fulltime",
        "salaryRange": "$180k-$220k",
        "status": status,
    })
}

#[tokio::test]
async fn apply_copies_the_posting_and_rejects_duplicates() {
    let app = TestApp::new();
    let jane = app.recruiter("recruiter@meta.com", "META").await;
    let john = app.applicant("john.doe@email.com").await;
    let id = publish(&app, &jane.token, posting("open")).await;

    let applied = app
        .post(
            &format!("/api/job-postings/{id}/apply"),
            &john.token,
            json!({"notes": "Referred by Sam", "salaryTarget": 200000}),
        )
        .await;
    assert_eq!(applied.status, StatusCode::CREATED);
    assert_eq!(applied.body["status"], "applied");
    assert_eq!(applied.body["company"], "META");
    assert_eq!(applied.body["roleTitle"], "Platform Engineer");
    assert_eq!(applied.body["workMode"], "hybrid");
    assert_eq!(applied.body["jobPostingId"], id.as_str());
    assert_eq!(applied.body["applicantName"], "John Doe");
    assert_eq!(applied.body["salaryTarget"], 200000);

    let application_id = applied.body["id"].as_str().unwrap();
    let activity = app
        .get(
            &format!("/api/activity?jobApplicationId={application_id}"),
            &john.token,
        )
        .await;
    assert_eq!(activity.body["data"][0]["eventType"], "created");
    assert_eq!(
        activity.body["data"][0]["description"],
        "Applied to Platform Engineer at META"
    );

    let again = app
        .call(
            Method::POST,
            &format!("/api/job-postings/{id}/apply"),
            Some(&john.token),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "conflict");

    let recruiter_view = app.get("/api/applications", &jane.token).await;
    assert_eq!(recruiter_view.body["pagination"]["totalItems"], 1);
}

#[tokio::test]
async fn closed_postings_cannot_be_applied_to() {
    let app = TestApp::new();
    let jane = app.recruiter("recruiter@meta.com", "META").await;
    let john = app.applicant("john.doe@email.com").await;
    let id = publish(&app, &jane.token, posting("closed")).await;

    let applied = app
        .post(&format!("/api/job-postings/{id}/apply"), &john.token, json!({}))
        .await;
    assert_eq!(applied.status, StatusCode::BAD_REQUEST);
    assert_eq!(applied.body["error"], "invalid_state");

    let hidden = app.get(&format!("/api/job-postings/{id}"), &john.token).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let listed = app.get("/api/job-postings", &john.token).await;
    assert_eq!(listed.body["pagination"]["totalItems"], 0);

    let own = app.get(&format!("/api/job-postings/{id}"), &jane.token).await;
    assert_eq!(own.status, StatusCode::OK);
}

#[tokio::test]
async fn posting_visibility_follows_the_company() {
    let app = TestApp::new();
    let jane = app.recruiter("recruiter@meta.com", "META").await;
    let bob = app.recruiter("bob@google.com", "GOOGLE").await;
    let john = app.applicant("john.doe@email.com").await;

    let meta = publish(&app, &jane.token, posting("open")).await;
    publish(&app, &bob.token, posting("open")).await;

    let applicant_list = app.get("/api/job-postings", &john.token).await;
    assert_eq!(applicant_list.body["pagination"]["totalItems"], 2);

    let google_list = app.get("/api/job-postings", &bob.token).await;
    assert_eq!(google_list.body["pagination"]["totalItems"], 1);
    assert_eq!(google_list.body["data"][0]["company"], "GOOGLE");

    let foreign = app.get(&format!("/api/job-postings/{meta}"), &bob.token).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_recruiters_publish_for_their_company() {
    let app = TestApp::new();
    let jane = app.recruiter("recruiter@meta.com", "META").await;
    let john = app.applicant("john.doe@email.com").await;

    let by_applicant = app
        .post("/api/job-postings", &john.token, posting("open"))
        .await;
    assert_eq!(by_applicant.status, StatusCode::FORBIDDEN);

    let mut other_company = posting("open");
    other_company["company"] = json!("GOOGLE");
    let foreign = app.post("/api/job-postings", &jane.token, other_company).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let defaulted = app.post("/api/job-postings", &jane.token, posting("open")).await;
    assert_eq!(defaulted.body["company"], "META");
    assert_eq!(defaulted.body["recruiterId"], jane.id.to_string());
}

#[tokio::test]
async fn only_the_owning_recruiter_edits_or_deletes() {
    let app = TestApp::new();
    let jane = app.recruiter("recruiter@meta.com", "META").await;
    let sam = app.recruiter("sam@meta.com", "META").await;
    let john = app.applicant("john.doe@email.com").await;
    let id = publish(&app, &jane.token, posting("open")).await;

    let by_colleague = app
        .call(
            Method::PUT,
            &format!("/api/job-postings/{id}"),
            Some(&sam.token),
            Some(json!({"status": "closed"})),
        )
        .await;
    assert_eq!(by_colleague.status, StatusCode::FORBIDDEN);

    let closed = app
        .call(
            Method::PUT,
            &format!("/api/job-postings/{id}"),
            Some(&jane.token),
            Some(json!({"status": "closed", "location": null})),
        )
        .await;
    assert_eq!(closed.status, StatusCode::OK);
    assert_eq!(closed.body["status"], "closed");
    assert!(closed.body["location"].is_null());
    assert_eq!(closed.body["salaryRange"], "$180k-$220k");

    let by_applicant = app
        .call(
            Method::DELETE,
            &format!("/api/job-postings/{id}"),
            Some(&john.token),
            None,
        )
        .await;
    assert_eq!(by_applicant.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_a_posting_detaches_its_applications() {
    let app = TestApp::new();
    let jane = app.recruiter("recruiter@meta.com", "META").await;
    let john = app.applicant("john.doe@email.com").await;
    let id = publish(&app, &jane.token, posting("open")).await;

    let applied = app
        .post(&format!("/api/job-postings/{id}/apply"), &john.token, json!({}))
        .await;
    let application_id = applied.body["id"].as_str().unwrap().to_string();

    let deleted = app
        .call(
            Method::DELETE,
            &format!("/api/job-postings/{id}"),
            Some(&jane.token),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let missing = app.get(&format!("/api/job-postings/{id}"), &jane.token).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let application = app
        .get(&format!("/api/applications/{application_id}"), &john.token)
        .await;
    assert_eq!(application.status, StatusCode::OK);
    assert!(application.body["jobPostingId"].is_null());
    assert_eq!(application.body["company"], "META");
}
