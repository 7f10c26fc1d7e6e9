mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{create_student, id_of, seed_calendar, TestServer};

#[tokio::test]
async fn catalog_crud_and_duplicates() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;

    let class = server
        .create(&admin, "/api/classes", json!({ "name": "Primary Two", "shortName": "P2" }))
        .await?;
    assert!(class["createdAt"].is_string());

    let res = server
        .post(&admin, "/api/classes", json!({ "name": "Other", "shortName": "P2" }))
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "A record with this shortName already exists");

    let res = server
        .post(&admin, "/api/classes", json!({ "name": "No short name" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .post(&admin, "/api/classes", json!({ "id": id_of(&class), "name": "X", "shortName": "X" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let path = format!("/api/classes/{}", id_of(&class));
    let res = server.put(&admin, &path, json!({ "name": "Primary 2" })).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["name"], "Primary 2");
    assert_eq!(body["data"]["shortName"], "P2");

    let res = server.delete(&admin, &path).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server.get(&admin, &path).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn catalog_writes_are_admin_only() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.admin().await?;
    let teacher = server.register_and_login("t@school.test", "staff", Some("teacher")).await?;

    let res = server
        .post(&teacher, "/api/subjects", json!({ "name": "Mathematics" }))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = server.get(&teacher, "/api/subjects").await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn term_dates_must_be_ordered() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;

    let res = server
        .post(
            &admin,
            "/api/academic-terms",
            json!({
                "academicYear": calendar.year,
                "name": "Backwards",
                "startDate": "2025-06-01",
                "endDate": "2025-05-01"
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .get(&admin, &format!("/api/academic-terms?academicYear={}", calendar.year))
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn student_requires_known_class_and_gets_full_name() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;

    let student = server
        .create(
            &admin,
            "/api/students",
            json!({
                "firstName": "Amina",
                "otherName": "N",
                "lastName": "Akello",
                "currentClass": calendar.class,
                "dateOfBirth": "2018-03-04"
            }),
        )
        .await?;
    assert_eq!(student["fullName"], "Amina N Akello");
    assert_eq!(student["academicStatus"], "Active");

    let res = server
        .post(
            &admin,
            "/api/students",
            json!({ "firstName": "Ghost", "lastName": "Class", "currentClass": uuid_like() }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.get(&admin, "/api/students/status/Active").await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let res = server.get(&admin, "/api/students/status/Expelled").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .get(&admin, &format!("/api/students/class/{}", calendar.class))
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"][0]["id"], student["id"]);
    Ok(())
}

#[tokio::test]
async fn parent_links_stay_symmetric() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;
    let student = create_student(&server, &admin, &calendar.class, "Brian").await?;
    let parent = server
        .create(
            &admin,
            "/api/parents",
            json!({ "fullName": "Grace Okello", "nin": "CM123", "phone": "0700000000", "relationship": "Mother" }),
        )
        .await?;
    let (student_id, parent_id) = (id_of(&student), id_of(&parent));

    let link = json!({ "studentId": student_id, "parentId": parent_id, "isPrimaryContact": true });
    let res = server.post(&admin, "/api/students/add-parent", link.clone()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["parents"][0]["parent"], parent_id.as_str());
    assert_eq!(body["data"]["parents"][0]["isPrimaryContact"], true);

    let res = server.post(&admin, "/api/students/add-parent", link).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.get(&admin, &format!("/api/parents/student/{}", student_id)).await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"][0]["students"][0], student_id.as_str());

    let res = server
        .delete(&admin, &format!("/api/parents/{}/student/{}", parent_id, student_id))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server.get(&admin, &format!("/api/students/{}", student_id)).await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["parents"].as_array().map(Vec::len), Some(0));

    let res = server
        .delete(&admin, &format!("/api/students/{}/parent/{}", student_id, parent_id))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn deleting_a_student_unlinks_parents() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;
    let student = create_student(&server, &admin, &calendar.class, "Cathy").await?;
    let parent = server
        .create(
            &admin,
            "/api/parents",
            json!({ "fullName": "John Okello", "nin": "CM456", "phone": "0711111111", "relationship": "Father" }),
        )
        .await?;
    server
        .post(
            &admin,
            "/api/parents/add-student",
            json!({ "parentId": id_of(&parent), "studentId": id_of(&student) }),
        )
        .await?;

    let res = server.delete(&admin, &format!("/api/students/{}", id_of(&student))).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&admin, &format!("/api/parents/{}", id_of(&parent))).await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["students"].as_array().map(Vec::len), Some(0));
    Ok(())
}

fn uuid_like() -> &'static str {
    "6f1c1b6e-0d0e-4f55-9a7e-3b1f1b7b2a10"
}
