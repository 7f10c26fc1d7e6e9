mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{id_of, seed_calendar, TestServer};

#[tokio::test]
async fn subject_and_class_assignment() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;
    let subject = server.create(&admin, "/api/subjects", json!({ "name": "English" })).await?;
    let staff = server
        .create(
            &admin,
            "/api/staff",
            json!({ "fullName": "Peter Mugisha", "email": "peter@school.test", "department": "Languages" }),
        )
        .await?;
    let staff_id = id_of(&staff);

    let assign = json!({ "staffId": staff_id, "subjectId": id_of(&subject) });
    let res = server.post(&admin, "/api/staff/add-subject", assign.clone()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server.post(&admin, "/api/staff/add-subject", assign).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Subject already assigned to this teacher");

    let res = server
        .post(&admin, "/api/staff/add-class", json!({ "staffId": staff_id, "classId": calendar.class }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&admin, &format!("/api/staff/subject/{}", id_of(&subject))).await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"][0]["id"], staff_id.as_str());

    let res = server.get(&admin, "/api/staff/department/Languages").await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let res = server
        .delete(&admin, &format!("/api/staff/{}/class/{}", staff_id, calendar.class))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["classes"].as_array().map(Vec::len), Some(0));

    let res = server
        .post(&admin, "/api/staff", json!({ "fullName": "Dup", "email": "PETER@school.test" }))
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn staff_with_account_can_log_in() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;

    let created = server
        .create(
            &admin,
            "/api/staff/with-account",
            json!({
                "staffData": { "fullName": "Ruth Bursar", "email": "ruth@school.test" },
                "userData": { "password": "ledger123", "subrole": "bursar" }
            }),
        )
        .await?;
    assert_eq!(created["hasAccount"], true);
    assert_eq!(created["user"]["role"], "staff");
    assert_eq!(created["user"]["staffId"], created["staff"]["id"]);
    assert_eq!(created["staff"]["user"], created["user"]["id"]);

    let token = server.login("ruth@school.test", "ledger123").await?;
    let res = server.get(&token, "/api/school-fees").await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Same email again: the account conflicts and no second staff record is left behind.
    let res = server
        .post(
            &admin,
            "/api/staff/with-account",
            json!({
                "staffData": { "fullName": "Ruth Again", "email": "ruth2@school.test" },
                "userData": { "email": "ruth@school.test", "password": "x" }
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let res = server.get(&admin, "/api/staff").await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn parent_with_account_is_always_parent_role() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;

    let created = server
        .create(
            &admin,
            "/api/parents/with-account",
            json!({
                "parentData": {
                    "fullName": "Sarah Nansubuga",
                    "nin": "CF789",
                    "phone": "0722222222",
                    "email": "sarah@home.test",
                    "relationship": "Guardian",
                    "guardianRelationship": "Aunt"
                },
                "userData": { "password": "family123", "role": "admin" }
            }),
        )
        .await?;
    assert_eq!(created["user"]["role"], "parent");
    assert_eq!(created["user"]["parentId"], created["parent"]["id"]);

    let token = server.login("sarah@home.test", "family123").await?;
    let res = server.get(&token, "/api/school-fees").await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
