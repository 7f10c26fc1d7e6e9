mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{create_student, id_of, seed_calendar, TestServer};

#[tokio::test]
async fn fulfillment_lifecycle_and_stats() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;

    let reams = server
        .create(&admin, "/api/requirements", json!({ "name": "Ream of paper", "description": "A4" }))
        .await?;
    let brooms = server
        .create(&admin, "/api/requirements", json!({ "name": "Broom", "description": "Hard broom" }))
        .await?;
    let set = server
        .create(
            &admin,
            "/api/requirement-sets",
            json!({
                "name": "P1 Term 1 supplies",
                "description": "Due at opening",
                "schoolClass": calendar.class,
                "academicTerm": calendar.term,
                "requirementItems": [
                    { "requirement": id_of(&reams), "quantity": 2 },
                    { "requirement": id_of(&brooms), "quantity": 1 }
                ]
            }),
        )
        .await?;
    let first = create_student(&server, &admin, &calendar.class, "Daniel").await?;
    create_student(&server, &admin, &calendar.class, "Esther").await?;

    let record = server
        .create(
            &admin,
            "/api/requirement-fulfillments",
            json!({
                "studentId": id_of(&first),
                "requirementSetId": id_of(&set),
                "fulfilledItems": [{ "requirement": id_of(&reams), "fulfilledQuantity": 1 }]
            }),
        )
        .await?;
    assert_eq!(record["status"], "Partial");
    assert_eq!(record["fulfilledItems"].as_array().map(Vec::len), Some(2));
    assert_eq!(record["schoolClass"], calendar.class.as_str());

    let res = server
        .post(
            &admin,
            "/api/requirement-fulfillments",
            json!({ "studentId": id_of(&first), "requirementSetId": id_of(&set) }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["id"], record["id"]);

    let path = format!("/api/requirement-fulfillments/{}/items", id_of(&record));
    let res = server
        .patch(
            &admin,
            &path,
            json!({ "fulfilledItems": [
                { "requirement": id_of(&reams), "fulfilledQuantity": 2 },
                { "requirement": id_of(&brooms), "fulfilledQuantity": 1 }
            ]}),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["status"], "Complete");
    assert_eq!(body["data"]["totalBalance"], 0);

    let res = server
        .patch(
            &admin,
            &path,
            json!({ "fulfilledItems": [{ "requirement": calendar.term, "fulfilledQuantity": 1 }] }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .get(&admin, &format!("/api/requirement-fulfillments/requirement-set/{}/stats", id_of(&set)))
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["totalStudents"], 2);
    assert_eq!(body["data"]["completeFulfillments"], 1);
    assert_eq!(body["data"]["studentsWithNoRecord"], 1);
    assert_eq!(body["data"]["completeRate"], 50.0);

    let res = server
        .get(
            &admin,
            &format!(
                "/api/requirement-fulfillments/student/{}/requirement-set/{}",
                id_of(&first),
                id_of(&set)
            ),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .get(&admin, &format!("/api/requirement-fulfillments/term/{}", calendar.term))
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn requirement_set_rejects_unknown_requirements() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let calendar = seed_calendar(&server, &admin).await?;

    let res = server
        .post(
            &admin,
            "/api/requirement-sets",
            json!({
                "name": "Broken",
                "description": "Points nowhere",
                "schoolClass": calendar.class,
                "academicTerm": calendar.term,
                "requirementItems": [{ "requirement": calendar.year, "quantity": 1 }]
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
