mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{fixture_body, TestApp};

async fn waiting_on(app: &TestApp, token: &str, tag: &str, home_from: &str, away_from: &str) -> Result<Value> {
    let mut body = fixture_body(tag, "TBC", "TBC");
    body["homeTeamFrom"] = json!(home_from);
    body["awayTeamFrom"] = json!(away_from);
    let (status, created) = app.post("/tournament/results", Some(token), body).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(created)
}

#[tokio::test]
async fn array_submission_fills_every_position() -> Result<()> {
    let app = common::setup().await?;
    let token = app.token_with_roles("eddie", &["tournament_editor"]).await?;

    let final_ = waiting_on(&app, &token, "F", "U11_B_G2_P1", "U11_B_G1_P1").await?;
    let plate = waiting_on(&app, &token, "P", "U11_B_G2_P3", "U11_B_G2_P2").await?;

    let (status, report) = app
        .post("/tournament/leaguetables/U11/B/2", Some(&token), json!(["A", "B", "C"]))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["prefix"], "U11_B_G2_P");

    let placements = report["placements"].as_array().unwrap();
    let sources: Vec<_> = placements.iter().map(|p| p["source"].as_str().unwrap()).collect();
    assert_eq!(sources, vec!["U11_B_G2_P1", "U11_B_G2_P2", "U11_B_G2_P3"]);
    assert!(placements.iter().all(|p| p.get("error").is_none()));

    let (_, final_now) = app.get(&format!("/tournament/results/{}", final_["id"].as_str().unwrap()), None).await?;
    assert_eq!(final_now["homeTeam"], "A");
    assert_eq!(final_now["awayTeam"], "TBC");

    let (_, plate_now) = app.get(&format!("/tournament/results/{}", plate["id"].as_str().unwrap()), None).await?;
    assert_eq!(plate_now["homeTeam"], "C");
    assert_eq!(plate_now["awayTeam"], "B");
    assert_eq!(plate_now["version"], 2);

    Ok(())
}

#[tokio::test]
async fn object_submission_tolerates_gaps_and_other_keys() -> Result<()> {
    let app = common::setup().await?;
    let token = app.token_with_roles("eddie", &["tournament_editor"]).await?;

    let first = waiting_on(&app, &token, "X1", "U9_A_G1_P1", "none").await?;
    let third = waiting_on(&app, &token, "X2", "none", "U9_A_G1_P3").await?;

    let (status, report) = app
        .post(
            "/tournament/leaguetables/U9/A/1",
            Some(&token),
            json!({"2": "Third", "0": "First", "updatedBy": "someone"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let placements = report["placements"].as_array().unwrap();
    assert_eq!(placements.len(), 2);
    assert_eq!(placements[0]["source"], "U9_A_G1_P1");
    assert_eq!(placements[1]["source"], "U9_A_G1_P3");
    assert_eq!(placements[1]["updated"][0]["id"], third["id"]);

    let (_, first_now) = app.get(&format!("/tournament/results/{}", first["id"].as_str().unwrap()), None).await?;
    assert_eq!(first_now["homeTeam"], "First");

    Ok(())
}

#[tokio::test]
async fn bad_positions_are_reported_individually() -> Result<()> {
    let app = common::setup().await?;
    let token = app.token_with_roles("eddie", &["tournament_editor"]).await?;

    let second = waiting_on(&app, &token, "Y", "U11_C_G3_P2", "none").await?;

    let (status, report) = app
        .post("/tournament/leaguetables/U11/C/3", Some(&token), json!([42, "Second"]))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let placements = report["placements"].as_array().unwrap();
    assert!(placements[0]["error"].is_string());
    assert!(placements[1].get("error").is_none());
    assert_eq!(placements[1]["updated"][0]["id"], second["id"]);

    Ok(())
}

#[tokio::test]
async fn oversized_position_key_fails_alone() -> Result<()> {
    let app = common::setup().await?;
    let token = app.token_with_roles("eddie", &["tournament_editor"]).await?;

    let first = waiting_on(&app, &token, "Z", "U11_B_G2_P1", "none").await?;

    let mut body = json!({"0": "B"});
    body[usize::MAX.to_string().as_str()] = json!("A");
    let (status, report) = app.post("/tournament/leaguetables/U11/B/2", Some(&token), body).await?;
    assert_eq!(status, StatusCode::OK);

    let placements = report["placements"].as_array().unwrap();
    assert_eq!(placements.len(), 2);
    assert_eq!(placements[0]["source"], "U11_B_G2_P1");
    assert!(placements[0].get("error").is_none());
    assert!(placements[1]["error"].as_str().unwrap().contains("out of range"));
    assert_eq!(placements[1]["updated"], json!([]));

    let (_, first_now) = app.get(&format!("/tournament/results/{}", first["id"].as_str().unwrap()), None).await?;
    assert_eq!(first_now["homeTeam"], "B");

    Ok(())
}

#[tokio::test]
async fn scalar_submission_is_rejected() -> Result<()> {
    let app = common::setup().await?;
    let token = app.token_with_roles("eddie", &["tournament_editor"]).await?;

    let (status, body) = app
        .post("/tournament/leaguetables/U11/A/2", Some(&token), json!("Foo"))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    Ok(())
}
