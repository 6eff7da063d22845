mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{fixture_body, TestApp};

async fn editor(app: &TestApp) -> Result<String> {
    app.token_with_roles("eddie", &["tournament_editor"]).await
}

fn id_of(value: &Value) -> &str {
    value["id"].as_str().expect("response carries an id")
}

#[tokio::test]
async fn create_read_update_delete_result() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    let (status, created) = app.post("/tournament/results", Some(&token), fixture_body("A1", "Foo", "Bar")).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["version"], 0);
    assert_eq!(created["time"], "10:30");
    assert_eq!(created["homeScore"], "");
    assert_eq!(created["competition"]["group"], 2);

    let uri = format!("/tournament/results/{}", id_of(&created));
    let (status, fetched) = app.get(&uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["homeTeam"], "Foo");

    let (status, updated) = app
        .put(&uri, Some(&token), json!({"version": 0, "homeGoals": 1, "awayGoals": 1, "homePens": 4, "awayPens": 3}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 1);
    assert_eq!(updated["homeScore"], "1(4)");
    assert_eq!(updated["awayScore"], "(3)1");

    let (status, deleted) = app.delete(&uri, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], created["id"]);

    let (status, body) = app.get(&uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    Ok(())
}

#[tokio::test]
async fn stale_version_is_rejected() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    let (_, created) = app.post("/tournament/results", Some(&token), fixture_body("A1", "Foo", "Bar")).await?;
    let uri = format!("/tournament/results/{}", id_of(&created));

    let (status, _) = app.put(&uri, Some(&token), json!({"version": 0, "pitch": "4"})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.put(&uri, Some(&token), json!({"version": 0, "pitch": "5"})).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, current) = app.get(&uri, None).await?;
    assert_eq!(current["pitch"], "4");

    Ok(())
}

#[tokio::test]
async fn invalid_results_are_rejected() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    let (status, _) = app.post("/tournament/results", Some(&token), fixture_body("A1", "", "Bar")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = fixture_body("A1", "Foo", "Bar");
    body["homeGoals"] = json!(-1);
    let (status, _) = app.post("/tournament/results", Some(&token), body).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            "/tournament/results/00000000-0000-0000-0000-000000000000",
            Some(&token),
            json!({"version": 0}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn list_filters_by_query() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    app.post("/tournament/results", Some(&token), fixture_body("A1", "Foo", "Bar")).await?;
    app.post("/tournament/results", Some(&token), fixture_body("A2", "Baz", "Qux")).await?;
    let mut other = fixture_body("B1", "Alpha", "Beta");
    other["competition"] = json!({"name": "U9", "section": "B"});
    app.post("/tournament/results", Some(&token), other).await?;

    let (_, all) = app.get("/tournament/results", None).await?;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, u11) = app.get("/tournament/results?competition=U11&group=2", None).await?;
    assert_eq!(u11.as_array().unwrap().len(), 2);

    let (_, tagged) = app.get("/tournament/results?tag=B1", None).await?;
    let tagged = tagged.as_array().unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0]["homeTeam"], "Alpha");
    assert!(tagged[0].get("competition").and_then(|c| c.get("group")).is_none());

    Ok(())
}

#[tokio::test]
async fn completed_result_advances_winner_to_next_stage() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    let mut semi = fixture_body("SF1", "TBC", "TBC");
    semi["awayTeamFrom"] = json!("U11_A_KO1");
    let (_, semi) = app.post("/tournament/results", Some(&token), semi).await?;

    let mut quarter = fixture_body("QF1", "Foo", "Bar");
    quarter["stage2Tag"] = json!("U11_A_KO1");
    let (_, quarter) = app.post("/tournament/results", Some(&token), quarter).await?;

    let mut live = app.state.live.subscribe();

    let quarter_uri = format!("/tournament/results/{}", id_of(&quarter));
    let (status, _) = app
        .put(
            &quarter_uri,
            Some(&token),
            json!({"version": 0, "homeGoals": 1, "awayGoals": 3, "homePens": 0, "awayPens": 0}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, semi_now) = app.get(&format!("/tournament/results/{}", id_of(&semi)), None).await?;
    assert_eq!(semi_now["awayTeam"], "Bar");
    assert_eq!(semi_now["homeTeam"], "TBC");
    assert_eq!(semi_now["awayTeamFrom"], "U11_A_KO1");
    assert_eq!(semi_now["version"], 1);

    // The saved result is broadcast first, then every fixture it filled.
    let first = serde_json::to_value(live.recv().await?)?;
    assert_eq!(first["event"], "result");
    assert_eq!(first["data"]["id"], quarter["id"]);
    let second = serde_json::to_value(live.recv().await?)?;
    assert_eq!(second["data"]["id"], semi["id"]);
    assert_eq!(second["data"]["awayTeam"], "Bar");

    Ok(())
}

#[tokio::test]
async fn unfinished_result_does_not_advance() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    let mut semi = fixture_body("SF1", "TBC", "TBC");
    semi["homeTeamFrom"] = json!("U11_A_KO2");
    let (_, semi) = app.post("/tournament/results", Some(&token), semi).await?;

    let mut quarter = fixture_body("QF2", "Foo", "Bar");
    quarter["stage2Tag"] = json!("U11_A_KO2");
    let (_, quarter) = app.post("/tournament/results", Some(&token), quarter).await?;

    let quarter_uri = format!("/tournament/results/{}", id_of(&quarter));
    app.put(&quarter_uri, Some(&token), json!({"version": 0, "homeGoals": 2})).await?;

    let (_, semi_now) = app.get(&format!("/tournament/results/{}", id_of(&semi)), None).await?;
    assert_eq!(semi_now["homeTeam"], "TBC");
    assert_eq!(semi_now["version"], 0);

    Ok(())
}

#[tokio::test]
async fn delete_broadcasts_removal() -> Result<()> {
    let app = common::setup().await?;
    let token = editor(&app).await?;

    let (_, created) = app.post("/tournament/results", Some(&token), fixture_body("A1", "Foo", "Bar")).await?;
    let mut live = app.state.live.subscribe();

    app.delete(&format!("/tournament/results/{}", id_of(&created)), Some(&token)).await?;

    let event = serde_json::to_value(live.recv().await?)?;
    assert_eq!(event["event"], "remove");
    assert_eq!(event["data"]["id"], created["id"]);
    assert_eq!(event["data"]["homeTeam"], "Foo");
    assert_eq!(event["data"]["awayTeam"], "Bar");
    assert_eq!(event["data"]["tag"], "A1");

    Ok(())
}
