use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{models, routes, stage_two};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::root,
		routes::health::health,
		routes::auth::banner,
		routes::auth::me,
		routes::auth::logout,
		routes::tournaments::list_tournaments,
		routes::tournaments::get_tournament,
		routes::tournaments::create_tournament,
		routes::tournaments::update_tournament,
		routes::tournaments::delete_tournament,
		routes::results::list_results,
		routes::results::get_result,
		routes::results::create_result,
		routes::results::update_result,
		routes::results::delete_result,
		routes::news::list_news,
		routes::news::get_news,
		routes::news::create_news,
		routes::news::update_news,
		routes::news::delete_news,
		routes::pages::list_pages,
		routes::pages::get_page,
		routes::pages::create_page,
		routes::pages::update_page,
		routes::pages::delete_page,
		routes::leaguetables::submit_league_table,
		routes::live::live
	),
	components(
		schemas(
			models::user::User,
			models::tournament::Tournament,
			models::tournament::CompetitionEntry,
			models::tournament::TournamentCreateRequest,
			models::tournament::TournamentUpdateRequest,
			models::fixture::Competition,
			models::fixture::Fixture,
			models::fixture::FixtureCreateRequest,
			models::fixture::FixtureUpdateRequest,
			models::news::NewsItem,
			models::news::NewsCreateRequest,
			models::news::NewsUpdateRequest,
			models::page::Page,
			models::page::PageCreateRequest,
			models::page::PageUpdateRequest,
			stage_two::TableReport,
			stage_two::PlacementOutcome,
			routes::health::HealthResponse,
			routes::auth::MessageResponse
		)
	),
	tags(
		(name = "Health", description = "Service status"),
		(name = "Auth", description = "Current caller"),
		(name = "Tournaments", description = "Tournament definitions"),
		(name = "Results", description = "Fixtures and scores"),
		(name = "News", description = "Announcements"),
		(name = "Pages", description = "Information pages"),
		(name = "League tables", description = "Group standings feeding knockout fixtures"),
		(name = "Live", description = "Live update stream")
	)
)]
pub struct ApiDoc;

/// The generated document plus the bearer scheme and a local server entry.
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc)?;
	ensure_servers(&mut doc, port)?;

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()));

	let schemes = components
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()));

	if let Some(schemes) = schemes.as_object_mut() {
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}

	// Tokens are optional: anonymous callers act as guests.
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{}, { "bearerAuth": [] }]));

	Ok(())
}

fn ensure_servers(doc: &mut Value, port: u16) -> anyhow::Result<()> {
	let server_url = format!("http://localhost:{port}");

	let servers = root_object(doc)?
		.entry("servers")
		.or_insert_with(|| Value::Array(Vec::new()));

	match servers {
		Value::Array(entries) => {
			let present = entries
				.iter()
				.any(|entry| entry.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !present {
				entries.push(json!({ "url": server_url }));
			}
		}
		other => *other = json!([{ "url": server_url }]),
	}

	Ok(())
}
