use common::http::ext::OptionExt;
use common::http::{empty_response, json_response};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, missing_fields, present, require};
use super::Builder;
use crate::database::{NewTier, SubscriptionTier, TierPatch};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct TierQuery {
	id: Option<Uuid>,
	creator_id: Option<Uuid>,
	#[serde(default)]
	include_inactive: bool,
}

#[derive(serde::Deserialize)]
struct CreateTier {
	creator_id: Option<Uuid>,
	name: Option<String>,
	description: Option<String>,
	price_cents: Option<i64>,
	benefits: Option<Vec<String>>,
}

#[derive(serde::Deserialize)]
struct UpdateTier {
	creator_id: Option<Uuid>,
	name: Option<String>,
	description: Option<String>,
	price_cents: Option<i64>,
	benefits: Option<Vec<String>>,
	is_active: Option<bool>,
}

fn clean_benefits(benefits: Vec<String>) -> Vec<String> {
	benefits
		.into_iter()
		.map(|benefit| benefit.trim().to_owned())
		.filter(|benefit| !benefit.is_empty())
		.collect()
}

async fn owned_tier<G: ApiGlobal>(global: &G, id: Uuid, creator_id: Uuid) -> Result<SubscriptionTier> {
	let tier = global
		.store()
		.get_tier(id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Tier not found"))?;

	if tier.creator_id != creator_id {
		return Err((StatusCode::FORBIDDEN, "You can only modify your own tiers").into());
	}

	Ok(tier)
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TierQuery = request::query(&req)?;

	if let Some(id) = query.id {
		let tier = global
			.store()
			.get_tier(id)
			.await?
			.map_err_route((StatusCode::NOT_FOUND, "Tier not found"))?;

		return Ok(json_response(StatusCode::OK, &tier));
	}

	let Some(creator_id) = query.creator_id else {
		return Err(missing_fields(&["creator_id"]));
	};

	let tiers = global.store().list_tiers(creator_id, query.include_inactive).await?;

	Ok(json_response(StatusCode::OK, &tiers))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateTier = request::json(global.as_ref(), &mut req).await?;

	let creator_id = body.creator_id;
	let name = present(body.name);
	let price_cents = body.price_cents;
	require!(creator_id, name, price_cents);

	SubscriptionTier::validate_name(&name).map_err(bad_request)?;
	SubscriptionTier::validate_price(price_cents).map_err(bad_request)?;

	let tier = global
		.store()
		.create_tier(NewTier {
			creator_id,
			name,
			description: present(body.description),
			price_cents,
			benefits: clean_benefits(body.benefits.unwrap_or_default()),
		})
		.await?;

	tracing::info!(tier_id = %tier.id, creator_id = %creator_id, "tier created");

	Ok(json_response(StatusCode::CREATED, &tier))
}

async fn update<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TierQuery = request::query(&req)?;
	let body: UpdateTier = request::json(global.as_ref(), &mut req).await?;

	let id = query.id;
	let creator_id = body.creator_id;
	require!(id, creator_id);

	if let Some(name) = &body.name {
		SubscriptionTier::validate_name(name).map_err(bad_request)?;
	}

	if let Some(price_cents) = body.price_cents {
		SubscriptionTier::validate_price(price_cents).map_err(bad_request)?;
	}

	owned_tier(global.as_ref(), id, creator_id).await?;

	let patch = TierPatch {
		name: body.name,
		description: body.description,
		price_cents: body.price_cents,
		benefits: body.benefits.map(clean_benefits),
		is_active: body.is_active,
	};

	if patch.is_empty() {
		return Err(bad_request("No fields to update"));
	}

	let tier = global
		.store()
		.update_tier(id, patch)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Tier not found"))?;

	Ok(json_response(StatusCode::OK, &tier))
}

/// Tiers with current subscribers are deactivated instead of deleted.
async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TierQuery = request::query(&req)?;

	let id = query.id;
	let creator_id = query.creator_id;
	require!(id, creator_id);

	owned_tier(global.as_ref(), id, creator_id).await?;

	let subscribers = global
		.store()
		.count_current_subscriptions(id, chrono::Utc::now())
		.await?;

	if subscribers > 0 {
		let tier = global
			.store()
			.update_tier(
				id,
				TierPatch {
					is_active: Some(false),
					..Default::default()
				},
			)
			.await?
			.map_err_route((StatusCode::NOT_FOUND, "Tier not found"))?;

		tracing::info!(tier_id = %id, subscribers, "tier deactivated");

		return Ok(json_response(StatusCode::OK, &json!({ "deactivated": true, "tier": tier })));
	}

	if !global.store().delete_tier(id).await? {
		return Err((StatusCode::NOT_FOUND, "Tier not found").into());
	}

	tracing::info!(tier_id = %id, "tier deleted");

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/tiers", get::<G>)
		.post("/api/tiers", create::<G>)
		.put("/api/tiers", update::<G>)
		.delete("/api/tiers", delete::<G>)
}
