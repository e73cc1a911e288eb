use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::http::ext::OptionExt;
use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, require};
use super::Builder;
use crate::database::{SubscriptionTier, TipFilter, UserSubscription};
use crate::global::ApiGlobal;

const RECENT_TIPS: i64 = 5;
const TIP_WINDOW_DAYS: i64 = 30;

#[derive(serde::Deserialize)]
struct MonetizationQuery {
	creator_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct EnableMonetization {
	user_id: Option<Uuid>,
}

/// Sum of the tier price of every current subscription.
fn monthly_recurring_cents(tiers: &[SubscriptionTier], subscriptions: &[UserSubscription]) -> i64 {
	let prices = tiers.iter().map(|t| (t.id, t.price_cents)).collect::<HashMap<_, _>>();

	subscriptions
		.iter()
		.filter_map(|s| prices.get(&s.tier_id))
		.sum()
}

async fn summary<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: MonetizationQuery = request::query(&req)?;

	let creator_id = query.creator_id;
	require!(creator_id);

	let creator = global
		.store()
		.get_user(creator_id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "User not found"))?;

	let now = Utc::now();
	let filter = TipFilter::Recipient(creator_id);

	let tiers = global.store().list_tiers(creator_id, true).await?;
	let subscribers = global.store().list_current_subscribers(creator_id, now).await?;
	let tips = global.store().tip_totals(filter, None).await?;
	let recent_window = global
		.store()
		.tip_totals(filter, Some(now - Duration::days(TIP_WINDOW_DAYS)))
		.await?;
	let recent_tips = global.store().list_tips(filter, RECENT_TIPS).await?;

	let recurring = monthly_recurring_cents(&tiers, &subscribers);

	Ok(json_response(
		StatusCode::OK,
		&json!({
			"creator_id": creator_id,
			"is_creator": creator.is_creator,
			"tiers": tiers,
			"active_subscribers": subscribers.len(),
			"monthly_recurring_cents": recurring,
			"total_tips_cents": tips.total_cents,
			"tips_count": tips.count,
			"tips_last_30_days_cents": recent_window.total_cents,
			"estimated_monthly_cents": recurring + recent_window.total_cents,
			"recent_tips": recent_tips,
		}),
	))
}

async fn enable<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: EnableMonetization = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	require!(user_id);

	let user = global
		.store()
		.set_creator(user_id, true)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "User not found"))?;

	tracing::info!(user_id = %user_id, "monetization enabled");

	Ok(json_response(StatusCode::OK, &user))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/monetization", summary::<G>)
		.post("/api/monetization", enable::<G>)
}
