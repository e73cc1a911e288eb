use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use common::http::ext::OptionExt;
use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, missing_fields, require};
use super::Builder;
use crate::config::MonetizationConfig;
use crate::database::{NewSubscription, SubscriptionStatus, SubscriptionTier, UserSubscription, UserSummary};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct SubscriptionQuery {
	id: Option<Uuid>,
	subscriber_id: Option<Uuid>,
	creator_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct SubscriptionBody {
	subscriber_id: Option<Uuid>,
	tier_id: Option<Uuid>,
}

#[derive(Debug, serde::Serialize)]
struct SubscriptionView {
	#[serde(flatten)]
	subscription: UserSubscription,
	tier: Option<SubscriptionTier>,
	#[serde(skip_serializing_if = "Option::is_none")]
	subscriber: Option<UserSummary>,
}

/// Embeds the tier of every subscription, and the subscriber when asked.
async fn views<G: ApiGlobal>(
	global: &G,
	subscriptions: Vec<UserSubscription>,
	with_subscriber: bool,
	now: DateTime<Utc>,
) -> Result<Vec<SubscriptionView>> {
	let tier_ids = subscriptions.iter().map(|s| s.tier_id).collect::<Vec<_>>();
	let tiers = match tier_ids.is_empty() {
		true => HashMap::new(),
		false => global
			.store()
			.get_tiers(&tier_ids)
			.await?
			.into_iter()
			.map(|t| (t.id, t))
			.collect::<HashMap<_, _>>(),
	};

	let subscribers = match with_subscriber {
		true => request::authors(global, subscriptions.iter().map(|s| s.subscriber_id)).await?,
		false => HashMap::new(),
	};

	Ok(subscriptions
		.into_iter()
		.map(|subscription| SubscriptionView {
			tier: tiers.get(&subscription.tier_id).cloned(),
			subscriber: subscribers.get(&subscription.subscriber_id).cloned(),
			subscription: subscription.with_effective_status(now),
		})
		.collect())
}

/// Loads a subscription held by the acting user.
async fn owned_subscription<G: ApiGlobal>(global: &G, id: Uuid, subscriber_id: Uuid) -> Result<UserSubscription> {
	let subscription = global
		.store()
		.get_subscription(id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Subscription not found"))?;

	if subscription.subscriber_id != subscriber_id {
		return Err((StatusCode::FORBIDDEN, "You can only modify your own subscriptions").into());
	}

	Ok(subscription)
}

/// Loads a tier that can currently be subscribed to.
async fn available_tier<G: ApiGlobal>(global: &G, tier_id: Uuid) -> Result<SubscriptionTier> {
	let tier = global
		.store()
		.get_tier(tier_id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Tier not found"))?;

	if !tier.is_active {
		return Err(bad_request("Tier is not available"));
	}

	Ok(tier)
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: SubscriptionQuery = request::query(&req)?;
	let now = Utc::now();

	match (query.subscriber_id, query.creator_id) {
		(Some(subscriber_id), Some(creator_id)) => {
			let subscription = global
				.store()
				.current_subscription(subscriber_id, creator_id, now)
				.await?;

			Ok(json_response(
				StatusCode::OK,
				&json!({
					"subscribed": subscription.is_some(),
					"subscription": subscription,
				}),
			))
		}
		(Some(subscriber_id), None) => {
			let subscriptions = global.store().list_subscriptions(subscriber_id).await?;
			let subscriptions = views(global.as_ref(), subscriptions, false, now).await?;

			Ok(json_response(StatusCode::OK, &subscriptions))
		}
		(None, Some(creator_id)) => {
			let subscriptions = global.store().list_current_subscribers(creator_id, now).await?;
			let subscriptions = views(global.as_ref(), subscriptions, true, now).await?;

			Ok(json_response(StatusCode::OK, &subscriptions))
		}
		(None, None) => Err(missing_fields(&["subscriber_id or creator_id"])),
	}
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: SubscriptionBody = request::json(global.as_ref(), &mut req).await?;

	let subscriber_id = body.subscriber_id;
	let tier_id = body.tier_id;
	require!(subscriber_id, tier_id);

	let tier = available_tier(global.as_ref(), tier_id).await?;

	if tier.creator_id == subscriber_id {
		return Err(bad_request("You cannot subscribe to yourself"));
	}

	let now = Utc::now();
	let period = Duration::days(global.config::<MonetizationConfig>().subscription_period_days);

	let subscription = global
		.store()
		.create_subscription(
			NewSubscription {
				subscriber_id,
				creator_id: tier.creator_id,
				tier_id,
				current_period_end: now + period,
			},
			now,
		)
		.await?;

	tracing::info!(
		subscription_id = %subscription.id,
		subscriber_id = %subscriber_id,
		creator_id = %tier.creator_id,
		"subscription created"
	);

	Ok(json_response(
		StatusCode::CREATED,
		&SubscriptionView {
			subscription,
			tier: Some(tier),
			subscriber: None,
		},
	))
}

async fn update<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: SubscriptionQuery = request::query(&req)?;
	let body: SubscriptionBody = request::json(global.as_ref(), &mut req).await?;

	let id = query.id;
	let subscriber_id = body.subscriber_id;
	let tier_id = body.tier_id;
	require!(id, subscriber_id, tier_id);

	let now = Utc::now();
	let subscription = owned_subscription(global.as_ref(), id, subscriber_id)
		.await?
		.with_effective_status(now);

	match subscription.status {
		SubscriptionStatus::Active => {}
		SubscriptionStatus::Cancelled => return Err((StatusCode::CONFLICT, "Subscription is cancelled").into()),
		SubscriptionStatus::Expired => return Err((StatusCode::CONFLICT, "Subscription has expired").into()),
	}

	let tier = available_tier(global.as_ref(), tier_id).await?;

	if tier.creator_id != subscription.creator_id {
		return Err(bad_request("Tier belongs to a different creator"));
	}

	let subscription = global
		.store()
		.change_subscription_tier(id, tier_id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Subscription not found"))?;

	Ok(json_response(
		StatusCode::OK,
		&SubscriptionView {
			subscription: subscription.with_effective_status(now),
			tier: Some(tier),
			subscriber: None,
		},
	))
}

async fn cancel<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: SubscriptionQuery = request::query(&req)?;

	let id = query.id;
	let subscriber_id = query.subscriber_id;
	require!(id, subscriber_id);

	let subscription = owned_subscription(global.as_ref(), id, subscriber_id).await?;

	if subscription.status == SubscriptionStatus::Cancelled {
		return Err((StatusCode::CONFLICT, "Subscription is already cancelled").into());
	}

	let subscription = global
		.store()
		.cancel_subscription(id, Utc::now())
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Subscription not found"))?;

	tracing::info!(subscription_id = %id, "subscription cancelled");

	Ok(json_response(StatusCode::OK, &subscription))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/subscriptions", get::<G>)
		.post("/api/subscriptions", create::<G>)
		.put("/api/subscriptions", update::<G>)
		.delete("/api/subscriptions", cancel::<G>)
}
