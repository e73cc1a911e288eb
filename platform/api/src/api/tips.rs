use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, missing_fields, present, require};
use super::Builder;
use crate::config::MonetizationConfig;
use crate::database::{NewTip, TipFilter};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct TipQuery {
	recipient_id: Option<Uuid>,
	sender_id: Option<Uuid>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct CreateTip {
	sender_id: Option<Uuid>,
	recipient_id: Option<Uuid>,
	amount_cents: Option<i64>,
	message: Option<String>,
	video_id: Option<Uuid>,
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: TipQuery = request::query(&req)?;

	let filter = match (query.recipient_id, query.sender_id) {
		(Some(recipient_id), _) => TipFilter::Recipient(recipient_id),
		(None, Some(sender_id)) => TipFilter::Sender(sender_id),
		(None, None) => return Err(missing_fields(&["recipient_id or sender_id"])),
	};

	let tips = global.store().list_tips(filter, request::limit(query.limit)).await?;
	let totals = global.store().tip_totals(filter, None).await?;

	Ok(json_response(
		StatusCode::OK,
		&json!({
			"tips": tips,
			"total_cents": totals.total_cents,
		}),
	))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateTip = request::json(global.as_ref(), &mut req).await?;
	let config = global.config::<MonetizationConfig>();

	let sender_id = body.sender_id;
	let recipient_id = body.recipient_id;
	let amount_cents = body.amount_cents;
	require!(sender_id, recipient_id, amount_cents);

	if sender_id == recipient_id {
		return Err(bad_request("You cannot tip yourself"));
	}

	if !(config.min_tip_cents..=config.max_tip_cents).contains(&amount_cents) {
		return Err(bad_request(&format!(
			"Tip amount must be between {} and {} cents",
			config.min_tip_cents, config.max_tip_cents
		)));
	}

	let message = present(body.message);
	if message
		.as_ref()
		.is_some_and(|message| message.chars().count() > config.max_tip_message_len)
	{
		return Err(bad_request(&format!(
			"Message must be at most {} characters long",
			config.max_tip_message_len
		)));
	}

	let tip = global
		.store()
		.create_tip(NewTip {
			sender_id,
			recipient_id,
			amount_cents,
			message,
			video_id: body.video_id,
		})
		.await?;

	tracing::info!(
		tip_id = %tip.id,
		sender_id = %sender_id,
		recipient_id = %recipient_id,
		amount_cents,
		"tip sent"
	);

	Ok(json_response(StatusCode::CREATED, &tip))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router.get("/api/tips", get::<G>).post("/api/tips", create::<G>)
}
